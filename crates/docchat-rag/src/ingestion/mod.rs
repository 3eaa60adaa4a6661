//! Document text chunking for ingestion

mod chunker;

pub use chunker::{reconstruct, ChunkSpan, TextChunker};
