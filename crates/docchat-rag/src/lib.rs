//! docchat-rag: question answering over individual uploaded documents
//!
//! Document text is split into overlapping chunks, embedded and stored in a
//! collection of its own. Questions are answered from the nearest chunks of
//! one document only, with short source excerpts chosen from those chunks.

pub mod config;
pub mod error;
pub mod generation;
pub mod index;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod service;
pub mod types;
pub mod usage;

#[cfg(test)]
pub(crate) mod testing;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use service::RagService;
pub use types::{Answer, Chunk, DocumentId, RetrievalResult};
