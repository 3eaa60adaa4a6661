//! Core types for the RAG service

pub mod document;
pub mod query;
pub mod response;

pub use document::{Chunk, CollectionInfo, DocumentId};
pub use query::{AskRequest, IngestRequest, IngestResponse};
pub use response::{Answer, RetrievalResult};
