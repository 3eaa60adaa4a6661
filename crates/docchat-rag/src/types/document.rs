//! Chunk and collection types for per-document indexes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Document identifier assigned by the document registry
pub type DocumentId = i64;

/// An embedded text window belonging to exactly one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// `"{document_id}_chunk_{index}"`
    pub id: String,
    /// Chunk text used for grounding
    pub text: String,
    /// Embedding vector
    pub vector: Vec<f32>,
    /// Owning document
    pub source_document_id: DocumentId,
    /// 0-based position in the ingestion split
    pub index: usize,
}

impl Chunk {
    /// Create a chunk at position `index` of a document's split
    pub fn new(document_id: DocumentId, index: usize, text: String, vector: Vec<f32>) -> Self {
        Self {
            id: Self::chunk_id(document_id, index),
            text,
            vector,
            source_document_id: document_id,
            index,
        }
    }

    /// Stable chunk identifier, unique within a document's collection
    pub fn chunk_id(document_id: DocumentId, index: usize) -> String {
        format!("{}_chunk_{}", document_id, index)
    }
}

/// Summary of a document's collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    /// Owning document
    pub document_id: DocumentId,
    /// Collection name (`{prefix}_{document_id}`)
    pub name: String,
    /// Number of chunks in the live generation
    pub chunk_count: usize,
    /// Vector dimensionality
    pub dimensions: usize,
    /// When the live generation was written
    pub ingested_at: DateTime<Utc>,
}
