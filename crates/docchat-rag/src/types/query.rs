//! Request types for the HTTP surface

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::document::DocumentId;

/// Question about one document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    /// Document to answer from
    pub document_id: DocumentId,
    /// The question to answer
    pub question: String,
}

impl AskRequest {
    /// Trimmed question, or `None` when blank
    pub fn question(&self) -> Option<&str> {
        let q = self.question.trim();
        (!q.is_empty()).then_some(q)
    }
}

/// Extracted document text handed over by the document processor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRequest {
    /// Full extracted text
    pub text: String,
    /// Metadata attached to every chunk (filename, file type, ...)
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Outcome of a successful ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    /// Ingested document
    pub document_id: DocumentId,
    /// Collection the chunks were written to
    pub collection: String,
    /// Chunks in the new generation
    pub chunks: usize,
    /// Wall-clock ingestion time
    pub processing_time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_question_rejected() {
        let request = AskRequest {
            document_id: 1,
            question: "   ".to_string(),
        };
        assert!(request.question().is_none());
    }

    #[test]
    fn test_ingest_metadata_defaults_empty() {
        let request: IngestRequest = serde_json::from_str(r#"{"text": "hello"}"#).unwrap();
        assert!(request.metadata.is_empty());
    }
}
