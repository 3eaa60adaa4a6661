//! Response types for retrieval and answers

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A chunk returned by a nearest-neighbor query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// Chunk text
    pub content: String,
    /// Chunk metadata (`chunk_id`, `chunk_index`, `document_id`, ingestion metadata)
    pub metadata: BTreeMap<String, String>,
    /// Distance to the query vector (lower is closer)
    pub distance: f32,
}

impl RetrievalResult {
    /// Chunk identifier, when recorded
    pub fn chunk_id(&self) -> Option<&str> {
        self.metadata.get("chunk_id").map(String::as_str)
    }
}

/// Grounded answer with human-readable sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Answer text
    #[serde(rename = "answer")]
    pub text: String,
    /// Source excerpts, most relevant first
    pub sources: Vec<String>,
}

impl Answer {
    /// Returned when no chunk could ground an answer
    pub const NOT_FOUND: &'static str =
        "I couldn't find relevant information in the document to answer your question.";

    /// Create an answer
    pub fn new(text: String, sources: Vec<String>) -> Self {
        Self { text, sources }
    }

    /// The fixed "no grounding available" answer
    pub fn not_found() -> Self {
        Self {
            text: Self::NOT_FOUND.to_string(),
            sources: Vec::new(),
        }
    }

    /// Whether this is the "no grounding available" answer
    pub fn is_fallback(&self) -> bool {
        self.text == Self::NOT_FOUND && self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_wire_format() {
        let answer = Answer::new("Blue.".to_string(), vec!["The sky is blue.".to_string()]);
        let json = serde_json::to_value(&answer).unwrap();
        assert_eq!(json["answer"], "Blue.");
        assert_eq!(json["sources"][0], "The sky is blue.");
    }

    #[test]
    fn test_not_found_is_fallback() {
        assert!(Answer::not_found().is_fallback());
        assert!(!Answer::new("x".to_string(), vec![]).is_fallback());
    }
}
