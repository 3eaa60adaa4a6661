//! Provider abstractions for embeddings and text completion
//!
//! The pipeline only depends on the traits; the Ollama implementations are
//! what the server binary wires in.

pub mod embedding;
pub mod llm;
pub mod ollama;

pub use embedding::EmbeddingProvider;
pub use llm::CompletionProvider;
pub use ollama::{OllamaClient, OllamaEmbedder, OllamaLlm};
