//! Configuration for the RAG service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::index::DistanceMetric;

/// Environment variable naming a TOML configuration file
pub const CONFIG_ENV: &str = "DOCCHAT_CONFIG";

/// Main RAG service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,
    /// Embedding configuration
    #[serde(default)]
    pub embeddings: EmbeddingConfig,
    /// Ollama/LLM configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Per-document index configuration
    #[serde(default)]
    pub index: IndexConfig,
    /// Retrieval and excerpt configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Monthly request counter configuration
    #[serde(default)]
    pub usage: UsageConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: RagConfig = toml::from_str(&raw).map_err(|e| {
            Error::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `DOCCHAT_CONFIG` (if set) and apply env overrides
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.is_empty() => Self::load(path)?,
            _ => Self::default(),
        };

        if let Ok(host) = std::env::var("DOCCHAT_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("DOCCHAT_PORT") {
            config.server.port = port
                .parse()
                .map_err(|e| Error::Config(format!("Invalid DOCCHAT_PORT '{}': {}", port, e)))?;
        }
        if let Ok(url) = std::env::var("OLLAMA_BASE_URL") {
            config.llm.base_url = url;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::Config("chunking.chunk_size must be positive".to_string()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.embeddings.dimensions == 0 {
            return Err(Error::Config("embeddings.dimensions must be positive".to_string()));
        }
        if self.embeddings.batch_size == 0 {
            return Err(Error::Config("embeddings.batch_size must be positive".to_string()));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::Config("retrieval.top_k must be positive".to_string()));
        }
        if self.retrieval.window_sizes.iter().any(|&w| w == 0) {
            return Err(Error::Config("retrieval.window_sizes must be positive".to_string()));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum request body size in bytes (default: 10MB)
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding dimensions (384 for MiniLM, 768 for nomic-embed-text)
    pub dimensions: usize,
    /// Chunks per embedding batch
    pub batch_size: usize,
    /// Batches in flight during a rebuild
    pub concurrency: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimensions: 768,
            batch_size: 32,
            concurrency: 2,
        }
    }
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model name
    pub embed_model: String,
    /// Generation model name
    pub generate_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            generate_model: "llama3.2:3b".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

/// Storage backend for per-document collections
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    /// In-process collections, lost on restart
    Memory,
    /// One SQLite table per document
    #[default]
    Sqlite,
}

/// Per-document index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Storage backend
    pub backend: IndexBackend,
    /// SQLite database path (sqlite backend only)
    pub storage_path: PathBuf,
    /// Collection name prefix, collections are named `{prefix}_{document_id}`
    pub collection_prefix: String,
    /// Distance metric used for ranking
    pub metric: DistanceMetric,
}

impl Default for IndexConfig {
    fn default() -> Self {
        let storage_path = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("docchat-rag")
            .join("collections.db");

        Self {
            backend: IndexBackend::Sqlite,
            storage_path,
            collection_prefix: "documents".to_string(),
            metric: DistanceMetric::L2,
        }
    }
}

/// Retrieval and excerpt selection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Chunks retrieved per question
    pub top_k: usize,
    /// Top retrieved chunks scanned for source excerpts
    pub excerpt_scan_limit: usize,
    /// Maximum sources returned with an answer
    pub max_sources: usize,
    /// Sentences longer than this are shortened
    pub excerpt_max_chars: usize,
    /// Word window sizes tried for entity questions
    pub window_sizes: Vec<usize>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            excerpt_scan_limit: 3,
            max_sources: 2,
            excerpt_max_chars: 120,
            window_sizes: vec![10, 15, 20],
        }
    }
}

/// Monthly request counter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageConfig {
    /// Enforce the monthly limit
    pub enabled: bool,
    /// Requests allowed per calendar month (UTC)
    pub monthly_limit: u64,
    /// Remaining-request count below which responses carry a warning header
    pub warning_threshold: u64,
    /// File the counter is persisted to
    pub counter_path: PathBuf,
    /// Paths that are neither counted nor limited
    pub exempt_paths: Vec<String>,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            monthly_limit: 2_000_000,
            warning_threshold: 100_000,
            counter_path: std::env::temp_dir().join("docchat_request_counter.json"),
            exempt_paths: vec![
                "/".to_string(),
                "/health".to_string(),
                "/api/v1/health".to_string(),
            ],
        }
    }
}
