//! Application state for the RAG server

use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::Result;
use crate::index::VectorIndex;
use crate::providers::ollama::ollama_providers;
use crate::service::RagService;
use crate::usage::MonthlyRequestCounter;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// RAG pipeline
    service: RagService,
    /// Monthly request counter
    usage: MonthlyRequestCounter,
}

impl AppState {
    /// Create state around an already wired service
    pub fn new(config: RagConfig, service: RagService) -> Self {
        let usage = MonthlyRequestCounter::open(&config.usage);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                service,
                usage,
            }),
        }
    }

    /// Open the configured index and connect the Ollama providers
    pub async fn from_config(config: RagConfig) -> Result<Self> {
        tracing::info!("Initializing RAG application state...");

        let index = Arc::new(VectorIndex::open(&config)?);

        let (embedder, llm) = ollama_providers(&config.llm, config.embeddings.dimensions)?;
        tracing::info!(
            "Ollama providers initialized at {} (embed: {}, generate: {})",
            config.llm.base_url,
            config.llm.embed_model,
            config.llm.generate_model
        );

        let service = RagService::new(&config, index, Arc::new(embedder), Arc::new(llm))?;

        let state = Self::new(config, service);
        let usage = state.usage().snapshot();
        tracing::info!(
            "Request counter: {}/{} used in {}",
            usage.used,
            usage.limit,
            usage.month
        );

        Ok(state)
    }

    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    pub fn service(&self) -> &RagService {
        &self.inner.service
    }

    pub fn usage(&self) -> &MonthlyRequestCounter {
        &self.inner.usage
    }
}
