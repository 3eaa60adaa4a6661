//! DocChat RAG server binary
//!
//! Run with: cargo run -p docchat-rag --bin docchat-rag-server
//! Set DOCCHAT_CONFIG to a TOML file to override defaults.

use docchat_rag::{config::RagConfig, server::RagServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docchat_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RagConfig::from_env()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Index backend: {:?} ({:?})", config.index.backend, config.index.metric);
    tracing::info!("  - Embedding model: {}", config.llm.embed_model);
    tracing::info!("  - Embedding dimensions: {}", config.embeddings.dimensions);
    tracing::info!("  - LLM model: {}", config.llm.generate_model);
    tracing::info!(
        "  - Chunking: {} chars, {} overlap",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );

    let server = RagServer::new(config.clone()).await?;

    if !server.providers_ready().await {
        tracing::warn!("Ollama not available at {}", config.llm.base_url);
        tracing::warn!(
            "Start it with `ollama serve` and pull {} and {}",
            config.llm.embed_model,
            config.llm.generate_model
        );
    }

    tracing::info!("Health: http://{}/api/v1/health", server.address());
    server.start().await?;

    Ok(())
}
