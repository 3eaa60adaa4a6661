//! HTTP server for the RAG service

pub mod routes;
pub mod state;

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::config::RagConfig;
use crate::error::{Error, Result};
use state::AppState;

/// RAG HTTP Server
pub struct RagServer {
    config: RagConfig,
    state: AppState,
}

impl RagServer {
    /// Create a server with Ollama providers and the configured index
    pub async fn new(config: RagConfig) -> Result<Self> {
        let state = AppState::from_config(config.clone()).await?;
        Ok(Self { config, state })
    }

    /// Create a server around existing state
    pub fn with_state(state: AppState) -> Self {
        Self {
            config: state.config().clone(),
            state,
        }
    }

    /// Build the router with all routes
    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        let router = self.router();

        tracing::info!("Starting RAG server on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Whether both Ollama-backed providers respond
    pub async fn providers_ready(&self) -> bool {
        let (embedder, llm) = self.state.service().providers_healthy().await;
        embedder && llm
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }
}

/// Router over `state`, with usage counting, tracing and optional CORS
pub fn build_router(state: AppState) -> Router {
    let server = &state.config().server;
    let max_body_size = server.max_body_size;
    let enable_cors = server.enable_cors;

    let router = Router::new()
        .route("/", get(routes::health::info))
        .route("/health", get(health_check))
        .nest("/api/v1", routes::api_routes(max_body_size))
        // Middleware layers (order matters - applied bottom to top)
        .layer(middleware::from_fn_with_state(state.clone(), track_usage))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .layer(TraceLayer::new_for_http());

    if enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        router.layer(cors)
    } else {
        router
    }
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Count the request against the monthly limit and add usage headers
async fn track_usage(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let counter = state.usage();
    if !counter.applies_to(request.uri().path()) {
        return next.run(request).await;
    }

    let ticket = match counter.record().await {
        Ok(ticket) => ticket,
        Err(e) => return e.into_response(),
    };

    let mut response = next.run(request).await;
    ticket.apply_headers(response.headers_mut());
    response
}
