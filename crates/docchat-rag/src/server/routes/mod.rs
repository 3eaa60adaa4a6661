//! API routes for the RAG server

pub mod chat;
pub mod documents;
pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use crate::server::state::AppState;

/// Build all `/api/v1` routes
pub fn api_routes(max_body_size: usize) -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        // Extracted text can be large
        .route(
            "/documents/:id/ingest",
            post(documents::ingest_document).layer(DefaultBodyLimit::max(max_body_size)),
        )
        .route(
            "/documents/:id",
            get(documents::get_document).delete(documents::delete_document),
        )
        .route("/chat/ask", post(chat::ask))
}
