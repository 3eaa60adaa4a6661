//! Health and info endpoints

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::server::state::AppState;

/// GET /api/v1/health - Provider availability and request usage
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let (embedder, llm) = state.service().providers_healthy().await;
    let status = if embedder && llm { "healthy" } else { "degraded" };

    Json(json!({
        "status": status,
        "version": env!("CARGO_PKG_VERSION"),
        "index": state.service().index().store_name(),
        "providers": {
            "embedding": embedder,
            "completion": llm,
        },
        "usage": state.usage().snapshot(),
    }))
}

/// GET / - Service name and entry points
pub async fn info() -> Json<Value> {
    Json(json!({
        "name": "docchat-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Question answering over individual uploaded documents",
        "endpoints": {
            "GET /api/v1/health": "Provider status and monthly usage",
            "POST /api/v1/documents/:id/ingest": "Rebuild a document's index from extracted text",
            "GET /api/v1/documents/:id": "Index status of a document",
            "DELETE /api/v1/documents/:id": "Drop a document's index",
            "POST /api/v1/chat/ask": "Answer a question from one document"
        }
    }))
}
