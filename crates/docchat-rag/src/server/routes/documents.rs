//! Document ingestion and management endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{DocumentId, IngestRequest, IngestResponse};

/// Index status of one document
#[derive(Debug, Serialize)]
pub struct DocumentStatus {
    pub document_id: DocumentId,
    /// Whether a collection exists
    pub exists: bool,
    pub collection: String,
    pub chunk_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingested_at: Option<DateTime<Utc>>,
}

/// Outcome of a delete
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub document_id: DocumentId,
    /// False when there was nothing to delete
    pub deleted: bool,
}

/// POST /api/v1/documents/:id/ingest - Rebuild a document's index from its text
pub async fn ingest_document(
    State(state): State<AppState>,
    Path(document_id): Path<DocumentId>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<IngestResponse>> {
    let start = Instant::now();

    let info = state
        .service()
        .rebuild(document_id, &request.text, request.metadata)
        .await?;

    let processing_time_ms = start.elapsed().as_millis() as u64;
    tracing::info!(
        "Document {} ingested in {}ms ({} chunks)",
        document_id,
        processing_time_ms,
        info.chunk_count
    );

    Ok(Json(IngestResponse {
        document_id,
        collection: info.name,
        chunks: info.chunk_count,
        processing_time_ms,
    }))
}

/// GET /api/v1/documents/:id - Index status
pub async fn get_document(
    State(state): State<AppState>,
    Path(document_id): Path<DocumentId>,
) -> Result<Json<DocumentStatus>> {
    let service = state.service();
    let status = match service.document_info(document_id).await? {
        Some(info) => DocumentStatus {
            document_id,
            exists: true,
            collection: info.name,
            chunk_count: info.chunk_count,
            ingested_at: Some(info.ingested_at),
        },
        None => DocumentStatus {
            document_id,
            exists: false,
            collection: service.index().collection_name(document_id),
            chunk_count: 0,
            ingested_at: None,
        },
    };

    Ok(Json(status))
}

/// DELETE /api/v1/documents/:id - Drop a document's index
pub async fn delete_document(
    State(state): State<AppState>,
    Path(document_id): Path<DocumentId>,
) -> Result<Json<DeleteResponse>> {
    let deleted = state.service().delete_document(document_id).await?;
    Ok(Json(DeleteResponse {
        document_id,
        deleted,
    }))
}
