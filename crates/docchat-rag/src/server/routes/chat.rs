//! Question answering endpoint

use axum::{extract::State, Json};

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{Answer, AskRequest};

/// POST /api/v1/chat/ask - Answer a question about one document
pub async fn ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<Answer>> {
    let question = request
        .question()
        .ok_or_else(|| Error::InvalidRequest("question must not be empty".to_string()))?;

    let answer = state
        .service()
        .answer_question(request.document_id, question)
        .await?;

    Ok(Json(answer))
}
