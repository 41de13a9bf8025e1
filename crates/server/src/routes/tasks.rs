use axum::extract::State;
use axum::Json;
use pagesmith_core::TaskRequest;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitResponse {
    pub status: String,
    pub task: String,
    pub round: u64,
    pub message: String,
}

/// Accepts a round and schedules it; all generation and publication work
/// happens after the response is sent.
#[utoipa::path(
    post,
    path = "/api-endpoint",
    request_body = TaskRequest,
    responses(
        (status = 200, description = "Accepted for background processing", body = SubmitResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 401, description = "Secret mismatch", body = crate::error::ErrorResponse)
    ),
    tag = "tasks"
)]
pub async fn submit_task(
    State(state): State<AppState>,
    Json(request): Json<TaskRequest>,
) -> Result<Json<SubmitResponse>, AppError> {
    if !state.secret_matches(&request.secret) {
        warn!(task = %request.task, "Rejected request with invalid secret");
        return Err(AppError::Unauthorized);
    }

    request.validate()?;

    info!(
        task = %request.task,
        round = request.round,
        attachments = request.attachments.len(),
        "Accepted task"
    );

    let response = SubmitResponse {
        status: "processing".to_string(),
        task: request.task.clone(),
        round: request.round,
        message: format!(
            "Task '{}' (Round {}) accepted and processing in background",
            request.task, request.round
        ),
    };

    state.dispatcher.submit(request);

    Ok(Json(response))
}
