use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::QuizError,
    extractors::ValidatedJson,
    models::quiz::{EndAttemptResponse, StartAttemptRequest, StartAttemptResponse},
    services::AppState,
};

pub async fn start_attempt(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<StartAttemptRequest>,
) -> Result<impl IntoResponse, QuizError> {
    let mode = req
        .mode
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| state.config.default_mode.clone());

    tracing::info!("Starting attempt for user_id={}, mode={}", req.user_id, mode);

    let attempt = state.attempts.start_attempt(&req.user_id, &mode)?;
    Ok((
        StatusCode::CREATED,
        Json(StartAttemptResponse {
            attempt_id: attempt.id,
            mode: attempt.mode,
            started_at: attempt.started_at,
        }),
    ))
}

pub async fn end_attempt(
    State(state): State<Arc<AppState>>,
    Path(attempt_id): Path<Uuid>,
) -> Result<impl IntoResponse, QuizError> {
    tracing::info!("Ending attempt: {}", attempt_id);

    let attempt = state.attempts.end_attempt(attempt_id)?;
    let ended_at = attempt
        .ended_at
        .ok_or_else(|| anyhow::anyhow!("attempt {} has no end timestamp after ending", attempt_id))?;

    Ok(Json(EndAttemptResponse {
        attempt_id,
        ended_at,
    }))
}

pub async fn get_results(
    State(state): State<Arc<AppState>>,
    Path(attempt_id): Path<Uuid>,
) -> Result<impl IntoResponse, QuizError> {
    tracing::info!("Getting results for attempt: {}", attempt_id);

    let stats = state.attempts.results(attempt_id)?;
    Ok(Json(stats))
}
