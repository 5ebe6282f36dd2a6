use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;

use crate::{
    error::QuizError,
    extractors::{AppJson, ValidatedJson},
    models::quiz::{NextQuestionRequest, SubmitAnswerRequest},
    services::AppState,
};

pub async fn next_question(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<NextQuestionRequest>,
) -> Result<impl IntoResponse, QuizError> {
    tracing::debug!(
        "Next question requested: mode={:?}, attempt={:?}, seen={}",
        req.mode,
        req.attempt_id,
        req.state.seen_qids.len()
    );

    let response = state.quiz.select_next(req)?;
    Ok(Json(response))
}

pub async fn submit_answer(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, QuizError> {
    tracing::info!(
        "Submitting answer: attempt={}, question={}",
        req.attempt_id,
        req.question_id
    );

    let response = state.quiz.evaluate(req)?;
    Ok(Json(response))
}
