use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::QuestionId;

/// Caller-visible failures of the quiz core. An empty pool is not an error;
/// it is reported as a finished response.
#[derive(Debug, Error)]
pub enum QuizError {
    #[error("attempt {0} not found")]
    AttemptNotFound(Uuid),

    #[error("question {0} not found")]
    QuestionNotFound(QuestionId),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("storage failure: {0}")]
    Storage(#[from] anyhow::Error),
}

impl QuizError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            QuizError::AttemptNotFound(_) | QuizError::QuestionNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            QuizError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            QuizError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for QuizError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {:#}", self);
        } else {
            tracing::warn!("Request rejected: {}", self);
        }

        let body = json!({
            "message": self.to_string(),
            "status": status.as_u16(),
        });
        (status, Json(body)).into_response()
    }
}
