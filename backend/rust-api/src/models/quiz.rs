use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::outcome::{Adjustment, FinishReason};
use super::question::{Difficulty, QuestionId, QuestionPayload};

#[derive(Debug, Deserialize, Validate)]
pub struct StartAttemptRequest {
    #[validate(length(min = 1, max = 128))]
    pub user_id: String,
    #[serde(default)]
    pub mode: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartAttemptResponse {
    pub attempt_id: Uuid,
    pub mode: String,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct EndAttemptResponse {
    pub attempt_id: Uuid,
    pub ended_at: DateTime<Utc>,
}

/// Selection state carried by the client between requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionState {
    #[serde(default, alias = "current_diff")]
    pub current_difficulty: Option<serde_json::Value>,
    #[serde(default)]
    pub seen_qids: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LastOutcome {
    pub qid: Option<serde_json::Value>,
    #[serde(default)]
    pub correct: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct NextQuestionRequest {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub attempt_id: Option<Uuid>,
    #[serde(default)]
    pub state: SelectionState,
    #[serde(default)]
    pub last_outcome: Option<LastOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServedState {
    pub current_difficulty: Difficulty,
    pub seen_qids: Vec<QuestionId>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum NextQuestionResponse {
    Question {
        #[serde(flatten)]
        question: QuestionPayload,
        state: ServedState,
    },
    Finished {
        finished: bool,
        reason: FinishReason,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        attempt_id: Option<Uuid>,
    },
}

impl NextQuestionResponse {
    pub fn finished(reason: FinishReason, attempt_id: Option<Uuid>) -> Self {
        NextQuestionResponse::Finished {
            finished: true,
            reason,
            message: reason.message().to_string(),
            attempt_id,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, NextQuestionResponse::Finished { .. })
    }
}

/// Learner selection: a single token or a list of tokens.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SelectedTokens {
    Many(Vec<serde_json::Value>),
    One(serde_json::Value),
}

impl SelectedTokens {
    /// Stringified, trimmed tokens; nulls are dropped.
    pub fn into_tokens(self) -> Vec<String> {
        let values = match self {
            SelectedTokens::Many(values) => values,
            SelectedTokens::One(value) => vec![value],
        };
        values
            .into_iter()
            .filter_map(|v| match v {
                serde_json::Value::Null => None,
                serde_json::Value::String(s) => Some(s.trim().to_string()),
                other => Some(other.to_string()),
            })
            .collect()
    }
}

impl Default for SelectedTokens {
    fn default() -> Self {
        SelectedTokens::Many(Vec::new())
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    pub attempt_id: Uuid,
    pub question_id: QuestionId,
    #[serde(default)]
    pub selected: SelectedTokens,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub time_used: Option<f64>,
    #[serde(default)]
    #[validate(length(min = 1, max = 256))]
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitAnswerResponse {
    pub correct: bool,
    pub points_awarded: u32,
    pub attempt_score: u32,
    pub adjustment: Adjustment,
    pub canonical_correct_answers: Vec<String>,
    pub finished: bool,
}
