use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::question::{Difficulty, Question};

/// Difficulty hint plus mode-specific metadata returned by a mode's result handler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_difficulty: Option<Difficulty>,
    #[serde(flatten)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Adjustment {
    pub fn maintain() -> Self {
        Self::default()
    }

    pub fn towards(next: Difficulty) -> Self {
        Self {
            next_difficulty: Some(next),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModeOutcome {
    pub points: u32,
    pub adjustment: Adjustment,
    /// The attempt ends with this answer.
    pub terminal: bool,
}

impl ModeOutcome {
    /// 1 point for a correct answer, nothing else.
    pub fn flat(correct: bool) -> Self {
        Self {
            points: u32::from(correct),
            adjustment: Adjustment::maintain(),
            terminal: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    NoQuestions,
    Exhausted,
    WrongAnswer,
    AttemptEnded,
}

impl FinishReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinishReason::NoQuestions => "no_questions",
            FinishReason::Exhausted => "exhausted",
            FinishReason::WrongAnswer => "wrong_answer",
            FinishReason::AttemptEnded => "attempt_ended",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            FinishReason::NoQuestions => "No questions in the question bank.",
            FinishReason::Exhausted => "No unseen questions left.",
            FinishReason::WrongAnswer => "Wrong answer, the run is over.",
            FinishReason::AttemptEnded => "This attempt has already ended.",
        }
    }
}

/// What a strategy produced for one selection request.
#[derive(Debug, Clone)]
pub enum Selection {
    Question(Question),
    /// Previously seen question served on purpose by a pool-recycling mode.
    Recycled(Question),
    Finished(FinishReason),
    Empty,
}
