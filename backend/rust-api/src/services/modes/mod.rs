//! Question-selection and scoring policies, one per quiz mode.

use anyhow::Result;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::models::{Attempt, Difficulty, ModeOutcome, Question, QuestionId, Selection};
use crate::storage::QuestionRepository;

use super::question_pool;

pub mod adaptive;
pub mod challenger;
pub mod first_strike;
pub mod level_infinity;
pub mod minute_rush;

pub use adaptive::AdaptiveStrategy;
pub use challenger::ChallengerStrategy;
pub use first_strike::FirstStrikeStrategy;
pub use level_infinity::LevelInfinityStrategy;
pub use minute_rush::MinuteRushStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Adaptive,
    Challenger,
    MinuteRush,
    FirstStrike,
    LevelInfinity,
}

impl Mode {
    pub const ALL: [Mode; 5] = [
        Mode::Adaptive,
        Mode::Challenger,
        Mode::MinuteRush,
        Mode::FirstStrike,
        Mode::LevelInfinity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Adaptive => "adaptive",
            Mode::Challenger => "challenger",
            Mode::MinuteRush => "minuterush",
            Mode::FirstStrike => "firststrike",
            Mode::LevelInfinity => "levelinfinity",
        }
    }

    /// Built-in strategy for this mode.
    pub fn strategy(&self) -> Arc<dyn ModeStrategy> {
        match self {
            Mode::Adaptive => Arc::new(AdaptiveStrategy),
            Mode::Challenger => Arc::new(ChallengerStrategy),
            Mode::MinuteRush => Arc::new(MinuteRushStrategy),
            Mode::FirstStrike => Arc::new(FirstStrikeStrategy),
            Mode::LevelInfinity => Arc::new(LevelInfinityStrategy),
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase().replace(['_', '-', ' '], "");
        match normalized.as_str() {
            "adaptive" => Ok(Mode::Adaptive),
            "challenger" => Ok(Mode::Challenger),
            "minuterush" => Ok(Mode::MinuteRush),
            "firststrike" => Ok(Mode::FirstStrike),
            "levelinfinity" => Ok(Mode::LevelInfinity),
            _ => Err(format!("Unknown quiz mode: {}", value)),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs to a selection call. Carried by the caller between requests.
#[derive(Debug, Clone)]
pub struct SelectionContext<'a> {
    pub current_difficulty: Difficulty,
    pub seen: &'a BTreeSet<QuestionId>,
    /// Correctness of the most recent answer in the attempt, if any.
    pub last_answer_correct: Option<bool>,
    pub attempt_ended: bool,
}

impl<'a> SelectionContext<'a> {
    pub fn new(current_difficulty: Difficulty, seen: &'a BTreeSet<QuestionId>) -> Self {
        Self {
            current_difficulty,
            seen,
            last_answer_correct: None,
            attempt_ended: false,
        }
    }
}

pub trait ModeStrategy: Send + Sync {
    /// Label used in logs and metrics.
    fn name(&self) -> &'static str;

    fn select_question(
        &self,
        repo: &dyn QuestionRepository,
        ctx: &SelectionContext<'_>,
    ) -> Result<Selection>;

    fn evaluate_result(
        &self,
        repo: &dyn QuestionRepository,
        attempt: &Attempt,
        question: &Question,
        correct: bool,
        time_used: Option<f64>,
    ) -> Result<ModeOutcome>;

    /// Whether previously seen questions may be served again once the
    /// unseen pool runs dry.
    fn recycles_pool(&self) -> bool {
        false
    }
}

/// Used for mode names that match no known mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultStrategy;

impl ModeStrategy for DefaultStrategy {
    fn name(&self) -> &'static str {
        "default"
    }

    fn select_question(
        &self,
        repo: &dyn QuestionRepository,
        ctx: &SelectionContext<'_>,
    ) -> Result<Selection> {
        let pool = question_pool::pool_all(repo, ctx.seen)?;
        Ok(question_pool::choose_random(pool)
            .map(Selection::Question)
            .unwrap_or(Selection::Empty))
    }

    fn evaluate_result(
        &self,
        _repo: &dyn QuestionRepository,
        _attempt: &Attempt,
        _question: &Question,
        correct: bool,
        _time_used: Option<f64>,
    ) -> Result<ModeOutcome> {
        Ok(ModeOutcome::flat(correct))
    }
}
