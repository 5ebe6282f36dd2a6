use anyhow::Result;

use super::{ModeStrategy, SelectionContext};
use crate::models::{Attempt, ModeOutcome, Question, Selection};
use crate::services::question_pool;
use crate::storage::QuestionRepository;

/// Timed run over the whole bank; difficulty plays no part.
#[derive(Debug, Default, Clone, Copy)]
pub struct MinuteRushStrategy;

impl ModeStrategy for MinuteRushStrategy {
    fn name(&self) -> &'static str {
        "minuterush"
    }

    // pool_all may hand back a seen question once the bank is exhausted;
    // the dispatcher rejects it as a duplicate.
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
