use anyhow::Result;

use super::{ModeStrategy, SelectionContext};
use crate::models::{Adjustment, Attempt, FinishReason, ModeOutcome, Question, Selection};
use crate::services::question_pool;
use crate::storage::QuestionRepository;

/// Sudden death: the run ends on the first wrong answer.
///
/// Lifecycle: Active stays Active on a correct answer, and moves to Ended on
/// a wrong answer or when no unseen question remains. Ended is final.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstStrikeStrategy;

impl ModeStrategy for FirstStrikeStrategy {
    fn name(&self) -> &'static str {
        "firststrike"
    }

    fn select_question(
        &self,
        repo: &dyn QuestionRepository,
        ctx: &SelectionContext<'_>,
    ) -> Result<Selection> {
        if ctx.last_answer_correct == Some(false) {
            return Ok(Selection::Finished(FinishReason::WrongAnswer));
        }
        if ctx.attempt_ended {
            return Ok(Selection::Finished(FinishReason::AttemptEnded));
        }

        let unseen = question_pool::strict_unseen(repo, ctx.seen)?;
        Ok(match question_pool::choose_random(unseen) {
            Some(q) => Selection::Question(q),
            None => Selection::Finished(FinishReason::Exhausted),
        })
    }

    fn evaluate_result(
        &self,
        _repo: &dyn QuestionRepository,
        attempt: &Attempt,
        question: &Question,
        correct: bool,
        _time_used: Option<f64>,
    ) -> Result<ModeOutcome> {
        if correct {
            return Ok(ModeOutcome::flat(true));
        }

        tracing::info!(
            "FirstStrike run over: attempt={}, question={}, streak={}",
            attempt.id,
            question.id,
            attempt.score
        );

        Ok(ModeOutcome {
            points: 0,
            adjustment: Adjustment::maintain().with("terminal", true),
            terminal: true,
        })
    }
}
