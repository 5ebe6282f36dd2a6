use anyhow::Result;

use super::{ModeStrategy, SelectionContext};
use crate::models::{Attempt, ModeOutcome, Question, Selection};
use crate::services::question_pool;
use crate::storage::QuestionRepository;

/// Random question at exactly the requested difficulty, widening to the
/// neighbouring difficulties when none is left.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChallengerStrategy;

impl ModeStrategy for ChallengerStrategy {
    fn name(&self) -> &'static str {
        "challenger"
    }

    fn select_question(
        &self,
        repo: &dyn QuestionRepository,
        ctx: &SelectionContext<'_>,
    ) -> Result<Selection> {
        let exact: Vec<Question> = repo
            .find_by_difficulty_exact(ctx.current_difficulty)?
            .into_iter()
            .filter(|q| !ctx.seen.contains(&q.id))
            .collect();

        let picked = match question_pool::choose_random(exact) {
            Some(q) => Some(q),
            None => question_pool::pick_near(repo, ctx.current_difficulty, ctx.seen)?,
        };

        Ok(picked.map(Selection::Question).unwrap_or(Selection::Empty))
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
