use anyhow::Result;

use super::{ModeStrategy, SelectionContext};
use crate::models::{Attempt, ModeOutcome, Question, QuestionType, Selection};
use crate::services::question_pool;
use crate::storage::QuestionRepository;

const ELIGIBLE_TYPES: [QuestionType; 3] = [
    QuestionType::Single,
    QuestionType::Multiple,
    QuestionType::Reverse,
];

/// Endless run over single, multiple and reverse questions. Other types are
/// served once those are used up, and only a fully seen bank repeats.
#[derive(Debug, Default, Clone, Copy)]
pub struct LevelInfinityStrategy;

impl ModeStrategy for LevelInfinityStrategy {
    fn name(&self) -> &'static str {
        "levelinfinity"
    }

    fn select_question(
        &self,
        repo: &dyn QuestionRepository,
        ctx: &SelectionContext<'_>,
    ) -> Result<Selection> {
        let mut pool = repo.find_by_type_in(&ELIGIBLE_TYPES)?;
        if pool.is_empty() {
            pool = repo.find_all()?;
        }

        let (unseen, seen): (Vec<Question>, Vec<Question>) =
            pool.into_iter().partition(|q| !ctx.seen.contains(&q.id));

        if let Some(q) = question_pool::choose_random(unseen) {
            return Ok(Selection::Question(q));
        }

        // Eligible types used up: anything unseen in the bank comes before a repeat
        let rest = question_pool::strict_unseen(repo, ctx.seen)?;
        if let Some(q) = question_pool::choose_random(rest) {
            tracing::debug!(
                "LevelInfinity eligible pool seen, serving question {} of another type",
                q.id
            );
            return Ok(Selection::Question(q));
        }

        tracing::debug!("LevelInfinity bank exhausted, recycling {} questions", seen.len());
        Ok(question_pool::choose_random(seen)
            .map(Selection::Recycled)
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

    fn recycles_pool(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Difficulty, QuestionId};
    use crate::services::question_pool::test_support::typed_question;
    use crate::storage::InMemoryQuestionRepository;
    use std::collections::BTreeSet;

    fn repo() -> InMemoryQuestionRepository {
        InMemoryQuestionRepository::from_questions(vec![
            typed_question(1, 3, QuestionType::Single),
            typed_question(2, 3, QuestionType::Reverse),
            typed_question(3, 3, QuestionType::Other("essay".to_string())),
        ])
        .unwrap()
    }

    #[test]
    fn only_eligible_types_are_served() {
        let repo = repo();
        let seen: BTreeSet<QuestionId> = BTreeSet::new();
        let ctx = SelectionContext::new(Difficulty::new(3), &seen);
        for _ in 0..30 {
            match LevelInfinityStrategy.select_question(&repo, &ctx).unwrap() {
                Selection::Question(q) => assert!([1, 2].contains(&q.id)),
                other => panic!("unexpected selection {:?}", other),
            }
        }
    }

    #[test]
    fn wraps_around_when_everything_is_seen() {
        let repo = repo();
        let seen: BTreeSet<QuestionId> = [1, 2, 3].into_iter().collect();
        let ctx = SelectionContext::new(Difficulty::new(3), &seen);
        for _ in 0..10 {
            match LevelInfinityStrategy.select_question(&repo, &ctx).unwrap() {
                Selection::Recycled(q) => assert!([1, 2].contains(&q.id)),
                other => panic!("expected a recycled question, got {:?}", other),
            }
        }
    }

    #[test]
    fn unseen_questions_of_other_types_come_before_repeats() {
        let repo = repo();
        let seen: BTreeSet<QuestionId> = [1, 2].into_iter().collect();
        let ctx = SelectionContext::new(Difficulty::new(3), &seen);
        for _ in 0..20 {
            match LevelInfinityStrategy.select_question(&repo, &ctx).unwrap() {
                Selection::Question(q) => assert_eq!(q.id, 3),
                other => panic!("expected the unseen question, got {:?}", other),
            }
        }
    }

    #[test]
    fn falls_back_to_whole_bank_without_eligible_types() {
        let repo = InMemoryQuestionRepository::from_questions(vec![typed_question(
            5,
            3,
            QuestionType::Other("essay".to_string()),
        )])
        .unwrap();
        let seen: BTreeSet<QuestionId> = BTreeSet::new();
        let ctx = SelectionContext::new(Difficulty::new(3), &seen);
        assert!(matches!(
            LevelInfinityStrategy.select_question(&repo, &ctx).unwrap(),
            Selection::Question(q) if q.id == 5
        ));
    }
}
