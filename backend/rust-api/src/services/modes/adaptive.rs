use anyhow::Result;
use std::collections::BTreeSet;

use super::{ModeStrategy, SelectionContext};
use crate::models::{
    Adjustment, Attempt, Difficulty, ModeOutcome, Question, QuestionId, Selection,
};
use crate::storage::QuestionRepository;

const FAST_ANSWER_SECS: f64 = 5.0;
const SLOW_ANSWER_SECS: f64 = 10.0;

/// Deterministic difficulty-tracking mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct AdaptiveStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdaptiveRule {
    WrongOrSlow,
    FastCorrect,
    Steady,
    UntimedCorrect,
}

impl AdaptiveRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdaptiveRule::WrongOrSlow => "wrong_or_slow",
            AdaptiveRule::FastCorrect => "fast_correct",
            AdaptiveRule::Steady => "steady",
            AdaptiveRule::UntimedCorrect => "untimed_correct",
        }
    }
}

/// Next difficulty from the answered question's difficulty, correctness and time.
pub fn next_difficulty(
    current: Difficulty,
    correct: bool,
    time_used: Option<f64>,
) -> (Difficulty, AdaptiveRule) {
    // Negative or non-finite timings are treated as unknown
    let t = time_used.filter(|t| t.is_finite() && *t >= 0.0);

    match (correct, t) {
        (false, _) => (current.easier(), AdaptiveRule::WrongOrSlow),
        (true, Some(t)) if t > SLOW_ANSWER_SECS => (current.easier(), AdaptiveRule::WrongOrSlow),
        (true, Some(t)) if t < FAST_ANSWER_SECS => (current.harder(), AdaptiveRule::FastCorrect),
        (true, Some(_)) => (current, AdaptiveRule::Steady),
        (true, None) => (current, AdaptiveRule::UntimedCorrect),
    }
}

/// Exact difficulty match with the lowest id, else the closest unseen
/// question ordered by distance, then difficulty, then id.
pub fn closest_unseen(
    repo: &dyn QuestionRepository,
    target: Difficulty,
    seen: &BTreeSet<QuestionId>,
) -> Result<Option<Question>> {
    let exact = repo
        .find_by_difficulty_exact(target)?
        .into_iter()
        .filter(|q| !seen.contains(&q.id))
        .min_by_key(|q| q.id);
    if exact.is_some() {
        return Ok(exact);
    }

    Ok(repo
        .find_by_ids_excluded(seen)?
        .into_iter()
        .min_by_key(|q| (q.difficulty.distance(target), q.difficulty, q.id)))
}

impl ModeStrategy for AdaptiveStrategy {
    fn name(&self) -> &'static str {
        "adaptive"
    }

    fn select_question(
        &self,
        repo: &dyn QuestionRepository,
        ctx: &SelectionContext<'_>,
    ) -> Result<Selection> {
        Ok(closest_unseen(repo, ctx.current_difficulty, ctx.seen)?
            .map(Selection::Question)
            .unwrap_or(Selection::Empty))
    }

    fn evaluate_result(
        &self,
        repo: &dyn QuestionRepository,
        attempt: &Attempt,
        question: &Question,
        correct: bool,
        time_used: Option<f64>,
    ) -> Result<ModeOutcome> {
        let (next, rule) = next_difficulty(question.difficulty, correct, time_used);

        tracing::info!(
            "Adaptive result: attempt={}, question={}, correct={}, time_used={:?}, difficulty {} -> {} ({})",
            attempt.id,
            question.id,
            correct,
            time_used,
            question.difficulty,
            next,
            rule.as_str()
        );

        let mut adjustment = Adjustment::towards(next).with("rule", rule.as_str());

        let mut seen = attempt.log.seen_ids();
        seen.insert(question.id);
        match closest_unseen(repo, next, &seen) {
            Ok(Some(preview)) => {
                adjustment = adjustment
                    .with("preview_qid", preview.id)
                    .with("preview_difficulty", preview.difficulty.get());
            }
            Ok(None) => {
                tracing::debug!(
                    "Adaptive preview: no unseen question left for attempt {}",
                    attempt.id
                );
            }
            Err(e) => {
                tracing::warn!("Adaptive preview failed for attempt {}: {}", attempt.id, e);
            }
        }

        Ok(ModeOutcome {
            points: u32::from(correct),
            adjustment,
            terminal: false,
        })
    }
}
