//! Helpers that narrow the question bank to a candidate set.

use anyhow::Result;
use rand::Rng;
use std::collections::BTreeSet;

use crate::models::{Difficulty, Question, QuestionId};
use crate::storage::QuestionRepository;

/// Uniform pick; consumes the pool.
pub fn choose_random(mut pool: Vec<Question>) -> Option<Question> {
    if pool.is_empty() {
        return None;
    }
    let idx = rand::rng().random_range(0..pool.len());
    Some(pool.swap_remove(idx))
}

/// Random unseen question within one step of `target`, else any unseen question.
pub fn pick_near(
    repo: &dyn QuestionRepository,
    target: Difficulty,
    exclude: &BTreeSet<QuestionId>,
) -> Result<Option<Question>> {
    let near: Vec<Question> = repo
        .find_by_difficulty_range(target.easier(), target.harder())?
        .into_iter()
        .filter(|q| !exclude.contains(&q.id))
        .collect();

    if !near.is_empty() {
        return Ok(choose_random(near));
    }

    Ok(choose_random(repo.find_by_ids_excluded(exclude)?))
}

/// All unseen questions, or the full bank once everything has been seen.
///
/// The second case re-serves seen questions. Only pool-recycling modes may
/// hand such a question out; the dispatcher treats it as a duplicate otherwise.
pub fn pool_all(
    repo: &dyn QuestionRepository,
    exclude: &BTreeSet<QuestionId>,
) -> Result<Vec<Question>> {
    let unseen = repo.find_by_ids_excluded(exclude)?;
    if !unseen.is_empty() {
        return Ok(unseen);
    }
    repo.find_all()
}

/// All unseen questions, never falling back.
pub fn strict_unseen(
    repo: &dyn QuestionRepository,
    exclude: &BTreeSet<QuestionId>,
) -> Result<Vec<Question>> {
    repo.find_by_ids_excluded(exclude)
}
