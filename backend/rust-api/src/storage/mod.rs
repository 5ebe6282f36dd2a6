//! Storage collaborators used by the quiz core.
//!
//! The core only depends on the two traits below; the in-memory
//! implementations back the HTTP service and the tests.

use anyhow::Result;
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::models::{
    quiz::SubmitAnswerResponse, Attempt, Difficulty, Question, QuestionId, QuestionType,
};

pub mod attempts;
pub mod questions;

pub use attempts::InMemoryAttemptStore;
pub use questions::InMemoryQuestionRepository;

pub trait QuestionRepository: Send + Sync {
    /// Inclusive on both ends.
    fn find_by_difficulty_range(&self, low: Difficulty, high: Difficulty) -> Result<Vec<Question>>;

    fn find_by_difficulty_exact(&self, difficulty: Difficulty) -> Result<Vec<Question>>;

    fn find_by_type_in(&self, types: &[QuestionType]) -> Result<Vec<Question>>;

    fn find_all(&self) -> Result<Vec<Question>>;

    fn find_by_ids_excluded(&self, excluded: &BTreeSet<QuestionId>) -> Result<Vec<Question>>;

    fn find_by_id(&self, id: QuestionId) -> Result<Option<Question>>;

    fn count(&self) -> Result<usize>;
}

/// Persistence for attempts. Callers serialize writes per attempt.
pub trait AttemptStore: Send + Sync {
    fn insert(&self, attempt: &Attempt) -> Result<()>;

    fn get(&self, id: Uuid) -> Result<Option<Attempt>>;

    fn save(&self, attempt: &Attempt) -> Result<()>;

    fn cached_response(&self, attempt_id: Uuid, key: &str) -> Result<Option<SubmitAnswerResponse>>;

    fn cache_response(
        &self,
        attempt_id: Uuid,
        key: &str,
        response: &SubmitAnswerResponse,
    ) -> Result<()>;
}
