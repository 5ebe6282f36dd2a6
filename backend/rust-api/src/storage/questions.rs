use anyhow::{anyhow, bail, Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::RwLock;

use super::QuestionRepository;
use crate::models::{Difficulty, Question, QuestionId, QuestionType};

/// Question bank held in memory, keyed and ordered by id.
#[derive(Debug, Default)]
pub struct InMemoryQuestionRepository {
    questions: RwLock<BTreeMap<QuestionId, Question>>,
}

impl InMemoryQuestionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_questions(questions: Vec<Question>) -> Result<Self> {
        let mut by_id = BTreeMap::new();
        for question in questions {
            let id = question.id;
            if by_id.insert(id, question).is_some() {
                bail!("Duplicate question id {} in question bank", id);
            }
        }
        Ok(Self {
            questions: RwLock::new(by_id),
        })
    }

    /// Loads a JSON array of questions.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read question bank {}", path.display()))?;
        let questions: Vec<Question> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse question bank {}", path.display()))?;

        tracing::info!(
            "Loaded {} questions from {}",
            questions.len(),
            path.display()
        );
        Self::from_questions(questions)
    }

    fn collect_where<F>(&self, predicate: F) -> Result<Vec<Question>>
    where
        F: Fn(&Question) -> bool,
    {
        let guard = self
            .questions
            .read()
            .map_err(|_| anyhow!("Question bank lock poisoned"))?;
        Ok(guard.values().filter(|q| predicate(q)).cloned().collect())
    }
}

impl QuestionRepository for InMemoryQuestionRepository {
    fn find_by_difficulty_range(&self, low: Difficulty, high: Difficulty) -> Result<Vec<Question>> {
        self.collect_where(|q| q.difficulty >= low && q.difficulty <= high)
    }

    fn find_by_difficulty_exact(&self, difficulty: Difficulty) -> Result<Vec<Question>> {
        self.collect_where(|q| q.difficulty == difficulty)
    }

    fn find_by_type_in(&self, types: &[QuestionType]) -> Result<Vec<Question>> {
        self.collect_where(|q| types.contains(&q.qtype))
    }

    fn find_all(&self) -> Result<Vec<Question>> {
        self.collect_where(|_| true)
    }

    fn find_by_ids_excluded(&self, excluded: &BTreeSet<QuestionId>) -> Result<Vec<Question>> {
        self.collect_where(|q| !excluded.contains(&q.id))
    }

    fn find_by_id(&self, id: QuestionId) -> Result<Option<Question>> {
        let guard = self
            .questions
            .read()
            .map_err(|_| anyhow!("Question bank lock poisoned"))?;
        Ok(guard.get(&id).cloned())
    }

    fn count(&self) -> Result<usize> {
        let guard = self
            .questions
            .read()
            .map_err(|_| anyhow!("Question bank lock poisoned"))?;
        Ok(guard.len())
    }
}
