use anyhow::Context;
use std::sync::Arc;

use crate::config::Config;
use crate::storage::{InMemoryAttemptStore, InMemoryQuestionRepository, QuestionRepository};

pub mod answer_matching;
pub mod attempt_service;
pub mod mode_dispatcher;
pub mod modes;
pub mod question_pool;
pub mod quiz_service;

use attempt_service::AttemptService;
use mode_dispatcher::ModeRegistry;
use quiz_service::QuizService;

pub struct AppState {
    pub config: Config,
    pub questions: Arc<dyn QuestionRepository>,
    pub attempts: Arc<AttemptService>,
    pub quiz: QuizService,
}

impl AppState {
    /// Loads the question bank named in the config, or starts with an empty one.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let questions = match &config.questions_path {
            Some(path) => InMemoryQuestionRepository::from_json_file(path)
                .with_context(|| format!("Failed to load question bank from {}", path))?,
            None => {
                tracing::warn!("No question bank configured, starting with an empty bank");
                InMemoryQuestionRepository::new()
            }
        };

        Ok(Self::with_repository(config, Arc::new(questions)))
    }

    pub fn with_repository(config: Config, questions: Arc<dyn QuestionRepository>) -> Self {
        let attempts = Arc::new(AttemptService::new(Arc::new(InMemoryAttemptStore::new())));
        let quiz = QuizService::new(
            questions.clone(),
            attempts.clone(),
            Arc::new(ModeRegistry::standard()),
            config.default_mode.clone(),
            config.default_difficulty,
        );

        Self {
            config,
            questions,
            attempts,
            quiz,
        }
    }
}
