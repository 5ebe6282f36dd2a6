use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;

use crate::metrics::{QUESTIONS_SERVED_TOTAL, STRATEGY_FALLBACKS_TOTAL};
use crate::models::{FinishReason, Question, Selection};
use crate::services::modes::{DefaultStrategy, Mode, ModeStrategy, SelectionContext};
use crate::services::question_pool;
use crate::storage::QuestionRepository;

/// Mode name to strategy mapping, built once at startup.
#[derive(Clone)]
pub struct ModeRegistry {
    strategies: HashMap<Mode, Arc<dyn ModeStrategy>>,
    fallback: Arc<dyn ModeStrategy>,
}

impl ModeRegistry {
    /// Registry with the built-in strategy for every mode.
    pub fn standard() -> Self {
        let strategies = Mode::ALL
            .into_iter()
            .map(|mode| (mode, mode.strategy()))
            .collect();
        Self {
            strategies,
            fallback: Arc::new(DefaultStrategy),
        }
    }

    pub fn with_strategy(mut self, mode: Mode, strategy: Arc<dyn ModeStrategy>) -> Self {
        self.strategies.insert(mode, strategy);
        self
    }

    /// Strategy for a free-form mode name; unknown names get the default strategy.
    pub fn resolve(&self, mode_name: &str) -> Arc<dyn ModeStrategy> {
        mode_name
            .parse::<Mode>()
            .ok()
            .and_then(|mode| self.strategies.get(&mode).cloned())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl Default for ModeRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeSource {
    Strategy,
    Recycled,
    Fallback,
}

impl ServeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServeSource::Strategy => "strategy",
            ServeSource::Recycled => "recycled",
            ServeSource::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Dispatched {
    Served {
        question: Question,
        source: ServeSource,
    },
    Finished(FinishReason),
}

pub struct ModeDispatcher<'a> {
    registry: &'a ModeRegistry,
    repo: &'a dyn QuestionRepository,
}

impl<'a> ModeDispatcher<'a> {
    pub fn new(registry: &'a ModeRegistry, repo: &'a dyn QuestionRepository) -> Self {
        Self { registry, repo }
    }

    /// Asks the mode's strategy for a question. A strategy error, an empty
    /// answer or an already seen question falls back to a uniform pick from
    /// the unseen pool. Only a storage failure in that last step is an error.
    pub fn dispatch(&self, mode_name: &str, ctx: &SelectionContext<'_>) -> Result<Dispatched> {
        let strategy = self.registry.resolve(mode_name);
        let label = strategy.name();

        let fallback_reason = match strategy.select_question(self.repo, ctx) {
            Ok(Selection::Question(q)) if !ctx.seen.contains(&q.id) => {
                return Ok(served(label, q, ServeSource::Strategy));
            }
            Ok(Selection::Recycled(q)) if !ctx.seen.contains(&q.id) => {
                return Ok(served(label, q, ServeSource::Strategy));
            }
            Ok(Selection::Recycled(q)) if strategy.recycles_pool() => {
                return Ok(served(label, q, ServeSource::Recycled));
            }
            Ok(Selection::Finished(reason)) => {
                tracing::info!("Mode {} finished the run: {}", label, reason.as_str());
                return Ok(Dispatched::Finished(reason));
            }
            Ok(Selection::Question(q)) | Ok(Selection::Recycled(q)) => {
                tracing::warn!(
                    "Mode {} returned already seen question {}, falling back",
                    label,
                    q.id
                );
                "duplicate"
            }
            Ok(Selection::Empty) => {
                tracing::debug!("Mode {} found no question, falling back", label);
                "empty"
            }
            Err(e) => {
                tracing::warn!("Mode {} selection failed, falling back: {:#}", label, e);
                "error"
            }
        };

        STRATEGY_FALLBACKS_TOTAL
            .with_label_values(&[label, fallback_reason])
            .inc();

        let unseen = question_pool::strict_unseen(self.repo, ctx.seen)?;
        Ok(match question_pool::choose_random(unseen) {
            Some(q) => served(label, q, ServeSource::Fallback),
            None => Dispatched::Finished(FinishReason::Exhausted),
        })
    }
}

fn served(label: &str, question: Question, source: ServeSource) -> Dispatched {
    QUESTIONS_SERVED_TOTAL
        .with_label_values(&[label, source.as_str()])
        .inc();
    Dispatched::Served { question, source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Attempt, Difficulty, ModeOutcome, QuestionId, QuestionType};
    use crate::services::question_pool::test_support::{bank, typed_question};
    use crate::storage::InMemoryQuestionRepository;
    use std::collections::BTreeSet;

    /// Always hands back the first seen question.
    struct RepeatingStrategy;

    impl ModeStrategy for RepeatingStrategy {
        fn name(&self) -> &'static str {
            "repeating"
        }

        fn select_question(
            &self,
            repo: &dyn QuestionRepository,
            ctx: &SelectionContext<'_>,
        ) -> Result<Selection> {
            let first_seen = *ctx.seen.iter().next().expect("test seeds a seen id");
            Ok(Selection::Question(
                repo.find_by_id(first_seen)?.expect("seen id exists"),
            ))
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

    struct FailingStrategy;

    impl ModeStrategy for FailingStrategy {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn select_question(
            &self,
            _repo: &dyn QuestionRepository,
            _ctx: &SelectionContext<'_>,
        ) -> Result<Selection> {
            anyhow::bail!("selection exploded")
        }

        fn evaluate_result(
            &self,
            _repo: &dyn QuestionRepository,
            _attempt: &Attempt,
            _question: &Question,
            _correct: bool,
            _time_used: Option<f64>,
        ) -> Result<ModeOutcome> {
            anyhow::bail!("evaluation exploded")
        }
    }

    fn seen(ids: &[QuestionId]) -> BTreeSet<QuestionId> {
        ids.iter().copied().collect()
    }

    #[test]
    fn duplicate_from_strategy_is_replaced_by_unseen_question() {
        let repo = bank(&[(1, 3), (2, 3), (3, 3)]);
        let registry =
            ModeRegistry::standard().with_strategy(Mode::Adaptive, Arc::new(RepeatingStrategy));
        let dispatcher = ModeDispatcher::new(&registry, &repo);
        let seen = seen(&[1, 2]);
        let ctx = SelectionContext::new(Difficulty::new(3), &seen);

        match dispatcher.dispatch("adaptive", &ctx).unwrap() {
            Dispatched::Served { question, source } => {
                assert_eq!(question.id, 3);
                assert_eq!(source, ServeSource::Fallback);
            }
            other => panic!("unexpected dispatch {:?}", other),
        }
    }

    #[test]
    fn duplicate_with_nothing_unseen_finishes() {
        let repo = bank(&[(1, 3), (2, 3)]);
        let registry =
            ModeRegistry::standard().with_strategy(Mode::Challenger, Arc::new(RepeatingStrategy));
        let dispatcher = ModeDispatcher::new(&registry, &repo);
        let seen = seen(&[1, 2]);
        let ctx = SelectionContext::new(Difficulty::new(3), &seen);

        assert!(matches!(
            dispatcher.dispatch("Challenger", &ctx).unwrap(),
            Dispatched::Finished(FinishReason::Exhausted)
        ));
    }

    #[test]
    fn failing_strategy_is_recovered() {
        let repo = bank(&[(1, 3), (2, 7)]);
        let registry =
            ModeRegistry::standard().with_strategy(Mode::MinuteRush, Arc::new(FailingStrategy));
        let dispatcher = ModeDispatcher::new(&registry, &repo);
        let seen = seen(&[1]);
        let ctx = SelectionContext::new(Difficulty::new(3), &seen);

        match dispatcher.dispatch("minuterush", &ctx).unwrap() {
            Dispatched::Served { question, .. } => assert_eq!(question.id, 2),
            other => panic!("unexpected dispatch {:?}", other),
        }
    }

    #[test]
    fn unknown_mode_uses_default_strategy() {
        let repo = bank(&[(1, 3), (2, 7)]);
        let registry = ModeRegistry::standard();
        assert_eq!(registry.resolve("mystery").name(), "default");

        let dispatcher = ModeDispatcher::new(&registry, &repo);
        let seen = seen(&[2]);
        let ctx = SelectionContext::new(Difficulty::new(3), &seen);
        match dispatcher.dispatch("mystery", &ctx).unwrap() {
            Dispatched::Served { question, source } => {
                assert_eq!(question.id, 1);
                assert_eq!(source, ServeSource::Strategy);
            }
            other => panic!("unexpected dispatch {:?}", other),
        }
    }

    #[test]
    fn recycling_mode_may_serve_seen_questions() {
        let repo = bank(&[(1, 3), (2, 7)]);
        let registry = ModeRegistry::standard();
        let dispatcher = ModeDispatcher::new(&registry, &repo);
        let seen = seen(&[1, 2]);
        let ctx = SelectionContext::new(Difficulty::new(3), &seen);

        match dispatcher.dispatch("levelinfinity", &ctx).unwrap() {
            Dispatched::Served { source, .. } => assert_eq!(source, ServeSource::Recycled),
            other => panic!("unexpected dispatch {:?}", other),
        }

        // Same state under a non-recycling mode finishes
        assert!(matches!(
            dispatcher.dispatch("minuterush", &ctx).unwrap(),
            Dispatched::Finished(FinishReason::Exhausted)
        ));
    }

    #[test]
    fn recycling_mode_serves_unseen_questions_of_any_type_first() {
        let repo = InMemoryQuestionRepository::from_questions(vec![
            typed_question(1, 3, QuestionType::Single),
            typed_question(2, 3, QuestionType::Other("essay".to_string())),
        ])
        .unwrap();
        let registry = ModeRegistry::standard();
        let dispatcher = ModeDispatcher::new(&registry, &repo);
        let seen = seen(&[1]);
        let ctx = SelectionContext::new(Difficulty::new(3), &seen);

        for _ in 0..20 {
            match dispatcher.dispatch("levelinfinity", &ctx).unwrap() {
                Dispatched::Served { question, source } => {
                    assert_eq!(question.id, 2);
                    assert_eq!(source, ServeSource::Strategy);
                }
                other => panic!("unexpected dispatch {:?}", other),
            }
        }
    }

    #[test]
    fn terminal_strategy_result_is_not_overridden() {
        let repo = bank(&[(1, 3), (2, 7)]);
        let registry = ModeRegistry::standard();
        let dispatcher = ModeDispatcher::new(&registry, &repo);
        let seen = seen(&[1]);
        let mut ctx = SelectionContext::new(Difficulty::new(3), &seen);
        ctx.last_answer_correct = Some(false);

        assert!(matches!(
            dispatcher.dispatch("firststrike", &ctx).unwrap(),
            Dispatched::Finished(FinishReason::WrongAnswer)
        ));
    }
}
