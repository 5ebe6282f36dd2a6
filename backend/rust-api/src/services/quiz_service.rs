use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::QuizError;
use crate::metrics::{ANSWERS_SUBMITTED_TOTAL, QUIZ_FINISHED_TOTAL};
use crate::models::quiz::{
    NextQuestionRequest, NextQuestionResponse, ServedState, SubmitAnswerRequest,
    SubmitAnswerResponse,
};
use crate::models::{AnswerEvent, Difficulty, FinishReason, ModeOutcome, QuestionId};
use crate::services::answer_matching;
use crate::services::attempt_service::{self, AttemptService};
use crate::services::mode_dispatcher::{Dispatched, ModeDispatcher, ModeRegistry};
use crate::services::modes::SelectionContext;
use crate::storage::QuestionRepository;

/// Entry points used by the HTTP layer: pick the next question and score a submission.
pub struct QuizService {
    questions: Arc<dyn QuestionRepository>,
    attempts: Arc<AttemptService>,
    registry: Arc<ModeRegistry>,
    default_mode: String,
    default_difficulty: Difficulty,
}

impl QuizService {
    pub fn new(
        questions: Arc<dyn QuestionRepository>,
        attempts: Arc<AttemptService>,
        registry: Arc<ModeRegistry>,
        default_mode: String,
        default_difficulty: Difficulty,
    ) -> Self {
        Self {
            questions,
            attempts,
            registry,
            default_mode,
            default_difficulty,
        }
    }

    pub fn select_next(&self, req: NextQuestionRequest) -> Result<NextQuestionResponse, QuizError> {
        let attempt = req
            .attempt_id
            .map(|id| self.attempts.get(id))
            .transpose()?;

        let mode = req
            .mode
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .or(attempt.as_ref().map(|a| a.mode.as_str()))
            .unwrap_or(self.default_mode.as_str())
            .trim()
            .to_lowercase();

        let current_difficulty = req
            .state
            .current_difficulty
            .as_ref()
            .map(Difficulty::from_raw)
            .unwrap_or(self.default_difficulty);

        let mut seen = parse_seen_ids(&req.state.seen_qids);
        let mut last_answer_correct = None;
        if let Some(outcome) = &req.last_outcome {
            if let Some(qid) = outcome.qid.as_ref().and_then(parse_question_id) {
                seen.insert(qid);
            }
            last_answer_correct = outcome.correct;
        }
        if let Some(attempt) = &attempt {
            seen.extend(attempt_service::derived_seen_ids(attempt));
            if let Some(last) = attempt.log.last_answer() {
                last_answer_correct = Some(last.correct);
            }
        }

        let attempt_id = attempt.as_ref().map(|a| a.id);

        if self.questions.count()? == 0 {
            return Ok(self.finished(FinishReason::NoQuestions, attempt_id));
        }

        let ctx = SelectionContext {
            current_difficulty,
            seen: &seen,
            last_answer_correct,
            attempt_ended: attempt.as_ref().is_some_and(|a| a.is_ended()),
        };

        let dispatcher = ModeDispatcher::new(&self.registry, self.questions.as_ref());
        match dispatcher.dispatch(&mode, &ctx)? {
            Dispatched::Served { question, source } => {
                tracing::info!(
                    "Serving question {} (difficulty {}) for mode={}, attempt={:?}, source={}",
                    question.id,
                    question.difficulty,
                    mode,
                    attempt_id,
                    source.as_str()
                );
                Ok(NextQuestionResponse::Question {
                    question: question.to_payload(),
                    state: ServedState {
                        current_difficulty,
                        seen_qids: seen.into_iter().collect(),
                    },
                })
            }
            Dispatched::Finished(reason) => Ok(self.finished(reason, attempt_id)),
        }
    }

    pub fn evaluate(&self, req: SubmitAnswerRequest) -> Result<SubmitAnswerResponse, QuizError> {
        let _guard = self.attempts.write_guard(req.attempt_id);
        let mut attempt = self.attempts.get(req.attempt_id)?;

        if let Some(key) = &req.idempotency_key {
            if let Some(cached) = self.attempts.store().cached_response(attempt.id, key)? {
                tracing::info!(
                    "Returning cached response for attempt={}, idempotency_key={}",
                    attempt.id,
                    key
                );
                return Ok(cached);
            }
        }

        if attempt.is_ended() {
            return Err(QuizError::InvalidRequest(format!(
                "attempt {} has already ended",
                attempt.id
            )));
        }

        let question = self
            .questions
            .find_by_id(req.question_id)?
            .ok_or(QuizError::QuestionNotFound(req.question_id))?;

        let selected = req.selected.into_tokens();
        let verdict = answer_matching::check_answer(&question, &selected);
        let time_used = req.time_used.filter(|t| t.is_finite() && *t >= 0.0);

        let mode = req
            .mode
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(attempt.mode.as_str())
            .trim()
            .to_lowercase();
        let strategy = self.registry.resolve(&mode);

        let outcome = strategy
            .evaluate_result(
                self.questions.as_ref(),
                &attempt,
                &question,
                verdict.correct,
                time_used,
            )
            .unwrap_or_else(|e| {
                tracing::warn!(
                    "Mode {} result handler failed for attempt {}, using default scoring: {:#}",
                    strategy.name(),
                    attempt.id,
                    e
                );
                ModeOutcome::flat(verdict.correct)
            });

        let event = AnswerEvent {
            qid: question.id,
            selected,
            correct: verdict.correct,
            time_used,
            difficulty: question.difficulty,
            timestamp: Some(Utc::now()),
        };
        attempt_service::record_answer(&mut attempt, event, &outcome);
        self.attempts.save(&attempt)?;

        ANSWERS_SUBMITTED_TOTAL
            .with_label_values(&[strategy.name(), if verdict.correct { "true" } else { "false" }])
            .inc();

        tracing::info!(
            "Answer processed: attempt={}, question={}, mode={}, correct={}, points={}, score={}",
            attempt.id,
            question.id,
            mode,
            verdict.correct,
            outcome.points,
            attempt.score
        );

        let response = SubmitAnswerResponse {
            correct: verdict.correct,
            points_awarded: outcome.points,
            attempt_score: attempt.score,
            adjustment: outcome.adjustment,
            canonical_correct_answers: verdict.canonical_correct_answers,
            finished: outcome.terminal,
        };

        if let Some(key) = &req.idempotency_key {
            self.attempts
                .store()
                .cache_response(attempt.id, key, &response)?;
        }

        Ok(response)
    }

    fn finished(&self, reason: FinishReason, attempt_id: Option<uuid::Uuid>) -> NextQuestionResponse {
        QUIZ_FINISHED_TOTAL.with_label_values(&[reason.as_str()]).inc();
        tracing::info!(
            "No question served: reason={}, attempt={:?}",
            reason.as_str(),
            attempt_id
        );
        NextQuestionResponse::finished(reason, attempt_id)
    }
}

fn parse_question_id(raw: &serde_json::Value) -> Option<QuestionId> {
    match raw {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Seen ids from client state; entries that are not integers are dropped.
fn parse_seen_ids(raw: &[serde_json::Value]) -> BTreeSet<QuestionId> {
    raw.iter().filter_map(parse_question_id).collect()
}
