use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::error::QuizError;
use crate::metrics::ATTEMPTS_TOTAL;
use crate::models::{
    AnswerEvent, Attempt, AttemptStats, LogEntry, ModeOutcome, QuestionId,
};
use crate::storage::AttemptStore;

const WRITE_LOCK_STRIPES: usize = 64;

pub struct AttemptService {
    store: Arc<dyn AttemptStore>,
    writes: Vec<Mutex<()>>,
}

impl AttemptService {
    pub fn new(store: Arc<dyn AttemptStore>) -> Self {
        Self {
            store,
            writes: (0..WRITE_LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }

    /// Held across a read-modify-write of one attempt so its appends keep
    /// submission order. Different attempts rarely share a stripe.
    pub fn write_guard(&self, id: Uuid) -> MutexGuard<'_, ()> {
        self.stripe(id)
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn stripe(&self, id: Uuid) -> &Mutex<()> {
        &self.writes[(id.as_u128() % WRITE_LOCK_STRIPES as u128) as usize]
    }

    pub fn start_attempt(&self, user_id: &str, mode: &str) -> Result<Attempt, QuizError> {
        let attempt = Attempt::new(user_id.trim(), mode.trim());
        self.store.insert(&attempt)?;

        ATTEMPTS_TOTAL.with_label_values(&["started"]).inc();
        tracing::info!(
            "Attempt started: id={}, user={}, mode={}",
            attempt.id,
            attempt.user_id,
            attempt.mode
        );
        Ok(attempt)
    }

    pub fn get(&self, id: Uuid) -> Result<Attempt, QuizError> {
        self.store.get(id)?.ok_or(QuizError::AttemptNotFound(id))
    }

    pub fn save(&self, attempt: &Attempt) -> Result<(), QuizError> {
        self.store.save(attempt)?;
        Ok(())
    }

    /// Sets the end timestamp once; later calls keep the first one.
    pub fn end_attempt(&self, id: Uuid) -> Result<Attempt, QuizError> {
        let _guard = self.write_guard(id);
        let mut attempt = self.get(id)?;
        if attempt.ended_at.is_none() {
            attempt.ended_at = Some(Utc::now());
            self.store.save(&attempt)?;
            ATTEMPTS_TOTAL.with_label_values(&["ended"]).inc();
            tracing::info!("Attempt ended: id={}, score={}", attempt.id, attempt.score);
        }
        Ok(attempt)
    }

    pub fn results(&self, id: Uuid) -> Result<AttemptStats, QuizError> {
        Ok(compute_stats(&self.get(id)?))
    }

    pub fn store(&self) -> &dyn AttemptStore {
        self.store.as_ref()
    }
}

pub fn append_event(attempt: &mut Attempt, event: AnswerEvent) {
    attempt.log.push(LogEntry::Answer(event));
}

pub fn derived_seen_ids(attempt: &Attempt) -> BTreeSet<QuestionId> {
    attempt.log.seen_ids()
}

/// Applies one scored answer: adds points, appends the event and ends the
/// attempt when the mode says so. Call exactly once per submission.
pub fn record_answer(attempt: &mut Attempt, event: AnswerEvent, outcome: &ModeOutcome) {
    attempt.score = attempt.score.saturating_add(outcome.points);
    append_event(attempt, event);
    if outcome.terminal && attempt.ended_at.is_none() {
        attempt.ended_at = Some(Utc::now());
        ATTEMPTS_TOTAL.with_label_values(&["terminated"]).inc();
    }
}

pub fn compute_stats(attempt: &Attempt) -> AttemptStats {
    let events: Vec<AnswerEvent> = attempt.log.answers().cloned().collect();
    let total_questions = events.len();
    let correct_count = events.iter().filter(|ev| ev.correct).count();

    let percentage = (total_questions > 0).then(|| {
        let raw = correct_count as f64 / total_questions as f64 * 100.0;
        (raw * 100.0).round() / 100.0
    });

    let timings: Vec<f64> = events
        .iter()
        .filter_map(|ev| ev.time_used)
        .filter(|t| t.is_finite())
        .collect();
    let average_time_used =
        (!timings.is_empty()).then(|| timings.iter().sum::<f64>() / timings.len() as f64);

    AttemptStats {
        attempt_id: attempt.id,
        mode: attempt.mode.clone(),
        score: attempt.score,
        total_questions,
        correct_count,
        percentage,
        average_time_used,
        started_at: attempt.started_at,
        ended_at: attempt.ended_at,
        events,
    }
}
