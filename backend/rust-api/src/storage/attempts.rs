use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use super::AttemptStore;
use crate::models::{quiz::SubmitAnswerResponse, Attempt, EventLog};

/// Stored shape of an attempt: the event log is kept as serialized JSON text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub id: Uuid,
    pub user_id: String,
    pub mode: String,
    pub score: u32,
    pub details: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl AttemptRecord {
    pub fn from_attempt(attempt: &Attempt) -> Result<Self> {
        let details = attempt
            .log
            .to_json()
            .context("Failed to serialize attempt event log")?;
        Ok(Self {
            id: attempt.id,
            user_id: attempt.user_id.clone(),
            mode: attempt.mode.clone(),
            score: attempt.score,
            details: Some(details),
            started_at: attempt.started_at,
            ended_at: attempt.ended_at,
        })
    }

    pub fn into_attempt(self) -> Attempt {
        Attempt {
            log: EventLog::from_json(self.details.as_deref()),
            id: self.id,
            user_id: self.user_id,
            mode: self.mode,
            score: self.score,
            started_at: self.started_at,
            ended_at: self.ended_at,
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryAttemptStore {
    records: RwLock<HashMap<Uuid, AttemptRecord>>,
    responses: RwLock<HashMap<(Uuid, String), SubmitAnswerResponse>>,
}

impl InMemoryAttemptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a raw record as-is, bypassing serialization of the log.
    pub fn insert_record(&self, record: AttemptRecord) -> Result<()> {
        let mut guard = self
            .records
            .write()
            .map_err(|_| anyhow!("Attempt store lock poisoned"))?;
        guard.insert(record.id, record);
        Ok(())
    }
}

impl AttemptStore for InMemoryAttemptStore {
    fn insert(&self, attempt: &Attempt) -> Result<()> {
        let record = AttemptRecord::from_attempt(attempt)?;
        let mut guard = self
            .records
            .write()
            .map_err(|_| anyhow!("Attempt store lock poisoned"))?;
        if guard.contains_key(&record.id) {
            return Err(anyhow!("Attempt {} already exists", record.id));
        }
        guard.insert(record.id, record);
        Ok(())
    }

    fn get(&self, id: Uuid) -> Result<Option<Attempt>> {
        let guard = self
            .records
            .read()
            .map_err(|_| anyhow!("Attempt store lock poisoned"))?;
        Ok(guard.get(&id).cloned().map(AttemptRecord::into_attempt))
    }

    fn save(&self, attempt: &Attempt) -> Result<()> {
        let record = AttemptRecord::from_attempt(attempt)?;
        let mut guard = self
            .records
            .write()
            .map_err(|_| anyhow!("Attempt store lock poisoned"))?;
        match guard.get_mut(&record.id) {
            Some(existing) => {
                *existing = record;
                Ok(())
            }
            None => Err(anyhow!("Attempt {} does not exist", record.id)),
        }
    }

    fn cached_response(&self, attempt_id: Uuid, key: &str) -> Result<Option<SubmitAnswerResponse>> {
        let guard = self
            .responses
            .read()
            .map_err(|_| anyhow!("Response cache lock poisoned"))?;
        Ok(guard.get(&(attempt_id, key.to_string())).cloned())
    }

    fn cache_response(
        &self,
        attempt_id: Uuid,
        key: &str,
        response: &SubmitAnswerResponse,
    ) -> Result<()> {
        let mut guard = self
            .responses
            .write()
            .map_err(|_| anyhow!("Response cache lock poisoned"))?;
        guard.insert((attempt_id, key.to_string()), response.clone());
        Ok(())
    }
}
