use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use super::question::{Difficulty, QuestionId};

/// One answered question. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerEvent {
    #[serde(deserialize_with = "deserialize_qid")]
    pub qid: QuestionId,
    #[serde(default, deserialize_with = "deserialize_selected")]
    pub selected: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_correct")]
    pub correct: bool,
    #[serde(default, deserialize_with = "deserialize_time_used")]
    pub time_used: Option<f64>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Log entries without a `qid` are metadata (e.g. the attempt header) and
/// never count as answered questions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LogEntry {
    Answer(AnswerEvent),
    Meta(serde_json::Map<String, serde_json::Value>),
}

// Classified by the presence of `qid`, so an odd field never hides an answer.
impl<'de> Deserialize<'de> for LogEntry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let map = match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Object(map) => map,
            other => {
                tracing::warn!("Non-object event log entry kept as metadata: {}", other);
                let mut map = serde_json::Map::new();
                map.insert("value".to_string(), other);
                return Ok(LogEntry::Meta(map));
            }
        };

        if !map.contains_key("qid") {
            return Ok(LogEntry::Meta(map));
        }

        match serde_json::from_value::<AnswerEvent>(serde_json::Value::Object(map.clone())) {
            Ok(event) => Ok(LogEntry::Answer(event)),
            Err(e) => {
                tracing::warn!(
                    "Event log entry with unreadable qid {:?} kept as metadata: {}",
                    map.get("qid"),
                    e
                );
                Ok(LogEntry::Meta(map))
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventLog(Vec<LogEntry>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a serialized log. Absent or malformed text yields an empty log.
    pub fn from_json(raw: Option<&str>) -> Self {
        let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
            return Self::default();
        };

        match serde_json::from_str::<Vec<LogEntry>>(raw) {
            Ok(entries) => EventLog(entries),
            Err(e) => {
                tracing::warn!("Event log is malformed, treating as empty: {}", e);
                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.0)
    }

    pub fn push(&mut self, entry: LogEntry) {
        self.0.push(entry);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.0
    }

    pub fn answers(&self) -> impl Iterator<Item = &AnswerEvent> {
        self.0.iter().filter_map(|entry| match entry {
            LogEntry::Answer(ev) => Some(ev),
            LogEntry::Meta(_) => None,
        })
    }

    pub fn last_answer(&self) -> Option<&AnswerEvent> {
        self.answers().last()
    }

    pub fn seen_ids(&self) -> BTreeSet<QuestionId> {
        self.answers().map(|ev| ev.qid).collect()
    }

    pub fn answered_count(&self) -> usize {
        self.answers().count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    pub id: Uuid,
    pub user_id: String,
    /// Free-form; matched case-insensitively against known modes.
    pub mode: String,
    pub score: u32,
    pub log: EventLog,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Attempt {
    pub fn new(user_id: impl Into<String>, mode: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            mode: mode.into(),
            score: 0,
            log: EventLog::new(),
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    pub fn is_ended(&self) -> bool {
        self.ended_at.is_some()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AttemptStats {
    pub attempt_id: Uuid,
    pub mode: String,
    pub score: u32,
    pub total_questions: usize,
    pub correct_count: usize,
    pub percentage: Option<f64>,
    pub average_time_used: Option<f64>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub events: Vec<AnswerEvent>,
}

// Legacy logs stored qids as strings.
fn deserialize_qid<'de, D>(deserializer: D) -> Result<QuestionId, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| serde::de::Error::custom("qid must be an integer")),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<QuestionId>()
            .map_err(serde::de::Error::custom),
        _ => Err(serde::de::Error::custom("qid must be an integer")),
    }
}

fn deserialize_selected<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let token = |v: serde_json::Value| match v {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.trim().to_string()),
        other => Some(other.to_string()),
    };
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Array(values) => values.into_iter().filter_map(token).collect(),
        other => token(other).into_iter().collect(),
    })
}

fn deserialize_correct<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Bool(b) => b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        serde_json::Value::String(s) => {
            matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "yes")
        }
        _ => false,
    })
}

// Clients sent timings as numbers or numeric strings; anything else is unknown.
fn deserialize_time_used<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let parsed = match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(parsed.filter(|t| t.is_finite()))
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => parse_timestamp(&s),
        _ => None,
    })
}

/// RFC 3339 first, then a naive ISO 8601 timestamp read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_or_absent_log_is_empty() {
        assert!(EventLog::from_json(None).entries().is_empty());
        assert!(EventLog::from_json(Some("")).entries().is_empty());
        assert!(EventLog::from_json(Some("{not json")).entries().is_empty());
    }

    #[test]
    fn metadata_entries_are_ignored_for_seen_and_counts() {
        let log = EventLog::from_json(Some(
            r#"[
                {"mode": "adaptive", "started": true},
                {"qid": 4, "selected": ["1"], "correct": true, "time_used": 3.5, "difficulty": 3},
                {"qid": "9", "selected": ["2"], "correct": false, "time_used": null, "difficulty": 4},
                {"qid": 4, "selected": ["1"], "correct": true, "difficulty": 3}
            ]"#,
        ));

        assert_eq!(log.entries().len(), 4);
        assert_eq!(log.answered_count(), 3);
        assert_eq!(log.seen_ids().into_iter().collect::<Vec<_>>(), vec![4, 9]);
        assert_eq!(log.last_answer().map(|ev| ev.qid), Some(4));
    }

    #[test]
    fn log_survives_serialization() {
        let mut log = EventLog::new();
        log.push(LogEntry::Answer(AnswerEvent {
            qid: 12,
            selected: vec!["3".to_string()],
            correct: false,
            time_used: Some(11.0),
            difficulty: Difficulty::new(6),
            timestamp: None,
        }));

        let json = log.to_json().unwrap();
        let parsed = EventLog::from_json(Some(&json));
        assert_eq!(parsed, log);
        assert!(!parsed.last_answer().unwrap().correct);
    }

    #[test]
    fn legacy_events_still_count_as_answers() {
        let log = EventLog::from_json(Some(
            r#"[
                {"qid": 1, "selected": "2", "correct": false, "time_used": 7, "timestamp": "2024-05-01T12:00:00.123456"},
                {"qid": 2, "selected": ["1"], "correct": true, "time_used": "4", "timestamp": "2024-05-01 12:00:04"},
                {"qid": "oops", "note": "broken"}
            ]"#,
        ));

        assert_eq!(log.entries().len(), 3);
        assert_eq!(log.answered_count(), 2);
        assert_eq!(log.seen_ids().into_iter().collect::<Vec<_>>(), vec![1, 2]);

        let events: Vec<&AnswerEvent> = log.answers().collect();
        assert_eq!(events[0].selected, vec!["2"]);
        assert_eq!(events[0].time_used, Some(7.0));
        assert_eq!(
            events[0].timestamp.map(|t| t.to_rfc3339()),
            Some("2024-05-01T12:00:00.123456+00:00".to_string())
        );
        assert_eq!(events[1].time_used, Some(4.0));
        assert!(events[1].timestamp.is_some());
        assert!(log.last_answer().unwrap().correct);
    }

    #[test]
    fn wrong_legacy_answer_is_the_last_answer() {
        let log = EventLog::from_json(Some(
            r#"[{"qid": 3, "correct": false, "time_used": "fast", "timestamp": "yesterday"}]"#,
        ));

        let last = log.last_answer().expect("entry with qid is an answer");
        assert_eq!(last.qid, 3);
        assert!(!last.correct);
        assert_eq!(last.time_used, None);
        assert_eq!(last.timestamp, None);
    }
}
