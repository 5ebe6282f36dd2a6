use serde::{Deserialize, Serialize};
use std::fmt;

pub type QuestionId = i64;

/// Difficulty rating, always within 1..=10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "u8")]
pub struct Difficulty(u8);

impl Difficulty {
    pub const MIN: Difficulty = Difficulty(1);
    pub const MAX: Difficulty = Difficulty(10);

    /// Clamps any integer into the valid range.
    pub fn new(value: i64) -> Self {
        Difficulty(value.clamp(Self::MIN.0 as i64, Self::MAX.0 as i64) as u8)
    }

    /// Normalizes loosely typed input: numbers are truncated and clamped,
    /// numeric strings are parsed, anything else becomes the minimum.
    pub fn from_raw(raw: &serde_json::Value) -> Self {
        match raw {
            serde_json::Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
                .map(Difficulty::new)
                .unwrap_or(Self::MIN),
            serde_json::Value::String(s) => Self::parse_lenient(s),
            _ => Self::MIN,
        }
    }

    pub fn parse_lenient(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(v) = trimmed.parse::<i64>() {
            return Difficulty::new(v);
        }
        match trimmed.parse::<f64>() {
            Ok(f) if f.is_finite() => Difficulty::new(f as i64),
            _ => Self::MIN,
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn harder(self) -> Self {
        Difficulty::new(self.0 as i64 + 1)
    }

    pub fn easier(self) -> Self {
        Difficulty::new(self.0 as i64 - 1)
    }

    pub fn distance(self, other: Difficulty) -> u8 {
        self.0.abs_diff(other.0)
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty(3)
    }
}

impl From<serde_json::Value> for Difficulty {
    fn from(raw: serde_json::Value) -> Self {
        Difficulty::from_raw(&raw)
    }
}

impl From<Difficulty> for u8 {
    fn from(d: Difficulty) -> Self {
        d.0
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QuestionType {
    #[default]
    Single,
    Multiple,
    Reverse,
    Other(String),
}

impl QuestionType {
    pub fn as_str(&self) -> &str {
        match self {
            QuestionType::Single => "single",
            QuestionType::Multiple => "multiple",
            QuestionType::Reverse => "reverse",
            QuestionType::Other(tag) => tag.as_str(),
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "" | "single" => QuestionType::Single,
            "multiple" => QuestionType::Multiple,
            "reverse" => QuestionType::Reverse,
            other => QuestionType::Other(other.to_string()),
        }
    }
}

impl From<String> for QuestionType {
    fn from(value: String) -> Self {
        QuestionType::parse(&value)
    }
}

impl From<QuestionType> for String {
    fn from(qtype: QuestionType) -> Self {
        qtype.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    #[serde(deserialize_with = "deserialize_option_id")]
    pub id: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub prompt: String,
    #[serde(deserialize_with = "deserialize_options")]
    pub options: Vec<AnswerOption>,
    /// Comma-joined tokens, each an option id or literal option text.
    pub correct_answers: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default, alias = "type", deserialize_with = "deserialize_qtype")]
    pub qtype: QuestionType,
}

impl Question {
    pub fn to_payload(&self) -> QuestionPayload {
        QuestionPayload {
            id: self.id,
            prompt: self.prompt.clone(),
            options: self.options.clone(),
            difficulty: self.difficulty,
            qtype: self.qtype.clone(),
        }
    }
}

/// Outward view of a question; the answer key never leaves the service.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionPayload {
    pub id: QuestionId,
    pub prompt: String,
    pub options: Vec<AnswerOption>,
    pub difficulty: Difficulty,
    pub qtype: QuestionType,
}

fn deserialize_option_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    match raw {
        serde_json::Value::String(s) => Ok(s.trim().to_string()),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "option id must be a string or number, got {}",
            other
        ))),
    }
}

// Options may arrive as an array or as the legacy JSON-encoded string column.
fn deserialize_options<'de, D>(deserializer: D) -> Result<Vec<AnswerOption>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    match raw {
        serde_json::Value::String(encoded) => {
            serde_json::from_str(&encoded).map_err(serde::de::Error::custom)
        }
        serde_json::Value::Null => Ok(Vec::new()),
        other => serde_json::from_value(other).map_err(serde::de::Error::custom),
    }
}

fn deserialize_qtype<'de, D>(deserializer: D) -> Result<QuestionType, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.map(|s| QuestionType::parse(&s)).unwrap_or_default())
}
