//! Correctness check for choice questions.
//!
//! Answer keys and learner selections may name options by id or by their
//! text. Both sides are mapped to canonical option ids where possible; tokens
//! that match no option are compared as lowercased text.

use std::collections::{BTreeSet, HashMap};

use crate::models::{Question, QuestionType};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Id(String),
    /// Unmatched token, lowercased.
    Text(String),
}

struct OptionIndex<'a> {
    id_to_text: HashMap<&'a str, &'a str>,
    text_to_id: HashMap<String, &'a str>,
}

impl<'a> OptionIndex<'a> {
    fn new(question: &'a Question) -> Self {
        let mut id_to_text = HashMap::new();
        let mut text_to_id = HashMap::new();
        for option in &question.options {
            let id = option.id.trim();
            let text = option.text.trim();
            id_to_text.insert(id, text);
            text_to_id.insert(text.to_lowercase(), id);
        }
        Self {
            id_to_text,
            text_to_id,
        }
    }

    fn resolve(&self, raw: &str) -> Token {
        let token = raw.trim();
        if let Some((id, _)) = self.id_to_text.get_key_value(token) {
            return Token::Id((*id).to_string());
        }
        let lowered = token.to_lowercase();
        if let Some(id) = self.text_to_id.get(&lowered) {
            return Token::Id((*id).to_string());
        }
        // "02" still names option "2"
        if let Ok(n) = token.parse::<i64>() {
            let numeric = n.to_string();
            if let Some((id, _)) = self.id_to_text.get_key_value(numeric.as_str()) {
                return Token::Id((*id).to_string());
            }
        }
        Token::Text(lowered)
    }

    fn text_of(&self, id: &str) -> Option<&str> {
        self.id_to_text.get(id).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerVerdict {
    pub correct: bool,
    /// Answer key with every token that names an option replaced by its id.
    pub canonical_correct_answers: Vec<String>,
}

/// Raw answer-key tokens, trimmed, empties dropped.
pub fn answer_key_tokens(key: &str) -> Vec<String> {
    key.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn check_answer(question: &Question, submitted: &[String]) -> AnswerVerdict {
    let index = OptionIndex::new(question);
    let raw_key = answer_key_tokens(&question.correct_answers);

    let key: Vec<Token> = raw_key.iter().map(|t| index.resolve(t)).collect();
    let key_ids: BTreeSet<&str> = key
        .iter()
        .filter_map(|t| match t {
            Token::Id(id) => Some(id.as_str()),
            Token::Text(_) => None,
        })
        .collect();
    let key_texts: BTreeSet<String> = raw_key.iter().map(|t| t.to_lowercase()).collect();

    let selected: Vec<Token> = submitted
        .iter()
        .filter(|t| !t.trim().is_empty())
        .map(|t| index.resolve(t))
        .collect();
    let mut selected_ids = BTreeSet::new();
    let mut selected_texts = BTreeSet::new();
    for token in &selected {
        match token {
            Token::Id(id) => selected_ids.insert(id.as_str()),
            Token::Text(text) => selected_texts.insert(text.clone()),
        };
    }

    let correct = match question.qtype {
        QuestionType::Multiple => {
            if key_ids.is_empty() {
                !key_texts.is_empty() && key_texts == selected_texts
            } else {
                key_ids == selected_ids
            }
        }
        _ => match (selected_ids.len(), selected_texts.len()) {
            (1, 0) => {
                let id = selected_ids.iter().next().copied().unwrap_or_default();
                if key_ids.is_empty() {
                    index
                        .text_of(id)
                        .map(|text| key_texts.contains(&text.to_lowercase()))
                        .unwrap_or(false)
                } else {
                    key_ids.contains(id)
                }
            }
            (0, 1) => selected_texts
                .iter()
                .next()
                .map(|text| key_texts.contains(text))
                .unwrap_or(false),
            _ => false,
        },
    };

    let mut canonical_correct_answers: Vec<String> = Vec::new();
    for (raw, token) in raw_key.iter().zip(&key) {
        let canonical = match token {
            Token::Id(id) => id.clone(),
            Token::Text(_) => raw.clone(),
        };
        if !canonical_correct_answers.contains(&canonical) {
            canonical_correct_answers.push(canonical);
        }
    }

    tracing::debug!(
        "Answer check: question={}, qtype={}, key={:?}, selected_ids={:?}, selected_texts={:?}, correct={}",
        question.id,
        question.qtype.as_str(),
        canonical_correct_answers,
        selected_ids,
        selected_texts,
        correct
    );

    AnswerVerdict {
        correct,
        canonical_correct_answers,
    }
}
