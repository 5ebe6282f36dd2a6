#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use quizarena_api::{
    config::Config, create_router, models::Question, services::AppState,
    storage::InMemoryQuestionRepository,
};

/// Small bank covering every question type and both legacy encodings.
pub fn sample_bank() -> Value {
    json!([
        {
            "id": 1,
            "prompt": "Capital of France?",
            "options": [{"id": "1", "text": "Paris"}, {"id": "2", "text": "Rome"}],
            "correct_answers": "1",
            "difficulty": 3,
            "qtype": "single"
        },
        {
            "id": 2,
            "prompt": "Pick the odd numbers",
            "options": [{"id": "1", "text": "One"}, {"id": "2", "text": "Two"}, {"id": "3", "text": "Three"}],
            "correct_answers": "1,3",
            "difficulty": 4,
            "qtype": "multiple"
        },
        {
            "id": 3,
            "prompt": "Capital of Italy?",
            "options": [{"id": "1", "text": "Paris"}, {"id": "2", "text": "Rome"}],
            "correct_answers": "Rome",
            "difficulty": "5"
        },
        {
            "id": 4,
            "prompt": "Is the earth flat?",
            "options": "[{\"id\": \"1\", \"text\": \"Yes\"}, {\"id\": \"2\", \"text\": \"No\"}]",
            "correct_answers": "2",
            "difficulty": 2,
            "qtype": "reverse"
        },
        {
            "id": 5,
            "prompt": "Largest planet?",
            "options": [{"id": "1", "text": "Jupiter"}, {"id": "2", "text": "Mars"}],
            "correct_answers": "Jupiter",
            "difficulty": 7,
            "qtype": "single"
        }
    ])
}

pub fn create_test_app() -> Router {
    create_test_app_with_bank(sample_bank())
}

pub fn create_test_app_with_bank(bank: Value) -> Router {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let questions: Vec<Question> =
        serde_json::from_value(bank).expect("test bank should deserialize");
    let repo = InMemoryQuestionRepository::from_questions(questions)
        .expect("test bank should have unique ids");

    let app_state = Arc::new(AppState::with_repository(Config::default(), Arc::new(repo)));
    create_router(app_state)
}

pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_string(&value).unwrap())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, "POST", uri, Some(body)).await
}

pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, "GET", uri, None).await
}

pub async fn start_attempt(app: &Router, mode: &str) -> String {
    let (status, json) = post_json(
        app,
        "/api/v1/attempts",
        json!({ "user_id": "learner-1", "mode": mode }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "unexpected body: {}", json);
    json["attempt_id"].as_str().unwrap().to_string()
}

pub async fn answer(app: &Router, attempt_id: &str, question_id: i64, selected: Value) -> Value {
    let (status, json) = post_json(
        app,
        "/api/v1/quiz/answer",
        json!({
            "attempt_id": attempt_id,
            "question_id": question_id,
            "selected": selected,
            "time_used": 3.0
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "unexpected body: {}", json);
    json
}
