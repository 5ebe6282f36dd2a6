mod common;

use axum::http::StatusCode;
use common::{answer, create_test_app, get_json, post_json, start_attempt};
use serde_json::json;

#[tokio::test]
async fn test_single_choice_by_id_and_text() {
    let app = create_test_app();
    let attempt_id = start_attempt(&app, "challenger").await;

    let by_id = answer(&app, &attempt_id, 1, json!("1")).await;
    assert_eq!(by_id["correct"], true);
    assert_eq!(by_id["points_awarded"], 1);
    assert_eq!(by_id["canonical_correct_answers"], json!(["1"]));

    let by_text = answer(&app, &attempt_id, 1, json!(["paris"])).await;
    assert_eq!(by_text["correct"], true);
    assert_eq!(by_text["attempt_score"], 2);

    let wrong = answer(&app, &attempt_id, 1, json!("2")).await;
    assert_eq!(wrong["correct"], false);
    assert_eq!(wrong["points_awarded"], 0);
    assert_eq!(wrong["attempt_score"], 2);
}

#[tokio::test]
async fn test_multiple_choice_is_order_independent() {
    let app = create_test_app();
    let attempt_id = start_attempt(&app, "challenger").await;

    let result = answer(&app, &attempt_id, 2, json!(["3", "1"])).await;
    assert_eq!(result["correct"], true);
    assert_eq!(result["canonical_correct_answers"], json!(["1", "3"]));

    let partial = answer(&app, &attempt_id, 2, json!(["1"])).await;
    assert_eq!(partial["correct"], false);
}

#[tokio::test]
async fn test_text_answer_key_is_canonicalized() {
    let app = create_test_app();
    let attempt_id = start_attempt(&app, "minuterush").await;

    let result = answer(&app, &attempt_id, 3, json!(2)).await;
    assert_eq!(result["correct"], true);
    assert_eq!(result["canonical_correct_answers"], json!(["2"]));
}

#[tokio::test]
async fn test_legacy_string_options_are_matched() {
    let app = create_test_app();
    let attempt_id = start_attempt(&app, "levelinfinity").await;

    let result = answer(&app, &attempt_id, 4, json!("No")).await;
    assert_eq!(result["correct"], true);
}

#[tokio::test]
async fn test_adaptive_answer_returns_next_difficulty() {
    let app = create_test_app();
    let attempt_id = start_attempt(&app, "adaptive").await;

    // Answered in 3 seconds: fast and correct
    let result = answer(&app, &attempt_id, 1, json!("1")).await;
    assert_eq!(result["correct"], true);
    assert_eq!(result["adjustment"]["next_difficulty"], 4);
    assert_eq!(result["adjustment"]["rule"], "fast_correct");
    assert_eq!(result["adjustment"]["preview_qid"], 2);
    assert_eq!(result["finished"], false);

    let (_, next) = post_json(
        &app,
        "/api/v1/quiz/next",
        json!({ "attempt_id": attempt_id, "state": { "current_diff": 4 } }),
    )
    .await;
    assert_eq!(next["id"], 2);
}

#[tokio::test]
async fn test_idempotent_submission_is_scored_once() {
    let app = create_test_app();
    let attempt_id = start_attempt(&app, "challenger").await;
    let body = json!({
        "attempt_id": attempt_id,
        "question_id": 5,
        "selected": "Jupiter",
        "idempotency_key": "attempt-key-1"
    });

    let (status, first) = post_json(&app, "/api/v1/quiz/answer", body.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, second) = post_json(&app, "/api/v1/quiz/answer", body).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(first, second);
    assert_eq!(second["attempt_score"], 1);

    let (_, results) = get_json(&app, &format!("/api/v1/attempts/{}/results", attempt_id)).await;
    assert_eq!(results["total_questions"], 1);
    assert_eq!(results["score"], 1);
}

#[tokio::test]
async fn test_unknown_question_returns_404() {
    let app = create_test_app();
    let attempt_id = start_attempt(&app, "adaptive").await;

    let (status, json) = post_json(
        &app,
        "/api/v1/quiz/answer",
        json!({ "attempt_id": attempt_id, "question_id": 999, "selected": "1" }),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["status"], 404);

    let (_, results) = get_json(&app, &format!("/api/v1/attempts/{}/results", attempt_id)).await;
    assert_eq!(results["total_questions"], 0);
}

#[tokio::test]
async fn test_unknown_attempt_returns_404() {
    let app = create_test_app();

    let (status, _) = post_json(
        &app,
        "/api/v1/quiz/answer",
        json!({ "attempt_id": uuid::Uuid::new_v4(), "question_id": 1, "selected": "1" }),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_answer_after_end_is_rejected() {
    let app = create_test_app();
    let attempt_id = start_attempt(&app, "challenger").await;

    let (status, _) = post_json(&app, &format!("/api/v1/attempts/{}/end", attempt_id), json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = post_json(
        &app,
        "/api/v1/quiz/answer",
        json!({ "attempt_id": attempt_id, "question_id": 1, "selected": "1" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], 400);
}

#[tokio::test]
async fn test_negative_time_is_rejected() {
    let app = create_test_app();
    let attempt_id = start_attempt(&app, "adaptive").await;

    let (status, json) = post_json(
        &app,
        "/api/v1/quiz/answer",
        json!({ "attempt_id": attempt_id, "question_id": 1, "selected": "1", "time_used": -1.0 }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["message"].as_str().unwrap().contains("Validation"));
}
