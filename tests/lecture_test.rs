//! Integration tests for lecture CRUD

mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};

use common::{create_lecture, create_test_server, login_and_verify};

const KEY_ALPHABET: &str = "ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

#[tokio::test]
async fn test_create_lecture_returns_shareable_key() {
    let (server, _) = create_test_server();
    login_and_verify(&server, "alice@example.com", "sess-1").await;

    let response = server
        .post("/api/lectures")
        .json(&json!({
            "sessionId": "sess-1",
            "courseName": "Databases",
            "semesterStartDate": "2026-01-12",
            "semesterEndDate": "2026-05-15",
            "classSessions": [
                { "dayOfWeek": "Tuesday", "startTime": "09:00", "endTime": "10:30" }
            ]
        }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["lecture"]["courseName"], "Databases");

    let key = body["lecture"]["key"].as_str().unwrap();
    assert_eq!(key.len(), 6);
    assert!(key.chars().all(|c| KEY_ALPHABET.contains(c)));
}

#[tokio::test]
async fn test_create_lecture_requires_active_session() {
    let (server, _) = create_test_server();

    let response = server
        .post("/api/lectures")
        .json(&json!({
            "sessionId": "never-seen",
            "courseName": "Databases",
            "semesterStartDate": "2026-01-12",
            "semesterEndDate": "2026-05-15",
            "classSessions": [
                { "dayOfWeek": "Tuesday", "startTime": "09:00", "endTime": "10:30" }
            ]
        }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_lecture_validation() {
    let (server, _) = create_test_server();
    login_and_verify(&server, "alice@example.com", "sess-1").await;

    // Empty course name
    let response = server
        .post("/api/lectures")
        .json(&json!({
            "sessionId": "sess-1",
            "courseName": "  ",
            "semesterStartDate": "2026-01-12",
            "semesterEndDate": "2026-05-15",
            "classSessions": [
                { "dayOfWeek": "Tuesday", "startTime": "09:00", "endTime": "10:30" }
            ]
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    // No class sessions
    let response = server
        .post("/api/lectures")
        .json(&json!({
            "sessionId": "sess-1",
            "courseName": "Databases",
            "semesterStartDate": "2026-01-12",
            "semesterEndDate": "2026-05-15",
            "classSessions": []
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    // Class session ends before it starts
    let response = server
        .post("/api/lectures")
        .json(&json!({
            "sessionId": "sess-1",
            "courseName": "Databases",
            "semesterStartDate": "2026-01-12",
            "semesterEndDate": "2026-05-15",
            "classSessions": [
                { "dayOfWeek": "Tuesday", "startTime": "10:30", "endTime": "09:00" }
            ]
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_lecture_by_key() {
    let (server, _) = create_test_server();
    login_and_verify(&server, "alice@example.com", "sess-1").await;
    let key = create_lecture(&server, "sess-1").await;

    let response = server.get(&format!("/api/lectures/sess-1/{}", key)).await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["lecture"]["key"], key.as_str());
    assert_eq!(body["lecture"]["courseName"], "Operating Systems");
}

#[tokio::test]
async fn test_get_lecture_unknown_key() {
    let (server, _) = create_test_server();
    login_and_verify(&server, "alice@example.com", "sess-1").await;

    let response = server.get("/api/lectures/sess-1/ZZZZZZ").await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_lectures_are_owner_scoped() {
    let (server, _) = create_test_server();
    login_and_verify(&server, "alice@example.com", "alice-sess").await;
    login_and_verify(&server, "bob@example.com", "bob-sess").await;
    let key = create_lecture(&server, "alice-sess").await;

    // Bob cannot see, update, or delete Alice's lecture
    let response = server.get(&format!("/api/lectures/bob-sess/{}", key)).await;
    response.assert_status(StatusCode::NOT_FOUND);

    let response = server
        .put(&format!("/api/lectures/bob-sess/{}", key))
        .json(&json!({ "courseName": "Hijacked" }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    let response = server
        .delete(&format!("/api/lectures/bob-sess/{}", key))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    // Still intact for Alice
    let response = server.get(&format!("/api/lectures/alice-sess/{}", key)).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["lecture"]["courseName"], "Operating Systems");
}

#[tokio::test]
async fn test_list_lectures_for_lecturer() {
    let (server, _) = create_test_server();
    login_and_verify(&server, "alice@example.com", "sess-1").await;

    let first = create_lecture(&server, "sess-1").await;
    let second = create_lecture(&server, "sess-1").await;
    assert_ne!(first, second);

    let response = server.get("/api/lectures/lecturer/sess-1").await;
    response.assert_status_ok();

    let body: Value = response.json();
    let lectures = body["lectures"].as_array().unwrap();
    assert_eq!(lectures.len(), 2);
}

#[tokio::test]
async fn test_update_lecture_is_partial() {
    let (server, _) = create_test_server();
    login_and_verify(&server, "alice@example.com", "sess-1").await;
    let key = create_lecture(&server, "sess-1").await;

    let response = server
        .put(&format!("/api/lectures/sess-1/{}", key))
        .json(&json!({ "courseName": "Advanced Operating Systems" }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["lecture"]["courseName"], "Advanced Operating Systems");
    // Omitted fields keep their stored values
    assert_eq!(body["lecture"]["semesterStartDate"], "2026-01-12");
    assert_eq!(body["lecture"]["classSessions"].as_array().unwrap().len(), 1);
    assert_eq!(body["lecture"]["key"], key.as_str());
}

#[tokio::test]
async fn test_update_after_logout_fails_and_changes_nothing() {
    let (server, _) = create_test_server();
    login_and_verify(&server, "alice@example.com", "sess-1").await;
    let key = create_lecture(&server, "sess-1").await;

    server
        .post("/auth/logout")
        .json(&json!({ "sessionId": "sess-1" }))
        .await
        .assert_status_ok();

    let response = server
        .put(&format!("/api/lectures/sess-1/{}", key))
        .json(&json!({ "courseName": "Should Not Stick" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    // Log back in on a fresh session and confirm nothing changed
    login_and_verify(&server, "alice@example.com", "sess-2").await;
    let body: Value = server
        .get(&format!("/api/lectures/sess-2/{}", key))
        .await
        .json();
    assert_eq!(body["lecture"]["courseName"], "Operating Systems");
}

#[tokio::test]
async fn test_delete_lecture() {
    let (server, _) = create_test_server();
    login_and_verify(&server, "alice@example.com", "sess-1").await;
    let key = create_lecture(&server, "sess-1").await;

    let response = server
        .delete(&format!("/api/lectures/sess-1/{}", key))
        .await;
    response.assert_status_ok();

    let response = server.get(&format!("/api/lectures/sess-1/{}", key)).await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_lecture_day() {
    let (server, _) = create_test_server();
    login_and_verify(&server, "alice@example.com", "sess-1").await;
    let key = create_lecture(&server, "sess-1").await;

    let response = server
        .put(&format!("/api/lectures/sess-1/{}/day/day-1", key))
        .json(&json!({
            "topic": "Scheduling",
            "notes": "Start with round robin",
            "timeline": [
                { "startTime": "10:00", "endTime": "10:20", "description": "Recap" }
            ]
        }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    let day = &body["lecture"]["lectureDays"][0];
    assert_eq!(day["topic"], "Scheduling");
    assert_eq!(day["notes"], "Start with round robin");
    assert_eq!(day["timeline"][0]["description"], "Recap");
    // Schedule fields untouched
    assert_eq!(day["startTime"], "10:00");
}

#[tokio::test]
async fn test_update_lecture_day_rejects_invalid_timeline() {
    let (server, _) = create_test_server();
    login_and_verify(&server, "alice@example.com", "sess-1").await;
    let key = create_lecture(&server, "sess-1").await;

    let response = server
        .put(&format!("/api/lectures/sess-1/{}/day/day-1", key))
        .json(&json!({
            "timeline": [
                { "startTime": "10:20", "endTime": "10:00", "description": "Backwards" }
            ]
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_unknown_lecture_day() {
    let (server, _) = create_test_server();
    login_and_verify(&server, "alice@example.com", "sess-1").await;
    let key = create_lecture(&server, "sess-1").await;

    let response = server
        .put(&format!("/api/lectures/sess-1/{}/day/no-such-day", key))
        .json(&json!({ "topic": "Lost" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}
