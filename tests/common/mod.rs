//! Shared helpers for integration tests

use std::sync::{Arc, RwLock};

use axum_test::TestServer;
use serde_json::json;

use lectern::notify::Notifier;
use lectern::routes::create_router;
use lectern::store::InMemoryStore;
use lectern::{AppState, Config};

/// Notifier that captures (email, link) pairs instead of sending anything
#[derive(Clone, Default)]
pub struct MockNotifier {
    pub sent: Arc<RwLock<Vec<(String, String)>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(dead_code)]
    pub fn sent_count(&self) -> usize {
        self.sent.read().unwrap().len()
    }

    #[allow(dead_code)]
    pub fn last_sent(&self) -> Option<(String, String)> {
        self.sent.read().unwrap().last().cloned()
    }
}

impl Notifier for MockNotifier {
    fn send_verification_link(&self, email: &str, link: &str) -> Result<(), String> {
        self.sent
            .write()
            .unwrap()
            .push((email.to_string(), link.to_string()));
        Ok(())
    }
}

/// Test server over the in-memory store with default configuration
pub fn create_test_server() -> (TestServer, MockNotifier) {
    create_test_server_with_config(Config::default())
}

/// Test server with the question delivery cooldown disabled, so polling
/// tests can drain the queue without waiting
#[allow(dead_code)]
pub fn create_test_server_without_cooldown() -> (TestServer, MockNotifier) {
    let config = Config {
        question_cooldown_seconds: 0,
        ..Config::default()
    };
    create_test_server_with_config(config)
}

pub fn create_test_server_with_config(config: Config) -> (TestServer, MockNotifier) {
    let notifier = MockNotifier::new();
    let state = Arc::new(AppState::new(
        &config,
        InMemoryStore::new(),
        notifier.clone(),
    ));
    let server = TestServer::new(create_router(state)).expect("failed to start test server");
    (server, notifier)
}

/// Run a full passwordless login: request the link, then follow it
#[allow(dead_code)]
pub async fn login_and_verify(server: &TestServer, email: &str, session_id: &str) {
    let login = server
        .post("/auth/login")
        .json(&json!({ "email": email, "sessionId": session_id }))
        .await;
    login.assert_status_ok();

    let verify = server
        .get("/auth/verify")
        .add_query_param("sessionId", session_id)
        .await;
    verify.assert_status_ok();
}

/// Create a lecture through the API and return its shareable key
#[allow(dead_code)]
pub async fn create_lecture(server: &TestServer, session_id: &str) -> String {
    let response = server
        .post("/api/lectures")
        .json(&json!({
            "sessionId": session_id,
            "courseName": "Operating Systems",
            "semesterStartDate": "2026-01-12",
            "semesterEndDate": "2026-05-15",
            "classSessions": [
                { "dayOfWeek": "Monday", "startTime": "10:00", "endTime": "11:30" }
            ],
            "lectureDays": [
                {
                    "id": "day-1",
                    "date": "2026-01-12",
                    "dayOfWeek": "Monday",
                    "startTime": "10:00",
                    "endTime": "11:30"
                }
            ]
        }))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    body["lecture"]["key"].as_str().expect("lecture key").to_string()
}
