//! HTTP routes

mod auth;
mod lecture;
mod meeting;
mod question;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::notify::Notifier;
use crate::state::AppState;
use crate::store::{LectureStore, MeetingStore, UserStore};

/// Create the router with all routes
pub fn create_router<S, N>(state: Arc<AppState<S, N>>) -> Router
where
    S: UserStore + LectureStore + MeetingStore + 'static,
    N: Notifier + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        // Session lifecycle
        .route("/auth/login", post(auth::login))
        .route("/auth/verify", get(auth::verify))
        .route("/auth/authorize", post(auth::authorize))
        .route("/auth/status", post(auth::check_status))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/options", get(auth::get_options).post(auth::save_options))
        // Lectures
        .route("/api/lectures", post(lecture::create_lecture))
        .route("/api/lectures/lecturer/:session_id", get(lecture::list_lectures))
        .route(
            "/api/lectures/:session_id/:lecture_key",
            get(lecture::get_lecture)
                .put(lecture::update_lecture)
                .delete(lecture::delete_lecture),
        )
        .route(
            "/api/lectures/:session_id/:lecture_key/day/:day_id",
            put(lecture::update_lecture_day),
        )
        // Student questions. The router allows one param name per segment
        // position, so the public submission route reuses :session_id even
        // though the segment carries the shareable lecture key.
        .route("/api/lectures/:session_id/questions", post(question::create_question))
        .route(
            "/api/lectures/:session_id/:lecture_key/questions",
            get(question::list_questions),
        )
        .route(
            "/api/lectures/:session_id/:lecture_key/questions/next",
            get(question::next_question),
        )
        .route(
            "/api/lectures/lecturer/:session_id/questions/unanswered/count",
            get(question::unanswered_count),
        )
        .route(
            "/api/lectures/questions/:session_id/:question_id/answer",
            put(question::mark_answered),
        )
        // Meeting sessions, addressed by the owner's unique number
        .route("/session/create_session", post(meeting::create_meeting_session))
        .route(
            "/session/get_all_sessions_by_uniqueNumber",
            post(meeting::list_meeting_sessions),
        )
        .route("/session/update_session", post(meeting::update_meeting_session))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
