//! Student question endpoints
//!
//! Submission is public (students only hold the shareable lecture key);
//! everything else runs behind the lecturer's active session.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::delivery;
use crate::error::ApiError;
use crate::notify::Notifier;
use crate::state::AppState;
use crate::store::{
    LectureKey, LectureStore, MeetingStore, NewQuestion, QuestionId, StudentQuestion, UserStore,
};

use super::auth::resolve_active_user;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionRequest {
    #[serde(default)]
    pub student_name: Option<String>,
    pub question: String,
}

#[derive(Serialize)]
pub struct QuestionResponse {
    pub success: bool,
    pub question: StudentQuestion,
}

/// POST /api/lectures/:session_id/questions
///
/// Public submission endpoint. The path parameter carries the shareable
/// lecture key; no session is required, knowing the key is enough.
pub async fn create_question<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Path(lecture_key): Path<String>,
    Json(req): Json<CreateQuestionRequest>,
) -> Result<Json<QuestionResponse>, ApiError>
where
    S: UserStore + LectureStore + MeetingStore,
    N: Notifier,
{
    let key = LectureKey(lecture_key);

    if req.question.trim().is_empty() {
        return Err(ApiError::Validation("Question text is required".to_string()));
    }

    state
        .store
        .find_lecture_by_key(&key)?
        .ok_or(ApiError::LectureNotFound)?;

    let student_name = req
        .student_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "Anonymous".to_string());

    let question = state.store.insert_question(NewQuestion {
        lecture_key: key,
        student_name,
        question: req.question.trim().to_string(),
    })?;

    Ok(Json(QuestionResponse {
        success: true,
        question,
    }))
}

#[derive(Serialize)]
pub struct QuestionListResponse {
    pub success: bool,
    pub questions: Vec<StudentQuestion>,
}

/// GET /api/lectures/:session_id/:lecture_key/questions
pub async fn list_questions<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Path((session_id, lecture_key)): Path<(String, String)>,
) -> Result<Json<QuestionListResponse>, ApiError>
where
    S: UserStore + LectureStore + MeetingStore,
    N: Notifier,
{
    let user = resolve_active_user(&state, Some(&session_id))?;
    let key = LectureKey(lecture_key);

    let lecture = state
        .store
        .find_lecture_by_key(&key)?
        .ok_or(ApiError::LectureNotFound)?;
    if lecture.lecturer_id != user.id {
        return Err(ApiError::LectureNotFound);
    }

    let questions = state.store.questions_for_lecture(&key)?;
    Ok(Json(QuestionListResponse {
        success: true,
        questions,
    }))
}

#[derive(Serialize)]
pub struct NextQuestionResponse {
    pub success: bool,
    pub question: Option<StudentQuestion>,
}

/// GET /api/lectures/:session_id/:lecture_key/questions/next
///
/// Polled by the lecturer's display. Hands out queued questions one at a
/// time: each question is delivered exactly once, and after a delivery the
/// queue is held back for a cooldown period so questions pace the lecture
/// instead of flooding it. An empty response either means nothing is queued
/// or the cooldown has not elapsed; the client just keeps polling.
pub async fn next_question<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Path((session_id, lecture_key)): Path<(String, String)>,
) -> Result<Json<NextQuestionResponse>, ApiError>
where
    S: UserStore + LectureStore + MeetingStore,
    N: Notifier,
{
    let user = resolve_active_user(&state, Some(&session_id))?;
    let key = LectureKey(lecture_key);

    let lecture = state
        .store
        .find_lecture_by_key(&key)?
        .ok_or(ApiError::LectureNotFound)?;
    if lecture.lecturer_id != user.id {
        return Err(ApiError::LectureNotFound);
    }

    let question =
        delivery::next_question(&*state.store, &key, state.question_cooldown, Utc::now())?;

    Ok(Json(NextQuestionResponse {
        success: true,
        question,
    }))
}

#[derive(Serialize)]
pub struct UnansweredCountResponse {
    pub success: bool,
    pub count: u64,
}

/// GET /api/lectures/lecturer/:session_id/questions/unanswered/count
///
/// Spans all of the lecturer's lectures; delivery status is irrelevant here.
pub async fn unanswered_count<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Path(session_id): Path<String>,
) -> Result<Json<UnansweredCountResponse>, ApiError>
where
    S: UserStore + LectureStore + MeetingStore,
    N: Notifier,
{
    let user = resolve_active_user(&state, Some(&session_id))?;
    let count = state.store.count_unanswered_for_lecturer(user.id)?;
    Ok(Json(UnansweredCountResponse {
        success: true,
        count,
    }))
}

#[derive(Serialize)]
pub struct MarkAnsweredResponse {
    pub success: bool,
    pub message: String,
}

/// PUT /api/lectures/questions/:session_id/:question_id/answer
///
/// Lecturer bookkeeping only; answering never affects what the delivery
/// queue hands out next.
pub async fn mark_answered<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Path((session_id, question_id)): Path<(String, i64)>,
) -> Result<Json<MarkAnsweredResponse>, ApiError>
where
    S: UserStore + LectureStore + MeetingStore,
    N: Notifier,
{
    resolve_active_user(&state, Some(&session_id))?;

    if !state.store.mark_question_answered(&QuestionId(question_id))? {
        return Err(ApiError::QuestionNotFound);
    }

    Ok(Json(MarkAnsweredResponse {
        success: true,
        message: "Question marked as answered".to_string(),
    }))
}
