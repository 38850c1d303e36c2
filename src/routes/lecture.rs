//! Lecture CRUD endpoints
//!
//! Every route here runs behind an active session; lookups and mutations
//! are owner-scoped so one lecturer can never touch another's lectures.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::keygen;
use crate::notify::Notifier;
use crate::state::AppState;
use crate::store::{
    ClassSession, Lecture, LectureDay, LectureDayUpdate, LectureKey, LectureStore, LectureUpdate,
    MeetingStore, NewLecture, User, UserStore,
};

use super::auth::resolve_active_user;

/// How many times to re-roll a shareable key on collision before giving up
const KEY_ATTEMPTS: usize = 8;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLectureRequest {
    pub session_id: String,
    pub course_name: String,
    pub semester_start_date: String,
    pub semester_end_date: String,
    pub class_sessions: Vec<ClassSession>,
    #[serde(default)]
    pub lecture_days: Vec<LectureDay>,
}

#[derive(Serialize)]
pub struct LectureResponse {
    pub success: bool,
    pub lecture: Lecture,
}

#[derive(Serialize)]
pub struct LectureListResponse {
    pub success: bool,
    pub lectures: Vec<Lecture>,
}

fn validate_class_sessions(sessions: &[ClassSession]) -> Result<(), ApiError> {
    if sessions.is_empty() {
        return Err(ApiError::Validation(
            "At least one class session is required".to_string(),
        ));
    }
    for session in sessions {
        if session.day_of_week.trim().is_empty() {
            return Err(ApiError::Validation(
                "Each class session needs a day of week".to_string(),
            ));
        }
        if session.end_time <= session.start_time {
            return Err(ApiError::Validation(
                "Class session end time must be after start time".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_lecture_days(days: &[LectureDay]) -> Result<(), ApiError> {
    for day in days {
        if let Some(timeline) = &day.timeline {
            if timeline.iter().any(|item| !item.is_valid()) {
                return Err(ApiError::Validation(
                    "Timeline items need a description and an end time after the start time"
                        .to_string(),
                ));
            }
        }
    }
    Ok(())
}

/// Fetch a lecture the caller owns. An existing lecture owned by someone
/// else reports the same not-found as a bogus key.
fn owned_lecture<S>(store: &S, key: &LectureKey, user: &User) -> Result<Lecture, ApiError>
where
    S: LectureStore + ?Sized,
{
    let lecture = store
        .find_lecture_by_key(key)?
        .ok_or(ApiError::LectureNotFound)?;
    if lecture.lecturer_id != user.id {
        return Err(ApiError::LectureNotFound);
    }
    Ok(lecture)
}

/// POST /api/lectures
///
/// Shareable keys are random, so creation re-rolls on the (rare) collision
/// with an existing lecture rather than failing the request.
pub async fn create_lecture<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Json(req): Json<CreateLectureRequest>,
) -> Result<Json<LectureResponse>, ApiError>
where
    S: UserStore + LectureStore + MeetingStore,
    N: Notifier,
{
    let user = resolve_active_user(&state, Some(&req.session_id))?;

    if req.course_name.trim().is_empty() {
        return Err(ApiError::Validation("Course name is required".to_string()));
    }
    if req.semester_start_date.trim().is_empty() || req.semester_end_date.trim().is_empty() {
        return Err(ApiError::Validation(
            "Semester start and end dates are required".to_string(),
        ));
    }
    validate_class_sessions(&req.class_sessions)?;
    validate_lecture_days(&req.lecture_days)?;

    let mut key = None;
    for _ in 0..KEY_ATTEMPTS {
        let candidate = LectureKey(keygen::generate_lecture_key());
        if state.store.find_lecture_by_key(&candidate)?.is_none() {
            key = Some(candidate);
            break;
        }
    }
    let key = key.ok_or_else(|| {
        ApiError::Internal("Could not generate a unique lecture key".to_string())
    })?;

    let lecture = state.store.insert_lecture(NewLecture {
        key,
        lecturer_id: user.id,
        course_name: req.course_name.trim().to_string(),
        semester_start_date: req.semester_start_date,
        semester_end_date: req.semester_end_date,
        class_sessions: req.class_sessions,
        lecture_days: req.lecture_days,
    })?;

    tracing::info!(key = %lecture.key.as_str(), email = %user.email, "Lecture created");

    Ok(Json(LectureResponse {
        success: true,
        lecture,
    }))
}

/// GET /api/lectures/lecturer/:session_id
pub async fn list_lectures<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Path(session_id): Path<String>,
) -> Result<Json<LectureListResponse>, ApiError>
where
    S: UserStore + LectureStore + MeetingStore,
    N: Notifier,
{
    let user = resolve_active_user(&state, Some(&session_id))?;
    let lectures = state.store.lectures_for_lecturer(user.id)?;
    Ok(Json(LectureListResponse {
        success: true,
        lectures,
    }))
}

/// GET /api/lectures/:session_id/:lecture_key
pub async fn get_lecture<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Path((session_id, lecture_key)): Path<(String, String)>,
) -> Result<Json<LectureResponse>, ApiError>
where
    S: UserStore + LectureStore + MeetingStore,
    N: Notifier,
{
    let user = resolve_active_user(&state, Some(&session_id))?;
    let lecture = owned_lecture(&*state.store, &LectureKey(lecture_key), &user)?;
    Ok(Json(LectureResponse {
        success: true,
        lecture,
    }))
}

/// PUT /api/lectures/:session_id/:lecture_key
///
/// Partial update; omitted fields keep their stored values. The key, owner
/// and creation time never change.
pub async fn update_lecture<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Path((session_id, lecture_key)): Path<(String, String)>,
    Json(update): Json<LectureUpdate>,
) -> Result<Json<LectureResponse>, ApiError>
where
    S: UserStore + LectureStore + MeetingStore,
    N: Notifier,
{
    let user = resolve_active_user(&state, Some(&session_id))?;
    let key = LectureKey(lecture_key);
    owned_lecture(&*state.store, &key, &user)?;

    if let Some(name) = &update.course_name {
        if name.trim().is_empty() {
            return Err(ApiError::Validation("Course name cannot be empty".to_string()));
        }
    }
    if let Some(sessions) = &update.class_sessions {
        validate_class_sessions(sessions)?;
    }
    if let Some(days) = &update.lecture_days {
        validate_lecture_days(days)?;
    }

    let lecture = state
        .store
        .update_lecture(&key, update)?
        .ok_or(ApiError::LectureNotFound)?;

    Ok(Json(LectureResponse {
        success: true,
        lecture,
    }))
}

#[derive(Serialize)]
pub struct DeleteLectureResponse {
    pub success: bool,
    pub message: String,
}

/// DELETE /api/lectures/:session_id/:lecture_key
///
/// Removes the lecture and every question submitted to it.
pub async fn delete_lecture<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Path((session_id, lecture_key)): Path<(String, String)>,
) -> Result<Json<DeleteLectureResponse>, ApiError>
where
    S: UserStore + LectureStore + MeetingStore,
    N: Notifier,
{
    let user = resolve_active_user(&state, Some(&session_id))?;
    let key = LectureKey(lecture_key);

    if !state.store.delete_lecture(&key, user.id)? {
        return Err(ApiError::LectureNotFound);
    }

    tracing::info!(key = %key.as_str(), email = %user.email, "Lecture deleted");

    Ok(Json(DeleteLectureResponse {
        success: true,
        message: "Lecture deleted".to_string(),
    }))
}

/// PUT /api/lectures/:session_id/:lecture_key/day/:day_id
///
/// Updates one embedded lecture day in place, leaving the rest of the
/// schedule untouched.
pub async fn update_lecture_day<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Path((session_id, lecture_key, day_id)): Path<(String, String, String)>,
    Json(update): Json<LectureDayUpdate>,
) -> Result<Json<LectureResponse>, ApiError>
where
    S: UserStore + LectureStore + MeetingStore,
    N: Notifier,
{
    let user = resolve_active_user(&state, Some(&session_id))?;
    let key = LectureKey(lecture_key);
    owned_lecture(&*state.store, &key, &user)?;

    if let Some(timeline) = &update.timeline {
        if timeline.iter().any(|item| !item.is_valid()) {
            return Err(ApiError::Validation(
                "Timeline items need a description and an end time after the start time"
                    .to_string(),
            ));
        }
    }

    let lecture = state
        .store
        .update_lecture_day(&key, &day_id, &update)?
        .ok_or(ApiError::LectureNotFound)?;

    Ok(Json(LectureResponse {
        success: true,
        lecture,
    }))
}
