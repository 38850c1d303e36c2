//! Meeting session endpoints
//!
//! Meeting sessions are addressed by the owner's generated unique number
//! rather than a login session, so these endpoints take the number in the
//! request body instead of a path credential.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::keygen;
use crate::notify::Notifier;
use crate::state::AppState;
use crate::store::{
    LectureStore, MeetingSession, MeetingSessionUpdate, MeetingStore, NewMeetingSession, UserStore,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMeetingRequest {
    pub unique_number: String,
    pub name: String,
    /// Caller-supplied meeting id; generated when absent.
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub expected_start_time: Option<String>,
    #[serde(default)]
    pub expected_end_time: Option<String>,
    #[serde(default)]
    pub notes_available: Option<bool>,
    #[serde(default)]
    pub session_notes: Option<String>,
    #[serde(default)]
    pub allow_queries: Option<bool>,
    #[serde(default)]
    pub agenda_available: Option<bool>,
    #[serde(default)]
    pub agenda: Option<String>,
}

#[derive(Serialize)]
pub struct MeetingResponse {
    pub success: bool,
    pub message: String,
    pub session: MeetingSession,
}

/// POST /session/create_session
pub async fn create_meeting_session<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Json(req): Json<CreateMeetingRequest>,
) -> Result<Json<MeetingResponse>, ApiError>
where
    S: UserStore + LectureStore + MeetingStore,
    N: Notifier,
{
    let unique_number = req.unique_number.trim();
    if unique_number.is_empty() {
        return Err(ApiError::Validation("uniqueNumber is required".to_string()));
    }
    if req.name.trim().is_empty() {
        return Err(ApiError::Validation("Session name is required".to_string()));
    }

    state
        .store
        .find_user_by_unique_number(unique_number)?
        .ok_or(ApiError::UserNotFound)?;

    let meeting_id = req
        .session_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(keygen::generate_session_id);

    let meeting = state.store.insert_meeting(NewMeetingSession {
        meeting_id,
        unique_number: unique_number.to_string(),
        name: req.name.trim().to_string(),
        expected_start_time: req.expected_start_time,
        expected_end_time: req.expected_end_time,
        notes_available: req.notes_available.unwrap_or(false),
        session_notes: req.session_notes,
        allow_queries: req.allow_queries.unwrap_or(false),
        agenda_available: req.agenda_available.unwrap_or(false),
        agenda: req.agenda,
    })?;

    tracing::info!(
        meeting_id = %meeting.meeting_id,
        unique_number = %meeting.unique_number,
        "Meeting session created"
    );

    Ok(Json(MeetingResponse {
        success: true,
        message: "Session created successfully".to_string(),
        session: meeting,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMeetingsRequest {
    pub unique_number: String,
}

#[derive(Serialize)]
pub struct MeetingListResponse {
    pub success: bool,
    pub sessions: Vec<MeetingSession>,
}

/// POST /session/get_all_sessions_by_uniqueNumber
pub async fn list_meeting_sessions<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Json(req): Json<ListMeetingsRequest>,
) -> Result<Json<MeetingListResponse>, ApiError>
where
    S: UserStore + LectureStore + MeetingStore,
    N: Notifier,
{
    let unique_number = req.unique_number.trim();
    if unique_number.is_empty() {
        return Err(ApiError::Validation("uniqueNumber is required".to_string()));
    }

    state
        .store
        .find_user_by_unique_number(unique_number)?
        .ok_or(ApiError::UserNotFound)?;

    let sessions = state.store.meetings_for_unique_number(unique_number)?;
    Ok(Json(MeetingListResponse {
        success: true,
        sessions,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMeetingRequest {
    pub session_id: String,
    #[serde(default)]
    pub update_data: MeetingSessionUpdate,
}

/// POST /session/update_session
pub async fn update_meeting_session<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Json(req): Json<UpdateMeetingRequest>,
) -> Result<Json<MeetingResponse>, ApiError>
where
    S: UserStore + LectureStore + MeetingStore,
    N: Notifier,
{
    let session_id = req.session_id.trim();
    if session_id.is_empty() {
        return Err(ApiError::Validation("sessionId is required".to_string()));
    }

    let meeting = state
        .store
        .update_meeting(session_id, &req.update_data)?
        .ok_or_else(|| ApiError::Validation("Session not found".to_string()))?;

    Ok(Json(MeetingResponse {
        success: true,
        message: "Session updated successfully".to_string(),
        session: meeting,
    }))
}
