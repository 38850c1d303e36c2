//! Session lifecycle endpoints
//!
//! A device session moves through pending -> active -> inactive, driven by
//! email verification: login records the client-chosen session id as
//! pending and emails a verification link; visiting the link activates the
//! session; logout retires it permanently.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::notify::Notifier;
use crate::state::AppState;
use crate::store::{LectureStore, MeetingStore, SessionId, UserOptions, UserStore};

fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub session_id: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub email: String,
}

/// POST /auth/login
///
/// Start a login attempt: find or create the account, record the session id
/// as pending, and email a verification link. A fresh verification record
/// replaces any outstanding links for the email. If the notifier fails the
/// error is surfaced to the caller; the user and verification writes are
/// deliberately left in place (the next login attempt supersedes them).
pub async fn login<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError>
where
    S: UserStore + LectureStore + MeetingStore,
    N: Notifier,
{
    let email = normalize_email(&req.email);
    let session_id = SessionId::normalized(&req.session_id);

    if email.is_empty() {
        return Err(ApiError::Validation("Email is required".to_string()));
    }
    if session_id.as_str().is_empty() {
        return Err(ApiError::Validation("Session id is required".to_string()));
    }

    let user = state.store.find_or_create_user(&email)?;
    state.store.add_pending_session(user.id, &session_id)?;

    // Invalidate old links before minting the new one
    state.store.delete_verifications_for_email(&email)?;
    state
        .store
        .create_verification(&email, &session_id, state.verification_ttl_minutes)?;

    let link = state.verification_link(session_id.as_str());
    state
        .notifier
        .send_verification_link(&email, &link)
        .map_err(ApiError::Notifier)?;

    tracing::info!(email = %email, "Login verification email sent");

    Ok(Json(LoginResponse {
        success: true,
        message: "Verification email sent. Please check your email.".to_string(),
        email,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyQuery {
    pub session_id: Option<String>,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub message: String,
    pub email: String,
}

/// GET /auth/verify?sessionId=...
///
/// Complete a login from the emailed link. The token is the session id
/// itself. Consumed and expired tokens are rejected, as is any attempt to
/// reactivate a session that was since logged out (replayed links must not
/// resurrect terminated sessions).
pub async fn verify<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Query(query): Query<VerifyQuery>,
) -> Result<Json<VerifyResponse>, ApiError>
where
    S: UserStore + LectureStore + MeetingStore,
    N: Notifier,
{
    let session_id = query
        .session_id
        .as_deref()
        .map(SessionId::normalized)
        .filter(|s| !s.as_str().is_empty())
        .ok_or_else(|| ApiError::Validation("No verification token provided".to_string()))?;

    let verification = state
        .store
        .find_unconsumed_verification(&session_id)?
        .ok_or(ApiError::InvalidVerificationToken)?;

    if verification.is_expired(chrono::Utc::now()) {
        return Err(ApiError::VerificationExpired);
    }

    let user = state
        .store
        .find_user_by_email(&verification.email)?
        .ok_or(ApiError::UserNotFound)?;

    state.store.mark_verification_verified(verification.id)?;
    state.store.activate_session(user.id, &session_id)?;

    tracing::info!(email = %user.email, "User logged in successfully");

    Ok(Json(VerifyResponse {
        success: true,
        message: "Login successful".to_string(),
        email: user.email,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeRequest {
    pub session_id: String,
    pub ar_session_id: String,
}

#[derive(Serialize)]
pub struct AuthorizeResponse {
    pub success: bool,
    pub message: String,
}

/// POST /auth/authorize
///
/// An active primary session vouches for a companion device: its session id
/// goes straight into the active state, skipping email verification.
pub async fn authorize<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Json(req): Json<AuthorizeRequest>,
) -> Result<Json<AuthorizeResponse>, ApiError>
where
    S: UserStore + LectureStore + MeetingStore,
    N: Notifier,
{
    let session_id = SessionId::normalized(&req.session_id);
    let ar_session_id = SessionId::normalized(&req.ar_session_id);

    if session_id.as_str().is_empty() || ar_session_id.as_str().is_empty() {
        return Err(ApiError::Validation(
            "Session id and arSessionId is required".to_string(),
        ));
    }

    let user = state
        .store
        .find_user_by_active_session(&session_id)?
        .ok_or(ApiError::NotAuthorized)?;

    state.store.add_active_session(user.id, &ar_session_id)?;

    Ok(Json(AuthorizeResponse {
        success: true,
        message: "AR session was authorized.".to_string(),
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub logged_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// The number used to address the user's meeting sessions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_number: Option<String>,
}

/// POST /auth/status
///
/// Never fails: an unknown or non-active session id simply reports
/// loggedIn = false.
pub async fn check_status<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<StatusResponse>, ApiError>
where
    S: UserStore + LectureStore + MeetingStore,
    N: Notifier,
{
    let not_logged_in = StatusResponse {
        logged_in: false,
        email: None,
        session_id: None,
        unique_number: None,
    };

    let Some(raw) = req.session_id else {
        return Ok(Json(not_logged_in));
    };
    let session_id = SessionId::normalized(&raw);
    if session_id.as_str().is_empty() {
        return Ok(Json(not_logged_in));
    }

    match state.store.find_user_by_active_session(&session_id)? {
        Some(user) => Ok(Json(StatusResponse {
            logged_in: true,
            email: Some(user.email),
            session_id: Some(session_id.0),
            unique_number: Some(user.unique_number),
        })),
        None => Ok(Json(not_logged_in)),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub session_id: String,
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: String,
}

/// POST /auth/logout
///
/// Retires an active or pending session. Inactive is terminal: the id can
/// never be reactivated, not even by replaying its verification link.
pub async fn logout<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Json(req): Json<LogoutRequest>,
) -> Result<Json<LogoutResponse>, ApiError>
where
    S: UserStore + LectureStore + MeetingStore,
    N: Notifier,
{
    let session_id = SessionId::normalized(&req.session_id);
    if session_id.as_str().is_empty() {
        return Err(ApiError::Validation("Session id is required".to_string()));
    }

    let user = state
        .store
        .find_user_by_live_session(&session_id)?
        .ok_or(ApiError::UserNotFound)?;

    state.store.inactivate_session(user.id, &session_id)?;

    tracing::info!(email = %user.email, "User logged out");

    Ok(Json(LogoutResponse {
        success: true,
        message: "Logout successful".to_string(),
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsQuery {
    pub session_id: Option<String>,
}

/// GET /auth/options?sessionId=...
///
/// Options are only readable through an active session; every failure mode
/// reports the same "No user found" so callers cannot distinguish a wrong
/// id from a not-yet-activated one.
pub async fn get_options<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Query(query): Query<OptionsQuery>,
) -> Result<Json<UserOptions>, ApiError>
where
    S: UserStore + LectureStore + MeetingStore,
    N: Notifier,
{
    let user = resolve_active_user(&state, query.session_id.as_deref())?;
    Ok(Json(user.options))
}

#[derive(Serialize)]
pub struct SaveOptionsResponse {
    pub success: bool,
}

/// POST /auth/options?sessionId=...
pub async fn save_options<S, N>(
    State(state): State<Arc<AppState<S, N>>>,
    Query(query): Query<OptionsQuery>,
    Json(options): Json<UserOptions>,
) -> Result<Json<SaveOptionsResponse>, ApiError>
where
    S: UserStore + LectureStore + MeetingStore,
    N: Notifier,
{
    let user = resolve_active_user(&state, query.session_id.as_deref())?;
    state.store.update_options(user.id, &options)?;
    Ok(Json(SaveOptionsResponse { success: true }))
}

/// Resolve a session id to its user, requiring the active state. Shared by
/// the options endpoints and the lecture/question handlers.
pub fn resolve_active_user<S, N>(
    state: &AppState<S, N>,
    session_id: Option<&str>,
) -> Result<crate::store::User, ApiError>
where
    S: UserStore + LectureStore + MeetingStore,
    N: Notifier,
{
    let session_id = session_id
        .map(SessionId::normalized)
        .filter(|s| !s.as_str().is_empty())
        .ok_or(ApiError::NotAuthorized)?;

    state
        .store
        .find_user_by_active_session(&session_id)?
        .ok_or(ApiError::NotAuthorized)
}
