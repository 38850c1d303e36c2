//! Storage abstractions for lectern

pub mod memory;
pub mod models;
pub mod sqlite;

pub use memory::InMemoryStore;
pub use models::*;
pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};

use crate::error::ApiError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, ApiError>;

/// Trait for user accounts, their device sessions, and verification records.
///
/// Session state transitions are only expressible through the dedicated
/// entry points below; each one removes the id from its previous state and
/// installs the new one in a single atomic store operation, which is what
/// keeps a session id in at most one state at any time.
pub trait UserStore: Send + Sync {
    /// Find the user for an email, creating the account on first sight.
    /// Idempotent; the email must already be normalized (lowercased, trimmed).
    fn find_or_create_user(&self, email: &str) -> StoreResult<User>;

    /// Get a user by email address
    fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Get a user by their generated 10-digit unique number
    fn find_user_by_unique_number(&self, unique_number: &str) -> StoreResult<Option<User>>;

    /// Get the user holding this session id in the active state
    fn find_user_by_active_session(&self, session_id: &SessionId) -> StoreResult<Option<User>>;

    /// Get the user holding this session id in the active or pending state
    fn find_user_by_live_session(&self, session_id: &SessionId) -> StoreResult<Option<User>>;

    /// Record a new login attempt: add the session id as pending (if absent)
    /// and refresh the user's last login timestamp
    fn add_pending_session(&self, user_id: UserId, session_id: &SessionId) -> StoreResult<()>;

    /// Vouch for a companion device: add the session id directly as active
    /// (if absent), bypassing the pending state
    fn add_active_session(&self, user_id: UserId, session_id: &SessionId) -> StoreResult<()>;

    /// The PENDING -> ACTIVE primitive. Rejects with distinct reasons:
    /// `SessionAlreadyActive` (no-op surfaced to the caller), `SessionOutdated`
    /// (the id was explicitly logged out — a replayed verification link must
    /// not resurrect it), `SessionNotFound` (never pending).
    fn activate_session(&self, user_id: UserId, session_id: &SessionId) -> StoreResult<()>;

    /// The ACTIVE/PENDING -> INACTIVE primitive. Rejects with
    /// `SessionAlreadyInactive` or `SessionNotFound`.
    fn inactivate_session(&self, user_id: UserId, session_id: &SessionId) -> StoreResult<()>;

    /// Replace the user's lecturer preferences
    fn update_options(&self, user_id: UserId, options: &UserOptions) -> StoreResult<()>;

    /// Insert a fresh verification record expiring `ttl_minutes` from now.
    /// Callers delete prior records for the email first; the store itself
    /// enforces no uniqueness.
    fn create_verification(
        &self,
        email: &str,
        token: &SessionId,
        ttl_minutes: i64,
    ) -> StoreResult<Verification>;

    /// Find the unconsumed (not yet verified) record for a token
    fn find_unconsumed_verification(&self, token: &SessionId)
        -> StoreResult<Option<Verification>>;

    /// Idempotently mark a verification record consumed
    fn mark_verification_verified(&self, id: VerificationId) -> StoreResult<()>;

    /// Invalidate all outstanding verification links for an email
    fn delete_verifications_for_email(&self, email: &str) -> StoreResult<u64>;
}

/// Trait for lecture metadata and the student question inbox
pub trait LectureStore: Send + Sync {
    fn insert_lecture(&self, lecture: NewLecture) -> StoreResult<Lecture>;

    fn find_lecture_by_key(&self, key: &LectureKey) -> StoreResult<Option<Lecture>>;

    fn lectures_for_lecturer(&self, lecturer_id: UserId) -> StoreResult<Vec<Lecture>>;

    /// Partial field replacement; bumps `updated_at`. Returns the updated
    /// lecture, or None if the key is unknown.
    fn update_lecture(
        &self,
        key: &LectureKey,
        update: LectureUpdate,
    ) -> StoreResult<Option<Lecture>>;

    /// Update one embedded lecture day as a single-document read-modify-write.
    /// Returns None if the lecture is unknown; an unknown day id within a
    /// known lecture is a validation error.
    fn update_lecture_day(
        &self,
        key: &LectureKey,
        day_id: &str,
        update: &LectureDayUpdate,
    ) -> StoreResult<Option<Lecture>>;

    /// Owner-checked delete; cascades to the lecture's questions.
    /// Returns false when no lecture matched key + owner.
    fn delete_lecture(&self, key: &LectureKey, lecturer_id: UserId) -> StoreResult<bool>;

    fn insert_question(&self, question: NewQuestion) -> StoreResult<StudentQuestion>;

    fn questions_for_lecture(&self, key: &LectureKey) -> StoreResult<Vec<StudentQuestion>>;

    /// Count unanswered questions across all of a lecturer's lectures
    fn count_unanswered_for_lecturer(&self, lecturer_id: UserId) -> StoreResult<u64>;

    /// The most recently delivered question for a lecture, by delivery time
    fn latest_delivered_question(
        &self,
        key: &LectureKey,
    ) -> StoreResult<Option<StudentQuestion>>;

    /// Atomically select the oldest undelivered question for the lecture and
    /// mark it delivered at `now`, in one read-modify-write. Under concurrent
    /// pollers at most one caller receives any given question.
    fn claim_oldest_undelivered(
        &self,
        key: &LectureKey,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<StudentQuestion>>;

    /// Idempotently flag a question answered. Returns false for unknown ids.
    /// Lecturer bookkeeping only; never consulted by the delivery scheduler.
    fn mark_question_answered(&self, id: &QuestionId) -> StoreResult<bool>;
}

/// Trait for meeting session records, addressed by the owner's unique number
pub trait MeetingStore: Send + Sync {
    /// Insert a meeting. A duplicate meeting id is rejected with a
    /// validation error.
    fn insert_meeting(&self, meeting: NewMeetingSession) -> StoreResult<MeetingSession>;

    fn find_meeting_by_meeting_id(&self, meeting_id: &str)
        -> StoreResult<Option<MeetingSession>>;

    fn meetings_for_unique_number(
        &self,
        unique_number: &str,
    ) -> StoreResult<Vec<MeetingSession>>;

    /// Partial field replacement; bumps `updated_at`. Returns the updated
    /// meeting, or None if the meeting id is unknown.
    fn update_meeting(
        &self,
        meeting_id: &str,
        update: &MeetingSessionUpdate,
    ) -> StoreResult<Option<MeetingSession>>;
}
