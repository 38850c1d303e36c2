//! Data models for lectern storage

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Store-native user identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

/// Opaque client-minted session identifier. Doubles as the verification
/// token for the login attempt that introduced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Trim surrounding whitespace, as the wire value comes from clients
    pub fn normalized(raw: &str) -> Self {
        Self(raw.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Short human-shareable lecture key, distinct from the internal lecture id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LectureKey(pub String);

impl LectureKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Store-native lecture identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LectureId(pub i64);

/// Store-native question identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuestionId(pub i64);

/// Store-native verification record identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerificationId(pub i64);

/// Store-native meeting session record identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeetingSessionId(pub i64);

/// Lifecycle state of a device session. A session id's state is derived
/// entirely from this map entry; absence means the id was never seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Pending,
    Active,
    Inactive,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Pending => "pending",
            SessionState::Active => "active",
            SessionState::Inactive => "inactive",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SessionState::Pending),
            "active" => Some(SessionState::Active),
            "inactive" => Some(SessionState::Inactive),
            _ => None,
        }
    }
}

/// Lecturer preferences. Known fields are typed; anything else a client
/// sends survives round-trips through the flattened extra map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct UserOptions {
    pub name: String,
    pub individual_engagement: bool,
    pub accept_queries: bool,
    pub display_timeline: bool,
    pub display_notes: bool,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl Default for UserOptions {
    fn default() -> Self {
        Self {
            name: "Lecturer".to_string(),
            individual_engagement: true,
            accept_queries: true,
            display_timeline: true,
            display_notes: true,
            extra: HashMap::new(),
        }
    }
}

/// A lecturer account, created lazily on first login attempt
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub email: String,
    /// Generated 10-digit identifier used to address the user's meeting
    /// sessions without exposing the email
    pub unique_number: String,
    /// Session id to lifecycle state. Invariant: one entry per id, so an id
    /// is in at most one state at any time. Mutated only through the store's
    /// transition entry points.
    pub sessions: HashMap<SessionId, SessionState>,
    pub options: UserOptions,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    pub fn session_state(&self, session_id: &SessionId) -> Option<SessionState> {
        self.sessions.get(session_id).copied()
    }

    pub fn has_active_session(&self, session_id: &SessionId) -> bool {
        self.session_state(session_id) == Some(SessionState::Active)
    }
}

/// A single login attempt awaiting email verification. The token is the
/// session id the client chose for that attempt.
#[derive(Debug, Clone)]
pub struct Verification {
    pub id: VerificationId,
    pub email: String,
    pub token: SessionId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_verified: bool,
}

impl Verification {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// A recurring weekly class slot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClassSession {
    #[serde(default)]
    pub id: Option<String>,
    pub day_of_week: String,
    pub start_time: String,
    pub end_time: String,
}

/// One entry on a lecture day's timeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineItem {
    #[serde(default)]
    pub id: Option<String>,
    pub start_time: String,
    pub end_time: String,
    pub description: String,
}

impl TimelineItem {
    /// End must come after start for the item to make sense on a timeline
    pub fn is_valid(&self) -> bool {
        !self.description.is_empty() && self.end_time > self.start_time
    }
}

/// A concrete dated class session, expanded from the recurring schedule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LectureDay {
    pub id: String,
    pub date: String,
    pub day_of_week: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline: Option<Vec<TimelineItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A course's lecture record
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lecture {
    pub id: LectureId,
    pub key: LectureKey,
    pub lecturer_id: UserId,
    pub course_name: String,
    pub semester_start_date: String,
    pub semester_end_date: String,
    pub class_sessions: Vec<ClassSession>,
    pub lecture_days: Vec<LectureDay>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a lecture
#[derive(Debug, Clone)]
pub struct NewLecture {
    pub key: LectureKey,
    pub lecturer_id: UserId,
    pub course_name: String,
    pub semester_start_date: String,
    pub semester_end_date: String,
    pub class_sessions: Vec<ClassSession>,
    pub lecture_days: Vec<LectureDay>,
}

/// Partial lecture update. Key, owner and creation time are immutable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LectureUpdate {
    #[serde(default)]
    pub course_name: Option<String>,
    #[serde(default)]
    pub semester_start_date: Option<String>,
    #[serde(default)]
    pub semester_end_date: Option<String>,
    #[serde(default)]
    pub class_sessions: Option<Vec<ClassSession>>,
    #[serde(default)]
    pub lecture_days: Option<Vec<LectureDay>>,
}

/// Partial update of one lecture day
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LectureDayUpdate {
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub timeline: Option<Vec<TimelineItem>>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl LectureDayUpdate {
    /// Apply to an embedded day, leaving omitted fields untouched
    pub fn apply(&self, day: &mut LectureDay) {
        if let Some(topic) = &self.topic {
            day.topic = Some(topic.clone());
        }
        if let Some(timeline) = &self.timeline {
            day.timeline = Some(timeline.clone());
        }
        if let Some(notes) = &self.notes {
            day.notes = Some(notes.clone());
        }
    }
}

/// One student question tied to a lecture by its shareable key
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentQuestion {
    pub id: QuestionId,
    pub lecture_key: LectureKey,
    pub student_name: String,
    pub question: String,
    pub is_answered: bool,
    /// Flips false to true exactly once, at delivery time, and never reverts
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating a student question
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub lecture_key: LectureKey,
    pub student_name: String,
    pub question: String,
}

/// A scheduled meeting (standup, office hours) owned by a user via their
/// unique number. Addressed externally by `meeting_id`, an opaque string
/// minted by the client or generated server-side.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MeetingSession {
    pub id: MeetingSessionId,
    pub meeting_id: String,
    pub unique_number: String,
    pub name: String,
    pub expected_start_time: Option<String>,
    pub expected_end_time: Option<String>,
    pub actual_start_time: Option<String>,
    pub actual_end_time: Option<String>,
    pub notes_available: bool,
    pub session_notes: Option<String>,
    pub allow_queries: bool,
    pub agenda_available: bool,
    pub agenda: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a meeting session
#[derive(Debug, Clone)]
pub struct NewMeetingSession {
    pub meeting_id: String,
    pub unique_number: String,
    pub name: String,
    pub expected_start_time: Option<String>,
    pub expected_end_time: Option<String>,
    pub notes_available: bool,
    pub session_notes: Option<String>,
    pub allow_queries: bool,
    pub agenda_available: bool,
    pub agenda: Option<String>,
}

/// Partial meeting session update. The meeting id and owner never change.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingSessionUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub expected_start_time: Option<String>,
    #[serde(default)]
    pub expected_end_time: Option<String>,
    #[serde(default)]
    pub actual_start_time: Option<String>,
    #[serde(default)]
    pub actual_end_time: Option<String>,
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

impl MeetingSessionUpdate {
    /// Apply to a meeting, leaving omitted fields untouched
    pub fn apply(&self, meeting: &mut MeetingSession) {
        if let Some(name) = &self.name {
            meeting.name = name.clone();
        }
        if let Some(start) = &self.expected_start_time {
            meeting.expected_start_time = Some(start.clone());
        }
        if let Some(end) = &self.expected_end_time {
            meeting.expected_end_time = Some(end.clone());
        }
        if let Some(start) = &self.actual_start_time {
            meeting.actual_start_time = Some(start.clone());
        }
        if let Some(end) = &self.actual_end_time {
            meeting.actual_end_time = Some(end.clone());
        }
        if let Some(available) = self.notes_available {
            meeting.notes_available = available;
        }
        if let Some(notes) = &self.session_notes {
            meeting.session_notes = Some(notes.clone());
        }
        if let Some(allow) = self.allow_queries {
            meeting.allow_queries = allow;
        }
        if let Some(available) = self.agenda_available {
            meeting.agenda_available = available;
        }
        if let Some(agenda) = &self.agenda {
            meeting.agenda = Some(agenda.clone());
        }
    }
}

/// Default verification link lifetime
pub fn default_verification_ttl() -> Duration {
    Duration::minutes(15)
}
