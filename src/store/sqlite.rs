//! SQLite-based storage implementation

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{
    Lecture, LectureDay, LectureDayUpdate, LectureId, LectureKey, LectureStore, LectureUpdate,
    MeetingSession, MeetingSessionId, MeetingSessionUpdate, MeetingStore, NewLecture,
    NewMeetingSession, NewQuestion, QuestionId, SessionId, SessionState, StoreResult,
    StudentQuestion, User, UserId, UserOptions, UserStore, Verification, VerificationId,
};
use crate::error::ApiError;
use crate::keygen;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// SQLite-based store implementing both `UserStore` and `LectureStore`
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

fn internal(e: impl std::fmt::Display) -> ApiError {
    ApiError::Internal(e.to_string())
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path
    pub fn open(path: &str) -> Result<Self, ApiError> {
        let conn = Connection::open(path).map_err(internal)?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(internal)?;

        Self::migrate(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (used by tests)
    pub fn open_in_memory() -> Result<Self, ApiError> {
        let conn = Connection::open_in_memory().map_err(internal)?;
        Self::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn migrate(conn: &Connection) -> Result<(), ApiError> {
        let current_version = Self::get_schema_version(conn)?;

        if current_version < SCHEMA_VERSION {
            tracing::info!(
                current = current_version,
                target = SCHEMA_VERSION,
                "Running database migrations"
            );

            if current_version < 1 {
                Self::migrate_v1(conn)?;
            }

            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )
            .map_err(internal)?;

            tracing::info!("Database migrations complete");
        }

        Ok(())
    }

    fn get_schema_version(conn: &Connection) -> Result<i32, ApiError> {
        let table_exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
                [],
                |row| row.get(0),
            )
            .map_err(internal)?;

        if !table_exists {
            return Ok(0);
        }

        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0).map(|v| v.unwrap_or(0))
        })
        .map_err(internal)
    }

    /// Migration to version 1: initial schema
    fn migrate_v1(conn: &Connection) -> Result<(), ApiError> {
        conn.execute_batch(
            r#"
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            -- Lecturer accounts
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                unique_number TEXT NOT NULL UNIQUE,
                options TEXT NOT NULL,
                created_at TEXT NOT NULL,
                last_login TEXT
            );

            -- Device sessions: one row per session id, state is the
            -- single source of truth for the session's lifecycle
            CREATE TABLE IF NOT EXISTS user_sessions (
                session_id TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                state TEXT NOT NULL CHECK(state IN ('pending', 'active', 'inactive'))
            );
            CREATE INDEX IF NOT EXISTS idx_user_sessions_user_id ON user_sessions(user_id);

            -- Login verification records
            CREATE TABLE IF NOT EXISTS verifications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL,
                token TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                is_verified INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_verifications_email ON verifications(email);
            CREATE INDEX IF NOT EXISTS idx_verifications_token ON verifications(token);

            -- Lectures; schedule fields stored as JSON documents
            CREATE TABLE IF NOT EXISTS lectures (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                key TEXT NOT NULL UNIQUE,
                lecturer_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                course_name TEXT NOT NULL,
                semester_start_date TEXT NOT NULL,
                semester_end_date TEXT NOT NULL,
                class_sessions TEXT NOT NULL,
                lecture_days TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_lectures_lecturer ON lectures(lecturer_id);

            -- Student questions
            CREATE TABLE IF NOT EXISTS questions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                lecture_key TEXT NOT NULL,
                student_name TEXT NOT NULL,
                question TEXT NOT NULL,
                is_answered INTEGER NOT NULL DEFAULT 0,
                is_delivered INTEGER NOT NULL DEFAULT 0,
                delivered_at TEXT,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_questions_lecture ON questions(lecture_key);

            -- Meeting sessions, addressed by the owner's unique number
            CREATE TABLE IF NOT EXISTS meeting_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                meeting_id TEXT NOT NULL UNIQUE,
                unique_number TEXT NOT NULL,
                name TEXT NOT NULL,
                expected_start_time TEXT,
                expected_end_time TEXT,
                actual_start_time TEXT,
                actual_end_time TEXT,
                notes_available INTEGER NOT NULL DEFAULT 0,
                session_notes TEXT,
                allow_queries INTEGER NOT NULL DEFAULT 1,
                agenda_available INTEGER NOT NULL DEFAULT 0,
                agenda TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_meetings_unique_number
                ON meeting_sessions(unique_number);
            "#,
        )
        .map_err(internal)?;

        Ok(())
    }

    fn load_sessions(
        conn: &Connection,
        user_id: i64,
    ) -> Result<HashMap<SessionId, SessionState>, ApiError> {
        let mut stmt = conn
            .prepare("SELECT session_id, state FROM user_sessions WHERE user_id = ?1")
            .map_err(internal)?;

        let sessions = stmt
            .query_map(params![user_id], |row| {
                let session_id: String = row.get(0)?;
                let state: String = row.get(1)?;
                Ok((session_id, state))
            })
            .map_err(internal)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(internal)?;

        Ok(sessions
            .into_iter()
            .filter_map(|(id, state)| {
                SessionState::from_str(&state).map(|s| (SessionId(id), s))
            })
            .collect())
    }

    fn find_user_by_session_in(
        &self,
        session_id: &SessionId,
        states: &str,
    ) -> StoreResult<Option<User>> {
        let conn = self.conn.lock().unwrap();

        let sql = format!(
            "SELECT u.id, u.email, u.unique_number, u.options, u.created_at, u.last_login
             FROM users u JOIN user_sessions s ON s.user_id = u.id
             WHERE s.session_id = ?1 AND s.state IN ({})",
            states
        );

        let row = conn
            .query_row(&sql, params![session_id.as_str()], Self::user_columns)
            .optional()
            .map_err(internal)?;

        Self::finish_user(&conn, row)
    }

    /// Maps the standard user column order (id, email, unique_number,
    /// options, created_at, last_login)
    #[allow(clippy::type_complexity)]
    fn user_columns(
        row: &Row<'_>,
    ) -> rusqlite::Result<(i64, String, String, String, String, Option<String>)> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
        ))
    }

    fn finish_user(
        conn: &Connection,
        row: Option<(i64, String, String, String, String, Option<String>)>,
    ) -> StoreResult<Option<User>> {
        match row {
            Some((id, email, unique_number, options_json, created_at, last_login)) => {
                Ok(Some(User {
                    id: UserId(id),
                    email,
                    unique_number,
                    sessions: Self::load_sessions(conn, id)?,
                    options: serde_json::from_str(&options_json).unwrap_or_default(),
                    created_at: parse_ts(&created_at),
                    last_login: last_login.as_deref().map(parse_ts),
                }))
            }
            None => Ok(None),
        }
    }

    fn session_state(
        conn: &Connection,
        user_id: UserId,
        session_id: &SessionId,
    ) -> Result<Option<SessionState>, ApiError> {
        let state: Option<String> = conn
            .query_row(
                "SELECT state FROM user_sessions WHERE user_id = ?1 AND session_id = ?2",
                params![user_id.0, session_id.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(internal)?;

        Ok(state.as_deref().and_then(SessionState::from_str))
    }

    fn user_exists(conn: &Connection, user_id: UserId) -> Result<bool, ApiError> {
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
            params![user_id.0],
            |row| row.get(0),
        )
        .map_err(internal)
    }

    fn add_session_if_absent(
        &self,
        user_id: UserId,
        session_id: &SessionId,
        state: SessionState,
    ) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        if !Self::user_exists(&conn, user_id)? {
            return Err(ApiError::UserNotFound);
        }

        conn.execute(
            "INSERT OR IGNORE INTO user_sessions (session_id, user_id, state) VALUES (?1, ?2, ?3)",
            params![session_id.as_str(), user_id.0, state.as_str()],
        )
        .map_err(internal)?;

        conn.execute(
            "UPDATE users SET last_login = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), user_id.0],
        )
        .map_err(internal)?;

        Ok(())
    }

    fn row_to_question(row: &Row<'_>) -> rusqlite::Result<StudentQuestion> {
        let id: i64 = row.get(0)?;
        let lecture_key: String = row.get(1)?;
        let student_name: String = row.get(2)?;
        let question: String = row.get(3)?;
        let is_answered: i32 = row.get(4)?;
        let is_delivered: i32 = row.get(5)?;
        let delivered_at: Option<String> = row.get(6)?;
        let created_at: String = row.get(7)?;

        Ok(StudentQuestion {
            id: QuestionId(id),
            lecture_key: LectureKey(lecture_key),
            student_name,
            question,
            is_answered: is_answered != 0,
            is_delivered: is_delivered != 0,
            delivered_at: delivered_at.as_deref().map(parse_ts),
            created_at: parse_ts(&created_at),
        })
    }

    fn row_to_lecture(row: &Row<'_>) -> rusqlite::Result<Lecture> {
        let id: i64 = row.get(0)?;
        let key: String = row.get(1)?;
        let lecturer_id: i64 = row.get(2)?;
        let course_name: String = row.get(3)?;
        let semester_start_date: String = row.get(4)?;
        let semester_end_date: String = row.get(5)?;
        let class_sessions: String = row.get(6)?;
        let lecture_days: String = row.get(7)?;
        let created_at: String = row.get(8)?;
        let updated_at: String = row.get(9)?;

        Ok(Lecture {
            id: LectureId(id),
            key: LectureKey(key),
            lecturer_id: UserId(lecturer_id),
            course_name,
            semester_start_date,
            semester_end_date,
            class_sessions: serde_json::from_str(&class_sessions).unwrap_or_default(),
            lecture_days: serde_json::from_str(&lecture_days).unwrap_or_default(),
            created_at: parse_ts(&created_at),
            updated_at: parse_ts(&updated_at),
        })
    }
}

const LECTURE_COLUMNS: &str = "id, key, lecturer_id, course_name, semester_start_date, \
     semester_end_date, class_sessions, lecture_days, created_at, updated_at";

const QUESTION_COLUMNS: &str =
    "id, lecture_key, student_name, question, is_answered, is_delivered, delivered_at, created_at";

const MEETING_COLUMNS: &str = "id, meeting_id, unique_number, name, expected_start_time, \
     expected_end_time, actual_start_time, actual_end_time, notes_available, session_notes, \
     allow_queries, agenda_available, agenda, created_at, updated_at";

impl UserStore for SqliteStore {
    fn find_or_create_user(&self, email: &str) -> StoreResult<User> {
        {
            let conn = self.conn.lock().unwrap();
            let options = serde_json::to_string(&UserOptions::default()).map_err(internal)?;

            // INSERT OR IGNORE keeps this idempotent under concurrent logins
            conn.execute(
                "INSERT OR IGNORE INTO users (email, unique_number, options, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    email,
                    keygen::generate_unique_number(),
                    options,
                    Utc::now().to_rfc3339()
                ],
            )
            .map_err(internal)?;
        }

        self.find_user_by_email(email)?
            .ok_or_else(|| ApiError::Internal("user vanished after insert".to_string()))
    }

    fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let conn = self.conn.lock().unwrap();

        let row = conn
            .query_row(
                "SELECT id, email, unique_number, options, created_at, last_login
                 FROM users WHERE email = ?1",
                params![email],
                Self::user_columns,
            )
            .optional()
            .map_err(internal)?;

        Self::finish_user(&conn, row)
    }

    fn find_user_by_unique_number(&self, unique_number: &str) -> StoreResult<Option<User>> {
        let conn = self.conn.lock().unwrap();

        let row = conn
            .query_row(
                "SELECT id, email, unique_number, options, created_at, last_login
                 FROM users WHERE unique_number = ?1",
                params![unique_number],
                Self::user_columns,
            )
            .optional()
            .map_err(internal)?;

        Self::finish_user(&conn, row)
    }

    fn find_user_by_active_session(&self, session_id: &SessionId) -> StoreResult<Option<User>> {
        self.find_user_by_session_in(session_id, "'active'")
    }

    fn find_user_by_live_session(&self, session_id: &SessionId) -> StoreResult<Option<User>> {
        self.find_user_by_session_in(session_id, "'active', 'pending'")
    }

    fn add_pending_session(&self, user_id: UserId, session_id: &SessionId) -> StoreResult<()> {
        self.add_session_if_absent(user_id, session_id, SessionState::Pending)
    }

    fn add_active_session(&self, user_id: UserId, session_id: &SessionId) -> StoreResult<()> {
        self.add_session_if_absent(user_id, session_id, SessionState::Active)
    }

    fn activate_session(&self, user_id: UserId, session_id: &SessionId) -> StoreResult<()> {
        // The connection mutex serializes the check and the update
        let conn = self.conn.lock().unwrap();
        if !Self::user_exists(&conn, user_id)? {
            return Err(ApiError::UserNotFound);
        }

        match Self::session_state(&conn, user_id, session_id)? {
            Some(SessionState::Active) => Err(ApiError::SessionAlreadyActive),
            Some(SessionState::Inactive) => Err(ApiError::SessionOutdated),
            None => Err(ApiError::SessionNotFound),
            Some(SessionState::Pending) => {
                conn.execute(
                    "UPDATE user_sessions SET state = 'active'
                     WHERE user_id = ?1 AND session_id = ?2 AND state = 'pending'",
                    params![user_id.0, session_id.as_str()],
                )
                .map_err(internal)?;
                Ok(())
            }
        }
    }

    fn inactivate_session(&self, user_id: UserId, session_id: &SessionId) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        if !Self::user_exists(&conn, user_id)? {
            return Err(ApiError::UserNotFound);
        }

        match Self::session_state(&conn, user_id, session_id)? {
            Some(SessionState::Inactive) => Err(ApiError::SessionAlreadyInactive),
            None => Err(ApiError::SessionNotFound),
            Some(SessionState::Active) | Some(SessionState::Pending) => {
                conn.execute(
                    "UPDATE user_sessions SET state = 'inactive'
                     WHERE user_id = ?1 AND session_id = ?2",
                    params![user_id.0, session_id.as_str()],
                )
                .map_err(internal)?;
                Ok(())
            }
        }
    }

    fn update_options(&self, user_id: UserId, options: &UserOptions) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let options_json = serde_json::to_string(options).map_err(internal)?;

        let rows = conn
            .execute(
                "UPDATE users SET options = ?1 WHERE id = ?2",
                params![options_json, user_id.0],
            )
            .map_err(internal)?;

        if rows == 0 {
            return Err(ApiError::UserNotFound);
        }
        Ok(())
    }

    fn create_verification(
        &self,
        email: &str,
        token: &SessionId,
        ttl_minutes: i64,
    ) -> StoreResult<Verification> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let expires_at = now + Duration::minutes(ttl_minutes);

        conn.execute(
            "INSERT INTO verifications (email, token, created_at, expires_at, is_verified)
             VALUES (?1, ?2, ?3, ?4, 0)",
            params![
                email,
                token.as_str(),
                now.to_rfc3339(),
                expires_at.to_rfc3339()
            ],
        )
        .map_err(internal)?;

        Ok(Verification {
            id: VerificationId(conn.last_insert_rowid()),
            email: email.to_string(),
            token: token.clone(),
            created_at: now,
            expires_at,
            is_verified: false,
        })
    }

    fn find_unconsumed_verification(
        &self,
        token: &SessionId,
    ) -> StoreResult<Option<Verification>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT id, email, token, created_at, expires_at, is_verified
             FROM verifications WHERE token = ?1 AND is_verified = 0",
            params![token.as_str()],
            |row| {
                let id: i64 = row.get(0)?;
                let email: String = row.get(1)?;
                let token: String = row.get(2)?;
                let created_at: String = row.get(3)?;
                let expires_at: String = row.get(4)?;
                let is_verified: i32 = row.get(5)?;
                Ok(Verification {
                    id: VerificationId(id),
                    email,
                    token: SessionId(token),
                    created_at: parse_ts(&created_at),
                    expires_at: parse_ts(&expires_at),
                    is_verified: is_verified != 0,
                })
            },
        )
        .optional()
        .map_err(internal)
    }

    fn mark_verification_verified(&self, id: VerificationId) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE verifications SET is_verified = 1 WHERE id = ?1",
            params![id.0],
        )
        .map_err(internal)?;
        Ok(())
    }

    fn delete_verifications_for_email(&self, email: &str) -> StoreResult<u64> {
        let conn = self.conn.lock().unwrap();
        let rows = conn
            .execute("DELETE FROM verifications WHERE email = ?1", params![email])
            .map_err(internal)?;
        Ok(rows as u64)
    }
}

impl LectureStore for SqliteStore {
    fn insert_lecture(&self, lecture: NewLecture) -> StoreResult<Lecture> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let class_sessions = serde_json::to_string(&lecture.class_sessions).map_err(internal)?;
        let lecture_days = serde_json::to_string(&lecture.lecture_days).map_err(internal)?;

        conn.execute(
            "INSERT INTO lectures
               (key, lecturer_id, course_name, semester_start_date, semester_end_date,
                class_sessions, lecture_days, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            params![
                lecture.key.as_str(),
                lecture.lecturer_id.0,
                lecture.course_name,
                lecture.semester_start_date,
                lecture.semester_end_date,
                class_sessions,
                lecture_days,
                now.to_rfc3339(),
            ],
        )
        .map_err(internal)?;

        Ok(Lecture {
            id: LectureId(conn.last_insert_rowid()),
            key: lecture.key,
            lecturer_id: lecture.lecturer_id,
            course_name: lecture.course_name,
            semester_start_date: lecture.semester_start_date,
            semester_end_date: lecture.semester_end_date,
            class_sessions: lecture.class_sessions,
            lecture_days: lecture.lecture_days,
            created_at: now,
            updated_at: now,
        })
    }

    fn find_lecture_by_key(&self, key: &LectureKey) -> StoreResult<Option<Lecture>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {} FROM lectures WHERE key = ?1", LECTURE_COLUMNS),
            params![key.as_str()],
            Self::row_to_lecture,
        )
        .optional()
        .map_err(internal)
    }

    fn lectures_for_lecturer(&self, lecturer_id: UserId) -> StoreResult<Vec<Lecture>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM lectures WHERE lecturer_id = ?1 ORDER BY created_at",
                LECTURE_COLUMNS
            ))
            .map_err(internal)?;

        let rows = stmt
            .query_map(params![lecturer_id.0], Self::row_to_lecture)
            .map_err(internal)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(internal)?;
        Ok(rows)
    }

    fn update_lecture(
        &self,
        key: &LectureKey,
        update: LectureUpdate,
    ) -> StoreResult<Option<Lecture>> {
        {
            let conn = self.conn.lock().unwrap();

            let exists: bool = conn
                .query_row(
                    "SELECT EXISTS(SELECT 1 FROM lectures WHERE key = ?1)",
                    params![key.as_str()],
                    |row| row.get(0),
                )
                .map_err(internal)?;
            if !exists {
                return Ok(None);
            }

            if let Some(course_name) = &update.course_name {
                conn.execute(
                    "UPDATE lectures SET course_name = ?1 WHERE key = ?2",
                    params![course_name, key.as_str()],
                )
                .map_err(internal)?;
            }
            if let Some(start) = &update.semester_start_date {
                conn.execute(
                    "UPDATE lectures SET semester_start_date = ?1 WHERE key = ?2",
                    params![start, key.as_str()],
                )
                .map_err(internal)?;
            }
            if let Some(end) = &update.semester_end_date {
                conn.execute(
                    "UPDATE lectures SET semester_end_date = ?1 WHERE key = ?2",
                    params![end, key.as_str()],
                )
                .map_err(internal)?;
            }
            if let Some(class_sessions) = &update.class_sessions {
                let json = serde_json::to_string(class_sessions).map_err(internal)?;
                conn.execute(
                    "UPDATE lectures SET class_sessions = ?1 WHERE key = ?2",
                    params![json, key.as_str()],
                )
                .map_err(internal)?;
            }
            if let Some(lecture_days) = &update.lecture_days {
                let json = serde_json::to_string(lecture_days).map_err(internal)?;
                conn.execute(
                    "UPDATE lectures SET lecture_days = ?1 WHERE key = ?2",
                    params![json, key.as_str()],
                )
                .map_err(internal)?;
            }

            conn.execute(
                "UPDATE lectures SET updated_at = ?1 WHERE key = ?2",
                params![Utc::now().to_rfc3339(), key.as_str()],
            )
            .map_err(internal)?;
        }

        self.find_lecture_by_key(key)
    }

    fn update_lecture_day(
        &self,
        key: &LectureKey,
        day_id: &str,
        update: &LectureDayUpdate,
    ) -> StoreResult<Option<Lecture>> {
        {
            let conn = self.conn.lock().unwrap();

            let lecture_days_json: Option<String> = conn
                .query_row(
                    "SELECT lecture_days FROM lectures WHERE key = ?1",
                    params![key.as_str()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(internal)?;

            let Some(json) = lecture_days_json else {
                return Ok(None);
            };

            let mut days: Vec<LectureDay> = serde_json::from_str(&json).unwrap_or_default();
            let day = days
                .iter_mut()
                .find(|d| d.id == day_id)
                .ok_or_else(|| ApiError::Validation(format!("Lecture day {} not found", day_id)))?;
            update.apply(day);

            let updated = serde_json::to_string(&days).map_err(internal)?;
            conn.execute(
                "UPDATE lectures SET lecture_days = ?1, updated_at = ?2 WHERE key = ?3",
                params![updated, Utc::now().to_rfc3339(), key.as_str()],
            )
            .map_err(internal)?;
        }

        self.find_lecture_by_key(key)
    }

    fn delete_lecture(&self, key: &LectureKey, lecturer_id: UserId) -> StoreResult<bool> {
        let conn = self.conn.lock().unwrap();

        let rows = conn
            .execute(
                "DELETE FROM lectures WHERE key = ?1 AND lecturer_id = ?2",
                params![key.as_str(), lecturer_id.0],
            )
            .map_err(internal)?;

        if rows == 0 {
            return Ok(false);
        }

        // Cascade: the lecture's question inbox goes with it
        conn.execute(
            "DELETE FROM questions WHERE lecture_key = ?1",
            params![key.as_str()],
        )
        .map_err(internal)?;

        Ok(true)
    }

    fn insert_question(&self, question: NewQuestion) -> StoreResult<StudentQuestion> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO questions (lecture_key, student_name, question, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                question.lecture_key.as_str(),
                question.student_name,
                question.question,
                now.to_rfc3339(),
            ],
        )
        .map_err(internal)?;

        Ok(StudentQuestion {
            id: QuestionId(conn.last_insert_rowid()),
            lecture_key: question.lecture_key,
            student_name: question.student_name,
            question: question.question,
            is_answered: false,
            is_delivered: false,
            delivered_at: None,
            created_at: now,
        })
    }

    fn questions_for_lecture(&self, key: &LectureKey) -> StoreResult<Vec<StudentQuestion>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM questions WHERE lecture_key = ?1 ORDER BY created_at, id",
                QUESTION_COLUMNS
            ))
            .map_err(internal)?;

        let rows = stmt
            .query_map(params![key.as_str()], Self::row_to_question)
            .map_err(internal)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(internal)?;
        Ok(rows)
    }

    fn count_unanswered_for_lecturer(&self, lecturer_id: UserId) -> StoreResult<u64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM questions q
                 JOIN lectures l ON l.key = q.lecture_key
                 WHERE l.lecturer_id = ?1 AND q.is_answered = 0",
                params![lecturer_id.0],
                |row| row.get(0),
            )
            .map_err(internal)?;
        Ok(count as u64)
    }

    fn latest_delivered_question(
        &self,
        key: &LectureKey,
    ) -> StoreResult<Option<StudentQuestion>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!(
                "SELECT {} FROM questions
                 WHERE lecture_key = ?1 AND is_delivered = 1
                 ORDER BY delivered_at DESC LIMIT 1",
                QUESTION_COLUMNS
            ),
            params![key.as_str()],
            Self::row_to_question,
        )
        .optional()
        .map_err(internal)
    }

    fn claim_oldest_undelivered(
        &self,
        key: &LectureKey,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<StudentQuestion>> {
        let conn = self.conn.lock().unwrap();

        // Select-and-mark in one statement; the inner re-check of
        // is_delivered makes the claim safe even without the outer mutex.
        conn.query_row(
            &format!(
                "UPDATE questions SET is_delivered = 1, delivered_at = ?2
                 WHERE id = (SELECT id FROM questions
                             WHERE lecture_key = ?1 AND is_delivered = 0
                             ORDER BY created_at, id LIMIT 1)
                   AND is_delivered = 0
                 RETURNING {}",
                QUESTION_COLUMNS
            ),
            params![key.as_str(), now.to_rfc3339()],
            Self::row_to_question,
        )
        .optional()
        .map_err(internal)
    }

    fn mark_question_answered(&self, id: &QuestionId) -> StoreResult<bool> {
        let conn = self.conn.lock().unwrap();
        let rows = conn
            .execute(
                "UPDATE questions SET is_answered = 1 WHERE id = ?1",
                params![id.0],
            )
            .map_err(internal)?;
        Ok(rows > 0)
    }
}

impl SqliteStore {
    fn row_to_meeting(row: &Row<'_>) -> rusqlite::Result<MeetingSession> {
        let id: i64 = row.get(0)?;
        let notes_available: i32 = row.get(8)?;
        let allow_queries: i32 = row.get(10)?;
        let agenda_available: i32 = row.get(11)?;
        let created_at: String = row.get(13)?;
        let updated_at: String = row.get(14)?;

        Ok(MeetingSession {
            id: MeetingSessionId(id),
            meeting_id: row.get(1)?,
            unique_number: row.get(2)?,
            name: row.get(3)?,
            expected_start_time: row.get(4)?,
            expected_end_time: row.get(5)?,
            actual_start_time: row.get(6)?,
            actual_end_time: row.get(7)?,
            notes_available: notes_available != 0,
            session_notes: row.get(9)?,
            allow_queries: allow_queries != 0,
            agenda_available: agenda_available != 0,
            agenda: row.get(12)?,
            created_at: parse_ts(&created_at),
            updated_at: parse_ts(&updated_at),
        })
    }
}

impl MeetingStore for SqliteStore {
    fn insert_meeting(&self, meeting: NewMeetingSession) -> StoreResult<MeetingSession> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();

        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO meeting_sessions
                   (meeting_id, unique_number, name, expected_start_time, expected_end_time,
                    notes_available, session_notes, allow_queries, agenda_available, agenda,
                    created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
                params![
                    meeting.meeting_id,
                    meeting.unique_number,
                    meeting.name,
                    meeting.expected_start_time,
                    meeting.expected_end_time,
                    meeting.notes_available as i32,
                    meeting.session_notes,
                    meeting.allow_queries as i32,
                    meeting.agenda_available as i32,
                    meeting.agenda,
                    now.to_rfc3339(),
                ],
            )
            .map_err(internal)?;

        if inserted == 0 {
            return Err(ApiError::Validation("Session ID already exists".to_string()));
        }

        Ok(MeetingSession {
            id: MeetingSessionId(conn.last_insert_rowid()),
            meeting_id: meeting.meeting_id,
            unique_number: meeting.unique_number,
            name: meeting.name,
            expected_start_time: meeting.expected_start_time,
            expected_end_time: meeting.expected_end_time,
            actual_start_time: None,
            actual_end_time: None,
            notes_available: meeting.notes_available,
            session_notes: meeting.session_notes,
            allow_queries: meeting.allow_queries,
            agenda_available: meeting.agenda_available,
            agenda: meeting.agenda,
            created_at: now,
            updated_at: now,
        })
    }

    fn find_meeting_by_meeting_id(
        &self,
        meeting_id: &str,
    ) -> StoreResult<Option<MeetingSession>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!(
                "SELECT {} FROM meeting_sessions WHERE meeting_id = ?1",
                MEETING_COLUMNS
            ),
            params![meeting_id],
            Self::row_to_meeting,
        )
        .optional()
        .map_err(internal)
    }

    fn meetings_for_unique_number(
        &self,
        unique_number: &str,
    ) -> StoreResult<Vec<MeetingSession>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM meeting_sessions WHERE unique_number = ?1 ORDER BY created_at, id",
                MEETING_COLUMNS
            ))
            .map_err(internal)?;

        let rows = stmt
            .query_map(params![unique_number], Self::row_to_meeting)
            .map_err(internal)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(internal)?;
        Ok(rows)
    }

    fn update_meeting(
        &self,
        meeting_id: &str,
        update: &MeetingSessionUpdate,
    ) -> StoreResult<Option<MeetingSession>> {
        // Single-document read-modify-write under the connection mutex
        let conn = self.conn.lock().unwrap();

        let existing = conn
            .query_row(
                &format!(
                    "SELECT {} FROM meeting_sessions WHERE meeting_id = ?1",
                    MEETING_COLUMNS
                ),
                params![meeting_id],
                Self::row_to_meeting,
            )
            .optional()
            .map_err(internal)?;

        let Some(mut meeting) = existing else {
            return Ok(None);
        };

        update.apply(&mut meeting);
        meeting.updated_at = Utc::now();

        conn.execute(
            "UPDATE meeting_sessions SET
               name = ?1, expected_start_time = ?2, expected_end_time = ?3,
               actual_start_time = ?4, actual_end_time = ?5, notes_available = ?6,
               session_notes = ?7, allow_queries = ?8, agenda_available = ?9,
               agenda = ?10, updated_at = ?11
             WHERE meeting_id = ?12",
            params![
                meeting.name,
                meeting.expected_start_time,
                meeting.expected_end_time,
                meeting.actual_start_time,
                meeting.actual_end_time,
                meeting.notes_available as i32,
                meeting.session_notes,
                meeting.allow_queries as i32,
                meeting.agenda_available as i32,
                meeting.agenda,
                meeting.updated_at.to_rfc3339(),
                meeting_id,
            ],
        )
        .map_err(internal)?;

        Ok(Some(meeting))
    }
}
