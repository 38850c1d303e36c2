//! In-memory storage implementation

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};

use super::{
    Lecture, LectureDayUpdate, LectureId, LectureKey, LectureStore, LectureUpdate, MeetingSession,
    MeetingSessionId, MeetingSessionUpdate, MeetingStore, NewLecture, NewMeetingSession,
    NewQuestion, QuestionId, SessionId, SessionState, StoreResult, StudentQuestion, User, UserId,
    UserOptions, UserStore, Verification, VerificationId,
};
use crate::error::ApiError;
use crate::keygen;

/// In-memory store implementing both `UserStore` and `LectureStore`
pub struct InMemoryStore {
    users: RwLock<HashMap<UserId, User>>,
    /// email -> user id, emails stored normalized
    emails: RwLock<HashMap<String, UserId>>,
    verifications: RwLock<HashMap<VerificationId, Verification>>,
    lectures: RwLock<HashMap<LectureKey, Lecture>>,
    questions: RwLock<HashMap<QuestionId, StudentQuestion>>,
    /// meeting_id -> meeting
    meetings: RwLock<HashMap<String, MeetingSession>>,
    next_user_id: AtomicI64,
    next_verification_id: AtomicI64,
    next_lecture_id: AtomicI64,
    next_question_id: AtomicI64,
    next_meeting_id: AtomicI64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            emails: RwLock::new(HashMap::new()),
            verifications: RwLock::new(HashMap::new()),
            lectures: RwLock::new(HashMap::new()),
            questions: RwLock::new(HashMap::new()),
            meetings: RwLock::new(HashMap::new()),
            next_user_id: AtomicI64::new(1),
            next_verification_id: AtomicI64::new(1),
            next_lecture_id: AtomicI64::new(1),
            next_question_id: AtomicI64::new(1),
            next_meeting_id: AtomicI64::new(1),
        }
    }

    fn find_user_by_session_in(
        &self,
        session_id: &SessionId,
        states: &[SessionState],
    ) -> StoreResult<Option<User>> {
        let users = self.users.read().unwrap();
        Ok(users
            .values()
            .find(|u| {
                u.session_state(session_id)
                    .map(|s| states.contains(&s))
                    .unwrap_or(false)
            })
            .cloned())
    }

    fn with_user_mut<T>(
        &self,
        user_id: UserId,
        f: impl FnOnce(&mut User) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut users = self.users.write().unwrap();
        let user = users.get_mut(&user_id).ok_or(ApiError::UserNotFound)?;
        f(user)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl UserStore for InMemoryStore {
    fn find_or_create_user(&self, email: &str) -> StoreResult<User> {
        // The email index write lock is held across check-and-insert, so
        // concurrent logins for one address cannot both miss and mint two
        // accounts. Lock order is always emails before users.
        let mut emails = self.emails.write().unwrap();
        let mut users = self.users.write().unwrap();

        if let Some(id) = emails.get(email) {
            let user = users
                .get(id)
                .cloned()
                .ok_or_else(|| ApiError::Internal("email index points at no user".to_string()))?;
            return Ok(user);
        }

        let id = UserId(self.next_user_id.fetch_add(1, Ordering::SeqCst));
        let user = User {
            id,
            email: email.to_string(),
            unique_number: keygen::generate_unique_number(),
            sessions: HashMap::new(),
            options: UserOptions::default(),
            created_at: Utc::now(),
            last_login: None,
        };

        emails.insert(email.to_string(), id);
        users.insert(id, user.clone());
        Ok(user)
    }

    fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let emails = self.emails.read().unwrap();
        let users = self.users.read().unwrap();
        Ok(emails.get(email).and_then(|id| users.get(id)).cloned())
    }

    fn find_user_by_unique_number(&self, unique_number: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().unwrap();
        Ok(users
            .values()
            .find(|u| u.unique_number == unique_number)
            .cloned())
    }

    fn find_user_by_active_session(&self, session_id: &SessionId) -> StoreResult<Option<User>> {
        self.find_user_by_session_in(session_id, &[SessionState::Active])
    }

    fn find_user_by_live_session(&self, session_id: &SessionId) -> StoreResult<Option<User>> {
        self.find_user_by_session_in(session_id, &[SessionState::Active, SessionState::Pending])
    }

    fn add_pending_session(&self, user_id: UserId, session_id: &SessionId) -> StoreResult<()> {
        self.with_user_mut(user_id, |user| {
            user.sessions
                .entry(session_id.clone())
                .or_insert(SessionState::Pending);
            user.last_login = Some(Utc::now());
            Ok(())
        })
    }

    fn add_active_session(&self, user_id: UserId, session_id: &SessionId) -> StoreResult<()> {
        self.with_user_mut(user_id, |user| {
            user.sessions
                .entry(session_id.clone())
                .or_insert(SessionState::Active);
            user.last_login = Some(Utc::now());
            Ok(())
        })
    }

    fn activate_session(&self, user_id: UserId, session_id: &SessionId) -> StoreResult<()> {
        self.with_user_mut(user_id, |user| match user.session_state(session_id) {
            Some(SessionState::Active) => Err(ApiError::SessionAlreadyActive),
            Some(SessionState::Inactive) => Err(ApiError::SessionOutdated),
            None => Err(ApiError::SessionNotFound),
            Some(SessionState::Pending) => {
                user.sessions.insert(session_id.clone(), SessionState::Active);
                Ok(())
            }
        })
    }

    fn inactivate_session(&self, user_id: UserId, session_id: &SessionId) -> StoreResult<()> {
        self.with_user_mut(user_id, |user| match user.session_state(session_id) {
            Some(SessionState::Inactive) => Err(ApiError::SessionAlreadyInactive),
            None => Err(ApiError::SessionNotFound),
            Some(SessionState::Active) | Some(SessionState::Pending) => {
                user.sessions
                    .insert(session_id.clone(), SessionState::Inactive);
                Ok(())
            }
        })
    }

    fn update_options(&self, user_id: UserId, options: &UserOptions) -> StoreResult<()> {
        self.with_user_mut(user_id, |user| {
            user.options = options.clone();
            Ok(())
        })
    }

    fn create_verification(
        &self,
        email: &str,
        token: &SessionId,
        ttl_minutes: i64,
    ) -> StoreResult<Verification> {
        let id = VerificationId(self.next_verification_id.fetch_add(1, Ordering::SeqCst));
        let now = Utc::now();
        let verification = Verification {
            id,
            email: email.to_string(),
            token: token.clone(),
            created_at: now,
            expires_at: now + Duration::minutes(ttl_minutes),
            is_verified: false,
        };
        self.verifications
            .write()
            .unwrap()
            .insert(id, verification.clone());
        Ok(verification)
    }

    fn find_unconsumed_verification(
        &self,
        token: &SessionId,
    ) -> StoreResult<Option<Verification>> {
        let verifications = self.verifications.read().unwrap();
        Ok(verifications
            .values()
            .find(|v| &v.token == token && !v.is_verified)
            .cloned())
    }

    fn mark_verification_verified(&self, id: VerificationId) -> StoreResult<()> {
        let mut verifications = self.verifications.write().unwrap();
        if let Some(verification) = verifications.get_mut(&id) {
            verification.is_verified = true;
        }
        Ok(())
    }

    fn delete_verifications_for_email(&self, email: &str) -> StoreResult<u64> {
        let mut verifications = self.verifications.write().unwrap();
        let before = verifications.len();
        verifications.retain(|_, v| v.email != email);
        Ok((before - verifications.len()) as u64)
    }
}

impl LectureStore for InMemoryStore {
    fn insert_lecture(&self, lecture: NewLecture) -> StoreResult<Lecture> {
        let id = LectureId(self.next_lecture_id.fetch_add(1, Ordering::SeqCst));
        let now = Utc::now();
        let lecture = Lecture {
            id,
            key: lecture.key,
            lecturer_id: lecture.lecturer_id,
            course_name: lecture.course_name,
            semester_start_date: lecture.semester_start_date,
            semester_end_date: lecture.semester_end_date,
            class_sessions: lecture.class_sessions,
            lecture_days: lecture.lecture_days,
            created_at: now,
            updated_at: now,
        };
        self.lectures
            .write()
            .unwrap()
            .insert(lecture.key.clone(), lecture.clone());
        Ok(lecture)
    }

    fn find_lecture_by_key(&self, key: &LectureKey) -> StoreResult<Option<Lecture>> {
        Ok(self.lectures.read().unwrap().get(key).cloned())
    }

    fn lectures_for_lecturer(&self, lecturer_id: UserId) -> StoreResult<Vec<Lecture>> {
        let lectures = self.lectures.read().unwrap();
        let mut result: Vec<Lecture> = lectures
            .values()
            .filter(|l| l.lecturer_id == lecturer_id)
            .cloned()
            .collect();
        result.sort_by_key(|l| l.created_at);
        Ok(result)
    }

    fn update_lecture(
        &self,
        key: &LectureKey,
        update: LectureUpdate,
    ) -> StoreResult<Option<Lecture>> {
        let mut lectures = self.lectures.write().unwrap();
        let Some(lecture) = lectures.get_mut(key) else {
            return Ok(None);
        };

        if let Some(course_name) = update.course_name {
            lecture.course_name = course_name;
        }
        if let Some(start) = update.semester_start_date {
            lecture.semester_start_date = start;
        }
        if let Some(end) = update.semester_end_date {
            lecture.semester_end_date = end;
        }
        if let Some(class_sessions) = update.class_sessions {
            lecture.class_sessions = class_sessions;
        }
        if let Some(lecture_days) = update.lecture_days {
            lecture.lecture_days = lecture_days;
        }
        lecture.updated_at = Utc::now();

        Ok(Some(lecture.clone()))
    }

    fn update_lecture_day(
        &self,
        key: &LectureKey,
        day_id: &str,
        update: &LectureDayUpdate,
    ) -> StoreResult<Option<Lecture>> {
        let mut lectures = self.lectures.write().unwrap();
        let Some(lecture) = lectures.get_mut(key) else {
            return Ok(None);
        };

        let day = lecture
            .lecture_days
            .iter_mut()
            .find(|d| d.id == day_id)
            .ok_or_else(|| ApiError::Validation(format!("Lecture day {} not found", day_id)))?;

        update.apply(day);
        lecture.updated_at = Utc::now();

        Ok(Some(lecture.clone()))
    }

    fn delete_lecture(&self, key: &LectureKey, lecturer_id: UserId) -> StoreResult<bool> {
        let mut lectures = self.lectures.write().unwrap();
        match lectures.get(key) {
            Some(lecture) if lecture.lecturer_id == lecturer_id => {
                lectures.remove(key);
                self.questions
                    .write()
                    .unwrap()
                    .retain(|_, q| &q.lecture_key != key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn insert_question(&self, question: NewQuestion) -> StoreResult<StudentQuestion> {
        let id = QuestionId(self.next_question_id.fetch_add(1, Ordering::SeqCst));
        let question = StudentQuestion {
            id,
            lecture_key: question.lecture_key,
            student_name: question.student_name,
            question: question.question,
            is_answered: false,
            is_delivered: false,
            delivered_at: None,
            created_at: Utc::now(),
        };
        self.questions.write().unwrap().insert(id, question.clone());
        Ok(question)
    }

    fn questions_for_lecture(&self, key: &LectureKey) -> StoreResult<Vec<StudentQuestion>> {
        let questions = self.questions.read().unwrap();
        let mut result: Vec<StudentQuestion> = questions
            .values()
            .filter(|q| &q.lecture_key == key)
            .cloned()
            .collect();
        result.sort_by_key(|q| (q.created_at, q.id.0));
        Ok(result)
    }

    fn count_unanswered_for_lecturer(&self, lecturer_id: UserId) -> StoreResult<u64> {
        let lectures = self.lectures.read().unwrap();
        let keys: Vec<&LectureKey> = lectures
            .values()
            .filter(|l| l.lecturer_id == lecturer_id)
            .map(|l| &l.key)
            .collect();

        let questions = self.questions.read().unwrap();
        Ok(questions
            .values()
            .filter(|q| !q.is_answered && keys.contains(&&q.lecture_key))
            .count() as u64)
    }

    fn latest_delivered_question(
        &self,
        key: &LectureKey,
    ) -> StoreResult<Option<StudentQuestion>> {
        let questions = self.questions.read().unwrap();
        Ok(questions
            .values()
            .filter(|q| &q.lecture_key == key && q.is_delivered)
            .max_by_key(|q| q.delivered_at)
            .cloned())
    }

    fn claim_oldest_undelivered(
        &self,
        key: &LectureKey,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<StudentQuestion>> {
        // Single write lock makes select-and-mark atomic: two concurrent
        // claims can never pick the same question.
        let mut questions = self.questions.write().unwrap();
        let oldest = questions
            .values()
            .filter(|q| &q.lecture_key == key && !q.is_delivered)
            .min_by_key(|q| (q.created_at, q.id.0))
            .map(|q| q.id);

        Ok(oldest.map(|id| {
            let question = questions.get_mut(&id).unwrap();
            question.is_delivered = true;
            question.delivered_at = Some(now);
            question.clone()
        }))
    }

    fn mark_question_answered(&self, id: &QuestionId) -> StoreResult<bool> {
        let mut questions = self.questions.write().unwrap();
        if let Some(question) = questions.get_mut(id) {
            question.is_answered = true;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

impl MeetingStore for InMemoryStore {
    fn insert_meeting(&self, meeting: NewMeetingSession) -> StoreResult<MeetingSession> {
        let mut meetings = self.meetings.write().unwrap();
        if meetings.contains_key(&meeting.meeting_id) {
            return Err(ApiError::Validation("Session ID already exists".to_string()));
        }

        let id = MeetingSessionId(self.next_meeting_id.fetch_add(1, Ordering::SeqCst));
        let now = Utc::now();
        let meeting = MeetingSession {
            id,
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
        };
        meetings.insert(meeting.meeting_id.clone(), meeting.clone());
        Ok(meeting)
    }

    fn find_meeting_by_meeting_id(
        &self,
        meeting_id: &str,
    ) -> StoreResult<Option<MeetingSession>> {
        Ok(self.meetings.read().unwrap().get(meeting_id).cloned())
    }

    fn meetings_for_unique_number(
        &self,
        unique_number: &str,
    ) -> StoreResult<Vec<MeetingSession>> {
        let meetings = self.meetings.read().unwrap();
        let mut result: Vec<MeetingSession> = meetings
            .values()
            .filter(|m| m.unique_number == unique_number)
            .cloned()
            .collect();
        result.sort_by_key(|m| (m.created_at, m.id.0));
        Ok(result)
    }

    fn update_meeting(
        &self,
        meeting_id: &str,
        update: &MeetingSessionUpdate,
    ) -> StoreResult<Option<MeetingSession>> {
        let mut meetings = self.meetings.write().unwrap();
        let Some(meeting) = meetings.get_mut(meeting_id) else {
            return Ok(None);
        };

        update.apply(meeting);
        meeting.updated_at = Utc::now();
        Ok(Some(meeting.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(s: &str) -> SessionId {
        SessionId(s.to_string())
    }

    fn seeded_user(store: &InMemoryStore) -> User {
        store.find_or_create_user("lecturer@example.com").unwrap()
    }

    fn seeded_lecture(store: &InMemoryStore, owner: UserId) -> LectureKey {
        let key = LectureKey("ABC234".to_string());
        store
            .insert_lecture(NewLecture {
                key: key.clone(),
                lecturer_id: owner,
                course_name: "Systems Programming".to_string(),
                semester_start_date: "2026-01-12".to_string(),
                semester_end_date: "2026-05-01".to_string(),
                class_sessions: vec![],
                lecture_days: vec![],
            })
            .unwrap();
        key
    }

    #[test]
    fn test_find_or_create_user_is_idempotent() {
        let store = InMemoryStore::new();
        let first = store.find_or_create_user("a@x.com").unwrap();
        let second = store.find_or_create_user("a@x.com").unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.unique_number, second.unique_number);
        assert_eq!(second.options.name, "Lecturer");
    }

    #[test]
    fn test_concurrent_logins_share_one_account() {
        use std::sync::{Arc, Barrier};

        let store = Arc::new(InMemoryStore::new());
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    store.find_or_create_user("same@example.com").unwrap().id
                })
            })
            .collect();

        let ids: Vec<UserId> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(
            ids.iter().all(|id| *id == ids[0]),
            "concurrent logins created distinct users: {:?}",
            ids
        );
    }

    #[test]
    fn test_session_in_at_most_one_state() {
        let store = InMemoryStore::new();
        let user = seeded_user(&store);
        let s1 = sid("s1");

        store.add_pending_session(user.id, &s1).unwrap();
        store.activate_session(user.id, &s1).unwrap();
        store.inactivate_session(user.id, &s1).unwrap();

        let user = store.find_user_by_email("lecturer@example.com").unwrap().unwrap();
        assert_eq!(user.sessions.len(), 1);
        assert_eq!(user.session_state(&s1), Some(SessionState::Inactive));
    }

    #[test]
    fn test_activate_requires_pending() {
        let store = InMemoryStore::new();
        let user = seeded_user(&store);

        let err = store.activate_session(user.id, &sid("ghost")).unwrap_err();
        assert!(matches!(err, ApiError::SessionNotFound));
    }

    #[test]
    fn test_activate_twice_reports_already_active() {
        let store = InMemoryStore::new();
        let user = seeded_user(&store);
        let s1 = sid("s1");

        store.add_pending_session(user.id, &s1).unwrap();
        store.activate_session(user.id, &s1).unwrap();

        let err = store.activate_session(user.id, &s1).unwrap_err();
        assert!(matches!(err, ApiError::SessionAlreadyActive));
    }

    #[test]
    fn test_logged_out_session_cannot_be_reactivated() {
        let store = InMemoryStore::new();
        let user = seeded_user(&store);
        let s1 = sid("s1");

        store.add_pending_session(user.id, &s1).unwrap();
        store.activate_session(user.id, &s1).unwrap();
        store.inactivate_session(user.id, &s1).unwrap();

        // A replayed verification link must not resurrect the session
        let err = store.activate_session(user.id, &s1).unwrap_err();
        assert!(matches!(err, ApiError::SessionOutdated));
    }

    #[test]
    fn test_inactivate_pending_session() {
        let store = InMemoryStore::new();
        let user = seeded_user(&store);
        let s1 = sid("s1");

        store.add_pending_session(user.id, &s1).unwrap();
        store.inactivate_session(user.id, &s1).unwrap();

        let err = store.inactivate_session(user.id, &s1).unwrap_err();
        assert!(matches!(err, ApiError::SessionAlreadyInactive));
    }

    #[test]
    fn test_lookup_by_session_state() {
        let store = InMemoryStore::new();
        let user = seeded_user(&store);
        let s1 = sid("s1");

        store.add_pending_session(user.id, &s1).unwrap();
        assert!(store.find_user_by_active_session(&s1).unwrap().is_none());
        assert!(store.find_user_by_live_session(&s1).unwrap().is_some());

        store.activate_session(user.id, &s1).unwrap();
        assert!(store.find_user_by_active_session(&s1).unwrap().is_some());
    }

    #[test]
    fn test_verification_lifecycle() {
        let store = InMemoryStore::new();
        let token = sid("s1");

        let v = store
            .create_verification("a@x.com", &token, 15)
            .unwrap();
        assert!(!v.is_verified);
        assert!(store.find_unconsumed_verification(&token).unwrap().is_some());

        store.mark_verification_verified(v.id).unwrap();
        assert!(store.find_unconsumed_verification(&token).unwrap().is_none());
    }

    #[test]
    fn test_new_verification_invalidates_old_links() {
        let store = InMemoryStore::new();

        store.create_verification("a@x.com", &sid("s1"), 15).unwrap();
        store.create_verification("a@x.com", &sid("s2"), 15).unwrap();

        let deleted = store.delete_verifications_for_email("a@x.com").unwrap();
        assert_eq!(deleted, 2);
        assert!(store.find_unconsumed_verification(&sid("s1")).unwrap().is_none());
    }

    #[test]
    fn test_claim_is_fifo() {
        let store = InMemoryStore::new();
        let user = seeded_user(&store);
        let key = seeded_lecture(&store, user.id);

        for name in ["first", "second", "third"] {
            store
                .insert_question(NewQuestion {
                    lecture_key: key.clone(),
                    student_name: name.to_string(),
                    question: format!("{} question", name),
                })
                .unwrap();
        }

        let now = Utc::now();
        let q1 = store.claim_oldest_undelivered(&key, now).unwrap().unwrap();
        let q2 = store.claim_oldest_undelivered(&key, now).unwrap().unwrap();
        let q3 = store.claim_oldest_undelivered(&key, now).unwrap().unwrap();
        assert_eq!(q1.student_name, "first");
        assert_eq!(q2.student_name, "second");
        assert_eq!(q3.student_name, "third");
        assert!(store.claim_oldest_undelivered(&key, now).unwrap().is_none());
    }

    #[test]
    fn test_claim_sets_delivery_fields_once() {
        let store = InMemoryStore::new();
        let user = seeded_user(&store);
        let key = seeded_lecture(&store, user.id);

        store
            .insert_question(NewQuestion {
                lecture_key: key.clone(),
                student_name: "Ada".to_string(),
                question: "What is ownership?".to_string(),
            })
            .unwrap();

        let now = Utc::now();
        let q = store.claim_oldest_undelivered(&key, now).unwrap().unwrap();
        assert!(q.is_delivered);
        assert_eq!(q.delivered_at, Some(now));

        let latest = store.latest_delivered_question(&key).unwrap().unwrap();
        assert_eq!(latest.id, q.id);
    }

    #[test]
    fn test_concurrent_claims_deliver_at_most_once() {
        use std::sync::Arc;

        let store = Arc::new(InMemoryStore::new());
        let user = store.find_or_create_user("race@example.com").unwrap();
        let key = seeded_lecture(&store, user.id);

        store
            .insert_question(NewQuestion {
                lecture_key: key.clone(),
                student_name: "Only".to_string(),
                question: "The single question".to_string(),
            })
            .unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                let key = key.clone();
                std::thread::spawn(move || {
                    store.claim_oldest_undelivered(&key, Utc::now()).unwrap()
                })
            })
            .collect();

        let results: Vec<Option<StudentQuestion>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        let delivered = results.iter().filter(|r| r.is_some()).count();
        assert_eq!(delivered, 1);
    }

    #[test]
    fn test_mark_answered_is_independent_of_delivery() {
        let store = InMemoryStore::new();
        let user = seeded_user(&store);
        let key = seeded_lecture(&store, user.id);

        let q = store
            .insert_question(NewQuestion {
                lecture_key: key.clone(),
                student_name: "Ada".to_string(),
                question: "Why borrowck?".to_string(),
            })
            .unwrap();

        assert!(store.mark_question_answered(&q.id).unwrap());
        assert!(store.mark_question_answered(&q.id).unwrap());

        // Answered but still undelivered; the scheduler can still claim it
        let claimed = store
            .claim_oldest_undelivered(&key, Utc::now())
            .unwrap()
            .unwrap();
        assert_eq!(claimed.id, q.id);
        assert!(claimed.is_answered);
    }

    #[test]
    fn test_delete_lecture_cascades_questions() {
        let store = InMemoryStore::new();
        let user = seeded_user(&store);
        let key = seeded_lecture(&store, user.id);

        store
            .insert_question(NewQuestion {
                lecture_key: key.clone(),
                student_name: "Ada".to_string(),
                question: "Gone soon".to_string(),
            })
            .unwrap();

        // Wrong owner deletes nothing
        assert!(!store.delete_lecture(&key, UserId(9999)).unwrap());
        assert!(store.delete_lecture(&key, user.id).unwrap());

        assert!(store.find_lecture_by_key(&key).unwrap().is_none());
        assert!(store.questions_for_lecture(&key).unwrap().is_empty());
    }

    fn quick_meeting(meeting_id: &str, unique_number: &str) -> NewMeetingSession {
        NewMeetingSession {
            meeting_id: meeting_id.to_string(),
            unique_number: unique_number.to_string(),
            name: "Morning Standup".to_string(),
            expected_start_time: Some("2026-09-01T10:00:00Z".to_string()),
            expected_end_time: Some("2026-09-01T11:00:00Z".to_string()),
            notes_available: false,
            session_notes: None,
            allow_queries: true,
            agenda_available: true,
            agenda: Some("Daily tasks".to_string()),
        }
    }

    #[test]
    fn test_find_user_by_unique_number() {
        let store = InMemoryStore::new();
        let user = seeded_user(&store);
        assert_eq!(user.unique_number.len(), 10);

        let found = store
            .find_user_by_unique_number(&user.unique_number)
            .unwrap()
            .unwrap();
        assert_eq!(found.id, user.id);
        assert!(store.find_user_by_unique_number("0000000000").unwrap().is_none());
    }

    #[test]
    fn test_meeting_ids_are_unique() {
        let store = InMemoryStore::new();
        store.insert_meeting(quick_meeting("m1", "1234567890")).unwrap();

        let err = store
            .insert_meeting(quick_meeting("m1", "1234567890"))
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_meetings_are_scoped_to_unique_number() {
        let store = InMemoryStore::new();
        store.insert_meeting(quick_meeting("m1", "1111111111")).unwrap();
        store.insert_meeting(quick_meeting("m2", "1111111111")).unwrap();
        store.insert_meeting(quick_meeting("m3", "2222222222")).unwrap();

        let mine = store.meetings_for_unique_number("1111111111").unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|m| m.unique_number == "1111111111"));
    }

    #[test]
    fn test_update_meeting_is_partial() {
        let store = InMemoryStore::new();
        store.insert_meeting(quick_meeting("m1", "1234567890")).unwrap();

        let update = MeetingSessionUpdate {
            actual_start_time: Some("2026-09-01T10:03:00Z".to_string()),
            notes_available: Some(true),
            session_notes: Some("Ran long".to_string()),
            ..Default::default()
        };
        let meeting = store.update_meeting("m1", &update).unwrap().unwrap();
        assert_eq!(meeting.actual_start_time.as_deref(), Some("2026-09-01T10:03:00Z"));
        assert!(meeting.notes_available);
        // Omitted fields keep their stored values
        assert_eq!(meeting.name, "Morning Standup");
        assert_eq!(meeting.agenda.as_deref(), Some("Daily tasks"));

        assert!(store.update_meeting("ghost", &update).unwrap().is_none());
    }

    #[test]
    fn test_count_unanswered_spans_all_lectures() {
        let store = InMemoryStore::new();
        let user = seeded_user(&store);
        let key_a = seeded_lecture(&store, user.id);
        let key_b = LectureKey("XYZ789".to_string());
        store
            .insert_lecture(NewLecture {
                key: key_b.clone(),
                lecturer_id: user.id,
                course_name: "Compilers".to_string(),
                semester_start_date: "2026-01-12".to_string(),
                semester_end_date: "2026-05-01".to_string(),
                class_sessions: vec![],
                lecture_days: vec![],
            })
            .unwrap();

        for key in [&key_a, &key_b] {
            store
                .insert_question(NewQuestion {
                    lecture_key: key.clone(),
                    student_name: "Ada".to_string(),
                    question: "?".to_string(),
                })
                .unwrap();
        }
        let answered = store
            .insert_question(NewQuestion {
                lecture_key: key_a.clone(),
                student_name: "Ada".to_string(),
                question: "answered one".to_string(),
            })
            .unwrap();
        store.mark_question_answered(&answered.id).unwrap();

        assert_eq!(store.count_unanswered_for_lecturer(user.id).unwrap(), 2);
    }
}
