//! Application state

use std::sync::Arc;

use chrono::Duration;

use crate::config::Config;
use crate::notify::Notifier;
use crate::store::{LectureStore, MeetingStore, UserStore};

/// Shared application state, generic over the store and notifier so tests
/// can swap in mocks
pub struct AppState<S, N>
where
    S: UserStore + LectureStore + MeetingStore,
    N: Notifier,
{
    pub store: Arc<S>,
    pub notifier: Arc<N>,
    /// Base URL used when building verification links
    pub base_url: String,
    /// Verification link lifetime in minutes
    pub verification_ttl_minutes: i64,
    /// Minimum spacing between question deliveries per lecture
    pub question_cooldown: Duration,
}

impl<S, N> AppState<S, N>
where
    S: UserStore + LectureStore + MeetingStore,
    N: Notifier,
{
    pub fn new(config: &Config, store: S, notifier: N) -> Self {
        Self {
            store: Arc::new(store),
            notifier: Arc::new(notifier),
            base_url: config.base_url.clone(),
            verification_ttl_minutes: config.verification_expiry_minutes,
            question_cooldown: Duration::seconds(config.question_cooldown_seconds),
        }
    }

    /// The link a user must visit to activate the given session id
    pub fn verification_link(&self, session_id: &str) -> String {
        format!("{}/auth/verify?sessionId={}", self.base_url, session_id)
    }
}
