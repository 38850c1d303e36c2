//! Question delivery scheduler
//!
//! Turns the append-only question inbox into a rate-limited single-item
//! feed suitable for a lecturer UI polling every few seconds: at most one
//! never-before-delivered question per poll, with enforced spacing between
//! deliveries.

use chrono::{DateTime, Duration, Utc};

use crate::store::{LectureKey, LectureStore, StoreResult, StudentQuestion};

/// Default minimum spacing between two deliveries for the same lecture
pub fn default_cooldown() -> Duration {
    Duration::seconds(30)
}

/// Fetch the next question to show the lecturer, or None when nothing is
/// eligible.
///
/// The cooldown is anchored to the last *delivery* time, not the last poll:
/// a lecturer who stops polling and resumes later still waits out the
/// spacing from the previously shown question. While the cooldown holds, no
/// question is returned even if undelivered ones are queued — it is a
/// per-lecture throttle, not a per-question one.
///
/// The claim itself is a single atomic select-and-mark in the store, so
/// concurrent polls for the same lecture never double-deliver.
pub fn next_question<L: LectureStore + ?Sized>(
    store: &L,
    key: &LectureKey,
    cooldown: Duration,
    now: DateTime<Utc>,
) -> StoreResult<Option<StudentQuestion>> {
    if let Some(last) = store.latest_delivered_question(key)? {
        if let Some(delivered_at) = last.delivered_at {
            if now < delivered_at + cooldown {
                return Ok(None);
            }
        }
    }

    store.claim_oldest_undelivered(key, now)
}
