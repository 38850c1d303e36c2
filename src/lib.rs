//! Lectern — classroom session and question tracking backend
//!
//! Passwordless email-verified authentication with multi-device session
//! linking, lecture management keyed by short shareable codes, and a
//! cooldown-gated polling endpoint that drips student questions to the
//! lecturer one at a time.

pub mod config;
pub mod delivery;
pub mod error;
pub mod keygen;
pub mod notify;
pub mod routes;
pub mod state;
pub mod store;

pub use config::Config;
pub use error::ApiError;
pub use notify::{ConsoleNotifier, Notifier, SmtpConfig, SmtpNotifier};
pub use state::AppState;
pub use store::{InMemoryStore, LectureStore, MeetingStore, SqliteStore, UserStore};
