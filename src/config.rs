//! Application configuration

use crate::notify::SmtpConfig;

#[derive(Debug, Clone)]
pub struct Config {
    /// Port to listen on
    pub port: u16,

    /// Base URL used when building verification links
    pub base_url: String,

    /// SQLite database path; None selects the in-memory store
    pub database_path: Option<String>,

    /// How long a verification link stays valid
    pub verification_expiry_minutes: i64,

    /// Minimum spacing between two question deliveries for the same lecture
    pub question_cooldown_seconds: i64,

    /// SMTP configuration; None selects the console notifier
    pub smtp: Option<SmtpConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8061,
            base_url: "http://localhost:8061".to_string(),
            database_path: None,
            verification_expiry_minutes: 15,
            question_cooldown_seconds: 30,
            smtp: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port);

        let base_url = std::env::var("BASE_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.base_url);

        let database_path = std::env::var("DATABASE_PATH").ok().filter(|s| !s.is_empty());

        let verification_expiry_minutes = std::env::var("VERIFICATION_EXPIRY_MINUTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.verification_expiry_minutes);

        let question_cooldown_seconds = std::env::var("QUESTION_COOLDOWN_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.question_cooldown_seconds);

        Self {
            port,
            base_url,
            database_path,
            verification_expiry_minutes,
            question_cooldown_seconds,
            smtp: SmtpConfig::from_env(),
        }
    }
}
