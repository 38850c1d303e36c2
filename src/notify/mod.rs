//! Verification email delivery abstractions

pub mod console;
pub mod smtp;

pub use console::ConsoleNotifier;
pub use smtp::{SmtpConfig, SmtpNotifier};

/// Trait for delivering login verification links
pub trait Notifier: Send + Sync {
    /// Send a verification link to an email address
    fn send_verification_link(&self, email: &str, link: &str) -> Result<(), String>;
}

/// Allow using Box<dyn Notifier> as a Notifier
impl Notifier for Box<dyn Notifier> {
    fn send_verification_link(&self, email: &str, link: &str) -> Result<(), String> {
        (**self).send_verification_link(email, link)
    }
}
