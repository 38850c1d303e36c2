//! Console-based notifier for development

use super::Notifier;

/// Notifier that logs verification links to the console (for development)
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for ConsoleNotifier {
    fn send_verification_link(&self, email: &str, link: &str) -> Result<(), String> {
        println!();
        println!("========================================");
        println!("  VERIFICATION LINK FOR: {}", email);
        println!("  {}", link);
        println!("========================================");
        println!();

        tracing::info!(email = %email, link = %link, "Verification link sent");

        Ok(())
    }
}
