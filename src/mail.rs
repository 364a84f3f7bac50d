//! Outbound mail for account flows.
//!
//! Delivery is abstracted behind a trait so tests and local development
//! can run without an SMTP relay. The default implementation writes the
//! message to the log instead of sending it.

use crate::error::Result;

/// Sends account-related mail.
pub trait Mailer: Send + Sync {
    /// Send the account confirmation link after registration.
    fn send_confirmation(&self, to: &str, name: &str, link: &str) -> Result<()>;

    /// Send a password recovery code.
    fn send_recovery(&self, to: &str, name: &str, code: &str) -> Result<()>;
}

/// Mailer that logs messages instead of delivering them.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send_confirmation(&self, to: &str, name: &str, link: &str) -> Result<()> {
        tracing::info!("Confirmation mail for {} <{}>: {}", name, to, link);
        Ok(())
    }

    fn send_recovery(&self, to: &str, name: &str, code: &str) -> Result<()> {
        tracing::info!("Recovery mail for {} <{}>: code {}", name, to, code);
        Ok(())
    }
}
