//! Outbound email notifications.
//!
//! Every lifecycle transition ends by handing one or more [`Email`]s to a
//! [`Notifier`]. Delivery is best effort: callers record a failure as a
//! warning on an already-committed operation instead of failing it.

pub mod smtp;
pub mod templates;

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// A recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

/// An HTML email with a primary recipient and an optional carbon copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub cc: Option<String>,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), NotifyError>;
}

/// Send each email in turn, collecting a warning for every failure.
pub async fn deliver_all(notifier: &dyn Notifier, emails: Vec<Email>) -> Vec<String> {
    let mut warnings = Vec::new();

    for email in emails {
        let to = email.to.clone();
        let subject = email.subject.clone();
        if let Err(e) = notifier.send(email).await {
            tracing::warn!(to = %to, subject = %subject, error = %e, "Email notification failed");
            warnings.push(format!("Failed to send \"{subject}\" to {to}: {e}"));
        }
    }

    warnings
}

/// Stand-in used when SMTP is not configured: logs instead of sending.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, email: Email) -> Result<(), NotifyError> {
        tracing::info!(
            to = %email.to,
            cc = email.cc.as_deref().unwrap_or("-"),
            subject = %email.subject,
            "SMTP not configured; email not sent"
        );
        Ok(())
    }
}
