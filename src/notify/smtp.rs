use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{Email, NotifyError, Notifier};
use crate::config::SmtpConfig;

/// Sends notification emails over SMTP with implicit TLS.
#[derive(Clone)]
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig, from: &str) -> Result<Self, NotifyError> {
        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?.port(config.port);

        if let (Some(user), Some(pass)) = (&config.user, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from: from.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, email: Email) -> Result<(), NotifyError> {
        let mut builder = Message::builder()
            .from(self.from.parse()?)
            .to(email.to.parse()?)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_HTML);

        if let Some(cc) = &email.cc {
            builder = builder.cc(cc.parse()?);
        }

        let message = builder
            .body(email.html)
            .map_err(|e| NotifyError::Build(e.to_string()))?;

        self.transport.send(message).await?;

        tracing::info!(to = %email.to, subject = %email.subject, "Notification email sent");
        Ok(())
    }
}
