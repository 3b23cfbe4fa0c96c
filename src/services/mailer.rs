//! Outbound email

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpSettings;
use crate::{EcommerceError, Result};

/// Port 465 expects TLS from the first byte; anything else upgrades with STARTTLS.
const IMPLICIT_TLS_PORT: u16 = 465;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Email { pub from: String, pub to: String, pub subject: String, pub body: String }

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<()>;
}

/// Delivers through an authenticated SMTP relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self> {
        let relay = if settings.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
        };
        let builder = relay.map_err(|e| EcommerceError::Config(format!("invalid SMTP host '{}': {e}", settings.host)))?;

        let transport = builder
            .port(settings.port)
            .credentials(Credentials::new(settings.username.clone(), settings.password.clone()))
            .build();
        Ok(Self { transport })
    }

    fn build(email: Email) -> Result<Message> {
        let mailbox = |raw: &str| {
            raw.parse::<Mailbox>().map_err(|e| EcommerceError::Internal(format!("invalid address '{raw}': {e}")))
        };
        Message::builder()
            .from(mailbox(&email.from)?)
            .to(mailbox(&email.to)?)
            .subject(email.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(email.body)
            .map_err(|e| EcommerceError::Internal(format!("could not build email: {e}")))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: Email) -> Result<()> {
        let to = email.to.clone();
        let message = Self::build(email)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| EcommerceError::Internal(format!("SMTP delivery failed: {e}")))?;
        tracing::info!(%to, "email sent");
        Ok(())
    }
}

/// Writes messages to the log instead of a mail server.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<()> {
        tracing::info!(from = %email.from, to = %email.to, subject = %email.subject, "email logged, no SMTP server configured");
        tracing::debug!(body = %email.body, "email body");
        Ok(())
    }
}
