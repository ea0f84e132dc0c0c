//! SMTP transport using Lettre.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{Mailer, Notification, NotificationError};

/// SMTP relay settings.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Sender address, e.g. `"Shop <shop@example.com>"`.
    pub from: String,
}

/// Mailer sending HTML email through an SMTP relay.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    /// Builds the relay transport.
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the relay host is invalid.
    pub fn new(config: SmtpConfig) -> Result<Self, NotificationError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| NotificationError::Transport(format!("SMTP relay error: {e}")))?
            .port(config.port)
            .credentials(Credentials::new(config.username, config.password))
            .build();

        Ok(Self {
            transport,
            from: config.from,
        })
    }

    fn build_message(&self, notification: &Notification) -> Result<Message, NotificationError> {
        let from = self
            .from
            .parse()
            .map_err(|e: lettre::address::AddressError| NotificationError::InvalidAddress {
                address: self.from.clone(),
                reason: e.to_string(),
            })?;
        let to = notification
            .to
            .parse()
            .map_err(|e: lettre::address::AddressError| NotificationError::InvalidAddress {
                address: notification.to.clone(),
                reason: e.to_string(),
            })?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(notification.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(notification.html_body.clone())
            .map_err(|e| NotificationError::Build(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        let message = self.build_message(notification)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| NotificationError::Transport(format!("Failed to send email: {e}")))?;
        Ok(())
    }
}
