use async_trait::async_trait;

use super::{Mailer, Notification, NotificationError};

/// Mailer that only logs, for local development without an SMTP relay.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        tracing::info!(
            to = %notification.to,
            subject = %notification.subject,
            body_len = notification.html_body.len(),
            "email (not sent, log mailer)"
        );
        Ok(())
    }
}
