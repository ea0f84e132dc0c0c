//! Outbound notifications (email).
//!
//! Delivery failures never fail the operation that triggered them; they are
//! logged and counted by [`deliver_non_fatal`].

mod log;
mod memory;
mod smtp;

pub use log::LogMailer;
pub use memory::InMemoryMailer;
pub use smtp::{SmtpConfig, SmtpMailer};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An email to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

impl Notification {
    pub fn new(
        to: impl Into<String>,
        subject: impl Into<String>,
        html_body: impl Into<String>,
    ) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            html_body: html_body.into(),
        }
    }
}

/// Errors raised by a mail transport.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Mail transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError>;
}

/// Sends a notification, logging and counting a failure instead of returning it.
///
/// Returns whether the notification was delivered.
pub async fn deliver_non_fatal(mailer: &dyn Mailer, notification: &Notification) -> bool {
    match mailer.send(notification).await {
        Ok(()) => {
            tracing::debug!(to = %notification.to, subject = %notification.subject, "notification sent");
            true
        }
        Err(e) => {
            metrics::counter!("notifications_failed_total").increment(1);
            tracing::warn!(
                to = %notification.to,
                subject = %notification.subject,
                error = %e,
                "notification delivery failed"
            );
            false
        }
    }
}
