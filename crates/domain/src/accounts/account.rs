use chrono::{DateTime, Utc};
use common::UserId;
use serde::{Deserialize, Serialize};

use crate::entity::Entity;

/// A registered user. Stored under its normalized email, which makes the
/// email unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub user_id: UserId,
    pub email: String,
    pub password_hash: String,
    pub reset_token: Option<String>,
    pub reset_token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(email: String, password_hash: String) -> Self {
        Self {
            user_id: UserId::new(),
            email,
            password_hash,
            reset_token: None,
            reset_token_expires_at: None,
            created_at: Utc::now(),
        }
    }

    /// True if `token` is the account's reset token and has not expired at `now`.
    pub fn reset_token_valid(&self, token: &str, now: DateTime<Utc>) -> bool {
        match (&self.reset_token, self.reset_token_expires_at) {
            (Some(stored), Some(expires_at)) => stored == token && expires_at > now,
            _ => false,
        }
    }

    pub fn clear_reset_token(&mut self) {
        self.reset_token = None;
        self.reset_token_expires_at = None;
    }
}

impl Entity for Account {
    fn collection() -> &'static str {
        "accounts"
    }

    fn entity_name() -> &'static str {
        "Account"
    }

    fn document_id(&self) -> String {
        self.email.clone()
    }

    fn owner(&self) -> Option<String> {
        Some(self.user_id.to_string())
    }
}
