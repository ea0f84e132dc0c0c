use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::UserId;
use document_store::{DocumentStore, StoreError};

use super::Account;
use super::password::{hash_password, verify_password};
use crate::error::DomainError;
use crate::identity::RequestContext;
use crate::notify::{Mailer, Notification, deliver_non_fatal};
use crate::repository::Repository;

const MIN_PASSWORD_LEN: usize = 5;

/// Account service configuration.
#[derive(Debug, Clone)]
pub struct AccountSettings {
    /// Base URL the reset link points at; the link is `{base}/reset/{token}`.
    pub reset_base_url: String,
    /// How long a reset token stays valid.
    pub reset_token_ttl: Duration,
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            reset_base_url: "http://localhost:3000".into(),
            reset_token_ttl: Duration::from_secs(60 * 60),
        }
    }
}

/// An issued password reset token.
#[derive(Debug, Clone)]
pub struct PasswordReset {
    pub user_id: UserId,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signup, login and password reset.
pub struct AccountService<S: DocumentStore> {
    accounts: Repository<S, Account>,
    mailer: Arc<dyn Mailer>,
    settings: AccountSettings,
}

impl<S: DocumentStore + Clone> Clone for AccountService<S> {
    fn clone(&self) -> Self {
        Self {
            accounts: self.accounts.clone(),
            mailer: Arc::clone(&self.mailer),
            settings: self.settings.clone(),
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> Result<(), DomainError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(DomainError::Validation("please enter a valid email".into()))
    }
}

fn validate_password(password: &str) -> Result<(), DomainError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn invalid_reset_token() -> DomainError {
    DomainError::Validation("invalid or expired reset token".into())
}

impl<S: DocumentStore> AccountService<S> {
    pub fn new(
        store: S,
        timeout: Duration,
        mailer: Arc<dyn Mailer>,
        settings: AccountSettings,
    ) -> Self {
        Self {
            accounts: Repository::new(store, timeout),
            mailer,
            settings,
        }
    }

    /// Registers an account and sends a welcome email.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a malformed email, a short password, a
    /// mismatched confirmation or an email that is already registered.
    #[tracing::instrument(skip(self, password, confirm_password))]
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<RequestContext, DomainError> {
        let email = normalize_email(email);
        validate_email(&email)?;
        validate_password(password)?;
        if password != confirm_password {
            return Err(DomainError::Validation("passwords have to match".into()));
        }

        let account = Account::new(email.clone(), hash_password(password.to_string()).await?);
        match self.accounts.insert(&account).await {
            Ok(_) => {}
            Err(DomainError::Storage(StoreError::ConcurrencyConflict { .. })) => {
                return Err(DomainError::Validation(
                    "an account with this email already exists".into(),
                ));
            }
            Err(e) => return Err(e),
        }
        tracing::info!(user_id = %account.user_id, "account created");

        let welcome = Notification::new(
            &email,
            "Regarding Signup",
            "<strong>Account successfully created.</strong>",
        );
        deliver_non_fatal(self.mailer.as_ref(), &welcome).await;

        Ok(RequestContext::new(account.user_id, email))
    }

    /// Checks credentials and returns the caller's identity.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<RequestContext, DomainError> {
        let email = normalize_email(email);
        let Some((account, _)) = self.accounts.find(&email).await? else {
            return Err(DomainError::InvalidCredentials);
        };
        if !verify_password(password.to_string(), account.password_hash.clone()).await? {
            tracing::info!(user_id = %account.user_id, "login rejected");
            return Err(DomainError::InvalidCredentials);
        }
        Ok(RequestContext::new(account.user_id, account.email))
    }

    /// Issues a reset token and emails the reset link.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no account uses the email.
    #[tracing::instrument(skip(self))]
    pub async fn request_password_reset(&self, email: &str) -> Result<PasswordReset, DomainError> {
        let email = normalize_email(email);
        let token = hex::encode(rand::random::<[u8; 32]>());
        let ttl = chrono::Duration::from_std(self.settings.reset_token_ttl)
            .map_err(|e| DomainError::Validation(format!("reset token ttl out of range: {e}")))?;
        let expires_at = Utc::now() + ttl;

        let (account, ()) = self
            .accounts
            .update(&email, |account| {
                account.reset_token = Some(token.clone());
                account.reset_token_expires_at = Some(expires_at);
                Ok(())
            })
            .await?;

        let link = format!(
            "{}/reset/{token}",
            self.settings.reset_base_url.trim_end_matches('/')
        );
        let notification = Notification::new(
            &account.email,
            "Password Reset",
            format!(
                "<h2>You requested a password reset</h2>\n<p>Click this <a href=\"{link}\">link</a> to set a new password.</p>"
            ),
        );
        deliver_non_fatal(self.mailer.as_ref(), &notification).await;

        Ok(PasswordReset {
            user_id: account.user_id,
            token,
            expires_at,
        })
    }

    /// Resolves an unexpired reset token to its account.
    #[tracing::instrument(skip(self, token))]
    pub async fn verify_reset_token(&self, token: &str) -> Result<UserId, DomainError> {
        self.account_for_token(token)
            .await
            .map(|account| account.user_id)
    }

    /// Sets a new password using a reset token, then invalidates the token.
    #[tracing::instrument(skip(self, token, new_password))]
    pub async fn reset_password(
        &self,
        user_id: UserId,
        token: &str,
        new_password: &str,
    ) -> Result<(), DomainError> {
        validate_password(new_password)?;
        let account = self.account_for_token(token).await?;
        if account.user_id != user_id {
            return Err(invalid_reset_token());
        }

        let password_hash = hash_password(new_password.to_string()).await?;
        let now = Utc::now();
        self.accounts
            .update(&account.email, |account| {
                if !account.reset_token_valid(token, now) {
                    return Err(invalid_reset_token());
                }
                account.password_hash = password_hash.clone();
                account.clear_reset_token();
                Ok(())
            })
            .await?;

        tracing::info!(%user_id, "password reset");
        Ok(())
    }

    async fn account_for_token(&self, token: &str) -> Result<Account, DomainError> {
        if token.is_empty() {
            return Err(invalid_reset_token());
        }
        let now = Utc::now();
        self.accounts
            .query(Repository::<S, Account>::query_all().field_eq("reset_token", token))
            .await?
            .into_iter()
            .find(|account| account.reset_token_valid(token, now))
            .ok_or_else(invalid_reset_token)
    }
}
