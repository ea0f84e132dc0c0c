//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use domain::{DEFAULT_PAGE_SIZE, DEFAULT_STORE_TIMEOUT, SmtpConfig};

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL URL; unset runs on the in-memory store
/// - `INVOICE_DIR`: where invoices are persisted (default: `"data/invoices"`)
/// - `STORE_TIMEOUT_MS`: bound on each storage call (default: `5000`)
/// - `PAGE_SIZE`: products per listing page (default: `2`)
/// - `MAIL_FROM`: sender address for notifications
/// - `RESET_BASE_URL`: base of password reset links (default: `"http://localhost:3000"`)
/// - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`: SMTP relay;
///   without `SMTP_HOST` notifications are only logged
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub invoice_dir: PathBuf,
    pub store_timeout: Duration,
    pub page_size: u64,
    pub mail_from: String,
    pub reset_base_url: String,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse(lookup("PORT")).unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            invoice_dir: lookup("INVOICE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.invoice_dir),
            store_timeout: parse(lookup("STORE_TIMEOUT_MS"))
                .map(Duration::from_millis)
                .unwrap_or(defaults.store_timeout),
            page_size: parse(lookup("PAGE_SIZE"))
                .filter(|size: &u64| *size > 0)
                .unwrap_or(defaults.page_size),
            mail_from: lookup("MAIL_FROM").unwrap_or(defaults.mail_from),
            reset_base_url: lookup("RESET_BASE_URL").unwrap_or(defaults.reset_base_url),
            smtp_host: lookup("SMTP_HOST").filter(|host| !host.is_empty()),
            smtp_port: parse(lookup("SMTP_PORT")).unwrap_or(defaults.smtp_port),
            smtp_username: lookup("SMTP_USERNAME").unwrap_or_default(),
            smtp_password: lookup("SMTP_PASSWORD").unwrap_or_default(),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// SMTP relay settings, if a relay host is configured.
    pub fn smtp(&self) -> Option<SmtpConfig> {
        self.smtp_host.as_ref().map(|host| SmtpConfig {
            host: host.clone(),
            port: self.smtp_port,
            username: self.smtp_username.clone(),
            password: self.smtp_password.clone(),
            from: self.mail_from.clone(),
        })
    }
}

fn parse<T: std::str::FromStr>(value: Option<String>) -> Option<T> {
    value.and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            invoice_dir: PathBuf::from("data/invoices"),
            store_timeout: DEFAULT_STORE_TIMEOUT,
            page_size: DEFAULT_PAGE_SIZE,
            mail_from: "Shop <noreply@example.com>".to_string(),
            reset_base_url: "http://localhost:3000".to_string(),
            smtp_host: None,
            smtp_port: 587,
            smtp_username: String::new(),
            smtp_password: String::new(),
        }
    }
}
