//! Credential checks behind the session layer: signup, login and password reset.

mod account;
mod password;
mod service;

pub use account::Account;
pub use service::{AccountService, AccountSettings, PasswordReset};
