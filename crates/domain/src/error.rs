//! Domain error types.

use std::time::Duration;

use common::OrderId;
use document_store::StoreError;
use thiserror::Error;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A referenced product, order or account does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The requester does not own the referenced order.
    #[error("Order {order_id} does not belong to the requester")]
    Forbidden { order_id: OrderId },

    /// Checkout was attempted on a cart without items.
    #[error("Cannot check out an empty cart")]
    EmptyCart,

    /// Malformed input.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Email/password pair did not match an account.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// An error occurred in the document store.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// A storage call did not complete in time.
    #[error("Storage call '{operation}' timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Password hashing or verification could not run.
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
}

impl DomainError {
    /// Builds a `NotFound` error for an entity.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DomainError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns true for failures a caller may retry (timeouts and transient storage errors).
    pub fn is_transient(&self) -> bool {
        match self {
            DomainError::Timeout { .. } => true,
            DomainError::Storage(err) => err.is_transient(),
            _ => false,
        }
    }
}
