use domain::DomainError;
use thiserror::Error;

/// Errors that can occur while producing an invoice.
#[derive(Debug, Error)]
pub enum InvoiceError {
    /// Loading the order failed (not found, forbidden, storage).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Neither the file nor the response could be written.
    #[error("All invoice sinks failed (file: {file}; response: {response})")]
    AllSinksFailed { file: String, response: String },
}

/// Result type for invoice operations.
pub type Result<T> = std::result::Result<T, InvoiceError>;
