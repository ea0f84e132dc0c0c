//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use document_store::StoreError;
use domain::DomainError;
use invoice::InvoiceError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Missing or malformed caller identity.
    Unauthorized(String),
    /// Domain logic error.
    Domain(DomainError),
    /// Invoice rendering error.
    Invoice(InvoiceError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Invoice(InvoiceError::Domain(err)) => domain_error_to_response(err),
            ApiError::Invoice(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        };

        if status.is_server_error() {
            tracing::error!(%status, error = %message, "request failed");
        }

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    let status = match &err {
        DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::Forbidden { .. } => StatusCode::FORBIDDEN,
        DomainError::EmptyCart => StatusCode::CONFLICT,
        DomainError::Validation(_) => StatusCode::BAD_REQUEST,
        DomainError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        DomainError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        DomainError::Storage(StoreError::ConcurrencyConflict { .. }) => StatusCode::CONFLICT,
        DomainError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
        DomainError::Serialization(_) | DomainError::PasswordHash(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string())
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<InvoiceError> for ApiError {
    fn from(err: InvoiceError) -> Self {
        ApiError::Invoice(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::OrderId;
    use std::time::Duration;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_domain_error_statuses() {
        assert_eq!(
            status_of(DomainError::not_found("Order", "x").into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(
                DomainError::Forbidden {
                    order_id: OrderId::new()
                }
                .into()
            ),
            StatusCode::FORBIDDEN
        );
        assert_eq!(status_of(DomainError::EmptyCart.into()), StatusCode::CONFLICT);
        assert_eq!(
            status_of(DomainError::Validation("bad".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(DomainError::InvalidCredentials.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(
                DomainError::Timeout {
                    operation: "get",
                    timeout: Duration::from_millis(1)
                }
                .into()
            ),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_of(DomainError::Storage(StoreError::Unavailable("down".into())).into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_invoice_errors_unwrap_domain_errors() {
        let err = InvoiceError::Domain(DomainError::Forbidden {
            order_id: OrderId::new(),
        });
        assert_eq!(status_of(err.into()), StatusCode::FORBIDDEN);

        let err = InvoiceError::AllSinksFailed {
            file: "disk full".into(),
            response: "reset".into(),
        };
        assert_eq!(status_of(err.into()), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
