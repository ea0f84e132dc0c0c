//! Request extractors.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::UserId;
use domain::RequestContext;

use crate::error::ApiError;

/// Header carrying the authenticated user's id, set by the session layer.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the authenticated user's email.
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// The caller's identity, read from headers set by the upstream session layer.
///
/// Requests without a valid identity are rejected with 401.
#[derive(Debug, Clone)]
pub struct Identity(pub RequestContext);

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header(parts, USER_ID_HEADER)?
            .parse::<UserId>()
            .map_err(|_| ApiError::Unauthorized(format!("{USER_ID_HEADER} is not a valid id")))?;
        let email = header(parts, USER_EMAIL_HEADER)?;

        Ok(Self(RequestContext::new(user_id, email)))
    }
}

fn header(parts: &Parts, name: &str) -> Result<String, ApiError> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::Unauthorized(format!("missing {name} header")))
}

/// Parses a path segment into a typed id.
pub fn parse_id<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid {what}: {raw}")))
}
