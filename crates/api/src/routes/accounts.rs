//! Signup, login and password reset endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::UserId;
use document_store::DocumentStore;
use domain::RequestContext;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;
use crate::extract::parse_id;

#[derive(Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ResetRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct NewPasswordRequest {
    pub user_id: String,
    pub token: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct IdentityResponse {
    pub user_id: String,
    pub email: String,
}

impl From<RequestContext> for IdentityResponse {
    fn from(ctx: RequestContext) -> Self {
        Self {
            user_id: ctx.user_id.to_string(),
            email: ctx.email,
        }
    }
}

#[derive(Serialize)]
pub struct ResetTokenResponse {
    pub user_id: String,
    pub token: String,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

/// POST /accounts/signup: register an account.
#[tracing::instrument(skip(state, req), fields(email = %req.email))]
pub async fn signup<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<IdentityResponse>), ApiError> {
    let ctx = state
        .shop
        .accounts()
        .signup(&req.email, &req.password, &req.confirm_password)
        .await?;
    Ok((StatusCode::CREATED, Json(ctx.into())))
}

/// POST /accounts/login: check credentials and return the identity.
#[tracing::instrument(skip(state, req), fields(email = %req.email))]
pub async fn login<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<IdentityResponse>, ApiError> {
    let ctx = state
        .shop
        .accounts()
        .login(&req.email, &req.password)
        .await?;
    Ok(Json(ctx.into()))
}

/// POST /accounts/reset: email a password reset link.
#[tracing::instrument(skip(state, req), fields(email = %req.email))]
pub async fn request_reset<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<ResetRequest>,
) -> Result<(StatusCode, Json<StatusResponse>), ApiError> {
    state
        .shop
        .accounts()
        .request_password_reset(&req.email)
        .await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(StatusResponse {
            status: "reset link sent",
        }),
    ))
}

/// GET /accounts/reset/:token: check a reset token before showing the form.
#[tracing::instrument(skip(state, token))]
pub async fn verify_reset<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(token): Path<String>,
) -> Result<Json<ResetTokenResponse>, ApiError> {
    let user_id = state.shop.accounts().verify_reset_token(&token).await?;
    Ok(Json(ResetTokenResponse {
        user_id: user_id.to_string(),
        token,
    }))
}

/// POST /accounts/new-password: set a new password with a reset token.
#[tracing::instrument(skip(state, req))]
pub async fn new_password<S: DocumentStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<NewPasswordRequest>,
) -> Result<StatusCode, ApiError> {
    let user_id: UserId = parse_id(&req.user_id, "user id")?;
    state
        .shop
        .accounts()
        .reset_password(user_id, &req.token, &req.password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
