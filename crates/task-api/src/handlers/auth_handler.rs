//! Authentication endpoints.
//!
//! - `POST /api/auth/register` - public
//! - `POST /api/auth/login` - public
//! - `POST /api/auth/logout` - behind `require_auth`; revokes the presented token
//! - `GET /api/auth/verify` - behind `require_auth`; token introspection

use crate::auth::{AuthenticatedUser, BearerToken};
use crate::errors::{ApiError, MSG_NOT_AUTHENTICATED, MSG_TOKEN_REQUIRED};
use crate::models::{
    LoginRequest, LoginResponse, LogoutResponse, RegisterRequest, RegisterResponse, VerifiedUser,
    VerifyResponse,
};
use crate::routes::AppState;
use crate::services::auth_service;
use axum::{extract::State, http::StatusCode, Extension, Json};
use common::secret::ExposeSecret;
use std::sync::Arc;

/// Handle user registration
///
/// POST /api/auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let response =
        auth_service::register(state.store.as_ref(), state.config.bcrypt_cost, payload).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Handle login by username or email
///
/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let response = auth_service::login(state.store.as_ref(), &state.issuer, payload).await?;
    Ok(Json(response))
}

/// Handle logout
///
/// POST /api/auth/logout
///
/// Revokes exactly the token that authenticated this request. Without the
/// gate's token extension there is nothing to revoke, so the request is
/// refused rather than reported as a successful logout.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    token: Option<Extension<BearerToken>>,
) -> Result<Json<LogoutResponse>, ApiError> {
    let Some(Extension(BearerToken(token))) = token else {
        return Err(ApiError::unauthenticated(MSG_TOKEN_REQUIRED));
    };

    auth_service::record_logout(&state.revocations, &state.codec, token.expose_secret());

    Ok(Json(LogoutResponse {
        message: "Successfully logged out".to_string(),
    }))
}

/// Handle token introspection
///
/// GET /api/auth/verify
pub async fn verify(
    identity: Option<Extension<AuthenticatedUser>>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let Some(Extension(user)) = identity else {
        return Err(ApiError::unauthenticated(MSG_NOT_AUTHENTICATED));
    };

    Ok(Json(VerifyResponse {
        valid: true,
        user: VerifiedUser {
            id: user.user_id,
            username: user.username,
            role: user.role,
        },
    }))
}
