//! Registration, login and logout.
//!
//! Login always runs one bcrypt verification, against a dummy hash when the
//! identifier matches nobody, so response time does not reveal whether an
//! account exists. Logout is the revocation recorder: it puts the presented
//! token into the registry until the token's own expiry.

use crate::auth::codec::TokenCodec;
use crate::auth::password::{self, DUMMY_PASSWORD_HASH};
use crate::auth::revocation::RevocationRegistry;
use crate::errors::ApiError;
use crate::models::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, UserProfile};
use crate::observability::{hash_for_correlation, metrics};
use crate::services::principal_store::{NewPrincipal, PrincipalStore};
use crate::services::token_service::TokenIssuer;
use common::secret::ExposeSecret;
use common::types::Role;
use std::time::Instant;
use tracing::instrument;

const MIN_USERNAME_LENGTH: usize = 3;
const MAX_USERNAME_LENGTH: usize = 50;
const MIN_PASSWORD_LENGTH: usize = 6;
// bcrypt ignores input past 72 bytes
const MAX_PASSWORD_BYTES: usize = 72;

/// Register a new user with the default `staff` role.
///
/// # Errors
///
/// - `ApiError::BadRequest` on validation failure or duplicate username/email
/// - `ApiError::Database` if the store fails
#[instrument(skip_all)]
pub async fn register(
    store: &dyn PrincipalStore,
    bcrypt_cost: u32,
    request: RegisterRequest,
) -> Result<RegisterResponse, ApiError> {
    let username = request.username.trim().to_string();
    let email = request.email.trim().to_string();

    validate_username(&username)?;
    if !is_valid_email(&email) {
        return Err(ApiError::BadRequest("Invalid email format".to_string()));
    }
    validate_password(request.password.expose_secret())?;

    let password = request.password;
    let password_hash = tokio::task::spawn_blocking(move || {
        password::hash_password(password.expose_secret(), bcrypt_cost)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Password hashing task failed: {}", e)))??;

    let principal = store
        .create(NewPrincipal {
            username,
            email,
            password_hash,
            role: Role::Staff,
        })
        .await?;

    tracing::info!(target: "task_api.services.auth", user_id = %principal.id, "User registered");

    Ok(RegisterResponse {
        message: "User registered successfully".to_string(),
        user_id: principal.id.0,
        username: principal.username,
        email: principal.email,
    })
}

/// Authenticate by username or email and issue a token.
///
/// # Errors
///
/// - `ApiError::InvalidCredentials` for an unknown identifier or wrong password
/// - `ApiError::Database` if the store fails
#[instrument(skip_all)]
pub async fn login(
    store: &dyn PrincipalStore,
    issuer: &TokenIssuer,
    request: LoginRequest,
) -> Result<LoginResponse, ApiError> {
    let start = Instant::now();
    let result = login_inner(store, issuer, request).await;

    let status = if result.is_ok() { "success" } else { "error" };
    metrics::record_login(status, start.elapsed());

    result
}

async fn login_inner(
    store: &dyn PrincipalStore,
    issuer: &TokenIssuer,
    request: LoginRequest,
) -> Result<LoginResponse, ApiError> {
    let principal = store.find_by_identifier(request.identifier.trim()).await?;

    // Always run bcrypt; unknown users verify against the dummy hash
    let hash_to_verify = principal
        .as_ref()
        .map_or_else(|| DUMMY_PASSWORD_HASH.to_string(), |p| p.password_hash.clone());
    let password = request.password;
    let is_valid = tokio::task::spawn_blocking(move || {
        password::verify_password(password.expose_secret(), &hash_to_verify)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Password verification task failed: {}", e)))?;

    let principal = principal.ok_or(ApiError::InvalidCredentials)?;

    match is_valid {
        Ok(true) => {}
        Ok(false) => {
            tracing::debug!(target: "task_api.services.auth", user_id = %principal.id, "Password mismatch");
            return Err(ApiError::InvalidCredentials);
        }
        Err(e) => {
            tracing::warn!(target: "task_api.services.auth", user_id = %principal.id, error = %e, "Stored password hash is unusable");
            return Err(ApiError::InvalidCredentials);
        }
    }

    let token = issuer.issue_for(&principal)?;

    tracing::info!(target: "task_api.services.auth", user_id = %principal.id, "User logged in");

    Ok(LoginResponse {
        message: "Login successful".to_string(),
        token,
        token_type: "Bearer".to_string(),
        expires_in: issuer.ttl_seconds(),
        user: UserProfile {
            id: principal.id.0,
            username: principal.username,
            email: principal.email,
            role: principal.role,
        },
    })
}

/// Revoke the token that authenticated a logout request.
///
/// Returns `true` if the token was recorded. A token that no longer decodes
/// has nothing left to revoke and is skipped. Calling this twice with the
/// same token leaves the registry unchanged the second time.
#[instrument(skip_all)]
pub fn record_logout(registry: &RevocationRegistry, codec: &TokenCodec, token: &str) -> bool {
    let claims = match codec.verify(token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(
                target: "task_api.services.auth",
                token_fingerprint = %hash_for_correlation(token),
                error = %e,
                "Logout token no longer valid, nothing to revoke"
            );
            return false;
        }
    };

    registry.revoke_until_timestamp(token, claims.exp);
    metrics::record_revocation();

    tracing::info!(
        target: "task_api.services.auth",
        token_fingerprint = %hash_for_correlation(token),
        expires_at = claims.exp,
        "Token revoked"
    );

    true
}

fn validate_username(username: &str) -> Result<(), ApiError> {
    let len = username.chars().count();
    if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&len) {
        return Err(ApiError::BadRequest(format!(
            "Username must be between {} and {} characters",
            MIN_USERNAME_LENGTH, MAX_USERNAME_LENGTH
        )));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(ApiError::BadRequest(format!(
            "Password must be at most {} bytes",
            MAX_PASSWORD_BYTES
        )));
    }
    Ok(())
}

/// Basic email shape check: `local@domain.tld` with no empty parts.
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.contains('@') {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}
