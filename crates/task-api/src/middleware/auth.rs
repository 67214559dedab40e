//! Authentication gate for protected routes.
//!
//! Per request: extract the bearer token, reject it if revoked, verify it with
//! the codec, then attach the identity to the request extensions. The first
//! failing step ends the request with a 401.
//!
//! # Variants
//!
//! - [`require_auth`]: `Authorization: Bearer <token>` only
//! - [`require_download_auth`]: the header, or `?token=<token>` when no
//!   `Authorization` header is sent at all (plain download links cannot set
//!   headers)

use crate::auth::{AuthenticatedUser, BearerToken, CodecError, RevocationRegistry, TokenCodec};
use crate::errors::{ApiError, MSG_TOKEN_REQUIRED, MSG_TOKEN_REVOKED};
use crate::observability::{hash_for_correlation, metrics};
use axum::{
    extract::{Query, Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use common::secret::SecretString;
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;

const MSG_MALFORMED_HEADER: &str = "Invalid Authorization header format";

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    /// Verifies token signatures, expiry and claim shape.
    pub codec: Arc<TokenCodec>,

    /// Tokens revoked by logout.
    pub revocations: Arc<RevocationRegistry>,
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Authentication middleware reading the `Authorization` header only.
///
/// # Response
///
/// - 401 with `WWW-Authenticate` if the token is missing, revoked or invalid
/// - Otherwise continues with [`AuthenticatedUser`] and [`BearerToken`] in
///   the request extensions
#[instrument(skip_all, name = "task_api.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = header_token(&req)?;
    admit(&state, token, req, next).await
}

/// Authentication middleware for download links.
///
/// Prefers the `Authorization` header. Falls back to the `token` query
/// parameter only when no header is sent; a header with an empty bearer value
/// is still a header and yields 401. Revocation is checked exactly as in
/// [`require_auth`].
#[instrument(skip_all, name = "task_api.middleware.download_auth")]
pub async fn require_download_auth(
    State(state): State<Arc<AuthState>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = if req.headers().contains_key(header::AUTHORIZATION) {
        header_token(&req)?
    } else {
        query_token(&req)
    };
    admit(&state, token, req, next).await
}

async fn admit(
    state: &AuthState,
    token: Option<String>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = token.ok_or_else(|| {
        tracing::debug!(target: "task_api.middleware.auth", "No bearer token presented");
        metrics::record_auth_rejection("missing");
        ApiError::unauthenticated(MSG_TOKEN_REQUIRED)
    })?;

    let identity = authenticate(state, &token)?;

    req.extensions_mut().insert(identity);
    req.extensions_mut()
        .insert(BearerToken(SecretString::from(token)));

    Ok(next.run(req).await)
}

/// Run the revocation check and codec verification for one token.
///
/// Revocation is checked first: a revoked token is rejected even while its
/// signature and expiry are still good.
///
/// # Errors
///
/// `ApiError::Unauthenticated` carrying the client-facing message.
pub fn authenticate(state: &AuthState, token: &str) -> Result<AuthenticatedUser, ApiError> {
    if state.revocations.is_revoked(token) {
        tracing::info!(
            target: "task_api.middleware.auth",
            token_fingerprint = %hash_for_correlation(token),
            "Rejected revoked token"
        );
        metrics::record_auth_rejection("revoked");
        return Err(ApiError::unauthenticated(MSG_TOKEN_REVOKED));
    }

    let claims = state.codec.verify(token).map_err(|e| {
        let reason = match &e {
            CodecError::Expired => "expired",
            CodecError::InvalidSubject => "bad_subject",
            CodecError::InvalidRole => "bad_role",
            CodecError::Invalid(_) | CodecError::Signing(_) => "invalid",
        };
        tracing::debug!(
            target: "task_api.middleware.auth",
            token_fingerprint = %hash_for_correlation(token),
            reason = reason,
            error = %e,
            "Token verification failed"
        );
        metrics::record_auth_rejection(reason);
        ApiError::from(e)
    })?;

    Ok(AuthenticatedUser::from(&claims))
}

/// Token from the `Authorization` header.
///
/// `Ok(None)` when the header is absent or carries an empty bearer value.
fn header_token(req: &Request) -> Result<Option<String>, ApiError> {
    let Some(value) = req.headers().get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let token = value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| {
            tracing::debug!(target: "task_api.middleware.auth", "Invalid Authorization header format");
            metrics::record_auth_rejection("malformed_header");
            ApiError::unauthenticated(MSG_MALFORMED_HEADER)
        })?
        .trim();

    if token.is_empty() {
        return Ok(None);
    }

    Ok(Some(token.to_string()))
}

/// Token from the `token` query parameter, if present and non-empty.
fn query_token(req: &Request) -> Option<String> {
    Query::<TokenQuery>::try_from_uri(req.uri())
        .ok()
        .and_then(|Query(q)| q.token)
        .filter(|t| !t.is_empty())
}

/// Extension trait for reading the gate's identity from a request.
pub trait IdentityExt {
    /// Returns `None` if no authentication gate ran for this request.
    fn identity(&self) -> Option<&AuthenticatedUser>;
}

impl<B> IdentityExt for axum::http::Request<B> {
    fn identity(&self) -> Option<&AuthenticatedUser> {
        self.extensions().get::<AuthenticatedUser>()
    }
}
