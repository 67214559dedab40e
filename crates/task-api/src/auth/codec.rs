//! Credential codec: issues and verifies HS256-signed access tokens.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing
//! - Only HS256 is accepted; the signing secret is process-wide
//! - Expiry is checked with no leeway: a token is dead at `now >= exp`
//! - `iat` more than the configured skew in the future is rejected
//! - Claims are decoded exactly once, here, into [`Claims`]

use crate::auth::claims::Claims;
use chrono::Utc;
use common::jwt::{check_token_size, validate_iat_at};
use common::types::Role;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

/// Reasons a token fails to decode.
///
/// `Invalid` and `Expired` display as the detail part of
/// `"Invalid token: <detail>"`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("token is expired")]
    Expired,

    #[error("{0}")]
    Invalid(String),

    /// `sub` is missing, empty, or not a string.
    #[error("invalid subject claim")]
    InvalidSubject,

    /// `role` is missing, not a string, or not a known role.
    #[error("invalid role claim")]
    InvalidRole,

    /// Encoding failed while issuing. Not produced by `verify`.
    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Shape of the payload as it arrives on the wire.
///
/// `sub` and `role` are kept loose so their failures can be told apart from
/// a structurally broken token.
#[derive(Deserialize)]
struct WireClaims {
    #[serde(default)]
    sub: Option<Value>,
    #[serde(default)]
    username: String,
    #[serde(default)]
    role: Option<Value>,
    iat: i64,
    exp: i64,
    #[serde(default)]
    jti: String,
}

/// Signs and verifies access tokens with a single HMAC secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_seconds: i64,
    clock_skew: Duration,
}

impl TokenCodec {
    /// Create a codec.
    ///
    /// # Arguments
    ///
    /// * `secret` - HMAC signing secret
    /// * `ttl_seconds` - Lifetime of issued tokens
    /// * `clock_skew_seconds` - Tolerance for `iat` in the future
    pub fn new(secret: &[u8], ttl_seconds: i64, clock_skew_seconds: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is enforced by verify_at with no leeway
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::new();

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl_seconds,
            clock_skew: Duration::from_secs(clock_skew_seconds.unsigned_abs()),
        }
    }

    /// Lifetime of issued tokens in seconds.
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    /// Issue a token for the given identity, valid from now for the configured TTL.
    pub fn issue(&self, subject_id: &str, username: &str, role: Role) -> Result<String, CodecError> {
        self.issue_at(subject_id, username, role, Utc::now().timestamp())
    }

    /// Issue a token as if the current time were `now`.
    #[instrument(skip_all)]
    pub fn issue_at(
        &self,
        subject_id: &str,
        username: &str,
        role: Role,
        now: i64,
    ) -> Result<String, CodecError> {
        let claims = Claims {
            sub: subject_id.to_string(),
            username: username.to_string(),
            role,
            iat: now,
            exp: now.saturating_add(self.ttl_seconds),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!(target: "task_api.auth.codec", error = %e, "Token signing failed");
            CodecError::Signing(e.to_string())
        })
    }

    /// Verify a token and return its typed claims.
    pub fn verify(&self, token: &str) -> Result<Claims, CodecError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Verify a token against an explicit `now`.
    ///
    /// Check order: size, signature, expiry, `iat`, then claim shape. A token
    /// that is both expired and badly shaped reports `Expired`.
    #[instrument(skip_all)]
    pub fn verify_at(&self, token: &str, now: i64) -> Result<Claims, CodecError> {
        check_token_size(token).map_err(|e| CodecError::Invalid(e.to_string()))?;

        let wire = decode::<WireClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                tracing::debug!(target: "task_api.auth.codec", error = %e, "Token decode failed");
                match e.kind() {
                    ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                        CodecError::Invalid("signature is invalid".to_string())
                    }
                    _ => CodecError::Invalid("token is malformed".to_string()),
                }
            })?
            .claims;

        if now >= wire.exp {
            tracing::debug!(target: "task_api.auth.codec", exp = wire.exp, now = now, "Token expired");
            return Err(CodecError::Expired);
        }

        validate_iat_at(wire.iat, self.clock_skew, now)
            .map_err(|e| CodecError::Invalid(e.to_string()))?;

        let sub = match wire.sub {
            Some(Value::String(s)) if !s.is_empty() => s,
            _ => return Err(CodecError::InvalidSubject),
        };

        let role = match wire.role {
            Some(Value::String(s)) => s.parse::<Role>().map_err(|_| CodecError::InvalidRole)?,
            _ => return Err(CodecError::InvalidRole),
        };

        Ok(Claims {
            sub,
            username: wire.username,
            role,
            iat: wire.iat,
            exp: wire.exp,
            jti: wire.jti,
        })
    }
}
