//! Typed token claims and the request-scoped identity built from them.

use crate::errors::ApiError;
use common::secret::SecretString;
use common::types::{Role, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Claims carried by every issued token.
///
/// Produced only by [`TokenCodec::verify`](crate::auth::codec::TokenCodec::verify),
/// so holders can rely on `sub` being non-empty and `role` being a known role.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id as issued.
    pub sub: String,

    /// Display name at issuance time.
    pub username: String,

    /// Role at issuance time.
    pub role: Role,

    /// Issued-at (Unix seconds).
    pub iat: i64,

    /// Expiry (Unix seconds).
    pub exp: i64,

    /// Unique token identifier. Makes every issued token string distinct.
    pub jti: String,
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("sub", &"[REDACTED]")
            .field("username", &self.username)
            .field("role", &self.role)
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .field("jti", &self.jti)
            .finish()
    }
}

/// Identity attached to a request by the authentication gate.
///
/// Read by the role gate and by business handlers via `Extension<AuthenticatedUser>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub username: String,
    pub role: Role,
}

impl AuthenticatedUser {
    /// Parse the subject as a [`UserId`].
    ///
    /// The gate only guarantees a non-empty subject; handlers that need a real
    /// id call this and surface failure as 400.
    pub fn parse_user_id(&self) -> Result<UserId, ApiError> {
        Uuid::parse_str(&self.user_id)
            .map(UserId)
            .map_err(|_| ApiError::BadRequest("Invalid user ID".to_string()))
    }
}

impl From<&Claims> for AuthenticatedUser {
    fn from(claims: &Claims) -> Self {
        Self {
            user_id: claims.sub.clone(),
            username: claims.username.clone(),
            role: claims.role,
        }
    }
}

/// The raw bearer token that authenticated the request.
///
/// Kept so logout can revoke exactly the token that was presented.
#[derive(Debug, Clone)]
pub struct BearerToken(pub SecretString);

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims(sub: &str) -> Claims {
        Claims {
            sub: sub.to_string(),
            username: "alice".to_string(),
            role: Role::Manager,
            iat: 1_700_000_000,
            exp: 1_700_003_600,
            jti: "4a1f0c3e-0000-4000-8000-000000000001".to_string(),
        }
    }

    #[test]
    fn test_claims_debug_redacts_subject() {
        let claims = sample_claims("7b0c8d2e-5a5b-4f5e-9d55-3f2f0f1e2a10");
        let debug = format!("{claims:?}");

        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("7b0c8d2e"));
        assert!(debug.contains("alice"));
    }

    #[test]
    fn test_identity_from_claims() {
        let claims = sample_claims("user-1");
        let identity = AuthenticatedUser::from(&claims);

        assert_eq!(identity.user_id, "user-1");
        assert_eq!(identity.username, "alice");
        assert_eq!(identity.role, Role::Manager);
    }

    #[test]
    fn test_parse_user_id_accepts_uuid() {
        let id = Uuid::new_v4();
        let identity = AuthenticatedUser::from(&sample_claims(&id.to_string()));

        assert!(matches!(identity.parse_user_id(), Ok(UserId(parsed)) if parsed == id));
    }

    #[test]
    fn test_parse_user_id_rejects_non_uuid_as_bad_request() {
        let identity = AuthenticatedUser::from(&sample_claims("not-a-uuid"));

        assert!(matches!(
            identity.parse_user_id(),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_bearer_token_debug_is_redacted() {
        let token = BearerToken(SecretString::from("header.payload.signature"));
        assert!(!format!("{token:?}").contains("payload"));
    }
}
