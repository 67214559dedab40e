//! Credential issuer.

use crate::auth::codec::TokenCodec;
use crate::errors::ApiError;
use crate::observability::metrics;
use crate::services::principal_store::Principal;
use std::sync::Arc;
use tracing::instrument;

/// Mints access tokens for verified principals.
#[derive(Clone)]
pub struct TokenIssuer {
    codec: Arc<TokenCodec>,
}

impl TokenIssuer {
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self { codec }
    }

    /// Issue a fresh token carrying the principal's id, username and role.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Internal` if signing fails.
    #[instrument(skip_all)]
    pub fn issue_for(&self, principal: &Principal) -> Result<String, ApiError> {
        let token = self.codec.issue(
            &principal.id.to_string(),
            &principal.username,
            principal.role,
        )?;

        metrics::record_token_issued();
        tracing::debug!(target: "task_api.services.token", role = %principal.role, "Issued access token");

        Ok(token)
    }

    /// Lifetime of issued tokens in seconds.
    pub fn ttl_seconds(&self) -> i64 {
        self.codec.ttl_seconds()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::types::{Role, UserId};

    #[test]
    fn test_issued_token_carries_principal_identity() {
        let codec = Arc::new(TokenCodec::new(b"0123456789abcdef0123456789abcdef", 3600, 300));
        let issuer = TokenIssuer::new(codec.clone());
        let principal = Principal {
            id: UserId::new(),
            username: "carol".to_string(),
            email: "carol@example.com".to_string(),
            password_hash: String::new(),
            role: Role::Staff,
        };

        let token = issuer.issue_for(&principal).unwrap();
        let claims = codec.verify(&token).unwrap();

        assert_eq!(claims.sub, principal.id.to_string());
        assert_eq!(claims.username, "carol");
        assert_eq!(claims.role, Role::Staff);
        assert_eq!(claims.exp - claims.iat, issuer.ttl_seconds());
    }

    #[test]
    fn test_tokens_for_same_principal_are_distinct() {
        let codec = Arc::new(TokenCodec::new(b"0123456789abcdef0123456789abcdef", 3600, 300));
        let issuer = TokenIssuer::new(codec);
        let principal = Principal {
            id: UserId::new(),
            username: "carol".to_string(),
            email: "carol@example.com".to_string(),
            password_hash: String::new(),
            role: Role::Admin,
        };

        let first = issuer.issue_for(&principal).unwrap();
        let second = issuer.issue_for(&principal).unwrap();

        assert_ne!(first, second);
    }
}
