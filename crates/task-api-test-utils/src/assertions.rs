//! Custom test assertions for expressive tests
//!
//! Decodes token payloads without verifying them, so tests can check what the
//! service issued independently of the service's own codec.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct JwtHeader {
    alg: String,
    #[serde(default)]
    typ: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JwtClaims {
    sub: String,
    username: String,
    role: String,
    iat: i64,
    exp: i64,
    jti: String,
}

fn decode_part<T: for<'de> Deserialize<'de>>(token: &str, index: usize, what: &str) -> T {
    let part = token
        .split('.')
        .nth(index)
        .unwrap_or_else(|| panic!("JWT is missing its {}", what));
    let bytes = URL_SAFE_NO_PAD
        .decode(part)
        .unwrap_or_else(|e| panic!("Failed to base64 decode JWT {}: {}", what, e));
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|e| panic!("Failed to parse JWT {} JSON: {}", what, e))
}

/// Custom assertions for issued tokens
///
/// # Example
/// ```rust,ignore
/// token
///     .assert_valid_jwt()
///     .assert_for_subject(&user_id)
///     .assert_has_role("staff")
///     .assert_expires_in(86400);
/// ```
pub trait TokenAssertions {
    /// Assert three parts, an HS256 header and a parseable claim set
    fn assert_valid_jwt(&self) -> &Self;

    /// Assert the `sub` claim
    fn assert_for_subject(&self, subject: &str) -> &Self;

    /// Assert the `username` claim
    fn assert_for_username(&self, username: &str) -> &Self;

    /// Assert the `role` claim
    fn assert_has_role(&self, role: &str) -> &Self;

    /// Assert `exp - iat` equals `seconds` and the token is still live
    fn assert_expires_in(&self, seconds: i64) -> &Self;
}

impl TokenAssertions for String {
    fn assert_valid_jwt(&self) -> &Self {
        assert_eq!(
            self.split('.').count(),
            3,
            "JWT must have 3 parts (header.payload.signature)"
        );

        let header: JwtHeader = decode_part(self, 0, "header");
        assert_eq!(header.alg, "HS256", "Expected HS256 algorithm");
        if let Some(typ) = header.typ {
            assert_eq!(typ, "JWT", "Expected JWT type");
        }

        let claims: JwtClaims = decode_part(self, 1, "payload");
        assert!(!claims.jti.is_empty(), "Token must carry a jti");

        self
    }

    fn assert_for_subject(&self, subject: &str) -> &Self {
        let claims: JwtClaims = decode_part(self, 1, "payload");
        assert_eq!(claims.sub, subject, "Unexpected token subject");
        self
    }

    fn assert_for_username(&self, username: &str) -> &Self {
        let claims: JwtClaims = decode_part(self, 1, "payload");
        assert_eq!(claims.username, username, "Unexpected token username");
        self
    }

    fn assert_has_role(&self, role: &str) -> &Self {
        let claims: JwtClaims = decode_part(self, 1, "payload");
        assert_eq!(claims.role, role, "Unexpected token role");
        self
    }

    fn assert_expires_in(&self, seconds: i64) -> &Self {
        let claims: JwtClaims = decode_part(self, 1, "payload");
        assert_eq!(
            claims.exp - claims.iat,
            seconds,
            "Token lifetime should be {} seconds",
            seconds
        );
        assert!(claims.exp > Utc::now().timestamp(), "Token is already expired");
        self
    }
}
