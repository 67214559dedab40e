//! Builder patterns for test tokens
//!
//! Produces HS256 tokens with full control over every claim, including
//! shapes the service itself never issues (missing subject, unknown role,
//! expired, wrong key).

use crate::test_ids::{TEST_JWT_SECRET, TEST_USER_ALICE};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Map, Value};

/// Builder for signed test tokens
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .for_user("alice-id")
///     .with_role("manager")
///     .expires_in(60)
///     .sign();
/// ```
pub struct TestTokenBuilder {
    sub: Option<Value>,
    username: String,
    role: Option<Value>,
    iat: i64,
    exp: i64,
    jti: String,
}

impl TestTokenBuilder {
    /// Create a builder for a live `staff` token for alice
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            sub: Some(Value::String(TEST_USER_ALICE.to_string())),
            username: "alice".to_string(),
            role: Some(Value::String("staff".to_string())),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(3600)).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Set the subject
    pub fn for_user(mut self, subject: &str) -> Self {
        self.sub = Some(Value::String(subject.to_string()));
        self
    }

    /// Set the subject to an arbitrary JSON value (e.g. a number)
    pub fn with_raw_subject(mut self, subject: Value) -> Self {
        self.sub = Some(subject);
        self
    }

    /// Omit the `sub` claim entirely
    pub fn without_subject(mut self) -> Self {
        self.sub = None;
        self
    }

    /// Set the username claim
    pub fn with_username(mut self, username: &str) -> Self {
        self.username = username.to_string();
        self
    }

    /// Set the role claim; need not be a known role
    pub fn with_role(mut self, role: &str) -> Self {
        self.role = Some(Value::String(role.to_string()));
        self
    }

    /// Omit the `role` claim entirely
    pub fn without_role(mut self) -> Self {
        self.role = None;
        self
    }

    /// Set expiration in seconds from now (negative for an expired token)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Set issued-at timestamp
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = timestamp;
        self
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> Value {
        let mut claims = Map::new();
        if let Some(sub) = self.sub {
            claims.insert("sub".to_string(), sub);
        }
        claims.insert("username".to_string(), json!(self.username));
        if let Some(role) = self.role {
            claims.insert("role".to_string(), role);
        }
        claims.insert("iat".to_string(), json!(self.iat));
        claims.insert("exp".to_string(), json!(self.exp));
        claims.insert("jti".to_string(), json!(self.jti));
        Value::Object(claims)
    }

    /// Sign with the test server's secret
    pub fn sign(self) -> String {
        self.sign_with(TEST_JWT_SECRET)
    }

    /// Sign with an explicit HMAC secret
    pub fn sign_with(self, secret: &[u8]) -> String {
        let claims = self.build();
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret),
        )
        .expect("HS256 encoding of JSON claims should not fail")
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
