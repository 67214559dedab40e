//! Fixed test identifiers and secrets
//!
//! Deterministic values so failures reproduce.

use uuid::Uuid;

// User IDs (100-199)
pub const TEST_USER_ALICE: Uuid = Uuid::from_u128(100);
pub const TEST_USER_BOB: Uuid = Uuid::from_u128(101);
pub const TEST_USER_CAROL: Uuid = Uuid::from_u128(102);

/// Signing secret used by every test server (33 bytes).
pub const TEST_JWT_SECRET: &[u8] = b"task-api-test-signing-secret-0001";

/// [`TEST_JWT_SECRET`], base64-encoded as `JWT_SECRET` expects it.
pub const TEST_JWT_SECRET_B64: &str = "dGFzay1hcGktdGVzdC1zaWduaW5nLXNlY3JldC0wMDAx";

/// A different secret of valid length, for signature-mismatch tests.
pub const WRONG_JWT_SECRET: &[u8] = b"some-other-service-signing-secret";

/// Password used for seeded users.
pub const TEST_PASSWORD: &str = "correct-horse-battery";

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD, Engine};

    #[test]
    fn test_secret_encoding_matches() {
        assert_eq!(STANDARD.encode(TEST_JWT_SECRET), TEST_JWT_SECRET_B64);
        assert!(TEST_JWT_SECRET.len() >= 32);
        assert!(WRONG_JWT_SECRET.len() >= 32);
    }
}
