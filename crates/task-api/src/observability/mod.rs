//! Observability for the Task API: metrics and log-safe identifiers.
//!
//! Bearer tokens are never written to logs. Where a log line needs to tie
//! several events to one token (gate rejection, logout, revocation), it
//! carries [`hash_for_correlation`] of the token instead.

pub mod metrics;

use sha2::{Digest, Sha256};

/// Short one-way fingerprint of a sensitive value for log correlation.
///
/// First 8 hex chars of SHA-256. Enough to match log lines for the same
/// token; not enough to recover or replay it.
pub fn hash_for_correlation(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    hex::encode(digest.get(..4).unwrap_or_default())
}
