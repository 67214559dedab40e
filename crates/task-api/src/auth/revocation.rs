//! Revocation registry for logged-out tokens.
//!
//! In-memory only: entries are lost on restart, and they would have expired
//! within one token TTL anyway. Each entry lives until its token's own `exp`,
//! so the registry is bounded by (logouts per TTL window).
//!
//! # Concurrency
//!
//! `std::sync::RwLock` guards the map. Lookups share the read lock. Inserts
//! and sweeps take the write lock. No guard is ever held across an `.await`.
//!
//! Lazy expiry never upgrades a read guard. When a lookup sees an expired
//! entry it drops the read guard, then re-checks and removes the entry inside
//! one write critical section. An entry re-inserted in between with a later
//! expiry is kept and reported as revoked.

use crate::observability::metrics;
use crate::tasks::revocation_sweeper;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Map from token string to the instant it stops mattering.
#[derive(Debug, Default)]
pub struct RevocationRegistry {
    entries: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl RevocationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff `token` was revoked and has not yet reached its expiry.
    pub fn is_revoked(&self, token: &str) -> bool {
        self.is_revoked_at(token, Utc::now())
    }

    /// [`is_revoked`](Self::is_revoked) against an explicit clock.
    pub fn is_revoked_at(&self, token: &str, now: DateTime<Utc>) -> bool {
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.get(token) {
                None => return false,
                Some(expires_at) if now < *expires_at => return true,
                Some(_) => {}
            }
        }

        // Expired entry seen: decide and remove under a single write guard
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.get(token) {
            Some(expires_at) if now < *expires_at => true,
            Some(_) => {
                entries.remove(token);
                metrics::set_revoked_tokens(entries.len());
                false
            }
            None => false,
        }
    }

    /// Record `token` as revoked until `expires_at`.
    ///
    /// Idempotent. A repeated revoke never shortens an existing entry.
    pub fn revoke(&self, token: &str, expires_at: DateTime<Utc>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries
            .entry(token.to_string())
            .and_modify(|existing| {
                if expires_at > *existing {
                    *existing = expires_at;
                }
            })
            .or_insert(expires_at);
        metrics::set_revoked_tokens(entries.len());
    }

    /// Revoke using a Unix-seconds expiry, as carried in the `exp` claim.
    pub fn revoke_until_timestamp(&self, token: &str, exp: i64) {
        let expires_at = Utc
            .timestamp_opt(exp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.revoke(token, expires_at);
    }

    /// Remove every entry whose expiry is at or before now. Returns the number removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    /// [`sweep`](Self::sweep) against an explicit clock.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, expires_at| *expires_at > now);
        let removed = before.saturating_sub(entries.len());
        metrics::set_revoked_tokens(entries.len());
        removed
    }

    /// Number of entries currently held, expired or not.
    pub fn count(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Owns the registry and its background sweeper.
///
/// Built once at startup and handed to the router; [`shutdown`](Self::shutdown)
/// stops the sweeper.
pub struct RevocationService {
    registry: Arc<RevocationRegistry>,
    cancel_token: CancellationToken,
    sweeper: Option<JoinHandle<()>>,
}

impl RevocationService {
    /// Create the registry and spawn its sweeper on the current runtime.
    pub fn start(sweep_interval: Duration) -> Self {
        let registry = Arc::new(RevocationRegistry::new());
        let cancel_token = CancellationToken::new();

        let sweeper = tokio::spawn(revocation_sweeper::start_revocation_sweeper(
            registry.clone(),
            sweep_interval,
            cancel_token.clone(),
        ));

        Self {
            registry,
            cancel_token,
            sweeper: Some(sweeper),
        }
    }

    /// Shared handle to the registry.
    pub fn registry(&self) -> Arc<RevocationRegistry> {
        self.registry.clone()
    }

    /// Cancel the sweeper and wait for it to exit.
    pub async fn shutdown(mut self) {
        self.cancel_token.cancel();
        if let Some(handle) = self.sweeper.take() {
            if let Err(e) = handle.await {
                tracing::warn!(target: "task_api.auth.revocation", error = %e, "Revocation sweeper ended abnormally");
            }
        }
    }
}

impl Drop for RevocationService {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}
