//! Revocation sweeper background task.
//!
//! Removes revocation entries whose tokens have passed their natural expiry,
//! once per interval (hourly by default). Lookups already drop expired entries
//! they touch; the sweep covers tokens nobody presents again.
//!
//! # Graceful Shutdown
//!
//! The task exits when its cancellation token is triggered. An in-progress
//! sweep completes first; it holds no external resources.

use crate::auth::revocation::RevocationRegistry;
use crate::observability::metrics;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// Shortest interval the sweeper will tick at.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Start the revocation sweeper loop.
///
/// # Arguments
///
/// * `registry` - Registry to sweep
/// * `interval` - Time between sweeps
/// * `cancel_token` - Token for graceful shutdown
///
/// Intervals below [`MIN_SWEEP_INTERVAL`] are raised to it.
///
/// Returns when the cancellation token is triggered.
#[instrument(skip_all, name = "task_api.task.revocation_sweeper")]
pub async fn start_revocation_sweeper(
    registry: Arc<RevocationRegistry>,
    interval: Duration,
    cancel_token: CancellationToken,
) {
    let interval = interval.max(MIN_SWEEP_INTERVAL);

    info!(
        target: "task_api.task.revocation_sweeper",
        interval_seconds = interval.as_secs(),
        "Starting revocation sweeper"
    );

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_sweep(&registry);
            }
            _ = cancel_token.cancelled() => {
                info!(
                    target: "task_api.task.revocation_sweeper",
                    "Revocation sweeper received shutdown signal, exiting"
                );
                break;
            }
        }
    }

    info!(target: "task_api.task.revocation_sweeper", "Revocation sweeper stopped");
}

/// Run a single sweep and record its outcome.
pub(crate) fn run_sweep(registry: &RevocationRegistry) -> usize {
    let removed = registry.sweep();
    let remaining = registry.count();

    metrics::record_revocation_sweep(removed);

    if removed > 0 {
        info!(
            target: "task_api.task.revocation_sweeper",
            removed = removed,
            remaining = remaining,
            "Swept expired revocation entries"
        );
    } else {
        debug!(
            target: "task_api.task.revocation_sweeper",
            remaining = remaining,
            "Revocation sweep found nothing to remove"
        );
    }

    removed
}
