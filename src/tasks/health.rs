//! Health Monitor Task
//!
//! Periodically checks both cache tiers. Each check also refreshes the
//! distributed connectivity flag, so the tier is picked up again once the
//! store recovers even when no traffic reaches it.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheManager, HealthReport};

/// Spawns a task that runs [`CacheManager::health_check`] every
/// `interval_secs` seconds and logs whenever a tier changes state.
///
/// # Arguments
/// * `cache` - shared cache manager
/// * `interval_secs` - seconds between checks (values below 1 are raised to 1)
///
/// # Returns
/// A JoinHandle for the spawned task, aborted during graceful shutdown.
pub fn spawn_health_monitor(cache: Arc<CacheManager>, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "starting cache health monitor");

        let mut previous: Option<HealthReport> = None;
        loop {
            tokio::time::sleep(interval).await;

            let report = cache.health_check().await;
            log_transition(&cache, previous.as_ref(), &report);
            previous = Some(report);
        }
    })
}

fn log_transition(cache: &CacheManager, previous: Option<&HealthReport>, report: &HealthReport) {
    let was_distributed = previous.map_or(true, |p| p.distributed);
    let was_local = previous.map_or(true, |p| p.local);

    if cache.has_distributed() && report.distributed != was_distributed {
        if report.distributed {
            info!(latency_ms = ?report.distributed_latency_ms, "distributed cache recovered");
        } else {
            warn!("distributed cache is down, serving from local tier");
        }
    }

    if cache.has_local() && report.local != was_local {
        if report.local {
            info!("local cache recovered");
        } else {
            error!("local cache failed its health check");
        }
    }

    debug!(
        distributed = report.distributed,
        local = report.local,
        "health check"
    );
}
