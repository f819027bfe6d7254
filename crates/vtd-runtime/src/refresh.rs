//! Periodic background refresh.
//!
//! On each interval tick the task calls [`PortfolioService::refresh`]. A
//! failed cycle is logged and skipped; the task only stops when cancelled or
//! when its handle is dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use vtd_store::KeyValueStore;

use crate::service::PortfolioService;

/// Handle to a running refresh task.
///
/// Dropping the handle also stops the task (after any in-flight cycle).
pub struct RefreshHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Stop the task and wait for it to exit. An in-flight cycle completes
    /// first.
    pub async fn cancel(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "refresh task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawn the refresh loop. The first cycle runs immediately.
pub fn spawn_refresh<S>(service: Arc<PortfolioService<S>>, interval: Duration) -> RefreshHandle
where
    S: KeyValueStore + 'static,
{
    let (stop, mut stop_rx) = watch::channel(false);
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_ms = interval.as_millis() as u64, "refresh task started");
        loop {
            tokio::select! {
                biased;
                // Err: handle dropped.
                _ = stop_rx.changed() => break,
                _ = ticker.tick() => {}
            }
            match service.refresh().await {
                Ok(report) => {
                    let degraded = report.degraded();
                    if degraded.is_empty() {
                        info!(value = report.point.value, "refresh cycle complete");
                    } else {
                        warn!(
                            value = report.point.value,
                            degraded = ?degraded,
                            "refresh cycle used fallback prices"
                        );
                    }
                }
                Err(e) => warn!(error = %e, "refresh cycle failed; retrying next interval"),
            }
        }
        info!("refresh task stopped");
    });
    RefreshHandle { stop, task }
}
