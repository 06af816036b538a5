use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::cycle::{CycleReport, RefreshPipeline};

/// Default time between refresh cycles (1 hour).
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(3600);

/// Fires a refresh cycle immediately and then once per interval.
///
/// Each cycle runs on its own task so a slow cycle never shifts the tick
/// schedule. A tick that arrives while the previous cycle is still running
/// is skipped.
#[derive(Debug)]
pub struct RefreshScheduler {
    pipeline: Arc<RefreshPipeline>,
    interval: Duration,
    next_cycle_id: AtomicU64,
    in_flight: Arc<AtomicBool>,
}

/// Clears the in-flight flag when a cycle task ends, panics included.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl RefreshScheduler {
    pub fn new(pipeline: RefreshPipeline, interval: Duration) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            interval,
            next_cycle_id: AtomicU64::new(1),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    fn allocate_cycle_id(&self) -> u64 {
        self.next_cycle_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Runs a single cycle on the caller's task.
    pub async fn run_once(&self) -> CycleReport {
        let cycle_id = self.allocate_cycle_id();
        self.pipeline
            .run_cycle(cycle_id, &CancellationToken::new())
            .await
    }

    /// Ticks until `shutdown` is cancelled. The in-flight cycle sees the same
    /// token, so a report still being produced is abandoned; an upload in
    /// progress is awaited before returning.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut running: Option<JoinHandle<()>> = None;

        info!(interval_secs = self.interval.as_secs(), "refresh scheduler started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if self.in_flight.swap(true, Ordering::AcqRel) {
                        warn!("previous refresh cycle still running, skipping this tick");
                        continue;
                    }

                    let guard = InFlightGuard(self.in_flight.clone());
                    let pipeline = self.pipeline.clone();
                    let cycle_id = self.allocate_cycle_id();
                    let cycle_shutdown = shutdown.clone();
                    running = Some(tokio::spawn(async move {
                        let _guard = guard;
                        pipeline.run_cycle(cycle_id, &cycle_shutdown).await;
                    }));
                }
            }
        }

        if let Some(handle) = running.take() {
            if !handle.is_finished() {
                info!("waiting for in-flight refresh cycle to finish");
            }
            if let Err(err) = handle.await {
                error!(error = %err, "refresh cycle task ended abnormally");
            }
        }

        info!("refresh scheduler stopped");
    }
}
