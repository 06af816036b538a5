use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::workflows::delivery::{PayloadSummary, ReportError, ReportProducer};
use crate::workflows::publish::{PublishError, PublishReceipt, ReportPublisher};

#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error(transparent)]
    Publish(#[from] PublishError),
    #[error("refresh cycle cancelled by shutdown before the report was ready")]
    Cancelled,
}

impl CycleError {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Report(err) => err.kind(),
            Self::Publish(err) => err.kind(),
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSuccess {
    pub summary: Option<PayloadSummary>,
    pub receipt: PublishReceipt,
}

/// Outcome of one refresh cycle.
#[derive(Debug)]
pub struct CycleReport {
    pub cycle_id: u64,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub outcome: Result<CycleSuccess, CycleError>,
}

impl CycleReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    fn log(&self) {
        let elapsed_ms = self.elapsed.as_millis() as u64;
        match &self.outcome {
            Ok(success) => info!(
                cycle_id = self.cycle_id,
                started_at = %self.started_at,
                elapsed_ms,
                rows = success.summary.map(|summary| summary.rows),
                file_id = %success.receipt.file_id,
                "refresh cycle completed"
            ),
            Err(err) => error!(
                cycle_id = self.cycle_id,
                started_at = %self.started_at,
                elapsed_ms,
                error_kind = err.kind(),
                error = %err,
                "refresh cycle failed"
            ),
        }
    }
}

/// Report producer and destination publisher, run back to back.
#[derive(Debug, Clone)]
pub struct RefreshPipeline {
    producer: ReportProducer,
    publisher: ReportPublisher,
}

impl RefreshPipeline {
    pub fn new(producer: ReportProducer, publisher: ReportPublisher) -> Self {
        Self {
            producer,
            publisher,
        }
    }

    /// Runs one cycle to completion. Failures are captured in the returned
    /// report and logged; the destination keeps its previous content.
    ///
    /// Cancelling `shutdown` abandons the report job while it is being
    /// produced. An upload that has already started is allowed to finish.
    pub async fn run_cycle(&self, cycle_id: u64, shutdown: &CancellationToken) -> CycleReport {
        let started_at = Utc::now();
        let clock = Instant::now();
        info!(cycle_id, "refresh cycle started");

        let outcome = self.execute(cycle_id, shutdown).await;
        let report = CycleReport {
            cycle_id,
            started_at,
            elapsed: clock.elapsed(),
            outcome,
        };
        report.log();
        report
    }

    async fn execute(
        &self,
        cycle_id: u64,
        shutdown: &CancellationToken,
    ) -> Result<CycleSuccess, CycleError> {
        let payload = tokio::select! {
            _ = shutdown.cancelled() => return Err(CycleError::Cancelled),
            produced = self.producer.produce() => produced?,
        };

        let summary = match PayloadSummary::from_csv(&payload) {
            Ok(summary) => Some(summary),
            Err(err) => {
                warn!(cycle_id, error = %err, "could not summarize report payload");
                None
            }
        };

        let receipt = self.publisher.publish(&payload).await?;
        Ok(CycleSuccess { summary, receipt })
    }
}
