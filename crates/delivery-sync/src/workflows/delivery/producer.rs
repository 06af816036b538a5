use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use super::query::ReportQuery;
use super::service::{ReportDownloadOptions, ReportError, ReportService};
use super::waiter::{wait_for_report_ready, PollPolicy};

/// Runs the delivery report end to end and hands back the CSV text.
#[derive(Debug, Clone)]
pub struct ReportProducer {
    service: Arc<dyn ReportService>,
    poll: PollPolicy,
}

impl ReportProducer {
    pub fn new(service: Arc<dyn ReportService>, poll: PollPolicy) -> Self {
        Self { service, poll }
    }

    /// Builds the query against the current wall clock, submits it, waits
    /// for the job and downloads the uncompressed CSV dump.
    pub async fn produce(&self) -> Result<String, ReportError> {
        self.produce_at(Utc::now()).await
    }

    pub async fn produce_at(&self, now: DateTime<Utc>) -> Result<String, ReportError> {
        let query = ReportQuery::delivery(now);
        let job = self.service.run_report_job(&query).await?;
        info!(
            job_id = %job,
            start_date = %query.date_range.start_date(),
            end_date = %query.date_range.end_date(),
            "report job submitted"
        );

        let polls = wait_for_report_ready(self.service.as_ref(), job, self.poll).await?;

        let bytes = self
            .service
            .download_report(job, &ReportDownloadOptions::csv_dump())
            .await?;
        let payload = String::from_utf8(bytes)?;

        info!(job_id = %job, polls, bytes = payload.len(), "report downloaded");
        Ok(payload)
    }
}
