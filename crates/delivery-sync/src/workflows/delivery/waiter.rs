use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::debug;

use super::service::{ReportError, ReportJobId, ReportJobStatus, ReportService};

/// How often to ask the backend whether a job is ready, and for how long.
/// `max_wait: None` waits until the backend answers one way or the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_wait: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            max_wait: None,
        }
    }
}

/// Polls until the job completes. Returns the number of status requests made.
pub(crate) async fn wait_for_report_ready(
    service: &dyn ReportService,
    job: ReportJobId,
    policy: PollPolicy,
) -> Result<u32, ReportError> {
    let started = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match service.report_job_status(job).await? {
            ReportJobStatus::Completed => return Ok(attempts),
            ReportJobStatus::Failed => return Err(ReportError::JobFailed(job)),
            ReportJobStatus::InProgress => {}
        }

        let delay = match policy.max_wait {
            Some(max_wait) => {
                let waited = started.elapsed();
                if waited >= max_wait {
                    return Err(ReportError::JobTimeout { job, waited });
                }
                policy.interval.min(max_wait - waited)
            }
            None => policy.interval,
        };

        debug!(job_id = %job, attempts, "report job still in progress");
        sleep(delay).await;
    }
}
