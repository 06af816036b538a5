#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use delivery_sync::workflows::delivery::{
    PollPolicy, ReportDownloadOptions, ReportError, ReportJobId, ReportJobStatus, ReportProducer,
    ReportQuery, ReportService,
};
use delivery_sync::workflows::publish::{
    DestinationFile, DriveFile, DriveGateway, DriveOperationError, ReportPublisher,
};
use delivery_sync::workflows::refresh::RefreshPipeline;
use tokio::time::Instant;

pub const FIXTURE_CSV: &str = concat!(
    "Dimension.DATE,Dimension.ADVERTISER_NAME,Dimension.ORDER_NAME,Dimension.LINE_ITEM_NAME,",
    "Dimension.AD_UNIT_NAME,DimensionAttribute.LINE_ITEM_GOAL_QUANTITY,",
    "DimensionAttribute.LINE_ITEM_DELIVERY_INDICATOR,Column.TOTAL_LINE_ITEM_LEVEL_IMPRESSIONS,",
    "Column.TOTAL_LINE_ITEM_LEVEL_CLICKS,Column.TOTAL_ACTIVE_VIEW_VIEWABLE_IMPRESSIONS,",
    "Column.TOTAL_ACTIVE_VIEW_MEASURABLE_IMPRESSIONS\n",
    "2024-05-01,\"Acme, Inc.\",Spring Push,Homepage Takeover,Homepage_Top,100000,98.5,4210,37,3012,3988\n",
    "2024-05-01,Globex,Always On,ROS Display,Sidebar,-1,-,1822,4,1203,1790\n",
);

pub const DESTINATION_ID: &str = "1k9-delivery-report";

pub fn destination() -> DestinationFile {
    DestinationFile {
        file_id: DESTINATION_ID.to_string(),
        name: "delivery-report.csv".to_string(),
    }
}

pub fn fast_polling() -> PollPolicy {
    PollPolicy {
        interval: Duration::from_secs(1),
        max_wait: None,
    }
}

#[derive(Debug, Default)]
pub struct ServiceLog {
    pub submissions: Vec<(ReportQuery, Instant)>,
    pub status_polls: usize,
    pub downloads: Vec<ReportDownloadOptions>,
}

/// Reporting backend that reports `pending_polls` IN_PROGRESS answers per
/// job before the terminal status.
#[derive(Debug)]
pub struct ScriptedReportService {
    payload: Vec<u8>,
    pending_polls: usize,
    failing_jobs: Mutex<usize>,
    polls_for_job: Mutex<usize>,
    pub log: Mutex<ServiceLog>,
}

impl ScriptedReportService {
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            pending_polls: 0,
            failing_jobs: Mutex::new(0),
            polls_for_job: Mutex::new(0),
            log: Mutex::new(ServiceLog::default()),
        }
    }

    pub fn pending_polls(mut self, polls: usize) -> Self {
        self.pending_polls = polls;
        self
    }

    pub fn never_ready(self) -> Self {
        self.pending_polls(usize::MAX)
    }

    /// The first `jobs` submissions end in FAILED.
    pub fn failing_jobs(self, jobs: usize) -> Self {
        *self.failing_jobs.lock().expect("failing mutex") = jobs;
        self
    }

    pub fn submissions(&self) -> Vec<(ReportQuery, Instant)> {
        self.log.lock().expect("log mutex").submissions.clone()
    }

    pub fn status_polls(&self) -> usize {
        self.log.lock().expect("log mutex").status_polls
    }
}

#[async_trait]
impl ReportService for ScriptedReportService {
    async fn run_report_job(&self, query: &ReportQuery) -> Result<ReportJobId, ReportError> {
        *self.polls_for_job.lock().expect("poll mutex") = 0;
        let mut log = self.log.lock().expect("log mutex");
        log.submissions.push((query.clone(), Instant::now()));
        Ok(ReportJobId(1000 + log.submissions.len() as i64))
    }

    async fn report_job_status(&self, _job: ReportJobId) -> Result<ReportJobStatus, ReportError> {
        self.log.lock().expect("log mutex").status_polls += 1;
        let mut polls = self.polls_for_job.lock().expect("poll mutex");
        *polls += 1;
        if *polls <= self.pending_polls {
            return Ok(ReportJobStatus::InProgress);
        }

        let mut failing = self.failing_jobs.lock().expect("failing mutex");
        if *failing > 0 {
            *failing -= 1;
            return Ok(ReportJobStatus::Failed);
        }
        Ok(ReportJobStatus::Completed)
    }

    async fn download_report(
        &self,
        _job: ReportJobId,
        options: &ReportDownloadOptions,
    ) -> Result<Vec<u8>, ReportError> {
        self.log
            .lock()
            .expect("log mutex")
            .downloads
            .push(*options);
        Ok(self.payload.clone())
    }
}

/// Drive stand-in keeping the latest bytes per file id.
#[derive(Debug, Default)]
pub struct RecordingDrive {
    files: Mutex<HashMap<String, Vec<u8>>>,
    uploads: Mutex<Vec<(String, String, String)>>,
    fail_uploads: Mutex<bool>,
    staging_dir: Option<PathBuf>,
    staged_counts: Mutex<Vec<usize>>,
}

impl RecordingDrive {
    pub fn with_file(file_id: &str, content: &[u8]) -> Self {
        let drive = Self::default();
        drive
            .files
            .lock()
            .expect("files mutex")
            .insert(file_id.to_string(), content.to_vec());
        drive
    }

    /// Record how many files sit in `dir` each time an upload arrives.
    pub fn watching_staging_dir(mut self, dir: &Path) -> Self {
        self.staging_dir = Some(dir.to_path_buf());
        self
    }

    pub fn staged_counts(&self) -> Vec<usize> {
        self.staged_counts.lock().expect("staged mutex").clone()
    }

    pub fn set_failing(&self, failing: bool) {
        *self.fail_uploads.lock().expect("fail mutex") = failing;
    }

    pub fn content(&self, file_id: &str) -> Option<Vec<u8>> {
        self.files.lock().expect("files mutex").get(file_id).cloned()
    }

    /// (file id, name, mime type) of every accepted upload.
    pub fn uploads(&self) -> Vec<(String, String, String)> {
        self.uploads.lock().expect("uploads mutex").clone()
    }
}

#[async_trait]
impl DriveGateway for RecordingDrive {
    async fn update_file_content(
        &self,
        file_id: &str,
        name: &str,
        mut content: std::fs::File,
        mime_type: mime::Mime,
    ) -> Result<DriveFile, DriveOperationError> {
        if let Some(dir) = &self.staging_dir {
            let count = std::fs::read_dir(dir)
                .map_err(|err| DriveOperationError::Backend(err.to_string()))?
                .count();
            self.staged_counts.lock().expect("staged mutex").push(count);
        }

        let mut bytes = Vec::new();
        content
            .read_to_end(&mut bytes)
            .map_err(|err| DriveOperationError::Backend(err.to_string()))?;

        if *self.fail_uploads.lock().expect("fail mutex") {
            return Err(DriveOperationError::Backend(
                "connection reset mid-upload".to_string(),
            ));
        }

        self.files
            .lock()
            .expect("files mutex")
            .insert(file_id.to_string(), bytes);
        self.uploads.lock().expect("uploads mutex").push((
            file_id.to_string(),
            name.to_string(),
            mime_type.to_string(),
        ));

        Ok(DriveFile {
            file_id: file_id.to_string(),
            name: name.to_string(),
            mime_type: Some(mime_type.to_string()),
        })
    }
}

pub fn pipeline(
    service: Arc<ScriptedReportService>,
    drive: Arc<RecordingDrive>,
    poll: PollPolicy,
) -> RefreshPipeline {
    RefreshPipeline::new(
        ReportProducer::new(service, poll),
        ReportPublisher::new(drive, destination()),
    )
}
