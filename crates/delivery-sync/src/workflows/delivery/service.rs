use std::fmt;
use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;

use super::query::ReportQuery;

/// Backend identifier of a submitted report job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReportJobId(pub i64);

impl fmt::Display for ReportJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportJobStatus {
    InProgress,
    Completed,
    Failed,
}

impl ReportJobStatus {
    pub fn from_api_str(value: &str) -> Option<Self> {
        match value.trim() {
            "IN_PROGRESS" => Some(Self::InProgress),
            "COMPLETED" => Some(Self::Completed),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    CsvDump,
}

impl ExportFormat {
    pub const fn as_api_str(self) -> &'static str {
        match self {
            Self::CsvDump => "CSV_DUMP",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportDownloadOptions {
    pub export_format: ExportFormat,
    pub use_gzip_compression: bool,
}

impl ReportDownloadOptions {
    /// Plain CSV dump, the format written to the destination file.
    pub const fn csv_dump() -> Self {
        Self {
            export_format: ExportFormat::CsvDump,
            use_gzip_compression: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("report service request failed: {0}")]
    Transport(String),
    #[error("report service fault: {0}")]
    Fault(String),
    #[error("unexpected report service response: {0}")]
    Response(String),
    #[error("report job {0} failed on the backend")]
    JobFailed(ReportJobId),
    #[error("report job {job} still pending after {waited:?}")]
    JobTimeout { job: ReportJobId, waited: Duration },
    #[error("report payload is not valid UTF-8: {0}")]
    Decode(#[from] std::string::FromUtf8Error),
    #[error("ad manager authorization failed: {0}")]
    Auth(String),
}

impl ReportError {
    /// Stable label used in structured cycle logs.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Fault(_) => "fault",
            Self::Response(_) => "response",
            Self::JobFailed(_) => "job-failed",
            Self::JobTimeout { .. } => "job-timeout",
            Self::Decode(_) => "decode",
            Self::Auth(_) => "auth",
        }
    }
}

/// Report job operations of the reporting backend.
#[async_trait]
pub trait ReportService: Debug + Send + Sync {
    async fn run_report_job(&self, query: &ReportQuery) -> Result<ReportJobId, ReportError>;

    async fn report_job_status(&self, job: ReportJobId) -> Result<ReportJobStatus, ReportError>;

    async fn download_report(
        &self,
        job: ReportJobId,
        options: &ReportDownloadOptions,
    ) -> Result<Vec<u8>, ReportError>;
}
