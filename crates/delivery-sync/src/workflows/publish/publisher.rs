use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::NamedTempFile;
use tracing::info;

use super::drive::{DriveGateway, DriveOperationError};

/// The remote file whose content is replaced on every refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationFile {
    pub file_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    pub file_id: String,
    pub name: String,
    pub bytes: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("failed to stage report locally: {0}")]
    Staging(#[from] std::io::Error),
    #[error(transparent)]
    Upload(#[from] DriveOperationError),
}

impl PublishError {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Staging(_) => "staging",
            Self::Upload(_) => "upload",
        }
    }
}

/// Stages a report payload on disk and uploads it over the destination file.
#[derive(Debug, Clone)]
pub struct ReportPublisher {
    gateway: Arc<dyn DriveGateway>,
    destination: DestinationFile,
    staging_dir: Option<PathBuf>,
}

impl ReportPublisher {
    pub fn new(gateway: Arc<dyn DriveGateway>, destination: DestinationFile) -> Self {
        Self {
            gateway,
            destination,
            staging_dir: None,
        }
    }

    /// Stage payloads under `dir` instead of the system temp dir.
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    /// The payload is uploaded as-is; the staged copy is removed when this
    /// returns, whatever the outcome.
    pub async fn publish(&self, payload: &str) -> Result<PublishReceipt, PublishError> {
        let staged = stage_payload(payload, self.staging_dir.as_deref())?;
        let content = staged.reopen()?;

        let file = self
            .gateway
            .update_file_content(
                &self.destination.file_id,
                &self.destination.name,
                content,
                mime::TEXT_CSV,
            )
            .await?;

        info!(file_id = %file.file_id, name = %file.name, bytes = payload.len(), "drive file updated");

        Ok(PublishReceipt {
            file_id: file.file_id,
            name: file.name,
            bytes: payload.len(),
        })
    }
}

fn stage_payload(payload: &str, dir: Option<&Path>) -> std::io::Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("delivery-report-").suffix(".csv");
    let mut staged = match dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    staged.write_all(payload.as_bytes())?;
    staged.flush()?;
    Ok(staged)
}
