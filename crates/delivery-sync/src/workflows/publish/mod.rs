pub mod drive;
pub mod publisher;

pub use drive::{connect_drive, DriveFile, DriveGateway, DriveOperationError, GoogleDriveClient};
pub use publisher::{DestinationFile, PublishError, PublishReceipt, ReportPublisher};
