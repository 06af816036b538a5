//! Ad Manager delivery report: query shape, job lifecycle, and download.

mod admanager;
mod producer;
pub mod query;
mod service;
mod summary;
mod waiter;

pub use admanager::{
    AdManagerCredentials, AdManagerReportClient, AdManagerSession, AD_MANAGER_SCOPE,
};
pub use producer::ReportProducer;
pub use query::{Column, DateRange, DateRangeType, Dimension, DimensionAttribute, ReportQuery};
pub use service::{
    ExportFormat, ReportDownloadOptions, ReportError, ReportJobId, ReportJobStatus, ReportService,
};
pub use summary::PayloadSummary;
pub use waiter::PollPolicy;
