//! The refresh loop: one cycle produces the report and publishes it.

mod cycle;
mod scheduler;

pub use cycle::{CycleError, CycleReport, CycleSuccess, RefreshPipeline};
pub use scheduler::{RefreshScheduler, DEFAULT_REFRESH_INTERVAL};
