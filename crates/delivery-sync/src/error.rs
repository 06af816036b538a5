use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::delivery::ReportError;
use crate::workflows::publish::DriveOperationError;
use crate::workflows::refresh::CycleError;
use std::fmt;

/// Failures that stop the worker. Errors inside a scheduled cycle never
/// reach this type; they are logged by the scheduler instead.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Session(ReportError),
    Drive(DriveOperationError),
    Cycle(CycleError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Session(err) => write!(f, "ad manager session error: {}", err),
            AppError::Drive(err) => write!(f, "drive session error: {}", err),
            AppError::Cycle(err) => write!(f, "refresh cycle failed: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Session(err) => Some(err),
            AppError::Drive(err) => Some(err),
            AppError::Cycle(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<ReportError> for AppError {
    fn from(value: ReportError) -> Self {
        Self::Session(value)
    }
}

impl From<DriveOperationError> for AppError {
    fn from(value: DriveOperationError) -> Self {
        Self::Drive(value)
    }
}

impl From<CycleError> for AppError {
    fn from(value: CycleError) -> Self {
        Self::Cycle(value)
    }
}
