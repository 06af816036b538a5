use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::workflows::delivery::{AdManagerCredentials, PollPolicy};
use crate::workflows::publish::DestinationFile;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the refresh worker.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub telemetry: TelemetryConfig,
    pub schedule: ScheduleConfig,
    pub ad_manager: AdManagerConfig,
    pub drive: DriveConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(&var_or("APP_ENV", "development"));
        let log_level = var_or("APP_LOG_LEVEL", "info");

        let schedule = ScheduleConfig {
            refresh_interval: seconds_or("REFRESH_INTERVAL_SECS", 3600)?,
            poll_interval: seconds_or("REPORT_POLL_INTERVAL_SECS", 30)?,
            max_poll_wait: optional_seconds("REPORT_MAX_WAIT_SECS")?,
        };

        let ad_manager = AdManagerConfig {
            network_code: required("AD_MANAGER_NETWORK_CODE")?,
            application_name: var_or("AD_MANAGER_APPLICATION_NAME", "Ad Manager to Drive"),
            api_version: var_or("AD_MANAGER_API_VERSION", "v202505"),
            endpoint: var_or("AD_MANAGER_ENDPOINT", "https://ads.google.com"),
            credentials: ad_manager_credentials()?,
        };

        let drive = DriveConfig {
            file_id: required("DRIVE_FILE_ID")?,
            file_name: var_or("DRIVE_FILE_NAME", "delivery-report.csv"),
            client_secret_file: PathBuf::from(var_or(
                "DRIVE_CLIENT_SECRET_FILE",
                "credentials.json",
            )),
            token_cache: PathBuf::from(var_or("DRIVE_TOKEN_CACHE", "tokens/drive.json")),
            redirect_port: var_or("DRIVE_REDIRECT_PORT", "8888")
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort)?,
            staging_dir: non_empty("DRIVE_STAGING_DIR").map(PathBuf::from),
        };

        Ok(Self {
            environment,
            telemetry: TelemetryConfig { log_level },
            schedule,
            ad_manager,
            drive,
        })
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Cadence of the refresh loop and of report-status polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub refresh_interval: Duration,
    pub poll_interval: Duration,
    pub max_poll_wait: Option<Duration>,
}

impl ScheduleConfig {
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: self.poll_interval,
            max_wait: self.max_poll_wait,
        }
    }
}

/// Settings for the Ad Manager SOAP reporting API.
#[derive(Debug, Clone)]
pub struct AdManagerConfig {
    pub network_code: String,
    pub application_name: String,
    pub api_version: String,
    pub endpoint: String,
    pub credentials: AdManagerCredentials,
}

/// Settings for the Drive file that receives each refreshed report.
#[derive(Debug, Clone)]
pub struct DriveConfig {
    pub file_id: String,
    pub file_name: String,
    pub client_secret_file: PathBuf,
    pub token_cache: PathBuf,
    pub redirect_port: u16,
    /// Where payloads are staged before upload; the system temp dir if unset.
    pub staging_dir: Option<PathBuf>,
}

impl DriveConfig {
    pub fn destination(&self) -> DestinationFile {
        DestinationFile {
            file_id: self.file_id.clone(),
            name: self.file_name.clone(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing { name: &'static str },
    InvalidSeconds { name: &'static str, value: String },
    InvalidPort,
    MissingAdManagerCredentials,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing { name } => write!(f, "{name} must be set"),
            ConfigError::InvalidSeconds { name, value } => {
                write!(f, "{name} must be a positive number of seconds, got '{value}'")
            }
            ConfigError::InvalidPort => write!(f, "DRIVE_REDIRECT_PORT must be a valid u16"),
            ConfigError::MissingAdManagerCredentials => write!(
                f,
                "set AD_MANAGER_KEY_FILE or AD_MANAGER_CLIENT_ID, AD_MANAGER_CLIENT_SECRET and AD_MANAGER_REFRESH_TOKEN"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

fn non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn var_or(name: &str, default: &str) -> String {
    non_empty(name).unwrap_or_else(|| default.to_string())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    non_empty(name).ok_or(ConfigError::Missing { name })
}

fn parse_seconds(name: &'static str, raw: String) -> Result<Duration, ConfigError> {
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidSeconds { name, value: raw }),
    }
}

fn seconds_or(name: &'static str, default: u64) -> Result<Duration, ConfigError> {
    match non_empty(name) {
        Some(raw) => parse_seconds(name, raw),
        None => Ok(Duration::from_secs(default)),
    }
}

fn optional_seconds(name: &'static str) -> Result<Option<Duration>, ConfigError> {
    non_empty(name)
        .map(|raw| parse_seconds(name, raw))
        .transpose()
}

fn ad_manager_credentials() -> Result<AdManagerCredentials, ConfigError> {
    if let Some(path) = non_empty("AD_MANAGER_KEY_FILE") {
        return Ok(AdManagerCredentials::ServiceAccountKey(PathBuf::from(path)));
    }

    match (
        non_empty("AD_MANAGER_CLIENT_ID"),
        non_empty("AD_MANAGER_CLIENT_SECRET"),
        non_empty("AD_MANAGER_REFRESH_TOKEN"),
    ) {
        (Some(client_id), Some(client_secret), Some(refresh_token)) => {
            Ok(AdManagerCredentials::RefreshToken {
                client_id,
                client_secret,
                refresh_token,
            })
        }
        _ => Err(ConfigError::MissingAdManagerCredentials),
    }
}
