use crate::config::TelemetryConfig;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

/// Crates whose events follow `APP_LOG_LEVEL`. Everything else, including
/// the HTTP and OAuth stacks, is held at `warn`.
const APP_TARGETS: [&str; 2] = ["delivery_sync", "delivery_sync_worker"];

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid log level/filter '{value}': unable to build EnvFilter")]
    EnvFilter {
        value: String,
        #[source]
        source: ParseError,
    },
    #[error("telemetry error: {0}")]
    Subscriber(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Installs the process-wide log subscriber. `RUST_LOG` wins over the
/// configured level when it is set.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = build_filter(config)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stdout)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(TelemetryError::Subscriber)
}

fn build_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    EnvFilter::try_new(default_directives(&config.log_level)).map_err(|source| {
        TelemetryError::EnvFilter {
            value: config.log_level.clone(),
            source,
        }
    })
}

/// A bare level such as `debug` is scoped to this application's crates.
/// Anything containing a target or a list is taken as a full filter.
fn default_directives(level: &str) -> String {
    if level.contains(['=', ',']) {
        return level.to_string();
    }

    let mut directives = String::from("warn");
    for target in APP_TARGETS {
        directives.push_str(&format!(",{target}={level}"));
    }
    directives
}
