use crate::cli::RunArgs;
use delivery_sync::config::AppConfig;
use delivery_sync::error::AppError;
use delivery_sync::telemetry;
use delivery_sync::workflows::delivery::{AdManagerReportClient, AdManagerSession, ReportProducer};
use delivery_sync::workflows::publish::{connect_drive, ReportPublisher};
use delivery_sync::workflows::refresh::{RefreshPipeline, RefreshScheduler};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub(crate) async fn run(args: RunArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    if let Some(secs) = args.interval_secs {
        config.schedule.refresh_interval = Duration::from_secs(secs);
    }

    telemetry::init(&config.telemetry)?;
    let scheduler = build_scheduler(&config).await?;

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown signal received"),
            Err(err) => {
                warn!(error = %err, "failed to listen for shutdown signal");
                return;
            }
        }
        signal_token.cancel();

        // The handler stays installed, so a second Ctrl-C must exit explicitly.
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("second shutdown signal received, exiting without waiting for the upload");
            std::process::exit(130);
        }
    });

    info!(
        ?config.environment,
        network_code = %config.ad_manager.network_code,
        file_id = %config.drive.file_id,
        "delivery report worker ready"
    );
    scheduler.run(shutdown).await;
    Ok(())
}

pub(crate) async fn run_once() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    let scheduler = build_scheduler(&config).await?;

    scheduler.run_once().await.outcome?;
    Ok(())
}

async fn build_scheduler(config: &AppConfig) -> Result<RefreshScheduler, AppError> {
    let session = AdManagerSession::connect(&config.ad_manager).await?;
    let reports = AdManagerReportClient::new(session)?;
    let producer = ReportProducer::new(Arc::new(reports), config.schedule.poll_policy());

    let drive = connect_drive(&config.drive).await?;
    let mut publisher = ReportPublisher::new(Arc::new(drive), config.drive.destination());
    if let Some(dir) = &config.drive.staging_dir {
        publisher = publisher.with_staging_dir(dir.clone());
    }

    Ok(RefreshScheduler::new(
        RefreshPipeline::new(producer, publisher),
        config.schedule.refresh_interval,
    ))
}
