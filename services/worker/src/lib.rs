mod cli;
mod runner;

use delivery_sync::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
