use crate::runner;
use clap::{Args, Parser, Subcommand};
use delivery_sync::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "delivery-sync-worker",
    about = "Refresh the Ad Manager delivery report on Google Drive",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Refresh on a fixed interval until interrupted (default command)
    Run(RunArgs),
    /// Run a single refresh cycle and exit
    Once,
}

#[derive(Args, Debug, Default)]
pub(crate) struct RunArgs {
    /// Override the configured refresh interval, in seconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub(crate) interval_secs: Option<u64>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Run(RunArgs::default()));

    match command {
        Command::Run(args) => runner::run(args).await,
        Command::Once => runner::run_once().await,
    }
}
