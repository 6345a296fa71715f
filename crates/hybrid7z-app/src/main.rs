#![forbid(unsafe_code)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Binary entrypoint for `hybrid7z`.

use std::process;

use clap::Parser;
use hybrid7z_app::{AppError, AppResult, Cli, RunStatus, pause, run_app};
use hybrid7z_telemetry::{LoggingConfig, RunContextGuard, init_logging};
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let exit_code = match run(&cli).await {
        Ok(status) => status.exit_code(),
        Err(err) => {
            error!(error = %err, detail = ?err, "run aborted");
            eprintln!("error: {}", err.display_message());
            AppError::EXIT_CODE
        }
    };

    pause(&cli).await;

    if exit_code != 0 {
        process::exit(exit_code);
    }
}

async fn run(cli: &Cli) -> AppResult<RunStatus> {
    let log_file = cli.log_file_path();
    init_logging(&LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format.into(),
        version: env!("CARGO_PKG_VERSION"),
        file: Some(&log_file),
    })
    .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = RunContextGuard::new("hybrid7z");

    run_app(cli).await
}
