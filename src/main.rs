//! Queue Service - multi-queue message broker.
//!
//! This is the main entry point.

use clap::Parser;
use std::process::ExitCode;

use queue_service::{logging, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let args = Commands::parse();
    let settings = args.settings();

    // Initialize logging; the guard flushes the log file on exit
    let _guard = match logging::init(&settings) {
        Ok((guard, _log_dir)) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Run the command
    match args.run(settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
