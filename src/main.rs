use clap::Parser;
use std::process::ExitCode;

use kafka_admin::cli::{self, Cli};
use kafka_admin::infrastructure::logging::init_logging;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    // Held until exit so buffered file logs are flushed.
    let _log_guard = match init_logging(Some(cli.logging_config())) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {:#}", e);
            None
        }
    };

    cli::run(cli).await
}
