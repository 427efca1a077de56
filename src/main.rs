// Strata - Legacy Grants ETL Tool

use clap::Parser;
use std::process;
use strata::cli::{Cli, Commands};
use strata::config::load_config;
use strata::logging::init_logging;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present
    // This is optional - if .env doesn't exist, it's silently ignored
    let _ = dotenvy::dotenv();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Logging comes up before command dispatch, so the configuration is
    // loaded leniently here. A missing or invalid file falls back to
    // console-only logging and the command itself reports the real error.
    let file_config = load_config(&cli.config).ok();
    let log_level = cli
        .log_level
        .clone()
        .or_else(|| file_config.as_ref().map(|c| c.application.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());
    let logging_config = file_config.map(|c| c.logging).unwrap_or_default();

    let _guard = match init_logging(&log_level, &logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(5);
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Strata - Legacy Grants ETL Tool"
    );

    // Execute command and get exit code
    let exit_code = match execute_command(&cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command execution failed");
            eprintln!("Error: {e}");
            5 // Fatal error exit code
        }
    };

    // process::exit skips destructors, so flush the log file sink first
    drop(_guard);
    process::exit(exit_code);
}

/// Execute the CLI command
async fn execute_command(cli: &Cli) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::Run(args) => args.execute(&cli.config).await,
        Commands::Sync(args) => args.execute(&cli.config).await,
        Commands::Transform(args) => args.execute(&cli.config).await,
        Commands::Status(args) => args.execute(&cli.config).await,
        Commands::Validate(args) => args.execute(&cli.config).await,
        Commands::Init(args) => args.execute().await,
    }
}
