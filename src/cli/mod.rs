//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Strata using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Strata - Legacy Grants ETL Tool
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "strata.toml", env = "STRATA_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "STRATA_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Synchronize staging and transform pending rows into domain records
    Run(commands::run::RunArgs),

    /// Synchronize the legacy source into staging only
    Sync(commands::sync::SyncArgs),

    /// Transform pending staging rows only
    Transform(commands::transform::TransformArgs),

    /// Show staging row counts and the pending backlog
    Status(commands::status::StatusArgs),

    /// Validate configuration and store connectivity
    Validate(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_run() {
        let cli = Cli::parse_from(["strata", "run"]);
        assert_eq!(cli.config, "strata.toml");
        assert!(matches!(cli.command, Commands::Run(_)));
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["strata", "--config", "custom.toml", "run"]);
        assert_eq!(cli.config, "custom.toml");
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["strata", "--log-level", "debug", "sync"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_parse_sync_with_tables() {
        let cli = Cli::parse_from(["strata", "sync", "--tables", "opportunity,summary"]);
        match cli.command {
            Commands::Sync(args) => {
                assert_eq!(args.tables, Some("opportunity,summary".to_string()));
            }
            _ => panic!("expected sync command"),
        }
    }

    #[test]
    fn test_cli_parse_transform_with_cap() {
        let cli = Cli::parse_from(["strata", "transform", "--max-records", "100"]);
        match cli.command {
            Commands::Transform(args) => {
                assert_eq!(args.max_records, Some(100));
            }
            _ => panic!("expected transform command"),
        }
    }

    #[test]
    fn test_cli_parse_status() {
        let cli = Cli::parse_from(["strata", "status"]);
        assert!(matches!(cli.command, Commands::Status(_)));
    }

    #[test]
    fn test_cli_parse_validate() {
        let cli = Cli::parse_from(["strata", "validate"]);
        assert!(matches!(cli.command, Commands::Validate(_)));
    }

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::parse_from(["strata", "init"]);
        assert!(matches!(cli.command, Commands::Init(_)));
    }
}
