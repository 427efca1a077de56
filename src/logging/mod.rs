//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - Human-readable console output
//! - Configurable log levels
//! - An optional JSON log file with rotation
//!
//! # Example
//!
//! ```no_run
//! use strata::logging::init_logging;
//! use strata::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! // Use tracing macros for logging
//! tracing::info!("Application started");
//! tracing::error!(error = "Something went wrong", "Error occurred");
//! ```

pub mod structured;

// Re-export commonly used items
pub use structured::{init_logging, LoggingGuard};
