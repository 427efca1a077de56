//! PostgreSQL store integration
//!
//! This module provides the production store adapters: a read-only source
//! over the foreign legacy schema and a target owning the staging and
//! domain schemas.

pub mod client;
pub mod models;
pub mod source;
pub mod target;

pub use client::PostgresClient;
pub use source::PostgresSource;
pub use target::PostgresTarget;
