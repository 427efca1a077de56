//! Domain error types
//!
//! This module defines the error hierarchy for Strata. Operational failures
//! (configuration, storage, blob I/O) live in [`StrataError`]; data-caused
//! per-record failures live in [`TransformError`] so the transformation
//! dispatcher can catch exactly the recoverable class and leave the staging
//! row pending for the next run. Neither type exposes third-party error
//! types.

use thiserror::Error;

/// Operational pipeline errors
///
/// Anything in this enum aborts the current batch or component; none of
/// these are caught per record. Variants carry rendered messages rather
/// than source error types so adapter internals stay out of the public
/// surface.
#[derive(Debug, Error)]
pub enum StrataError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Source store errors (the foreign legacy schema)
    #[error("Source store error: {0}")]
    Source(String),

    /// Target store errors (staging and domain schemas)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Blob storage errors (instruction documents)
    #[error("Blob storage error: {0}")]
    Blob(String),

    /// Network/connection errors
    #[error("Connection error: {0}")]
    Connection(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

/// Per-record transformation errors
///
/// Every variant is deterministic and data-caused: retrying without fixing
/// the source row reproduces the same error. The dispatcher catches these,
/// counts them, and leaves the staging row untransformed so the next run
/// retries exactly that record in isolation.
#[derive(Debug, Error)]
pub enum TransformError {
    /// A legacy Y/N flag held something other than Y, N, or empty
    #[error("malformed boolean flag: {value:?}")]
    MalformedBoolean { value: String },

    /// A legacy code has no mapping to a domain enumeration value
    #[error("unrecognized {entity} code: {code:?}")]
    UnrecognizedCode { entity: &'static str, code: String },

    /// A field the transformation requires was null or absent
    #[error("missing required field {field} on {entity} record")]
    MissingRequiredField {
        entity: &'static str,
        field: &'static str,
    },

    /// A non-historical row's required parent record does not exist
    #[error("missing required parent for {entity} record")]
    MissingParent { entity: &'static str },

    /// The staged payload does not match the expected record shape
    #[error("malformed {entity} payload: {detail}")]
    MalformedRecord { entity: &'static str, detail: String },
}

// Conversion from std::io::Error
impl From<std::io::Error> for StrataError {
    fn from(err: std::io::Error) -> Self {
        StrataError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for StrataError {
    fn from(err: serde_json::Error) -> Self {
        StrataError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for StrataError {
    fn from(err: toml::de::Error) -> Self {
        StrataError::Configuration(format!("TOML parse error: {err}"))
    }
}
