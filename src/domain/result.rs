//! Result alias for pipeline operations
//!
//! Store adapters, the sync engine, and the orchestrator all return this
//! alias. Per-record transformation failures use
//! [`TransformError`](super::errors::TransformError) instead and never
//! appear here.

use super::errors::StrataError;

/// Result of a pipeline operation
///
/// # Example
///
/// ```rust
/// use strata::domain::result::Result;
/// use strata::domain::errors::StrataError;
///
/// fn chunk_size(configured: usize) -> Result<usize> {
///     if configured == 0 {
///         return Err(StrataError::Configuration(
///             "chunk_size must be at least 1".to_string(),
///         ));
///     }
///     Ok(configured)
/// }
///
/// assert!(chunk_size(500).is_ok());
/// assert!(chunk_size(0).is_err());
/// ```
pub type Result<T> = std::result::Result<T, StrataError>;
