//! Error types for the cache client
//!
//! Provides unified error handling using thiserror.
//!
//! Expected, logically declined outcomes are NOT errors: a missing key is
//! `Ok(None)`, an `add` on an existing key or a `replace` on a missing key is
//! `Ok(false)`. Everything in [`CacheError`] means the operation was broken,
//! not declined.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache client.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Caller supplied an argument the operation can never accept
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Stored value has the wrong type for the requested operation
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Backend could not be reached or failed outright
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Backend or codec lacks the requested capability
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Value could not be encoded or decoded
    #[error("Codec error: {0}")]
    Codec(String),

    /// A pipelined command batch reported a failure
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    /// JSON (de)serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CacheError {
    /// True for failures caused by the backend rather than by the caller.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            CacheError::BackendUnavailable(_) | CacheError::Pipeline(_)
        )
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache client.
pub type Result<T> = std::result::Result<T, CacheError>;

// == Outcome ==
/// Collapses a `Result<bool>` to the plain boolean success contract.
///
/// Call sites that only care whether a write happened can keep treating every
/// failure as `false`; the error is logged before being dropped.
pub trait Outcome {
    fn succeeded(self) -> bool;
}

impl Outcome for Result<bool> {
    fn succeeded(self) -> bool {
        match self {
            Ok(done) => done,
            Err(err) => {
                tracing::debug!(error = %err, "cache operation failed");
                false
            }
        }
    }
}
