//! Error handling for the EMG pipeline
//!
//! One shared error enum for all crates in the workspace. Configuration and
//! model errors are terminal (the pipeline never starts); source errors
//! fault a running pipeline; non-finite numeric faults are recovered per
//! window by the orchestrator.

use thiserror::Error;

/// Result type alias for pipeline operations
pub type EmgResult<T> = Result<T, EmgError>;

/// Errors produced by the EMG pipeline
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EmgError {
    /// Invalid pipeline or filter configuration, rejected at start
    #[error("configuration error: {reason}")]
    Configuration {
        /// Description of the configuration problem
        reason: String,
    },

    /// Sample source closed or failed while the pipeline was running
    #[error("sample source error: {reason}")]
    Source {
        /// Description of the source fault
        reason: String,
    },

    /// Model artifact could not be loaded or failed structural validation
    #[error("model artifact error: {reason}")]
    Model {
        /// Description of the artifact problem
        reason: String,
    },

    /// Input dimensions do not match the loaded artifact's contract
    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// Filter or classifier produced NaN/Inf for one window
    #[error("non-finite output in {stage}")]
    NonFiniteOutput {
        /// Pipeline stage that produced the value
        stage: &'static str,
    },

    /// Internal processing failure
    #[error("processing error: {reason}")]
    Processing {
        /// Description of the failure
        reason: String,
    },

    /// Artifact file I/O failure
    #[error("artifact i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Artifact or configuration JSON failure
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EmgError {
    /// Configuration error from anything displayable
    pub fn config(reason: impl Into<String>) -> Self {
        EmgError::Configuration { reason: reason.into() }
    }

    /// Source fault from anything displayable
    pub fn source(reason: impl Into<String>) -> Self {
        EmgError::Source { reason: reason.into() }
    }

    /// Model artifact error from anything displayable
    pub fn model(reason: impl Into<String>) -> Self {
        EmgError::Model { reason: reason.into() }
    }
}
