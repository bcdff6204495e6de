//! Error types for the audit engine
//!
//! Errors are classified by how far they are allowed to propagate:
//! - record-level (`MalformedRecord`) degrades one record to "unresolved"
//! - batch-level (`TransientExternal`, `PermanentExternal`) fails one batch
//! - operation-level (`DatasetStructure`, `Cancelled`) fails one operation
//! - request-level (`UnknownOperation`) is rejected before scheduling

use thiserror::Error;

/// Audit engine error type
#[derive(Debug, Error)]
pub enum AuditError {
    /// Network failure, timeout or rate limit; retried with backoff
    #[error("Transient external failure: {0}")]
    TransientExternal(String),

    /// Malformed request or authentication failure; never retried
    #[error("Permanent external failure: {0}")]
    PermanentExternal(String),

    /// A record lacks what an operation needs, or its reply could not be parsed
    #[error("Malformed record at row {row_index}: {reason}")]
    MalformedRecord { row_index: usize, reason: String },

    /// Missing or garbled table
    #[error("Dataset structure error: {0}")]
    DatasetStructure(String),

    /// Operation identifier outside the menu
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// Run interrupted while the operation was in flight
    #[error("Cancelled after {batches_processed} processed / {batches_failed} failed batches")]
    Cancelled {
        batches_processed: usize,
        batches_failed: usize,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV decoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encoding/decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// a11y-common error
    #[error("Common error: {0}")]
    Common(#[from] a11y_common::Error),

    /// Internal error (task join failures and similar)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuditError {
    /// Only transient external failures are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuditError::TransientExternal(_))
    }
}

/// Result type for audit operations
pub type AuditResult<T> = Result<T, AuditError>;
