//! Storage-level error type.
//!
//! Store implementations only ever produce `StoreError`; translation into
//! transport status codes happens in the service layer.

use std::time::Duration;

/// Errors returned by [`RecordStore`](super::RecordStore) implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record exists with the requested identifier.
    #[error("record not found: {id}")]
    NotFound { id: String },
    /// The operation did not finish before its deadline.
    #[error("{operation} exceeded its {timeout:?} deadline")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },
    /// A row could not be decoded into a `Record`.
    #[error("failed to decode row: {0}")]
    Decode(#[source] sqlx::Error),
    /// Query, transaction, or connectivity failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// Schema migration failure.
    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    /// Rejected configuration (unsupported driver, unusable address).
    #[error("invalid store configuration: {0}")]
    Config(String),
}

impl StoreError {
    /// Whether the error means "absent" rather than "broken".
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
