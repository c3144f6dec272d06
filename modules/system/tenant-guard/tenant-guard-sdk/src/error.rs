//! Error types for the tenant guard SDK.

use thiserror::Error;

/// Errors a [`crate::TenantStore`] implementation may report.
///
/// The guard treats every variant as a validation failure; none of them can
/// lead to a request being allowed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached or refused the query.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store returned a record that could not be interpreted.
    #[error("malformed store record: {0}")]
    Malformed(String),

    /// Any other unexpected failure.
    #[error("internal store error: {0}")]
    Internal(String),
}

/// Errors an [`crate::AuditSink`] may report. Always discarded by the guard
/// after being logged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuditSinkError {
    #[error("audit sink unavailable: {0}")]
    Unavailable(String),

    #[error("audit record rejected: {0}")]
    Rejected(String),
}
