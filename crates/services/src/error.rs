//! Shared error types for the services crate.
//!
//! Remote read/write/notification failures never appear here: the
//! synchronizer reduces them to log lines.

use thiserror::Error;

use storage::sqlite::SqliteInitError;

/// Errors emitted by `AdminGate`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum AdminAuthError {
    #[error("admin access is not configured")]
    Disabled,
    #[error("invalid admin credential")]
    InvalidCredential,
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
