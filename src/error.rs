//! Defines the crate level error type and its conversion from SQLite errors.

use rusqlite::ErrorCode;

/// The errors that may occur when working with a tally.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The platform denied access to persistent storage, or the storage
    /// cannot be used (e.g., the file is not a database).
    ///
    /// This error is not expected to be transient, callers should report it
    /// once and stop rather than retry.
    #[error("persistent storage is unavailable: {0}")]
    StorageUnavailable(String),

    /// The caller provided a value that cannot be stored, e.g. an amount
    /// that is not a finite number.
    ///
    /// The store is never modified when this error is returned.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLock,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(sql_error, ref desc)
                if is_storage_failure(sql_error.code) =>
            {
                let reason = desc.clone().unwrap_or_else(|| sql_error.to_string());
                tracing::error!("storage failure: {reason}");
                Error::StorageUnavailable(reason)
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

fn is_storage_failure(code: ErrorCode) -> bool {
    matches!(
        code,
        ErrorCode::CannotOpen
            | ErrorCode::PermissionDenied
            | ErrorCode::ReadOnly
            | ErrorCode::NotADatabase
            | ErrorCode::DatabaseCorrupt
            | ErrorCode::DiskFull
            | ErrorCode::SystemIoFailure
            | ErrorCode::NoLargeFileSupport
    )
}
