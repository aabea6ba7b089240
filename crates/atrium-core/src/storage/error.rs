//! Error types for the storage layer.

use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors that can occur in the storage layer.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Database connection error.
    #[error("Database connection error: {0}")]
    Connection(#[from] rusqlite::Error),

    /// The backing store is not reachable or not initialized.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Item not found in storage.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid data error.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Whether the error means the store could not be reached at all, as
    /// opposed to a failure while handling data it returned.
    pub fn is_unavailable(&self) -> bool {
        match self {
            Self::Connection(rusqlite::Error::SqliteFailure(failure, _)) => matches!(
                failure.code,
                ErrorCode::CannotOpen
                    | ErrorCode::DatabaseBusy
                    | ErrorCode::DatabaseLocked
                    | ErrorCode::SystemIoFailure
                    | ErrorCode::NotADatabase
                    | ErrorCode::DatabaseCorrupt
                    | ErrorCode::ReadOnly
            ),
            Self::Unavailable(_) | Self::Io(_) => true,
            _ => false,
        }
    }
}

/// Result type alias for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_failure(code: std::os::raw::c_int) -> StorageError {
        StorageError::Connection(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(code),
            None,
        ))
    }

    #[test]
    fn test_sqlite_failure_is_unavailable() {
        assert!(sqlite_failure(rusqlite::ffi::SQLITE_CANTOPEN).is_unavailable());
        assert!(StorageError::Unavailable("gone".to_string()).is_unavailable());
    }

    #[test]
    fn test_data_errors_are_not_unavailable() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(!StorageError::Serialization(json_err).is_unavailable());
        assert!(!StorageError::InvalidData("bad".to_string()).is_unavailable());
        assert!(!StorageError::Connection(rusqlite::Error::QueryReturnedNoRows).is_unavailable());
        assert!(!sqlite_failure(rusqlite::ffi::SQLITE_CONSTRAINT).is_unavailable());
        assert!(!sqlite_failure(rusqlite::ffi::SQLITE_ERROR).is_unavailable());
        assert!(!sqlite_failure(rusqlite::ffi::SQLITE_MISMATCH).is_unavailable());
    }

    #[test]
    fn test_unreachable_database_codes_are_unavailable() {
        for code in [
            rusqlite::ffi::SQLITE_BUSY,
            rusqlite::ffi::SQLITE_LOCKED,
            rusqlite::ffi::SQLITE_IOERR,
            rusqlite::ffi::SQLITE_NOTADB,
            rusqlite::ffi::SQLITE_CORRUPT,
            rusqlite::ffi::SQLITE_READONLY,
        ] {
            assert!(sqlite_failure(code).is_unavailable(), "code {code}");
        }
    }
}
