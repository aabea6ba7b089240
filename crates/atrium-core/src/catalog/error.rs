//! Errors surfaced by catalog operations.

use thiserror::Error;

use crate::storage::StorageError;

/// Failure of a catalog operation. There is no partial success: callers
/// receive either a complete page or one of these.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// A data source is unreachable or was never initialized.
    #[error("Catalog data source is not ready: {0}")]
    ServiceNotReady(String),

    /// Anything else that went wrong while reading or projecting records.
    #[error("Internal catalog error: {0}")]
    Internal(String),
}

impl CatalogError {
    /// Stable machine-readable code for the HTTP surface.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ServiceNotReady(_) => "SERVICE_NOT_READY",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<StorageError> for CatalogError {
    fn from(err: StorageError) -> Self {
        if err.is_unavailable() {
            Self::ServiceNotReady(err.to_string())
        } else {
            Self::Internal(err.to_string())
        }
    }
}

/// Result type alias for catalog operations.
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
