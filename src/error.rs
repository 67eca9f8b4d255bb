//! Error types shared by the store, the catalog manager and the tracker.

use thiserror::Error;

/// Failure inside a persistence backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why a catalog operation was rejected.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Empty name, or a numeric field out of its range.
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("{entity} `{key}' not found")]
    NotFound { entity: &'static str, key: String },

    /// The delete needs a resolution the caller did not give.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CatalogError {
    pub(crate) fn not_found(entity: &'static str, key: impl std::fmt::Display) -> Self {
        CatalogError::NotFound { entity, key: key.to_string() }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, CatalogError::Validation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, CatalogError::Conflict(_))
    }
}

pub type Result<T, E = CatalogError> = std::result::Result<T, E>;
