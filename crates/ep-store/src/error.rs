//! Error types for ep-store.

use thiserror::Error;

/// Errors that can occur reading or writing path nodes.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A document that does not describe a valid path node.
    #[error("invalid path node document: {0}")]
    Document(String),

    #[error("store lock poisoned")]
    Poisoned,

    /// The backend refused the operation; nothing was written.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Alias for `Result<T, StoreError>`.
pub type StoreResult<T> = Result<T, StoreError>;
