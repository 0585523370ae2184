//! Network-loading error type.

use thiserror::Error;

use ep_core::EpError;

/// Errors produced by `ep-network`.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("duplicate center code {0:?}")]
    DuplicateCenter(String),

    #[error("unknown center {0:?}")]
    UnknownCenter(String),

    #[error("duplicate connection index {0}")]
    DuplicateConnection(u32),

    #[error("network parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Core(#[from] EpError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type NetworkResult<T> = Result<T, NetworkError>;
