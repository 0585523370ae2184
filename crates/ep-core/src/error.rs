//! Engine-wide base error type.
//!
//! Sub-crates define their own error enums and wrap `EpError` as one variant
//! via `#[from]`.

use thiserror::Error;

/// The top-level error type for `ep-core` and a common base for sub-crates.
#[derive(Debug, Error)]
pub enum EpError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for all `ep-*` crates.
pub type EpResult<T> = Result<T, EpError>;
