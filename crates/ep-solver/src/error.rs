//! Solver error type.

use thiserror::Error;

/// Errors produced by `ep-solver`.
#[derive(Debug, Error)]
pub enum SolverError {
    /// A source or target code that is not a center of the network.
    #[error("invalid vertex {0:?}")]
    InvalidVertex(String),

    /// No path in any permitted mode.
    #[error("no path from {from} to {to}")]
    NoPath { from: String, to: String },

    /// The remote solver reported an error, or sent something unreadable.
    #[error("solver RPC error: {0}")]
    Rpc(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SolverResult<T> = Result<T, SolverError>;
