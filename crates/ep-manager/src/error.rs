//! Manager error taxonomy.

use thiserror::Error;

use ep_solver::SolverError;
use ep_store::StoreError;

/// Errors produced while reconciling one scan.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// Malformed or incomplete event.
    #[error("invalid scan event: {0}")]
    Validation(String),

    /// A location or destination that is not a center of the network.
    #[error("unknown center {0:?}")]
    UnknownVertex(String),

    /// The stored tree lacks a node the state machine relies on.
    #[error("no active node for waybill {0}")]
    NoActiveNode(String),

    /// No path exists, even without schedules.
    #[error("no path from {from} to {to}")]
    SolverUnreachable { from: String, to: String },

    #[error("solver error: {0}")]
    Solver(SolverError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl From<SolverError> for ManagerError {
    fn from(e: SolverError) -> Self {
        match e {
            SolverError::InvalidVertex(code) => ManagerError::UnknownVertex(code),
            SolverError::NoPath { from, to } => ManagerError::SolverUnreachable { from, to },
            other => ManagerError::Solver(other),
        }
    }
}

/// What the transport should do with an event that failed.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Disposition {
    /// Log and acknowledge; retrying cannot help.
    Skip,
    /// Leave unacknowledged for redelivery or inspection.
    Redeliver,
}

impl ManagerError {
    pub fn disposition(&self) -> Disposition {
        match self {
            ManagerError::Validation(_)
            | ManagerError::UnknownVertex(_)
            | ManagerError::NoActiveNode(_) => Disposition::Skip,
            ManagerError::SolverUnreachable { .. }
            | ManagerError::Solver(_)
            | ManagerError::Store(_) => Disposition::Redeliver,
        }
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;
