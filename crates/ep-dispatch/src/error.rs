use ep_manager::ManagerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("I/O error reading scans: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {source}")]
    Line {
        line:   usize,
        #[source]
        source: ManagerError,
    },
}

pub type DispatchResult<T> = Result<T, DispatchError>;
