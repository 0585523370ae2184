//! `ep-solver` — shortest paths over the center network.
//!
//! # Crate layout
//!
//! | Module     | Contents                                                     |
//! |------------|--------------------------------------------------------------|
//! | [`record`] | `PathRecord`, `SearchMode`, `Route`                          |
//! | [`search`] | `SearchState`, `schedule_search` (time-minimal, schedule-aware) |
//! | [`hops`]   | `hop_search` (BFS), `hop_route` (timing a hop list)          |
//! | [`solver`] | `PathSolver` trait, `ScheduleSolver`                         |
//! | [`rpc`]    | `SolverRequest`/`SolverResponse`, `respond`, `serve_lines`, `RpcSolver` |
//! | [`error`]  | `SolverError`, `SolverResult<T>`                             |
//!
//! # Search modes
//!
//! The **schedule** search (mode 0) finds the earliest arrival at every center
//! reachable from a source, waiting at each center for the next daily
//! departure of the connection it takes.  The **hop** search (mode 1) ignores
//! schedules and finds the path with fewest connections; it is the fallback
//! when no scheduled path exists.

pub mod error;
pub mod hops;
pub mod record;
pub mod rpc;
pub mod search;
pub mod solver;

#[cfg(test)]
mod tests;

pub use error::{SolverError, SolverResult};
pub use hops::{hop_route, hop_search};
pub use record::{PathRecord, Route, SearchMode};
pub use rpc::{
    LineTransport, LocalTransport, PathEntry, RpcSolver, RpcTransport, SolverRequest,
    SolverResponse, from_entries, respond, serve_lines, to_entries,
};
pub use search::{SearchState, schedule_search};
pub use solver::{PathSolver, ScheduleSolver};
