//! `ep-core` — foundational types for the expected-path engine.
//!
//! This crate is a dependency of every other `ep-*` crate.  It has no `ep-*`
//! dependencies of its own.
//!
//! # What lives here
//!
//! | Module        | Contents                                                  |
//! |---------------|-----------------------------------------------------------|
//! | [`ids`]       | `CenterId`, `EdgeId`, `NodeId`                            |
//! | [`time`]      | `Timestamp`, `TimeOfDay`, `wait_until`                    |
//! | [`mode`]      | `TransportMode` enum                                      |
//! | [`config`]    | `EngineConfig` (TOML-loadable)                            |
//! | [`error`]     | `EpError`, `EpResult`                                     |

pub mod config;
pub mod error;
pub mod ids;
pub mod mode;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::EngineConfig;
pub use error::{EpError, EpResult};
pub use ids::{CenterId, EdgeId, NodeId};
pub use mode::TransportMode;
pub use time::{SECS_PER_DAY, TimeOfDay, Timestamp, time_of_day_to_seconds, wait_until};
