//! `ep-store` — path nodes and their persistence.
//!
//! # Crate layout
//!
//! | Module     | Contents                                                     |
//! |------------|--------------------------------------------------------------|
//! | [`node`]   | `PathNode`, `NodeState`, `FailLocation`, `FailCause`, document codec |
//! | [`filter`] | `NodeFilter`, `NodePatch`                                    |
//! | [`store`]  | `PathGraphStore` and `ScanLedger` traits                     |
//! | [`memory`] | `MemoryStore`                                                |
//! | [`sqlite`] | `SqliteStore` (feature = `"sqlite"` only)                    |
//! | [`error`]  | `StoreError`, `StoreResult<T>`                               |
//!
//! # Feature flags
//!
//! | Flag     | Effect                                                       |
//! |----------|--------------------------------------------------------------|
//! | `sqlite` | Enables `SqliteStore` via `rusqlite`.                        |

pub mod error;
pub mod filter;
pub mod memory;
pub mod node;
pub mod store;

#[cfg(feature = "sqlite")]
pub mod sqlite;


pub use error::{StoreError, StoreResult};
pub use filter::{NodeFilter, NodePatch};
pub use memory::MemoryStore;
pub use node::{FailCause, FailLocation, NodeState, PathNode};
pub use store::{PathGraphStore, ScanLedger};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
