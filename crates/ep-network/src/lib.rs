//! `ep-network` — centers, scheduled connections, and CSV loading.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                    |
//! |-------------|-------------------------------------------------------------|
//! | [`network`] | `Center`, `Connection`, `NetworkGraph` (CSR), `NetworkBuilder`, `normalize_code` |
//! | [`loader`]  | `load_network_csv`, `load_network_readers`                  |
//! | [`error`]   | `NetworkError`, `NetworkResult<T>`                          |
//!
//! # Feature flags
//!
//! | Flag      | Effect                                                     |
//! |-----------|------------------------------------------------------------|
//! | `fx-hash` | Code/index lookups use `rustc_hash::FxHashMap`.            |

pub mod error;
pub mod loader;
pub mod network;


pub use error::{NetworkError, NetworkResult};
pub use loader::{load_network_csv, load_network_readers};
pub use network::{Center, Connection, NetworkBuilder, NetworkGraph, normalize_code};
