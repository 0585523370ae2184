//! `ep-dispatch` — feeds scan events to the [`GraphManager`](ep_manager::GraphManager).
//!
//! # Crate layout
//!
//! | Module         | Contents                                                 |
//! |----------------|----------------------------------------------------------|
//! | [`locks`]      | `WaybillLocks`: striped per-waybill mutexes              |
//! | [`dispatcher`] | `Dispatcher`, `DispatchOutcome`, `BatchReport`           |
//! | [`observer`]   | `DispatchObserver` trait, `NoopObserver`                 |
//! | [`jsonl`]      | `read_jsonl`: newline-delimited scan records             |
//! | [`error`]      | `DispatchError`, `DispatchResult<T>`                     |
//!
//! # Ordering
//!
//! Events of one waybill are applied one at a time, in the order given.
//! Events of different waybills may run concurrently: the manager holds no
//! state between calls, and each call loads and commits only its own
//! waybill's nodes.
//!
//! # Feature flags
//!
//! | Flag       | Effect                                                   |
//! |------------|----------------------------------------------------------|
//! | `parallel` | `dispatch_batch` runs waybill groups on Rayon's pool.    |
//! | `fx-hash`  | Stripe selection hashes with `rustc_hash::FxHasher`.     |

pub mod dispatcher;
pub mod error;
pub mod jsonl;
pub mod locks;
pub mod observer;

#[cfg(test)]
mod tests;

pub use dispatcher::{BatchReport, DispatchOutcome, Dispatcher};
pub use error::{DispatchError, DispatchResult};
pub use jsonl::read_jsonl;
pub use locks::WaybillLocks;
pub use observer::{DispatchObserver, NoopObserver};
