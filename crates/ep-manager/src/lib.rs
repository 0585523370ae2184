//! `ep-manager` — reconciles scans against each waybill's expected path.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                    |
//! |-------------|-------------------------------------------------------------|
//! | [`event`]   | `ScanEvent`, `ScanAction`, JSON decoding                    |
//! | [`tree`]    | `PathTree`: one waybill's nodes, edited in memory           |
//! | [`manager`] | `GraphManager::parse_path`, `ParseOutcome`                  |
//! | [`error`]   | `ManagerError`, `Disposition`, `ManagerResult<T>`           |
//!
//! # Per-event flow
//!
//! 1. If the waybill's destination node is already reached, do nothing.
//! 2. Load the waybill's nodes into a [`PathTree`].  With no nodes yet, solve
//!    a path from the scan location and build the tree.
//! 3. Destination check: if the event names a different destination, the
//!    active node fails and a new chain is grafted under its parent.
//! 4. By action: none → location check; inbound → inscan rules;
//!    outbound → location check, then outscan rules.
//! 5. Commit every touched node with one `save_all`.
//!
//! Nothing is written if any step fails, so a retried event starts from the
//! same stored state.

pub mod error;
pub mod event;
pub mod manager;
pub mod tree;


pub use error::{Disposition, ManagerError, ManagerResult};
pub use event::{ScanAction, ScanEvent};
pub use manager::{GraphManager, ParseOutcome};
pub use tree::PathTree;
