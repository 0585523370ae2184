//! The path node: one leg of a waybill's expected-path tree.
//!
//! Nodes refer to centers by code and to connections by index, never by
//! in-memory handle, so a stored tree survives a network reload.
//!
//! # Document form
//!
//! [`PathNode::to_document`] writes canonical field names with timestamps as
//! epoch seconds.  [`PathNode::from_document`] also accepts the short field
//! names of older stored rows (`wbn`, `st`, `e_arr`, `a_arr`, `e_dep`,
//! `a_dep`, `dst`, `f_at`, `stc`, `cr_at`, `pd`); they are read-only aliases
//! and are never written.

use serde::{Deserialize, Serialize};

use ep_core::{NodeId, Timestamp};

use crate::{StoreError, StoreResult};

// ── Enums ─────────────────────────────────────────────────────────────────────

/// Lifecycle of a node.
///
/// `Future → Active → {Reached | Failed}`; any `Future` may also be retired
/// to `Inactive`.  `Reached`, `Failed` and `Inactive` are final.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    Active,
    Reached,
    Future,
    Failed,
    Inactive,
}

impl NodeState {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeState::Active   => "active",
            NodeState::Reached  => "reached",
            NodeState::Future   => "future",
            NodeState::Failed   => "failed",
            NodeState::Inactive => "inactive",
        }
    }

    /// `true` once the node can no longer change state.
    pub fn is_final(self) -> bool {
        matches!(self, NodeState::Reached | NodeState::Failed | NodeState::Inactive)
    }
}

impl std::fmt::Display for NodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a deviation was observed.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailLocation {
    /// At the center, between arrival and departure.
    Center,
    /// On the connection into the node's center.
    ConnectionIn,
    /// On the connection out of the node's center.
    ConnectionOut,
}

/// Why a node left its plan.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailCause {
    /// Scanned somewhere else without a matching action; path rebuilt there.
    Regenerated,
    DestinationChanged,
    /// Schedule broken: a connection was missed.
    Hard,
    /// Late, but still on plan.
    Soft,
    /// Arrived at the wrong center.
    Misrouted,
}

// ── PathNode ──────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathNode {
    #[serde(alias = "_id")]
    pub id: NodeId,

    #[serde(alias = "wbn")]
    pub waybill: String,

    /// Center code.  `None` only on the root.
    #[serde(default)]
    pub vertex: Option<String>,

    /// Index of the connection the node is expected to depart on.  `None`
    /// on the root and on destination nodes.
    #[serde(default)]
    pub edge: Option<u32>,

    #[serde(default)]
    pub parent: Option<NodeId>,

    #[serde(default, alias = "e_arr")]
    pub expected_arrival: Option<Timestamp>,
    #[serde(default, alias = "e_dep")]
    pub expected_departure: Option<Timestamp>,
    #[serde(default, alias = "a_arr")]
    pub actual_arrival: Option<Timestamp>,
    #[serde(default, alias = "a_dep")]
    pub actual_departure: Option<Timestamp>,

    #[serde(default, alias = "dst")]
    pub is_destination: bool,

    #[serde(alias = "st")]
    pub state: NodeState,

    #[serde(default, alias = "f_at")]
    pub fail_location: Option<FailLocation>,
    #[serde(default, alias = "stc")]
    pub fail_cause: Option<FailCause>,

    #[serde(default, alias = "cr_at")]
    pub created_at: Timestamp,

    #[serde(default, alias = "pd")]
    pub promise_date: Option<Timestamp>,
}

impl PathNode {
    /// A blank `Future` node for `waybill`.
    pub fn new(id: NodeId, waybill: &str, created_at: Timestamp) -> PathNode {
        PathNode {
            id,
            waybill: waybill.to_owned(),
            vertex: None,
            edge: None,
            parent: None,
            expected_arrival: None,
            expected_departure: None,
            actual_arrival: None,
            actual_departure: None,
            is_destination: false,
            state: NodeState::Future,
            fail_location: None,
            fail_cause: None,
            created_at,
            promise_date: None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Tag a deviation.
    pub fn flag(&mut self, cause: FailCause, location: Option<FailLocation>) {
        self.fail_cause = Some(cause);
        self.fail_location = location;
    }

    /// Canonical JSON document.
    pub fn to_document(&self) -> StoreResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Parse a stored document, canonical or legacy.
    pub fn from_document(doc: &serde_json::Value) -> StoreResult<PathNode> {
        PathNode::deserialize(doc).map_err(|e| StoreError::Document(e.to_string()))
    }
}
