//! Typed queries and updates over path nodes.

use ep_core::NodeId;

use crate::{NodeState, PathNode};

/// Conjunction of optional field conditions.  The default filter matches
/// every node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeFilter {
    pub waybill:        Option<String>,
    pub state:          Option<NodeState>,
    pub is_destination: Option<bool>,
    pub parent:         Option<NodeId>,
    /// Only nodes created after this one.
    pub id_after:       Option<NodeId>,
}

impl NodeFilter {
    /// All nodes of one waybill.
    pub fn waybill(waybill: &str) -> Self {
        NodeFilter { waybill: Some(waybill.to_owned()), ..Default::default() }
    }

    pub fn state(mut self, state: NodeState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn destination(mut self, is_destination: bool) -> Self {
        self.is_destination = Some(is_destination);
        self
    }

    pub fn parent(mut self, parent: NodeId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn after(mut self, id: NodeId) -> Self {
        self.id_after = Some(id);
        self
    }

    pub fn matches(&self, node: &PathNode) -> bool {
        self.waybill.as_deref().is_none_or(|w| node.waybill == w)
            && self.state.is_none_or(|s| node.state == s)
            && self.is_destination.is_none_or(|d| node.is_destination == d)
            && self.parent.is_none_or(|p| node.parent == Some(p))
            && self.id_after.is_none_or(|id| node.id > id)
    }
}

/// Field updates applied by `update_many`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodePatch {
    pub state:          Option<NodeState>,
    pub is_destination: Option<bool>,
}

impl NodePatch {
    pub fn state(state: NodeState) -> Self {
        NodePatch { state: Some(state), ..Default::default() }
    }

    pub fn destination(mut self, is_destination: bool) -> Self {
        self.is_destination = Some(is_destination);
        self
    }

    pub fn apply(&self, node: &mut PathNode) {
        if let Some(state) = self.state {
            node.state = state;
        }
        if let Some(d) = self.is_destination {
            node.is_destination = d;
        }
    }
}
