//! One waybill's path tree, loaded once per event and edited in memory.
//!
//! Nodes are kept in ascending id order, which is creation order.  Every
//! node inserted or modified is marked dirty; [`PathTree::take_dirty`] hands
//! the lot to the store for a single atomic write.

use std::collections::BTreeSet;

use ep_core::NodeId;
use ep_store::{FailCause, FailLocation, NodeFilter, NodeState, PathGraphStore, PathNode};

use crate::{ManagerError, ManagerResult};

pub struct PathTree {
    waybill: String,
    nodes:   Vec<PathNode>,
    dirty:   BTreeSet<NodeId>,
}

impl PathTree {
    pub fn new(waybill: &str) -> Self {
        PathTree { waybill: waybill.to_owned(), nodes: Vec::new(), dirty: BTreeSet::new() }
    }

    /// Every stored node of `waybill`.
    pub fn load<St: PathGraphStore + ?Sized>(store: &St, waybill: &str) -> ManagerResult<Self> {
        let mut nodes = store.find_many(&NodeFilter::waybill(waybill))?;
        nodes.sort_by_key(|n| n.id);
        Ok(PathTree { waybill: waybill.to_owned(), nodes, dirty: BTreeSet::new() })
    }

    pub fn waybill(&self) -> &str {
        &self.waybill
    }

    pub fn nodes(&self) -> &[PathNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ── Lookup ────────────────────────────────────────────────────────────

    fn position(&self, id: NodeId) -> Option<usize> {
        self.nodes.binary_search_by_key(&id, |n| n.id).ok()
    }

    pub fn get(&self, id: NodeId) -> Option<&PathNode> {
        self.position(id).map(|i| &self.nodes[i])
    }

    /// Like [`get`](Self::get), for nodes the state machine cannot do without.
    pub fn require(&self, id: NodeId) -> ManagerResult<&PathNode> {
        self.get(id).ok_or_else(|| self.missing(id))
    }

    /// Mutable access; marks the node dirty.
    pub fn require_mut(&mut self, id: NodeId) -> ManagerResult<&mut PathNode> {
        let i = self.position(id).ok_or_else(|| self.missing(id))?;
        self.dirty.insert(id);
        Ok(&mut self.nodes[i])
    }

    fn missing(&self, id: NodeId) -> ManagerError {
        ManagerError::NoActiveNode(format!("{} (node {id} not in tree)", self.waybill))
    }

    /// The cursor, if any.  With more than one active node the newest wins.
    pub fn active(&self) -> Option<NodeId> {
        self.nodes.iter().rev().find(|n| n.state == NodeState::Active).map(|n| n.id)
    }

    pub fn destination(&self) -> Option<&PathNode> {
        self.nodes.iter().rev().find(|n| n.is_destination)
    }

    /// The next planned node under `parent`.
    pub fn future_child(&self, parent: NodeId) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|n| n.parent == Some(parent) && n.state == NodeState::Future)
            .map(|n| n.id)
    }

    /// Newest node in `Reached` state, the root included.
    pub fn last_reached(&self) -> Option<NodeId> {
        self.nodes.iter().rev().find(|n| n.state == NodeState::Reached).map(|n| n.id)
    }

    // ── Mutation ──────────────────────────────────────────────────────────

    /// Add a new node.  Ids come from the store and only grow, so this is
    /// normally a push.
    pub fn insert(&mut self, node: PathNode) {
        self.dirty.insert(node.id);
        match self.nodes.last() {
            Some(last) if last.id > node.id => {
                let i = self.nodes.partition_point(|n| n.id < node.id);
                self.nodes.insert(i, node);
            }
            _ => self.nodes.push(node),
        }
    }

    /// Fail `id` and retire the rest of its plan: every `Future` node created
    /// after it becomes `Inactive`.  Both lose the destination flag.
    pub fn deactivate(
        &mut self,
        id: NodeId,
        cause: FailCause,
        location: Option<FailLocation>,
    ) -> ManagerResult<()> {
        let node = self.require_mut(id)?;
        node.state = NodeState::Failed;
        node.is_destination = false;
        node.flag(cause, location);

        for n in self.nodes.iter_mut().filter(|n| n.id > id && n.state == NodeState::Future) {
            n.state = NodeState::Inactive;
            n.is_destination = false;
            self.dirty.insert(n.id);
        }
        Ok(())
    }

    /// Retire every `Future` node.  Returns how many there were.
    pub fn retire_futures(&mut self) -> usize {
        let mut retired = 0;
        for n in self.nodes.iter_mut().filter(|n| n.state == NodeState::Future) {
            n.state = NodeState::Inactive;
            n.is_destination = false;
            self.dirty.insert(n.id);
            retired += 1;
        }
        retired
    }

    /// Drop the destination flag from every node.  Returns how many carried it.
    pub fn clear_destination(&mut self) -> usize {
        let mut cleared = 0;
        for n in self.nodes.iter_mut().filter(|n| n.is_destination) {
            n.is_destination = false;
            self.dirty.insert(n.id);
            cleared += 1;
        }
        cleared
    }

    /// The nodes to write, in id order; clears the dirty set.
    pub fn take_dirty(&mut self) -> Vec<PathNode> {
        let dirty = std::mem::take(&mut self.dirty);
        self.nodes.iter().filter(|n| dirty.contains(&n.id)).cloned().collect()
    }
}
