//! In-memory backend.

use std::collections::{BTreeMap, HashSet};
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use ep_core::NodeId;

use crate::{
    NodeFilter, NodePatch, PathGraphStore, PathNode, ScanLedger, StoreError, StoreResult,
};

/// Nodes in a `BTreeMap` keyed by id, so scans come out in creation order.
///
/// Used by tests and by single-process replays that do not need durability.
pub struct MemoryStore {
    nodes:   RwLock<BTreeMap<NodeId, PathNode>>,
    scans:   RwLock<HashSet<String>>,
    next_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            nodes:   RwLock::new(BTreeMap::new()),
            scans:   RwLock::new(HashSet::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Total nodes across all waybills.
    pub fn len(&self) -> usize {
        self.nodes.read().map_or(0, |n| n.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PathGraphStore for MemoryStore {
    fn next_id(&self) -> StoreResult<NodeId> {
        Ok(NodeId(self.next_id.fetch_add(1, Ordering::Relaxed)))
    }

    fn find_many(&self, filter: &NodeFilter) -> StoreResult<Vec<PathNode>> {
        let nodes = self.nodes.read().map_err(|_| StoreError::Poisoned)?;
        let lower = filter.id_after.map_or(NodeId(0), NodeId::next);
        Ok(nodes
            .range(lower..)
            .map(|(_, n)| n)
            .filter(|n| filter.matches(n))
            .cloned()
            .collect())
    }

    fn save_all(&self, batch: &[PathNode]) -> StoreResult<()> {
        let mut nodes = self.nodes.write().map_err(|_| StoreError::Poisoned)?;
        for node in batch {
            self.next_id.fetch_max(node.id.0 + 1, Ordering::Relaxed);
            nodes.insert(node.id, node.clone());
        }
        Ok(())
    }

    fn update_many(&self, filter: &NodeFilter, patch: &NodePatch) -> StoreResult<usize> {
        let mut nodes = self.nodes.write().map_err(|_| StoreError::Poisoned)?;
        let mut matched = 0;
        for node in nodes.values_mut().filter(|n| filter.matches(n)) {
            patch.apply(node);
            matched += 1;
        }
        Ok(matched)
    }
}

impl ScanLedger for MemoryStore {
    fn has_scan(&self, key: &str) -> StoreResult<bool> {
        let scans = self.scans.read().map_err(|_| StoreError::Poisoned)?;
        Ok(scans.contains(key))
    }

    fn record_scan(&self, key: &str) -> StoreResult<bool> {
        let mut scans = self.scans.write().map_err(|_| StoreError::Poisoned)?;
        Ok(scans.insert(key.to_owned()))
    }
}
