//! Storage traits implemented by every backend.

use ep_core::NodeId;

use crate::{NodeFilter, NodePatch, PathNode, StoreResult};

/// Persistence for path nodes.
///
/// All methods take `&self`: backends synchronise internally so one store can
/// be shared by every worker.  Callers serialise work per waybill; the store
/// offers no compare-and-swap.
pub trait PathGraphStore: Send + Sync {
    /// Allocate a fresh node id, greater than every id allocated or saved
    /// before.
    fn next_id(&self) -> StoreResult<NodeId>;

    /// Matching nodes in ascending id (creation) order.
    fn find_many(&self, filter: &NodeFilter) -> StoreResult<Vec<PathNode>>;

    /// The first matching node in creation order.
    fn find_one(&self, filter: &NodeFilter) -> StoreResult<Option<PathNode>> {
        Ok(self.find_many(filter)?.into_iter().next())
    }

    fn count(&self, filter: &NodeFilter) -> StoreResult<usize> {
        Ok(self.find_many(filter)?.len())
    }

    /// Insert or replace nodes by id, all or nothing.
    fn save_all(&self, nodes: &[PathNode]) -> StoreResult<()>;

    /// Insert or replace one node by id.
    fn save(&self, node: &PathNode) -> StoreResult<()> {
        self.save_all(std::slice::from_ref(node))
    }

    /// Apply `patch` to every matching node; returns how many matched.
    fn update_many(&self, filter: &NodeFilter, patch: &NodePatch) -> StoreResult<usize>;
}

/// Record of scan identities already processed.
///
/// Callers check with `has_scan` before applying a scan and call
/// `record_scan` only once its effects are committed, so a scan lost
/// between the two is processed again on redelivery.
pub trait ScanLedger: Send + Sync {
    fn has_scan(&self, key: &str) -> StoreResult<bool>;

    /// `true` the first time `key` is recorded, `false` on every repeat.
    fn record_scan(&self, key: &str) -> StoreResult<bool>;
}
