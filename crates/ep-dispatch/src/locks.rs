//! Striped per-waybill locks.

use std::hash::{Hash, Hasher};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[cfg(feature = "fx-hash")]
type StripeHasher = rustc_hash::FxHasher;
#[cfg(not(feature = "fx-hash"))]
type StripeHasher = std::collections::hash_map::DefaultHasher;

/// A fixed set of mutexes; a waybill always maps to the same one.
///
/// Two waybills may share a stripe and then wait on each other, which costs
/// throughput but never correctness.  The mutexes guard no data, so a
/// poisoned stripe is simply taken over.
pub struct WaybillLocks {
    stripes: Vec<Mutex<()>>,
}

impl WaybillLocks {
    pub const DEFAULT_STRIPES: usize = 256;

    pub fn new(stripes: usize) -> Self {
        WaybillLocks { stripes: (0..stripes.max(1)).map(|_| Mutex::new(())).collect() }
    }

    pub fn len(&self) -> usize {
        self.stripes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stripes.is_empty()
    }

    pub fn stripe(&self, waybill: &str) -> usize {
        let mut h = StripeHasher::default();
        waybill.hash(&mut h);
        (h.finish() % self.stripes.len() as u64) as usize
    }

    /// Block until `waybill`'s stripe is free.
    pub fn lock(&self, waybill: &str) -> MutexGuard<'_, ()> {
        self.stripes[self.stripe(waybill)].lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for WaybillLocks {
    fn default() -> Self {
        Self::new(Self::DEFAULT_STRIPES)
    }
}
