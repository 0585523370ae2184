//! Batch observer trait for progress reporting.

use ep_manager::ScanEvent;

use crate::{BatchReport, DispatchOutcome};

/// Callbacks invoked by [`Dispatcher::dispatch_batch`][crate::Dispatcher::dispatch_batch].
///
/// Calls arrive on the calling thread, in input order, after the batch has
/// been processed, whether or not the `parallel` feature is on.  All methods
/// default to no-ops.
pub trait DispatchObserver {
    /// One call per input event; `index` is its position in the batch.
    fn on_event(&mut self, _index: usize, _event: &ScanEvent, _outcome: &DispatchOutcome) {}

    fn on_batch_end(&mut self, _report: &BatchReport) {}
}

/// A [`DispatchObserver`] that does nothing.
pub struct NoopObserver;

impl DispatchObserver for NoopObserver {}
