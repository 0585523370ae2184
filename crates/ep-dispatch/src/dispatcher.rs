//! The dispatcher: locks, de-duplication and batch grouping around
//! [`GraphManager::parse_path`].

use std::collections::BTreeMap;
use std::sync::Arc;

use ep_manager::{Disposition, GraphManager, ManagerError, ParseOutcome, ScanEvent};
use ep_solver::PathSolver;
use ep_store::{PathGraphStore, ScanLedger};

use crate::{DispatchObserver, WaybillLocks};

// ── DispatchOutcome ───────────────────────────────────────────────────────────

/// What happened to one event.
#[derive(Debug)]
pub enum DispatchOutcome {
    Processed(ParseOutcome),
    /// Seen before; not applied again.
    Duplicate,
    /// Failed in a way retrying cannot fix; acknowledged.
    Skipped(ManagerError),
    /// Failed transiently; leave for redelivery.
    Deferred(ManagerError),
}

impl DispatchOutcome {
    pub fn is_processed(&self) -> bool {
        matches!(self, DispatchOutcome::Processed(_))
    }

    fn from_error(e: ManagerError) -> DispatchOutcome {
        match e.disposition() {
            Disposition::Skip => DispatchOutcome::Skipped(e),
            Disposition::Redeliver => DispatchOutcome::Deferred(e),
        }
    }
}

// ── BatchReport ───────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct BatchReport {
    pub processed:  usize,
    pub duplicates: usize,
    pub skipped:    usize,
    /// Rows committed across the batch.
    pub written:    usize,
    /// Events to hand back for redelivery, in input order.
    pub deferred:   Vec<ScanEvent>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.processed + self.duplicates + self.skipped + self.deferred.len()
    }
}

// ── Dispatcher ────────────────────────────────────────────────────────────────

/// Serialises events per waybill and hands them to a [`GraphManager`].
///
/// # Example
///
/// ```rust,ignore
/// let dispatcher = Dispatcher::new(manager).with_ledger(store.clone());
/// let report = dispatcher.dispatch_batch(events, &mut NoopObserver);
/// println!("{} processed, {} deferred", report.processed, report.deferred.len());
/// ```
pub struct Dispatcher<S: PathSolver, St: PathGraphStore> {
    manager: GraphManager<S, St>,
    ledger:  Option<Arc<dyn ScanLedger>>,
    locks:   WaybillLocks,
}

impl<S: PathSolver, St: PathGraphStore> Dispatcher<S, St> {
    /// A dispatcher without de-duplication.
    pub fn new(manager: GraphManager<S, St>) -> Self {
        Dispatcher { manager, ledger: None, locks: WaybillLocks::default() }
    }

    /// Drop events whose scan key `ledger` has recorded before.
    pub fn with_ledger(mut self, ledger: Arc<dyn ScanLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn with_stripes(mut self, stripes: usize) -> Self {
        self.locks = WaybillLocks::new(stripes);
        self
    }

    pub fn manager(&self) -> &GraphManager<S, St> {
        &self.manager
    }

    /// Apply one event, holding its waybill's lock throughout.
    ///
    /// The scan key is recorded only after the event is committed or
    /// skipped, so a deferred or interrupted event is processed again when
    /// it is redelivered.
    pub fn dispatch(&self, event: &ScanEvent) -> DispatchOutcome {
        let _guard = self.locks.lock(&event.waybill);

        let key = event.scan_key();
        if let Some(ledger) = &self.ledger {
            match ledger.has_scan(&key) {
                Ok(false) => {}
                Ok(true) => {
                    log::debug!("{}: duplicate scan {key}", event.waybill);
                    return DispatchOutcome::Duplicate;
                }
                Err(e) => {
                    log::error!("{}: scan ledger unavailable: {e}", event.waybill);
                    return DispatchOutcome::Deferred(e.into());
                }
            }
        }

        let outcome = match self.manager.parse_path(event) {
            Ok(outcome) => {
                log::debug!("{}: {outcome:?}", event.waybill);
                DispatchOutcome::Processed(outcome)
            }
            Err(e) => DispatchOutcome::from_error(e),
        };
        match &outcome {
            DispatchOutcome::Deferred(e) => {
                log::error!("{}: scan left for redelivery: {e}", event.waybill);
                return outcome;
            }
            DispatchOutcome::Skipped(e) => log::warn!("{}: skipped scan: {e}", event.waybill),
            DispatchOutcome::Processed(_) | DispatchOutcome::Duplicate => {}
        }
        if let Some(ledger) = &self.ledger {
            if let Err(e) = ledger.record_scan(&key) {
                log::warn!("{}: could not record scan key {key}: {e}", event.waybill);
            }
        }
        outcome
    }

    /// Apply a batch.
    ///
    /// Events are grouped by waybill; each group runs in input order, groups
    /// in waybill order (concurrently with the `parallel` feature).  The
    /// observer then sees every event in input order.
    pub fn dispatch_batch(
        &self,
        events: Vec<ScanEvent>,
        observer: &mut dyn DispatchObserver,
    ) -> BatchReport {
        let groups = group_by_waybill(&events);

        #[cfg(not(feature = "parallel"))]
        let results: Vec<Vec<(usize, DispatchOutcome)>> = groups
            .iter()
            .map(|group| group.iter().map(|&i| (i, self.dispatch(&events[i]))).collect())
            .collect();

        #[cfg(feature = "parallel")]
        let results: Vec<Vec<(usize, DispatchOutcome)>> = {
            use rayon::prelude::*;

            groups
                .par_iter()
                .map(|group| group.iter().map(|&i| (i, self.dispatch(&events[i]))).collect())
                .collect()
        };

        let mut outcomes: Vec<Option<DispatchOutcome>> = events.iter().map(|_| None).collect();
        for (i, outcome) in results.into_iter().flatten() {
            outcomes[i] = Some(outcome);
        }

        let mut report = BatchReport::default();
        for (i, (event, outcome)) in events.into_iter().zip(outcomes).enumerate() {
            let Some(outcome) = outcome else { continue };
            observer.on_event(i, &event, &outcome);
            match outcome {
                DispatchOutcome::Processed(p) => {
                    report.processed += 1;
                    report.written += p.written();
                }
                DispatchOutcome::Duplicate => report.duplicates += 1,
                DispatchOutcome::Skipped(_) => report.skipped += 1,
                DispatchOutcome::Deferred(_) => report.deferred.push(event),
            }
        }
        observer.on_batch_end(&report);
        log::info!(
            "batch: {} processed, {} duplicates, {} skipped, {} deferred, {} rows written",
            report.processed,
            report.duplicates,
            report.skipped,
            report.deferred.len(),
            report.written
        );
        report
    }
}

/// Input positions per waybill, groups ordered by waybill.
fn group_by_waybill(events: &[ScanEvent]) -> Vec<Vec<usize>> {
    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, e) in events.iter().enumerate() {
        groups.entry(e.waybill.as_str()).or_default().push(i);
    }
    groups.into_values().collect()
}
