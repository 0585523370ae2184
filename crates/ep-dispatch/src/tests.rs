//! Unit tests for ep-dispatch.

#[cfg(test)]
mod fixture {
    use std::sync::Arc;

    use ep_core::{TimeOfDay, Timestamp, TransportMode};
    use ep_manager::{GraphManager, ScanEvent};
    use ep_network::{Connection, NetworkBuilder, NetworkGraph};
    use ep_solver::ScheduleSolver;
    use ep_store::{MemoryStore, PathGraphStore, ScanLedger};

    use crate::Dispatcher;

    pub type TestDispatcher = Dispatcher<ScheduleSolver, MemoryStore>;

    /// A ─1 (09:00, 1h)─▶ B ─2 (12:00, 1h)─▶ C;  E isolated.
    pub fn network() -> Arc<NetworkGraph> {
        let mut b = NetworkBuilder::new();
        for code in ["A", "B", "C", "E"] {
            b.add_center(code, code, true).unwrap();
        }
        for (index, from, to, hour) in [(1, "A", "B", 9), (2, "B", "C", 12)] {
            b.add_connection(Connection {
                index,
                name: format!("{from}-{to}"),
                origin: b.center_id(from).unwrap(),
                destination: b.center_id(to).unwrap(),
                departure: TimeOfDay::from_hms(hour, 0, 0),
                duration: 3_600,
                mode: TransportMode::Surface,
                active: true,
            })
            .unwrap();
        }
        Arc::new(b.build())
    }

    /// A dispatcher writing to `store`, de-duplicating through `ledger`.
    pub fn dispatcher_over<St: PathGraphStore>(
        store: Arc<St>,
        ledger: Option<Arc<dyn ScanLedger>>,
    ) -> Dispatcher<ScheduleSolver, St> {
        let net = network();
        let manager = GraphManager::new(ScheduleSolver::new(net.clone()), store, net);
        let d = Dispatcher::new(manager).with_stripes(8);
        match ledger {
            Some(ledger) => d.with_ledger(ledger),
            None => d,
        }
    }

    pub fn dispatcher(dedupe: bool) -> (TestDispatcher, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let ledger = dedupe.then(|| store.clone() as Arc<dyn ScanLedger>);
        (dispatcher_over(store.clone(), ledger), store)
    }

    pub fn scan(waybill: &str, location: &str, destination: &str, hms: &str) -> ScanEvent {
        let t = Timestamp::parse_iso(&format!("2024-03-01T{hms}")).unwrap();
        ScanEvent::new(waybill, location, destination, t)
    }
}

#[cfg(test)]
mod dispatch {
    use ep_manager::{ManagerError, ParseOutcome};

    use super::fixture::{dispatcher, scan};
    use crate::DispatchOutcome;

    #[test]
    fn repeated_scan_is_a_duplicate() {
        let (d, store) = dispatcher(true);
        let event = scan("WB", "A", "C", "08:00:00");
        assert!(matches!(d.dispatch(&event), DispatchOutcome::Processed(ParseOutcome::Created { .. })));
        assert!(matches!(d.dispatch(&event), DispatchOutcome::Duplicate));
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn without_ledger_replays_are_reapplied() {
        let (d, store) = dispatcher(false);
        let event = scan("WB", "A", "C", "08:00:00");
        d.dispatch(&event);
        assert!(matches!(d.dispatch(&event), DispatchOutcome::Processed(ParseOutcome::Updated { .. })));
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn unknown_center_is_skipped_and_stays_recorded() {
        let (d, _) = dispatcher(true);
        let event = scan("WB", "Z", "C", "08:00:00");
        assert!(matches!(d.dispatch(&event), DispatchOutcome::Skipped(ManagerError::UnknownVertex(_))));
        assert!(matches!(d.dispatch(&event), DispatchOutcome::Duplicate));
    }

    #[test]
    fn deferred_scan_is_released_for_redelivery() {
        let (d, store) = dispatcher(true);
        let event = scan("WB", "A", "E", "08:00:00");
        assert!(matches!(d.dispatch(&event), DispatchOutcome::Deferred(_)));
        assert!(matches!(d.dispatch(&event), DispatchOutcome::Deferred(_)));
        assert!(store.is_empty());
    }
}

#[cfg(test)]
mod interrupted {
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use ep_core::NodeId;
    use ep_manager::ParseOutcome;
    use ep_store::{MemoryStore, NodeFilter, NodePatch, PathGraphStore, PathNode, ScanLedger, StoreResult};

    use super::fixture::{dispatcher_over, scan};
    use crate::DispatchOutcome;

    /// A memory store whose first commit dies mid-call.
    #[derive(Default)]
    struct CrashOnce {
        inner:   MemoryStore,
        crashed: AtomicBool,
    }

    impl PathGraphStore for CrashOnce {
        fn next_id(&self) -> StoreResult<NodeId> {
            self.inner.next_id()
        }

        fn find_many(&self, filter: &NodeFilter) -> StoreResult<Vec<PathNode>> {
            self.inner.find_many(filter)
        }

        fn save_all(&self, nodes: &[PathNode]) -> StoreResult<()> {
            if !self.crashed.swap(true, Ordering::SeqCst) {
                panic!("store went away during commit");
            }
            self.inner.save_all(nodes)
        }

        fn update_many(&self, filter: &NodeFilter, patch: &NodePatch) -> StoreResult<usize> {
            self.inner.update_many(filter, patch)
        }
    }

    #[test]
    fn scan_lost_mid_commit_is_applied_on_redelivery() {
        let store = Arc::new(CrashOnce::default());
        let ledger = Arc::new(MemoryStore::new());
        let d = dispatcher_over(store.clone(), Some(ledger.clone() as Arc<dyn ScanLedger>));
        let event = scan("WB", "A", "C", "08:00:00");

        assert!(catch_unwind(AssertUnwindSafe(|| d.dispatch(&event))).is_err());
        assert!(store.inner.is_empty());
        assert!(!ledger.has_scan(&event.scan_key()).unwrap());

        assert!(matches!(d.dispatch(&event), DispatchOutcome::Processed(ParseOutcome::Created { .. })));
        assert_eq!(store.inner.len(), 4);
        assert!(matches!(d.dispatch(&event), DispatchOutcome::Duplicate));
    }
}

#[cfg(test)]
mod concurrent {
    use ep_store::{NodeFilter, NodeState, PathGraphStore};

    use super::fixture::{dispatcher, scan};

    #[test]
    fn one_waybill_from_many_threads_builds_one_tree() {
        let (d, store) = dispatcher(false);
        let create = scan("WB", "A", "C", "08:00:00");

        std::thread::scope(|s| {
            for t in 0..8 {
                let (d, create) = (&d, &create);
                s.spawn(move || {
                    for _ in 0..25 {
                        d.dispatch(create);
                        d.dispatch(&scan(&format!("WB-{t}"), "A", "C", "08:00:00"));
                    }
                });
            }
        });

        let nodes = store.find_many(&NodeFilter::waybill("WB")).unwrap();
        assert_eq!(nodes.len(), 4);
        assert_eq!(nodes.iter().filter(|n| n.parent.is_none()).count(), 1);
        assert_eq!(nodes.iter().filter(|n| n.state == NodeState::Active).count(), 1);
        assert_eq!(nodes.iter().filter(|n| n.is_destination).count(), 1);
        for t in 0..8 {
            assert_eq!(store.count(&NodeFilter::waybill(&format!("WB-{t}"))).unwrap(), 4);
        }
        assert_eq!(store.len(), 4 * 9);
    }
}

#[cfg(test)]
mod batch {
    use ep_manager::ScanEvent;

    use super::fixture::{dispatcher, scan};
    use crate::{BatchReport, DispatchObserver, DispatchOutcome, NoopObserver};

    #[derive(Default)]
    struct Recorder {
        seen:  Vec<(usize, &'static str)>,
        total: Option<usize>,
    }

    impl DispatchObserver for Recorder {
        fn on_event(&mut self, index: usize, _event: &ScanEvent, outcome: &DispatchOutcome) {
            let kind = match outcome {
                DispatchOutcome::Processed(_) => "processed",
                DispatchOutcome::Duplicate => "duplicate",
                DispatchOutcome::Skipped(_) => "skipped",
                DispatchOutcome::Deferred(_) => "deferred",
            };
            self.seen.push((index, kind));
        }

        fn on_batch_end(&mut self, report: &BatchReport) {
            self.total = Some(report.total());
        }
    }

    fn mixed() -> Vec<ScanEvent> {
        vec![
            scan("WB2", "A", "C", "08:00:00"),
            scan("WB1", "A", "C", "08:00:00"),
            scan("WB1", "A", "C", "09:00:00").outbound(1),
            scan("WB2", "Z", "C", "08:30:00"),
            scan("WB1", "A", "C", "08:00:00"),
            scan("WB3", "A", "E", "08:00:00"),
            scan("WB1", "B", "C", "09:58:00").inbound(),
        ]
    }

    #[test]
    fn observer_sees_input_order() {
        let (d, _) = dispatcher(true);
        let mut rec = Recorder::default();
        let report = d.dispatch_batch(mixed(), &mut rec);
        assert_eq!(
            rec.seen,
            vec![
                (0, "processed"),
                (1, "processed"),
                (2, "processed"),
                (3, "skipped"),
                (4, "duplicate"),
                (5, "deferred"),
                (6, "processed"),
            ]
        );
        assert_eq!(rec.total, Some(7));
        assert_eq!(report.processed, 4);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.deferred.len(), 1);
        assert_eq!(report.deferred[0].waybill, "WB3");
    }

    #[test]
    fn waybill_order_is_kept_within_a_group() {
        let (d, store) = dispatcher(true);
        d.dispatch_batch(mixed(), &mut NoopObserver);

        use ep_store::{NodeFilter, NodeState, PathGraphStore};
        let active = store
            .find_one(&NodeFilter::waybill("WB1").state(NodeState::Active))
            .unwrap()
            .unwrap();
        assert_eq!(active.vertex.as_deref(), Some("B"));
        assert!(active.actual_arrival.is_some());
        assert_eq!(store.count(&NodeFilter::waybill("WB1").state(NodeState::Failed)).unwrap(), 0);
    }

    #[test]
    fn written_rows_are_counted() {
        let (d, _) = dispatcher(false);
        let report = d.dispatch_batch(vec![scan("WB", "A", "C", "08:00:00")], &mut NoopObserver);
        assert_eq!(report.written, 4);
    }

    #[test]
    fn empty_batch() {
        let (d, _) = dispatcher(true);
        let mut rec = Recorder::default();
        let report = d.dispatch_batch(Vec::new(), &mut rec);
        assert_eq!(report.total(), 0);
        assert_eq!(rec.total, Some(0));
    }
}

#[cfg(test)]
mod jsonl {
    use crate::{DispatchError, read_jsonl};

    #[test]
    fn malformed_lines_do_not_stop_decoding() {
        let input = concat!(
            r#"{"waybill":"WB1","location":"A","destination":"C","scan_datetime":"2024-03-01T08:00:00"}"#,
            "\n\n",
            "{not json}\n",
            r#"{"waybill":"WB2","location":"A","scan_datetime":"2024-03-01T08:00:00"}"#,
            "\n",
            r#"{"waybill":"WB3","location":"B","destination":"C","action":"<L","scan_datetime":"2024-03-01T10:00:00"}"#,
            "\n",
        );
        let out: Vec<_> = read_jsonl(input.as_bytes()).collect();
        assert_eq!(out.len(), 4);
        assert_eq!(out[0].as_ref().unwrap().waybill, "WB1");
        assert!(matches!(out[1], Err(DispatchError::Line { line: 3, .. })));
        assert!(matches!(out[2], Err(DispatchError::Line { line: 4, .. })));
        assert_eq!(out[3].as_ref().unwrap().waybill, "WB3");
    }
}

#[cfg(test)]
mod locks {
    use crate::WaybillLocks;

    #[test]
    fn stripe_is_stable_and_in_range() {
        let locks = WaybillLocks::new(16);
        assert_eq!(locks.len(), 16);
        let s = locks.stripe("WB-123");
        assert!(s < 16);
        assert_eq!(locks.stripe("WB-123"), s);
    }

    #[test]
    fn zero_stripes_means_one() {
        let locks = WaybillLocks::new(0);
        assert_eq!(locks.len(), 1);
        assert_eq!(locks.stripe("anything"), 0);
    }

    #[test]
    fn lock_is_released_on_drop() {
        let locks = WaybillLocks::new(4);
        drop(locks.lock("WB"));
        let _again = locks.lock("WB");
    }
}
