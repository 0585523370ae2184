//! Unit tests for ep-solver.

#[cfg(test)]
mod fixture {
    use std::sync::Arc;

    use ep_core::{TimeOfDay, Timestamp, TransportMode};
    use ep_network::{Connection, NetworkBuilder, NetworkGraph};

    /// ```text
    /// A ─1 (09:00, 1h)──▶ B ─2 (12:00, 1h)──▶ C ─4 (structural, 30m)──▶ D
    /// A ─5 (15:00, 10m)─▶ B
    /// A ─3 (09:00, 10h)──────────────────────▶ C
    /// E (isolated)
    /// ```
    pub fn network() -> Arc<NetworkGraph> {
        let mut b = NetworkBuilder::new();
        for code in ["A", "B", "C", "D", "E"] {
            b.add_center(code, code, true).unwrap();
        }
        let id = |b: &NetworkBuilder, code| b.center_id(code).unwrap();
        let legs = [
            (1, "A", "B", Some((9, 0)), 3_600),
            (2, "B", "C", Some((12, 0)), 3_600),
            (3, "A", "C", Some((9, 0)), 36_000),
            (4, "C", "D", None, 1_800),
            (5, "A", "B", Some((15, 0)), 600),
        ];
        for (index, from, to, dep, duration) in legs {
            let conn = Connection {
                index,
                name: format!("{from}-{to}"),
                origin: id(&b, from),
                destination: id(&b, to),
                departure: dep.and_then(|(h, m)| TimeOfDay::from_hms(h, m, 0)),
                duration,
                mode: TransportMode::Surface,
                active: true,
            };
            b.add_connection(conn).unwrap();
        }
        Arc::new(b.build())
    }

    pub fn at(hms: &str) -> Timestamp {
        Timestamp::parse_iso(&format!("2024-03-01T{hms}")).unwrap()
    }
}

#[cfg(test)]
mod schedule {
    use super::fixture::{at, network};
    use crate::{PathSolver, ScheduleSolver, SearchMode, SolverError, schedule_search};

    #[test]
    fn two_leg_path_waits_for_departures() {
        let solver = ScheduleSolver::new(network());
        let route = solver.route("A", "C", at("08:00:00"), None).unwrap();
        assert_eq!(route.mode, SearchMode::Schedule);
        let r = &route.records;
        assert_eq!(r.len(), 2);

        assert_eq!((r[0].origin.as_str(), r[0].destination.as_str()), ("A", "B"));
        assert_eq!(r[0].connection, Some(1));
        assert_eq!(r[0].departure, at("09:00:00"));
        assert_eq!(r[0].arrival, at("10:00:00"));
        assert_eq!(r[0].cost, 7_200);

        assert_eq!(r[1].connection, Some(2));
        assert_eq!(r[1].departure, at("12:00:00"));
        assert_eq!(r[1].arrival, at("13:00:00"));
        assert_eq!(r[1].cost, 18_000);
    }

    #[test]
    fn earliest_arrival_beats_fewer_hops() {
        // Direct connection 3 arrives 19:00; via B arrives 13:00.
        let solver = ScheduleSolver::new(network());
        let route = solver.route("A", "C", at("08:00:00"), None).unwrap();
        assert!(route.records.iter().all(|r| r.connection != Some(3)));
    }

    #[test]
    fn missed_departure_wraps_to_next_day() {
        let solver = ScheduleSolver::new(network());
        let route = solver.route("A", "B", at("15:30:00"), None).unwrap();
        let r = &route.records[0];
        assert_eq!(r.connection, Some(1));
        assert_eq!(r.departure.to_iso(), "2024-03-02T09:00:00");
        assert_eq!(r.arrival.to_iso(), "2024-03-02T10:00:00");
    }

    #[test]
    fn source_is_stationary_record() {
        let solver = ScheduleSolver::new(network());
        let route = solver.route("B", "B", at("08:00:00"), None).unwrap();
        assert!(route.records.len() == 1 && route.records[0].is_stationary());
        let r = &route.records[0];
        assert_eq!((r.origin.as_str(), r.destination.as_str()), ("B", "B"));
        assert_eq!(r.cost, 0);
        assert_eq!(r.departure, at("08:00:00"));
        assert_eq!(r.arrival, at("08:00:00"));
    }

    #[test]
    fn all_targets_map_omits_unreachable() {
        let solver = ScheduleSolver::new(network());
        let paths = solver.shortest_paths("A", at("08:00:00"), None).unwrap();
        assert!(paths.contains_key("A"));
        assert!(paths.contains_key("B"));
        assert!(paths.contains_key("C"));
        // D needs a structural connection; E is isolated.
        assert!(!paths.contains_key("D"));
        assert!(!paths.contains_key("E"));
        assert_eq!(paths["A"][0].cost, 0);
    }

    #[test]
    fn reported_cost_matches_rewalked_legs() {
        let net = network();
        let start = at("07:15:00");
        let state = schedule_search(&net, net.center_id("A").unwrap(), start, None);
        for code in ["B", "C"] {
            let target = net.center_id(code).unwrap();
            let edges = state.edges_to(&net, target).unwrap();
            let mut t = start;
            for e in edges {
                let conn = net.edge_connection(e);
                let wait = ep_core::wait_until(t.time_of_day(), conn.departure.unwrap());
                t = t.plus_secs(wait as i64 + conn.duration as i64);
            }
            assert_eq!(t.secs_since(start) as u64, state.cost_to(target).unwrap());
            let records = state.records_to(&net, target).unwrap();
            assert_eq!(records.last().unwrap().arrival, t);
        }
    }

    #[test]
    fn deadline_leaves_late_centers_unreached() {
        let solver = ScheduleSolver::new(network()).with_hop_fallback(false);
        let deadline = Some(at("12:30:00"));
        assert!(solver.route("A", "B", at("08:00:00"), deadline).is_ok());
        let err = solver.route("A", "C", at("08:00:00"), deadline).unwrap_err();
        assert!(matches!(err, SolverError::NoPath { .. }));
    }

    #[test]
    fn unknown_code_is_invalid_vertex() {
        let solver = ScheduleSolver::new(network());
        let err = solver.route("A", "Z", at("08:00:00"), None).unwrap_err();
        assert!(matches!(err, SolverError::InvalidVertex(code) if code == "Z"));
        assert!(solver.shortest_paths("Q", at("08:00:00"), None).is_err());
    }

    #[test]
    fn concurrent_searches_share_one_solver() {
        let solver = ScheduleSolver::new(network());
        let expected = solver.route("A", "C", at("08:00:00"), None).unwrap();
        std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let solver = &solver;
                    s.spawn(move || {
                        // Interleave different searches on the same solver.
                        let _ = solver.route("B", "C", at("11:00:00"), None);
                        (i, solver.route("A", "C", at("08:00:00"), None).unwrap())
                    })
                })
                .collect();
            for h in handles {
                let (_, route) = h.join().unwrap();
                assert_eq!(route, expected);
            }
        });
    }
}

#[cfg(test)]
mod hops {
    use super::fixture::{at, network};
    use crate::{PathSolver, ScheduleSolver, SearchMode, SolverError, hop_route, hop_search};

    #[test]
    fn fewest_hops_ignores_schedule() {
        let solver = ScheduleSolver::new(network());
        assert_eq!(solver.hops("A", "C").unwrap(), vec!["A", "C"]);
        assert_eq!(solver.hops("A", "D").unwrap(), vec!["A", "C", "D"]);
        assert_eq!(solver.hops("A", "A").unwrap(), vec!["A"]);
    }

    #[test]
    fn unreachable_is_empty() {
        let solver = ScheduleSolver::new(network());
        assert!(solver.hops("A", "E").unwrap().is_empty());
        assert!(solver.hops("D", "A").unwrap().is_empty());
    }

    #[test]
    fn falls_back_when_no_scheduled_path() {
        let solver = ScheduleSolver::new(network());
        let route = solver.route("A", "D", at("08:00:00"), None).unwrap();
        assert_eq!(route.mode, SearchMode::Hops);
        let r = &route.records;
        assert_eq!(r.len(), 2);
        assert_eq!(r[0].connection, Some(3));
        assert_eq!(r[0].arrival, at("19:00:00"));
        // Structural connection leaves on arrival.
        assert_eq!(r[1].connection, Some(4));
        assert_eq!(r[1].departure, at("19:00:00"));
        assert_eq!(r[1].arrival, at("19:30:00"));
        assert_eq!(r[1].cost, r[1].arrival.secs_since(at("08:00:00")));
    }

    #[test]
    fn no_fallback_means_no_path() {
        let solver = ScheduleSolver::new(network()).with_hop_fallback(false);
        let err = solver.route("A", "D", at("08:00:00"), None).unwrap_err();
        assert!(matches!(err, SolverError::NoPath { .. }));
        let err = ScheduleSolver::new(network()).route("A", "E", at("08:00:00"), None).unwrap_err();
        assert!(matches!(err, SolverError::NoPath { .. }));
    }

    #[test]
    fn hop_route_takes_earliest_arriving_parallel_connection() {
        let net = network();
        let hops = hop_search(&net, net.center_id("A").unwrap(), net.center_id("B").unwrap()).unwrap();
        let early = hop_route(&net, &hops, at("08:00:00")).unwrap();
        assert_eq!(early[0].connection, Some(1));
        // After 09:00, connection 1 means waiting a day; 5 arrives 15:10.
        let late = hop_route(&net, &hops, at("09:30:00")).unwrap();
        assert_eq!(late[0].connection, Some(5));
        assert_eq!(late[0].arrival, at("15:10:00"));
    }

    #[test]
    fn hop_route_rejects_unconnected_pair() {
        let net = network();
        let (a, e) = (net.center_id("A").unwrap(), net.center_id("E").unwrap());
        assert!(hop_route(&net, &[a, e], at("08:00:00")).is_none());
        assert!(hop_route(&net, &[], at("08:00:00")).is_none());
    }
}

#[cfg(test)]
mod rpc {
    use std::io::{Cursor, Read, Write};

    use super::fixture::{at, network};
    use crate::{
        LineTransport, LocalTransport, PathSolver, RpcSolver, ScheduleSolver, SearchMode,
        SolverError, SolverRequest, SolverResponse, respond, serve_lines,
    };

    fn request(mode: u8, src: &str, dst: &str) -> SolverRequest {
        SolverRequest {
            mode,
            src: src.into(),
            dst: dst.into(),
            start_epoch: at("08:00:00").0,
            promise_epoch: 0,
        }
    }

    #[test]
    fn entries_describe_reaching_each_source() {
        let solver = ScheduleSolver::new(network());
        let resp = respond(&solver, &request(0, "A", "C"));
        assert!(resp.error.is_none());
        let p = &resp.path;
        assert_eq!(p.len(), 2);
        assert_eq!(p[0].source, "A");
        assert_eq!(p[0].arrival_at_source, at("08:00:00").0);
        assert_eq!(p[0].cost_reaching_source, 0);
        assert_eq!(p[0].departure_from_source, at("09:00:00").0);
        assert_eq!(p[1].source, "B");
        assert_eq!(p[1].arrival_at_source, at("10:00:00").0);
        assert_eq!(p[1].cost_reaching_source, 7_200);
        assert_eq!(p[1].departure_from_source, at("12:00:00").0);
    }

    #[test]
    fn mode_zero_has_no_fallback() {
        let solver = ScheduleSolver::new(network());
        let resp = respond(&solver, &request(0, "A", "D"));
        assert_eq!(resp, SolverResponse::default());
        let resp = respond(&solver, &request(1, "A", "D"));
        assert_eq!(resp.path.len(), 2);
    }

    #[test]
    fn promise_epoch_is_a_deadline() {
        let solver = ScheduleSolver::new(network());
        let mut req = request(0, "A", "C");
        req.promise_epoch = at("12:30:00").0;
        assert!(respond(&solver, &req).path.is_empty());
    }

    #[test]
    fn bad_requests_carry_errors() {
        let solver = ScheduleSolver::new(network());
        assert!(respond(&solver, &request(7, "A", "C")).error.is_some());
        assert!(respond(&solver, &request(0, "A", "Z")).error.is_some());
    }

    #[test]
    fn rpc_solver_matches_in_process_solver() {
        let net = network();
        let local = ScheduleSolver::new(net.clone());
        let remote = RpcSolver::new(LocalTransport(local.clone()), net);
        for (src, dst) in [("A", "C"), ("A", "B"), ("B", "B"), ("A", "D")] {
            let a = local.route(src, dst, at("08:00:00"), None).unwrap();
            let b = remote.route(src, dst, at("08:00:00"), None).unwrap();
            assert_eq!(a, b, "{src} -> {dst}");
        }
        assert_eq!(remote.hops("A", "D").unwrap(), vec!["A", "C", "D"]);
        assert_eq!(remote.route("A", "D", at("08:00:00"), None).unwrap().mode, SearchMode::Hops);
    }

    #[test]
    fn rpc_solver_validates_codes_locally() {
        let net = network();
        let remote = RpcSolver::new(LocalTransport(ScheduleSolver::new(net.clone())), net);
        let err = remote.route("Z", "A", at("08:00:00"), None).unwrap_err();
        assert!(matches!(err, SolverError::InvalidVertex(_)));
        let err = remote.route("A", "E", at("08:00:00"), None).unwrap_err();
        assert!(matches!(err, SolverError::NoPath { .. }));
    }

    #[test]
    fn serve_lines_answers_each_request() {
        let solver = ScheduleSolver::new(network());
        let input = format!(
            "{}\n\n{}\nnot json\n",
            serde_json::to_string(&request(0, "A", "C")).unwrap(),
            serde_json::to_string(&request(1, "A", "D")).unwrap(),
        );
        let mut out = Vec::new();
        let served = serve_lines(&solver, Cursor::new(input), &mut out).unwrap();
        assert_eq!(served, 3);
        let lines: Vec<SolverResponse> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines[0].path.len(), 2);
        assert_eq!(lines[1].path.len(), 2);
        assert!(lines[2].error.as_deref().unwrap().starts_with("bad request"));
    }

    /// Replays canned responses and records what was written.
    struct Loopback {
        input:  Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl Read for Loopback {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for Loopback {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.output.write(buf)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn line_transport_round_trip() {
        let solver = ScheduleSolver::new(network());
        let canned = respond(&solver, &request(0, "A", "C"));
        let mut bytes = serde_json::to_vec(&canned).unwrap();
        bytes.push(b'\n');
        let transport = LineTransport::new(Loopback { input: Cursor::new(bytes), output: Vec::new() });
        let remote = RpcSolver::new(transport, solver.network().clone());
        let route = remote.route("A", "C", at("08:00:00"), None).unwrap();
        assert_eq!(route, solver.route("A", "C", at("08:00:00"), None).unwrap());

        // Stream is exhausted: next call reports a closed connection.
        let err = remote.route("A", "B", at("08:00:00"), None).unwrap_err();
        assert!(matches!(err, SolverError::Rpc(_)));
    }
}
