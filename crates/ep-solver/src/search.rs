//! Schedule-aware earliest-arrival search.
//!
//! # Edge weights
//!
//! A connection has no fixed cost.  Taking it from a center reached at
//! instant `t` costs the wait until its next daily departure plus its
//! duration:
//!
//! ```text
//! weight(e, t) = wait_until(tod(t), e.departure) + e.duration
//! ```
//!
//! The weight is computed when the edge is examined, from the settled
//! arrival at its origin.  Arriving later never lets you leave earlier on a
//! daily schedule (FIFO), so label-setting Dijkstra stays exact.
//!
//! Structural connections (no departure time) are skipped here; only the hop
//! search uses them.
//!
//! # Search state
//!
//! All per-search data lives in a [`SearchState`] allocated by the call, so
//! one network can serve any number of concurrent searches.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use ep_core::{CenterId, EdgeId, Timestamp, wait_until};
use ep_network::NetworkGraph;

use crate::PathRecord;

const UNREACHED: u64 = u64::MAX;

// ── SearchState ───────────────────────────────────────────────────────────────

/// Distances and predecessor edges of one completed search.
pub struct SearchState {
    pub source: CenterId,
    pub start:  Timestamp,
    /// `cost[c]` = seconds from `start` to the earliest arrival at `c`.
    cost:       Vec<u64>,
    /// `prev_edge[c]` = edge that reached `c`; `EdgeId::INVALID` if unreached
    /// or `c == source`.
    prev_edge:  Vec<EdgeId>,
}

impl SearchState {
    fn new(center_count: usize, source: CenterId, start: Timestamp) -> Self {
        let mut cost = vec![UNREACHED; center_count];
        cost[source.index()] = 0;
        SearchState { source, start, cost, prev_edge: vec![EdgeId::INVALID; center_count] }
    }

    /// Seconds from the start to the earliest arrival at `center`.
    pub fn cost_to(&self, center: CenterId) -> Option<u64> {
        self.cost.get(center.index()).copied().filter(|&c| c != UNREACHED)
    }

    pub fn is_reached(&self, center: CenterId) -> bool {
        self.cost_to(center).is_some()
    }

    /// Edges from the source to `target`, in travel order.
    pub fn edges_to(&self, network: &NetworkGraph, target: CenterId) -> Option<Vec<EdgeId>> {
        if !self.is_reached(target) {
            return None;
        }
        let mut edges = Vec::new();
        let mut cur = target;
        loop {
            let e = self.prev_edge[cur.index()];
            if e == EdgeId::INVALID {
                break;
            }
            edges.push(e);
            cur = network.edge_from[e.index()];
        }
        edges.reverse();
        Some(edges)
    }

    /// Timed records from the source to `target`.
    ///
    /// The source itself yields a single stationary record.  `None` if
    /// `target` was not reached.
    pub fn records_to(&self, network: &NetworkGraph, target: CenterId) -> Option<Vec<PathRecord>> {
        if target == self.source {
            return Some(vec![PathRecord::stationary(network.code(target), self.start)]);
        }
        let edges = self.edges_to(network, target)?;
        let records = edges
            .into_iter()
            .map(|e| {
                let conn = network.edge_connection(e);
                let to = network.edge_to[e.index()];
                let cost = self.cost[to.index()] as i64;
                let arrival = self.start.plus_secs(cost);
                PathRecord {
                    origin: network.code(network.edge_from[e.index()]).to_owned(),
                    destination: network.code(to).to_owned(),
                    connection: Some(conn.index),
                    departure: arrival.plus_secs(-(conn.duration as i64)),
                    arrival,
                    cost,
                }
            })
            .collect();
        Some(records)
    }

    /// Records for every reached center, keyed by center code.
    pub fn all_records(&self, network: &NetworkGraph) -> BTreeMap<String, Vec<PathRecord>> {
        network
            .centers()
            .filter_map(|(id, c)| self.records_to(network, id).map(|r| (c.code.clone(), r)))
            .collect()
    }
}

// ── Search ────────────────────────────────────────────────────────────────────

/// Earliest arrival at every center reachable from `source` when leaving at
/// `start`.
///
/// With a `deadline`, arrivals after it are not relaxed, so centers only
/// reachable too late stay unreached.
pub fn schedule_search(
    network: &NetworkGraph,
    source: CenterId,
    start: Timestamp,
    deadline: Option<Timestamp>,
) -> SearchState {
    let mut state = SearchState::new(network.center_count(), source, start);
    let limit = deadline.map(|d| d.secs_since(start));

    // Min-heap: (cost, center).  Secondary key CenterId keeps tie-breaking
    // deterministic.
    let mut heap: BinaryHeap<Reverse<(u64, CenterId)>> = BinaryHeap::new();
    heap.push(Reverse((0, source)));

    while let Some(Reverse((cost, center))) = heap.pop() {
        // Skip stale heap entries.
        if cost > state.cost[center.index()] {
            continue;
        }
        let now = start.plus_secs(cost as i64).time_of_day();

        for edge in network.out_edges(center) {
            let conn = network.edge_connection(edge);
            let Some(departure) = conn.departure else {
                continue;
            };
            let weight = wait_until(now, departure) as u64 + conn.duration as u64;
            let new_cost = cost.saturating_add(weight);
            if limit.is_some_and(|l| new_cost as i64 > l) {
                continue;
            }
            let neighbor = network.edge_to[edge.index()];
            if new_cost < state.cost[neighbor.index()] {
                state.cost[neighbor.index()] = new_cost;
                state.prev_edge[neighbor.index()] = edge;
                heap.push(Reverse((new_cost, neighbor)));
            }
        }
    }

    state
}
