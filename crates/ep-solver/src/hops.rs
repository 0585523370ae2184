//! Hop-minimal search.
//!
//! Breadth-first over every routable edge, scheduled or structural.  Used
//! when the schedule search finds nothing, e.g. because the only way onward
//! is a connection whose departure time is not known yet.

use std::collections::VecDeque;

use ep_core::{CenterId, Timestamp, wait_until};
use ep_network::NetworkGraph;

use crate::PathRecord;

/// Centers on a fewest-hop path from `source` to `target`, both included.
///
/// `None` if `target` is unreachable.  Ties resolve by CSR edge order.
pub fn hop_search(network: &NetworkGraph, source: CenterId, target: CenterId) -> Option<Vec<CenterId>> {
    if source == target {
        return Some(vec![source]);
    }
    let n = network.center_count();
    let mut prev: Vec<Option<CenterId>> = vec![None; n];
    let mut seen = vec![false; n];
    seen[source.index()] = true;

    let mut queue = VecDeque::from([source]);
    while let Some(center) = queue.pop_front() {
        for edge in network.out_edges(center) {
            let next = network.edge_to[edge.index()];
            if seen[next.index()] {
                continue;
            }
            seen[next.index()] = true;
            prev[next.index()] = Some(center);
            if next == target {
                let mut path = vec![target];
                let mut cur = target;
                while let Some(p) = prev[cur.index()] {
                    path.push(p);
                    cur = p;
                }
                path.reverse();
                return Some(path);
            }
            queue.push_back(next);
        }
    }
    None
}

/// Time a hop list, starting at `start`.
///
/// For each consecutive pair the connection arriving earliest from the
/// current instant is taken; a structural connection leaves immediately.
/// `None` if some pair has no routable connection.
pub fn hop_route(network: &NetworkGraph, hops: &[CenterId], start: Timestamp) -> Option<Vec<PathRecord>> {
    match hops {
        [] => return None,
        [only] => return Some(vec![PathRecord::stationary(network.code(*only), start)]),
        _ => {}
    }

    let mut now = start;
    let mut records = Vec::with_capacity(hops.len() - 1);
    for pair in hops.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        let (conn, arrival) = network
            .edges_between(from, to)
            .map(|e| {
                let conn = network.edge_connection(e);
                let wait = conn.departure.map_or(0, |d| wait_until(now.time_of_day(), d));
                (conn, now.plus_secs(wait as i64 + conn.duration as i64))
            })
            .min_by_key(|&(_, arrival)| arrival)?;
        records.push(PathRecord {
            origin: network.code(from).to_owned(),
            destination: network.code(to).to_owned(),
            connection: Some(conn.index),
            departure: arrival.plus_secs(-(conn.duration as i64)),
            arrival,
            cost: arrival.secs_since(start),
        });
        now = arrival;
    }
    Some(records)
}
