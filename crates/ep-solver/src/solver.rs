//! The `PathSolver` trait and the in-process `ScheduleSolver`.

use std::collections::BTreeMap;
use std::sync::Arc;

use ep_core::{CenterId, Timestamp};
use ep_network::NetworkGraph;

use crate::{
    PathRecord, Route, SearchMode, SolverError, SolverResult, hop_route, hop_search, schedule_search,
};

// ── PathSolver trait ──────────────────────────────────────────────────────────

/// Pluggable path solver.
///
/// The graph manager only ever asks for a route between two centers; whether
/// it is computed in-process ([`ScheduleSolver`]) or by a remote process
/// ([`RpcSolver`][crate::RpcSolver]) is up to the implementation.
///
/// # Thread safety
///
/// Implementations must be `Send + Sync`: one solver is shared by every
/// worker, and calls for different waybills run concurrently.
pub trait PathSolver: Send + Sync {
    /// Route from `source` to `target` leaving at `start`.
    ///
    /// Tries the schedule search first (discarding arrivals after `deadline`,
    /// if given), then the hop search if the implementation permits it.
    /// `source == target` yields one stationary record.
    ///
    /// Unknown codes are [`SolverError::InvalidVertex`]; no path in any
    /// permitted mode is [`SolverError::NoPath`].
    fn route(
        &self,
        source: &str,
        target: &str,
        start: Timestamp,
        deadline: Option<Timestamp>,
    ) -> SolverResult<Route>;

    /// Center codes on a fewest-hop path, both ends included.  Empty if
    /// `target` is unreachable.
    fn hops(&self, source: &str, target: &str) -> SolverResult<Vec<String>>;
}

// ── ScheduleSolver ────────────────────────────────────────────────────────────

/// In-process solver over a shared, read-only network.
///
/// Holds no search state; every call allocates its own.
#[derive(Clone)]
pub struct ScheduleSolver {
    network:      Arc<NetworkGraph>,
    hop_fallback: bool,
}

impl ScheduleSolver {
    pub fn new(network: Arc<NetworkGraph>) -> Self {
        ScheduleSolver { network, hop_fallback: true }
    }

    /// Allow (default) or forbid the hop search in [`PathSolver::route`].
    pub fn with_hop_fallback(mut self, enabled: bool) -> Self {
        self.hop_fallback = enabled;
        self
    }

    pub fn network(&self) -> &Arc<NetworkGraph> {
        &self.network
    }

    fn resolve(&self, code: &str) -> SolverResult<CenterId> {
        self.network
            .center_id(code)
            .ok_or_else(|| SolverError::InvalidVertex(code.to_owned()))
    }

    /// Earliest-arrival records from `source` to every reachable center,
    /// keyed by center code.  The source maps to its stationary record.
    pub fn shortest_paths(
        &self,
        source: &str,
        start: Timestamp,
        deadline: Option<Timestamp>,
    ) -> SolverResult<BTreeMap<String, Vec<PathRecord>>> {
        let src = self.resolve(source)?;
        Ok(schedule_search(&self.network, src, start, deadline).all_records(&self.network))
    }

    /// Schedule search for one target.  `Ok(None)` if unreachable.
    pub fn scheduled(
        &self,
        source: &str,
        target: &str,
        start: Timestamp,
        deadline: Option<Timestamp>,
    ) -> SolverResult<Option<Vec<PathRecord>>> {
        let (src, dst) = (self.resolve(source)?, self.resolve(target)?);
        Ok(schedule_search(&self.network, src, start, deadline).records_to(&self.network, dst))
    }

    /// Hop search for one target, timed from `start`.  `Ok(None)` if
    /// unreachable.
    pub fn hop_scheduled(
        &self,
        source: &str,
        target: &str,
        start: Timestamp,
    ) -> SolverResult<Option<Vec<PathRecord>>> {
        let (src, dst) = (self.resolve(source)?, self.resolve(target)?);
        Ok(hop_search(&self.network, src, dst).and_then(|hops| hop_route(&self.network, &hops, start)))
    }
}

impl PathSolver for ScheduleSolver {
    fn route(
        &self,
        source: &str,
        target: &str,
        start: Timestamp,
        deadline: Option<Timestamp>,
    ) -> SolverResult<Route> {
        if let Some(records) = self.scheduled(source, target, start, deadline)? {
            return Ok(Route { mode: SearchMode::Schedule, records });
        }
        if self.hop_fallback {
            if let Some(records) = self.hop_scheduled(source, target, start)? {
                log::debug!("no scheduled path {source} -> {target}; using hop path");
                return Ok(Route { mode: SearchMode::Hops, records });
            }
        }
        Err(SolverError::NoPath { from: source.to_owned(), to: target.to_owned() })
    }

    fn hops(&self, source: &str, target: &str) -> SolverResult<Vec<String>> {
        let (src, dst) = (self.resolve(source)?, self.resolve(target)?);
        Ok(hop_search(&self.network, src, dst)
            .unwrap_or_default()
            .into_iter()
            .map(|c| self.network.code(c).to_owned())
            .collect())
    }
}
