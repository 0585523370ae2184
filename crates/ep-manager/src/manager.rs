//! The `GraphManager` state machine.
//!
//! # Node states
//!
//! | Transition            | Trigger                                              |
//! |-----------------------|------------------------------------------------------|
//! | future → active       | previous node reached (outscan on plan, or implicit) |
//! | active → reached      | outscan on the planned connection; inscan at the destination |
//! | active → failed       | destination changed, location jump, misroute, missed connection |
//! | future → inactive     | an earlier node failed (its plan is discarded)       |
//!
//! A failure never edits the failed branch back into shape: a new chain is
//! grafted beside it, so the tree keeps the full history.

use std::sync::Arc;

use ep_core::{NodeId, Timestamp};
use ep_network::{Connection, NetworkGraph};
use ep_solver::{PathRecord, PathSolver, SearchMode};
use ep_store::{FailCause, FailLocation, NodeFilter, NodeState, PathGraphStore, PathNode};

use crate::{ManagerError, ManagerResult, PathTree, ScanAction, ScanEvent};

// ── ParseOutcome ──────────────────────────────────────────────────────────────

/// What `parse_path` did with an event.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ParseOutcome {
    /// The waybill's destination was already reached; nothing changed.
    Complete,
    /// First scan of a waybill already at its destination; nothing stored.
    Dropped,
    /// A new tree was built.
    Created { active: Option<NodeId>, written: usize },
    /// An existing tree was reconciled.  `active` is `None` once the
    /// destination has been reached.
    Updated { active: Option<NodeId>, written: usize },
}

impl ParseOutcome {
    pub fn written(self) -> usize {
        match self {
            ParseOutcome::Created { written, .. } | ParseOutcome::Updated { written, .. } => written,
            ParseOutcome::Complete | ParseOutcome::Dropped => 0,
        }
    }

    pub fn active(self) -> Option<NodeId> {
        match self {
            ParseOutcome::Created { active, .. } | ParseOutcome::Updated { active, .. } => active,
            ParseOutcome::Complete | ParseOutcome::Dropped => None,
        }
    }
}

// ── GraphManager ──────────────────────────────────────────────────────────────

/// Reconciles scans against stored path trees.
///
/// `S` solves paths; `St` stores nodes.  Both are shared by every worker, so
/// `parse_path` takes `&self`.  It is **not** safe to run two events of the
/// same waybill at once; callers serialise per waybill.
pub struct GraphManager<S: PathSolver, St: PathGraphStore> {
    solver:         S,
    store:          Arc<St>,
    network:        Arc<NetworkGraph>,
    promise_cutoff: bool,
}

impl<S: PathSolver, St: PathGraphStore> GraphManager<S, St> {
    /// `network` resolves scanned connections; it should be the network the
    /// solver routes over.
    pub fn new(solver: S, store: Arc<St>, network: Arc<NetworkGraph>) -> Self {
        GraphManager { solver, store, network, promise_cutoff: false }
    }

    /// Reject scheduled paths arriving after the event's promise date.
    pub fn promise_cutoff(mut self, enabled: bool) -> Self {
        self.promise_cutoff = enabled;
        self
    }

    pub fn store(&self) -> &Arc<St> {
        &self.store
    }

    pub fn network(&self) -> &Arc<NetworkGraph> {
        &self.network
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// Reconcile one scan against the waybill's tree and commit the result.
    pub fn parse_path(&self, event: &ScanEvent) -> ManagerResult<ParseOutcome> {
        let location = self.canonical(&event.location)?;
        let destination = self.canonical(&event.destination)?;
        let connection = event.connection.and_then(|i| self.network.connection(i));
        if event.connection.is_some() && connection.is_none() {
            log::debug!("{}: connection {:?} not in network", event.waybill, event.connection);
        }

        let complete = NodeFilter::waybill(&event.waybill).state(NodeState::Reached).destination(true);
        if self.store.count(&complete)? > 0 {
            log::debug!("{}: path already complete", event.waybill);
            return Ok(ParseOutcome::Complete);
        }

        let tree = PathTree::load(&*self.store, &event.waybill)?;
        let mut pass = Pass { mgr: self, tree, event, location, destination, connection };

        let created = pass.tree.is_empty();
        let start = match pass.tree.active() {
            Some(active) => active,
            None if created => {
                if pass.location == pass.destination {
                    log::debug!("{}: first scan is at the destination; dropped", event.waybill);
                    return Ok(ParseOutcome::Dropped);
                }
                let active = pass.create()?;
                log::info!(
                    "{}: created path {} -> {} ({} nodes)",
                    event.waybill,
                    pass.location,
                    pass.destination,
                    pass.tree.len()
                );
                active
            }
            None => pass.recover_from_location()?,
        };

        let active = pass.apply(start)?;

        let nodes = pass.tree.take_dirty();
        self.store.save_all(&nodes)?;
        let written = nodes.len();
        Ok(if created {
            ParseOutcome::Created { active, written }
        } else {
            ParseOutcome::Updated { active, written }
        })
    }

    fn canonical(&self, code: &str) -> ManagerResult<String> {
        self.network
            .center_id(code)
            .map(|id| self.network.code(id).to_owned())
            .ok_or_else(|| ManagerError::UnknownVertex(code.to_owned()))
    }
}

// ── Pass: one event against one tree ──────────────────────────────────────────

/// Arrival stamps for the first node of a grafted chain.
#[derive(Copy, Clone)]
struct Seed {
    expected: Option<Timestamp>,
    actual:   Option<Timestamp>,
}

impl Seed {
    fn at(t: Timestamp) -> Seed {
        Seed { expected: Some(t), actual: Some(t) }
    }
}

struct Pass<'a, S: PathSolver, St: PathGraphStore> {
    mgr:         &'a GraphManager<S, St>,
    tree:        PathTree,
    event:       &'a ScanEvent,
    location:    String,
    destination: String,
    connection:  Option<&'a Connection>,
}

impl<S: PathSolver, St: PathGraphStore> Pass<'_, S, St> {
    fn waybill(&self) -> &str {
        &self.event.waybill
    }

    fn scan_time(&self) -> Timestamp {
        self.event.scan_time
    }

    /// Run the destination check and the action's handlers from `active`.
    fn apply(&mut self, active: NodeId) -> ManagerResult<Option<NodeId>> {
        let active = self.check_destination(active)?;
        match self.event.action {
            None => self.check_location(active).map(Some),
            Some(ScanAction::Inbound) => self.inscan(active),
            Some(ScanAction::Outbound) => {
                let active = self.check_location(active)?;
                self.outscan(active).map(Some)
            }
        }
    }

    // ── Solving and grafting ──────────────────────────────────────────────

    fn route(&self, from: &str, start: Timestamp) -> ManagerResult<Vec<PathRecord>> {
        let deadline = if self.mgr.promise_cutoff {
            self.event.pickup_date.filter(|&p| p > start)
        } else {
            None
        };
        let route = self.mgr.solver.route(from, &self.destination, start, deadline)?;
        if route.mode == SearchMode::Hops {
            log::info!("{}: no scheduled path {from} -> {}; using hop path", self.waybill(), self.destination);
        }
        Ok(route.records)
    }

    fn new_node(&self, parent: Option<NodeId>, state: NodeState) -> ManagerResult<PathNode> {
        let id = self.mgr.store.next_id()?;
        let mut node = PathNode::new(id, self.waybill(), Timestamp::now());
        node.parent = parent;
        node.state = state;
        node.promise_date = self.event.pickup_date;
        Ok(node)
    }

    /// Turn solved records into nodes under `parent` (a new root if `None`).
    ///
    /// One node per record at the record's origin, expected to leave on its
    /// connection, then a destination node.  The first node becomes active.
    /// A stationary route yields only the destination node, already active.
    fn graft(
        &mut self,
        records: &[PathRecord],
        parent: Option<NodeId>,
        seed: Seed,
    ) -> ManagerResult<NodeId> {
        let Some(last) = records.last() else {
            return Err(ManagerError::SolverUnreachable {
                from: self.location.clone(),
                to: self.destination.clone(),
            });
        };
        if self.tree.clear_destination() > 0 {
            log::warn!("{}: destination flag still set before graft; cleared", self.waybill());
        }

        let mut parent = match parent {
            Some(p) => p,
            None => {
                let root = self.new_node(None, NodeState::Reached)?;
                let id = root.id;
                self.tree.insert(root);
                id
            }
        };

        if records.len() == 1 && last.is_stationary() {
            let mut dst = self.new_node(Some(parent), NodeState::Active)?;
            dst.vertex = Some(last.destination.clone());
            dst.expected_arrival = seed.expected;
            dst.actual_arrival = seed.actual;
            dst.is_destination = true;
            let id = dst.id;
            self.tree.insert(dst);
            return Ok(id);
        }

        let mut first = None;
        for (i, r) in records.iter().enumerate() {
            let state = if i == 0 { NodeState::Active } else { NodeState::Future };
            let mut node = self.new_node(Some(parent), state)?;
            node.vertex = Some(r.origin.clone());
            node.edge = r.connection;
            node.expected_departure = Some(r.departure);
            if i == 0 {
                node.expected_arrival = seed.expected;
                node.actual_arrival = seed.actual;
            } else {
                node.expected_arrival = Some(records[i - 1].arrival);
            }
            parent = node.id;
            first.get_or_insert(node.id);
            self.tree.insert(node);
        }

        let mut dst = self.new_node(Some(parent), NodeState::Future)?;
        dst.vertex = Some(last.destination.clone());
        dst.expected_arrival = Some(last.arrival);
        dst.is_destination = true;
        self.tree.insert(dst);

        first.ok_or_else(|| ManagerError::NoActiveNode(self.waybill().to_owned()))
    }

    /// First scan of a waybill: solve from the scan location.
    fn create(&mut self) -> ManagerResult<NodeId> {
        let records = self.route(&self.location.clone(), self.scan_time())?;
        self.graft(&records, None, Seed::at(self.scan_time()))
    }

    /// A tree without a cursor: discard what is left of the plan and start
    /// again from the scan location.
    fn recover_from_location(&mut self) -> ManagerResult<NodeId> {
        let retired = self.tree.retire_futures();
        log::warn!(
            "{}: no active node in stored path; rebuilding from {} ({retired} planned nodes retired)",
            self.waybill(),
            self.location
        );
        let parent = self.tree.last_reached();
        let records = self.route(&self.location.clone(), self.scan_time())?;
        self.graft(&records, parent, Seed::at(self.scan_time()))
    }

    // ── Handlers ──────────────────────────────────────────────────────────

    /// The event names a destination other than the tree's: fail the active
    /// node and graft a path to the new destination under its parent.
    fn check_destination(&mut self, active: NodeId) -> ManagerResult<NodeId> {
        let current = self.tree.destination().and_then(|d| d.vertex.clone());
        if current.as_deref() == Some(self.destination.as_str()) {
            return Ok(active);
        }
        let node = self.tree.require(active)?.clone();
        let from = node.vertex.clone().unwrap_or_else(|| self.location.clone());
        let records = self.route(&from, self.scan_time())?;

        self.tree.deactivate(active, FailCause::DestinationChanged, None)?;
        let seed = Seed { expected: node.expected_arrival, actual: node.actual_arrival };
        let new_active = self.graft(&records, node.parent, seed)?;
        log::info!(
            "{}: destination changed {} -> {}; regrafted from {from}",
            self.waybill(),
            current.as_deref().unwrap_or("?"),
            self.destination
        );
        Ok(new_active)
    }

    /// Scanned at a center other than the active node's, with no action that
    /// explains it: close the active node with a reached copy and rebuild
    /// from the scan location.
    fn check_location(&mut self, active: NodeId) -> ManagerResult<NodeId> {
        let node = self.tree.require(active)?.clone();
        if node.vertex.as_deref() == Some(self.location.as_str()) {
            return Ok(active);
        }
        let records = self.route(&self.location.clone(), self.scan_time())?;

        self.tree.deactivate(active, FailCause::Regenerated, None)?;
        let mut copy = self.new_node(node.parent, NodeState::Reached)?;
        copy.vertex = node.vertex.clone();
        copy.expected_arrival = node.expected_arrival;
        copy.actual_arrival = node.actual_arrival;
        copy.expected_departure = node.expected_departure;
        let copy_id = copy.id;
        self.tree.insert(copy);

        let new_active = self.graft(&records, Some(copy_id), Seed::at(self.scan_time()))?;
        log::info!(
            "{}: scanned at {} while expected at {}; regenerated",
            self.waybill(),
            self.location,
            node.vertex.as_deref().unwrap_or("?")
        );
        Ok(new_active)
    }

    fn inscan(&mut self, active: NodeId) -> ManagerResult<Option<NodeId>> {
        let scan = self.scan_time();
        let node = self.tree.require(active)?.clone();

        if node.vertex.as_deref() != Some(self.location.as_str()) {
            // Arrived at the next planned center: the outscan was missed.
            let next = self
                .tree
                .future_child(active)
                .filter(|&n| self.tree.get(n).and_then(|n| n.vertex.as_deref()) == Some(self.location.as_str()));
            if let Some(next) = next {
                log::debug!("{}: inscan at next center {}; implicit departure", self.waybill(), self.location);
                self.tree.require_mut(active)?.state = NodeState::Reached;
                self.tree.require_mut(next)?.state = NodeState::Active;
                return self.inscan(next);
            }

            let records = self.route(&self.location.clone(), scan)?;
            self.tree.require_mut(active)?.actual_arrival = Some(scan);
            self.tree.deactivate(active, FailCause::Misrouted, Some(FailLocation::Center))?;
            let new_active = self.graft(&records, node.parent, Seed::at(scan))?;
            log::info!(
                "{}: misrouted to {} (expected {})",
                self.waybill(),
                self.location,
                node.vertex.as_deref().unwrap_or("?")
            );
            // Misrouted straight to the destination: the scan also delivers.
            let delivered = self
                .tree
                .get(new_active)
                .is_some_and(|n| n.is_destination && n.vertex.as_deref() == Some(self.location.as_str()));
            if delivered {
                return self.inscan(new_active);
            }
            return Ok(Some(new_active));
        }

        if node.expected_departure.is_none() && node.is_destination {
            let n = self.tree.require_mut(active)?;
            n.actual_arrival = Some(scan);
            n.state = NodeState::Reached;
            if n.expected_arrival.is_some_and(|e| scan > e) {
                n.flag(FailCause::Soft, Some(FailLocation::ConnectionIn));
            }
            log::info!("{}: reached destination {}", self.waybill(), self.location);
            return Ok(None);
        }

        if node.expected_departure.is_some_and(|d| scan > d) {
            // Too late for the planned connection onward.
            let records = self.route(&self.location.clone(), scan)?;
            self.tree.require_mut(active)?.actual_arrival = Some(scan);
            self.tree.deactivate(active, FailCause::Hard, Some(FailLocation::ConnectionIn))?;
            let seed = Seed { expected: node.expected_arrival.or(Some(scan)), actual: Some(scan) };
            let new_active = self.graft(&records, node.parent, seed)?;
            log::info!("{}: arrived {} after planned departure; replanned", self.waybill(), scan);
            return Ok(Some(new_active));
        }

        let n = self.tree.require_mut(active)?;
        n.actual_arrival = Some(scan);
        if n.expected_arrival.is_some_and(|e| scan > e) {
            n.flag(FailCause::Soft, Some(FailLocation::ConnectionIn));
            log::debug!("{}: late inscan at {}, connection still reachable", self.waybill(), self.location);
        }
        Ok(Some(active))
    }

    fn outscan(&mut self, active: NodeId) -> ManagerResult<NodeId> {
        let scan = self.scan_time();
        let conn = self.connection.ok_or_else(|| {
            ManagerError::Validation(match self.event.connection {
                Some(i) => format!("outbound scan names unknown connection {i}"),
                None => "outbound scan without a connection".to_owned(),
            })
        })?;
        let node = self.tree.require(active)?.clone();

        if node.edge == Some(conn.index) {
            let n = self.tree.require_mut(active)?;
            n.actual_departure = Some(scan);
            n.state = NodeState::Reached;
            if n.expected_departure.is_some_and(|d| scan > d) {
                n.flag(FailCause::Soft, Some(FailLocation::ConnectionOut));
            }
            return match self.tree.future_child(active) {
                Some(next) => {
                    self.tree.require_mut(next)?.state = NodeState::Active;
                    Ok(next)
                }
                None => self.recover_after_departure(active, conn),
            };
        }

        // Left on a connection other than the planned one.
        let arrived = node.actual_arrival.or(node.expected_arrival);
        let location = match (arrived, node.expected_departure) {
            (Some(a), Some(d)) if a < d => FailLocation::Center,
            _ => FailLocation::ConnectionIn,
        };
        let e_arr = node.expected_arrival.or(node.actual_arrival).unwrap_or(scan);
        let e_dep = conn.departure.map_or(e_arr, |d| e_arr.next_occurrence(d));
        let arrival = e_dep.plus_secs(conn.duration as i64);
        let conn_dest = self.mgr.network.code(conn.destination).to_owned();
        let records = if conn_dest != self.destination {
            Some(self.route(&conn_dest, arrival)?)
        } else {
            None
        };

        self.tree.deactivate(active, FailCause::Hard, Some(location))?;
        let mut taken = self.new_node(node.parent, NodeState::Reached)?;
        taken.vertex = node.vertex.clone();
        taken.edge = Some(conn.index);
        taken.expected_arrival = node.expected_arrival;
        taken.actual_arrival = node.actual_arrival;
        taken.expected_departure = Some(e_dep);
        taken.actual_departure = Some(scan);
        let taken_id = taken.id;
        self.tree.insert(taken);
        log::info!(
            "{}: left {} on connection {} instead of {:?}",
            self.waybill(),
            self.location,
            conn.index,
            node.edge
        );

        match records {
            Some(records) => {
                let seed = Seed { expected: Some(arrival), actual: None };
                self.graft(&records, Some(taken_id), seed)
            }
            None => {
                let stationary = [PathRecord::stationary(&conn_dest, arrival)];
                let seed = Seed { expected: Some(arrival), actual: None };
                self.graft(&stationary, Some(taken_id), seed)
            }
        }
    }

    /// Outscan on plan, but nothing is planned after the node: derive a
    /// fresh chain from where the connection leads.
    fn recover_after_departure(&mut self, departed: NodeId, conn: &Connection) -> ManagerResult<NodeId> {
        let retired = self.tree.retire_futures();
        let from = self.mgr.network.code(conn.destination).to_owned();
        log::warn!(
            "{}: no planned node after {}; rebuilding from {from} ({retired} planned nodes retired)",
            self.waybill(),
            self.location
        );
        let arrival = self.scan_time().plus_secs(conn.duration as i64);
        let records = self.route(&from, arrival)?;
        let seed = Seed { expected: Some(arrival), actual: None };
        self.graft(&records, Some(departed), seed)
    }
}
