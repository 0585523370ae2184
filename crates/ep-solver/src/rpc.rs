//! Solver RPC boundary.
//!
//! # Wire format
//!
//! One JSON object per line in each direction.
//!
//! ```text
//! → {"mode":0,"src":"A","dst":"C","start_epoch":1709280000,"promise_epoch":0}
//! ← {"path":[{"source":"A","destination":"B","connection":1,
//!             "departure_from_source":1709283600,
//!             "arrival_at_source":1709280000,"cost_reaching_source":0}, ...]}
//! ```
//!
//! `mode` 0 is the schedule search, 1 the hop search.  `promise_epoch` 0
//! means no deadline.  `arrival_at_source` and `cost_reaching_source`
//! describe when the shipment reaches the entry's `source`, so the arrival at
//! the final destination is not on the wire: the client derives it from the
//! last connection's duration.  No path is an empty `path` with no `error`;
//! `error` is reserved for bad requests.

use std::io::{BufRead, BufReader, Read, Write};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use ep_core::Timestamp;
use ep_network::NetworkGraph;

use crate::{
    PathRecord, PathSolver, Route, ScheduleSolver, SearchMode, SolverError, SolverResult,
};

// ── Messages ──────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverRequest {
    pub mode:          u8,
    pub src:           String,
    pub dst:           String,
    pub start_epoch:   i64,
    #[serde(default)]
    pub promise_epoch: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathEntry {
    pub source:                String,
    pub destination:           String,
    pub connection:            Option<u32>,
    pub departure_from_source: i64,
    pub arrival_at_source:     i64,
    pub cost_reaching_source:  i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverResponse {
    #[serde(default)]
    pub path:  Vec<PathEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SolverResponse {
    fn failed(msg: impl Into<String>) -> Self {
        SolverResponse { path: Vec::new(), error: Some(msg.into()) }
    }
}

/// Encode records as wire entries.
pub fn to_entries(records: &[PathRecord], start: Timestamp) -> Vec<PathEntry> {
    let mut reached = (start, 0i64);
    records
        .iter()
        .map(|r| {
            let entry = PathEntry {
                source: r.origin.clone(),
                destination: r.destination.clone(),
                connection: r.connection,
                departure_from_source: r.departure.0,
                arrival_at_source: reached.0.0,
                cost_reaching_source: reached.1,
            };
            reached = (r.arrival, r.cost);
            entry
        })
        .collect()
}

/// Decode wire entries, taking connection durations from `network`.
///
/// A connection the network does not know is taken to have zero duration.
pub fn from_entries(entries: &[PathEntry], network: &NetworkGraph, start: Timestamp) -> Vec<PathRecord> {
    entries
        .iter()
        .map(|e| {
            let departure = Timestamp(e.departure_from_source);
            let duration = e
                .connection
                .and_then(|i| network.connection(i))
                .map_or(0, |c| c.duration as i64);
            let arrival = departure.plus_secs(duration);
            PathRecord {
                origin: e.source.clone(),
                destination: e.destination.clone(),
                connection: e.connection,
                departure,
                arrival,
                cost: arrival.secs_since(start),
            }
        })
        .collect()
}

// ── Server side ───────────────────────────────────────────────────────────────

/// Answer one request.  Never fails: errors travel in the response.
pub fn respond(solver: &ScheduleSolver, request: &SolverRequest) -> SolverResponse {
    let start = Timestamp(request.start_epoch);
    let deadline = (request.promise_epoch != 0).then_some(Timestamp(request.promise_epoch));
    let result = match SearchMode::from_code(request.mode) {
        Some(SearchMode::Schedule) => solver.scheduled(&request.src, &request.dst, start, deadline),
        Some(SearchMode::Hops) => solver.hop_scheduled(&request.src, &request.dst, start),
        None => return SolverResponse::failed(format!("unknown mode {}", request.mode)),
    };
    match result {
        Ok(Some(records)) => SolverResponse { path: to_entries(&records, start), error: None },
        Ok(None) => SolverResponse::default(),
        Err(e) => SolverResponse::failed(e.to_string()),
    }
}

/// Serve newline-delimited requests from `input` until EOF.
///
/// Blank lines are ignored; an unreadable line gets an error response.
/// Returns the number of responses written.
pub fn serve_lines<R: BufRead, W: Write>(
    solver: &ScheduleSolver,
    input: R,
    mut output: W,
) -> SolverResult<usize> {
    let mut served = 0;
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<SolverRequest>(&line) {
            Ok(request) => respond(solver, &request),
            Err(e) => SolverResponse::failed(format!("bad request: {e}")),
        };
        serde_json::to_writer(&mut output, &response)?;
        output.write_all(b"\n")?;
        output.flush()?;
        served += 1;
    }
    Ok(served)
}

// ── Client side ───────────────────────────────────────────────────────────────

/// Carries one request to a solver and brings back its response.
pub trait RpcTransport: Send + Sync {
    fn call(&self, request: &SolverRequest) -> SolverResult<SolverResponse>;
}

/// In-process transport, answering with [`respond`].
pub struct LocalTransport(pub ScheduleSolver);

impl RpcTransport for LocalTransport {
    fn call(&self, request: &SolverRequest) -> SolverResult<SolverResponse> {
        Ok(respond(&self.0, request))
    }
}

/// JSON-lines transport over a bidirectional stream such as a `TcpStream`.
///
/// Calls are serialised on the stream.
pub struct LineTransport<S: Read + Write> {
    stream: Mutex<BufReader<S>>,
}

impl<S: Read + Write> LineTransport<S> {
    pub fn new(stream: S) -> Self {
        LineTransport { stream: Mutex::new(BufReader::new(stream)) }
    }
}

impl<S: Read + Write + Send> RpcTransport for LineTransport<S> {
    fn call(&self, request: &SolverRequest) -> SolverResult<SolverResponse> {
        let mut stream = self
            .stream
            .lock()
            .map_err(|_| SolverError::Rpc("transport lock poisoned".into()))?;
        let mut line = serde_json::to_string(request)?;
        line.push('\n');
        stream.get_mut().write_all(line.as_bytes())?;
        stream.get_mut().flush()?;

        line.clear();
        if stream.read_line(&mut line)? == 0 {
            return Err(SolverError::Rpc("solver closed the connection".into()));
        }
        Ok(serde_json::from_str(&line)?)
    }
}

/// [`PathSolver`] backed by a remote solver.
///
/// Codes are validated, and connection durations resolved, against the
/// client's own copy of the network.
pub struct RpcSolver<T: RpcTransport> {
    transport:    T,
    network:      Arc<NetworkGraph>,
    hop_fallback: bool,
}

impl<T: RpcTransport> RpcSolver<T> {
    pub fn new(transport: T, network: Arc<NetworkGraph>) -> Self {
        RpcSolver { transport, network, hop_fallback: true }
    }

    pub fn with_hop_fallback(mut self, enabled: bool) -> Self {
        self.hop_fallback = enabled;
        self
    }

    fn check(&self, code: &str) -> SolverResult<()> {
        match self.network.center_id(code) {
            Some(_) => Ok(()),
            None => Err(SolverError::InvalidVertex(code.to_owned())),
        }
    }

    fn call(
        &self,
        mode: SearchMode,
        source: &str,
        target: &str,
        start: Timestamp,
        deadline: Option<Timestamp>,
    ) -> SolverResult<Vec<PathRecord>> {
        let request = SolverRequest {
            mode: mode.code(),
            src: source.to_owned(),
            dst: target.to_owned(),
            start_epoch: start.0,
            promise_epoch: deadline.map_or(0, |d| d.0),
        };
        let response = self.transport.call(&request)?;
        if let Some(error) = response.error {
            return Err(SolverError::Rpc(error));
        }
        Ok(from_entries(&response.path, &self.network, start))
    }
}

impl<T: RpcTransport> PathSolver for RpcSolver<T> {
    fn route(
        &self,
        source: &str,
        target: &str,
        start: Timestamp,
        deadline: Option<Timestamp>,
    ) -> SolverResult<Route> {
        self.check(source)?;
        self.check(target)?;
        let records = self.call(SearchMode::Schedule, source, target, start, deadline)?;
        if !records.is_empty() {
            return Ok(Route { mode: SearchMode::Schedule, records });
        }
        if self.hop_fallback {
            let records = self.call(SearchMode::Hops, source, target, start, None)?;
            if !records.is_empty() {
                return Ok(Route { mode: SearchMode::Hops, records });
            }
        }
        Err(SolverError::NoPath { from: source.to_owned(), to: target.to_owned() })
    }

    fn hops(&self, source: &str, target: &str) -> SolverResult<Vec<String>> {
        self.check(source)?;
        self.check(target)?;
        let records = self.call(SearchMode::Hops, source, target, Timestamp(0), None)?;
        let mut codes: Vec<String> = records.iter().map(|r| r.origin.clone()).collect();
        if let Some(last) = records.last().filter(|r| !r.is_stationary()) {
            codes.push(last.destination.clone());
        }
        Ok(codes)
    }
}
