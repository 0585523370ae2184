//! Center/connection network and builder.
//!
//! # Data layout
//!
//! Every connection ever loaded is kept in `connections` (load order) so that
//! scans naming a retired connection still resolve by index.  The solver only
//! sees the **adjacency**: the active connections between active centers,
//! stored in **Compressed Sparse Row (CSR)** format.  Given a `CenterId c`,
//! its outgoing edges occupy
//!
//! ```text
//! edge_to[ center_out_start[c] .. center_out_start[c+1] ]
//! ```
//!
//! All edge arrays are sorted by origin center and indexed by `EdgeId`, so a
//! center's departures are a contiguous memory scan in the search loop.
//! `edge_conn` maps an edge back to its `Connection`.

use ep_core::{CenterId, EdgeId, TimeOfDay, TransportMode};

use crate::{NetworkError, NetworkResult};

#[cfg(feature = "fx-hash")]
type Map<K, V> = rustc_hash::FxHashMap<K, V>;
#[cfg(not(feature = "fx-hash"))]
type Map<K, V> = std::collections::HashMap<K, V>;

/// Strip a trailing parenthetical description from a center code.
///
/// `"CTR1 (Some Desc)"` → `"CTR1"`.  Surrounding whitespace is removed.
pub fn normalize_code(raw: &str) -> &str {
    match raw.find(" (") {
        Some(i) => raw[..i].trim(),
        None => raw.trim(),
    }
}

// ── Reference data ────────────────────────────────────────────────────────────

/// A sorting/delivery facility.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Center {
    pub code:   String,
    pub name:   String,
    pub active: bool,
}

/// A scheduled transport leg between two centers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Connection {
    /// Stable external identifier, as carried on scans.
    pub index:       u32,
    pub name:        String,
    pub origin:      CenterId,
    pub destination: CenterId,
    /// Daily departure time.  `None` for a structural connection with no
    /// known schedule: hop searches may use it, scheduled searches may not.
    pub departure:   Option<TimeOfDay>,
    /// Transit time in seconds.
    pub duration:    u32,
    pub mode:        TransportMode,
    pub active:      bool,
}

impl Connection {
    #[inline]
    pub fn is_scheduled(&self) -> bool {
        self.departure.is_some()
    }
}

// ── NetworkGraph ──────────────────────────────────────────────────────────────

/// Directed center graph in CSR format plus lookup tables.
///
/// Read-only once built; share it across threads behind an `Arc`.  Do not
/// construct directly; use [`NetworkBuilder`].
#[derive(Debug)]
pub struct NetworkGraph {
    centers:     Vec<Center>,
    connections: Vec<Connection>,

    code_lookup:  Map<String, CenterId>,
    index_lookup: Map<u32, usize>,

    // ── CSR edge adjacency ────────────────────────────────────────────────
    /// CSR row pointer.  Length = `center_count + 1`.
    center_out_start: Vec<u32>,
    /// Origin of each edge; needed to walk predecessor edges back to the source.
    pub edge_from: Vec<CenterId>,
    pub edge_to:   Vec<CenterId>,
    /// Position of the edge's connection in `connections`.
    edge_conn: Vec<u32>,
}

impl NetworkGraph {
    pub fn empty() -> Self {
        NetworkBuilder::new().build()
    }

    // ── Dimensions ────────────────────────────────────────────────────────

    pub fn center_count(&self) -> usize {
        self.centers.len()
    }

    /// Number of connections loaded, including inactive ones.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Number of edges in the routable adjacency.
    pub fn edge_count(&self) -> usize {
        self.edge_to.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    // ── Lookups ───────────────────────────────────────────────────────────

    /// Look up a center by code.  The code is normalised first.
    pub fn center_id(&self, code: &str) -> Option<CenterId> {
        self.code_lookup.get(normalize_code(code)).copied()
    }

    #[inline]
    pub fn center(&self, id: CenterId) -> &Center {
        &self.centers[id.index()]
    }

    #[inline]
    pub fn code(&self, id: CenterId) -> &str {
        &self.centers[id.index()].code
    }

    pub fn centers(&self) -> impl Iterator<Item = (CenterId, &Center)> + '_ {
        self.centers.iter().enumerate().map(|(i, c)| (CenterId(i as u32), c))
    }

    /// Resolve a connection by its external index, whether or not it is
    /// routable.
    pub fn connection(&self, index: u32) -> Option<&Connection> {
        self.index_lookup.get(&index).map(|&i| &self.connections[i])
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    // ── Traversal ─────────────────────────────────────────────────────────

    /// Outgoing routable edges of `center`, as a contiguous id range.
    #[inline]
    pub fn out_edges(&self, center: CenterId) -> impl Iterator<Item = EdgeId> + '_ {
        let start = self.center_out_start[center.index()] as usize;
        let end   = self.center_out_start[center.index() + 1] as usize;
        (start..end).map(|i| EdgeId(i as u32))
    }

    #[inline]
    pub fn out_degree(&self, center: CenterId) -> usize {
        let start = self.center_out_start[center.index()] as usize;
        let end   = self.center_out_start[center.index() + 1] as usize;
        end - start
    }

    /// The connection carried by edge `e`.
    #[inline]
    pub fn edge_connection(&self, e: EdgeId) -> &Connection {
        &self.connections[self.edge_conn[e.index()] as usize]
    }

    /// Routable edges from `from` to `to`, in CSR order.
    pub fn edges_between(&self, from: CenterId, to: CenterId) -> impl Iterator<Item = EdgeId> + '_ {
        self.out_edges(from).filter(move |e| self.edge_to[e.index()] == to)
    }
}

// ── NetworkBuilder ────────────────────────────────────────────────────────────

/// Construct a [`NetworkGraph`] incrementally, then call [`build`](Self::build).
///
/// Centers must be added before the connections that reference them.
///
/// # Example
///
/// ```
/// use ep_core::{TimeOfDay, TransportMode};
/// use ep_network::{Connection, NetworkBuilder};
///
/// let mut b = NetworkBuilder::new();
/// let a = b.add_center("A", "Alpha", true).unwrap();
/// let c = b.add_center("C", "Gamma", true).unwrap();
/// b.add_connection(Connection {
///     index: 1,
///     name: "A-C".into(),
///     origin: a,
///     destination: c,
///     departure: TimeOfDay::from_hms(9, 0, 0),
///     duration: 3_600,
///     mode: TransportMode::Surface,
///     active: true,
/// })
/// .unwrap();
/// let net = b.build();
/// assert_eq!(net.center_count(), 2);
/// assert_eq!(net.edge_count(), 1);
/// ```
pub struct NetworkBuilder {
    centers:      Vec<Center>,
    connections:  Vec<Connection>,
    code_lookup:  Map<String, CenterId>,
    index_lookup: Map<u32, usize>,
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self {
            centers:      Vec::new(),
            connections:  Vec::new(),
            code_lookup:  Map::default(),
            index_lookup: Map::default(),
        }
    }

    /// Add a center and return its `CenterId` (sequential from 0).
    pub fn add_center(&mut self, code: &str, name: &str, active: bool) -> NetworkResult<CenterId> {
        let code = normalize_code(code);
        if code.is_empty() {
            return Err(NetworkError::Parse("empty center code".into()));
        }
        if self.code_lookup.contains_key(code) {
            return Err(NetworkError::DuplicateCenter(code.to_owned()));
        }
        let id = CenterId(self.centers.len() as u32);
        self.code_lookup.insert(code.to_owned(), id);
        self.centers.push(Center { code: code.to_owned(), name: name.trim().to_owned(), active });
        Ok(id)
    }

    /// Look up a center added earlier.
    pub fn center_id(&self, code: &str) -> Option<CenterId> {
        self.code_lookup.get(normalize_code(code)).copied()
    }

    /// Add a connection.  Its endpoints must be centers of this builder.
    pub fn add_connection(&mut self, conn: Connection) -> NetworkResult<()> {
        for end in [conn.origin, conn.destination] {
            if end.index() >= self.centers.len() {
                return Err(NetworkError::UnknownCenter(end.to_string()));
            }
        }
        if self.index_lookup.contains_key(&conn.index) {
            return Err(NetworkError::DuplicateConnection(conn.index));
        }
        self.index_lookup.insert(conn.index, self.connections.len());
        self.connections.push(conn);
        Ok(())
    }

    pub fn center_count(&self) -> usize { self.centers.len() }
    pub fn connection_count(&self) -> usize { self.connections.len() }

    /// Consume the builder and produce a [`NetworkGraph`].
    ///
    /// O(E log E) for the edge sort.
    pub fn build(self) -> NetworkGraph {
        let center_count = self.centers.len();

        // Routable edges only, sorted by origin (stable, so parallel
        // connections keep load order).
        let mut routable: Vec<u32> = self
            .connections
            .iter()
            .enumerate()
            .filter(|(_, c)| {
                c.active
                    && self.centers[c.origin.index()].active
                    && self.centers[c.destination.index()].active
            })
            .map(|(i, _)| i as u32)
            .collect();
        routable.sort_by_key(|&i| self.connections[i as usize].origin.0);

        let edge_from: Vec<CenterId> =
            routable.iter().map(|&i| self.connections[i as usize].origin).collect();
        let edge_to: Vec<CenterId> =
            routable.iter().map(|&i| self.connections[i as usize].destination).collect();

        let mut center_out_start = vec![0u32; center_count + 1];
        for from in &edge_from {
            center_out_start[from.index() + 1] += 1;
        }
        for i in 1..=center_count {
            center_out_start[i] += center_out_start[i - 1];
        }
        debug_assert_eq!(center_out_start[center_count] as usize, edge_to.len());

        log::debug!(
            "network built: {} centers, {} connections, {} routable edges",
            center_count,
            self.connections.len(),
            edge_to.len()
        );

        NetworkGraph {
            centers: self.centers,
            connections: self.connections,
            code_lookup: self.code_lookup,
            index_lookup: self.index_lookup,
            center_out_start,
            edge_from,
            edge_to,
            edge_conn: routable,
        }
    }
}

impl Default for NetworkBuilder {
    fn default() -> Self {
        Self::new()
    }
}
