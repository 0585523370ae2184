//! CSV network loader.
//!
//! # CSV format
//!
//! Two files.  Centers:
//!
//! ```csv
//! code,name,active
//! A,Alpha Hub,true
//! B,Bravo (North),true
//! ```
//!
//! Connections:
//!
//! ```csv
//! index,name,origin,destination,departure,duration,mode,active
//! 1,A-B morning,A,B,09:00:00,3600,Surface,true
//! 2,B-C noon,B,C,12:00,3600,Air,true
//! 9,A-C feeder,A,C,,7200,Local,true
//! ```
//!
//! An empty `departure` marks a structural connection (no known schedule).
//! `duration` is in seconds.  `mode` and `active` may be left empty
//! (`Local`, `true`).

use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use ep_core::{TimeOfDay, TransportMode};

use crate::{Connection, NetworkBuilder, NetworkError, NetworkGraph, NetworkResult};

// ── CSV records ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CenterRecord {
    code:   String,
    #[serde(default)]
    name:   String,
    #[serde(default)]
    active: Option<bool>,
}

#[derive(Deserialize)]
struct ConnectionRecord {
    index:       u32,
    #[serde(default)]
    name:        String,
    origin:      String,
    destination: String,
    #[serde(default)]
    departure:   String,
    duration:    u32,
    #[serde(default)]
    mode:        String,
    #[serde(default)]
    active:      Option<bool>,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Load a network from a centers CSV and a connections CSV.
pub fn load_network_csv(centers: &Path, connections: &Path) -> NetworkResult<NetworkGraph> {
    let centers_file = std::fs::File::open(centers)?;
    let connections_file = std::fs::File::open(connections)?;
    let net = load_network_readers(centers_file, connections_file)?;
    log::info!(
        "loaded network from {} and {}: {} centers, {} connections",
        centers.display(),
        connections.display(),
        net.center_count(),
        net.connection_count()
    );
    Ok(net)
}

/// Like [`load_network_csv`] but accepts any `Read` sources.
///
/// Useful for testing (pass a `std::io::Cursor` or a byte slice).
pub fn load_network_readers<C: Read, N: Read>(centers: C, connections: N) -> NetworkResult<NetworkGraph> {
    let mut builder = NetworkBuilder::new();

    // ── Centers ───────────────────────────────────────────────────────────
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(centers);
    for result in rdr.deserialize::<CenterRecord>() {
        let row = result.map_err(|e| NetworkError::Parse(e.to_string()))?;
        builder.add_center(&row.code, &row.name, row.active.unwrap_or(true))?;
    }

    // ── Connections ───────────────────────────────────────────────────────
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(connections);
    for result in rdr.deserialize::<ConnectionRecord>() {
        let row = result.map_err(|e| NetworkError::Parse(e.to_string()))?;
        let conn = connection_from_record(&builder, row)?;
        builder.add_connection(conn)?;
    }

    Ok(builder.build())
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn connection_from_record(builder: &NetworkBuilder, r: ConnectionRecord) -> NetworkResult<Connection> {
    let origin = builder
        .center_id(&r.origin)
        .ok_or_else(|| NetworkError::UnknownCenter(r.origin.clone()))?;
    let destination = builder
        .center_id(&r.destination)
        .ok_or_else(|| NetworkError::UnknownCenter(r.destination.clone()))?;
    let departure = match r.departure.as_str() {
        "" => None,
        s => Some(TimeOfDay::parse(s)?),
    };
    let mode: TransportMode = r.mode.parse()?;
    Ok(Connection {
        index: r.index,
        name: r.name,
        origin,
        destination,
        departure,
        duration: r.duration,
        mode,
        active: r.active.unwrap_or(true),
    })
}
