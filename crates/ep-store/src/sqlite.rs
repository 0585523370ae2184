//! SQLite backend (feature `sqlite`).
//!
//! Two tables: `paths` holds one JSON document per node, with the columns the
//! filters query on pulled out beside it; `scans` is the scan ledger.

use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use rusqlite::types::Value;
use rusqlite::{Connection, params_from_iter};

use ep_core::{NodeId, Timestamp};

use crate::{
    NodeFilter, NodePatch, PathGraphStore, PathNode, ScanLedger, StoreError, StoreResult,
};

const SCHEMA: &str = "
    PRAGMA journal_mode = WAL;
    PRAGMA synchronous  = NORMAL;
    CREATE TABLE IF NOT EXISTS paths (
        id             INTEGER PRIMARY KEY,
        waybill        TEXT    NOT NULL,
        state          TEXT    NOT NULL,
        is_destination INTEGER NOT NULL,
        parent         INTEGER,
        document       TEXT    NOT NULL
    );
    CREATE INDEX IF NOT EXISTS paths_waybill_state ON paths (waybill, state);
    CREATE TABLE IF NOT EXISTS scans (
        key     TEXT    PRIMARY KEY,
        seen_at INTEGER NOT NULL
    );";

/// Path store and scan ledger in one SQLite file.
///
/// The connection sits behind a mutex; every `save_all` and `update_many` is
/// one transaction.
pub struct SqliteStore {
    conn:    Mutex<Connection>,
    next_id: AtomicU64,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and initialise the schema.
    pub fn open(path: &Path) -> StoreResult<Self> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        let max: Option<i64> = conn.query_row("SELECT MAX(id) FROM paths", [], |r| r.get(0))?;
        let next = max.map_or(1, |m| m as u64 + 1);
        log::debug!("sqlite store opened; next node id {next}");
        Ok(SqliteStore { conn: Mutex::new(conn), next_id: AtomicU64::new(next) })
    }

    /// Checkpoint the WAL into the main database file.
    pub fn checkpoint(&self) -> StoreResult<()> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}

// ── SQL helpers ───────────────────────────────────────────────────────────────

/// `WHERE` clause and its parameters for `filter`.
fn where_clause(filter: &NodeFilter) -> (String, Vec<Value>) {
    let mut terms: Vec<&str> = Vec::new();
    let mut params: Vec<Value> = Vec::new();
    if let Some(w) = &filter.waybill {
        terms.push("waybill = ?");
        params.push(Value::Text(w.clone()));
    }
    if let Some(s) = filter.state {
        terms.push("state = ?");
        params.push(Value::Text(s.as_str().to_owned()));
    }
    if let Some(d) = filter.is_destination {
        terms.push("is_destination = ?");
        params.push(Value::Integer(d as i64));
    }
    if let Some(p) = filter.parent {
        terms.push("parent = ?");
        params.push(Value::Integer(p.0 as i64));
    }
    if let Some(id) = filter.id_after {
        terms.push("id > ?");
        params.push(Value::Integer(id.0 as i64));
    }
    if terms.is_empty() {
        (String::new(), params)
    } else {
        (format!(" WHERE {}", terms.join(" AND ")), params)
    }
}

fn select(conn: &Connection, filter: &NodeFilter) -> StoreResult<Vec<PathNode>> {
    let (clause, params) = where_clause(filter);
    let mut stmt = conn.prepare_cached(&format!("SELECT document FROM paths{clause} ORDER BY id"))?;
    let docs = stmt
        .query_map(params_from_iter(params), |r| r.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    docs.iter()
        .map(|d| PathNode::from_document(&serde_json::from_str::<serde_json::Value>(d)?))
        .collect()
}

fn upsert(conn: &Connection, nodes: &[PathNode]) -> StoreResult<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT OR REPLACE INTO paths (id, waybill, state, is_destination, parent, document) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for node in nodes {
        stmt.execute(rusqlite::params![
            node.id.0 as i64,
            node.waybill,
            node.state.as_str(),
            node.is_destination as i64,
            node.parent.map(|p| p.0 as i64),
            node.to_document()?.to_string(),
        ])?;
    }
    Ok(())
}

// ── Trait impls ───────────────────────────────────────────────────────────────

impl PathGraphStore for SqliteStore {
    fn next_id(&self) -> StoreResult<NodeId> {
        Ok(NodeId(self.next_id.fetch_add(1, Ordering::Relaxed)))
    }

    fn find_many(&self, filter: &NodeFilter) -> StoreResult<Vec<PathNode>> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        select(&conn, filter)
    }

    fn count(&self, filter: &NodeFilter) -> StoreResult<usize> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let (clause, params) = where_clause(filter);
        let n: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM paths{clause}"),
            params_from_iter(params),
            |r| r.get(0),
        )?;
        Ok(n as usize)
    }

    fn save_all(&self, nodes: &[PathNode]) -> StoreResult<()> {
        if nodes.is_empty() {
            return Ok(());
        }
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let tx = conn.unchecked_transaction()?;
        upsert(&tx, nodes)?;
        tx.commit()?;
        if let Some(max) = nodes.iter().map(|n| n.id.0).max() {
            self.next_id.fetch_max(max + 1, Ordering::Relaxed);
        }
        Ok(())
    }

    fn update_many(&self, filter: &NodeFilter, patch: &NodePatch) -> StoreResult<usize> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let tx = conn.unchecked_transaction()?;
        let mut nodes = select(&tx, filter)?;
        for node in &mut nodes {
            patch.apply(node);
        }
        upsert(&tx, &nodes)?;
        tx.commit()?;
        Ok(nodes.len())
    }
}

impl ScanLedger for SqliteStore {
    fn has_scan(&self, key: &str) -> StoreResult<bool> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM scans WHERE key = ?1", [key], |r| r.get(0))?;
        Ok(n > 0)
    }

    fn record_scan(&self, key: &str) -> StoreResult<bool> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO scans (key, seen_at) VALUES (?1, ?2)",
            rusqlite::params![key, Timestamp::now().0],
        )?;
        Ok(inserted == 1)
    }
}
