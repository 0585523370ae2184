//! Search results.

use serde::{Deserialize, Serialize};

use ep_core::Timestamp;

// ── PathRecord ────────────────────────────────────────────────────────────────

/// One leg of a solved path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRecord {
    pub origin:      String,
    pub destination: String,
    /// Index of the connection taken; `None` only for the zero-length record
    /// of a path whose source is its target.
    pub connection:  Option<u32>,
    /// When the connection leaves `origin`.
    pub departure:   Timestamp,
    /// When the connection reaches `destination`.
    pub arrival:     Timestamp,
    /// Seconds from the search start to `arrival`.
    pub cost:        i64,
}

impl PathRecord {
    /// The zero-cost record standing for "already there".
    pub fn stationary(code: &str, at: Timestamp) -> PathRecord {
        PathRecord {
            origin: code.to_owned(),
            destination: code.to_owned(),
            connection: None,
            departure: at,
            arrival: at,
            cost: 0,
        }
    }

    pub fn is_stationary(&self) -> bool {
        self.connection.is_none()
    }
}

// ── Route ─────────────────────────────────────────────────────────────────────

/// Which search produced a route.  The numeric codes are the RPC `mode`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Time-minimal, respecting departure schedules.
    Schedule,
    /// Fewest connections, ignoring schedules.
    Hops,
}

impl SearchMode {
    pub fn code(self) -> u8 {
        match self {
            SearchMode::Schedule => 0,
            SearchMode::Hops => 1,
        }
    }

    pub fn from_code(code: u8) -> Option<SearchMode> {
        match code {
            0 => Some(SearchMode::Schedule),
            1 => Some(SearchMode::Hops),
            _ => None,
        }
    }
}

/// A solved path from one center to another.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    pub mode:    SearchMode,
    /// Legs in travel order.  Never empty.
    pub records: Vec<PathRecord>,
}

impl Route {
    /// Arrival at the target.
    pub fn arrival(&self) -> Option<Timestamp> {
        self.records.last().map(|r| r.arrival)
    }
}
