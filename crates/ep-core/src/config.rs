//! Engine configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{EpError, EpResult};

// ── EngineConfig ──────────────────────────────────────────────────────────────

/// Top-level engine configuration.
///
/// Typically loaded from a TOML file by the application crate, with CLI flags
/// layered on top.  Every field has a default, so an empty file is valid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// `centers.csv`: `code,name,active`.
    pub centers_csv: PathBuf,

    /// `connections.csv`: `index,name,origin,destination,departure,duration,mode,active`.
    pub connections_csv: PathBuf,

    /// SQLite file holding the path store and the scan ledger.
    pub database: PathBuf,

    /// Worker thread count passed to Rayon.  `None` uses all logical cores.
    pub num_threads: Option<usize>,

    /// Drop scans whose identity has already been processed.  Default: true.
    pub dedupe_scans: bool,

    /// Fall back to the hop-minimal search when no scheduled path exists.
    /// Default: true.
    pub hop_fallback: bool,

    /// Discard scheduled arrivals later than the shipment's promise date.
    /// Default: false.
    pub promise_cutoff: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            centers_csv: PathBuf::from("centers.csv"),
            connections_csv: PathBuf::from("connections.csv"),
            database: PathBuf::from("paths.db"),
            num_threads: None,
            dedupe_scans: true,
            hop_fallback: true,
            promise_cutoff: false,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> EpResult<EngineConfig> {
        toml::from_str(s).map_err(|e| EpError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.  Relative network and database paths are
    /// resolved against the file's directory.
    pub fn from_path(path: impl AsRef<Path>) -> EpResult<EngineConfig> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut config: EngineConfig = toml::from_str(&text)
            .map_err(|e| EpError::Config(format!("{}: {e}", path.display())))?;
        if let Some(dir) = path.parent() {
            for p in [&mut config.centers_csv, &mut config.connections_csv, &mut config.database] {
                if p.is_relative() {
                    *p = dir.join(&*p);
                }
            }
        }
        Ok(config)
    }
}
