//! ep-replay — drive the expected-path engine from files.
//!
//! ```text
//! ep-replay replay --config data/engine.toml --scans data/scans.jsonl
//! ep-replay solve  --config data/engine.toml                 # JSON lines on stdin/stdout
//! ep-replay solve  --config data/engine.toml --listen 127.0.0.1:7400
//! ```
//!
//! `replay` reads newline-delimited scan records, applies them in batches and
//! commits the path trees to SQLite.  With `--solver-addr` it routes through
//! a `solve --listen` process instead of solving in-process.
//!
//! Logging goes through `env_logger`; set `RUST_LOG=info` (or `debug`) to see
//! per-batch (or per-event) decisions.

use std::fs::File;
use std::io::{self, BufReader};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use ep_core::EngineConfig;
use ep_dispatch::{BatchReport, DispatchObserver, DispatchOutcome, Dispatcher, read_jsonl};
use ep_manager::{GraphManager, ScanEvent};
use ep_network::{NetworkGraph, load_network_csv};
use ep_solver::{LineTransport, PathSolver, RpcSolver, ScheduleSolver, serve_lines};
use ep_store::SqliteStore;

// ── Command line ──────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "ep-replay", version, about = "Expected-path reconciliation engine")]
struct Cli {
    #[command(subcommand)]
    op: Op,
}

#[derive(Subcommand)]
enum Op {
    /// Apply a JSON-lines scan file to the path store.
    Replay(ReplayArgs),
    /// Serve solver requests as JSON lines.
    Solve(SolveArgs),
}

/// Configuration file plus the overrides shared by every subcommand.
#[derive(Args)]
struct ConfigArgs {
    /// TOML engine configuration.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides `centers_csv`.
    #[arg(long)]
    centers: Option<PathBuf>,
    /// Overrides `connections_csv`.
    #[arg(long)]
    connections: Option<PathBuf>,
    /// Disable the hop-count fallback search.
    #[arg(long)]
    no_hop_fallback: bool,
}

#[derive(Args)]
struct ReplayArgs {
    #[command(flatten)]
    config: ConfigArgs,
    /// Newline-delimited scan records.
    #[arg(long)]
    scans: PathBuf,
    /// Overrides `database`.
    #[arg(long)]
    db: Option<PathBuf>,
    /// Address of a `solve --listen` process.
    #[arg(long)]
    solver_addr: Option<String>,
    /// Overrides `num_threads`.
    #[arg(long)]
    threads: Option<usize>,
    /// Apply repeated scans again instead of dropping them.
    #[arg(long)]
    no_dedupe: bool,
    /// Reject scheduled arrivals after the promise date.
    #[arg(long)]
    promise_cutoff: bool,
    /// Events per batch.
    #[arg(long, default_value_t = 10_000)]
    batch_size: usize,
}

#[derive(Args)]
struct SolveArgs {
    #[command(flatten)]
    config: ConfigArgs,
    /// Listen on this address instead of stdin/stdout.
    #[arg(long)]
    listen: Option<String>,
}

impl ConfigArgs {
    fn load(&self) -> Result<EngineConfig> {
        let mut cfg = match &self.config {
            Some(path) => EngineConfig::from_path(path)?,
            None => EngineConfig::default(),
        };
        if let Some(p) = &self.centers {
            cfg.centers_csv = p.clone();
        }
        if let Some(p) = &self.connections {
            cfg.connections_csv = p.clone();
        }
        if self.no_hop_fallback {
            cfg.hop_fallback = false;
        }
        Ok(cfg)
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.op {
        Op::Replay(args) => replay(args),
        Op::Solve(args) => solve(args),
    }
}

fn load_network(cfg: &EngineConfig) -> Result<Arc<NetworkGraph>> {
    let t = Instant::now();
    let net = load_network_csv(&cfg.centers_csv, &cfg.connections_csv).with_context(|| {
        format!("loading {} and {}", cfg.centers_csv.display(), cfg.connections_csv.display())
    })?;
    log::info!(
        "network: {} centers, {} connections ({} routable) in {:.1?}",
        net.center_count(),
        net.connection_count(),
        net.edge_count(),
        t.elapsed()
    );
    Ok(Arc::new(net))
}

// ── replay ────────────────────────────────────────────────────────────────────

fn replay(args: ReplayArgs) -> Result<()> {
    let mut cfg = args.config.load()?;
    if let Some(db) = &args.db {
        cfg.database = db.clone();
    }
    if args.threads.is_some() {
        cfg.num_threads = args.threads;
    }
    if args.no_dedupe {
        cfg.dedupe_scans = false;
    }
    if args.promise_cutoff {
        cfg.promise_cutoff = true;
    }

    if let Some(n) = cfg.num_threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .context("configuring the worker pool")?;
    }

    let net = load_network(&cfg)?;
    let store = Arc::new(
        SqliteStore::open(&cfg.database).with_context(|| format!("opening {}", cfg.database.display()))?,
    );

    match &args.solver_addr {
        Some(addr) => {
            let stream = TcpStream::connect(addr).with_context(|| format!("connecting to solver at {addr}"))?;
            log::info!("solving through {addr}");
            let solver = RpcSolver::new(LineTransport::new(stream), net.clone()).with_hop_fallback(cfg.hop_fallback);
            run_replay(solver, store, net, &cfg, &args)
        }
        None => {
            let solver = ScheduleSolver::new(net.clone()).with_hop_fallback(cfg.hop_fallback);
            run_replay(solver, store, net, &cfg, &args)
        }
    }
}

fn run_replay<S: PathSolver>(
    solver: S,
    store: Arc<SqliteStore>,
    net: Arc<NetworkGraph>,
    cfg: &EngineConfig,
    args: &ReplayArgs,
) -> Result<()> {
    let manager = GraphManager::new(solver, store.clone(), net).promise_cutoff(cfg.promise_cutoff);
    let mut dispatcher = Dispatcher::new(manager);
    if cfg.dedupe_scans {
        dispatcher = dispatcher.with_ledger(store.clone());
    }

    let file = File::open(&args.scans).with_context(|| format!("opening {}", args.scans.display()))?;
    let mut progress = Progress::default();
    let mut undecodable = 0usize;
    let mut batch = Vec::with_capacity(args.batch_size.max(1));
    let t = Instant::now();

    for item in read_jsonl(BufReader::new(file)) {
        match item {
            Ok(event) => batch.push(event),
            Err(ep_dispatch::DispatchError::Io(e)) => return Err(e).context("reading scans"),
            Err(e) => {
                log::warn!("{e}");
                undecodable += 1;
            }
        }
        if batch.len() >= args.batch_size.max(1) {
            let report = dispatcher.dispatch_batch(std::mem::take(&mut batch), &mut progress);
            progress.absorb(report);
        }
    }
    if !batch.is_empty() {
        let report = dispatcher.dispatch_batch(batch, &mut progress);
        progress.absorb(report);
    }
    store.checkpoint()?;

    log::info!(
        "replayed {} events in {:.1?}: {} processed, {} duplicates, {} skipped, {} deferred, {} undecodable, {} rows written",
        progress.events,
        t.elapsed(),
        progress.processed,
        progress.duplicates,
        progress.skipped,
        progress.deferred.len(),
        undecodable,
        progress.written
    );
    for event in &progress.deferred {
        log::error!("deferred: {}", event.scan_key());
    }
    Ok(())
}

/// Running totals across batches.
#[derive(Default)]
struct Progress {
    events:     usize,
    processed:  usize,
    duplicates: usize,
    skipped:    usize,
    written:    usize,
    deferred:   Vec<ScanEvent>,
}

impl Progress {
    fn absorb(&mut self, report: BatchReport) {
        self.processed += report.processed;
        self.duplicates += report.duplicates;
        self.skipped += report.skipped;
        self.written += report.written;
        self.deferred.extend(report.deferred);
    }
}

impl DispatchObserver for Progress {
    fn on_event(&mut self, _index: usize, _event: &ScanEvent, _outcome: &DispatchOutcome) {
        self.events += 1;
        if self.events % 100_000 == 0 {
            log::info!("{} events dispatched", self.events);
        }
    }
}

// ── solve ─────────────────────────────────────────────────────────────────────

fn solve(args: SolveArgs) -> Result<()> {
    let cfg = args.config.load()?;
    let net = load_network(&cfg)?;
    let solver = ScheduleSolver::new(net).with_hop_fallback(cfg.hop_fallback);

    let Some(addr) = &args.listen else {
        let served = serve_lines(&solver, io::stdin().lock(), io::stdout().lock())?;
        log::info!("served {served} requests");
        return Ok(());
    };

    let listener = TcpListener::bind(addr).with_context(|| format!("binding {addr}"))?;
    log::info!("solver listening on {addr}");
    std::thread::scope(|s| {
        for stream in listener.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    log::warn!("accept failed: {e}");
                    continue;
                }
            };
            let solver = &solver;
            s.spawn(move || {
                let peer = stream.peer_addr().map_or_else(|_| "?".to_owned(), |a| a.to_string());
                let read_half = match stream.try_clone() {
                    Ok(read_half) => read_half,
                    Err(e) => {
                        log::warn!("{peer}: {e}");
                        return;
                    }
                };
                match serve_lines(solver, BufReader::new(read_half), &stream) {
                    Ok(n) => log::info!("{peer}: served {n} requests"),
                    Err(e) => log::warn!("{peer}: {e}"),
                }
            });
        }
    });
    Ok(())
}
