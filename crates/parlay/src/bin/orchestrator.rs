//! # PARLAY Orchestrator Daemon
//!
//! Headless process that keeps the protocol moving: one thread polls
//! ledger logs into the store, one drives the round lifecycle. Both loops
//! are crash-only; any tick may fail and the next one retries from
//! durable state.
//!
//! ```bash
//! # Run against the config in the working directory
//! ./parlay_orchestrator parlay.toml
//!
//! # Run in background
//! nohup ./parlay_orchestrator parlay.toml > orchestrator.log 2>&1 &
//! ```

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parlay::{AppConfig, Runtime};
use parlay_types::UnixTime;
use tracing_subscriber::EnvFilter;

/// How often the sync loop reports its counters.
const STATS_INTERVAL: Duration = Duration::from_secs(60);

fn unix_now() -> UnixTime {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "parlay.toml".to_string());
    let config = match AppConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: cannot load {config_path}: {e}");
            std::process::exit(1);
        }
    };

    println!("═══════════════════════════════════════════════════════");
    println!("              PARLAY ORCHESTRATOR v0.1.0");
    println!("═══════════════════════════════════════════════════════");
    println!();
    println!("  Config:       {config_path}");
    println!("  Node mode:    {}", config.node.mode);
    println!("  Game core:    {}", config.contracts.game_core);
    println!("  Betting core: {}", config.contracts.betting_core);
    println!();

    let runtime = match Runtime::from_config(&config) {
        Ok(runtime) => Arc::new(runtime),
        Err(e) => {
            eprintln!("FATAL: cannot assemble runtime: {e}");
            std::process::exit(1);
        }
    };

    // Bootstrap before the loops start; a fresh deployment gets its season,
    // first round and seeding here. Failure is not fatal - the tick loop
    // repairs missing state - but it is loud.
    match runtime.monitor().bootstrap(unix_now()) {
        Ok(actions) => tracing::info!(?actions, "bootstrap finished"),
        Err(e) => tracing::error!(error = %e, "bootstrap failed, tick loop will retry"),
    }

    let sync_runtime = Arc::clone(&runtime);
    let sync_interval = Duration::from_secs(config.sync.poll_interval_secs);
    let sync_thread = std::thread::Builder::new()
        .name("parlay-sync".to_string())
        .spawn(move || sync_loop(&sync_runtime, sync_interval))
        .expect("failed to spawn sync thread");

    let monitor_runtime = Arc::clone(&runtime);
    let monitor_interval = Duration::from_secs(config.monitor.poll_interval_secs);
    let monitor_thread = std::thread::Builder::new()
        .name("parlay-monitor".to_string())
        .spawn(move || monitor_loop(&monitor_runtime, monitor_interval))
        .expect("failed to spawn monitor thread");

    println!("  Running. Press Ctrl+C to stop.");
    println!();

    // The loops never return; joining parks the main thread.
    let _ = sync_thread.join();
    let _ = monitor_thread.join();
}

/// Polls ledger logs into the store on a fixed cadence.
fn sync_loop(runtime: &Runtime, interval: Duration) {
    let ticker = crossbeam_channel::tick(interval);
    let stats_ticker = crossbeam_channel::tick(STATS_INTERVAL);
    let stats = runtime.sync().stats();

    loop {
        crossbeam_channel::select! {
            recv(ticker) -> _ => {
                match runtime.sync().poll_once(unix_now()) {
                    Ok(Some(report)) => tracing::debug!(
                        from = report.from_block,
                        to = report.to_block,
                        applied = report.applied,
                        "sync tick"
                    ),
                    Ok(None) => {}
                    Err(e) => tracing::warn!(error = %e, "sync tick failed, will retry"),
                }
            }
            recv(stats_ticker) -> _ => {
                tracing::info!(
                    polls = stats.polls.load(Ordering::Relaxed),
                    blocks = stats.blocks_scanned.load(Ordering::Relaxed),
                    applied = stats.events_applied.load(Ordering::Relaxed),
                    skipped = stats.events_skipped.load(Ordering::Relaxed),
                    handler_errors = stats.handler_errors.load(Ordering::Relaxed),
                    "synchronizer stats"
                );
            }
        }
    }
}

/// Drives the round lifecycle on a fixed cadence.
fn monitor_loop(runtime: &Runtime, interval: Duration) {
    let ticker = crossbeam_channel::tick(interval);

    loop {
        let _ = ticker.recv();
        match runtime.monitor().tick(unix_now()) {
            Ok(actions) if actions.is_empty() => {}
            Ok(actions) => tracing::info!(?actions, "lifecycle actions issued"),
            Err(e) => tracing::warn!(error = %e, "monitor tick failed, will retry"),
        }
    }
}
