//! Synchronizer counters, shared with the runner for periodic reporting.

use std::sync::atomic::AtomicU64;

/// Cumulative synchronizer statistics.
#[derive(Debug, Default)]
pub struct SyncStats {
    /// Ticks executed.
    pub polls: AtomicU64,
    /// Blocks covered by processed ranges.
    pub blocks_scanned: AtomicU64,
    /// Raw logs fetched.
    pub logs_fetched: AtomicU64,
    /// Decoded events applied.
    pub events_applied: AtomicU64,
    /// Logs skipped as undecodable (foreign contracts, unknown signatures).
    pub events_skipped: AtomicU64,
    /// Handler failures (logged, never fatal for the batch).
    pub handler_errors: AtomicU64,
}
