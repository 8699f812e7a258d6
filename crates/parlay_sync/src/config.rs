//! Synchronizer configuration.

use alloy_primitives::Address;

/// Polling and contract parameters.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Game-core contract (rounds, randomness, settlement events).
    pub game_core: Address,
    /// Betting-core contract (bets, claims, sweeps).
    pub betting_core: Address,
    /// Maximum blocks scanned per tick. Caps per-tick work and respects
    /// node-side `eth_getLogs` limits; catch-up after an outage happens
    /// across multiple ticks.
    pub max_block_range: u64,
    /// Seconds between ticks (consumed by the runner loop).
    pub poll_interval_secs: u64,
    /// First block to scan on a fresh store. `None` starts at the current
    /// head, skipping history.
    pub start_block: Option<u64>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            game_core: Address::ZERO,
            betting_core: Address::ZERO,
            max_block_range: 2_000,
            poll_interval_secs: 10,
            start_block: None,
        }
    }
}
