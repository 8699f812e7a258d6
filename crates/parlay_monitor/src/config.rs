//! Orchestrator timing parameters.
//!
//! Round duration and the inter-round delay mirror contract-side constants;
//! operators must keep them in line with the deployed revision.

/// Lifecycle timing configuration.
#[derive(Clone, Debug)]
pub struct MonitorConfig {
    /// Seconds between orchestration ticks (consumed by the runner loop).
    pub poll_interval_secs: u64,
    /// Length of a round's betting window.
    pub round_duration_secs: u64,
    /// Cooldown between a round's settlement and the next round's start.
    /// Global, protocol-wide; not per bettor.
    pub next_round_delay_secs: u64,
    /// How long winners have to claim after settlement.
    pub claim_deadline_secs: u64,
    /// Extra slack after the claim deadline before sweeping.
    pub sweep_grace_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
            round_duration_secs: 3 * 60 * 60,
            next_round_delay_secs: 20 * 60,
            claim_deadline_secs: 24 * 60 * 60,
            sweep_grace_secs: 6 * 60 * 60,
        }
    }
}
