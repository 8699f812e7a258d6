//! Orchestrator errors, tagged with the lifecycle stage that failed.

use parlay_chain::ChainError;
use parlay_store::StoreError;
use thiserror::Error;

/// The lifecycle stages the orchestrator can act on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Start a new season.
    StartSeason,
    /// Start the next round.
    StartRound,
    /// Seed a round's pools.
    SeedRound,
    /// Request random match results.
    RequestRandomness,
    /// Settle a round with its outcome vector.
    SettleRound,
    /// Sweep a round's unclaimed pool.
    SweepRound,
}

impl Stage {
    /// Stage name for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StartSeason => "start_season",
            Self::StartRound => "start_round",
            Self::SeedRound => "seed_round",
            Self::RequestRandomness => "request_randomness",
            Self::SettleRound => "settle_round",
            Self::SweepRound => "sweep_round",
        }
    }
}

/// Errors from an orchestration tick.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// A lifecycle write failed for a non-benign reason.
    #[error("stage {} failed: {source}", stage.as_str())]
    Write {
        /// Which transition was being issued.
        stage: Stage,
        /// The underlying chain failure.
        source: ChainError,
    },

    /// A ledger read failed while deriving state.
    #[error(transparent)]
    Chain(#[from] ChainError),

    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for orchestrator operations.
pub type MonitorResult<T> = Result<T, MonitorError>;
