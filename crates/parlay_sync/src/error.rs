//! Synchronizer errors: a thin union of the boundaries it touches.

use parlay_chain::ChainError;
use parlay_rewards::RewardError;
use parlay_store::StoreError;
use thiserror::Error;

/// Errors from a synchronizer tick.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Ledger read failed.
    #[error(transparent)]
    Chain(#[from] ChainError),

    /// Store write failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Reward bookkeeping failed.
    #[error(transparent)]
    Reward(#[from] RewardError),
}

impl SyncError {
    /// Transient errors abort the tick without advancing the watermark;
    /// the next scheduled tick retries the same range.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Chain(e) if e.is_transient())
    }
}

/// Result type for synchronizer operations.
pub type SyncResult<T> = Result<T, SyncError>;
