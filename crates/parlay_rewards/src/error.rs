//! Reward ledger errors.
//!
//! Non-qualifying bets are not errors; the processing functions return
//! `Ok(None)` for those. These variants cover genuine rejections and
//! storage failures.

use alloy_primitives::Address;
use parlay_store::StoreError;
use thiserror::Error;

/// Errors from reward bookkeeping.
#[derive(Error, Debug)]
pub enum RewardError {
    /// A wallet tried to refer itself.
    #[error("cannot refer yourself")]
    SelfReferral,

    /// The referee already has a referrer; links are created once.
    #[error("{referee} already has a referrer")]
    AlreadyReferred {
        /// The wallet that already holds a link.
        referee: Address,
    },

    /// Underlying store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for reward operations.
pub type RewardResult<T> = Result<T, RewardError>;
