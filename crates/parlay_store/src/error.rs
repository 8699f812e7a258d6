//! # Store Error Types

use parlay_types::bet::BetStatus;
use thiserror::Error;

/// Errors that can occur at the store boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Insert hit an existing row with the same natural key.
    ///
    /// Handlers rely on this for idempotency: on replay the duplicate is
    /// treated as success, not failure.
    #[error("duplicate {entity} key: {key}")]
    DuplicateKey {
        /// Entity kind (round, bet, referral, ...).
        entity: &'static str,
        /// The natural key that collided.
        key: String,
    },

    /// Update targeted a row that does not exist.
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Entity kind.
        entity: &'static str,
        /// The key that was looked up.
        key: String,
    },

    /// Bet status update violated the transition table.
    #[error("illegal bet status transition: {from:?} -> {to:?}")]
    IllegalTransition {
        /// Status currently stored.
        from: BetStatus,
        /// Status the caller asked for.
        to: BetStatus,
    },
}

impl StoreError {
    /// Duplicate-key errors are success-equivalent for idempotent inserts.
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
