//! # Chain Error Types
//!
//! The error taxonomy at the ledger boundary:
//!
//! - transient transport errors: retried by the next tick, never escalated
//! - expected-rejection reverts ("already seeded", "already settled"):
//!   success-equivalent for idempotent operations
//! - everything else: a genuine failure, logged and surfaced to the caller

use alloy_primitives::TxHash;
use thiserror::Error;

/// Errors that can occur at the ledger boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// Socket-level failure: timeout, reset, broken pipe.
    #[error("transport error: {0}")]
    Transport(String),

    /// The node returned a JSON-RPC error object.
    #[error("rpc error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// JSON-RPC error message.
        message: String,
    },

    /// Simulation or execution reverted.
    #[error("transaction reverted: {reason}")]
    Reverted {
        /// Revert reason string as reported by the node.
        reason: String,
    },

    /// The transaction was submitted but no receipt arrived in time.
    #[error("confirmation timed out for {tx_hash}")]
    ConfirmationTimeout {
        /// Hash of the pending transaction.
        tx_hash: TxHash,
    },

    /// The node's response did not match the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl ChainError {
    /// Transient errors: the next scheduled tick retries them.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Expected-rejection reverts.
    ///
    /// The ledger itself arbitrates conflicting writers; a revert saying the
    /// operation has already happened means someone (possibly an earlier tick
    /// of this process) won the race. Callers treat these as success.
    #[must_use]
    pub fn is_benign(&self) -> bool {
        match self {
            Self::Reverted { reason } => {
                let reason = reason.to_ascii_lowercase();
                reason.contains("already")
                    || reason.contains("duplicate")
                    || reason.contains("exists")
            }
            _ => false,
        }
    }
}

/// Result type for ledger operations.
pub type ChainResult<T> = Result<T, ChainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ChainError::Transport("connection reset".into()).is_transient());
        assert!(!ChainError::Reverted {
            reason: "insufficient funds".into()
        }
        .is_transient());
    }

    #[test]
    fn test_benign_reverts() {
        assert!(ChainError::Reverted {
            reason: "round already seeded".into()
        }
        .is_benign());
        assert!(ChainError::Reverted {
            reason: "Season Already Active".into()
        }
        .is_benign());
        assert!(!ChainError::Reverted {
            reason: "insufficient funds".into()
        }
        .is_benign());
        assert!(!ChainError::Transport("timeout".into()).is_benign());
    }
}
