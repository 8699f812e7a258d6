//! # Match Outcomes
//!
//! The contract encodes outcomes as `uint8`: 0 = pending, 1 = home win,
//! 2 = away win, 3 = draw. An outcome decides exactly once and never
//! reverts to pending.

use serde::{Deserialize, Serialize};

/// Result of a single match.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    /// Match not yet resolved.
    #[default]
    Pending,
    /// Home team won.
    HomeWin,
    /// Away team won.
    AwayWin,
    /// Match ended in a draw.
    Draw,
}

impl MatchOutcome {
    /// Decodes the contract's `uint8` outcome encoding.
    ///
    /// Unknown values map to `Pending` - the ledger only ever emits 0-3,
    /// so anything else is a decode artefact, not a result.
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::HomeWin,
            2 => Self::AwayWin,
            3 => Self::Draw,
            _ => Self::Pending,
        }
    }

    /// Encodes back to the contract's `uint8` representation.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::HomeWin => 1,
            Self::AwayWin => 2,
            Self::Draw => 3,
        }
    }

    /// Returns true once the match has a result.
    #[must_use]
    pub const fn is_decided(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_round_trip() {
        for v in 0..4u8 {
            assert_eq!(MatchOutcome::from_u8(v).as_u8(), v);
        }
    }

    #[test]
    fn test_unknown_value_is_pending() {
        assert_eq!(MatchOutcome::from_u8(200), MatchOutcome::Pending);
        assert!(!MatchOutcome::from_u8(200).is_decided());
    }

    #[test]
    fn test_decided() {
        assert!(MatchOutcome::Draw.is_decided());
        assert!(!MatchOutcome::Pending.is_decided());
    }
}
