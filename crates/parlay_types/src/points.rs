//! # Testnet Points
//!
//! Fixed point rewards for engagement: a small award for placing a bet and a
//! larger one for winning. Purely off-chain; feeds the leaderboard.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::{BetId, UnixTime};

/// Points awarded for placing a bet.
pub const BET_PLACED_POINTS: u32 = 1;
/// Points awarded when a bet wins.
pub const BET_WON_POINTS: u32 = 10;

/// Why points were awarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointsReason {
    /// Awarded on bet placement.
    BetPlaced,
    /// Awarded when settlement marked the bet won.
    BetWon,
}

impl PointsReason {
    /// The fixed award attached to this reason.
    #[must_use]
    pub const fn award(self) -> u32 {
        match self {
            Self::BetPlaced => BET_PLACED_POINTS,
            Self::BetWon => BET_WON_POINTS,
        }
    }
}

/// Cumulative points for one wallet.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPoints {
    /// Total points accrued.
    pub total_points: u32,
    /// Bets placed counter.
    pub bets_placed: u32,
    /// Bets won counter.
    pub bets_won: u32,
}

/// One entry of the append-only points history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsEntry {
    /// Wallet that received the points.
    pub wallet: Address,
    /// Related bet, when applicable.
    pub bet_id: Option<BetId>,
    /// Points awarded.
    pub points: u32,
    /// Why they were awarded.
    pub reason: PointsReason,
    /// When the award was recorded.
    pub awarded_at: UnixTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_awards() {
        assert_eq!(PointsReason::BetPlaced.award(), 1);
        assert_eq!(PointsReason::BetWon.award(), 10);
    }
}
