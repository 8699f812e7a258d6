//! # Bets
//!
//! A bet is a parlay: an ordered list of match predictions combined under a
//! single multiplier. Bets are created exactly once per `BetPlaced` event
//! and their status moves monotonically towards a terminal state.

use alloy_primitives::{Address, TxHash, U256};
use serde::{Deserialize, Serialize};

use crate::{outcome::MatchOutcome, BetId, RoundId, SeasonId, UnixTime};

/// Fixed-point scale of the parlay multiplier (1e18 = 1.0x).
pub const MULTIPLIER_SCALE: u128 = 1_000_000_000_000_000_000;

/// Lifecycle status of a bet.
///
/// Legal transitions: `Pending -> Won | Lost | Cancelled`, `Won -> Claimed`.
/// `Lost`, `Claimed` and `Cancelled` are terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetStatus {
    /// Placed, round not yet settled.
    #[default]
    Pending,
    /// All legs hit; payout claimable.
    Won,
    /// At least one leg missed.
    Lost,
    /// Payout was claimed (by the winner or a bounty claimer).
    Claimed,
    /// Bet was cancelled before settlement.
    Cancelled,
}

impl BetStatus {
    /// Returns true if no further transition is allowed.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Lost | Self::Claimed | Self::Cancelled)
    }

    /// Checks whether moving to `next` is a legal transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match self {
            Self::Pending => matches!(next, Self::Won | Self::Lost | Self::Cancelled),
            Self::Won => matches!(next, Self::Claimed),
            Self::Lost | Self::Claimed | Self::Cancelled => false,
        }
    }
}

/// One leg of a parlay: a prediction for a single match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetLeg {
    /// Index of the match inside the round, `0..MATCHES_PER_ROUND`.
    pub match_index: u8,
    /// Predicted outcome for that match.
    pub predicted: MatchOutcome,
}

/// A placed parlay bet, mirrored from the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bet {
    /// Ledger-assigned globally unique id.
    pub bet_id: BetId,
    /// Bettor wallet address.
    pub bettor: Address,
    /// Round the bet belongs to.
    pub round_id: RoundId,
    /// Season the round belongs to.
    pub season_id: SeasonId,
    /// Stake in wei.
    pub amount: U256,
    /// Promotional bonus stake in wei (counted towards the payout base).
    pub bonus: U256,
    /// Ordered predictions, one per selected match.
    pub legs: Vec<BetLeg>,
    /// Combined parlay multiplier, scaled by [`MULTIPLIER_SCALE`].
    pub parlay_multiplier: U256,
    /// Payout if every leg hits.
    pub potential_winnings: U256,
    /// Current status.
    pub status: BetStatus,
    /// Transaction that placed the bet.
    pub tx_hash: TxHash,
    /// When the bet was placed.
    pub placed_at: UnixTime,
    /// When the bet reached a settled status, if it has.
    pub settled_at: Option<UnixTime>,
}

impl Bet {
    /// Computes the payout for a fully winning parlay.
    ///
    /// `(amount + bonus) * multiplier / 1e18`, matching the contract's
    /// fixed-point convention. Saturates at `U256::MAX` on overflow; stakes
    /// anywhere near that are rejected by the ledger long before this runs.
    #[must_use]
    pub fn potential_payout(amount: U256, bonus: U256, parlay_multiplier: U256) -> U256 {
        let base = amount.saturating_add(bonus);
        base.saturating_mul(parlay_multiplier) / U256::from(MULTIPLIER_SCALE)
    }

    /// Returns true if the bet can still be re-evaluated by settlement.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self.status, BetStatus::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_terminal_states() {
        assert!(BetStatus::Lost.is_terminal());
        assert!(BetStatus::Claimed.is_terminal());
        assert!(BetStatus::Cancelled.is_terminal());
        assert!(!BetStatus::Pending.is_terminal());
        assert!(!BetStatus::Won.is_terminal());
    }

    #[test]
    fn test_status_transitions() {
        assert!(BetStatus::Pending.can_transition_to(BetStatus::Won));
        assert!(BetStatus::Pending.can_transition_to(BetStatus::Lost));
        assert!(BetStatus::Pending.can_transition_to(BetStatus::Cancelled));
        assert!(BetStatus::Won.can_transition_to(BetStatus::Claimed));

        // Terminal states never move again.
        for terminal in [BetStatus::Lost, BetStatus::Claimed, BetStatus::Cancelled] {
            for next in [
                BetStatus::Pending,
                BetStatus::Won,
                BetStatus::Lost,
                BetStatus::Claimed,
                BetStatus::Cancelled,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }

        // Claimed requires a prior Won.
        assert!(!BetStatus::Pending.can_transition_to(BetStatus::Claimed));
    }

    #[test]
    fn test_potential_payout() {
        // 100 wei stake at 2.5x -> 250 wei.
        let amount = U256::from(100u64);
        let multiplier = U256::from(MULTIPLIER_SCALE) * U256::from(25u64) / U256::from(10u64);
        assert_eq!(
            Bet::potential_payout(amount, U256::ZERO, multiplier),
            U256::from(250u64)
        );

        // Bonus counts towards the base.
        assert_eq!(
            Bet::potential_payout(amount, U256::from(50u64), multiplier),
            U256::from(375u64)
        );
    }
}
