//! # Referral and Bounty Records
//!
//! Off-chain side ledgers. Referral earnings have no on-chain record at all;
//! bounty claims and sweeps mirror ledger events one-to-one. All of them are
//! append-only and keyed by a natural id so recording is idempotent.

use alloy_primitives::{Address, TxHash, U256};
use serde::{Deserialize, Serialize};

use crate::{BetId, RoundId, UnixTime};

/// A referrer/referee relationship. A referee has at most one referrer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralLink {
    /// The referring wallet.
    pub referrer: Address,
    /// The referred wallet - unique key of the link.
    pub referee: Address,
    /// Human-shareable code the link was created from.
    pub referral_code: String,
    /// Cumulative earnings credited to the referrer from this link.
    pub total_earnings: U256,
    /// First qualifying bet placed by the referee, if any.
    pub referee_first_bet: Option<BetId>,
    /// When that first bet landed.
    pub referee_first_bet_at: Option<UnixTime>,
    /// Whether the link still accrues rewards.
    pub is_active: bool,
    /// When the link was created.
    pub created_at: UnixTime,
}

/// A single referral reward, triggered by one qualifying bet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralEarning {
    /// Reward recipient.
    pub referrer: Address,
    /// Bettor whose stake triggered the reward.
    pub referee: Address,
    /// Bet that triggered the reward.
    pub bet_id: BetId,
    /// Stake of that bet.
    pub bet_amount: U256,
    /// Credited reward, after the per-bet cap.
    pub reward_amount: U256,
    /// Whether the reward has been paid out.
    pub paid: bool,
    /// When the earning was recorded.
    pub recorded_at: UnixTime,
}

/// Mirror of a ledger-side bounty claim, keyed by `bet_id`.
///
/// The ledger computes and pays the split itself; this row only records it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BountyClaim {
    /// The settled bet whose payout was claimed.
    pub bet_id: BetId,
    /// Wallet that executed the claim.
    pub claimer: Address,
    /// Original winner of the bet.
    pub winner: Address,
    /// Share paid to the claimer.
    pub bounty_amount: U256,
    /// Share forwarded to the winner.
    pub winner_amount: U256,
    /// Claim transaction.
    pub tx_hash: TxHash,
    /// When the claim event was observed.
    pub claimed_at: UnixTime,
}

/// Mirror of a round-pool sweep, keyed by `round_id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSweep {
    /// Round whose pool was swept.
    pub round_id: RoundId,
    /// Unclaimed amount reclaimed.
    pub remaining_amount: U256,
    /// Share sent to the protocol treasury.
    pub protocol_share: U256,
    /// Share rolled into the season pool.
    pub season_share: U256,
    /// Sweep transaction.
    pub tx_hash: TxHash,
    /// When the sweep event was observed.
    pub swept_at: UnixTime,
}
