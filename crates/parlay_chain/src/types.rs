//! # Canonical Boundary Structs
//!
//! One struct per entity as read from the ledger. Deserialization happens at
//! the client; downstream code never branches on tuple shapes or field
//! indices.

use alloy_primitives::{Address, TxHash, U256};
use parlay_types::{BetId, BetLeg, MatchOutcome, RoundId, SeasonId, UnixTime};

/// Round metadata as stored on the ledger.
///
/// These flags are authoritative: the orchestrator re-reads them immediately
/// before every write rather than trusting the cache.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RoundMetadata {
    /// Round id.
    pub round_id: RoundId,
    /// Season the round belongs to.
    pub season_id: SeasonId,
    /// Round start time.
    pub start_time: UnixTime,
    /// Betting window close time.
    pub end_time: UnixTime,
    /// Randomness request handle, once requested.
    pub vrf_request_id: Option<u64>,
    /// Whether the randomness request has been fulfilled.
    pub vrf_fulfilled: bool,
    /// Whether pools were seeded.
    pub seeded: bool,
    /// Whether odds are locked.
    pub odds_locked: bool,
    /// Whether the round is settled.
    pub settled: bool,
}

/// One match as read from the ledger.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MatchView {
    /// Position inside the round.
    pub match_index: u8,
    /// Home team id.
    pub home_team_id: u8,
    /// Away team id.
    pub away_team_id: u8,
    /// Home score, zero until fulfilment.
    pub home_score: u8,
    /// Away score, zero until fulfilment.
    pub away_score: u8,
    /// Outcome, pending until fulfilment.
    pub outcome: MatchOutcome,
    /// Locked home odds, 1e18-scaled.
    pub home_odds: U256,
    /// Locked away odds, 1e18-scaled.
    pub away_odds: U256,
    /// Locked draw odds, 1e18-scaled.
    pub draw_odds: U256,
    /// Whether the result is final.
    pub settled: bool,
}

/// Full bet detail as read from the ledger.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BetView {
    /// Bet id.
    pub bet_id: BetId,
    /// Bettor wallet.
    pub bettor: Address,
    /// Round the bet belongs to.
    pub round_id: RoundId,
    /// Season the round belongs to.
    pub season_id: SeasonId,
    /// Stake in wei.
    pub amount: U256,
    /// Bonus stake in wei.
    pub bonus: U256,
    /// Ordered predictions.
    pub legs: Vec<BetLeg>,
    /// Combined parlay multiplier, 1e18-scaled.
    pub parlay_multiplier: U256,
    /// Placement time.
    pub placed_at: UnixTime,
}

/// Result of the ledger's payout-preview call for one bet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PayoutPreview {
    /// Whether every leg hit.
    pub won: bool,
    /// Claimable payout (zero when lost).
    pub payout: U256,
}

/// A confirmed write transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxOutcome {
    /// Transaction hash.
    pub tx_hash: TxHash,
    /// Block the transaction was included in.
    pub block_number: u64,
}
