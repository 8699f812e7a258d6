//! # Ledger Client Trait
//!
//! The seam between the orchestrator/synchronizer and the chain. Both loops
//! hold an `Arc<dyn LedgerClient>`; the IPC transport implements it for
//! deployment and [`crate::SimulatedLedger`] for tests.
//!
//! Write methods are simulate -> submit -> await-confirmation with a bounded
//! timeout. They return only after inclusion (or a classified error); no
//! fire-and-forget.

use alloy_primitives::Address;
use parlay_types::{BetId, MatchOutcome, RoundId, SeasonId};

use crate::error::ChainResult;
use crate::events::RawLog;
use crate::types::{BetView, MatchView, PayoutPreview, RoundMetadata, TxOutcome};

/// Typed read/write access to the protocol contracts.
pub trait LedgerClient: Send + Sync {
    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Current chain head height.
    fn block_number(&self) -> ChainResult<u64>;

    /// Current season id (0 = no season started).
    fn current_season_id(&self) -> ChainResult<SeasonId>;

    /// Current round id (0 = no round started).
    fn current_round_id(&self) -> ChainResult<RoundId>;

    /// Authoritative round flags and timers.
    fn round_metadata(&self, round_id: RoundId) -> ChainResult<RoundMetadata>;

    /// All matches of a round, ascending by index.
    fn round_matches(&self, round_id: RoundId) -> ChainResult<Vec<MatchView>>;

    /// Full bet detail, including legs.
    fn bet(&self, bet_id: BetId) -> ChainResult<BetView>;

    /// The ledger's own won/payout evaluation for a bet.
    fn payout_preview(&self, bet_id: BetId) -> ChainResult<PayoutPreview>;

    /// Raw logs emitted by `address` in the inclusive block range.
    ///
    /// Callers cap the range themselves; implementations pass it through.
    fn logs(&self, address: Address, from_block: u64, to_block: u64) -> ChainResult<Vec<RawLog>>;

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Starts a new season.
    fn start_season(&self) -> ChainResult<TxOutcome>;

    /// Starts the next round of the current season.
    fn start_round(&self) -> ChainResult<TxOutcome>;

    /// Seeds a round's pools with virtual liquidity.
    ///
    /// Callers re-read the `seeded` flag immediately before calling; the
    /// contract rejects a second seed with a benign revert.
    fn seed_round(&self, round_id: RoundId) -> ChainResult<TxOutcome>;

    /// Requests random match results for the current round.
    fn request_randomness(&self) -> ChainResult<TxOutcome>;

    /// Settles a round, passing the outcome vector observed at fulfilment.
    fn settle_round(&self, round_id: RoundId, outcomes: &[MatchOutcome]) -> ChainResult<TxOutcome>;

    /// Sweeps a round's unclaimed pool after the claim deadline plus grace.
    fn sweep_round(&self, round_id: RoundId) -> ChainResult<TxOutcome>;
}
