//! # Store Trait
//!
//! Interface the synchronizer and orchestrator write through. Implementors
//! must provide duplicate-key-safe inserts and partial updates; callers
//! never see the backing storage.

use alloy_primitives::{Address, U256};
use parlay_types::{
    Bet, BetId, BetStatus, BountyClaim, Match, MatchOutcome, PointsEntry, ReferralEarning,
    ReferralLink, Round, RoundId, RoundSweep, SeasonId, UnixTime, UserPoints,
};

use crate::error::StoreResult;

/// Partial update for a round. `None` fields are left untouched.
#[derive(Clone, Debug, Default)]
pub struct RoundUpdate {
    /// New randomness request id.
    pub vrf_request_id: Option<u64>,
    /// New fulfilment timestamp.
    pub vrf_fulfilled_at: Option<UnixTime>,
    /// Seeded flag.
    pub seeded: Option<bool>,
    /// Seeding timestamp.
    pub seeded_at: Option<UnixTime>,
    /// Odds-locked flag.
    pub odds_locked: Option<bool>,
    /// Odds lock timestamp.
    pub odds_locked_at: Option<UnixTime>,
    /// Settled flag.
    pub settled: Option<bool>,
    /// Settlement timestamp.
    pub settled_at: Option<UnixTime>,
    /// Active (betting allowed) flag.
    pub is_active: Option<bool>,
    /// Betting window close time.
    pub end_time: Option<UnixTime>,
}

/// Partial update for a match. `None` fields are left untouched.
#[derive(Clone, Debug, Default)]
pub struct MatchUpdate {
    /// Home score from the fulfilment.
    pub home_score: Option<u8>,
    /// Away score from the fulfilment.
    pub away_score: Option<u8>,
    /// Decided outcome.
    pub outcome: Option<MatchOutcome>,
    /// Settled flag.
    pub settled: Option<bool>,
    /// Settlement timestamp.
    pub settled_at: Option<UnixTime>,
}

/// A bet status transition request.
#[derive(Clone, Copy, Debug)]
pub struct BetStatusUpdate {
    /// Target status.
    pub status: BetStatus,
    /// Timestamp to record for the transition, if the status is settled-like.
    pub settled_at: Option<UnixTime>,
}

/// The local cache interface.
///
/// Both loops hold an `Arc<dyn Store>`; implementations are internally
/// synchronized.
pub trait Store: Send + Sync {
    // ------------------------------------------------------------------
    // Rounds
    // ------------------------------------------------------------------

    /// Inserts a new round. Fails with `DuplicateKey` if the id exists.
    fn save_round(&self, round: Round) -> StoreResult<()>;

    /// Fetches a round by id.
    fn round(&self, round_id: RoundId) -> StoreResult<Option<Round>>;

    /// Applies a partial update, returning the updated round.
    fn update_round(&self, round_id: RoundId, update: RoundUpdate) -> StoreResult<Round>;

    /// All rounds of a season, ascending by id.
    fn rounds_by_season(&self, season_id: SeasonId) -> StoreResult<Vec<Round>>;

    /// Settled rounds not yet swept, ascending by id.
    fn settled_unswept_rounds(&self) -> StoreResult<Vec<Round>>;

    // ------------------------------------------------------------------
    // Matches
    // ------------------------------------------------------------------

    /// Bulk-inserts the matches of a freshly started round.
    fn save_matches(&self, matches: Vec<Match>) -> StoreResult<()>;

    /// All matches of a round, ascending by index.
    fn matches_by_round(&self, round_id: RoundId) -> StoreResult<Vec<Match>>;

    /// Applies a partial update to one match.
    fn update_match(
        &self,
        round_id: RoundId,
        match_index: u8,
        update: MatchUpdate,
    ) -> StoreResult<Match>;

    // ------------------------------------------------------------------
    // Bets
    // ------------------------------------------------------------------

    /// Inserts a new bet. Fails with `DuplicateKey` if the id exists.
    fn save_bet(&self, bet: Bet) -> StoreResult<()>;

    /// Fetches a bet by id.
    fn bet(&self, bet_id: BetId) -> StoreResult<Option<Bet>>;

    /// All bets of a round.
    fn bets_by_round(&self, round_id: RoundId) -> StoreResult<Vec<Bet>>;

    /// Transitions a bet's status, enforcing the transition table.
    fn update_bet_status(&self, bet_id: BetId, update: BetStatusUpdate) -> StoreResult<Bet>;

    // ------------------------------------------------------------------
    // Points
    // ------------------------------------------------------------------

    /// Appends a points entry and folds it into the wallet's totals.
    fn award_points(&self, entry: PointsEntry) -> StoreResult<()>;

    /// Cumulative points for a wallet (zeroed if unseen).
    fn points(&self, wallet: Address) -> StoreResult<UserPoints>;

    /// Top wallets by total points.
    fn leaderboard(&self, limit: usize) -> StoreResult<Vec<(Address, UserPoints)>>;

    // ------------------------------------------------------------------
    // Referrals
    // ------------------------------------------------------------------

    /// Creates a referral link. Fails with `DuplicateKey` if the referee
    /// already has a referrer.
    fn create_referral(&self, link: ReferralLink) -> StoreResult<()>;

    /// The link in which this wallet is the referee, if any.
    fn referral_by_referee(&self, referee: Address) -> StoreResult<Option<ReferralLink>>;

    /// All links created by a referrer.
    fn referrals_by_referrer(&self, referrer: Address) -> StoreResult<Vec<ReferralLink>>;

    /// Appends an earning row and adds it to the link's cumulative total.
    fn record_referral_earning(&self, earning: ReferralEarning) -> StoreResult<()>;

    /// Marks the referee's first qualifying bet on the link, once.
    fn mark_referee_first_bet(
        &self,
        referee: Address,
        bet_id: BetId,
        at: UnixTime,
    ) -> StoreResult<()>;

    /// Total earnings credited to a referrer across all links.
    fn total_referral_earnings(&self, referrer: Address) -> StoreResult<U256>;

    // ------------------------------------------------------------------
    // Bounty claims and sweeps
    // ------------------------------------------------------------------

    /// Records a bounty claim, keyed by bet id.
    fn record_bounty_claim(&self, claim: BountyClaim) -> StoreResult<()>;

    /// Fetches a bounty claim by bet id.
    fn bounty_claim(&self, bet_id: BetId) -> StoreResult<Option<BountyClaim>>;

    /// Records a round sweep, keyed by round id.
    fn record_sweep(&self, sweep: RoundSweep) -> StoreResult<()>;

    /// Fetches a sweep by round id.
    fn sweep(&self, round_id: RoundId) -> StoreResult<Option<RoundSweep>>;

    // ------------------------------------------------------------------
    // Synchronizer watermark
    // ------------------------------------------------------------------

    /// Last block height fully processed by the synchronizer.
    fn last_processed_block(&self) -> StoreResult<Option<u64>>;

    /// Advances the watermark. Monotonic; lower values are ignored.
    fn set_last_processed_block(&self, block: u64) -> StoreResult<()>;
}
