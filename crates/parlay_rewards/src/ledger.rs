//! # Reward Ledger
//!
//! The functions the synchronizer calls while applying events. All of them
//! are safe to replay: records are keyed by natural ids and a bet that does
//! not qualify is a no-op, not an error.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use parlay_store::{BetStatusUpdate, Store, StoreError};
use parlay_types::{
    Bet, BetId, BetStatus, BountyClaim, PointsEntry, PointsReason, ReferralEarning, ReferralLink,
    RoundSweep, UnixTime,
};
use rand::Rng;

use crate::config::RewardsConfig;
use crate::error::{RewardError, RewardResult};

/// Computes the referral reward for a qualifying stake.
///
/// `min(stake * bps / 10000, cap)`. Holds for any stake including zero.
#[must_use]
pub fn referral_reward(stake: U256, bps: u32, cap: U256) -> U256 {
    let reward = stake.saturating_mul(U256::from(bps)) / U256::from(10_000u64);
    if reward > cap {
        cap
    } else {
        reward
    }
}

/// Summary of a referrer's links, for the read API.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReferralStats {
    /// Links where this wallet is the referrer.
    pub total_referrals: usize,
    /// Of those, links still accruing rewards.
    pub active_referrals: usize,
    /// Cumulative earnings across all links.
    pub total_earnings: U256,
}

/// Reward bookkeeping over the shared store.
pub struct RewardLedger {
    store: Arc<dyn Store>,
    config: RewardsConfig,
}

impl RewardLedger {
    /// Creates a ledger writing through `store`.
    pub fn new(store: Arc<dyn Store>, config: RewardsConfig) -> Self {
        Self { store, config }
    }

    /// Derives a shareable referral code: the last 8 hex characters of the
    /// referrer address plus 4 random alphanumerics.
    #[must_use]
    pub fn generate_referral_code(referrer: Address) -> String {
        let hex = format!("{referrer:x}");
        let suffix: String = hex[hex.len() - 8..].to_ascii_uppercase();
        let mut rng = rand::thread_rng();
        let entropy: String = (0..4)
            .map(|_| {
                (rng.sample(rand::distributions::Alphanumeric) as char).to_ascii_uppercase()
            })
            .collect();
        format!("{suffix}{entropy}")
    }

    /// Creates a referral link.
    ///
    /// # Errors
    ///
    /// Rejects self-referrals and referees that already have a referrer;
    /// the uniqueness check is enforced again by the store insert, so two
    /// racing creators cannot both win.
    pub fn create_referral(
        &self,
        referrer: Address,
        referee: Address,
        code: Option<String>,
        now: UnixTime,
    ) -> RewardResult<ReferralLink> {
        if referrer == referee {
            return Err(RewardError::SelfReferral);
        }
        if self.store.referral_by_referee(referee)?.is_some() {
            return Err(RewardError::AlreadyReferred { referee });
        }

        let link = ReferralLink {
            referrer,
            referee,
            referral_code: code.unwrap_or_else(|| Self::generate_referral_code(referrer)),
            total_earnings: U256::ZERO,
            referee_first_bet: None,
            referee_first_bet_at: None,
            is_active: true,
            created_at: now,
        };
        match self.store.create_referral(link.clone()) {
            Ok(()) => {
                tracing::info!(
                    %referrer,
                    %referee,
                    code = %link.referral_code,
                    "referral link created"
                );
                Ok(link)
            }
            Err(e) if e.is_duplicate() => Err(RewardError::AlreadyReferred { referee }),
            Err(e) => Err(e.into()),
        }
    }

    /// Full bet-placed processing: the fixed placement points plus referral
    /// handling. Returns the recorded referral reward, if any.
    ///
    /// # Errors
    ///
    /// Only on store failure; a non-qualifying bet returns `Ok(None)`.
    pub fn on_bet_placed(&self, bet: &Bet) -> RewardResult<Option<U256>> {
        self.store.award_points(PointsEntry {
            wallet: bet.bettor,
            bet_id: Some(bet.bet_id),
            points: PointsReason::BetPlaced.award(),
            reason: PointsReason::BetPlaced,
            awarded_at: bet.placed_at,
        })?;
        self.process_referral_reward(bet.bettor, bet.bet_id, bet.amount, bet.placed_at)
    }

    /// Awards the win points when settlement marks a bet won.
    ///
    /// # Errors
    ///
    /// Only on store failure.
    pub fn on_bet_won(&self, wallet: Address, bet_id: BetId, at: UnixTime) -> RewardResult<()> {
        self.store.award_points(PointsEntry {
            wallet,
            bet_id: Some(bet_id),
            points: PointsReason::BetWon.award(),
            reason: PointsReason::BetWon,
            awarded_at: at,
        })?;
        Ok(())
    }

    /// Referral processing for one placed bet.
    ///
    /// Guards: the stake must meet the configured minimum and an active
    /// link must exist for the referee; otherwise this is a no-op. The
    /// referee's first qualifying bet additionally marks bonus eligibility.
    ///
    /// # Errors
    ///
    /// Only on store failure.
    pub fn process_referral_reward(
        &self,
        referee: Address,
        bet_id: BetId,
        stake: U256,
        now: UnixTime,
    ) -> RewardResult<Option<U256>> {
        if stake < self.config.min_bet_for_referral {
            return Ok(None);
        }
        let Some(link) = self.store.referral_by_referee(referee)? else {
            return Ok(None);
        };
        if !link.is_active {
            return Ok(None);
        }

        let reward = referral_reward(stake, self.config.referral_bps, self.config.max_referral_reward);
        self.store.record_referral_earning(ReferralEarning {
            referrer: link.referrer,
            referee,
            bet_id,
            bet_amount: stake,
            reward_amount: reward,
            paid: false,
            recorded_at: now,
        })?;
        tracing::info!(
            referrer = %link.referrer,
            %referee,
            bet_id,
            reward = %reward,
            "referral reward recorded"
        );

        if link.referee_first_bet.is_none() {
            self.store.mark_referee_first_bet(referee, bet_id, now)?;
            tracing::info!(
                %referee,
                bet_id,
                bonus = %self.config.referee_bonus,
                "first qualifying bet, referee bonus eligible"
            );
        }

        Ok(Some(reward))
    }

    /// Mirrors a ledger-side bounty claim and flips the bet to claimed.
    ///
    /// The record is keyed by bet id; a replayed event is skipped. The
    /// status flip tolerates a bet the cache has not settled yet.
    ///
    /// # Errors
    ///
    /// Only on store failure.
    pub fn mirror_bounty_claim(&self, claim: BountyClaim) -> RewardResult<()> {
        let bet_id = claim.bet_id;
        let claimed_at = claim.claimed_at;
        match self.store.record_bounty_claim(claim) {
            Ok(()) => {}
            Err(e) if e.is_duplicate() => {
                tracing::debug!(bet_id, "bounty claim already recorded");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        match self.store.update_bet_status(
            bet_id,
            BetStatusUpdate {
                status: BetStatus::Claimed,
                settled_at: Some(claimed_at),
            },
        ) {
            Ok(_) => {}
            Err(StoreError::IllegalTransition { from, to }) => {
                tracing::warn!(bet_id, ?from, ?to, "bounty claim for bet not in won state");
            }
            Err(StoreError::NotFound { .. }) => {
                tracing::warn!(bet_id, "bounty claim for bet missing from cache");
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    /// Mirrors a round-pool sweep. Keyed by round id; replays are skipped.
    ///
    /// # Errors
    ///
    /// Only on store failure.
    pub fn mirror_round_sweep(&self, sweep: RoundSweep) -> RewardResult<()> {
        let round_id = sweep.round_id;
        match self.store.record_sweep(sweep) {
            Ok(()) => {
                tracing::info!(round_id, "round sweep recorded");
                Ok(())
            }
            Err(e) if e.is_duplicate() => {
                tracing::debug!(round_id, "sweep already recorded");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Summary of a referrer's links and earnings.
    ///
    /// # Errors
    ///
    /// Only on store failure.
    pub fn referral_stats(&self, referrer: Address) -> RewardResult<ReferralStats> {
        let links = self.store.referrals_by_referrer(referrer)?;
        Ok(ReferralStats {
            total_referrals: links.len(),
            active_referrals: links.iter().filter(|l| l.is_active).count(),
            total_earnings: self.store.total_referral_earnings(referrer)?,
        })
    }
}
