//! # In-Memory Store
//!
//! Keyed-map implementation of [`Store`] behind a single `RwLock`. Used by
//! the test suites and by simulation runs; a relational backend implements
//! the same trait in deployment.

use std::collections::{BTreeMap, HashMap};

use alloy_primitives::{Address, U256};
use parking_lot::RwLock;
use parlay_types::{
    Bet, BetId, BountyClaim, Match, PointsEntry, ReferralEarning, ReferralLink, Round, RoundId,
    RoundSweep, SeasonId, UnixTime, UserPoints,
};

use crate::error::{StoreError, StoreResult};
use crate::store::{BetStatusUpdate, MatchUpdate, RoundUpdate, Store};

#[derive(Default)]
struct Inner {
    rounds: BTreeMap<RoundId, Round>,
    matches: BTreeMap<(RoundId, u8), Match>,
    bets: BTreeMap<BetId, Bet>,
    points: HashMap<Address, UserPoints>,
    points_history: Vec<PointsEntry>,
    referrals: HashMap<Address, ReferralLink>,
    earnings: Vec<ReferralEarning>,
    bounty_claims: BTreeMap<BetId, BountyClaim>,
    sweeps: BTreeMap<RoundId, RoundSweep>,
    watermark: Option<u64>,
}

/// Thread-safe in-memory [`Store`].
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored bets (test helper).
    #[must_use]
    pub fn bet_count(&self) -> usize {
        self.inner.read().bets.len()
    }
}

impl Store for MemoryStore {
    fn save_round(&self, round: Round) -> StoreResult<()> {
        let mut inner = self.inner.write();
        if inner.rounds.contains_key(&round.round_id) {
            return Err(StoreError::DuplicateKey {
                entity: "round",
                key: round.round_id.to_string(),
            });
        }
        inner.rounds.insert(round.round_id, round);
        Ok(())
    }

    fn round(&self, round_id: RoundId) -> StoreResult<Option<Round>> {
        Ok(self.inner.read().rounds.get(&round_id).cloned())
    }

    fn update_round(&self, round_id: RoundId, update: RoundUpdate) -> StoreResult<Round> {
        let mut inner = self.inner.write();
        let round = inner
            .rounds
            .get_mut(&round_id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "round",
                key: round_id.to_string(),
            })?;

        if let Some(id) = update.vrf_request_id {
            round.vrf_request_id = Some(id);
        }
        if let Some(at) = update.vrf_fulfilled_at {
            round.vrf_fulfilled_at = Some(at);
        }
        if let Some(seeded) = update.seeded {
            round.seeded = seeded;
        }
        if let Some(at) = update.seeded_at {
            round.seeded_at = Some(at);
        }
        if let Some(locked) = update.odds_locked {
            round.odds_locked = locked;
        }
        if let Some(at) = update.odds_locked_at {
            round.odds_locked_at = Some(at);
        }
        if let Some(settled) = update.settled {
            round.settled = settled;
            // A settled round can never stay active.
            if settled {
                round.is_active = false;
            }
        }
        if let Some(at) = update.settled_at {
            round.settled_at = Some(at);
        }
        if let Some(active) = update.is_active {
            round.is_active = active && !round.settled;
        }
        if let Some(end) = update.end_time {
            round.end_time = end;
        }

        Ok(round.clone())
    }

    fn rounds_by_season(&self, season_id: SeasonId) -> StoreResult<Vec<Round>> {
        Ok(self
            .inner
            .read()
            .rounds
            .values()
            .filter(|r| r.season_id == season_id)
            .cloned()
            .collect())
    }

    fn settled_unswept_rounds(&self) -> StoreResult<Vec<Round>> {
        let inner = self.inner.read();
        Ok(inner
            .rounds
            .values()
            .filter(|r| r.settled && !inner.sweeps.contains_key(&r.round_id))
            .cloned()
            .collect())
    }

    fn save_matches(&self, matches: Vec<Match>) -> StoreResult<()> {
        let mut inner = self.inner.write();
        for m in matches {
            let key = (m.round_id, m.match_index);
            if inner.matches.contains_key(&key) {
                return Err(StoreError::DuplicateKey {
                    entity: "match",
                    key: format!("{}:{}", key.0, key.1),
                });
            }
            inner.matches.insert(key, m);
        }
        Ok(())
    }

    fn matches_by_round(&self, round_id: RoundId) -> StoreResult<Vec<Match>> {
        Ok(self
            .inner
            .read()
            .matches
            .range((round_id, 0)..=(round_id, u8::MAX))
            .map(|(_, m)| m.clone())
            .collect())
    }

    fn update_match(
        &self,
        round_id: RoundId,
        match_index: u8,
        update: MatchUpdate,
    ) -> StoreResult<Match> {
        let mut inner = self.inner.write();
        let m = inner
            .matches
            .get_mut(&(round_id, match_index))
            .ok_or_else(|| StoreError::NotFound {
                entity: "match",
                key: format!("{round_id}:{match_index}"),
            })?;

        if let Some(score) = update.home_score {
            m.home_score = Some(score);
        }
        if let Some(score) = update.away_score {
            m.away_score = Some(score);
        }
        if let Some(outcome) = update.outcome {
            // Outcomes decide once; a decided match keeps its result.
            if !m.outcome.is_decided() {
                m.outcome = outcome;
            }
        }
        if let Some(settled) = update.settled {
            m.settled = settled;
        }
        if let Some(at) = update.settled_at {
            m.settled_at = Some(at);
        }

        Ok(m.clone())
    }

    fn save_bet(&self, bet: Bet) -> StoreResult<()> {
        let mut inner = self.inner.write();
        if inner.bets.contains_key(&bet.bet_id) {
            return Err(StoreError::DuplicateKey {
                entity: "bet",
                key: bet.bet_id.to_string(),
            });
        }
        inner.bets.insert(bet.bet_id, bet);
        Ok(())
    }

    fn bet(&self, bet_id: BetId) -> StoreResult<Option<Bet>> {
        Ok(self.inner.read().bets.get(&bet_id).cloned())
    }

    fn bets_by_round(&self, round_id: RoundId) -> StoreResult<Vec<Bet>> {
        Ok(self
            .inner
            .read()
            .bets
            .values()
            .filter(|b| b.round_id == round_id)
            .cloned()
            .collect())
    }

    fn update_bet_status(&self, bet_id: BetId, update: BetStatusUpdate) -> StoreResult<Bet> {
        let mut inner = self.inner.write();
        let bet = inner
            .bets
            .get_mut(&bet_id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "bet",
                key: bet_id.to_string(),
            })?;

        if !bet.status.can_transition_to(update.status) {
            return Err(StoreError::IllegalTransition {
                from: bet.status,
                to: update.status,
            });
        }

        bet.status = update.status;
        if let Some(at) = update.settled_at {
            bet.settled_at = Some(at);
        }

        Ok(bet.clone())
    }

    fn award_points(&self, entry: PointsEntry) -> StoreResult<()> {
        let mut inner = self.inner.write();
        let totals = inner.points.entry(entry.wallet).or_default();
        totals.total_points += entry.points;
        match entry.reason {
            parlay_types::PointsReason::BetPlaced => totals.bets_placed += 1,
            parlay_types::PointsReason::BetWon => totals.bets_won += 1,
        }
        inner.points_history.push(entry);
        Ok(())
    }

    fn points(&self, wallet: Address) -> StoreResult<UserPoints> {
        Ok(self
            .inner
            .read()
            .points
            .get(&wallet)
            .cloned()
            .unwrap_or_default())
    }

    fn leaderboard(&self, limit: usize) -> StoreResult<Vec<(Address, UserPoints)>> {
        let inner = self.inner.read();
        let mut rows: Vec<_> = inner
            .points
            .iter()
            .map(|(addr, pts)| (*addr, pts.clone()))
            .collect();
        rows.sort_by(|a, b| b.1.total_points.cmp(&a.1.total_points));
        rows.truncate(limit);
        Ok(rows)
    }

    fn create_referral(&self, link: ReferralLink) -> StoreResult<()> {
        let mut inner = self.inner.write();
        if inner.referrals.contains_key(&link.referee) {
            return Err(StoreError::DuplicateKey {
                entity: "referral",
                key: link.referee.to_string(),
            });
        }
        inner.referrals.insert(link.referee, link);
        Ok(())
    }

    fn referral_by_referee(&self, referee: Address) -> StoreResult<Option<ReferralLink>> {
        Ok(self.inner.read().referrals.get(&referee).cloned())
    }

    fn referrals_by_referrer(&self, referrer: Address) -> StoreResult<Vec<ReferralLink>> {
        Ok(self
            .inner
            .read()
            .referrals
            .values()
            .filter(|l| l.referrer == referrer)
            .cloned()
            .collect())
    }

    fn record_referral_earning(&self, earning: ReferralEarning) -> StoreResult<()> {
        let mut inner = self.inner.write();
        if let Some(link) = inner.referrals.get_mut(&earning.referee) {
            link.total_earnings = link.total_earnings.saturating_add(earning.reward_amount);
        }
        inner.earnings.push(earning);
        Ok(())
    }

    fn mark_referee_first_bet(
        &self,
        referee: Address,
        bet_id: BetId,
        at: UnixTime,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write();
        let link = inner
            .referrals
            .get_mut(&referee)
            .ok_or_else(|| StoreError::NotFound {
                entity: "referral",
                key: referee.to_string(),
            })?;
        if link.referee_first_bet.is_none() {
            link.referee_first_bet = Some(bet_id);
            link.referee_first_bet_at = Some(at);
        }
        Ok(())
    }

    fn total_referral_earnings(&self, referrer: Address) -> StoreResult<U256> {
        Ok(self
            .inner
            .read()
            .referrals
            .values()
            .filter(|l| l.referrer == referrer)
            .fold(U256::ZERO, |acc, l| acc.saturating_add(l.total_earnings)))
    }

    fn record_bounty_claim(&self, claim: BountyClaim) -> StoreResult<()> {
        let mut inner = self.inner.write();
        if inner.bounty_claims.contains_key(&claim.bet_id) {
            return Err(StoreError::DuplicateKey {
                entity: "bounty_claim",
                key: claim.bet_id.to_string(),
            });
        }
        inner.bounty_claims.insert(claim.bet_id, claim);
        Ok(())
    }

    fn bounty_claim(&self, bet_id: BetId) -> StoreResult<Option<BountyClaim>> {
        Ok(self.inner.read().bounty_claims.get(&bet_id).cloned())
    }

    fn record_sweep(&self, sweep: RoundSweep) -> StoreResult<()> {
        let mut inner = self.inner.write();
        if inner.sweeps.contains_key(&sweep.round_id) {
            return Err(StoreError::DuplicateKey {
                entity: "round_sweep",
                key: sweep.round_id.to_string(),
            });
        }
        inner.sweeps.insert(sweep.round_id, sweep);
        Ok(())
    }

    fn sweep(&self, round_id: RoundId) -> StoreResult<Option<RoundSweep>> {
        Ok(self.inner.read().sweeps.get(&round_id).cloned())
    }

    fn last_processed_block(&self) -> StoreResult<Option<u64>> {
        Ok(self.inner.read().watermark)
    }

    fn set_last_processed_block(&self, block: u64) -> StoreResult<()> {
        let mut inner = self.inner.write();
        if inner.watermark.map_or(true, |current| block > current) {
            inner.watermark = Some(block);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::TxHash;
    use parlay_types::{BetStatus, PointsReason};

    fn round(id: RoundId) -> Round {
        Round::started(id, 1, 1_000, 1_900)
    }

    fn bet(id: BetId) -> Bet {
        Bet {
            bet_id: id,
            bettor: Address::repeat_byte(7),
            round_id: 1,
            season_id: 1,
            amount: U256::from(100u64),
            bonus: U256::ZERO,
            legs: vec![],
            parlay_multiplier: U256::from(parlay_types::bet::MULTIPLIER_SCALE),
            potential_winnings: U256::from(100u64),
            status: BetStatus::Pending,
            tx_hash: TxHash::ZERO,
            placed_at: 1_100,
            settled_at: None,
        }
    }

    #[test]
    fn test_duplicate_round_insert_rejected() {
        let store = MemoryStore::new();
        store.save_round(round(1)).unwrap();
        let err = store.save_round(round(1)).unwrap_err();
        assert!(err.is_duplicate());
    }

    #[test]
    fn test_duplicate_bet_insert_rejected() {
        let store = MemoryStore::new();
        store.save_bet(bet(7)).unwrap();
        assert!(store.save_bet(bet(7)).unwrap_err().is_duplicate());
        assert_eq!(store.bet_count(), 1);
    }

    #[test]
    fn test_bet_status_monotone() {
        let store = MemoryStore::new();
        store.save_bet(bet(1)).unwrap();

        store
            .update_bet_status(
                1,
                BetStatusUpdate {
                    status: BetStatus::Won,
                    settled_at: Some(2_000),
                },
            )
            .unwrap();
        store
            .update_bet_status(
                1,
                BetStatusUpdate {
                    status: BetStatus::Claimed,
                    settled_at: None,
                },
            )
            .unwrap();

        // Claimed is terminal: any further transition is rejected.
        let err = store
            .update_bet_status(
                1,
                BetStatusUpdate {
                    status: BetStatus::Lost,
                    settled_at: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::IllegalTransition { .. }));
        assert_eq!(store.bet(1).unwrap().unwrap().status, BetStatus::Claimed);
    }

    #[test]
    fn test_settling_round_clears_active() {
        let store = MemoryStore::new();
        store.save_round(round(1)).unwrap();
        let updated = store
            .update_round(
                1,
                RoundUpdate {
                    settled: Some(true),
                    settled_at: Some(2_000),
                    ..RoundUpdate::default()
                },
            )
            .unwrap();
        assert!(updated.settled);
        assert!(!updated.is_active);
        assert!(updated.invariants_hold());
    }

    #[test]
    fn test_watermark_monotonic() {
        let store = MemoryStore::new();
        assert_eq!(store.last_processed_block().unwrap(), None);
        store.set_last_processed_block(100).unwrap();
        store.set_last_processed_block(50).unwrap();
        assert_eq!(store.last_processed_block().unwrap(), Some(100));
    }

    #[test]
    fn test_points_accumulate() {
        let store = MemoryStore::new();
        let wallet = Address::repeat_byte(3);
        store
            .award_points(PointsEntry {
                wallet,
                bet_id: Some(1),
                points: PointsReason::BetPlaced.award(),
                reason: PointsReason::BetPlaced,
                awarded_at: 1_000,
            })
            .unwrap();
        store
            .award_points(PointsEntry {
                wallet,
                bet_id: Some(1),
                points: PointsReason::BetWon.award(),
                reason: PointsReason::BetWon,
                awarded_at: 2_000,
            })
            .unwrap();

        let totals = store.points(wallet).unwrap();
        assert_eq!(totals.total_points, 11);
        assert_eq!(totals.bets_placed, 1);
        assert_eq!(totals.bets_won, 1);

        let board = store.leaderboard(10).unwrap();
        assert_eq!(board[0].0, wallet);
    }

    #[test]
    fn test_settled_unswept() {
        let store = MemoryStore::new();
        store.save_round(round(1)).unwrap();
        store.save_round(round(2)).unwrap();
        store
            .update_round(
                1,
                RoundUpdate {
                    settled: Some(true),
                    ..RoundUpdate::default()
                },
            )
            .unwrap();

        let unswept = store.settled_unswept_rounds().unwrap();
        assert_eq!(unswept.len(), 1);
        assert_eq!(unswept[0].round_id, 1);

        store
            .record_sweep(RoundSweep {
                round_id: 1,
                remaining_amount: U256::ZERO,
                protocol_share: U256::ZERO,
                season_share: U256::ZERO,
                tx_hash: TxHash::ZERO,
                swept_at: 3_000,
            })
            .unwrap();
        assert!(store.settled_unswept_rounds().unwrap().is_empty());
    }
}
