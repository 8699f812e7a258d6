//! # Simulated Ledger
//!
//! An in-process ledger implementing [`LedgerClient`] with the same flag
//! discipline as the contracts: writes revert when their precondition fails,
//! repeats revert with an "already ..." reason, and every state change emits
//! the real encoded log so the synchronizer's decode path is exercised
//! end to end.
//!
//! The clock is simulated and advanced explicitly by the driver, which makes
//! timer-dependent orchestrator behavior deterministic under test.

use alloy_primitives::{Address, TxHash, B256, U256};
use parking_lot::RwLock;
use parlay_types::{
    BetId, BetLeg, MatchOutcome, RoundId, SeasonId, UnixTime, MATCHES_PER_ROUND,
};
use std::collections::{BTreeMap, BTreeSet};

use crate::client::LedgerClient;
use crate::error::{ChainError, ChainResult};
use crate::events::{ProtocolEvent, RawLog};
use crate::types::{BetView, MatchView, PayoutPreview, RoundMetadata, TxOutcome};

/// Default odds used for simulated matches: 2.0x, 1e18-scaled.
const DEFAULT_ODDS: u128 = 2_000_000_000_000_000_000;

struct SimRound {
    meta: RoundMetadata,
    matches: Vec<MatchView>,
}

struct Inner {
    now: UnixTime,
    block: u64,
    season_id: SeasonId,
    round_id: RoundId,
    rounds: BTreeMap<RoundId, SimRound>,
    bets: BTreeMap<BetId, BetView>,
    previews: BTreeMap<BetId, PayoutPreview>,
    claimed: BTreeSet<BetId>,
    swept: BTreeSet<RoundId>,
    logs: Vec<RawLog>,
    next_bet_id: BetId,
    next_request_id: u64,
    next_tx: u64,
}

/// In-process [`LedgerClient`] for tests and dry runs.
pub struct SimulatedLedger {
    /// Address playing the game-core role.
    pub game_core: Address,
    /// Address playing the betting-core role.
    pub betting_core: Address,
    round_duration: u64,
    inner: RwLock<Inner>,
}

impl SimulatedLedger {
    /// Creates a fresh chain with no season and the clock at `genesis_time`.
    #[must_use]
    pub fn new(round_duration: u64, genesis_time: UnixTime) -> Self {
        Self {
            game_core: Address::repeat_byte(0xAA),
            betting_core: Address::repeat_byte(0xBB),
            round_duration,
            inner: RwLock::new(Inner {
                now: genesis_time,
                block: 1,
                season_id: 0,
                round_id: 0,
                rounds: BTreeMap::new(),
                bets: BTreeMap::new(),
                previews: BTreeMap::new(),
                claimed: BTreeSet::new(),
                swept: BTreeSet::new(),
                logs: Vec::new(),
                next_bet_id: 1,
                next_request_id: 1,
                next_tx: 1,
            }),
        }
    }

    /// The simulated wall clock.
    #[must_use]
    pub fn now(&self) -> UnixTime {
        self.inner.read().now
    }

    /// Advances the clock without mining blocks.
    pub fn advance_time(&self, secs: u64) {
        self.inner.write().now += secs;
    }

    /// Mines empty blocks.
    pub fn advance_blocks(&self, count: u64) {
        self.inner.write().block += count;
    }

    fn revert(reason: &str) -> ChainError {
        ChainError::Reverted {
            reason: reason.to_string(),
        }
    }

    fn tx_hash(n: u64) -> TxHash {
        B256::from(U256::from(n).to_be_bytes::<32>())
    }

    /// Mines one block and returns its confirmed outcome.
    fn confirm(inner: &mut Inner) -> TxOutcome {
        inner.block += 1;
        let tx_hash = Self::tx_hash(inner.next_tx);
        inner.next_tx += 1;
        TxOutcome {
            tx_hash,
            block_number: inner.block,
        }
    }

    fn emit(inner: &mut Inner, address: Address, event: &ProtocolEvent) {
        let block = inner.block;
        let log_index = u32::try_from(
            inner
                .logs
                .iter()
                .filter(|l| l.block_number == block)
                .count(),
        )
        .unwrap_or(u32::MAX);
        inner.logs.push(event.to_log(address, block, 0, log_index));
    }

    // ------------------------------------------------------------------
    // Driver actions: things bettors and the VRF do, not the orchestrator
    // ------------------------------------------------------------------

    /// Places a bet on the current round.
    ///
    /// # Errors
    ///
    /// Reverts when the round is unseeded, the window is closed, or a leg
    /// index is out of range.
    pub fn place_bet(
        &self,
        bettor: Address,
        legs: Vec<BetLeg>,
        amount: U256,
        bonus: U256,
        parlay_multiplier: U256,
    ) -> ChainResult<BetId> {
        let mut inner = self.inner.write();
        let now = inner.now;
        let round_id = inner.round_id;
        let round = inner
            .rounds
            .get(&round_id)
            .ok_or_else(|| Self::revert("no active round"))?;
        if !round.meta.seeded {
            return Err(Self::revert("round not seeded"));
        }
        if now >= round.meta.end_time {
            return Err(Self::revert("betting window closed"));
        }
        if legs
            .iter()
            .any(|l| usize::from(l.match_index) >= MATCHES_PER_ROUND)
        {
            return Err(Self::revert("leg index out of range"));
        }

        let season_id = inner.season_id;
        let bet_id = inner.next_bet_id;
        inner.next_bet_id += 1;

        let outcome = Self::confirm(&mut inner);
        let view = BetView {
            bet_id,
            bettor,
            round_id,
            season_id,
            amount,
            bonus,
            legs,
            parlay_multiplier,
            placed_at: now,
        };
        inner.bets.insert(bet_id, view);
        let betting_core = self.betting_core;
        Self::emit(
            &mut inner,
            betting_core,
            &ProtocolEvent::BetPlaced {
                bet_id,
                bettor,
                round_id,
                amount,
                bonus,
                parlay_multiplier,
                tx_hash: outcome.tx_hash,
            },
        );
        Ok(bet_id)
    }

    /// Delivers the randomness fulfilment with explicit scores.
    ///
    /// # Errors
    ///
    /// Reverts when no request is pending or the round is already fulfilled.
    pub fn fulfill_randomness(&self, scores: &[(u8, u8)]) -> ChainResult<()> {
        let mut inner = self.inner.write();
        let now = inner.now;
        let round_id = inner.round_id;
        let round = inner
            .rounds
            .get_mut(&round_id)
            .ok_or_else(|| Self::revert("no active round"))?;
        let request_id = round
            .meta
            .vrf_request_id
            .ok_or_else(|| Self::revert("no randomness request pending"))?;
        if round.meta.vrf_fulfilled {
            return Err(Self::revert("randomness already fulfilled"));
        }

        round.meta.vrf_fulfilled = true;
        for (m, (home, away)) in round.matches.iter_mut().zip(scores.iter()) {
            m.home_score = *home;
            m.away_score = *away;
            m.outcome = match home.cmp(away) {
                std::cmp::Ordering::Greater => MatchOutcome::HomeWin,
                std::cmp::Ordering::Less => MatchOutcome::AwayWin,
                std::cmp::Ordering::Equal => MatchOutcome::Draw,
            };
            m.settled = true;
        }
        let _ = now;

        let _ = Self::confirm(&mut inner);
        let game_core = self.game_core;
        Self::emit(
            &mut inner,
            game_core,
            &ProtocolEvent::RandomnessFulfilled {
                request_id,
                round_id,
            },
        );
        Ok(())
    }

    /// A bettor claims their winning bet.
    ///
    /// # Errors
    ///
    /// Reverts when the bet did not win or was already claimed.
    pub fn claim_winnings(&self, bet_id: BetId) -> ChainResult<()> {
        let mut inner = self.inner.write();
        let preview = inner.previews.get(&bet_id).copied().unwrap_or_default();
        if !preview.won {
            return Err(Self::revert("bet did not win"));
        }
        if !inner.claimed.insert(bet_id) {
            return Err(Self::revert("bet already claimed"));
        }
        let bettor = inner
            .bets
            .get(&bet_id)
            .map(|b| b.bettor)
            .ok_or_else(|| Self::revert("unknown bet"))?;
        let _ = Self::confirm(&mut inner);
        let betting_core = self.betting_core;
        Self::emit(
            &mut inner,
            betting_core,
            &ProtocolEvent::WinningsClaimed { bet_id, bettor },
        );
        Ok(())
    }

    /// A third party claims an unclaimed winning bet for the bounty split.
    ///
    /// # Errors
    ///
    /// Reverts when the bet did not win or was already claimed.
    pub fn claim_bounty(&self, bet_id: BetId, claimer: Address) -> ChainResult<()> {
        let mut inner = self.inner.write();
        let preview = inner.previews.get(&bet_id).copied().unwrap_or_default();
        if !preview.won {
            return Err(Self::revert("bet did not win"));
        }
        if !inner.claimed.insert(bet_id) {
            return Err(Self::revert("bet already claimed"));
        }
        let winner = inner
            .bets
            .get(&bet_id)
            .map(|b| b.bettor)
            .ok_or_else(|| Self::revert("unknown bet"))?;
        // 10% bounty, remainder to the winner - mirrors the contract split.
        let bounty_amount = preview.payout / U256::from(10u64);
        let winner_amount = preview.payout - bounty_amount;
        let outcome = Self::confirm(&mut inner);
        let betting_core = self.betting_core;
        Self::emit(
            &mut inner,
            betting_core,
            &ProtocolEvent::BountyClaimed {
                bet_id,
                claimer,
                winner,
                bounty_amount,
                winner_amount,
                tx_hash: outcome.tx_hash,
            },
        );
        Ok(())
    }

    /// A bettor cancels a pending bet before the window closes.
    ///
    /// # Errors
    ///
    /// Reverts on an unknown bet id.
    pub fn cancel_bet(&self, bet_id: BetId) -> ChainResult<()> {
        let mut inner = self.inner.write();
        let bettor = inner
            .bets
            .get(&bet_id)
            .map(|b| b.bettor)
            .ok_or_else(|| Self::revert("unknown bet"))?;
        let _ = Self::confirm(&mut inner);
        let betting_core = self.betting_core;
        Self::emit(
            &mut inner,
            betting_core,
            &ProtocolEvent::BetCancelled { bet_id, bettor },
        );
        Ok(())
    }

    /// Emits a log from an unrelated contract (decode-skip traffic).
    pub fn emit_unrelated_log(&self) {
        let mut inner = self.inner.write();
        let block = inner.block;
        let log_index = u32::try_from(
            inner
                .logs
                .iter()
                .filter(|l| l.block_number == block)
                .count(),
        )
        .unwrap_or(u32::MAX);
        inner.logs.push(RawLog {
            address: self.betting_core,
            topics: vec![alloy_primitives::keccak256(
                "Transfer(address,address,uint256)",
            )],
            data: vec![0u8; 32],
            block_number: block,
            tx_index: 0,
            tx_hash: TxHash::ZERO,
            log_index,
        });
    }
}

impl LedgerClient for SimulatedLedger {
    fn block_number(&self) -> ChainResult<u64> {
        Ok(self.inner.read().block)
    }

    fn current_season_id(&self) -> ChainResult<SeasonId> {
        Ok(self.inner.read().season_id)
    }

    fn current_round_id(&self) -> ChainResult<RoundId> {
        Ok(self.inner.read().round_id)
    }

    fn round_metadata(&self, round_id: RoundId) -> ChainResult<RoundMetadata> {
        self.inner
            .read()
            .rounds
            .get(&round_id)
            .map(|r| r.meta)
            .ok_or_else(|| Self::revert("unknown round"))
    }

    fn round_matches(&self, round_id: RoundId) -> ChainResult<Vec<MatchView>> {
        self.inner
            .read()
            .rounds
            .get(&round_id)
            .map(|r| r.matches.clone())
            .ok_or_else(|| Self::revert("unknown round"))
    }

    fn bet(&self, bet_id: BetId) -> ChainResult<BetView> {
        self.inner
            .read()
            .bets
            .get(&bet_id)
            .cloned()
            .ok_or_else(|| Self::revert("unknown bet"))
    }

    fn payout_preview(&self, bet_id: BetId) -> ChainResult<PayoutPreview> {
        Ok(self
            .inner
            .read()
            .previews
            .get(&bet_id)
            .copied()
            .unwrap_or_default())
    }

    fn logs(&self, address: Address, from_block: u64, to_block: u64) -> ChainResult<Vec<RawLog>> {
        Ok(self
            .inner
            .read()
            .logs
            .iter()
            .filter(|l| {
                l.address == address && l.block_number >= from_block && l.block_number <= to_block
            })
            .cloned()
            .collect())
    }

    fn start_season(&self) -> ChainResult<TxOutcome> {
        let mut inner = self.inner.write();
        if inner.season_id != 0 {
            return Err(Self::revert("season already active"));
        }
        inner.season_id = 1;
        Ok(Self::confirm(&mut inner))
    }

    fn start_round(&self) -> ChainResult<TxOutcome> {
        let mut inner = self.inner.write();
        if inner.season_id == 0 {
            return Err(Self::revert("no active season"));
        }
        let current = inner.round_id;
        if current != 0 {
            let settled = inner.rounds.get(&current).map_or(false, |r| r.meta.settled);
            if !settled {
                return Err(Self::revert("current round not settled"));
            }
        }

        let round_id = current + 1;
        let season_id = inner.season_id;
        let start_time = inner.now;
        let end_time = start_time + self.round_duration;

        let matches = (0..MATCHES_PER_ROUND)
            .map(|i| {
                let i = u8::try_from(i).unwrap_or(u8::MAX);
                MatchView {
                    match_index: i,
                    home_team_id: (i * 2) % 20,
                    away_team_id: (i * 2 + 1) % 20,
                    home_score: 0,
                    away_score: 0,
                    outcome: MatchOutcome::Pending,
                    home_odds: U256::from(DEFAULT_ODDS),
                    away_odds: U256::from(DEFAULT_ODDS),
                    draw_odds: U256::from(DEFAULT_ODDS),
                    settled: false,
                }
            })
            .collect();

        inner.rounds.insert(
            round_id,
            SimRound {
                meta: RoundMetadata {
                    round_id,
                    season_id,
                    start_time,
                    end_time,
                    vrf_request_id: None,
                    vrf_fulfilled: false,
                    seeded: false,
                    odds_locked: false,
                    settled: false,
                },
                matches,
            },
        );
        inner.round_id = round_id;

        let outcome = Self::confirm(&mut inner);
        let game_core = self.game_core;
        Self::emit(
            &mut inner,
            game_core,
            &ProtocolEvent::RoundStarted {
                round_id,
                season_id,
                start_time,
                end_time,
            },
        );
        Ok(outcome)
    }

    fn seed_round(&self, round_id: RoundId) -> ChainResult<TxOutcome> {
        let mut inner = self.inner.write();
        let round = inner
            .rounds
            .get_mut(&round_id)
            .ok_or_else(|| Self::revert("unknown round"))?;
        if round.meta.seeded {
            return Err(Self::revert("round already seeded"));
        }
        round.meta.seeded = true;
        round.meta.odds_locked = true;
        Ok(Self::confirm(&mut inner))
    }

    fn request_randomness(&self) -> ChainResult<TxOutcome> {
        let mut inner = self.inner.write();
        let now = inner.now;
        let round_id = inner.round_id;
        let round = inner
            .rounds
            .get_mut(&round_id)
            .ok_or_else(|| Self::revert("no active round"))?;
        if now < round.meta.end_time {
            return Err(Self::revert("betting window still open"));
        }
        if round.meta.vrf_request_id.is_some() {
            return Err(Self::revert("randomness already requested"));
        }

        let request_id = inner.next_request_id;
        inner.next_request_id += 1;
        if let Some(r) = inner.rounds.get_mut(&round_id) {
            r.meta.vrf_request_id = Some(request_id);
        }

        let outcome = Self::confirm(&mut inner);
        let game_core = self.game_core;
        Self::emit(
            &mut inner,
            game_core,
            &ProtocolEvent::RandomnessRequested {
                round_id,
                request_id,
            },
        );
        Ok(outcome)
    }

    fn settle_round(&self, round_id: RoundId, outcomes: &[MatchOutcome]) -> ChainResult<TxOutcome> {
        let mut inner = self.inner.write();
        {
            let round = inner
                .rounds
                .get(&round_id)
                .ok_or_else(|| Self::revert("unknown round"))?;
            if !round.meta.vrf_fulfilled {
                return Err(Self::revert("randomness not fulfilled"));
            }
            if round.meta.settled {
                return Err(Self::revert("round already settled"));
            }
            if outcomes.len() != round.matches.len() {
                return Err(Self::revert("outcome vector length mismatch"));
            }
        }

        // Evaluate every bet of the round against the outcome vector.
        let evaluations: Vec<(BetId, PayoutPreview)> = inner
            .bets
            .values()
            .filter(|b| b.round_id == round_id)
            .map(|b| {
                let won = !b.legs.is_empty()
                    && b.legs
                        .iter()
                        .all(|leg| outcomes.get(usize::from(leg.match_index)) == Some(&leg.predicted));
                let payout = if won {
                    parlay_types::Bet::potential_payout(b.amount, b.bonus, b.parlay_multiplier)
                } else {
                    U256::ZERO
                };
                (b.bet_id, PayoutPreview { won, payout })
            })
            .collect();
        for (bet_id, preview) in evaluations {
            inner.previews.insert(bet_id, preview);
        }

        if let Some(r) = inner.rounds.get_mut(&round_id) {
            r.meta.settled = true;
        }

        let outcome = Self::confirm(&mut inner);
        let game_core = self.game_core;
        Self::emit(&mut inner, game_core, &ProtocolEvent::RoundSettled { round_id });
        Ok(outcome)
    }

    fn sweep_round(&self, round_id: RoundId) -> ChainResult<TxOutcome> {
        let mut inner = self.inner.write();
        {
            let round = inner
                .rounds
                .get(&round_id)
                .ok_or_else(|| Self::revert("unknown round"))?;
            if !round.meta.settled {
                return Err(Self::revert("round not settled"));
            }
        }
        if inner.swept.contains(&round_id) {
            return Err(Self::revert("round already swept"));
        }

        // Unclaimed winning payouts are what the sweep reclaims.
        let remaining: U256 = inner
            .bets
            .values()
            .filter(|b| b.round_id == round_id && !inner.claimed.contains(&b.bet_id))
            .filter_map(|b| inner.previews.get(&b.bet_id))
            .filter(|p| p.won)
            .fold(U256::ZERO, |acc, p| acc.saturating_add(p.payout));
        let season_share = remaining * U256::from(2u64) / U256::from(100u64);
        let protocol_share = remaining - season_share;

        inner.swept.insert(round_id);
        let outcome = Self::confirm(&mut inner);
        let betting_core = self.betting_core;
        Self::emit(
            &mut inner,
            betting_core,
            &ProtocolEvent::RoundPoolSwept {
                round_id,
                remaining_amount: remaining,
                protocol_share,
                season_share,
                tx_hash: outcome.tx_hash,
            },
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventParser;

    const GENESIS: UnixTime = 1_700_000_000;

    fn ledger() -> SimulatedLedger {
        SimulatedLedger::new(900, GENESIS)
    }

    #[test]
    fn test_lifecycle_flags() {
        let sim = ledger();
        assert_eq!(sim.current_season_id().unwrap(), 0);

        sim.start_season().unwrap();
        assert_eq!(sim.current_season_id().unwrap(), 1);
        assert!(sim.start_season().unwrap_err().is_benign());

        sim.start_round().unwrap();
        assert_eq!(sim.current_round_id().unwrap(), 1);
        let meta = sim.round_metadata(1).unwrap();
        assert_eq!(meta.end_time, GENESIS + 900);
        assert!(!meta.seeded);

        sim.seed_round(1).unwrap();
        assert!(sim.round_metadata(1).unwrap().seeded);
        assert!(sim.seed_round(1).unwrap_err().is_benign());
    }

    #[test]
    fn test_randomness_gating() {
        let sim = ledger();
        sim.start_season().unwrap();
        sim.start_round().unwrap();
        sim.seed_round(1).unwrap();

        // Too early: window still open.
        assert!(sim.request_randomness().is_err());

        sim.advance_time(900);
        sim.request_randomness().unwrap();
        assert!(sim.request_randomness().unwrap_err().is_benign());

        let scores: Vec<(u8, u8)> = (0..10).map(|i| (i, 0)).collect();
        sim.fulfill_randomness(&scores).unwrap();
        assert!(sim.round_metadata(1).unwrap().vrf_fulfilled);
    }

    #[test]
    fn test_settlement_evaluates_bets() {
        let sim = ledger();
        sim.start_season().unwrap();
        sim.start_round().unwrap();
        sim.seed_round(1).unwrap();

        let winner = sim
            .place_bet(
                Address::repeat_byte(1),
                vec![BetLeg {
                    match_index: 0,
                    predicted: MatchOutcome::HomeWin,
                }],
                U256::from(100u64),
                U256::ZERO,
                U256::from(parlay_types::bet::MULTIPLIER_SCALE) * U256::from(2u64),
            )
            .unwrap();
        let loser = sim
            .place_bet(
                Address::repeat_byte(2),
                vec![BetLeg {
                    match_index: 0,
                    predicted: MatchOutcome::Draw,
                }],
                U256::from(100u64),
                U256::ZERO,
                U256::from(parlay_types::bet::MULTIPLIER_SCALE),
            )
            .unwrap();

        sim.advance_time(900);
        sim.request_randomness().unwrap();
        sim.fulfill_randomness(&[(2, 1); 10]).unwrap();

        let outcomes: Vec<MatchOutcome> = sim
            .round_matches(1)
            .unwrap()
            .iter()
            .map(|m| m.outcome)
            .collect();
        sim.settle_round(1, &outcomes).unwrap();
        assert!(sim.settle_round(1, &outcomes).unwrap_err().is_benign());

        assert!(sim.payout_preview(winner).unwrap().won);
        assert_eq!(
            sim.payout_preview(winner).unwrap().payout,
            U256::from(200u64)
        );
        assert!(!sim.payout_preview(loser).unwrap().won);
    }

    #[test]
    fn test_emitted_logs_decode() {
        let sim = ledger();
        sim.start_season().unwrap();
        sim.start_round().unwrap();
        let head = sim.block_number().unwrap();
        let logs = sim.logs(sim.game_core, 1, head).unwrap();
        assert_eq!(logs.len(), 1);
        match EventParser::decode(&logs[0]).unwrap() {
            ProtocolEvent::RoundStarted { round_id, .. } => assert_eq!(round_id, 1),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
