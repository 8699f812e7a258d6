//! # Lifecycle Monitor
//!
//! One `tick` per polling interval: derive a fresh [`GameState`] from the
//! ledger, then issue whichever transition the state calls for. Every
//! write re-checks its "already done" flag immediately before submission
//! and treats the ledger's "already done" revert as success, so overlapping
//! ticks, restarts and a concurrently running second orchestrator all
//! converge instead of double-submitting.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use parlay_chain::{ChainResult, LedgerClient, TxOutcome};
use parlay_store::{RoundUpdate, Store};
use parlay_types::{GameState, MatchOutcome, RoundId, UnixTime};

use crate::config::MonitorConfig;
use crate::error::{MonitorError, MonitorResult, Stage};

/// Tracking pair for the inter-round cooldown.
///
/// Recorded when settlement is observed; cleared when the next round
/// starts. Survives only in memory - after a restart it is re-derived from
/// the cached round's settlement timestamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CooldownState {
    /// The settled round the cooldown runs against.
    pub round_id: RoundId,
    /// When settlement was observed.
    pub settled_at: UnixTime,
}

/// The round lifecycle orchestrator.
pub struct Monitor {
    client: Arc<dyn LedgerClient>,
    store: Arc<dyn Store>,
    config: MonitorConfig,
    cooldown: Mutex<Option<CooldownState>>,
    initializing: AtomicBool,
}

impl Monitor {
    /// Creates a monitor over the shared client and store.
    pub fn new(client: Arc<dyn LedgerClient>, store: Arc<dyn Store>, config: MonitorConfig) -> Self {
        Self {
            client,
            store,
            config,
            cooldown: Mutex::new(None),
            initializing: AtomicBool::new(false),
        }
    }

    /// Whether the startup bootstrap is still in flight.
    #[must_use]
    pub fn is_initializing(&self) -> bool {
        self.initializing.load(Ordering::Relaxed)
    }

    /// Derives the current lifecycle snapshot.
    ///
    /// Season/round ids and round flags come from live ledger reads - the
    /// ledger may auto-advance between polls, so the cache is never
    /// authoritative for them. The cache only contributes the settlement
    /// timestamp for cooldown math.
    ///
    /// # Errors
    ///
    /// Surfaces ledger read failures; the caller retries next tick.
    pub fn game_state(&self, now: UnixTime) -> MonitorResult<GameState> {
        let current_season_id = self.client.current_season_id()?;
        let current_round_id = self.client.current_round_id()?;
        let mut state = GameState {
            current_season_id,
            current_round_id,
            ..GameState::default()
        };
        if current_round_id == 0 {
            return Ok(state);
        }

        let meta = self.client.round_metadata(current_round_id)?;
        state.round_settled = meta.settled;
        if meta.settled {
            let settled_at = self.settled_at(current_round_id, now)?;
            state.time_until_next_round = Some(
                self.config
                    .next_round_delay_secs
                    .saturating_sub(now.saturating_sub(settled_at)),
            );
        } else {
            let remaining = meta.end_time.saturating_sub(now);
            state.time_until_round_end = Some(remaining);
            state.should_request_randomness = remaining == 0 && meta.vrf_request_id.is_none();
            state.should_settle_round = meta.vrf_fulfilled;
        }
        Ok(state)
    }

    /// Runs the startup bootstrap: for a fresh deployment start the season,
    /// the first round and its seeding; for a resumed one, verify the
    /// current round is seeded. The periodic tick is suppressed while this
    /// runs so the two paths cannot race to create the same round.
    ///
    /// # Errors
    ///
    /// Surfaces the first failed stage; the guard is released either way.
    pub fn bootstrap(&self, now: UnixTime) -> MonitorResult<Vec<Stage>> {
        self.initializing.store(true, Ordering::SeqCst);
        let result = self.bootstrap_inner(now);
        self.initializing.store(false, Ordering::SeqCst);
        result
    }

    fn bootstrap_inner(&self, now: UnixTime) -> MonitorResult<Vec<Stage>> {
        let state = self.game_state(now)?;
        let mut actions = Vec::new();

        if state.no_season() {
            tracing::warn!("fresh deployment, starting season and first round");
            if self.ensure(Stage::StartSeason, false, || self.client.start_season())? {
                actions.push(Stage::StartSeason);
            }
        }
        if self.client.current_round_id()? == 0 {
            if self.ensure(Stage::StartRound, false, || self.client.start_round())? {
                actions.push(Stage::StartRound);
            }
        }

        // Seed check: covers both a round just started above and a round
        // left unseeded by a previous run.
        let round_id = self.client.current_round_id()?;
        if round_id != 0 && self.ensure_seeded(round_id)? {
            actions.push(Stage::SeedRound);
        }

        tracing::info!(?actions, "bootstrap complete");
        Ok(actions)
    }

    /// Runs one orchestration tick, returning the stages acted on.
    ///
    /// # Errors
    ///
    /// The first non-benign failure aborts the tick with its stage name;
    /// the caller logs it and retries on the next interval. Nothing is
    /// retried within the same tick.
    pub fn tick(&self, now: UnixTime) -> MonitorResult<Vec<Stage>> {
        if self.is_initializing() {
            tracing::debug!("bootstrap in flight, skipping tick");
            return Ok(Vec::new());
        }

        let state = self.game_state(now)?;
        let mut actions = Vec::new();

        if state.no_season() {
            // Sequential: round creation is rejected until the season
            // confirms, and seeding until the round does.
            if self.ensure(Stage::StartSeason, false, || self.client.start_season())? {
                actions.push(Stage::StartSeason);
            }
            if self.ensure(
                Stage::StartRound,
                self.client.current_round_id()? != 0,
                || self.client.start_round(),
            )? {
                actions.push(Stage::StartRound);
            }
            let round_id = self.client.current_round_id()?;
            if round_id != 0 && self.ensure_seeded(round_id)? {
                actions.push(Stage::SeedRound);
            }
            return Ok(actions);
        }

        if state.no_round() {
            tracing::warn!("season active but no round, starting one");
            if self.ensure(Stage::StartRound, false, || self.client.start_round())? {
                actions.push(Stage::StartRound);
            }
            let round_id = self.client.current_round_id()?;
            if round_id != 0 && self.ensure_seeded(round_id)? {
                actions.push(Stage::SeedRound);
            }
            return Ok(actions);
        }

        let round_id = state.current_round_id;

        if state.time_until_round_end == Some(0) {
            self.close_betting_window(round_id, now)?;
        }

        if state.should_request_randomness {
            // Re-read the request flag right before submitting.
            let meta = self.client.round_metadata(round_id)?;
            if self.ensure(Stage::RequestRandomness, meta.vrf_request_id.is_some(), || {
                self.client.request_randomness()
            })? {
                actions.push(Stage::RequestRandomness);
            }
        }

        if state.should_settle_round {
            let meta = self.client.round_metadata(round_id)?;
            if !meta.settled {
                // Settlement takes the outcome vector we observed; it is
                // not parameterless on the ledger side.
                let outcomes: Vec<MatchOutcome> = self
                    .client
                    .round_matches(round_id)?
                    .iter()
                    .map(|m| m.outcome)
                    .collect();
                if self.ensure(Stage::SettleRound, false, || {
                    self.client.settle_round(round_id, &outcomes)
                })? {
                    actions.push(Stage::SettleRound);
                    *self.cooldown.lock() = Some(CooldownState {
                        round_id,
                        settled_at: now,
                    });
                }
            }
        }

        if state.round_settled {
            let settled_at = self.settled_at(round_id, now)?;
            let elapsed = now.saturating_sub(settled_at);
            if elapsed >= self.config.next_round_delay_secs {
                actions.extend(self.advance_to_next_round(round_id)?);
            } else {
                tracing::debug!(
                    round_id,
                    remaining = self.config.next_round_delay_secs - elapsed,
                    "inter-round cooldown running"
                );
            }
        }

        actions.extend(self.sweep_due_rounds(now)?);
        Ok(actions)
    }

    /// Starts and seeds the round after a completed cooldown.
    fn advance_to_next_round(&self, settled_round: RoundId) -> MonitorResult<Vec<Stage>> {
        let mut actions = Vec::new();
        let current = self.client.current_round_id()?;
        if current > settled_round {
            // Another writer already advanced; just verify seeding.
            *self.cooldown.lock() = None;
            if self.ensure_seeded(current)? {
                actions.push(Stage::SeedRound);
            }
            return Ok(actions);
        }

        tracing::info!(settled_round, "cooldown elapsed, starting next round");
        if self.ensure(Stage::StartRound, false, || self.client.start_round())? {
            actions.push(Stage::StartRound);
            *self.cooldown.lock() = None;
            let new_round = self.client.current_round_id()?;
            if new_round > settled_round && self.ensure_seeded(new_round)? {
                actions.push(Stage::SeedRound);
            }
        }
        Ok(actions)
    }

    /// Marks the cached round inactive once its betting window elapses.
    fn close_betting_window(&self, round_id: RoundId, now: UnixTime) -> MonitorResult<()> {
        if let Some(round) = self.store.round(round_id)? {
            if round.is_active {
                self.store.update_round(
                    round_id,
                    RoundUpdate {
                        is_active: Some(false),
                        end_time: Some(now),
                        ..RoundUpdate::default()
                    },
                )?;
                tracing::info!(round_id, "betting window ended");
            }
        }
        Ok(())
    }

    /// Sweeps settled rounds whose claim deadline plus grace has passed.
    ///
    /// The unswept set comes from the cache; the ledger rejects a repeat
    /// sweep benignly, so a not-yet-mirrored sweep event cannot cause harm.
    fn sweep_due_rounds(&self, now: UnixTime) -> MonitorResult<Vec<Stage>> {
        let deadline = self.config.claim_deadline_secs + self.config.sweep_grace_secs;
        let mut actions = Vec::new();
        for round in self.store.settled_unswept_rounds()? {
            let Some(settled_at) = round.settled_at else {
                continue;
            };
            if now.saturating_sub(settled_at) < deadline {
                continue;
            }
            tracing::info!(round_id = round.round_id, "claim deadline passed, sweeping pool");
            if self.ensure(Stage::SweepRound, false, || {
                self.client.sweep_round(round.round_id)
            })? {
                actions.push(Stage::SweepRound);
            }
        }
        Ok(actions)
    }

    /// Seeds a round unless the ledger already reports it seeded.
    fn ensure_seeded(&self, round_id: RoundId) -> MonitorResult<bool> {
        let meta = self.client.round_metadata(round_id)?;
        self.ensure(Stage::SeedRound, meta.seeded, || {
            self.client.seed_round(round_id)
        })
    }

    /// The idempotent transition step: skip when the re-checked flag says
    /// the work is done, submit otherwise, and accept the ledger's
    /// "already done" revert as success (someone else won the race).
    fn ensure<F>(&self, stage: Stage, already_done: bool, submit: F) -> MonitorResult<bool>
    where
        F: FnOnce() -> ChainResult<TxOutcome>,
    {
        if already_done {
            tracing::debug!(stage = stage.as_str(), "already done, skipping");
            return Ok(false);
        }
        match submit() {
            Ok(outcome) => {
                tracing::info!(
                    stage = stage.as_str(),
                    tx_hash = %outcome.tx_hash,
                    block = outcome.block_number,
                    "transition confirmed"
                );
                Ok(true)
            }
            Err(e) if e.is_benign() => {
                tracing::info!(stage = stage.as_str(), reason = %e, "ledger reports already done");
                Ok(true)
            }
            Err(source) => Err(MonitorError::Write { stage, source }),
        }
    }

    /// Settlement timestamp for cooldown math: the in-memory pair if it
    /// matches, else the cached round, else observed-now (restart during
    /// cooldown restarts the delay, which only lengthens it).
    fn settled_at(&self, round_id: RoundId, now: UnixTime) -> MonitorResult<UnixTime> {
        {
            let guard = self.cooldown.lock();
            if let Some(c) = guard.as_ref() {
                if c.round_id == round_id {
                    return Ok(c.settled_at);
                }
            }
        }
        let settled_at = self
            .store
            .round(round_id)?
            .and_then(|r| r.settled_at)
            .unwrap_or(now);
        *self.cooldown.lock() = Some(CooldownState {
            round_id,
            settled_at,
        });
        Ok(settled_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlay_chain::SimulatedLedger;
    use parlay_store::MemoryStore;
    use parlay_types::Round;

    const GENESIS: UnixTime = 1_700_000_000;
    const ROUND_SECS: u64 = 900;
    const DELAY_SECS: u64 = 1_200;

    struct Rig {
        sim: Arc<SimulatedLedger>,
        store: Arc<MemoryStore>,
        monitor: Monitor,
    }

    fn rig() -> Rig {
        let sim = Arc::new(SimulatedLedger::new(ROUND_SECS, GENESIS));
        let store = Arc::new(MemoryStore::new());
        let monitor = Monitor::new(
            sim.clone(),
            store.clone(),
            MonitorConfig {
                poll_interval_secs: 30,
                round_duration_secs: ROUND_SECS,
                next_round_delay_secs: DELAY_SECS,
                claim_deadline_secs: 3_600,
                sweep_grace_secs: 600,
            },
        );
        Rig { sim, store, monitor }
    }

    #[test]
    fn test_bootstrap_fresh_deployment() {
        let r = rig();
        let actions = r.monitor.bootstrap(GENESIS).unwrap();
        assert_eq!(
            actions,
            vec![Stage::StartSeason, Stage::StartRound, Stage::SeedRound]
        );
        assert_eq!(r.sim.current_season_id().unwrap(), 1);
        assert_eq!(r.sim.current_round_id().unwrap(), 1);
        assert!(r.sim.round_metadata(1).unwrap().seeded);
        assert!(!r.monitor.is_initializing());
    }

    #[test]
    fn test_bootstrap_resumed_deployment_only_seeds() {
        let r = rig();
        r.sim.start_season().unwrap();
        r.sim.start_round().unwrap();

        let actions = r.monitor.bootstrap(GENESIS).unwrap();
        assert_eq!(actions, vec![Stage::SeedRound]);

        // Fully set up: bootstrap is a no-op.
        let actions = r.monitor.bootstrap(GENESIS).unwrap();
        assert!(actions.is_empty());
    }

    #[test]
    fn test_tick_suppressed_while_initializing() {
        let r = rig();
        r.monitor.initializing.store(true, Ordering::SeqCst);
        assert!(r.monitor.tick(GENESIS).unwrap().is_empty());
        assert_eq!(r.sim.current_season_id().unwrap(), 0);
    }

    #[test]
    fn test_steady_state_no_action() {
        let r = rig();
        r.monitor.bootstrap(GENESIS).unwrap();
        let state = r.monitor.game_state(GENESIS + 10).unwrap();
        assert_eq!(state.time_until_round_end, Some(ROUND_SECS - 10));
        assert!(!state.should_request_randomness);
        assert!(r.monitor.tick(GENESIS + 10).unwrap().is_empty());
    }

    #[test]
    fn test_randomness_requested_exactly_once() {
        let r = rig();
        r.monitor.bootstrap(GENESIS).unwrap();
        r.sim.advance_time(ROUND_SECS);
        let now = r.sim.now();

        let state = r.monitor.game_state(now).unwrap();
        assert!(state.should_request_randomness);

        let actions = r.monitor.tick(now).unwrap();
        assert_eq!(actions, vec![Stage::RequestRandomness]);
        assert!(r.sim.round_metadata(1).unwrap().vrf_request_id.is_some());

        // Request flag now set on the ledger: no duplicate.
        assert!(r.monitor.tick(now).unwrap().is_empty());
    }

    #[test]
    fn test_settle_then_cooldown_then_next_round() {
        let r = rig();
        r.monitor.bootstrap(GENESIS).unwrap();
        r.sim.advance_time(ROUND_SECS);
        r.monitor.tick(r.sim.now()).unwrap();
        r.sim.fulfill_randomness(&[(1, 0); 10]).unwrap();

        let actions = r.monitor.tick(r.sim.now()).unwrap();
        assert_eq!(actions, vec![Stage::SettleRound]);
        assert!(r.sim.round_metadata(1).unwrap().settled);

        // Cooldown holds: no new round before the delay elapses.
        r.sim.advance_time(DELAY_SECS - 1);
        assert!(r.monitor.tick(r.sim.now()).unwrap().is_empty());
        assert_eq!(r.sim.current_round_id().unwrap(), 1);

        r.sim.advance_time(1);
        let actions = r.monitor.tick(r.sim.now()).unwrap();
        assert_eq!(actions, vec![Stage::StartRound, Stage::SeedRound]);
        assert_eq!(r.sim.current_round_id().unwrap(), 2);
        assert!(r.sim.round_metadata(2).unwrap().seeded);
    }

    #[test]
    fn test_betting_window_bookkeeping() {
        let r = rig();
        r.monitor.bootstrap(GENESIS).unwrap();
        // Cache the round the way the synchronizer would.
        r.store
            .save_round(Round::started(1, 1, GENESIS, GENESIS + ROUND_SECS))
            .unwrap();

        r.sim.advance_time(ROUND_SECS);
        r.monitor.tick(r.sim.now()).unwrap();

        let round = r.store.round(1).unwrap().unwrap();
        assert!(!round.is_active);
    }

    #[test]
    fn test_sweep_after_deadline_and_grace() {
        let r = rig();
        r.monitor.bootstrap(GENESIS).unwrap();
        r.sim.advance_time(ROUND_SECS);
        r.monitor.tick(r.sim.now()).unwrap();
        r.sim.fulfill_randomness(&[(1, 0); 10]).unwrap();
        r.monitor.tick(r.sim.now()).unwrap();

        // Cache the settled round the way the synchronizer would.
        let mut round = Round::started(1, 1, GENESIS, GENESIS + ROUND_SECS);
        round.settled = true;
        round.is_active = false;
        round.settled_at = Some(r.sim.now());
        r.store.save_round(round).unwrap();

        // Inside deadline + grace: nothing to sweep.
        r.sim.advance_time(3_600);
        let actions = r.monitor.tick(r.sim.now()).unwrap();
        assert!(!actions.contains(&Stage::SweepRound));

        r.sim.advance_time(601);
        let actions = r.monitor.tick(r.sim.now()).unwrap();
        assert!(actions.contains(&Stage::SweepRound));
        // The ledger rejects a repeat sweep benignly.
        assert!(r.sim.sweep_round(1).unwrap_err().is_benign());
    }
}
