//! # Runtime Assembly and Read API
//!
//! [`Runtime`] owns one of everything: the shared store, the ledger
//! client, the synchronizer, the monitor and a reward ledger for read
//! queries. The daemon drives `sync()` and `monitor()` from its loops;
//! the snapshot methods serve operator tooling.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use alloy_primitives::Address;
use parlay_chain::{IpcLedgerClient, LedgerClient};
use parlay_monitor::{Monitor, MonitorResult};
use parlay_rewards::{ReferralStats, RewardLedger, RewardResult};
use parlay_store::{MemoryStore, Store, StoreResult};
use parlay_sync::EventSynchronizer;
use parlay_types::{
    Bet, GameState, Match, Round, RoundId, UnixTime, UserPoints,
};

use crate::config::{AppConfig, ConfigError};

/// Operator-facing status snapshot.
#[derive(Clone, Debug)]
pub struct StatusReport {
    /// Current lifecycle state, derived live.
    pub game_state: GameState,
    /// Last block the synchronizer fully processed.
    pub last_processed_block: Option<u64>,
    /// Synchronizer ticks executed.
    pub sync_polls: u64,
    /// Decoded events applied since startup.
    pub events_applied: u64,
    /// Handler failures since startup.
    pub handler_errors: u64,
}

/// Everything known about one round.
#[derive(Clone, Debug)]
pub struct RoundDetail {
    /// The round row.
    pub round: Round,
    /// Its matches, ordered by index.
    pub matches: Vec<Match>,
    /// Bets placed in it.
    pub bets: Vec<Bet>,
}

/// The assembled orchestrator.
pub struct Runtime {
    store: Arc<dyn Store>,
    client: Arc<dyn LedgerClient>,
    sync: EventSynchronizer,
    monitor: Monitor,
    rewards: RewardLedger,
}

impl Runtime {
    /// Assembles the runtime against a live node per the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the node section is invalid. The IPC
    /// socket is connected lazily, so an unreachable node surfaces on the
    /// first tick, not here.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let client: Arc<dyn LedgerClient> =
            Arc::new(IpcLedgerClient::new(config.ipc_config()?));
        Ok(Self::with_client(client, config))
    }

    /// Assembles the runtime over an injected client. Tests use this with
    /// the simulated ledger.
    #[must_use]
    pub fn with_client(client: Arc<dyn LedgerClient>, config: &AppConfig) -> Self {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let rewards_config = config.rewards_config();
        let sync = EventSynchronizer::new(
            Arc::clone(&client),
            Arc::clone(&store),
            RewardLedger::new(Arc::clone(&store), rewards_config.clone()),
            config.sync_config(),
        );
        let monitor = Monitor::new(
            Arc::clone(&client),
            Arc::clone(&store),
            config.monitor_config(),
        );
        let rewards = RewardLedger::new(Arc::clone(&store), rewards_config);
        Self {
            store,
            client,
            sync,
            monitor,
            rewards,
        }
    }

    /// The event synchronizer.
    #[must_use]
    pub fn sync(&self) -> &EventSynchronizer {
        &self.sync
    }

    /// The lifecycle monitor.
    #[must_use]
    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    /// The shared store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// The reward ledger, for referral registration and queries.
    #[must_use]
    pub fn rewards(&self) -> &RewardLedger {
        &self.rewards
    }

    /// The ledger client.
    #[must_use]
    pub fn client(&self) -> &Arc<dyn LedgerClient> {
        &self.client
    }

    /// Builds the operator status snapshot.
    ///
    /// # Errors
    ///
    /// Surfaces ledger read failures from state derivation.
    pub fn status(&self, now: UnixTime) -> MonitorResult<StatusReport> {
        let game_state = self.monitor.game_state(now)?;
        let last_processed_block = self.store.last_processed_block()?;
        let stats = self.sync.stats();
        Ok(StatusReport {
            game_state,
            last_processed_block,
            sync_polls: stats.polls.load(Ordering::Relaxed),
            events_applied: stats.events_applied.load(Ordering::Relaxed),
            handler_errors: stats.handler_errors.load(Ordering::Relaxed),
        })
    }

    /// Everything cached about one round, `None` if it was never synced.
    ///
    /// # Errors
    ///
    /// Surfaces store failures.
    pub fn round_detail(&self, round_id: RoundId) -> StoreResult<Option<RoundDetail>> {
        let Some(round) = self.store.round(round_id)? else {
            return Ok(None);
        };
        Ok(Some(RoundDetail {
            round,
            matches: self.store.matches_by_round(round_id)?,
            bets: self.store.bets_by_round(round_id)?,
        }))
    }

    /// Top point earners, largest first.
    ///
    /// # Errors
    ///
    /// Surfaces store failures.
    pub fn leaderboard(&self, limit: usize) -> StoreResult<Vec<(Address, UserPoints)>> {
        self.store.leaderboard(limit)
    }

    /// Referral summary for one referrer wallet.
    ///
    /// # Errors
    ///
    /// Surfaces store failures.
    pub fn referral_summary(&self, referrer: Address) -> RewardResult<ReferralStats> {
        self.rewards.referral_stats(referrer)
    }
}
