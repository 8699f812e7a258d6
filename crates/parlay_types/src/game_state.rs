//! # Derived Game State
//!
//! A snapshot computed fresh on every orchestration tick from live ledger
//! reads plus the cached round. Never persisted - it cannot drift, only its
//! inputs can.

use serde::{Deserialize, Serialize};

use crate::{RoundId, SeasonId};

/// Snapshot of where the protocol lifecycle currently stands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// Current season id on the ledger (0 = no season yet).
    pub current_season_id: SeasonId,
    /// Current round id on the ledger (0 = no round yet).
    pub current_round_id: RoundId,
    /// Whether the current round is settled.
    pub round_settled: bool,
    /// Seconds until the betting window closes, if a round is live.
    pub time_until_round_end: Option<u64>,
    /// Seconds until the next round may start, if in cooldown.
    pub time_until_next_round: Option<u64>,
    /// The betting window elapsed and no randomness request exists yet.
    pub should_request_randomness: bool,
    /// Randomness is fulfilled but the round is not yet settled.
    pub should_settle_round: bool,
}

impl GameState {
    /// True before any season has been started on the ledger.
    #[must_use]
    pub const fn no_season(&self) -> bool {
        self.current_season_id == 0
    }

    /// True when a season exists but no round has been started.
    #[must_use]
    pub const fn no_round(&self) -> bool {
        self.current_season_id > 0 && self.current_round_id == 0
    }
}
