//! # Rounds and Matches
//!
//! A round is one cycle of parallel matches: seeded with virtual liquidity,
//! open for bets until its end time, resolved by a randomness fulfilment,
//! then settled. Rounds are append-only history - never deleted.

use serde::{Deserialize, Serialize};

use crate::{outcome::MatchOutcome, RoundId, SeasonId, UnixTime};

/// A betting round, mirrored from the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    /// Ledger-assigned monotonic id.
    pub round_id: RoundId,
    /// Season this round belongs to.
    pub season_id: SeasonId,
    /// When the round started.
    pub start_time: UnixTime,
    /// When the betting window closes.
    pub end_time: UnixTime,
    /// Randomness request handle, once requested.
    pub vrf_request_id: Option<u64>,
    /// When the randomness request was fulfilled.
    pub vrf_fulfilled_at: Option<UnixTime>,
    /// Whether the round's pools were seeded with virtual liquidity.
    pub seeded: bool,
    /// When seeding happened.
    pub seeded_at: Option<UnixTime>,
    /// Whether odds are locked for betting.
    pub odds_locked: bool,
    /// When odds were locked.
    pub odds_locked_at: Option<UnixTime>,
    /// Whether the round has been settled.
    pub settled: bool,
    /// When settlement happened.
    pub settled_at: Option<UnixTime>,
    /// Whether betting is still allowed.
    pub is_active: bool,
}

impl Round {
    /// Creates a freshly started, unsettled round.
    #[must_use]
    pub const fn started(
        round_id: RoundId,
        season_id: SeasonId,
        start_time: UnixTime,
        end_time: UnixTime,
    ) -> Self {
        Self {
            round_id,
            season_id,
            start_time,
            end_time,
            vrf_request_id: None,
            vrf_fulfilled_at: None,
            seeded: false,
            seeded_at: None,
            odds_locked: false,
            odds_locked_at: None,
            settled: false,
            settled_at: None,
            is_active: true,
        }
    }

    /// Seconds until the betting window closes, zero once elapsed.
    #[must_use]
    pub const fn time_until_end(&self, now: UnixTime) -> u64 {
        self.end_time.saturating_sub(now)
    }

    /// Returns true while bets are accepted.
    #[must_use]
    pub const fn betting_open(&self, now: UnixTime) -> bool {
        self.is_active && !self.settled && now < self.end_time
    }

    /// Checks the round's structural invariants.
    ///
    /// `settled` forces `!is_active`, and a fulfilment timestamp requires a
    /// request id. Violations indicate a bug in a writer, not bad input.
    #[must_use]
    pub const fn invariants_hold(&self) -> bool {
        let settled_ok = !self.settled || !self.is_active;
        let vrf_ok = self.vrf_fulfilled_at.is_none() || self.vrf_request_id.is_some();
        settled_ok && vrf_ok
    }
}

/// One match inside a round, identified by `(round_id, match_index)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// Round this match belongs to.
    pub round_id: RoundId,
    /// Position inside the round, `0..MATCHES_PER_ROUND`.
    pub match_index: u8,
    /// Home team id in the fixed league table.
    pub home_team_id: u8,
    /// Away team id in the fixed league table.
    pub away_team_id: u8,
    /// Display name of the home team.
    pub home_team_name: String,
    /// Display name of the away team.
    pub away_team_name: String,
    /// Home score, set on fulfilment.
    pub home_score: Option<u8>,
    /// Away score, set on fulfilment.
    pub away_score: Option<u8>,
    /// Decided-once match outcome.
    pub outcome: MatchOutcome,
    /// Locked odds snapshot (home, away, draw), 1e18-scaled.
    pub home_odds: Option<alloy_primitives::U256>,
    /// Away odds at lock time.
    pub away_odds: Option<alloy_primitives::U256>,
    /// Draw odds at lock time.
    pub draw_odds: Option<alloy_primitives::U256>,
    /// Whether the match result is final.
    pub settled: bool,
    /// When the match settled.
    pub settled_at: Option<UnixTime>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round() -> Round {
        Round::started(1, 1, 1_000, 1_900)
    }

    #[test]
    fn test_betting_window() {
        let r = round();
        assert!(r.betting_open(1_000));
        assert!(r.betting_open(1_899));
        assert!(!r.betting_open(1_900));
        assert_eq!(r.time_until_end(1_000), 900);
        assert_eq!(r.time_until_end(2_500), 0);
    }

    #[test]
    fn test_invariants() {
        let mut r = round();
        assert!(r.invariants_hold());

        // Settled round must be inactive.
        r.settled = true;
        assert!(!r.invariants_hold());
        r.is_active = false;
        assert!(r.invariants_hold());

        // Fulfilment without a request id is a writer bug.
        r.vrf_fulfilled_at = Some(2_000);
        assert!(!r.invariants_hold());
        r.vrf_request_id = Some(42);
        assert!(r.invariants_hold());
    }
}
