//! # PARLAY Domain Model
//!
//! Canonical types shared by the synchronizer, the orchestrator and the
//! reward ledger.
//!
//! ## Ownership
//!
//! The ledger is the source of truth for everything these types mirror.
//! The local store is a cache plus an append-only side ledger for rewards
//! that have no on-chain record. Types here carry the invariants; the
//! components enforce them.
//!
//! ## Invariants
//!
//! - A settled round is never active.
//! - `vrf_fulfilled_at` is set only when `vrf_request_id` is set.
//! - A bet status never leaves a terminal state.
//! - A match outcome decides exactly once.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod bet;
pub mod game_state;
pub mod outcome;
pub mod points;
pub mod referral;
pub mod round;
pub mod teams;

pub use bet::{Bet, BetLeg, BetStatus};
pub use game_state::GameState;
pub use outcome::MatchOutcome;
pub use points::{PointsEntry, PointsReason, UserPoints};
pub use referral::{BountyClaim, ReferralEarning, ReferralLink, RoundSweep};
pub use round::{Match, Round};
pub use teams::team_name;

/// Unix timestamp in seconds.
pub type UnixTime = u64;

/// Ledger-assigned round identifier (monotonic, starts at 1).
pub type RoundId = u64;

/// Ledger-assigned season identifier (monotonic, starts at 1).
pub type SeasonId = u64;

/// Ledger-assigned, globally unique bet identifier.
pub type BetId = u64;

/// Number of parallel matches in every round.
pub const MATCHES_PER_ROUND: usize = 10;
