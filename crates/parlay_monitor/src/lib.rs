//! # PARLAY Lifecycle Orchestrator
//!
//! Drives the ledger through its round lifecycle on a polling cadence:
//!
//! ```text
//! NoSeason ──▶ SeasonActive,NoRound ──▶ BettingOpen ──▶ BettingClosed
//!                                           ▲               │ request
//!                                           │               ▼
//!                                      cooldown ◀── Settled ◀── Fulfilled
//! ```
//!
//! There is no on-chain scheduler: every transition happens because a tick
//! observed the preceding state and issued the next write. Ticks are
//! stateless except for the settlement cooldown pair; everything else is
//! re-derived from the ledger each time, which is what makes restarts and
//! missed transitions recoverable.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod monitor;

pub use config::MonitorConfig;
pub use error::{MonitorError, MonitorResult, Stage};
pub use monitor::{CooldownState, Monitor};
