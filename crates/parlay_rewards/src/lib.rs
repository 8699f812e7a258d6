//! # PARLAY Reward Ledger
//!
//! Off-chain bookkeeping invoked by the event synchronizer:
//!
//! - referral rewards per qualifying bet (bps of stake, capped)
//! - first-qualifying-bet referee bonus eligibility
//! - testnet points for placing and winning bets
//! - mirrors of ledger-side bounty claims and pool sweeps
//!
//! Everything here is computation plus idempotent store writes. The ledger
//! pays bounties and sweep splits itself; referral payouts are an external
//! batch job reading the earning rows this crate appends.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod ledger;

pub use config::RewardsConfig;
pub use error::{RewardError, RewardResult};
pub use ledger::{referral_reward, ReferralStats, RewardLedger};
