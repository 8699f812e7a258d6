//! Reward parameters. Everything revision-dependent is a field with a
//! default, never a literal inside the logic.

use alloy_primitives::U256;

/// Wei per whole token (18 decimals).
const WEI_PER_TOKEN: u128 = 1_000_000_000_000_000_000;

/// Referral and bonus parameters.
#[derive(Clone, Debug)]
pub struct RewardsConfig {
    /// Referrer reward in basis points of the referee's stake.
    pub referral_bps: u32,
    /// Per-bet cap on the referral reward, in wei.
    pub max_referral_reward: U256,
    /// Minimum stake for a bet to qualify for referral processing, in wei.
    pub min_bet_for_referral: U256,
    /// Flat bonus a referee is eligible for after their first qualifying
    /// bet, in wei. Eligibility is recorded here; payout happens elsewhere.
    pub referee_bonus: U256,
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            referral_bps: 500,
            max_referral_reward: U256::from(50u64) * U256::from(WEI_PER_TOKEN),
            min_bet_for_referral: U256::from(10u64) * U256::from(WEI_PER_TOKEN),
            referee_bonus: U256::from(100u64) * U256::from(WEI_PER_TOKEN),
        }
    }
}
