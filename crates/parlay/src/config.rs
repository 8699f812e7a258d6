//! # Runner Configuration
//!
//! One TOML file configures the whole daemon. Every field has a default,
//! so a minimal deployment only sets the two contract addresses and the
//! operator account:
//!
//! ```toml
//! [node]
//! mode = "anvil"
//! from = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
//!
//! [contracts]
//! game_core = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
//! betting_core = "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512"
//! ```
//!
//! Monetary amounts are given in whole tokens and converted to wei here,
//! so the file never carries 18-decimal literals.

use std::path::Path;
use std::time::Duration;

use alloy_primitives::{Address, U256};
use parlay_chain::IpcConfig;
use parlay_monitor::MonitorConfig;
use parlay_rewards::RewardsConfig;
use parlay_sync::SyncConfig;
use serde::Deserialize;
use thiserror::Error;

/// Wei per whole token (18 decimals).
const WEI_PER_TOKEN: u128 = 1_000_000_000_000_000_000;

/// Errors from loading the configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML or has a bad field.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// The node mode string is not one we know.
    #[error("unknown node mode {0:?} (expected geth, reth or anvil)")]
    UnknownMode(String),
}

/// Top-level daemon configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Node transport.
    #[serde(default)]
    pub node: NodeSection,
    /// Deployed contract addresses.
    #[serde(default)]
    pub contracts: ContractsSection,
    /// Event synchronizer tuning.
    #[serde(default)]
    pub sync: SyncSection,
    /// Lifecycle timing.
    #[serde(default)]
    pub monitor: MonitorSection,
    /// Referral and bonus parameters.
    #[serde(default)]
    pub rewards: RewardsSection,
}

/// `[node]` - how to reach the execution client.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeSection {
    /// Execution client flavor: `geth`, `reth` or `anvil`. Picks the
    /// default socket path.
    pub mode: String,
    /// Overrides the mode's default IPC socket path.
    pub socket_path: Option<String>,
    /// Operator account lifecycle transactions are sent from. The node
    /// must hold this account unlocked.
    pub from: Address,
    /// How long to wait for a transaction receipt.
    pub confirm_timeout_secs: u64,
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            mode: "geth".to_string(),
            socket_path: None,
            from: Address::ZERO,
            confirm_timeout_secs: 120,
        }
    }
}

/// `[contracts]` - the deployed protocol addresses.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContractsSection {
    /// Game-core contract (rounds, randomness, settlement).
    pub game_core: Address,
    /// Betting-core contract (bets, claims, sweeps).
    pub betting_core: Address,
}

/// `[sync]` - event ingestion tuning.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncSection {
    /// Maximum blocks scanned per tick.
    pub max_block_range: u64,
    /// Seconds between synchronizer ticks.
    pub poll_interval_secs: u64,
    /// First block to scan on a fresh store; omit to start at the head.
    pub start_block: Option<u64>,
}

impl Default for SyncSection {
    fn default() -> Self {
        let d = SyncConfig::default();
        Self {
            max_block_range: d.max_block_range,
            poll_interval_secs: d.poll_interval_secs,
            start_block: d.start_block,
        }
    }
}

/// `[monitor]` - lifecycle timing. Must mirror the deployed contract
/// revision's constants.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorSection {
    /// Seconds between orchestration ticks.
    pub poll_interval_secs: u64,
    /// Length of a round's betting window.
    pub round_duration_secs: u64,
    /// Cooldown between settlement and the next round.
    pub next_round_delay_secs: u64,
    /// How long winners have to claim after settlement.
    pub claim_deadline_secs: u64,
    /// Extra slack after the claim deadline before sweeping.
    pub sweep_grace_secs: u64,
}

impl Default for MonitorSection {
    fn default() -> Self {
        let d = MonitorConfig::default();
        Self {
            poll_interval_secs: d.poll_interval_secs,
            round_duration_secs: d.round_duration_secs,
            next_round_delay_secs: d.next_round_delay_secs,
            claim_deadline_secs: d.claim_deadline_secs,
            sweep_grace_secs: d.sweep_grace_secs,
        }
    }
}

/// `[rewards]` - referral parameters, amounts in whole tokens.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RewardsSection {
    /// Referrer reward in basis points of the referee's stake.
    pub referral_bps: u32,
    /// Per-bet cap on the referral reward, whole tokens.
    pub max_referral_reward_tokens: u64,
    /// Minimum qualifying stake, whole tokens.
    pub min_bet_for_referral_tokens: u64,
    /// Referee first-bet bonus, whole tokens.
    pub referee_bonus_tokens: u64,
}

impl Default for RewardsSection {
    fn default() -> Self {
        Self {
            referral_bps: 500,
            max_referral_reward_tokens: 50,
            min_bet_for_referral_tokens: 10,
            referee_bonus_tokens: 100,
        }
    }
}

fn tokens(n: u64) -> U256 {
    U256::from(n) * U256::from(WEI_PER_TOKEN)
}

impl AppConfig {
    /// Loads and parses the TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file is unreadable, malformed, or
    /// names an unknown node mode.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)?;
        config.ipc_config()?;
        Ok(config)
    }

    /// Builds the IPC transport configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownMode`] for an unrecognized `node.mode`.
    pub fn ipc_config(&self) -> Result<IpcConfig, ConfigError> {
        let mut ipc = match self.node.mode.as_str() {
            "geth" => IpcConfig::geth(),
            "reth" => IpcConfig::reth(),
            "anvil" => IpcConfig::anvil(),
            other => return Err(ConfigError::UnknownMode(other.to_string())),
        };
        if let Some(path) = &self.node.socket_path {
            ipc = ipc.with_socket_path(path.clone());
        }
        ipc = ipc
            .with_contracts(self.contracts.game_core, self.contracts.betting_core)
            .with_from(self.node.from);
        ipc.confirm_timeout = Duration::from_secs(self.node.confirm_timeout_secs);
        Ok(ipc)
    }

    /// Builds the synchronizer configuration.
    #[must_use]
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            game_core: self.contracts.game_core,
            betting_core: self.contracts.betting_core,
            max_block_range: self.sync.max_block_range,
            poll_interval_secs: self.sync.poll_interval_secs,
            start_block: self.sync.start_block,
        }
    }

    /// Builds the lifecycle monitor configuration.
    #[must_use]
    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            poll_interval_secs: self.monitor.poll_interval_secs,
            round_duration_secs: self.monitor.round_duration_secs,
            next_round_delay_secs: self.monitor.next_round_delay_secs,
            claim_deadline_secs: self.monitor.claim_deadline_secs,
            sweep_grace_secs: self.monitor.sweep_grace_secs,
        }
    }

    /// Builds the reward ledger configuration, converting tokens to wei.
    #[must_use]
    pub fn rewards_config(&self) -> RewardsConfig {
        RewardsConfig {
            referral_bps: self.rewards.referral_bps,
            max_referral_reward: tokens(self.rewards.max_referral_reward_tokens),
            min_bet_for_referral: tokens(self.rewards.min_bet_for_referral_tokens),
            referee_bonus: tokens(self.rewards.referee_bonus_tokens),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.node.mode, "geth");
        assert_eq!(config.sync.max_block_range, 2_000);
        assert_eq!(config.monitor.round_duration_secs, 3 * 60 * 60);
        assert_eq!(config.rewards.referral_bps, 500);
    }

    #[test]
    fn test_full_file_parses() {
        let text = r#"
            [node]
            mode = "anvil"
            socket_path = "/tmp/custom.ipc"
            from = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
            confirm_timeout_secs = 60

            [contracts]
            game_core = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
            betting_core = "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512"

            [sync]
            max_block_range = 500
            poll_interval_secs = 5
            start_block = 1

            [monitor]
            poll_interval_secs = 15
            round_duration_secs = 900
            next_round_delay_secs = 60
            claim_deadline_secs = 3600
            sweep_grace_secs = 600

            [rewards]
            referral_bps = 250
            max_referral_reward_tokens = 25
            min_bet_for_referral_tokens = 5
            referee_bonus_tokens = 50
        "#;
        let config: AppConfig = toml::from_str(text).unwrap();

        let ipc = config.ipc_config().unwrap();
        assert_eq!(ipc.socket_path, "/tmp/custom.ipc");
        assert_eq!(ipc.confirm_timeout, Duration::from_secs(60));
        assert_eq!(ipc.game_core, config.contracts.game_core);

        let sync = config.sync_config();
        assert_eq!(sync.max_block_range, 500);
        assert_eq!(sync.start_block, Some(1));

        let rewards = config.rewards_config();
        assert_eq!(rewards.referral_bps, 250);
        assert_eq!(rewards.max_referral_reward, tokens(25));
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let config: AppConfig = toml::from_str("[node]\nmode = \"besu\"\nfrom = \"0x0000000000000000000000000000000000000000\"\nconfirm_timeout_secs = 120\n").unwrap();
        assert!(matches!(
            config.ipc_config(),
            Err(ConfigError::UnknownMode(_))
        ));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = toml::from_str::<AppConfig>("[sync]\nmax_block_rnage = 100\n");
        assert!(err.is_err());
    }
}
