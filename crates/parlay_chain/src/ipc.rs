//! # IPC (Unix Socket) Ledger Client
//!
//! Connects directly to a local Geth/Reth/Anvil node over its IPC socket.
//! No cloud RPC: the orchestrator runs next to its own node and a Unix
//! domain socket round-trip costs microseconds, not milliseconds.
//!
//! ## Default Paths
//!
//! - Geth: `~/.ethereum/geth.ipc`
//! - Reth: `~/.local/share/reth/mainnet/reth.ipc`
//! - Anvil: `/tmp/anvil.ipc` (with `--ipc` flag)
//!
//! The client holds one stream behind a mutex and speaks line-delimited
//! JSON-RPC. A broken stream is dropped and reconnected on the next call;
//! the failed call itself surfaces as a transient [`ChainError::Transport`].

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use alloy_primitives::{hex, keccak256, Address, TxHash, B256, U256};
use parking_lot::Mutex;
use parlay_types::{BetId, BetLeg, MatchOutcome, RoundId, SeasonId, MATCHES_PER_ROUND};
use serde_json::{json, Value};

use crate::client::LedgerClient;
use crate::error::{ChainError, ChainResult};
use crate::events::RawLog;
use crate::types::{BetView, MatchView, PayoutPreview, RoundMetadata, TxOutcome};

/// IPC connection and contract configuration.
#[derive(Clone, Debug)]
pub struct IpcConfig {
    /// Path to the IPC socket file.
    pub socket_path: String,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<Duration>,
    /// How long to wait for a submitted transaction to be included.
    pub confirm_timeout: Duration,
    /// How often to poll for the receipt while waiting.
    pub confirm_poll_interval: Duration,
    /// Game-core contract address.
    pub game_core: Address,
    /// Betting-core contract address.
    pub betting_core: Address,
    /// Unlocked operator account transactions are sent from.
    pub from: Address,
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            socket_path: "/root/.ethereum/geth.ipc".to_string(),
            read_timeout: Some(Duration::from_secs(10)),
            write_timeout: Some(Duration::from_secs(10)),
            confirm_timeout: Duration::from_secs(120),
            confirm_poll_interval: Duration::from_millis(500),
            game_core: Address::ZERO,
            betting_core: Address::ZERO,
            from: Address::ZERO,
        }
    }
}

impl IpcConfig {
    /// Creates config for Geth.
    #[must_use]
    pub fn geth() -> Self {
        Self {
            socket_path: format!(
                "{}/.ethereum/geth.ipc",
                std::env::var("HOME").unwrap_or_default()
            ),
            ..Default::default()
        }
    }

    /// Creates config for Reth.
    #[must_use]
    pub fn reth() -> Self {
        Self {
            socket_path: format!(
                "{}/.local/share/reth/mainnet/reth.ipc",
                std::env::var("HOME").unwrap_or_default()
            ),
            ..Default::default()
        }
    }

    /// Creates config for local Anvil (testing).
    #[must_use]
    pub fn anvil() -> Self {
        Self {
            socket_path: "/tmp/anvil.ipc".to_string(),
            ..Default::default()
        }
    }

    /// Sets a custom socket path.
    #[must_use]
    pub fn with_socket_path(mut self, path: impl Into<String>) -> Self {
        self.socket_path = path.into();
        self
    }

    /// Sets the contract addresses.
    #[must_use]
    pub const fn with_contracts(mut self, game_core: Address, betting_core: Address) -> Self {
        self.game_core = game_core;
        self.betting_core = betting_core;
        self
    }

    /// Sets the operator account.
    #[must_use]
    pub const fn with_from(mut self, from: Address) -> Self {
        self.from = from;
        self
    }
}

/// Function signature strings in canonical ABI form.
mod func {
    pub const CURRENT_SEASON: &str = "getCurrentSeason()";
    pub const CURRENT_ROUND: &str = "getCurrentRound()";
    pub const ROUND_METADATA: &str = "getRoundMetadata(uint64)";
    pub const GET_MATCH: &str = "getMatch(uint64,uint8)";
    pub const GET_BET: &str = "getBet(uint64)";
    pub const GET_BET_LEG: &str = "getBetLeg(uint64,uint8)";
    pub const PREVIEW_PAYOUT: &str = "previewPayout(uint64)";
    pub const START_SEASON: &str = "startSeason()";
    pub const START_ROUND: &str = "startRound()";
    pub const SEED_ROUND: &str = "seedRound(uint64)";
    pub const REQUEST_RANDOMNESS: &str = "requestRandomness()";
    pub const SETTLE_ROUND: &str = "settleRound(uint64,uint8[])";
    pub const SWEEP_ROUND: &str = "sweepRound(uint64)";
}

// ---------------------------------------------------------------------------
// ABI helpers
// ---------------------------------------------------------------------------

fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature);
    [hash[0], hash[1], hash[2], hash[3]]
}

fn calldata(signature: &str, words: &[U256]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + words.len() * 32);
    out.extend_from_slice(&selector(signature));
    for word in words {
        out.extend_from_slice(&word.to_be_bytes::<32>());
    }
    out
}

/// Splits ABI return data into 32-byte words.
fn return_words(data: &[u8]) -> ChainResult<Vec<U256>> {
    if data.len() % 32 != 0 {
        return Err(ChainError::Decode(format!(
            "return data length {} is not word-aligned",
            data.len()
        )));
    }
    Ok(data.chunks_exact(32).map(U256::from_be_slice).collect())
}

fn word_u64(words: &[U256], index: usize) -> ChainResult<u64> {
    words
        .get(index)
        .and_then(|w| u64::try_from(*w).ok())
        .ok_or_else(|| ChainError::Decode(format!("missing u64 word {index}")))
}

fn word_u8(words: &[U256], index: usize) -> ChainResult<u8> {
    words
        .get(index)
        .and_then(|w| u8::try_from(*w).ok())
        .ok_or_else(|| ChainError::Decode(format!("missing u8 word {index}")))
}

fn word_bool(words: &[U256], index: usize) -> ChainResult<bool> {
    words
        .get(index)
        .map(|w| !w.is_zero())
        .ok_or_else(|| ChainError::Decode(format!("missing bool word {index}")))
}

fn word_u256(words: &[U256], index: usize) -> ChainResult<U256> {
    words
        .get(index)
        .copied()
        .ok_or_else(|| ChainError::Decode(format!("missing u256 word {index}")))
}

fn word_address(words: &[U256], index: usize) -> ChainResult<Address> {
    words
        .get(index)
        .map(|w| Address::from_slice(&w.to_be_bytes::<32>()[12..]))
        .ok_or_else(|| ChainError::Decode(format!("missing address word {index}")))
}

fn parse_quantity(value: &Value) -> ChainResult<u64> {
    let s = value
        .as_str()
        .ok_or_else(|| ChainError::Decode("quantity is not a string".into()))?;
    let s = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(s, 16).map_err(|e| ChainError::Decode(format!("bad quantity: {e}")))
}

fn parse_bytes(value: &Value) -> ChainResult<Vec<u8>> {
    let s = value
        .as_str()
        .ok_or_else(|| ChainError::Decode("bytes field is not a string".into()))?;
    hex::decode(s).map_err(|e| ChainError::Decode(format!("bad hex: {e}")))
}

fn parse_b256(value: &Value) -> ChainResult<B256> {
    let bytes = parse_bytes(value)?;
    if bytes.len() != 32 {
        return Err(ChainError::Decode(format!(
            "expected 32 bytes, got {}",
            bytes.len()
        )));
    }
    Ok(B256::from_slice(&bytes))
}

fn parse_address(value: &Value) -> ChainResult<Address> {
    let bytes = parse_bytes(value)?;
    if bytes.len() != 20 {
        return Err(ChainError::Decode(format!(
            "expected 20 bytes, got {}",
            bytes.len()
        )));
    }
    Ok(Address::from_slice(&bytes))
}

/// Maps a JSON-RPC error object into the chain error taxonomy.
///
/// Nodes report reverts as an RPC error with "revert" somewhere in the
/// message; the reason string after the prefix is what [`ChainError::is_benign`]
/// inspects.
fn classify_rpc_error(error: &Value) -> ChainError {
    let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    if message.to_ascii_lowercase().contains("revert") {
        let reason = message
            .split_once("reverted:")
            .map_or(message.as_str(), |(_, r)| r.trim())
            .to_string();
        ChainError::Reverted { reason }
    } else {
        ChainError::Rpc { code, message }
    }
}

/// [`LedgerClient`] over a local node's IPC socket.
pub struct IpcLedgerClient {
    config: IpcConfig,
    stream: Mutex<Option<UnixStream>>,
    next_id: AtomicU64,
}

impl IpcLedgerClient {
    /// Creates a client; the socket is opened lazily on the first call.
    #[must_use]
    pub fn new(config: IpcConfig) -> Self {
        Self {
            config,
            stream: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    fn connect(&self) -> ChainResult<UnixStream> {
        let stream = UnixStream::connect(&self.config.socket_path)
            .map_err(|e| ChainError::Transport(format!("connect: {e}")))?;
        stream
            .set_read_timeout(self.config.read_timeout)
            .map_err(|e| ChainError::Transport(format!("set read timeout: {e}")))?;
        stream
            .set_write_timeout(self.config.write_timeout)
            .map_err(|e| ChainError::Transport(format!("set write timeout: {e}")))?;
        Ok(stream)
    }

    fn roundtrip(stream: &mut UnixStream, request: &str) -> ChainResult<String> {
        writeln!(stream, "{request}").map_err(|e| ChainError::Transport(format!("write: {e}")))?;
        stream
            .flush()
            .map_err(|e| ChainError::Transport(format!("flush: {e}")))?;

        let cloned = stream
            .try_clone()
            .map_err(|e| ChainError::Transport(format!("clone: {e}")))?;
        let mut reader = BufReader::new(cloned);
        let mut response = String::new();
        reader
            .read_line(&mut response)
            .map_err(|e| ChainError::Transport(format!("read: {e}")))?;
        if response.is_empty() {
            return Err(ChainError::Transport("connection closed".into()));
        }
        Ok(response)
    }

    /// Sends one JSON-RPC request and returns the `result` value.
    fn request(&self, method: &str, params: Value) -> ChainResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        })
        .to_string();

        let mut guard = self.stream.lock();
        if guard.is_none() {
            *guard = Some(self.connect()?);
        }
        let response = match guard.as_mut() {
            Some(stream) => Self::roundtrip(stream, &request),
            None => Err(ChainError::Transport("no connection".into())),
        };
        let response = match response {
            Ok(r) => r,
            Err(e) => {
                // Drop the broken stream; the next call reconnects.
                *guard = None;
                tracing::warn!(method, error = %e, "ipc request failed, dropping connection");
                return Err(e);
            }
        };
        drop(guard);

        let parsed: Value = serde_json::from_str(&response)
            .map_err(|e| ChainError::Decode(format!("bad json-rpc response: {e}")))?;
        if let Some(error) = parsed.get("error") {
            return Err(classify_rpc_error(error));
        }
        parsed
            .get("result")
            .cloned()
            .ok_or_else(|| ChainError::Decode("response has neither result nor error".into()))
    }

    /// `eth_call` against a contract, returning the ABI words of the result.
    fn call(&self, to: Address, data: &[u8]) -> ChainResult<Vec<U256>> {
        let result = self.request(
            "eth_call",
            json!([{ "to": to.to_string(), "data": format!("0x{}", hex::encode(data)) }, "latest"]),
        )?;
        return_words(&parse_bytes(&result)?)
    }

    /// Simulate, submit and await confirmation of a state-changing call.
    fn submit(&self, to: Address, data: &[u8]) -> ChainResult<TxOutcome> {
        let data_hex = format!("0x{}", hex::encode(data));
        let tx = json!({
            "from": self.config.from.to_string(),
            "to": to.to_string(),
            "data": data_hex,
        });

        // Simulation catches reverts (benign or otherwise) before spending gas.
        self.request("eth_call", json!([tx, "latest"]))?;

        let result = self.request("eth_sendTransaction", json!([tx]))?;
        let tx_hash = parse_b256(&result)?;
        tracing::debug!(%to, %tx_hash, "transaction submitted, awaiting confirmation");

        let deadline = Instant::now() + self.config.confirm_timeout;
        loop {
            let receipt = self.request(
                "eth_getTransactionReceipt",
                json!([format!("0x{}", hex::encode(tx_hash))]),
            )?;
            if !receipt.is_null() {
                let status = receipt
                    .get("status")
                    .map(parse_quantity)
                    .transpose()?
                    .unwrap_or(1);
                if status == 0 {
                    return Err(ChainError::Reverted {
                        reason: "execution reverted on inclusion".into(),
                    });
                }
                let block_number = receipt
                    .get("blockNumber")
                    .map(parse_quantity)
                    .transpose()?
                    .unwrap_or_default();
                return Ok(TxOutcome {
                    tx_hash,
                    block_number,
                });
            }
            if Instant::now() >= deadline {
                return Err(ChainError::ConfirmationTimeout { tx_hash });
            }
            std::thread::sleep(self.config.confirm_poll_interval);
        }
    }
}

impl LedgerClient for IpcLedgerClient {
    fn block_number(&self) -> ChainResult<u64> {
        let result = self.request("eth_blockNumber", json!([]))?;
        parse_quantity(&result)
    }

    fn current_season_id(&self) -> ChainResult<SeasonId> {
        let words = self.call(self.config.game_core, &calldata(func::CURRENT_SEASON, &[]))?;
        word_u64(&words, 0)
    }

    fn current_round_id(&self) -> ChainResult<RoundId> {
        let words = self.call(self.config.game_core, &calldata(func::CURRENT_ROUND, &[]))?;
        word_u64(&words, 0)
    }

    fn round_metadata(&self, round_id: RoundId) -> ChainResult<RoundMetadata> {
        let words = self.call(
            self.config.game_core,
            &calldata(func::ROUND_METADATA, &[U256::from(round_id)]),
        )?;
        let vrf_request_id = word_u64(&words, 4)?;
        Ok(RoundMetadata {
            round_id: word_u64(&words, 0)?,
            season_id: word_u64(&words, 1)?,
            start_time: word_u64(&words, 2)?,
            end_time: word_u64(&words, 3)?,
            vrf_request_id: (vrf_request_id != 0).then_some(vrf_request_id),
            vrf_fulfilled: word_bool(&words, 5)?,
            seeded: word_bool(&words, 6)?,
            odds_locked: word_bool(&words, 7)?,
            settled: word_bool(&words, 8)?,
        })
    }

    fn round_matches(&self, round_id: RoundId) -> ChainResult<Vec<MatchView>> {
        let mut matches = Vec::with_capacity(MATCHES_PER_ROUND);
        for index in 0..MATCHES_PER_ROUND {
            let index = u8::try_from(index)
                .map_err(|_| ChainError::Decode("match index overflow".into()))?;
            let words = self.call(
                self.config.game_core,
                &calldata(
                    func::GET_MATCH,
                    &[U256::from(round_id), U256::from(index)],
                ),
            )?;
            matches.push(MatchView {
                match_index: index,
                home_team_id: word_u8(&words, 0)?,
                away_team_id: word_u8(&words, 1)?,
                home_score: word_u8(&words, 2)?,
                away_score: word_u8(&words, 3)?,
                outcome: MatchOutcome::from_u8(word_u8(&words, 4)?),
                home_odds: word_u256(&words, 5)?,
                away_odds: word_u256(&words, 6)?,
                draw_odds: word_u256(&words, 7)?,
                settled: word_bool(&words, 8)?,
            });
        }
        Ok(matches)
    }

    fn bet(&self, bet_id: BetId) -> ChainResult<BetView> {
        let words = self.call(
            self.config.betting_core,
            &calldata(func::GET_BET, &[U256::from(bet_id)]),
        )?;
        let leg_count = word_u8(&words, 7)?;

        let mut legs = Vec::with_capacity(usize::from(leg_count));
        for index in 0..leg_count {
            let leg = self.call(
                self.config.betting_core,
                &calldata(
                    func::GET_BET_LEG,
                    &[U256::from(bet_id), U256::from(index)],
                ),
            )?;
            legs.push(BetLeg {
                match_index: word_u8(&leg, 0)?,
                predicted: MatchOutcome::from_u8(word_u8(&leg, 1)?),
            });
        }

        Ok(BetView {
            bet_id,
            bettor: word_address(&words, 0)?,
            round_id: word_u64(&words, 1)?,
            season_id: word_u64(&words, 2)?,
            amount: word_u256(&words, 3)?,
            bonus: word_u256(&words, 4)?,
            parlay_multiplier: word_u256(&words, 5)?,
            placed_at: word_u64(&words, 6)?,
            legs,
        })
    }

    fn payout_preview(&self, bet_id: BetId) -> ChainResult<PayoutPreview> {
        let words = self.call(
            self.config.betting_core,
            &calldata(func::PREVIEW_PAYOUT, &[U256::from(bet_id)]),
        )?;
        Ok(PayoutPreview {
            won: word_bool(&words, 0)?,
            payout: word_u256(&words, 1)?,
        })
    }

    fn logs(&self, address: Address, from_block: u64, to_block: u64) -> ChainResult<Vec<RawLog>> {
        let result = self.request(
            "eth_getLogs",
            json!([{
                "address": address.to_string(),
                "fromBlock": format!("0x{from_block:x}"),
                "toBlock": format!("0x{to_block:x}"),
            }]),
        )?;
        let entries = result
            .as_array()
            .ok_or_else(|| ChainError::Decode("eth_getLogs result is not an array".into()))?;

        let mut logs = Vec::with_capacity(entries.len());
        for entry in entries {
            let topics = entry
                .get("topics")
                .and_then(Value::as_array)
                .ok_or_else(|| ChainError::Decode("log without topics".into()))?
                .iter()
                .map(parse_b256)
                .collect::<ChainResult<Vec<_>>>()?;
            logs.push(RawLog {
                address: entry
                    .get("address")
                    .map(parse_address)
                    .transpose()?
                    .unwrap_or(address),
                topics,
                data: entry
                    .get("data")
                    .map(parse_bytes)
                    .transpose()?
                    .unwrap_or_default(),
                block_number: entry
                    .get("blockNumber")
                    .map(parse_quantity)
                    .transpose()?
                    .unwrap_or_default(),
                tx_index: u32::try_from(
                    entry
                        .get("transactionIndex")
                        .map(parse_quantity)
                        .transpose()?
                        .unwrap_or_default(),
                )
                .unwrap_or(u32::MAX),
                log_index: u32::try_from(
                    entry
                        .get("logIndex")
                        .map(parse_quantity)
                        .transpose()?
                        .unwrap_or_default(),
                )
                .unwrap_or(u32::MAX),
                tx_hash: entry
                    .get("transactionHash")
                    .map(parse_b256)
                    .transpose()?
                    .unwrap_or_default(),
            });
        }
        Ok(logs)
    }

    fn start_season(&self) -> ChainResult<TxOutcome> {
        self.submit(self.config.game_core, &calldata(func::START_SEASON, &[]))
    }

    fn start_round(&self) -> ChainResult<TxOutcome> {
        self.submit(self.config.game_core, &calldata(func::START_ROUND, &[]))
    }

    fn seed_round(&self, round_id: RoundId) -> ChainResult<TxOutcome> {
        self.submit(
            self.config.betting_core,
            &calldata(func::SEED_ROUND, &[U256::from(round_id)]),
        )
    }

    fn request_randomness(&self) -> ChainResult<TxOutcome> {
        self.submit(
            self.config.game_core,
            &calldata(func::REQUEST_RANDOMNESS, &[]),
        )
    }

    fn settle_round(&self, round_id: RoundId, outcomes: &[MatchOutcome]) -> ChainResult<TxOutcome> {
        // Dynamic uint8[] tail: head holds the offset, tail holds len + items.
        let mut words = vec![U256::from(round_id), U256::from(64u64)];
        words.push(U256::from(outcomes.len()));
        words.extend(outcomes.iter().map(|o| U256::from(o.as_u8())));
        self.submit(
            self.config.game_core,
            &calldata(func::SETTLE_ROUND, &words),
        )
    }

    fn sweep_round(&self, round_id: RoundId) -> ChainResult<TxOutcome> {
        self.submit(
            self.config.betting_core,
            &calldata(func::SWEEP_ROUND, &[U256::from(round_id)]),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = IpcConfig::geth();
        assert!(config.socket_path.contains("geth.ipc"));

        let config = IpcConfig::anvil();
        assert_eq!(config.socket_path, "/tmp/anvil.ipc");
    }

    #[test]
    fn test_calldata_layout() {
        let data = calldata(func::SEED_ROUND, &[U256::from(7u64)]);
        assert_eq!(data.len(), 36);
        assert_eq!(&data[..4], &selector(func::SEED_ROUND));
        assert_eq!(data[35], 7);
    }

    #[test]
    fn test_return_word_decoding() {
        let mut data = Vec::new();
        data.extend_from_slice(&U256::from(42u64).to_be_bytes::<32>());
        data.extend_from_slice(&U256::from(1u64).to_be_bytes::<32>());
        let words = return_words(&data).unwrap();
        assert_eq!(word_u64(&words, 0).unwrap(), 42);
        assert!(word_bool(&words, 1).unwrap());
        assert!(word_u64(&words, 2).is_err());

        assert!(return_words(&[0u8; 31]).is_err());
    }

    #[test]
    fn test_rpc_error_classification() {
        let revert = json!({"code": 3, "message": "execution reverted: round already seeded"});
        match classify_rpc_error(&revert) {
            ChainError::Reverted { reason } => {
                assert_eq!(reason, "round already seeded");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(classify_rpc_error(&revert).is_benign());

        let plain = json!({"code": -32000, "message": "nonce too low"});
        assert!(matches!(
            classify_rpc_error(&plain),
            ChainError::Rpc { code: -32000, .. }
        ));
    }

    #[test]
    fn test_quantity_parsing() {
        assert_eq!(parse_quantity(&json!("0x10")).unwrap(), 16);
        assert_eq!(parse_quantity(&json!("0x0")).unwrap(), 0);
        assert!(parse_quantity(&json!(16)).is_err());
    }
}
