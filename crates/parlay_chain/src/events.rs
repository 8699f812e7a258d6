//! # Protocol Events
//!
//! Raw log decoding into one exhaustive sum type. Parsing is manual and
//! word-level; logs from other contracts or with unknown signatures decode
//! to `None` and are skipped by the caller - that is expected traffic on a
//! shared chain, not an error.

use std::sync::OnceLock;

use alloy_primitives::{keccak256, Address, TxHash, B256, U256};
use parlay_types::{BetId, MatchOutcome, RoundId, SeasonId, UnixTime};

/// A raw, undecoded log entry as returned by `eth_getLogs`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawLog {
    /// Emitting contract.
    pub address: Address,
    /// Indexed topics; `topics[0]` is the event signature hash.
    pub topics: Vec<B256>,
    /// Non-indexed data words.
    pub data: Vec<u8>,
    /// Block the log was emitted in.
    pub block_number: u64,
    /// Transaction index within the block.
    pub tx_index: u32,
    /// Log index within the block.
    pub log_index: u32,
    /// Emitting transaction.
    pub tx_hash: TxHash,
}

impl RawLog {
    /// Ledger ordering key: `(block, log_index)`.
    #[must_use]
    pub const fn ordering_key(&self) -> (u64, u32) {
        (self.block_number, self.log_index)
    }
}

/// Every ledger event the orchestrator cares about, decoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProtocolEvent {
    /// A new round started.
    RoundStarted {
        /// Round id.
        round_id: RoundId,
        /// Season the round belongs to.
        season_id: SeasonId,
        /// Round start time.
        start_time: UnixTime,
        /// Betting window close time.
        end_time: UnixTime,
    },
    /// The round's randomness request was submitted.
    RandomnessRequested {
        /// Round the request belongs to.
        round_id: RoundId,
        /// Request handle.
        request_id: u64,
    },
    /// The randomness request was fulfilled; results are readable.
    RandomnessFulfilled {
        /// Request handle.
        request_id: u64,
        /// Round the request belongs to.
        round_id: RoundId,
    },
    /// The round was settled.
    RoundSettled {
        /// Settled round.
        round_id: RoundId,
    },
    /// A bet was placed.
    BetPlaced {
        /// Ledger-assigned bet id.
        bet_id: BetId,
        /// Bettor wallet.
        bettor: Address,
        /// Round the bet belongs to.
        round_id: RoundId,
        /// Stake in wei.
        amount: U256,
        /// Bonus stake in wei.
        bonus: U256,
        /// Combined multiplier, 1e18-scaled.
        parlay_multiplier: U256,
        /// Placing transaction.
        tx_hash: TxHash,
    },
    /// A winning bet was claimed by its owner.
    WinningsClaimed {
        /// The claimed bet.
        bet_id: BetId,
        /// The bettor.
        bettor: Address,
    },
    /// A bet was marked lost on-chain.
    BetLost {
        /// The losing bet.
        bet_id: BetId,
        /// The bettor.
        bettor: Address,
    },
    /// A bet was cancelled before settlement.
    BetCancelled {
        /// The cancelled bet.
        bet_id: BetId,
        /// The bettor.
        bettor: Address,
    },
    /// A third party claimed an unclaimed winning bet for a bounty.
    BountyClaimed {
        /// The claimed bet.
        bet_id: BetId,
        /// Wallet that executed the claim.
        claimer: Address,
        /// Original winner.
        winner: Address,
        /// Claimer's share.
        bounty_amount: U256,
        /// Winner's share.
        winner_amount: U256,
        /// Claim transaction.
        tx_hash: TxHash,
    },
    /// A round's unclaimed pool was swept.
    RoundPoolSwept {
        /// Swept round.
        round_id: RoundId,
        /// Unclaimed amount reclaimed.
        remaining_amount: U256,
        /// Treasury share.
        protocol_share: U256,
        /// Season pool share.
        season_share: U256,
        /// Sweep transaction.
        tx_hash: TxHash,
    },
}

/// Event signature strings in canonical ABI form.
mod sig {
    pub const ROUND_STARTED: &str = "RoundStarted(uint64,uint64,uint64,uint64)";
    pub const RANDOMNESS_REQUESTED: &str = "RandomnessRequested(uint64,uint64)";
    pub const RANDOMNESS_FULFILLED: &str = "RandomnessFulfilled(uint64,uint64)";
    pub const ROUND_SETTLED: &str = "RoundSettled(uint64)";
    pub const BET_PLACED: &str = "BetPlaced(uint64,address,uint64,uint256,uint256,uint256)";
    pub const WINNINGS_CLAIMED: &str = "WinningsClaimed(uint64,address)";
    pub const BET_LOST: &str = "BetLost(uint64,address)";
    pub const BET_CANCELLED: &str = "BetCancelled(uint64,address)";
    pub const BOUNTY_CLAIMED: &str = "BountyClaimed(uint64,address,address,uint256,uint256)";
    pub const ROUND_POOL_SWEPT: &str = "RoundPoolSwept(uint64,uint256,uint256,uint256)";
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EventKind {
    RoundStarted,
    RandomnessRequested,
    RandomnessFulfilled,
    RoundSettled,
    BetPlaced,
    WinningsClaimed,
    BetLost,
    BetCancelled,
    BountyClaimed,
    RoundPoolSwept,
}

fn selector_table() -> &'static [(B256, EventKind)] {
    static TABLE: OnceLock<Vec<(B256, EventKind)>> = OnceLock::new();
    TABLE.get_or_init(|| {
        vec![
            (keccak256(sig::ROUND_STARTED), EventKind::RoundStarted),
            (
                keccak256(sig::RANDOMNESS_REQUESTED),
                EventKind::RandomnessRequested,
            ),
            (
                keccak256(sig::RANDOMNESS_FULFILLED),
                EventKind::RandomnessFulfilled,
            ),
            (keccak256(sig::ROUND_SETTLED), EventKind::RoundSettled),
            (keccak256(sig::BET_PLACED), EventKind::BetPlaced),
            (keccak256(sig::WINNINGS_CLAIMED), EventKind::WinningsClaimed),
            (keccak256(sig::BET_LOST), EventKind::BetLost),
            (keccak256(sig::BET_CANCELLED), EventKind::BetCancelled),
            (keccak256(sig::BOUNTY_CLAIMED), EventKind::BountyClaimed),
            (keccak256(sig::ROUND_POOL_SWEPT), EventKind::RoundPoolSwept),
        ]
    })
}

fn selector_for(kind: EventKind) -> B256 {
    selector_table()
        .iter()
        .find(|(_, k)| *k == kind)
        .map(|(sel, _)| *sel)
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Word-level helpers
// ---------------------------------------------------------------------------

fn topic_u64(topic: &B256) -> u64 {
    let bytes: [u8; 8] = topic[24..32].try_into().unwrap_or_default();
    u64::from_be_bytes(bytes)
}

fn topic_address(topic: &B256) -> Address {
    Address::from_slice(&topic[12..32])
}

fn word(data: &[u8], index: usize) -> Option<&[u8]> {
    data.get(index * 32..(index + 1) * 32)
}

fn word_u256(data: &[u8], index: usize) -> Option<U256> {
    word(data, index).map(U256::from_be_slice)
}

fn word_u64(data: &[u8], index: usize) -> Option<u64> {
    word(data, index).map(|w| {
        let bytes: [u8; 8] = w[24..32].try_into().unwrap_or_default();
        u64::from_be_bytes(bytes)
    })
}

fn u64_topic(value: u64) -> B256 {
    let mut out = [0u8; 32];
    out[24..32].copy_from_slice(&value.to_be_bytes());
    B256::from(out)
}

fn address_topic(address: Address) -> B256 {
    let mut out = [0u8; 32];
    out[12..32].copy_from_slice(address.as_slice());
    B256::from(out)
}

fn push_u256(data: &mut Vec<u8>, value: U256) {
    data.extend_from_slice(&value.to_be_bytes::<32>());
}

fn push_u64(data: &mut Vec<u8>, value: u64) {
    push_u256(data, U256::from(value));
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Decoder for raw protocol logs.
pub struct EventParser;

impl EventParser {
    /// Decodes a raw log against the known event schemas.
    ///
    /// Returns `None` for unknown signatures or malformed payloads; the
    /// synchronizer skips those without logging a failure.
    #[must_use]
    pub fn decode(log: &RawLog) -> Option<ProtocolEvent> {
        let topic0 = log.topics.first()?;
        let kind = selector_table()
            .iter()
            .find(|(sel, _)| sel == topic0)
            .map(|(_, k)| *k)?;

        match kind {
            EventKind::RoundStarted => {
                if log.topics.len() < 3 {
                    return None;
                }
                Some(ProtocolEvent::RoundStarted {
                    round_id: topic_u64(&log.topics[1]),
                    season_id: topic_u64(&log.topics[2]),
                    start_time: word_u64(&log.data, 0)?,
                    end_time: word_u64(&log.data, 1)?,
                })
            }
            EventKind::RandomnessRequested => {
                if log.topics.len() < 2 {
                    return None;
                }
                Some(ProtocolEvent::RandomnessRequested {
                    round_id: topic_u64(&log.topics[1]),
                    request_id: word_u64(&log.data, 0)?,
                })
            }
            EventKind::RandomnessFulfilled => {
                if log.topics.len() < 3 {
                    return None;
                }
                Some(ProtocolEvent::RandomnessFulfilled {
                    request_id: topic_u64(&log.topics[1]),
                    round_id: topic_u64(&log.topics[2]),
                })
            }
            EventKind::RoundSettled => {
                if log.topics.len() < 2 {
                    return None;
                }
                Some(ProtocolEvent::RoundSettled {
                    round_id: topic_u64(&log.topics[1]),
                })
            }
            EventKind::BetPlaced => {
                if log.topics.len() < 4 {
                    return None;
                }
                Some(ProtocolEvent::BetPlaced {
                    bet_id: topic_u64(&log.topics[1]),
                    bettor: topic_address(&log.topics[2]),
                    round_id: topic_u64(&log.topics[3]),
                    amount: word_u256(&log.data, 0)?,
                    bonus: word_u256(&log.data, 1)?,
                    parlay_multiplier: word_u256(&log.data, 2)?,
                    tx_hash: log.tx_hash,
                })
            }
            EventKind::WinningsClaimed | EventKind::BetLost | EventKind::BetCancelled => {
                if log.topics.len() < 3 {
                    return None;
                }
                let bet_id = topic_u64(&log.topics[1]);
                let bettor = topic_address(&log.topics[2]);
                Some(match kind {
                    EventKind::WinningsClaimed => ProtocolEvent::WinningsClaimed { bet_id, bettor },
                    EventKind::BetLost => ProtocolEvent::BetLost { bet_id, bettor },
                    _ => ProtocolEvent::BetCancelled { bet_id, bettor },
                })
            }
            EventKind::BountyClaimed => {
                if log.topics.len() < 4 {
                    return None;
                }
                Some(ProtocolEvent::BountyClaimed {
                    bet_id: topic_u64(&log.topics[1]),
                    claimer: topic_address(&log.topics[2]),
                    winner: topic_address(&log.topics[3]),
                    bounty_amount: word_u256(&log.data, 0)?,
                    winner_amount: word_u256(&log.data, 1)?,
                    tx_hash: log.tx_hash,
                })
            }
            EventKind::RoundPoolSwept => {
                if log.topics.len() < 2 {
                    return None;
                }
                Some(ProtocolEvent::RoundPoolSwept {
                    round_id: topic_u64(&log.topics[1]),
                    remaining_amount: word_u256(&log.data, 0)?,
                    protocol_share: word_u256(&log.data, 1)?,
                    season_share: word_u256(&log.data, 2)?,
                    tx_hash: log.tx_hash,
                })
            }
        }
    }
}

impl ProtocolEvent {
    /// Encodes this event back into a raw log.
    ///
    /// Used by the simulated ledger so the synchronizer exercises the real
    /// decode path in tests.
    #[must_use]
    pub fn to_log(
        &self,
        address: Address,
        block_number: u64,
        tx_index: u32,
        log_index: u32,
    ) -> RawLog {
        let (topics, data, tx_hash) = match self {
            Self::RoundStarted {
                round_id,
                season_id,
                start_time,
                end_time,
            } => {
                let mut data = Vec::with_capacity(64);
                push_u64(&mut data, *start_time);
                push_u64(&mut data, *end_time);
                (
                    vec![
                        selector_for(EventKind::RoundStarted),
                        u64_topic(*round_id),
                        u64_topic(*season_id),
                    ],
                    data,
                    TxHash::ZERO,
                )
            }
            Self::RandomnessRequested {
                round_id,
                request_id,
            } => {
                let mut data = Vec::with_capacity(32);
                push_u64(&mut data, *request_id);
                (
                    vec![
                        selector_for(EventKind::RandomnessRequested),
                        u64_topic(*round_id),
                    ],
                    data,
                    TxHash::ZERO,
                )
            }
            Self::RandomnessFulfilled {
                request_id,
                round_id,
            } => (
                vec![
                    selector_for(EventKind::RandomnessFulfilled),
                    u64_topic(*request_id),
                    u64_topic(*round_id),
                ],
                Vec::new(),
                TxHash::ZERO,
            ),
            Self::RoundSettled { round_id } => (
                vec![selector_for(EventKind::RoundSettled), u64_topic(*round_id)],
                Vec::new(),
                TxHash::ZERO,
            ),
            Self::BetPlaced {
                bet_id,
                bettor,
                round_id,
                amount,
                bonus,
                parlay_multiplier,
                tx_hash,
            } => {
                let mut data = Vec::with_capacity(96);
                push_u256(&mut data, *amount);
                push_u256(&mut data, *bonus);
                push_u256(&mut data, *parlay_multiplier);
                (
                    vec![
                        selector_for(EventKind::BetPlaced),
                        u64_topic(*bet_id),
                        address_topic(*bettor),
                        u64_topic(*round_id),
                    ],
                    data,
                    *tx_hash,
                )
            }
            Self::WinningsClaimed { bet_id, bettor } => (
                vec![
                    selector_for(EventKind::WinningsClaimed),
                    u64_topic(*bet_id),
                    address_topic(*bettor),
                ],
                Vec::new(),
                TxHash::ZERO,
            ),
            Self::BetLost { bet_id, bettor } => (
                vec![
                    selector_for(EventKind::BetLost),
                    u64_topic(*bet_id),
                    address_topic(*bettor),
                ],
                Vec::new(),
                TxHash::ZERO,
            ),
            Self::BetCancelled { bet_id, bettor } => (
                vec![
                    selector_for(EventKind::BetCancelled),
                    u64_topic(*bet_id),
                    address_topic(*bettor),
                ],
                Vec::new(),
                TxHash::ZERO,
            ),
            Self::BountyClaimed {
                bet_id,
                claimer,
                winner,
                bounty_amount,
                winner_amount,
                tx_hash,
            } => {
                let mut data = Vec::with_capacity(64);
                push_u256(&mut data, *bounty_amount);
                push_u256(&mut data, *winner_amount);
                (
                    vec![
                        selector_for(EventKind::BountyClaimed),
                        u64_topic(*bet_id),
                        address_topic(*claimer),
                        address_topic(*winner),
                    ],
                    data,
                    *tx_hash,
                )
            }
            Self::RoundPoolSwept {
                round_id,
                remaining_amount,
                protocol_share,
                season_share,
                tx_hash,
            } => {
                let mut data = Vec::with_capacity(96);
                push_u256(&mut data, *remaining_amount);
                push_u256(&mut data, *protocol_share);
                push_u256(&mut data, *season_share);
                (
                    vec![
                        selector_for(EventKind::RoundPoolSwept),
                        u64_topic(*round_id),
                    ],
                    data,
                    *tx_hash,
                )
            }
        };

        RawLog {
            address,
            topics,
            data,
            block_number,
            tx_index,
            log_index,
            tx_hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(event: ProtocolEvent) {
        let log = event.to_log(Address::repeat_byte(9), 100, 0, 3);
        assert_eq!(log.ordering_key(), (100, 3));
        let decoded = EventParser::decode(&log).expect("decodes");
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_round_started_round_trip() {
        round_trip(ProtocolEvent::RoundStarted {
            round_id: 1,
            season_id: 1,
            start_time: 1_000,
            end_time: 1_900,
        });
    }

    #[test]
    fn test_bet_placed_round_trip() {
        round_trip(ProtocolEvent::BetPlaced {
            bet_id: 7,
            bettor: Address::repeat_byte(1),
            round_id: 1,
            amount: U256::from(100u64),
            bonus: U256::ZERO,
            parlay_multiplier: U256::from(2_500_000_000_000_000_000u128),
            tx_hash: TxHash::repeat_byte(4),
        });
    }

    #[test]
    fn test_bounty_and_sweep_round_trip() {
        round_trip(ProtocolEvent::BountyClaimed {
            bet_id: 9,
            claimer: Address::repeat_byte(2),
            winner: Address::repeat_byte(3),
            bounty_amount: U256::from(10u64),
            winner_amount: U256::from(90u64),
            tx_hash: TxHash::repeat_byte(5),
        });
        round_trip(ProtocolEvent::RoundPoolSwept {
            round_id: 4,
            remaining_amount: U256::from(1_000u64),
            protocol_share: U256::from(980u64),
            season_share: U256::from(20u64),
            tx_hash: TxHash::repeat_byte(6),
        });
    }

    #[test]
    fn test_unknown_signature_skipped() {
        let log = RawLog {
            address: Address::ZERO,
            topics: vec![keccak256("Transfer(address,address,uint256)")],
            data: vec![0u8; 32],
            block_number: 1,
            tx_index: 0,
            log_index: 0,
            tx_hash: TxHash::ZERO,
        };
        assert!(EventParser::decode(&log).is_none());
    }

    #[test]
    fn test_truncated_data_skipped() {
        let event = ProtocolEvent::RoundStarted {
            round_id: 1,
            season_id: 1,
            start_time: 1_000,
            end_time: 1_900,
        };
        let mut log = event.to_log(Address::ZERO, 1, 0, 0);
        log.data.truncate(16);
        assert!(EventParser::decode(&log).is_none());
    }
}
