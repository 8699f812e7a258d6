//! # PARLAY Ledger Client
//!
//! Typed access to the protocol contracts plus raw log decoding.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   eth_getLogs   ┌──────────────┐   ProtocolEvent
//! │  Node (IPC)  │ ──────────────▶ │  EventParser │ ──────────────▶ sync
//! └──────────────┘                 └──────────────┘
//!        ▲
//!        │ eth_call / eth_sendTransaction
//! ┌──────┴───────┐
//! │ LedgerClient │ ◀── orchestrator writes (simulate → send → confirm)
//! └──────────────┘
//! ```
//!
//! Every entity crosses this boundary exactly once, as one canonical typed
//! struct. The rest of the system never touches ABI words.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod error;
pub mod events;
pub mod ipc;
pub mod sim;
pub mod types;

pub use client::LedgerClient;
pub use error::{ChainError, ChainResult};
pub use events::{EventParser, ProtocolEvent, RawLog};
pub use ipc::{IpcConfig, IpcLedgerClient};
pub use sim::SimulatedLedger;
pub use types::{BetView, MatchView, PayoutPreview, RoundMetadata, TxOutcome};
