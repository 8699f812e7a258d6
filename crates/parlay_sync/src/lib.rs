//! # PARLAY Event Synchronizer
//!
//! Keeps the local store consistent with the ledger by polling logs:
//!
//! ```text
//!              ┌─────────────────────────────────────────────┐
//!  watermark ─▶│ [w+1, min(head, w+MAX_RANGE)]               │
//!              │   fetch logs ─▶ decode ─▶ sort ─▶ dispatch  │
//!              │                                      │      │
//!              │   advance watermark to range end ◀───┘      │
//!              └─────────────────────────────────────────────┘
//! ```
//!
//! Delivery is at-least-once in ledger `(block, log_index)` order. All
//! handlers are idempotent on their natural keys, so a crash mid-range is
//! safe: the old watermark replays the range and every write converges.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod stats;
pub mod sync;

pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use stats::SyncStats;
pub use sync::{EventSynchronizer, PollReport};
