//! # PARLAY Store
//!
//! The local cache boundary. The synchronizer and the orchestrator write
//! through the [`Store`] trait; the presentation layer reads projections
//! of it. All writes are keyed by natural ids and expressed as
//! insert-or-duplicate / update-in-place, so at-least-once event delivery
//! and overlapping writers converge to the same state.
//!
//! ```text
//! ┌──────────────┐   events   ┌───────────┐   reads    ┌──────────────┐
//! │ Synchronizer │ ─────────▶ │   Store   │ ◀───────── │ Orchestrator │
//! └──────────────┘            └───────────┘            └──────────────┘
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod memory;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use store::{BetStatusUpdate, MatchUpdate, RoundUpdate, Store};
