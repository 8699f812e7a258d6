//! # PARLAY Orchestrator
//!
//! The deployable face of the workspace:
//!
//! ```text
//! ┌───────────┐   TOML    ┌─────────┐  threads  ┌──────┬─────────┐
//! │ AppConfig │ ────────▶ │ Runtime │ ────────▶ │ sync │ monitor │
//! └───────────┘           └─────────┘           └──────┴─────────┘
//! ```
//!
//! The `parlay_orchestrator` binary loads the config, assembles a
//! [`Runtime`], runs the monitor bootstrap, then drives the synchronizer
//! and monitor loops on their own threads until killed.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod config;

pub use api::{RoundDetail, Runtime, StatusReport};
pub use config::{AppConfig, ConfigError};
