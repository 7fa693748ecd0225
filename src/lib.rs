//! HyperCore Custody: custody-signed Hyperliquid actions
//!
//! This is the root crate that hosts cross-crate integration tests.
//! For actual functionality, use the individual crates directly:
//!
//! - `custody-core`: signing pipeline, API clients, configuration
//! - `action-engine`: deposit, withdraw, transfer and execution-mode flows
//! - `operator`: the `hl-operator` command-line binary

pub use action_engine as engine;
pub use custody_core as core;
