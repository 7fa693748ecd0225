//! Custody Core Library
//!
//! Signing pipeline, API clients and configuration for operating a
//! custody-held account on Hyperliquid and its Arbitrum bridge.

pub mod api;
pub mod config;
pub mod error;
pub mod signing;
pub mod types;

pub use error::{Error, FailureCategory, Result};
