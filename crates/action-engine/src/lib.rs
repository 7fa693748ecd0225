//! Action Engine
//!
//! Deposit, withdrawal, transfer, execution-mode and raw-call flows for a
//! custody-held account, plus the dispatcher that routes one configured
//! action to exactly one flow.

use std::time::Duration;

use custody_core::config::NetworkConfig;

pub mod deposit;
pub mod dispatcher;
pub mod execution_mode;
pub mod raw_call;
pub mod transfer;

pub use deposit::{DepositFlow, MIN_DEPOSIT_TOKENS, PERMIT_WINDOW_SECS};
pub use dispatcher::{ActionDispatcher, ActionOutcome};
pub use execution_mode::{ExecutionMode, ExecutionModeFlow};
pub use raw_call::{RawCallFlow, RawCallReceipt};
pub use transfer::{TransferFlow, TransferRequest, WithdrawFlow};

/// How long and how often to poll for a transaction receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl ConfirmationPolicy {
    pub fn new(poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            poll_interval,
            timeout,
        }
    }
}

impl From<&NetworkConfig> for ConfirmationPolicy {
    fn from(network: &NetworkConfig) -> Self {
        Self::new(network.receipt_poll_interval, network.confirmation_timeout)
    }
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(2), Duration::from_secs(120))
    }
}
