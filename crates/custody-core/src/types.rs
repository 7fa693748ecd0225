//! Core types shared by the flows.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::signing::SignatureParts;
use crate::{Error, Result};

/// The action an invocation performs. Closed set; anything else is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    /// Permit-based USDC deposit into the bridge contract.
    Deposit,
    /// Withdrawal from the exchange to an EVM address.
    Withdraw,
    /// Internal USD transfer on the exchange.
    SendUsd,
    /// Route EVM transactions to big blocks.
    ActivateBigBlocks,
    /// Route EVM transactions back to small blocks.
    DeactivateBigBlocks,
    /// Arbitrary contract call through the custody signer.
    RawCall,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Deposit => "deposit",
            ActionKind::Withdraw => "withdraw",
            ActionKind::SendUsd => "sendUsd",
            ActionKind::ActivateBigBlocks => "activateBigBlocks",
            ActionKind::DeactivateBigBlocks => "deactivateBigBlocks",
            ActionKind::RawCall => "rawCall",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "deposit" => Ok(ActionKind::Deposit),
            "withdraw" => Ok(ActionKind::Withdraw),
            "sendUsd" => Ok(ActionKind::SendUsd),
            "activateBigBlocks" => Ok(ActionKind::ActivateBigBlocks),
            "deactivateBigBlocks" => Ok(ActionKind::DeactivateBigBlocks),
            "rawCall" => Ok(ActionKind::RawCall),
            other => Err(Error::UnknownAction(other.to_string())),
        }
    }
}

/// Exchange agent private key. Debug output is redacted.
#[derive(Clone)]
pub struct AgentKey(String);

impl AgentKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AgentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AgentKey([REDACTED])")
    }
}

/// Calldata and gas settings for a raw contract call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCallSpec {
    pub contract: Option<String>,
    pub calldata: Option<String>,
    pub gas_limit: u64,
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

impl Default for RawCallSpec {
    fn default() -> Self {
        Self {
            contract: None,
            calldata: None,
            gas_limit: 200_000,
            max_fee_per_gas: 1_000_000_000,
            max_priority_fee_per_gas: 100_000_000,
        }
    }
}

/// One invocation's worth of action parameters. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct ActionConfig {
    pub action: ActionKind,
    pub is_testnet: bool,
    pub destination: Option<String>,
    /// Human-readable decimal amount.
    pub amount: Option<String>,
    pub agent_key: Option<AgentKey>,
    pub raw_call: RawCallSpec,
}

impl ActionConfig {
    pub fn new(action: ActionKind, is_testnet: bool) -> Self {
        Self {
            action,
            is_testnet,
            destination: None,
            amount: None,
            agent_key: None,
            raw_call: RawCallSpec::default(),
        }
    }

    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn with_amount(mut self, amount: impl Into<String>) -> Self {
        self.amount = Some(amount.into());
        self
    }

    pub fn with_agent_key(mut self, key: AgentKey) -> Self {
        self.agent_key = Some(key);
        self
    }

    pub fn with_raw_call(mut self, raw_call: RawCallSpec) -> Self {
        self.raw_call = raw_call;
        self
    }

    pub fn is_mainnet(&self) -> bool {
        !self.is_testnet
    }
}

/// `(r, s, v)` in the shape the bridge contract takes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositSignature {
    /// `0x`-prefixed 32-byte hex.
    pub r: String,
    /// `0x`-prefixed 32-byte hex.
    pub s: String,
    pub v: u8,
}

impl From<&SignatureParts> for DepositSignature {
    fn from(parts: &SignatureParts) -> Self {
        Self {
            r: parts.r_hex(),
            s: parts.s_hex(),
            v: parts.canonical_v(),
        }
    }
}

/// One element of `batchedDepositWithPermit`. Field order follows the ABI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositStruct {
    pub user: Address,
    /// USDC in smallest units.
    pub usd: String,
    pub deadline: String,
    pub signature: DepositSignature,
}

/// Mined transaction summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub transaction_hash: String,
    pub block_number: u64,
    pub success: bool,
}

/// Result of a completed deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositReceipt {
    pub transaction_hash: String,
    pub block_number: u64,
    /// Human-readable USDC amount.
    pub amount: String,
    pub user: Address,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_kind_parse_roundtrip() {
        for kind in [
            ActionKind::Deposit,
            ActionKind::Withdraw,
            ActionKind::SendUsd,
            ActionKind::ActivateBigBlocks,
            ActionKind::DeactivateBigBlocks,
            ActionKind::RawCall,
        ] {
            assert_eq!(kind.as_str().parse::<ActionKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_action_rejected() {
        let err = "bridgeEverything".parse::<ActionKind>().unwrap_err();
        assert!(matches!(err, Error::UnknownAction(ref a) if a == "bridgeEverything"));

        // Case matters; no silent fallback
        assert!("Deposit".parse::<ActionKind>().is_err());
        assert!("".parse::<ActionKind>().is_err());
    }

    #[test]
    fn test_agent_key_debug_redacted() {
        let key = AgentKey::new("0xdeadbeef");
        assert_eq!(format!("{:?}", key), "AgentKey([REDACTED])");
        assert_eq!(key.expose(), "0xdeadbeef");
    }

    #[test]
    fn test_deposit_signature_from_parts() {
        let parts = SignatureParts {
            r: "11".repeat(32),
            s: "22".repeat(32),
            v: 0,
        };
        let sig = DepositSignature::from(&parts);
        assert_eq!(sig.r, format!("0x{}", "11".repeat(32)));
        assert_eq!(sig.s, format!("0x{}", "22".repeat(32)));
        assert_eq!(sig.v, 27);
    }

    #[test]
    fn test_action_config_builders() {
        let config = ActionConfig::new(ActionKind::Withdraw, true)
            .with_destination("0xabc")
            .with_amount("1");
        assert!(!config.is_mainnet());
        assert_eq!(config.destination.as_deref(), Some("0xabc"));
        assert_eq!(config.amount.as_deref(), Some("1"));
        assert!(config.agent_key.is_none());
    }
}
