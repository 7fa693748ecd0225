//! EVM block-size toggle, signed with the exchange agent key.

use std::sync::Arc;

use custody_core::api::{ExchangeAction, ExchangeApi, ExchangeResponse};
use custody_core::signing::{LocalKeySigner, SignerAdapter, L1_AGENT_CHAIN_ID};
use custody_core::types::AgentKey;
use custody_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::transfer::submit_reported;

/// Which block lane the account's EVM transactions are routed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExecutionMode {
    BigBlocks,
    SmallBlocks,
}

impl ExecutionMode {
    pub fn using_big_blocks(&self) -> bool {
        matches!(self, ExecutionMode::BigBlocks)
    }
}

pub struct ExecutionModeFlow {
    exchange: Arc<dyn ExchangeApi>,
    signer: SignerAdapter,
}

impl ExecutionModeFlow {
    pub fn new(exchange: Arc<dyn ExchangeApi>, signer: SignerAdapter) -> Self {
        Self { exchange, signer }
    }

    /// Build the flow around the agent key, pinned to the L1 agent chain id.
    pub fn from_agent_key(exchange: Arc<dyn ExchangeApi>, key: Option<&AgentKey>) -> Result<Self> {
        let key = key.ok_or_else(|| Error::InvalidInput {
            message: "HYPERCORE_API_AGENT_PK is required to change the execution mode"
                .to_string(),
        })?;
        let agent = LocalKeySigner::from_private_key(key.expose())?;
        let signer = SignerAdapter::for_signer(Arc::new(agent), L1_AGENT_CHAIN_ID);
        Ok(Self::new(exchange, signer))
    }

    pub async fn set(&self, mode: ExecutionMode) -> Result<ExchangeResponse> {
        let action = ExchangeAction::EvmUserModify {
            using_big_blocks: mode.using_big_blocks(),
        };
        submit_reported(self.exchange.as_ref(), &action, &self.signer).await
    }

    pub async fn activate(&self) -> Result<ExchangeResponse> {
        self.set(ExecutionMode::BigBlocks).await
    }

    pub async fn deactivate(&self) -> Result<ExchangeResponse> {
        self.set(ExecutionMode::SmallBlocks).await
    }
}
