//! Arbitrary contract calls through the custody signer.

use std::str::FromStr;
use std::sync::Arc;

use alloy_primitives::{Address, Bytes};
use custody_core::api::{wait_for_confirmation, ChainRpc, TransactionSubmitter, TxRequest};
use custody_core::types::RawCallSpec;
use custody_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ConfirmationPolicy;

/// Outcome of a mined raw call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCallReceipt {
    pub transaction_hash: String,
    pub block_number: u64,
}

pub struct RawCallFlow {
    rpc: Arc<dyn ChainRpc>,
    submitter: Arc<dyn TransactionSubmitter>,
    confirmation: ConfirmationPolicy,
}

impl RawCallFlow {
    pub fn new(
        rpc: Arc<dyn ChainRpc>,
        submitter: Arc<dyn TransactionSubmitter>,
        confirmation: ConfirmationPolicy,
    ) -> Self {
        Self {
            rpc,
            submitter,
            confirmation,
        }
    }

    pub async fn execute(&self, spec: &RawCallSpec) -> Result<RawCallReceipt> {
        let tx = build_request(spec)?;
        let tx_hash = self.submitter.submit(&tx).await?;
        info!(tx_hash = %tx_hash, to = %tx.to, "Raw call submitted");

        let receipt = wait_for_confirmation(
            self.rpc.as_ref(),
            tx_hash,
            self.confirmation.poll_interval,
            self.confirmation.timeout,
        )
        .await?;

        Ok(RawCallReceipt {
            transaction_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
        })
    }
}

fn build_request(spec: &RawCallSpec) -> Result<TxRequest> {
    let contract = spec
        .contract
        .as_deref()
        .ok_or_else(|| Error::InvalidInput {
            message: "RAW_CALL_CONTRACT is required".to_string(),
        })?;
    let to = Address::from_str(contract.trim()).map_err(|e| Error::InvalidInput {
        message: format!("Invalid contract address {}: {}", contract, e),
    })?;

    let calldata = spec
        .calldata
        .as_deref()
        .map(str::trim)
        .ok_or_else(|| Error::InvalidInput {
            message: "RAW_CALL_DATA is required".to_string(),
        })?;
    let body = calldata.strip_prefix("0x").ok_or_else(|| Error::InvalidInput {
        message: "Calldata must be 0x-prefixed hex".to_string(),
    })?;
    let data = hex::decode(body).map_err(|e| Error::InvalidInput {
        message: format!("Calldata is not valid hex: {}", e),
    })?;

    Ok(TxRequest::new(to, Bytes::from(data)).with_gas(
        spec.gas_limit,
        spec.max_fee_per_gas,
        spec.max_priority_fee_per_gas,
    ))
}
