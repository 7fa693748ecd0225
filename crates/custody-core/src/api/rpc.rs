//! EVM JSON-RPC client for view calls and receipt lookups.

use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::types::TxReceipt;
use crate::{Error, Result};

/// Read-only chain access used by the flows.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Execute an `eth_call` against `to` at the latest block.
    async fn call_view(&self, to: Address, data: Bytes) -> Result<Bytes>;

    /// Fetch a receipt; `None` while the transaction is still pending.
    async fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<TxReceipt>>;
}

/// A contract call to be signed and broadcast by the account's key holder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    /// Target contract address
    pub to: Address,
    /// Transaction value in wei
    pub value: U256,
    /// Encoded calldata
    pub data: Bytes,
    pub gas_limit: Option<u64>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
}

impl TxRequest {
    pub fn new(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            to,
            value: U256::ZERO,
            data: data.into(),
            gas_limit: None,
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
        }
    }

    /// Set explicit gas parameters.
    pub fn with_gas(mut self, gas_limit: u64, max_fee: u128, max_priority_fee: u128) -> Self {
        self.gas_limit = Some(gas_limit);
        self.max_fee_per_gas = Some(max_fee);
        self.max_priority_fee_per_gas = Some(max_priority_fee);
        self
    }
}

/// Signs and broadcasts contract calls for a fixed account.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    /// Submit the call and return its transaction hash.
    async fn submit(&self, tx: &TxRequest) -> Result<B256>;
}

/// Poll for a receipt until it is mined or the horizon passes.
///
/// A reverted receipt is `TransactionRejected`; no receipt within `timeout`
/// is `ConfirmationTimeout`. RPC errors while polling are returned as-is.
pub async fn wait_for_confirmation(
    rpc: &dyn ChainRpc,
    tx_hash: B256,
    poll_interval: Duration,
    timeout: Duration,
) -> Result<TxReceipt> {
    let started = tokio::time::Instant::now();

    loop {
        if let Some(receipt) = rpc.transaction_receipt(tx_hash).await? {
            if !receipt.success {
                return Err(Error::TransactionRejected {
                    tx_hash: format!("{:?}", tx_hash),
                    message: format!("reverted in block {}", receipt.block_number),
                });
            }
            info!(
                tx_hash = %receipt.transaction_hash,
                block_number = receipt.block_number,
                "Transaction confirmed"
            );
            return Ok(receipt);
        }

        if started.elapsed() + poll_interval > timeout {
            return Err(Error::ConfirmationTimeout {
                tx_hash: format!("{:?}", tx_hash),
                waited_secs: started.elapsed().as_secs(),
            });
        }

        debug!(tx_hash = %tx_hash, "Receipt not available yet");
        tokio::time::sleep(poll_interval).await;
    }
}

/// JSON-RPC client for an EVM chain.
pub struct RpcClient {
    rpc_url: String,
    http_client: reqwest::Client,
}

impl RpcClient {
    /// Create a client with a request timeout.
    pub fn with_timeout(rpc_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            rpc_url: rpc_url.into(),
            http_client,
        })
    }

    async fn rpc_call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<JsonRpcResponse<T>> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };

        let response = self
            .http_client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Api {
                message: format!("RPC request failed: {}", response.status()),
                status: Some(response.status().as_u16()),
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl ChainRpc for RpcClient {
    async fn call_view(&self, to: Address, data: Bytes) -> Result<Bytes> {
        let params = serde_json::json!([
            { "to": format!("{:?}", to), "data": format!("0x{}", hex::encode(&data)) },
            "latest"
        ]);

        let response: JsonRpcResponse<String> = self.rpc_call("eth_call", params).await?;
        let result = response.into_result()?.ok_or_else(|| Error::Api {
            message: "eth_call returned no result".to_string(),
            status: None,
        })?;

        let bytes = hex::decode(result.trim_start_matches("0x")).map_err(|e| Error::Api {
            message: format!("Invalid eth_call result: {}", e),
            status: None,
        })?;
        Ok(Bytes::from(bytes))
    }

    async fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<TxReceipt>> {
        let params = serde_json::json!([format!("{:?}", tx_hash)]);
        let response: JsonRpcResponse<RawReceipt> = self
            .rpc_call("eth_getTransactionReceipt", params)
            .await?;

        match response.into_result()? {
            Some(raw) => Ok(Some(raw.into_receipt()?)),
            None => Ok(None),
        }
    }
}

fn parse_hex_u64(value: &str) -> Result<u64> {
    u64::from_str_radix(value.trim_start_matches("0x"), 16).map_err(|e| Error::Api {
        message: format!("Failed to parse hex quantity {}: {}", value, e),
        status: None,
    })
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'a str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

impl<T> JsonRpcResponse<T> {
    fn into_result(self) -> Result<Option<T>> {
        if let Some(error) = self.error {
            return Err(Error::Api {
                message: format!("RPC error {}: {}", error.code, error.message),
                status: None,
            });
        }
        Ok(self.result)
    }
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: String,
    block_number: String,
    status: Option<String>,
}

impl RawReceipt {
    fn into_receipt(self) -> Result<TxReceipt> {
        Ok(TxReceipt {
            block_number: parse_hex_u64(&self.block_number)?,
            success: self.status.as_deref() == Some("0x1"),
            transaction_hash: self.transaction_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Returns `None` for the first `pending_polls` lookups.
    struct ScriptedRpc {
        pending_polls: u32,
        polls: AtomicU32,
        success: bool,
    }

    #[async_trait]
    impl ChainRpc for ScriptedRpc {
        async fn call_view(&self, _to: Address, _data: Bytes) -> Result<Bytes> {
            Ok(Bytes::new())
        }

        async fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<TxReceipt>> {
            let n = self.polls.fetch_add(1, Ordering::SeqCst);
            if n < self.pending_polls {
                return Ok(None);
            }
            Ok(Some(TxReceipt {
                transaction_hash: format!("{:?}", tx_hash),
                block_number: 1234,
                success: self.success,
            }))
        }
    }

    #[tokio::test]
    async fn test_wait_returns_mined_receipt() {
        let rpc = ScriptedRpc {
            pending_polls: 2,
            polls: AtomicU32::new(0),
            success: true,
        };
        let receipt = wait_for_confirmation(
            &rpc,
            B256::repeat_byte(0xab),
            Duration::from_millis(1),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(receipt.block_number, 1234);
        assert_eq!(rpc.polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_wait_reports_revert() {
        let rpc = ScriptedRpc {
            pending_polls: 0,
            polls: AtomicU32::new(0),
            success: false,
        };
        let err = wait_for_confirmation(
            &rpc,
            B256::repeat_byte(0x01),
            Duration::from_millis(1),
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::TransactionRejected { .. }));
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let rpc = ScriptedRpc {
            pending_polls: u32::MAX,
            polls: AtomicU32::new(0),
            success: true,
        };
        let err = wait_for_confirmation(
            &rpc,
            B256::repeat_byte(0x02),
            Duration::from_millis(5),
            Duration::from_millis(20),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::ConfirmationTimeout { .. }));
    }

    #[test]
    fn test_raw_receipt_parsing() {
        let raw: RawReceipt = serde_json::from_value(serde_json::json!({
            "transactionHash": "0xabc",
            "blockNumber": "0x10",
            "status": "0x1",
            "gasUsed": "0x5208"
        }))
        .unwrap();
        let receipt = raw.into_receipt().unwrap();
        assert_eq!(receipt.block_number, 16);
        assert!(receipt.success);

        let reverted: RawReceipt = serde_json::from_value(serde_json::json!({
            "transactionHash": "0xabc",
            "blockNumber": "0x10",
            "status": "0x0"
        }))
        .unwrap();
        assert!(!reverted.into_receipt().unwrap().success);
    }

    #[test]
    fn test_rpc_error_surfaces() {
        let response: JsonRpcResponse<String> = serde_json::from_value(serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32000, "message": "execution reverted" }
        }))
        .unwrap();
        let err = response.into_result().unwrap_err();
        assert!(err.to_string().contains("execution reverted"));
    }
}
