//! Custody provider REST client.
//!
//! The custody vault holds the account key. Typed-data signatures and
//! contract calls are requested as custody transactions, then polled until
//! the provider has produced a signature or a transaction hash.

use std::str::FromStr;
use std::time::Duration;

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::rpc::{TransactionSubmitter, TxRequest};
use crate::config::CustodyConfig;
use crate::signing::{SigningRequest, TypedDataSigner};
use crate::{Error, Result};

const TRANSACTIONS_PATH: &str = "/api/v1/transactions";

/// Custody states after which a request can no longer succeed.
const FAILED_STATES: [&str; 4] = ["aborted", "error", "cancelled", "stuck"];

/// REST client for the custody provider.
pub struct CustodyClient {
    base_url: String,
    api_token: String,
    vault_id: String,
    vault_address: Address,
    /// Chain the vault transacts on.
    chain_id: u64,
    poll_interval: Duration,
    timeout: Duration,
    http_client: reqwest::Client,
}

impl CustodyClient {
    pub fn new(config: &CustodyConfig, chain_id: u64) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            vault_id: config.vault_id.clone(),
            vault_address: config.vault_address,
            chain_id,
            poll_interval: config.poll_interval,
            timeout: config.timeout,
            http_client,
        })
    }

    async fn create_transaction(&self, body: &Value) -> Result<CustodyTransaction> {
        let url = format!("{}{}", self.base_url, TRANSACTIONS_PATH);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                message: format!("Custody request failed: {} - {}", status, text),
                status: Some(status.as_u16()),
            });
        }

        Ok(response.json().await?)
    }

    async fn get_transaction(&self, id: &str) -> Result<CustodyTransaction> {
        let url = format!("{}{}/{}", self.base_url, TRANSACTIONS_PATH, id);
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.api_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Api {
                message: format!("Custody status lookup failed: {}", response.status()),
                status: Some(response.status().as_u16()),
            });
        }

        Ok(response.json().await?)
    }

    /// Poll a custody transaction until `extract` yields a value.
    ///
    /// `fail` builds the error for failed states and for the timeout.
    async fn wait_for<T, F>(
        &self,
        mut current: CustodyTransaction,
        fail: fn(&str, String) -> Error,
        extract: F,
    ) -> Result<T>
    where
        F: Fn(&CustodyTransaction) -> Result<Option<T>>,
    {
        let started = tokio::time::Instant::now();

        loop {
            if current.has_failed() {
                warn!(id = %current.id, state = %current.state, "Custody transaction failed");
                return Err(fail(
                    &current.id,
                    format!("custody transaction ended in state {}", current.state),
                ));
            }
            if let Some(value) = extract(&current)? {
                return Ok(value);
            }
            if started.elapsed() >= self.timeout {
                return Err(fail(
                    &current.id,
                    format!(
                        "custody transaction still {} after {}s",
                        current.state,
                        self.timeout.as_secs()
                    ),
                ));
            }

            debug!(id = %current.id, state = %current.state, "Waiting on custody");
            tokio::time::sleep(self.poll_interval).await;
            current = self.get_transaction(&current.id).await?;
        }
    }
}

#[async_trait]
impl TypedDataSigner for CustodyClient {
    fn address(&self) -> Address {
        self.vault_address
    }

    async fn sign_typed_data(&self, request: &SigningRequest) -> Result<String> {
        let body = typed_message_body(&self.vault_id, request)?;
        let created = self.create_transaction(&body).await?;

        info!(
            id = %created.id,
            primary_type = %request.primary_type,
            chain_id = request.domain.chain_id,
            "Typed-data signature requested from custody"
        );

        self.wait_for(
            created,
            |_, message| Error::SigningFailed { message },
            CustodyTransaction::signature_hex,
        )
        .await
    }
}

#[async_trait]
impl TransactionSubmitter for CustodyClient {
    async fn submit(&self, tx: &TxRequest) -> Result<B256> {
        let body = transaction_body(&self.vault_id, self.chain_id, tx);
        let created = self.create_transaction(&body).await?;

        info!(id = %created.id, to = %tx.to, "Contract call submitted to custody");

        self.wait_for(
            created,
            |id, message| Error::TransactionRejected {
                tx_hash: id.to_string(),
                message,
            },
            CustodyTransaction::tx_hash,
        )
        .await
    }
}

impl std::fmt::Debug for CustodyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustodyClient")
            .field("base_url", &self.base_url)
            .field("api_token", &"[REDACTED]")
            .field("vault_id", &self.vault_id)
            .field("vault_address", &self.vault_address)
            .field("chain_id", &self.chain_id)
            .finish()
    }
}

fn chain_name(chain_id: u64) -> String {
    format!("evm_{}", chain_id)
}

/// Request body for a typed-data signature.
fn typed_message_body(vault_id: &str, request: &SigningRequest) -> Result<Value> {
    let raw_data = serde_json::to_string(&request.to_eip712_json())?;
    Ok(json!({
        "vault_id": vault_id,
        "signer_type": "api_signer",
        "type": "evm_message",
        "details": {
            "type": "typed_message_type",
            "chain": chain_name(request.domain.chain_id),
            "raw_data": raw_data,
        },
    }))
}

/// Request body for a contract call.
fn transaction_body(vault_id: &str, chain_id: u64, tx: &TxRequest) -> Value {
    let mut details = json!({
        "type": "evm_raw_transaction",
        "chain": chain_name(chain_id),
        "to": format!("{:?}", tx.to),
        "value": tx.value.to_string(),
        "data": {
            "type": "hex",
            "hex_data": format!("0x{}", hex::encode(&tx.data)),
        },
    });

    if let (Some(limit), Some(max_fee), Some(priority_fee)) = (
        tx.gas_limit,
        tx.max_fee_per_gas,
        tx.max_priority_fee_per_gas,
    ) {
        details["gas"] = json!({
            "type": "custom",
            "gas_limit": limit.to_string(),
            "details": {
                "type": "dynamic",
                "max_fee_per_gas": max_fee.to_string(),
                "max_priority_fee_per_gas": priority_fee.to_string(),
            },
        });
    }

    json!({
        "vault_id": vault_id,
        "signer_type": "api_signer",
        "type": "evm_transaction",
        "details": details,
    })
}

#[derive(Debug, Clone, Deserialize)]
struct CustodyTransaction {
    id: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    signatures: Vec<CustodySignature>,
    #[serde(default)]
    hash: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CustodySignature {
    data: Option<String>,
}

impl CustodyTransaction {
    fn has_failed(&self) -> bool {
        FAILED_STATES.contains(&self.state.as_str())
    }

    /// The signature as `0x` hex once the message is completed.
    fn signature_hex(&self) -> Result<Option<String>> {
        if self.state != "completed" {
            return Ok(None);
        }
        let encoded = self
            .signatures
            .first()
            .and_then(|s| s.data.as_deref())
            .ok_or_else(|| Error::signing("custody returned no signature"))?;

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| Error::signing(format!("custody signature is not base64: {}", e)))?;

        Ok(Some(format!("0x{}", hex::encode(bytes))))
    }

    fn tx_hash(&self) -> Result<Option<B256>> {
        match self.hash.as_deref() {
            Some(hash) => B256::from_str(hash)
                .map(Some)
                .map_err(|e| Error::TransactionRejected {
                    tx_hash: hash.to_string(),
                    message: format!("custody returned an invalid hash: {}", e),
                }),
            None => Ok(None),
        }
    }
}
