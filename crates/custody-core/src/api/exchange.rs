//! Hyperliquid exchange action client.
//!
//! Two signing schemes are in play:
//!
//! - user-signed actions (`usdSend`, `withdraw3`) are plain EIP-712 structs
//!   under the `HyperliquidSignTransaction` domain, signed by the account;
//! - L1 actions (`evmUserModify`) are msgpack-hashed into a connection id and
//!   signed as an `Agent` struct under the `Exchange` domain.

use alloy_primitives::{keccak256, B256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::signing::{
    NetworkProfile, SignatureParts, SignerAdapter, SigningRequest, TypedDataDomain,
    TypedDataSigner, TypedField,
};
use crate::{Error, Result};

/// An action submitted to the exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeAction {
    /// Internal USD transfer between exchange accounts.
    UsdSend { destination: String, amount: String },
    /// Withdrawal to an EVM address on the bridge chain.
    Withdraw { destination: String, amount: String },
    /// Switch between small and big EVM blocks.
    EvmUserModify { using_big_blocks: bool },
}

impl ExchangeAction {
    pub fn wire_type(&self) -> &'static str {
        match self {
            ExchangeAction::UsdSend { .. } => "usdSend",
            ExchangeAction::Withdraw { .. } => "withdraw3",
            ExchangeAction::EvmUserModify { .. } => "evmUserModify",
        }
    }
}

/// Exchange reply to a submitted action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeResponse {
    pub status: String,
    #[serde(default)]
    pub response: Value,
}

impl ExchangeResponse {
    /// Turn an `err` status into `Error::Exchange`.
    pub fn into_result(self) -> Result<Self> {
        if self.status == "ok" {
            return Ok(self);
        }
        let message = match &self.response {
            Value::String(s) => s.clone(),
            Value::Null => format!("status {}", self.status),
            other => other.to_string(),
        };
        Err(Error::Exchange { message })
    }
}

/// Capability to sign and submit exchange actions.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ExchangeApi: Send + Sync {
    /// Sign `action` with `signer` and submit it.
    async fn submit_action(
        &self,
        action: &ExchangeAction,
        signer: &SignerAdapter,
    ) -> Result<ExchangeResponse>;
}

/// The body posted to `/exchange`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangePayload {
    pub action: Value,
    pub nonce: u64,
    pub signature: WireSignature,
    pub vault_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WireSignature {
    pub r: String,
    pub s: String,
    pub v: u8,
}

impl From<&SignatureParts> for WireSignature {
    fn from(parts: &SignatureParts) -> Self {
        Self {
            r: parts.r_hex(),
            s: parts.s_hex(),
            v: parts.canonical_v(),
        }
    }
}

/// Msgpack shape of L1 actions for connection id hashing.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum L1Action {
    EvmUserModify(EvmUserModify),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EvmUserModify {
    using_big_blocks: bool,
}

/// Hyperliquid exchange HTTP client.
pub struct ExchangeClient {
    base_url: String,
    profile: NetworkProfile,
    http_client: reqwest::Client,
}

impl ExchangeClient {
    pub fn new(base_url: impl Into<String>, profile: NetworkProfile) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            profile,
            http_client: reqwest::Client::new(),
        }
    }

    /// Build the wire action and the request the signer must sign.
    pub fn prepare(
        &self,
        action: &ExchangeAction,
        nonce: u64,
        signature_chain_id: u64,
    ) -> Result<(Value, SigningRequest)> {
        match action {
            ExchangeAction::UsdSend {
                destination,
                amount,
            } => Ok(user_signed_action(
                "usdSend",
                "HyperliquidTransaction:UsdSend",
                self.profile.exchange_chain,
                destination,
                amount,
                nonce,
                signature_chain_id,
            )),
            ExchangeAction::Withdraw {
                destination,
                amount,
            } => Ok(user_signed_action(
                "withdraw3",
                "HyperliquidTransaction:Withdraw",
                self.profile.exchange_chain,
                destination,
                amount,
                nonce,
                signature_chain_id,
            )),
            ExchangeAction::EvmUserModify { using_big_blocks } => {
                let l1 = L1Action::EvmUserModify(EvmUserModify {
                    using_big_blocks: *using_big_blocks,
                });
                let connection_id = connection_id(&l1, nonce)?;
                let wire = json!({
                    "type": "evmUserModify",
                    "usingBigBlocks": using_big_blocks,
                });
                Ok((wire, agent_request(connection_id, self.profile.is_mainnet)))
            }
        }
    }

    async fn post(&self, payload: &ExchangePayload) -> Result<ExchangeResponse> {
        let url = format!("{}/exchange", self.base_url);
        let response = self.http_client.post(&url).json(payload).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                message: format!("Exchange request failed: {} - {}", status, text),
                status: Some(status.as_u16()),
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl ExchangeApi for ExchangeClient {
    async fn submit_action(
        &self,
        action: &ExchangeAction,
        signer: &SignerAdapter,
    ) -> Result<ExchangeResponse> {
        let nonce = current_nonce();
        let (wire, request) = self.prepare(action, nonce, signer.chain_id())?;

        let signature = signer.sign_typed_data(&request).await?;
        let parts = SignatureParts::decode(&signature)?;

        let payload = ExchangePayload {
            action: wire,
            nonce,
            signature: WireSignature::from(&parts),
            vault_address: None,
        };
        debug!(action = action.wire_type(), nonce, "Posting exchange action");

        let response = self.post(&payload).await?.into_result()?;
        info!(
            action = action.wire_type(),
            user = %signer.address(),
            "Exchange accepted action"
        );
        Ok(response)
    }
}

/// Millisecond timestamp used as the action nonce.
fn current_nonce() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

fn user_signed_action(
    wire_type: &str,
    primary_type: &str,
    exchange_chain: &str,
    destination: &str,
    amount: &str,
    time: u64,
    signature_chain_id: u64,
) -> (Value, SigningRequest) {
    let wire = json!({
        "type": wire_type,
        "signatureChainId": format!("{:#x}", signature_chain_id),
        "hyperliquidChain": exchange_chain,
        "destination": destination,
        "amount": amount,
        "time": time,
    });

    let mut message = Map::new();
    message.insert("hyperliquidChain".into(), Value::from(exchange_chain));
    message.insert("destination".into(), Value::from(destination));
    message.insert("amount".into(), Value::from(amount));
    message.insert("time".into(), Value::from(time));

    let request = SigningRequest::new(
        TypedDataDomain::exchange_user_action(signature_chain_id),
        primary_type,
        vec![
            TypedField::new("hyperliquidChain", "string"),
            TypedField::new("destination", "string"),
            TypedField::new("amount", "string"),
            TypedField::new("time", "uint64"),
        ],
        message,
    );

    (wire, request)
}

/// keccak256(msgpack(action) ‖ nonce ‖ 0x00) with no vault address.
fn connection_id(action: &L1Action, nonce: u64) -> Result<B256> {
    let mut bytes = rmp_serde::to_vec_named(action)
        .map_err(|e| Error::signing(format!("Failed to encode action: {}", e)))?;
    bytes.extend(nonce.to_be_bytes());
    bytes.push(0);
    Ok(keccak256(bytes))
}

fn agent_request(connection_id: B256, is_mainnet: bool) -> SigningRequest {
    let source = if is_mainnet { "a" } else { "b" };

    let mut message = Map::new();
    message.insert("source".into(), Value::from(source));
    message.insert(
        "connectionId".into(),
        Value::String(format!("{:?}", connection_id)),
    );

    SigningRequest::new(
        TypedDataDomain::exchange_l1_agent(),
        "Agent",
        vec![
            TypedField::new("source", "string"),
            TypedField::new("connectionId", "bytes32"),
        ],
        message,
    )
}
