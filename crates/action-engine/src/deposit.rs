//! Permit-based USDC deposit into the bridge contract.
//!
//! The whole flow runs strictly in order: the amount is checked locally,
//! the permit nonce is read fresh, the deadline is computed right before
//! signing, and nothing is retried.

use std::str::FromStr;
use std::sync::Arc;

use alloy_primitives::{Address, U256};
use custody_core::api::bridge::{decode_nonce, encode_batched_deposit, encode_nonces};
use custody_core::api::{wait_for_confirmation, ChainRpc, TransactionSubmitter, TxRequest};
use custody_core::signing::{build_permit_request, NetworkProfile, PermitPayload, SignatureParts};
use custody_core::signing::{SignerAdapter, TypedDataSigner};
use custody_core::types::{DepositReceipt, DepositSignature, DepositStruct};
use custody_core::{Error, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::ConfirmationPolicy;

/// Smallest accepted deposit, in whole tokens. Inclusive.
pub const MIN_DEPOSIT_TOKENS: i64 = 5;

/// Lifetime of a permit signature.
pub const PERMIT_WINDOW_SECS: i64 = 3600;

/// Deposits USDC from the custody vault into the exchange bridge.
pub struct DepositFlow {
    rpc: Arc<dyn ChainRpc>,
    submitter: Arc<dyn TransactionSubmitter>,
    signer: SignerAdapter,
    profile: NetworkProfile,
    bridge: Address,
    confirmation: ConfirmationPolicy,
    clock: fn() -> i64,
}

impl DepositFlow {
    pub fn new(
        rpc: Arc<dyn ChainRpc>,
        submitter: Arc<dyn TransactionSubmitter>,
        signer: SignerAdapter,
        profile: NetworkProfile,
        bridge: Address,
        confirmation: ConfirmationPolicy,
    ) -> Self {
        Self {
            rpc,
            submitter,
            signer,
            profile,
            bridge,
            confirmation,
            clock: unix_now,
        }
    }

    /// Replace the clock used for the permit deadline.
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    /// Run the deposit. An absent amount deposits the minimum.
    pub async fn execute(&self, amount: Option<&str>) -> Result<DepositReceipt> {
        let owner = self.signer.address();

        // Rejected inputs never reach the chain
        let requested = parse_amount(amount)?;
        let units = to_token_units(requested, self.profile.token.decimals)?;

        let nonce = self.fetch_nonce(owner).await?;
        debug!(owner = %owner, nonce = %nonce, "Fetched permit nonce");

        let deadline = (self.clock)() + PERMIT_WINDOW_SECS;

        let payload = PermitPayload {
            owner,
            spender: self.bridge,
            value: units.to_string(),
            nonce: nonce.to_string(),
            deadline: deadline.to_string(),
        };
        let request = build_permit_request(&payload, &self.profile);

        let signature = self.signer.sign_typed_data(&request).await?;
        let parts = SignatureParts::decode(&signature)?;

        let deposit = DepositStruct {
            user: owner,
            usd: payload.value.clone(),
            deadline: payload.deadline.clone(),
            signature: DepositSignature::from(&parts),
        };
        let calldata = encode_batched_deposit(std::slice::from_ref(&deposit))?;

        let tx_hash = self
            .submitter
            .submit(&TxRequest::new(self.bridge, calldata))
            .await?;
        info!(
            tx_hash = %tx_hash,
            user = %owner,
            amount = %requested,
            "Deposit submitted to bridge"
        );

        let receipt = wait_for_confirmation(
            self.rpc.as_ref(),
            tx_hash,
            self.confirmation.poll_interval,
            self.confirmation.timeout,
        )
        .await?;

        Ok(DepositReceipt {
            transaction_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            amount: requested.normalize().to_string(),
            user: owner,
        })
    }

    async fn fetch_nonce(&self, owner: Address) -> Result<U256> {
        let returned = self
            .rpc
            .call_view(self.profile.token.address, encode_nonces(owner))
            .await
            .map_err(|e| Error::NonceFetchFailed {
                message: e.to_string(),
            })?;
        decode_nonce(&returned)
    }
}

fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Parse and bound-check a human amount.
fn parse_amount(amount: Option<&str>) -> Result<Decimal> {
    let minimum = Decimal::from(MIN_DEPOSIT_TOKENS);

    let requested = match amount.map(str::trim).filter(|a| !a.is_empty()) {
        Some(raw) => Decimal::from_str(raw).map_err(|_| Error::InvalidInput {
            message: format!("Deposit amount is not a number: {}", raw),
        })?,
        None => minimum,
    };

    if requested < minimum {
        return Err(Error::AmountTooLow {
            minimum: minimum.to_string(),
            requested: requested.to_string(),
        });
    }
    Ok(requested)
}

/// Convert a human amount into the token's smallest unit.
fn to_token_units(amount: Decimal, decimals: u32) -> Result<u64> {
    let normalized = amount.normalize();
    if normalized.scale() > decimals {
        return Err(Error::InvalidInput {
            message: format!(
                "Deposit amount {} has more than {} decimal places",
                normalized, decimals
            ),
        });
    }

    normalized
        .checked_mul(Decimal::from(10u64.pow(decimals)))
        .and_then(|units| units.to_u64())
        .ok_or_else(|| Error::InvalidInput {
            message: format!("Deposit amount {} is out of range", normalized),
        })
}
