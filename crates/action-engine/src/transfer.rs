//! Exchange withdrawals and internal USD transfers.

use std::sync::Arc;

use custody_core::api::{ExchangeAction, ExchangeApi, ExchangeResponse};
use custody_core::signing::{SignerAdapter, TypedDataSigner};
use custody_core::{Error, FailureCategory, Result};
use tracing::{error, info};

/// Required prefix of destination addresses.
const ADDRESS_PREFIX: &str = "0x";

/// A validated destination/amount pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub destination: String,
    pub amount: String,
}

impl TransferRequest {
    /// Validate raw inputs. No network call is made.
    pub fn validate(destination: Option<&str>, amount: Option<&str>) -> Result<Self> {
        let amount = amount
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or_else(|| Error::InvalidInput {
                message: "Amount is required".to_string(),
            })?;

        let destination = destination
            .map(str::trim)
            .ok_or_else(|| Error::InvalidInput {
                message: "Destination address is required".to_string(),
            })?;
        if !destination.starts_with(ADDRESS_PREFIX) {
            return Err(Error::InvalidInput {
                message: format!(
                    "Destination address must start with {}: {}",
                    ADDRESS_PREFIX, destination
                ),
            });
        }

        Ok(Self {
            destination: destination.to_string(),
            amount: amount.to_string(),
        })
    }
}

/// Withdraws from the exchange to an EVM address.
pub struct WithdrawFlow {
    exchange: Arc<dyn ExchangeApi>,
    signer: SignerAdapter,
}

impl WithdrawFlow {
    pub fn new(exchange: Arc<dyn ExchangeApi>, signer: SignerAdapter) -> Self {
        Self { exchange, signer }
    }

    pub async fn execute(
        &self,
        destination: Option<&str>,
        amount: Option<&str>,
    ) -> Result<ExchangeResponse> {
        let request = TransferRequest::validate(destination, amount)?;
        let action = ExchangeAction::Withdraw {
            destination: request.destination,
            amount: request.amount,
        };
        submit_reported(self.exchange.as_ref(), &action, &self.signer).await
    }
}

/// Sends USD to another exchange account.
pub struct TransferFlow {
    exchange: Arc<dyn ExchangeApi>,
    signer: SignerAdapter,
}

impl TransferFlow {
    pub fn new(exchange: Arc<dyn ExchangeApi>, signer: SignerAdapter) -> Self {
        Self { exchange, signer }
    }

    pub async fn execute(
        &self,
        destination: Option<&str>,
        amount: Option<&str>,
    ) -> Result<ExchangeResponse> {
        let request = TransferRequest::validate(destination, amount)?;
        let action = ExchangeAction::UsdSend {
            destination: request.destination,
            amount: request.amount,
        };
        submit_reported(self.exchange.as_ref(), &action, &self.signer).await
    }
}

/// Submit an action, logging the classified failure before returning it.
pub(crate) async fn submit_reported(
    exchange: &dyn ExchangeApi,
    action: &ExchangeAction,
    signer: &SignerAdapter,
) -> Result<ExchangeResponse> {
    match exchange.submit_action(action, signer).await {
        Ok(response) => {
            info!(
                action = action.wire_type(),
                account = %signer.address(),
                "Exchange action completed"
            );
            Ok(response)
        }
        Err(e) => {
            let category = FailureCategory::classify(&e);
            error!(
                action = action.wire_type(),
                category = ?category,
                "{}",
                category.operator_message()
            );
            Err(e)
        }
    }
}
