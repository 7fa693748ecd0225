//! Routes one configured action to exactly one flow.

use std::sync::Arc;

use custody_core::api::{ChainRpc, ExchangeApi, ExchangeResponse, TransactionSubmitter};
use custody_core::config::NetworkConfig;
use custody_core::signing::{SignerAdapter, TypedDataSigner};
use custody_core::types::{ActionConfig, ActionKind, DepositReceipt};
use custody_core::{Error, Result};
use serde::Serialize;
use tracing::info;

use crate::deposit::DepositFlow;
use crate::execution_mode::{ExecutionMode, ExecutionModeFlow};
use crate::raw_call::{RawCallFlow, RawCallReceipt};
use crate::transfer::{TransferFlow, WithdrawFlow};
use crate::ConfirmationPolicy;

/// Result of a dispatched action.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", content = "result", rename_all = "camelCase")]
pub enum ActionOutcome {
    Deposit(DepositReceipt),
    Withdraw(ExchangeResponse),
    SendUsd(ExchangeResponse),
    ActivateBigBlocks(ExchangeResponse),
    DeactivateBigBlocks(ExchangeResponse),
    RawCall(RawCallReceipt),
}

/// Holds the collaborators every flow may need.
pub struct ActionDispatcher {
    rpc: Arc<dyn ChainRpc>,
    submitter: Arc<dyn TransactionSubmitter>,
    exchange: Arc<dyn ExchangeApi>,
    custody: SignerAdapter,
    network: NetworkConfig,
}

impl ActionDispatcher {
    pub fn new(
        rpc: Arc<dyn ChainRpc>,
        submitter: Arc<dyn TransactionSubmitter>,
        exchange: Arc<dyn ExchangeApi>,
        custody: SignerAdapter,
        network: NetworkConfig,
    ) -> Self {
        Self {
            rpc,
            submitter,
            exchange,
            custody,
            network,
        }
    }

    /// Run the configured action.
    ///
    /// Fails with `Config` when the action targets a different network than
    /// the collaborators were built for.
    pub async fn dispatch(&self, config: &ActionConfig) -> Result<ActionOutcome> {
        if config.is_mainnet() != self.network.profile.is_mainnet {
            return Err(Error::Config {
                message: format!(
                    "{} targets {} but the network is configured for chain {}",
                    config.action,
                    if config.is_testnet { "testnet" } else { "mainnet" },
                    self.network.profile.chain_id
                ),
            });
        }

        info!(
            action = %config.action,
            testnet = config.is_testnet,
            account = %self.custody.address(),
            "Dispatching action"
        );

        let destination = config.destination.as_deref();
        let amount = config.amount.as_deref();

        match config.action {
            ActionKind::Deposit => {
                let flow = DepositFlow::new(
                    self.rpc.clone(),
                    self.submitter.clone(),
                    self.custody.clone(),
                    self.network.profile.clone(),
                    self.network.require_bridge()?,
                    self.confirmation(),
                );
                flow.execute(amount).await.map(ActionOutcome::Deposit)
            }
            ActionKind::Withdraw => WithdrawFlow::new(self.exchange.clone(), self.custody.clone())
                .execute(destination, amount)
                .await
                .map(ActionOutcome::Withdraw),
            ActionKind::SendUsd => TransferFlow::new(self.exchange.clone(), self.custody.clone())
                .execute(destination, amount)
                .await
                .map(ActionOutcome::SendUsd),
            ActionKind::ActivateBigBlocks => self
                .execution_mode(config)?
                .set(ExecutionMode::BigBlocks)
                .await
                .map(ActionOutcome::ActivateBigBlocks),
            ActionKind::DeactivateBigBlocks => self
                .execution_mode(config)?
                .set(ExecutionMode::SmallBlocks)
                .await
                .map(ActionOutcome::DeactivateBigBlocks),
            ActionKind::RawCall => {
                RawCallFlow::new(self.rpc.clone(), self.submitter.clone(), self.confirmation())
                    .execute(&config.raw_call)
                    .await
                    .map(ActionOutcome::RawCall)
            }
        }
    }

    fn execution_mode(&self, config: &ActionConfig) -> Result<ExecutionModeFlow> {
        ExecutionModeFlow::from_agent_key(self.exchange.clone(), config.agent_key.as_ref())
    }

    fn confirmation(&self) -> ConfirmationPolicy {
        ConfirmationPolicy::from(&self.network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;
    use custody_core::api::exchange::MockExchangeApi;
    use custody_core::api::rpc::{MockChainRpc, MockTransactionSubmitter};
    use custody_core::api::ExchangeAction;
    use custody_core::signing::adapter::MockTypedDataSigner;
    use custody_core::signing::NetworkProfile;
    use custody_core::types::AgentKey;
    use serde_json::json;
    use std::time::Duration;

    const DESTINATION: &str = "0x0000000000000000000000000000000000000abc";

    fn network(is_mainnet: bool) -> NetworkConfig {
        let profile = NetworkProfile::for_network(is_mainnet);
        NetworkConfig {
            rpc_url: profile.rpc_url.to_string(),
            exchange_url: profile.exchange_url.to_string(),
            bridge: profile.bridge,
            confirmation_timeout: Duration::from_secs(1),
            receipt_poll_interval: Duration::from_millis(1),
            profile,
        }
    }

    fn custody() -> SignerAdapter {
        let mut signer = MockTypedDataSigner::new();
        signer.expect_sign_typed_data().never();
        SignerAdapter::new(Arc::new(signer), Address::ZERO, 42161)
    }

    fn dispatcher(exchange: MockExchangeApi, is_mainnet: bool) -> ActionDispatcher {
        let mut rpc = MockChainRpc::new();
        rpc.expect_call_view().never();
        let mut submitter = MockTransactionSubmitter::new();
        submitter.expect_submit().never();

        ActionDispatcher::new(
            Arc::new(rpc),
            Arc::new(submitter),
            Arc::new(exchange),
            custody(),
            network(is_mainnet),
        )
    }

    fn expect_single(exchange: &mut MockExchangeApi, expected: ExchangeAction) {
        exchange
            .expect_submit_action()
            .withf(move |action, _| *action == expected)
            .times(1)
            .returning(|_, _| {
                Ok(ExchangeResponse {
                    status: "ok".to_string(),
                    response: json!({ "type": "default" }),
                })
            });
    }

    #[tokio::test]
    async fn test_send_usd_routes_to_transfer() {
        let mut exchange = MockExchangeApi::new();
        expect_single(
            &mut exchange,
            ExchangeAction::UsdSend {
                destination: DESTINATION.to_string(),
                amount: "1".to_string(),
            },
        );

        let config = ActionConfig::new(ActionKind::SendUsd, false)
            .with_destination(DESTINATION)
            .with_amount("1");
        let outcome = dispatcher(exchange, true).dispatch(&config).await.unwrap();
        assert!(matches!(outcome, ActionOutcome::SendUsd(_)));

        let rendered = serde_json::to_value(&outcome).unwrap();
        assert_eq!(rendered["action"], "sendUsd");
        assert_eq!(rendered["result"]["status"], "ok");
    }

    #[tokio::test]
    async fn test_withdraw_routes_to_withdraw() {
        let mut exchange = MockExchangeApi::new();
        expect_single(
            &mut exchange,
            ExchangeAction::Withdraw {
                destination: DESTINATION.to_string(),
                amount: "2".to_string(),
            },
        );

        let config = ActionConfig::new(ActionKind::Withdraw, false)
            .with_destination(DESTINATION)
            .with_amount("2");
        let outcome = dispatcher(exchange, true).dispatch(&config).await.unwrap();
        assert!(matches!(outcome, ActionOutcome::Withdraw(_)));
    }

    #[tokio::test]
    async fn test_deactivate_routes_to_toggle() {
        let mut exchange = MockExchangeApi::new();
        expect_single(
            &mut exchange,
            ExchangeAction::EvmUserModify {
                using_big_blocks: false,
            },
        );

        let config = ActionConfig::new(ActionKind::DeactivateBigBlocks, false).with_agent_key(
            AgentKey::new("0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"),
        );
        let outcome = dispatcher(exchange, true).dispatch(&config).await.unwrap();
        assert!(matches!(outcome, ActionOutcome::DeactivateBigBlocks(_)));
    }

    #[tokio::test]
    async fn test_toggle_without_agent_key_fails() {
        let mut exchange = MockExchangeApi::new();
        exchange.expect_submit_action().never();

        let config = ActionConfig::new(ActionKind::ActivateBigBlocks, false);
        let err = dispatcher(exchange, true)
            .dispatch(&config)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_testnet_deposit_requires_bridge() {
        let mut exchange = MockExchangeApi::new();
        exchange.expect_submit_action().never();

        let config = ActionConfig::new(ActionKind::Deposit, true).with_amount("5");
        let err = dispatcher(exchange, false)
            .dispatch(&config)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[tokio::test]
    async fn test_network_mismatch_is_rejected() {
        for (is_testnet, is_mainnet) in [(true, true), (false, false)] {
            let mut exchange = MockExchangeApi::new();
            exchange.expect_submit_action().never();

            let config = ActionConfig::new(ActionKind::SendUsd, is_testnet)
                .with_destination(DESTINATION)
                .with_amount("1");
            let err = dispatcher(exchange, is_mainnet)
                .dispatch(&config)
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Config { .. }), "{err}");
        }
    }

    #[tokio::test]
    async fn test_raw_call_validation_happens_before_submit() {
        let exchange = MockExchangeApi::new();
        let config = ActionConfig::new(ActionKind::RawCall, false);
        let err = dispatcher(exchange, true)
            .dispatch(&config)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
    }

    #[test]
    fn test_unknown_action_never_reaches_a_flow() {
        let err = "bridgeAll".parse::<ActionKind>().unwrap_err();
        assert!(matches!(err, Error::UnknownAction(ref a) if a == "bridgeAll"));
    }
}
