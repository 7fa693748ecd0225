//! Clients for the custody provider, the chain RPC and the exchange.

pub mod bridge;
pub mod custody;
pub mod exchange;
pub mod rpc;

pub use custody::CustodyClient;
pub use exchange::{ExchangeAction, ExchangeApi, ExchangeClient, ExchangeResponse};
pub use rpc::{wait_for_confirmation, ChainRpc, RpcClient, TransactionSubmitter, TxRequest};
