//! Typed-data signer capability and the chain-id pinning adapter.

use std::sync::Arc;

use alloy_primitives::Address;
use async_trait::async_trait;
use tracing::debug;

use super::typed_data::SigningRequest;
use crate::Result;

/// Anything that can produce an EIP-712 signature for a fixed account.
///
/// Implemented by the remote custody client, the local key signer and by
/// [`SignerAdapter`] itself.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait TypedDataSigner: Send + Sync {
    /// Account the signatures are produced for.
    fn address(&self) -> Address;

    /// Sign the request and return a `0x`-prefixed 65-byte hex signature.
    async fn sign_typed_data(&self, request: &SigningRequest) -> Result<String>;
}

/// Wraps a signer and pins the chain id of every domain it signs.
///
/// Whatever chain id the caller put in the domain is replaced by the
/// configured one before the wrapped signer sees the request.
#[derive(Clone)]
pub struct SignerAdapter {
    inner: Arc<dyn TypedDataSigner>,
    address: Address,
    chain_id: u64,
}

impl SignerAdapter {
    pub fn new(inner: Arc<dyn TypedDataSigner>, address: Address, chain_id: u64) -> Self {
        Self {
            inner,
            address,
            chain_id,
        }
    }

    /// Adapter for a signer whose own address is the account address.
    pub fn for_signer(inner: Arc<dyn TypedDataSigner>, chain_id: u64) -> Self {
        let address = inner.address();
        Self::new(inner, address, chain_id)
    }

    /// The chain id every signed domain is pinned to.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }
}

#[async_trait]
impl TypedDataSigner for SignerAdapter {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_typed_data(&self, request: &SigningRequest) -> Result<String> {
        let mut pinned = request.clone();
        pinned.domain = request.domain.with_chain_id(self.chain_id);

        debug!(
            primary_type = %request.primary_type,
            domain = %request.domain.name,
            requested_chain_id = request.domain.chain_id,
            pinned_chain_id = self.chain_id,
            "Signing typed data"
        );

        self.inner.sign_typed_data(&pinned).await
    }
}

impl std::fmt::Debug for SignerAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerAdapter")
            .field("address", &format!("{:?}", self.address))
            .field("chain_id", &self.chain_id)
            .finish()
    }
}
