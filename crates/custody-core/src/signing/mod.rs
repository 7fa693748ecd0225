//! Signing pipeline for custody-held accounts.
//!
//! Every signature leaves this crate through a [`SignerAdapter`], which pins
//! the domain chain id before delegating to the actual key holder.
//!
//! # Architecture
//!
//! ```text
//! build_permit / exchange actions
//!       │
//!       ▼
//! SigningRequest ──► SignerAdapter ──► CustodyClient | LocalKeySigner
//!                        (chain id pinned)        │
//!                                                 ▼
//!                                         0x-hex signature
//!                                                 │
//!                                                 ▼
//!                                     SignatureParts::decode → (r, s, v)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use custody_core::signing::{build_permit, SignatureParts, SignerAdapter, TypedDataSigner};
//!
//! let adapter = SignerAdapter::new(custody, vault, 42161);
//! let request = build_permit(vault, bridge, "5000000", "3", deadline, true);
//! let signature = adapter.sign_typed_data(&request).await?;
//! let parts = SignatureParts::decode(&signature)?;
//! ```

pub mod adapter;
pub mod codec;
pub mod domain;
pub mod local;
pub mod permit;
pub mod typed_data;

pub use adapter::{SignerAdapter, TypedDataSigner};
pub use codec::{SignatureParts, SIGNATURE_HEX_LEN};
pub use domain::{
    NetworkProfile, TokenProfile, TypedDataDomain, ARBITRUM_CHAIN_ID, ARBITRUM_SEPOLIA_CHAIN_ID,
    BRIDGE_ADDRESS, L1_AGENT_CHAIN_ID, USDC_ADDRESS, USDC_DECIMALS,
};
pub use local::LocalKeySigner;
pub use permit::{build_permit, build_permit_request, PermitPayload, PERMIT_TYPE};
pub use typed_data::{SigningRequest, TypeDefinitions, TypedField};
