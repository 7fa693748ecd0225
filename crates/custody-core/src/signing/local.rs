//! Locally held key signer.
//!
//! Used for the exchange agent key, which signs L1 actions on behalf of the
//! custody account, and as the reference signer in tests.

use std::str::FromStr;

use alloy_primitives::Address;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;

use super::adapter::TypedDataSigner;
use super::typed_data::SigningRequest;
use crate::{Error, Result};

/// A typed-data signer backed by a private key held in memory.
#[derive(Clone)]
pub struct LocalKeySigner {
    signer: PrivateKeySigner,
    address: Address,
}

impl LocalKeySigner {
    /// Create a signer from a hex-encoded private key.
    ///
    /// # Arguments
    ///
    /// * `key` - A 64-character hex string, optionally prefixed with "0x"
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the private key format is invalid.
    pub fn from_private_key(key: &str) -> Result<Self> {
        let key_clean = key.trim().trim_start_matches("0x");

        let signer = PrivateKeySigner::from_str(key_clean).map_err(|_| {
            Error::invalid_input("Invalid private key format - expected 64 hex characters")
        })?;

        let address = signer.address();

        Ok(Self { signer, address })
    }
}

#[async_trait]
impl TypedDataSigner for LocalKeySigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_typed_data(&self, request: &SigningRequest) -> Result<String> {
        let digest = request.signing_hash()?;

        let signature = self
            .signer
            .sign_hash(&digest)
            .await
            .map_err(|e| Error::signing(format!("Failed to sign typed data: {}", e)))?;

        Ok(format!("0x{}", hex::encode(signature.as_bytes())))
    }
}

impl std::fmt::Debug for LocalKeySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never expose the private key in debug output
        f.debug_struct("LocalKeySigner")
            .field("address", &format!("{}", self.address))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::codec::SignatureParts;
    use crate::signing::domain::TypedDataDomain;
    use crate::signing::typed_data::TypedField;
    use alloy_primitives::Signature;
    use serde_json::{Map, Value};

    // Test private key (DO NOT USE IN PRODUCTION - this is a well-known test key)
    const TEST_PRIVATE_KEY: &str =
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TEST_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    fn request() -> SigningRequest {
        let mut message = Map::new();
        message.insert("note".into(), Value::String("hello".into()));
        SigningRequest::new(
            TypedDataDomain::new("Test", "1", 42161, Address::ZERO),
            "Note",
            vec![TypedField::new("note", "string")],
            message,
        )
    }

    #[test]
    fn test_from_private_key_with_prefix() {
        let signer = LocalKeySigner::from_private_key(TEST_PRIVATE_KEY).unwrap();
        assert_eq!(
            signer.address().to_string().to_lowercase(),
            TEST_ADDRESS.to_lowercase()
        );
    }

    #[test]
    fn test_from_private_key_without_prefix() {
        let key_no_prefix = TEST_PRIVATE_KEY.trim_start_matches("0x");
        let signer = LocalKeySigner::from_private_key(key_no_prefix).unwrap();
        assert_eq!(
            signer.address().to_string().to_lowercase(),
            TEST_ADDRESS.to_lowercase()
        );
    }

    #[test]
    fn test_invalid_private_key() {
        let result = LocalKeySigner::from_private_key("not-a-valid-key");
        assert!(matches!(result, Err(Error::InvalidInput { .. })));
    }

    #[test]
    fn test_debug_does_not_expose_key() {
        let signer = LocalKeySigner::from_private_key(TEST_PRIVATE_KEY).unwrap();
        let debug_str = format!("{:?}", signer);
        assert!(debug_str.contains("LocalKeySigner"));
        assert!(!debug_str.contains("ac0974bec39a17e36ba4a6b4d238ff944bacb478"));
    }

    #[tokio::test]
    async fn test_signature_recovers_to_signer() {
        let signer = LocalKeySigner::from_private_key(TEST_PRIVATE_KEY).unwrap();
        let request = request();

        let signature = signer.sign_typed_data(&request).await.unwrap();
        assert!(signature.starts_with("0x"));
        assert_eq!(signature.len(), 132);

        let parts = SignatureParts::decode(&signature).unwrap();
        assert!(parts.v == 27 || parts.v == 28);

        let bytes = hex::decode(signature.trim_start_matches("0x")).unwrap();
        let recovered = Signature::from_raw(&bytes)
            .unwrap()
            .recover_address_from_prehash(&request.signing_hash().unwrap())
            .unwrap();
        assert_eq!(recovered, signer.address());
    }
}
