//! EIP-2612 permit typed data for bridge deposits.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::domain::NetworkProfile;
use super::typed_data::{SigningRequest, TypedField};

/// Permit primary type name.
pub const PERMIT_TYPE: &str = "Permit";

/// Permit message. Numeric fields are decimal strings in the token's
/// smallest unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitPayload {
    pub owner: Address,
    pub spender: Address,
    pub value: String,
    pub nonce: String,
    pub deadline: String,
}

impl PermitPayload {
    /// Field list of the `Permit` struct. Order is part of the type hash.
    pub fn fields() -> Vec<TypedField> {
        vec![
            TypedField::new("owner", "address"),
            TypedField::new("spender", "address"),
            TypedField::new("value", "uint256"),
            TypedField::new("nonce", "uint256"),
            TypedField::new("deadline", "uint256"),
        ]
    }

    fn message(&self) -> Map<String, Value> {
        let mut message = Map::new();
        message.insert("owner".into(), Value::String(self.owner.to_string()));
        message.insert("spender".into(), Value::String(self.spender.to_string()));
        message.insert("value".into(), Value::String(self.value.clone()));
        message.insert("nonce".into(), Value::String(self.nonce.clone()));
        message.insert("deadline".into(), Value::String(self.deadline.clone()));
        message
    }
}

/// Build the permit signing request for the selected network.
pub fn build_permit(
    owner: Address,
    spender: Address,
    value: impl Into<String>,
    nonce: impl Into<String>,
    deadline: impl Into<String>,
    is_mainnet: bool,
) -> SigningRequest {
    let payload = PermitPayload {
        owner,
        spender,
        value: value.into(),
        nonce: nonce.into(),
        deadline: deadline.into(),
    };
    build_permit_request(&payload, &NetworkProfile::for_network(is_mainnet))
}

/// Build the permit signing request for an explicit profile.
pub fn build_permit_request(payload: &PermitPayload, profile: &NetworkProfile) -> SigningRequest {
    SigningRequest::new(
        profile.permit_domain(),
        PERMIT_TYPE,
        PermitPayload::fields(),
        payload.message(),
    )
}
