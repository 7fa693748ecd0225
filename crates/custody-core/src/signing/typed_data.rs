//! Typed-data signing requests.
//!
//! A [`SigningRequest`] is the `{domain, types, primaryType, message}` triple
//! handed to a typed-data signer. It can render itself in the
//! `eth_signTypedData_v4` JSON shape for remote signers and compute its own
//! EIP-712 digest for local ones.

use std::collections::BTreeMap;
use std::str::FromStr;

use alloy_primitives::{keccak256, Address, B256, U256};
use alloy_sol_types::SolValue;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::domain::TypedDataDomain;
use crate::{Error, Result};

/// A single named, typed field of an EIP-712 struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedField {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl TypedField {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
        }
    }
}

/// Struct name → ordered field list.
pub type TypeDefinitions = BTreeMap<String, Vec<TypedField>>;

/// Everything a typed-data signer needs to produce a signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningRequest {
    pub domain: TypedDataDomain,
    pub types: TypeDefinitions,
    pub primary_type: String,
    /// Field values, in insertion order.
    pub message: Map<String, Value>,
}

impl SigningRequest {
    pub fn new(
        domain: TypedDataDomain,
        primary_type: impl Into<String>,
        fields: Vec<TypedField>,
        message: Map<String, Value>,
    ) -> Self {
        let primary_type = primary_type.into();
        let mut types = TypeDefinitions::new();
        types.insert(primary_type.clone(), fields);
        Self {
            domain,
            types,
            primary_type,
            message,
        }
    }

    /// Fields of the primary type.
    pub fn primary_fields(&self) -> Result<&[TypedField]> {
        self.types
            .get(&self.primary_type)
            .map(Vec::as_slice)
            .ok_or_else(|| {
                Error::signing(format!(
                    "primary type {} has no type definition",
                    self.primary_type
                ))
            })
    }

    /// Render the request as `eth_signTypedData_v4` JSON.
    pub fn to_eip712_json(&self) -> Value {
        let mut types = Map::new();
        types.insert(
            "EIP712Domain".to_string(),
            serde_json::json!([
                { "name": "name", "type": "string" },
                { "name": "version", "type": "string" },
                { "name": "chainId", "type": "uint256" },
                { "name": "verifyingContract", "type": "address" },
            ]),
        );
        for (name, fields) in &self.types {
            types.insert(
                name.clone(),
                serde_json::to_value(fields).unwrap_or(Value::Null),
            );
        }

        serde_json::json!({
            "types": types,
            "primaryType": self.primary_type,
            "domain": {
                "name": self.domain.name,
                "version": self.domain.version,
                "chainId": self.domain.chain_id,
                "verifyingContract": format!("{:?}", self.domain.verifying_contract),
            },
            "message": self.message,
        })
    }

    /// Canonical EIP-712 type string, e.g. `Permit(address owner,...)`.
    pub fn encode_type(&self) -> Result<String> {
        let fields = self.primary_fields()?;
        let members: Vec<String> = fields
            .iter()
            .map(|f| format!("{} {}", f.kind, f.name))
            .collect();
        Ok(format!("{}({})", self.primary_type, members.join(",")))
    }

    /// Compute `hashStruct(message)` for the primary type.
    pub fn struct_hash(&self) -> Result<B256> {
        let fields = self.primary_fields()?;
        let type_hash = keccak256(self.encode_type()?.as_bytes());

        let mut encoded = Vec::with_capacity(32 * (fields.len() + 1));
        encoded.extend_from_slice(type_hash.as_slice());

        for field in fields {
            let value = self.message.get(&field.name).ok_or_else(|| {
                Error::signing(format!("message is missing field {}", field.name))
            })?;
            let word = encode_value(&field.kind, value).map_err(|message| {
                Error::signing(format!("field {}: {}", field.name, message))
            })?;
            encoded.extend_from_slice(word.as_slice());
        }

        Ok(keccak256(&encoded))
    }

    /// Compute the EIP-712 digest: keccak256("\x19\x01" ++ domainSeparator ++ structHash).
    pub fn signing_hash(&self) -> Result<B256> {
        let prefix = [0x19u8, 0x01];
        let data = (prefix, self.domain.separator(), self.struct_hash()?).abi_encode_packed();
        Ok(keccak256(&data))
    }
}

/// Encode one atomic EIP-712 value into its 32-byte word.
fn encode_value(kind: &str, value: &Value) -> std::result::Result<B256, String> {
    match kind {
        "string" => {
            let s = value.as_str().ok_or("expected a string")?;
            Ok(keccak256(s.as_bytes()))
        }
        "bytes" => {
            let s = value.as_str().ok_or("expected hex bytes")?;
            let bytes = hex::decode(s.trim_start_matches("0x")).map_err(|e| e.to_string())?;
            Ok(keccak256(&bytes))
        }
        "bytes32" => {
            let s = value.as_str().ok_or("expected a bytes32 hex string")?;
            B256::from_str(s).map_err(|e| e.to_string())
        }
        "address" => {
            let s = value.as_str().ok_or("expected an address string")?;
            let address = Address::from_str(s).map_err(|e| e.to_string())?;
            Ok(B256::left_padding_from(address.as_slice()))
        }
        "bool" => {
            let b = value.as_bool().ok_or("expected a bool")?;
            Ok(B256::from(U256::from(b as u8).to_be_bytes::<32>()))
        }
        kind if kind.starts_with("uint") => {
            let n = match value {
                Value::String(s) => U256::from_str(s).map_err(|e| e.to_string())?,
                Value::Number(n) => n
                    .as_u64()
                    .map(U256::from)
                    .ok_or("expected an unsigned integer")?,
                _ => return Err("expected an integer".to_string()),
            };
            Ok(B256::from(n.to_be_bytes::<32>()))
        }
        other => Err(format!("unsupported type {}", other)),
    }
}
