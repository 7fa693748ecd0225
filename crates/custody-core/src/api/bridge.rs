//! Calldata for the deposit bridge and the token's permit nonce.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};

use crate::types::DepositStruct;
use crate::{Error, Result};

sol! {
    /// Signature tuple as the bridge contract takes it.
    struct BridgeSignature {
        uint256 r;
        uint256 s;
        uint8 v;
    }

    /// One permit-backed deposit.
    struct DepositWithPermit {
        address user;
        uint64 usd;
        uint64 deadline;
        BridgeSignature signature;
    }

    function batchedDepositWithPermit(DepositWithPermit[] deposits);

    function nonces(address owner) external view returns (uint256);
}

/// Calldata for `nonces(owner)` on the token contract.
pub fn encode_nonces(owner: Address) -> Bytes {
    noncesCall { owner }.abi_encode().into()
}

/// Read the uint256 returned by `nonces`.
pub fn decode_nonce(returned: &[u8]) -> Result<U256> {
    if returned.len() < 32 {
        return Err(Error::NonceFetchFailed {
            message: format!("expected a 32-byte word, got {} bytes", returned.len()),
        });
    }
    Ok(U256::from_be_slice(&returned[..32]))
}

/// Calldata for `batchedDepositWithPermit` carrying the given deposits.
pub fn encode_batched_deposit(deposits: &[DepositStruct]) -> Result<Bytes> {
    let deposits = deposits
        .iter()
        .map(DepositWithPermit::try_from)
        .collect::<Result<Vec<_>>>()?;

    Ok(batchedDepositWithPermitCall { deposits }.abi_encode().into())
}

impl TryFrom<&DepositStruct> for DepositWithPermit {
    type Error = Error;

    fn try_from(deposit: &DepositStruct) -> Result<Self> {
        Ok(Self {
            user: deposit.user,
            usd: parse_u64("usd", &deposit.usd)?,
            deadline: parse_u64("deadline", &deposit.deadline)?,
            signature: BridgeSignature {
                r: parse_word("r", &deposit.signature.r)?,
                s: parse_word("s", &deposit.signature.s)?,
                v: deposit.signature.v,
            },
        })
    }
}

fn parse_u64(field: &str, value: &str) -> Result<u64> {
    value
        .parse()
        .map_err(|_| Error::invalid_input(format!("deposit {} is not a uint64: {}", field, value)))
}

fn parse_word(field: &str, value: &str) -> Result<U256> {
    let bytes = hex::decode(value.trim_start_matches("0x"))
        .map_err(|e| Error::invalid_input(format!("deposit signature {}: {}", field, e)))?;
    if bytes.len() != 32 {
        return Err(Error::invalid_input(format!(
            "deposit signature {} must be 32 bytes",
            field
        )));
    }
    Ok(U256::from_be_slice(&bytes))
}
