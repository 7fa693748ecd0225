//! EIP-712 domains and network profiles.
//!
//! Every signature produced by this crate is scoped by an EIP-712 domain.
//! The permit domain is fixed per network profile; the exchange domains are
//! fixed per action family.

use alloy_primitives::{address, keccak256, Address, B256, U256};
use alloy_sol_types::SolValue;
use serde::{Deserialize, Serialize};

/// Chain ID for Arbitrum One.
pub const ARBITRUM_CHAIN_ID: u64 = 42161;

/// Chain ID for Arbitrum Sepolia.
pub const ARBITRUM_SEPOLIA_CHAIN_ID: u64 = 421614;

/// Chain ID the exchange expects in the L1 agent domain.
pub const L1_AGENT_CHAIN_ID: u64 = 1337;

/// Native USDC on Arbitrum One.
pub const USDC_ADDRESS: Address = address!("af88d065e77c8cC2239327C5EDb3A432268e5831");

/// Test USDC on Arbitrum Sepolia.
pub const TESTNET_USDC_ADDRESS: Address = address!("1baAbB04529D43a73232B713C0FE471f7c7334d5");

/// Hyperliquid bridge contract on Arbitrum One.
pub const BRIDGE_ADDRESS: Address = address!("2df1c51e09aecf9cacb7bc98cb1742757f163df7");

/// USDC decimal count on both networks.
pub const USDC_DECIMALS: u32 = 6;

/// EIP-712 domain separator fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedDataDomain {
    /// Domain name.
    pub name: String,
    /// Domain version.
    pub version: String,
    /// Chain ID.
    pub chain_id: u64,
    /// Verifying contract address.
    pub verifying_contract: Address,
}

impl TypedDataDomain {
    /// Create domain with custom parameters.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        chain_id: u64,
        verifying_contract: Address,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            chain_id,
            verifying_contract,
        }
    }

    /// Domain used by the exchange for user-signed actions (usdSend, withdraw3).
    pub fn exchange_user_action(signature_chain_id: u64) -> Self {
        Self::new(
            "HyperliquidSignTransaction",
            "1",
            signature_chain_id,
            Address::ZERO,
        )
    }

    /// Domain used by the exchange for L1 actions signed by an agent.
    pub fn exchange_l1_agent() -> Self {
        Self::new("Exchange", "1", L1_AGENT_CHAIN_ID, Address::ZERO)
    }

    /// Return a copy with the chain id replaced.
    pub fn with_chain_id(&self, chain_id: u64) -> Self {
        Self {
            chain_id,
            ..self.clone()
        }
    }

    /// Compute the EIP-712 domain separator hash.
    pub fn separator(&self) -> B256 {
        let domain_type_hash = keccak256(
            b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)",
        );

        let name_hash = keccak256(self.name.as_bytes());
        let version_hash = keccak256(self.version.as_bytes());
        let contract_padded = B256::left_padding_from(self.verifying_contract.as_slice());

        let encoded = (
            domain_type_hash,
            name_hash,
            version_hash,
            U256::from(self.chain_id),
            contract_padded,
        )
            .abi_encode_packed();

        keccak256(&encoded)
    }
}

/// ERC-20 token parameters needed for permit signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenProfile {
    /// Permit domain name.
    pub name: &'static str,
    /// Permit domain version.
    pub version: &'static str,
    pub address: Address,
    pub decimals: u32,
}

/// A fixed bundle of chain, contract and endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkProfile {
    pub is_mainnet: bool,
    pub chain_id: u64,
    pub token: TokenProfile,
    /// Bridge contract, when confirmed for this network.
    pub bridge: Option<Address>,
    pub rpc_url: &'static str,
    pub exchange_url: &'static str,
    /// Chain label the exchange expects inside user-signed actions.
    pub exchange_chain: &'static str,
}

impl NetworkProfile {
    /// Arbitrum One with the production exchange.
    pub fn mainnet() -> Self {
        Self {
            is_mainnet: true,
            chain_id: ARBITRUM_CHAIN_ID,
            token: TokenProfile {
                name: "USD Coin",
                version: "2",
                address: USDC_ADDRESS,
                decimals: USDC_DECIMALS,
            },
            bridge: Some(BRIDGE_ADDRESS),
            rpc_url: "https://1rpc.io/arb",
            exchange_url: "https://api.hyperliquid.xyz",
            exchange_chain: "Mainnet",
        }
    }

    /// Arbitrum Sepolia with the test exchange.
    ///
    /// The testnet bridge address is not pinned here and must come from
    /// configuration.
    pub fn testnet() -> Self {
        Self {
            is_mainnet: false,
            chain_id: ARBITRUM_SEPOLIA_CHAIN_ID,
            token: TokenProfile {
                name: "USDC2",
                version: "1",
                address: TESTNET_USDC_ADDRESS,
                decimals: USDC_DECIMALS,
            },
            bridge: None,
            rpc_url: "https://sepolia-rollup.arbitrum.io/rpc",
            exchange_url: "https://api.hyperliquid-testnet.xyz",
            exchange_chain: "Testnet",
        }
    }

    /// Select the profile for the given network flag.
    pub fn for_network(is_mainnet: bool) -> Self {
        if is_mainnet {
            Self::mainnet()
        } else {
            Self::testnet()
        }
    }

    /// Permit domain of this network's token.
    pub fn permit_domain(&self) -> TypedDataDomain {
        TypedDataDomain::new(
            self.token.name,
            self.token.version,
            self.chain_id,
            self.token.address,
        )
    }
}
