//! Configuration management for the custody operator.
//!
//! Values come from the process environment (after loading `.env`), then an
//! optional TOML action file, then explicit overrides from the command line.
//! Later sources win.

use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use alloy_primitives::Address;

use crate::signing::NetworkProfile;
use crate::types::{ActionConfig, ActionKind, AgentKey, RawCallSpec};
use crate::{Error, Result};

const DEFAULT_CUSTODY_API_URL: &str = "https://api.fordefi.com";

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub action: ActionConfig,
    pub custody: CustodyConfig,
    pub network: NetworkConfig,
}

/// Custody provider settings.
#[derive(Clone)]
pub struct CustodyConfig {
    pub api_url: String,
    pub api_token: String,
    pub vault_id: String,
    /// EVM address of the custody vault. Used as permit owner and deposit user.
    pub vault_address: Address,
    /// Override of the chain id the custody adapter pins.
    pub chain_id: Option<u64>,
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl std::fmt::Debug for CustodyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustodyConfig")
            .field("api_url", &self.api_url)
            .field("api_token", &"[REDACTED]")
            .field("vault_id", &self.vault_id)
            .field("vault_address", &self.vault_address)
            .field("chain_id", &self.chain_id)
            .field("poll_interval", &self.poll_interval)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Chain and exchange endpoints for the selected network.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub profile: NetworkProfile,
    pub rpc_url: String,
    pub exchange_url: String,
    pub bridge: Option<Address>,
    pub confirmation_timeout: Duration,
    pub receipt_poll_interval: Duration,
}

impl NetworkConfig {
    /// Bridge address, failing when the network has none configured.
    #[allow(clippy::result_large_err)]
    pub fn require_bridge(&self) -> Result<Address> {
        self.bridge.ok_or_else(|| {
            Error::config(format!(
                "No bridge contract configured for chain {}; set BRIDGE_ADDRESS",
                self.profile.chain_id
            ))
        })
    }
}

impl Config {
    /// Load configuration from the environment, an optional TOML file and
    /// command-line overrides.
    ///
    /// Keys in the file are the environment names in lowercase
    /// (`amount = "10"`, `is_testnet = true`).
    #[allow(clippy::result_large_err)]
    pub fn load(action_file: Option<&Path>, overrides: &HashMap<String, String>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let file = match action_file {
            Some(path) => Some(
                config::Config::builder()
                    .add_source(config::File::from(path))
                    .build()?,
            ),
            None => None,
        };

        Self::from_vars(|key| {
            overrides
                .get(key)
                .cloned()
                .or_else(|| {
                    file.as_ref()
                        .and_then(|f| f.get_string(&key.to_lowercase()).ok())
                })
                .or_else(|| env::var(key).ok())
        })
    }

    /// Build the configuration from a key lookup.
    #[allow(clippy::result_large_err)]
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| Error::config(format!("{} environment variable not set", key)))
        };

        let action_kind = match get("ACTION") {
            Some(raw) => raw.parse::<ActionKind>()?,
            None => ActionKind::SendUsd,
        };
        let is_testnet = match get("IS_TESTNET") {
            Some(raw) => parse_bool("IS_TESTNET", &raw)?,
            None => false,
        };

        let mut action = ActionConfig::new(action_kind, is_testnet).with_raw_call(RawCallSpec {
            contract: get("RAW_CALL_CONTRACT"),
            calldata: get("RAW_CALL_DATA"),
            gas_limit: parse_or(&get, "RAW_CALL_GAS_LIMIT", 200_000)?,
            max_fee_per_gas: parse_or(&get, "RAW_CALL_MAX_FEE_PER_GAS", 1_000_000_000)?,
            max_priority_fee_per_gas: parse_or(
                &get,
                "RAW_CALL_MAX_PRIORITY_FEE_PER_GAS",
                100_000_000,
            )?,
        });
        action.destination = get("DESTINATION");
        action.amount = get("AMOUNT");
        action.agent_key = get("HYPERCORE_API_AGENT_PK").map(AgentKey::new);

        let custody = CustodyConfig {
            api_url: match get("CUSTODY_API_URL") {
                Some(raw) => parse_url("CUSTODY_API_URL", &raw)?,
                None => DEFAULT_CUSTODY_API_URL.to_string(),
            },
            api_token: required("CUSTODY_API_TOKEN")?,
            vault_id: required("CUSTODY_VAULT_ID")?,
            vault_address: parse_address("CUSTODY_VAULT_ADDRESS", &required("CUSTODY_VAULT_ADDRESS")?)?,
            chain_id: get("CUSTODY_CHAIN_ID")
                .map(|raw| parse_value::<u64>("CUSTODY_CHAIN_ID", &raw))
                .transpose()?,
            poll_interval: Duration::from_millis(parse_or(&get, "CUSTODY_POLL_INTERVAL_MS", 2000)?),
            timeout: Duration::from_secs(parse_or(&get, "CUSTODY_TIMEOUT_SECS", 300)?),
        };

        let profile = NetworkProfile::for_network(!is_testnet);
        let bridge = match get("BRIDGE_ADDRESS") {
            Some(raw) => Some(parse_address("BRIDGE_ADDRESS", &raw)?),
            None => profile.bridge,
        };
        let network = NetworkConfig {
            rpc_url: match get("RPC_URL") {
                Some(raw) => parse_url("RPC_URL", &raw)?,
                None => profile.rpc_url.to_string(),
            },
            exchange_url: match get("EXCHANGE_URL") {
                Some(raw) => parse_url("EXCHANGE_URL", &raw)?,
                None => profile.exchange_url.to_string(),
            },
            bridge,
            confirmation_timeout: Duration::from_secs(parse_or(
                &get,
                "CONFIRMATION_TIMEOUT_SECS",
                120,
            )?),
            receipt_poll_interval: Duration::from_millis(parse_or(
                &get,
                "RECEIPT_POLL_INTERVAL_MS",
                2000,
            )?),
            profile,
        };

        Ok(Self {
            action,
            custody,
            network,
        })
    }

    /// Chain id pinned by the custody signer adapter.
    pub fn custody_chain_id(&self) -> u64 {
        self.custody
            .chain_id
            .unwrap_or(self.network.profile.chain_id)
    }

    /// Load configuration for testing (with defaults).
    #[cfg(test)]
    pub fn test_config() -> Self {
        let profile = NetworkProfile::mainnet();
        Self {
            action: ActionConfig::new(ActionKind::SendUsd, false),
            custody: CustodyConfig {
                api_url: DEFAULT_CUSTODY_API_URL.to_string(),
                api_token: "test-token".to_string(),
                vault_id: "vault-1".to_string(),
                vault_address: alloy_primitives::address!(
                    "5b7a034488f0bde8bad66f49cf9587ad40b6c757"
                ),
                chain_id: None,
                poll_interval: Duration::from_millis(10),
                timeout: Duration::from_secs(1),
            },
            network: NetworkConfig {
                rpc_url: profile.rpc_url.to_string(),
                exchange_url: profile.exchange_url.to_string(),
                bridge: profile.bridge,
                confirmation_timeout: Duration::from_secs(1),
                receipt_poll_interval: Duration::from_millis(10),
                profile,
            },
        }
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(Error::config(format!("{} must be a boolean, got {}", key, other))),
    }
}

fn parse_address(key: &str, raw: &str) -> Result<Address> {
    Address::from_str(raw.trim())
        .map_err(|e| Error::config(format!("{} is not a valid address: {}", key, e)))
}

fn parse_url(key: &str, raw: &str) -> Result<String> {
    let url = url::Url::parse(raw.trim())
        .map_err(|e| Error::config(format!("{} is not a valid URL: {}", key, e)))?;
    Ok(url.as_str().trim_end_matches('/').to_string())
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| Error::config(format!("{} is invalid: {}", key, e)))
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::{ARBITRUM_CHAIN_ID, ARBITRUM_SEPOLIA_CHAIN_ID, BRIDGE_ADDRESS};

    const VAULT: &str = "0x5b7a034488f0bde8bad66f49cf9587ad40b6c757";

    fn base_vars() -> HashMap<String, String> {
        let mut vars = HashMap::new();
        vars.insert("CUSTODY_API_TOKEN".to_string(), "secret-token".to_string());
        vars.insert("CUSTODY_VAULT_ID".to_string(), "vault-1".to_string());
        vars.insert("CUSTODY_VAULT_ADDRESS".to_string(), VAULT.to_string());
        vars
    }

    fn load(vars: &HashMap<String, String>) -> Result<Config> {
        Config::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&base_vars()).unwrap();

        assert_eq!(config.action.action, ActionKind::SendUsd);
        assert!(config.action.is_mainnet());
        assert_eq!(config.custody.api_url, "https://api.fordefi.com");
        assert_eq!(config.custody.poll_interval, Duration::from_millis(2000));
        assert_eq!(config.custody.timeout, Duration::from_secs(300));
        assert_eq!(config.network.rpc_url, "https://1rpc.io/arb");
        assert_eq!(config.network.bridge, Some(BRIDGE_ADDRESS));
        assert_eq!(config.network.confirmation_timeout, Duration::from_secs(120));
        assert_eq!(config.action.raw_call, RawCallSpec::default());
        assert_eq!(config.custody_chain_id(), ARBITRUM_CHAIN_ID);
    }

    #[test]
    fn test_testnet_selects_profile_without_bridge() {
        let mut vars = base_vars();
        vars.insert("IS_TESTNET".to_string(), "true".to_string());
        let config = load(&vars).unwrap();

        assert_eq!(config.network.profile.chain_id, ARBITRUM_SEPOLIA_CHAIN_ID);
        assert_eq!(config.custody_chain_id(), ARBITRUM_SEPOLIA_CHAIN_ID);
        assert_eq!(
            config.network.exchange_url,
            "https://api.hyperliquid-testnet.xyz"
        );
        assert!(config.network.bridge.is_none());
        assert!(matches!(
            config.network.require_bridge(),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn test_overrides_applied() {
        let mut vars = base_vars();
        vars.insert("ACTION".to_string(), "deposit".to_string());
        vars.insert("AMOUNT".to_string(), "12.5".to_string());
        vars.insert("CUSTODY_CHAIN_ID".to_string(), "1".to_string());
        vars.insert("RPC_URL".to_string(), "http://localhost:8545".to_string());
        vars.insert(
            "BRIDGE_ADDRESS".to_string(),
            "0x0000000000000000000000000000000000000b1d".to_string(),
        );
        vars.insert("HYPERCORE_API_AGENT_PK".to_string(), "0xabc".to_string());
        let config = load(&vars).unwrap();

        assert_eq!(config.action.action, ActionKind::Deposit);
        assert_eq!(config.action.amount.as_deref(), Some("12.5"));
        assert_eq!(config.custody_chain_id(), 1);
        assert_eq!(config.network.rpc_url, "http://localhost:8545");
        assert_ne!(config.network.bridge, Some(BRIDGE_ADDRESS));
        assert!(config.action.agent_key.is_some());
    }

    #[test]
    fn test_missing_required_key() {
        let mut vars = base_vars();
        vars.remove("CUSTODY_VAULT_ID");
        let err = load(&vars).unwrap_err();
        assert!(err.to_string().contains("CUSTODY_VAULT_ID"));
    }

    #[test]
    fn test_unknown_action_fails_at_load() {
        let mut vars = base_vars();
        vars.insert("ACTION".to_string(), "stake".to_string());
        assert!(matches!(load(&vars), Err(Error::UnknownAction(_))));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut vars = base_vars();
        vars.insert("IS_TESTNET".to_string(), "maybe".to_string());
        assert!(matches!(load(&vars), Err(Error::Config { .. })));

        let mut vars = base_vars();
        vars.insert("CUSTODY_VAULT_ADDRESS".to_string(), "0x123".to_string());
        assert!(matches!(load(&vars), Err(Error::Config { .. })));

        let mut vars = base_vars();
        vars.insert("RPC_URL".to_string(), "not a url".to_string());
        assert!(matches!(load(&vars), Err(Error::Config { .. })));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = load(&base_vars()).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_test_config_is_mainnet() {
        let config = Config::test_config();
        assert_eq!(config.custody_chain_id(), ARBITRUM_CHAIN_ID);
        assert!(config.network.require_bridge().is_ok());
    }
}
