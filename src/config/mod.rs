//! Configuration for the wallet session client

pub mod rpc;

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use rpc::RpcConfig;

/// Deployed contract address environment variable name
pub const DEPLOYED_ADDRESS_ENV: &str = "DEPLOYED_ADDRESS";

/// Klaytn networks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Testnet
    #[default]
    Baobab,
    /// Mainnet
    Cypress,
}

impl Network {
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Baobab => 1001,
            Network::Cypress => 8217,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Network::Baobab => "baobab",
            Network::Cypress => "cypress",
        }
    }

    /// Block explorer base URL for transactions
    pub fn explorer_tx_base(&self) -> &'static str {
        match self {
            Network::Baobab => "https://baobab.scope.klaytn.com/transaction/",
            Network::Cypress => "https://scope.klaytn.com/transaction/",
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Network to connect to
    #[serde(default)]
    pub network: Network,
    /// Explicit RPC endpoint; overrides environment resolution
    #[serde(default)]
    pub rpc_url: Option<String>,
    /// Gas ceiling for contract writes
    pub gas_limit: u64,
    /// Refresh period for block number and count polling (milliseconds)
    pub poll_interval_ms: u64,
    /// File holding the persisted wallet session
    pub session_file: PathBuf,
    /// Deployed Count contract address
    #[serde(default)]
    pub contract_address: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: Network::Baobab,
            rpc_url: None,
            gas_limit: 200_000,
            poll_interval_ms: 1_000,
            session_file: PathBuf::from(".klay-session/session.json"),
            contract_address: None,
        }
    }
}

impl Config {
    /// Load a JSON config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Resolve the RPC endpoint for the configured network
    pub fn resolve_rpc_url(&self) -> Result<String> {
        if let Some(url) = &self.rpc_url {
            return Ok(url.clone());
        }
        RpcConfig::from_env()
            .for_network(self.network)
            .map(str::to_string)
            .ok_or_else(|| Error::Config(format!("No RPC URL for {}", self.network.name())))
    }

    /// Contract address from config, falling back to `DEPLOYED_ADDRESS`
    pub fn resolve_contract_address(&self) -> Result<String> {
        self.contract_address
            .clone()
            .or_else(|| std::env::var(DEPLOYED_ADDRESS_ENV).ok())
            .ok_or_else(|| {
                Error::Config(format!(
                    "No contract address configured. Set contract_address or {}",
                    DEPLOYED_ADDRESS_ENV
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = Config::default();
        assert_eq!(config.network, Network::Baobab);
        assert_eq!(config.gas_limit, 200_000);
        assert_eq!(config.poll_interval_ms, 1_000);
    }

    #[test]
    fn deserialize_with_optional_fields_missing() {
        let value = serde_json::json!({
            "gas_limit": 300000,
            "poll_interval_ms": 500,
            "session_file": "/tmp/session.json"
        });
        let parsed: Config = serde_json::from_value(value).expect("parse config");
        assert_eq!(parsed.network, Network::Baobab);
        assert!(parsed.rpc_url.is_none());
        assert!(parsed.contract_address.is_none());
        assert_eq!(parsed.gas_limit, 300_000);
    }

    #[test]
    fn explicit_rpc_url_wins() {
        let config = Config {
            network: Network::Cypress,
            rpc_url: Some("http://localhost:8551".to_string()),
            ..Config::default()
        };
        assert_eq!(config.resolve_rpc_url().unwrap(), "http://localhost:8551");
    }

    #[test]
    fn network_chain_ids() {
        assert_eq!(Network::Baobab.chain_id(), 1001);
        assert_eq!(Network::Cypress.chain_id(), 8217);
        let parsed: Network = serde_json::from_str("\"cypress\"").unwrap();
        assert_eq!(parsed, Network::Cypress);
    }
}
