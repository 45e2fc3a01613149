//! RPC endpoint configuration
//!
//! Endpoints are resolved in this order:
//! 1. `KLAYTN_RPC_URL` - explicit override for whichever network is selected
//! 2. Per-network env vars (`BAOBAB_RPC_URL`, `CYPRESS_RPC_URL`)
//! 3. Public endpoint nodes
//!
//! # Examples
//!
//! ```bash
//! # Point every command at a private endpoint node
//! export KLAYTN_RPC_URL="http://localhost:8551"
//!
//! # Or configure networks separately
//! export BAOBAB_RPC_URL="https://baobab.example.org"
//! export CYPRESS_RPC_URL="https://cypress.example.org"
//! ```

use super::Network;
use std::collections::HashMap;

/// Environment variable names
mod env_vars {
    pub const KLAYTN_RPC_URL: &str = "KLAYTN_RPC_URL";
    pub const BAOBAB_RPC_URL: &str = "BAOBAB_RPC_URL";
    pub const CYPRESS_RPC_URL: &str = "CYPRESS_RPC_URL";
}

/// Public endpoint nodes
pub mod public_rpcs {
    pub const BAOBAB: &str = "https://api.baobab.klaytn.net:8651/";
    pub const CYPRESS: &str = "https://api.cypress.klaytn.net:8651/";
}

/// RPC configuration for both Klaytn networks
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// RPC URLs indexed by chain ID
    urls: HashMap<u64, String>,
}

impl RpcConfig {
    /// Create RPC config from environment variables
    pub fn from_env() -> Self {
        let mut urls = HashMap::new();

        if let Ok(url) = std::env::var(env_vars::BAOBAB_RPC_URL) {
            tracing::debug!("Using BAOBAB_RPC_URL for Baobab");
            urls.insert(Network::Baobab.chain_id(), url);
        }
        if let Ok(url) = std::env::var(env_vars::CYPRESS_RPC_URL) {
            tracing::debug!("Using CYPRESS_RPC_URL for Cypress");
            urls.insert(Network::Cypress.chain_id(), url);
        }

        if let Ok(url) = std::env::var(env_vars::KLAYTN_RPC_URL) {
            tracing::info!("Using KLAYTN_RPC_URL for all networks");
            urls.insert(Network::Baobab.chain_id(), url.clone());
            urls.insert(Network::Cypress.chain_id(), url);
        }

        if !urls.contains_key(&Network::Baobab.chain_id()) {
            tracing::debug!("No RPC configured for Baobab, using public endpoint node");
        }
        urls.entry(Network::Baobab.chain_id())
            .or_insert_with(|| public_rpcs::BAOBAB.to_string());
        urls.entry(Network::Cypress.chain_id())
            .or_insert_with(|| public_rpcs::CYPRESS.to_string());

        Self { urls }
    }

    /// Create with explicit RPC URLs
    pub fn with_urls(urls: HashMap<u64, String>) -> Self {
        Self { urls }
    }

    /// Get RPC URL for a chain
    pub fn get(&self, chain_id: u64) -> Option<&str> {
        self.urls.get(&chain_id).map(|s| s.as_str())
    }

    /// Get RPC URL for a network
    pub fn for_network(&self, network: Network) -> Option<&str> {
        self.get(network.chain_id())
    }

    /// Check if a chain is configured
    pub fn has_chain(&self, chain_id: u64) -> bool {
        self.urls.contains_key(&chain_id)
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
