//! Chain client capability
//!
//! Everything cryptographic or network-bound sits behind [`ChainClient`]:
//! keystore decryption, account derivation, the signing account registry,
//! contract reads and writes, and block polling. The session manager and
//! transaction tracker only sequence calls to it.

mod caver;

#[cfg(test)]
pub(crate) mod testing;

pub use caver::CaverClient;

use crate::config::Network;
use crate::wallet::Account;
use crate::Result;
use alloy::primitives::Bytes;
use async_trait::async_trait;
use futures::stream::BoxStream;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// One contract method invocation, already ABI-encoded
#[derive(Debug, Clone)]
pub struct ContractCall {
    /// Method name, for logs and observers
    pub method: String,
    /// Contract address
    pub to: String,
    /// Calldata
    pub data: Bytes,
}

impl ContractCall {
    pub fn new(method: impl Into<String>, to: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            method: method.into(),
            to: to.into(),
            data: data.into(),
        }
    }
}

/// Sender and gas ceiling for a write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOptions {
    pub from: String,
    pub gas_limit: u64,
}

/// Receipt of a transaction included in a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: String,
    pub block_number: u64,
    pub gas_used: Option<u64>,
}

impl TxReceipt {
    /// Block explorer link for the transaction
    pub fn explorer_url(&self, network: Network) -> String {
        format!("{}{}", network.explorer_tx_base(), self.tx_hash)
    }
}

/// Lifecycle notification for a submitted write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxEvent {
    /// Hash known; not yet in a block
    Submitted { tx_hash: String },
    /// Included in a block
    Confirmed(TxReceipt),
    /// Rejected, reverted or lost
    Failed { error: String },
}

/// Events for one write, in emission order
pub type TxEventStream = BoxStream<'static, TxEvent>;

/// Cryptographic and network operations against a Klaytn node
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Decrypt a keystore, returning the private key
    async fn decrypt_keystore(&self, keystore: &str, password: &SecretString)
        -> Result<SecretString>;

    /// Derive the account a private key controls
    async fn derive_account(&self, private_key: &SecretString) -> Result<Account>;

    /// Make an account available for signing writes
    async fn register_account(&self, account: &Account) -> Result<()>;

    /// Forget every registered account
    async fn clear_accounts(&self) -> Result<()>;

    /// Send a write; the stream reports its lifecycle
    async fn invoke_write(&self, call: &ContractCall, options: &SendOptions)
        -> Result<TxEventStream>;

    /// Call a read-only method, returning the raw return data
    async fn invoke_read(&self, call: &ContractCall) -> Result<Bytes>;

    /// Latest block number
    async fn block_number(&self) -> Result<u64>;
}
