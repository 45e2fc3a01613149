//! Klaytn wallet session core
//!
//! Holds one blockchain credential at a time and tracks contract writes made
//! with it:
//! - Validate keystore files before asking for a password
//! - Log in by private key or keystore + password, persist the session, log out
//! - Submit contract writes and follow them from hash to receipt or error
//!
//! # Security Model
//!
//! - Cryptography, keystore decryption and RPC transport live behind the
//!   [`chain::ChainClient`] trait
//! - Private keys are held in `SecretString` and never logged
//! - At most one session exists; logout wipes it from the chain client and
//!   the session store

pub mod chain;
pub mod config;
pub mod contract;
pub mod keystore;
pub mod poller;
pub mod tracker;
pub mod wallet;

mod error;

// Re-export commonly used types
pub use chain::{CaverClient, ChainClient, ContractCall, SendOptions, TxEvent, TxReceipt};
pub use config::{Config, Network, RpcConfig};
pub use contract::CountContract;
pub use error::{Error, Result};
pub use tracker::{LoggingObserver, TransactionHandle, TransactionTracker, TxObserver, TxState};
pub use wallet::{AccessMode, FileSessionStore, WalletSession, WalletSessionManager};
