//! Wallet session management
//!
//! This module holds the single active credential and the pending login input.
//! Private keys stay inside `SecretString` and are never logged.

mod access;
mod account;
mod session;
mod store;

pub use access::{AccessMode, Credential, CredentialForm};
pub use account::{Account, WalletSession};
pub use session::{WalletSessionManager, SESSION_KEY};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};
