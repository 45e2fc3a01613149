//! Account and session types
//!
//! SECURITY: signing keys live inside `SecretString` and are only exposed to
//! the chain client when it builds a signer, or to the session store when the
//! active session is persisted.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;

/// An account derived by the chain client: public address plus the key
/// material needed to sign future transactions
pub struct Account {
    address: String,
    signing_key: SecretString,
}

impl Account {
    pub fn new(address: impl Into<String>, signing_key: SecretString) -> Self {
        Self {
            address: address.into(),
            signing_key,
        }
    }

    /// Public address (safe to share)
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Key material for building a signer
    pub fn signing_key(&self) -> &SecretString {
        &self.signing_key
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address)
            .field("signing_key", &"[REDACTED]")
            .finish()
    }
}

/// The single active, decrypted credential
///
/// Cheap to clone; UI code holds clones as read references while the session
/// manager owns the slot.
#[derive(Clone)]
pub struct WalletSession {
    account: Arc<Account>,
    created_at: DateTime<Utc>,
}

impl WalletSession {
    pub(crate) fn new(account: Account) -> Self {
        Self {
            account: Arc::new(account),
            created_at: Utc::now(),
        }
    }

    pub fn address(&self) -> &str {
        self.account.address()
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub(crate) fn to_stored(&self) -> StoredSession {
        StoredSession {
            address: self.account.address.clone(),
            private_key: copy_secret(&self.account.signing_key),
            created_at: self.created_at,
        }
    }

    pub(crate) fn from_stored(stored: StoredSession) -> Self {
        Self {
            account: Arc::new(Account::new(stored.address, stored.private_key)),
            created_at: stored.created_at,
        }
    }
}

impl std::fmt::Debug for WalletSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletSession")
            .field("address", &self.address())
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Serialized form of a session in the session store
#[derive(Serialize, Deserialize)]
pub(crate) struct StoredSession {
    pub address: String,
    #[serde(serialize_with = "expose", deserialize_with = "conceal")]
    pub private_key: SecretString,
    pub created_at: DateTime<Utc>,
}

fn expose<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

fn conceal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

pub(crate) fn copy_secret(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn debug_redacts_key() {
        let session = WalletSession::new(Account::new(
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
            SecretString::from(TEST_KEY.to_string()),
        ));

        let debug_str = format!("{:?} {:?}", session, session.account());

        assert!(!debug_str.contains("ac0974bec"));
        assert!(debug_str.contains("[REDACTED]"));
        assert!(debug_str.contains("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"));
    }

    #[test]
    fn stored_session_keeps_address_and_key() {
        let session = WalletSession::new(Account::new(
            "0x1",
            SecretString::from(TEST_KEY.to_string()),
        ));

        let json = serde_json::to_string(&session.to_stored()).unwrap();
        let stored: StoredSession = serde_json::from_str(&json).unwrap();
        let restored = WalletSession::from_stored(stored);

        assert_eq!(restored.address(), "0x1");
        assert_eq!(restored.account().signing_key().expose_secret(), TEST_KEY);
        assert_eq!(restored.created_at(), session.created_at());
    }
}
