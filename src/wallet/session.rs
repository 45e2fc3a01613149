//! Wallet session manager
//!
//! Owns the single active [`WalletSession`]. Login and logout hold the slot
//! lock for their whole duration, so concurrent requests resolve to one final
//! state (last writer wins) and a failed login never leaves a half-built
//! session behind.

use super::access::{AccessMode, Credential, CredentialForm};
use super::account::{StoredSession, WalletSession};
use super::store::SessionStore;
use crate::chain::ChainClient;
use crate::keystore;
use crate::{Error, Result};
use secrecy::SecretString;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Session store key holding the serialized active session
pub const SESSION_KEY: &str = "walletInstance";

/// Holds, persists and clears the single active credential
pub struct WalletSessionManager {
    chain: Arc<dyn ChainClient>,
    store: Arc<dyn SessionStore>,
    active: Mutex<Option<WalletSession>>,
    form: Mutex<CredentialForm>,
}

impl WalletSessionManager {
    /// Create a manager with an empty slot. Call [`restore`](Self::restore)
    /// to pick up a session persisted by an earlier run.
    pub fn new(chain: Arc<dyn ChainClient>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            chain,
            store,
            active: Mutex::new(None),
            form: Mutex::new(CredentialForm::new()),
        }
    }

    /// Currently active session, if any
    pub async fn current_session(&self) -> Option<WalletSession> {
        self.active.lock().await.clone()
    }

    /// Log in with a raw private key. Key format checks are the chain
    /// client's.
    pub async fn login_with_private_key(&self, private_key: SecretString) -> Result<WalletSession> {
        let mut active = self.active.lock().await;

        // Derivation has no side effects; a rejected key leaves any current
        // session untouched.
        let account = match self.chain.derive_account(&private_key).await {
            Ok(account) => account,
            Err(e) => {
                self.report(&e).await;
                return Err(e);
            }
        };
        let session = WalletSession::new(account);

        if let Err(e) = self.install(&session).await {
            *active = None;
            self.report(&e).await;
            return Err(e);
        }

        *active = Some(session.clone());
        self.form.lock().await.reset();
        info!(address = %session.address(), "Wallet session established");
        Ok(session)
    }

    /// Log in with a keystore and its password
    pub async fn login_with_keystore(
        &self,
        keystore_text: &str,
        password: &SecretString,
    ) -> Result<WalletSession> {
        if !keystore::validate(keystore_text) {
            let e = Error::InvalidKeystoreFormat;
            self.report(&e).await;
            return Err(e);
        }

        let private_key = match self.chain.decrypt_keystore(keystore_text, password).await {
            Ok(key) => key,
            Err(e) => {
                debug!(error = %e, "Keystore decryption failed");
                let e = Error::WrongPassword;
                self.report(&e).await;
                return Err(e);
            }
        };

        self.login_with_private_key(private_key).await
    }

    /// Log in with whatever the credential form holds for its current mode
    pub async fn login(&self) -> Result<WalletSession> {
        let credential = self.form.lock().await.credential();
        match credential {
            Ok(Credential::PrivateKey(key)) => self.login_with_private_key(key).await,
            Ok(Credential::Keystore { keystore, password }) => {
                self.login_with_keystore(&keystore, &password).await
            }
            Err(e) => {
                self.report(&e).await;
                Err(e)
            }
        }
    }

    /// Clear the active session from the chain client and the store.
    /// Calling it while logged out is a no-op.
    pub async fn logout(&self) -> Result<()> {
        let mut active = self.active.lock().await;
        let previous = active.take();

        let cleared = self.chain.clear_accounts().await;
        let removed = self.store.remove(SESSION_KEY);
        self.form.lock().await.reset();

        if let Some(session) = previous {
            info!(address = %session.address(), "Wallet session cleared");
        }

        cleared.and(removed)
    }

    /// Reinstate a session persisted by an earlier run. A slot that cannot
    /// be read or re-registered is discarded and treated as logged out.
    pub async fn restore(&self) -> Result<Option<WalletSession>> {
        let mut active = self.active.lock().await;

        let raw = match self.store.get(SESSION_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(None),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable session storage");
                self.store.remove(SESSION_KEY)?;
                return Ok(None);
            }
        };

        let stored: StoredSession = match serde_json::from_str(&raw) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "Discarding unreadable persisted session");
                self.store.remove(SESSION_KEY)?;
                return Ok(None);
            }
        };

        let session = WalletSession::from_stored(stored);
        let registered = async {
            self.chain.clear_accounts().await?;
            self.chain.register_account(session.account()).await
        }
        .await;

        if let Err(e) = registered {
            warn!(
                address = %session.address(),
                error = %e,
                "Discarding persisted session the chain client rejected"
            );
            let _ = self.chain.clear_accounts().await;
            self.store.remove(SESSION_KEY)?;
            return Ok(None);
        }

        *active = Some(session.clone());
        info!(address = %session.address(), "Wallet session restored");
        Ok(Some(session))
    }

    pub async fn access_mode(&self) -> AccessMode {
        self.form.lock().await.mode()
    }

    /// Switch access mode; always wipes pending input
    pub async fn toggle_access_mode(&self) -> AccessMode {
        self.form.lock().await.toggle()
    }

    /// Select a keystore file for keystore login
    pub async fn select_keystore(&self, name: Option<String>, text: String) -> bool {
        self.form.lock().await.select_keystore(name, text)
    }

    pub async fn set_password(&self, password: SecretString) {
        self.form.lock().await.set_password(password);
    }

    pub async fn set_private_key(&self, private_key: SecretString) {
        self.form.lock().await.set_private_key(private_key);
    }

    /// Last user-facing message from the credential form
    pub async fn message(&self) -> Option<String> {
        self.form.lock().await.message().map(str::to_string)
    }

    pub async fn has_pending_input(&self) -> bool {
        self.form.lock().await.has_pending_input()
    }

    /// Replace the chain client's registry and the persisted slot with
    /// `session`. On failure both are left empty.
    async fn install(&self, session: &WalletSession) -> Result<()> {
        let serialized = serde_json::to_string(&session.to_stored())?;

        let result = async {
            self.chain.clear_accounts().await?;
            self.chain.register_account(session.account()).await?;
            self.store.set(SESSION_KEY, &serialized)
        }
        .await;

        if result.is_err() {
            let _ = self.chain.clear_accounts().await;
            let _ = self.store.remove(SESSION_KEY);
        }
        result
    }

    async fn report(&self, e: &Error) {
        self.form.lock().await.set_message(e.to_string());
    }
}
