//! Pending credential input
//!
//! Exactly one access mode is active at a time. Switching modes wipes every
//! pending field so a typed password or key never carries over.

use crate::keystore::{self, VALID_KEYSTORE_MSG};
use crate::wallet::account::copy_secret;
use crate::{Error, Result};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// How the user authenticates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AccessMode {
    /// Keystore file plus password
    #[default]
    Keystore,
    /// Raw private key
    PrivateKey,
}

impl AccessMode {
    pub fn toggled(self) -> Self {
        match self {
            AccessMode::Keystore => AccessMode::PrivateKey,
            AccessMode::PrivateKey => AccessMode::Keystore,
        }
    }
}

/// A submitted credential; never carries both a key and a keystore
pub enum Credential {
    PrivateKey(SecretString),
    Keystore {
        keystore: String,
        password: SecretString,
    },
}

/// Unsubmitted login input
#[derive(Default)]
pub struct CredentialForm {
    mode: AccessMode,
    keystore: Option<String>,
    keystore_name: Option<String>,
    password: Option<SecretString>,
    private_key: Option<SecretString>,
    message: Option<String>,
}

impl CredentialForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Last user-facing message
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn keystore_name(&self) -> Option<&str> {
        self.keystore_name.as_deref()
    }

    pub fn has_keystore(&self) -> bool {
        self.keystore.is_some()
    }

    /// Whether anything is typed or selected
    pub fn has_pending_input(&self) -> bool {
        self.keystore.is_some() || self.password.is_some() || self.private_key.is_some()
    }

    /// Select a keystore file. An invalid file leaves the previous selection
    /// in place and only updates the message.
    pub fn select_keystore(&mut self, name: Option<String>, text: String) -> bool {
        if !keystore::validate(&text) {
            self.message = Some(Error::InvalidKeystoreFormat.to_string());
            return false;
        }

        self.keystore = Some(text);
        self.keystore_name = name;
        self.message = Some(VALID_KEYSTORE_MSG.to_string());
        true
    }

    pub fn set_password(&mut self, password: SecretString) {
        self.password = Some(password);
    }

    pub fn set_private_key(&mut self, private_key: SecretString) {
        self.private_key = Some(private_key);
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    /// Clear every pending field and the message
    pub fn reset(&mut self) {
        self.keystore = None;
        self.keystore_name = None;
        self.password = None;
        self.private_key = None;
        self.message = None;
    }

    /// Flip the access mode and reset
    pub fn toggle(&mut self) -> AccessMode {
        self.mode = self.mode.toggled();
        self.reset();
        self.mode
    }

    /// Build the credential for the current mode from pending input
    pub fn credential(&self) -> Result<Credential> {
        match self.mode {
            AccessMode::PrivateKey => self
                .private_key
                .as_ref()
                .map(|key| Credential::PrivateKey(copy_secret(key)))
                .ok_or_else(|| Error::InvalidArgument("No private key entered".to_string())),
            AccessMode::Keystore => {
                let keystore = self.keystore.clone().ok_or(Error::InvalidKeystoreFormat)?;
                let password = self
                    .password
                    .as_ref()
                    .map(copy_secret)
                    .unwrap_or_else(|| SecretString::from(String::new()));
                Ok(Credential::Keystore { keystore, password })
            }
        }
    }
}
