//! Error types for the wallet session core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid keystore file.")]
    InvalidKeystoreFormat,

    #[error("Password doesn't match.")]
    WrongPassword,

    #[error("Not authenticated: log in with a private key or keystore first")]
    NotAuthenticated,

    #[error("Chain client error: {0}")]
    ChainClient(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Session storage error: {0}")]
    SessionStore(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error came from user input and a retry with corrected
    /// input can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::InvalidKeystoreFormat | Error::WrongPassword)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
