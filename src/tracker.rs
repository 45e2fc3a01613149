//! Transaction lifecycle tracking
//!
//! Each submitted write gets a [`TransactionHandle`]. A background task
//! drains the chain client's events for it and forwards state changes to a
//! caller-supplied [`TxObserver`]:
//!
//! - `submitted` at most once, always before the terminal notification
//! - exactly one of `confirmed` / `failed`
//! - nothing after the terminal notification
//!
//! There is no cancellation: once broadcast, only the chain decides.

use crate::chain::{ChainClient, ContractCall, SendOptions, TxEvent, TxEventStream, TxReceipt};
use crate::wallet::WalletSessionManager;
use crate::{Error, Result};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

/// Failure recorded when the chain client stops reporting before a terminal event
pub const STREAM_CLOSED: &str = "transaction event stream closed";

/// Lifecycle state of one write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxState {
    Pending { tx_hash: Option<String> },
    Confirmed(TxReceipt),
    Failed { error: String },
}

impl TxState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TxState::Pending { .. })
    }

    /// Latest known transaction hash
    pub fn tx_hash(&self) -> Option<&str> {
        match self {
            TxState::Pending { tx_hash } => tx_hash.as_deref(),
            TxState::Confirmed(receipt) => Some(&receipt.tx_hash),
            TxState::Failed { .. } => None,
        }
    }

    /// State after `event`, or `None` when the event must be ignored
    fn apply(&self, event: &TxEvent) -> Option<TxState> {
        match (self, event) {
            (TxState::Pending { tx_hash: None }, TxEvent::Submitted { tx_hash }) => {
                Some(TxState::Pending {
                    tx_hash: Some(tx_hash.clone()),
                })
            }
            (TxState::Pending { .. }, TxEvent::Confirmed(receipt)) => {
                Some(TxState::Confirmed(receipt.clone()))
            }
            (TxState::Pending { .. }, TxEvent::Failed { error }) => Some(TxState::Failed {
                error: error.clone(),
            }),
            _ => None,
        }
    }
}

/// Immutable facts about a submitted write
#[derive(Debug, Clone)]
pub struct TxInfo {
    pub id: Uuid,
    pub method: String,
    pub from: String,
    pub gas_limit: u64,
}

/// Receives lifecycle notifications for tracked writes
pub trait TxObserver: Send + Sync {
    fn on_submitted(&self, _info: &TxInfo, _tx_hash: &str) {}
    fn on_confirmed(&self, _info: &TxInfo, _receipt: &TxReceipt) {}
    fn on_failed(&self, _info: &TxInfo, _error: &str) {}
}

/// Observer that writes the lifecycle to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl TxObserver for LoggingObserver {
    fn on_submitted(&self, info: &TxInfo, tx_hash: &str) {
        tracing::info!(method = %info.method, tx_hash = %tx_hash, "Sending a transaction");
    }

    fn on_confirmed(&self, info: &TxInfo, receipt: &TxReceipt) {
        tracing::info!(
            method = %info.method,
            tx_hash = %receipt.tx_hash,
            block_number = receipt.block_number,
            "Received receipt; transaction is in a block"
        );
    }

    fn on_failed(&self, info: &TxInfo, error: &str) {
        tracing::warn!(method = %info.method, error = %error, "Transaction failed");
    }
}

/// One in-flight (or finished) write
#[derive(Debug, Clone)]
pub struct TransactionHandle {
    info: TxInfo,
    state: watch::Receiver<TxState>,
}

impl TransactionHandle {
    pub fn info(&self) -> &TxInfo {
        &self.info
    }

    pub fn method(&self) -> &str {
        &self.info.method
    }

    pub fn from_address(&self) -> &str {
        &self.info.from
    }

    pub fn gas_limit(&self) -> u64 {
        self.info.gas_limit
    }

    /// Snapshot of the current state
    pub fn state(&self) -> TxState {
        self.state.borrow().clone()
    }

    /// Wait for the terminal state
    pub async fn wait(&self) -> Result<TxReceipt> {
        let mut state = self.state.clone();
        let terminal = state
            .wait_for(TxState::is_terminal)
            .await
            .map_err(|_| Error::ChainClient(STREAM_CLOSED.to_string()))?
            .clone();

        match terminal {
            TxState::Confirmed(receipt) => Ok(receipt),
            TxState::Failed { error } => Err(Error::TransactionFailed(error)),
            TxState::Pending { .. } => Err(Error::ChainClient(STREAM_CLOSED.to_string())),
        }
    }
}

/// Submits writes on behalf of the active session and tracks them
pub struct TransactionTracker {
    chain: Arc<dyn ChainClient>,
    sessions: Arc<WalletSessionManager>,
}

impl TransactionTracker {
    pub fn new(chain: Arc<dyn ChainClient>, sessions: Arc<WalletSessionManager>) -> Self {
        Self { chain, sessions }
    }

    /// Submit a write from `options.from`, which must be the active session's
    /// address. Rejected with [`Error::NotAuthenticated`] before any chain
    /// client call otherwise.
    pub async fn submit(
        &self,
        call: ContractCall,
        options: SendOptions,
        observer: Arc<dyn TxObserver>,
    ) -> Result<TransactionHandle> {
        let session = self
            .sessions
            .current_session()
            .await
            .ok_or(Error::NotAuthenticated)?;

        if !session.address().eq_ignore_ascii_case(&options.from) {
            tracing::warn!(
                from = %options.from,
                session = %session.address(),
                "Write requested from an account other than the active session"
            );
            return Err(Error::NotAuthenticated);
        }

        let events = self.chain.invoke_write(&call, &options).await?;

        let info = TxInfo {
            id: Uuid::new_v4(),
            method: call.method,
            from: options.from,
            gas_limit: options.gas_limit,
        };
        tracing::debug!(id = %info.id, method = %info.method, "Tracking transaction");

        let (sender, receiver) = watch::channel(TxState::Pending { tx_hash: None });
        tokio::spawn(drive(info.clone(), events, sender, observer));

        Ok(TransactionHandle {
            info,
            state: receiver,
        })
    }

    /// Address of the active session, or [`Error::NotAuthenticated`]
    pub async fn active_address(&self) -> Result<String> {
        self.sessions
            .current_session()
            .await
            .map(|session| session.address().to_string())
            .ok_or(Error::NotAuthenticated)
    }

    /// Submit a write from the active session's address
    pub async fn send(
        &self,
        call: ContractCall,
        gas_limit: u64,
        observer: Arc<dyn TxObserver>,
    ) -> Result<TransactionHandle> {
        let from = self.active_address().await?;
        self.submit(call, SendOptions { from, gas_limit }, observer)
            .await
    }
}

async fn drive(
    info: TxInfo,
    mut events: TxEventStream,
    state: watch::Sender<TxState>,
    observer: Arc<dyn TxObserver>,
) {
    while let Some(event) = events.next().await {
        if advance(&info, &state, observer.as_ref(), &event) {
            return;
        }
    }

    let closed = TxEvent::Failed {
        error: STREAM_CLOSED.to_string(),
    };
    advance(&info, &state, observer.as_ref(), &closed);
}

/// Apply one event and notify. Returns true once the state is terminal.
fn advance(
    info: &TxInfo,
    state: &watch::Sender<TxState>,
    observer: &dyn TxObserver,
    event: &TxEvent,
) -> bool {
    let current = state.borrow().clone();
    let Some(next) = current.apply(event) else {
        tracing::debug!(id = %info.id, ?event, "Ignoring out-of-order transaction event");
        return current.is_terminal();
    };

    let terminal = next.is_terminal();
    state.send_replace(next);

    match event {
        TxEvent::Submitted { tx_hash } => observer.on_submitted(info, tx_hash),
        TxEvent::Confirmed(receipt) => observer.on_confirmed(info, receipt),
        TxEvent::Failed { error } => observer.on_failed(info, error),
    }
    terminal
}
