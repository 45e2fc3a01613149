//! Bindings for the `Count` contract
//!
//! The contract keeps a counter and the address of whoever changed it last.
//! Reads are free; `plus` and `minus` are writes and go through the
//! [`TransactionTracker`].

use crate::chain::{ChainClient, ContractCall};
use crate::tracker::{TransactionHandle, TransactionTracker, TxObserver};
use crate::{Error, Result};
use alloy::primitives::{Address, U256};
use alloy::sol_types::SolCall;
use serde::Serialize;
use std::sync::Arc;

alloy::sol! {
    interface ICount {
        function count() external view returns (uint256);
        function lastParticipant() external view returns (address);
        function plus() external;
        function minus() external;
    }
}

/// Counter value and last participant at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountSnapshot {
    pub count: U256,
    /// `None` until someone has changed the counter
    pub last_participant: Option<String>,
}

/// A deployed `Count` contract
#[derive(Debug, Clone)]
pub struct CountContract {
    address: String,
}

impl CountContract {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn count_call(&self) -> ContractCall {
        ContractCall::new("count", &self.address, ICount::countCall {}.abi_encode())
    }

    pub fn last_participant_call(&self) -> ContractCall {
        ContractCall::new(
            "lastParticipant",
            &self.address,
            ICount::lastParticipantCall {}.abi_encode(),
        )
    }

    pub fn plus_call(&self) -> ContractCall {
        ContractCall::new("plus", &self.address, ICount::plusCall {}.abi_encode())
    }

    pub fn minus_call(&self) -> ContractCall {
        ContractCall::new("minus", &self.address, ICount::minusCall {}.abi_encode())
    }

    pub async fn count(&self, chain: &dyn ChainClient) -> Result<U256> {
        let raw = chain.invoke_read(&self.count_call()).await?;
        ICount::countCall::abi_decode_returns(&raw)
            .map_err(|e| Error::ChainClient(format!("Failed to decode count: {}", e)))
    }

    pub async fn last_participant(&self, chain: &dyn ChainClient) -> Result<Option<String>> {
        let raw = chain.invoke_read(&self.last_participant_call()).await?;
        let address: Address = ICount::lastParticipantCall::abi_decode_returns(&raw)
            .map_err(|e| Error::ChainClient(format!("Failed to decode lastParticipant: {}", e)))?;

        Ok((!address.is_zero()).then(|| address.to_checksum(None)))
    }

    pub async fn snapshot(&self, chain: &dyn ChainClient) -> Result<CountSnapshot> {
        Ok(CountSnapshot {
            count: self.count(chain).await?,
            last_participant: self.last_participant(chain).await?,
        })
    }

    /// Increment the counter
    pub async fn plus(
        &self,
        tracker: &TransactionTracker,
        gas_limit: u64,
        observer: Arc<dyn TxObserver>,
    ) -> Result<TransactionHandle> {
        tracker.send(self.plus_call(), gas_limit, observer).await
    }

    /// Decrement the counter; refused while it is zero
    pub async fn minus(
        &self,
        chain: &dyn ChainClient,
        tracker: &TransactionTracker,
        gas_limit: u64,
        observer: Arc<dyn TxObserver>,
    ) -> Result<TransactionHandle> {
        tracker.active_address().await?;

        if self.count(chain).await?.is_zero() {
            return Err(Error::InvalidArgument(
                "Count is already zero; minus would revert".to_string(),
            ));
        }

        tracker.send(self.minus_call(), gas_limit, observer).await
    }
}
