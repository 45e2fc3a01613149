//! Scripted in-memory chain client for unit tests

use super::{ChainClient, ContractCall, SendOptions, TxEvent, TxEventStream};
use crate::wallet::Account;
use crate::{Error, Result};
use alloy::primitives::Bytes;
use async_trait::async_trait;
use futures::channel::mpsc::{self, UnboundedSender};
use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub(crate) struct MockChainClient {
    /// private key -> address
    keys: Mutex<HashMap<String, String>>,
    /// (keystore text, password) -> private key
    keystores: Mutex<HashMap<(String, String), String>>,
    registered: Mutex<Vec<String>>,
    /// Event scripts replayed by successive writes; the stream closes after
    scripts: Mutex<VecDeque<Vec<TxEvent>>>,
    /// Senders of writes with no script, for tests that emit by hand
    open_writes: Mutex<Vec<UnboundedSender<TxEvent>>>,
    reads: Mutex<HashMap<String, Bytes>>,
    block: AtomicU64,
    fail_reads: AtomicBool,
    fail_register: AtomicBool,
    pub write_calls: AtomicUsize,
    pub read_calls: AtomicUsize,
}

impl MockChainClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(self, key: &str, address: &str) -> Self {
        self.keys
            .lock()
            .unwrap()
            .insert(key.to_string(), address.to_string());
        self
    }

    pub fn with_keystore(self, keystore: &str, password: &str, key: &str) -> Self {
        self.keystores
            .lock()
            .unwrap()
            .insert((keystore.to_string(), password.to_string()), key.to_string());
        self
    }

    pub fn script(&self, events: Vec<TxEvent>) {
        self.scripts.lock().unwrap().push_back(events);
    }

    pub fn set_read(&self, method: &str, data: Bytes) {
        self.reads.lock().unwrap().insert(method.to_string(), data);
    }

    pub fn set_block(&self, block: u64) {
        self.block.store(block, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_register(&self, fail: bool) {
        self.fail_register.store(fail, Ordering::SeqCst);
    }

    pub fn registered(&self) -> Vec<String> {
        self.registered.lock().unwrap().clone()
    }

    /// Emit an event on the `index`th unscripted write
    pub fn emit(&self, index: usize, event: TxEvent) {
        let writes = self.open_writes.lock().unwrap();
        let _ = writes[index].unbounded_send(event);
    }

    /// Close the `index`th unscripted write's stream
    pub fn close(&self, index: usize) {
        self.open_writes.lock().unwrap()[index].close_channel();
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn decrypt_keystore(
        &self,
        keystore: &str,
        password: &SecretString,
    ) -> Result<SecretString> {
        self.keystores
            .lock()
            .unwrap()
            .get(&(keystore.to_string(), password.expose_secret().to_string()))
            .map(|key| SecretString::from(key.clone()))
            .ok_or_else(|| Error::ChainClient("Key derivation failed - possibly wrong password".into()))
    }

    async fn derive_account(&self, private_key: &SecretString) -> Result<Account> {
        let key = private_key.expose_secret();
        let address = self
            .keys
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::ChainClient("Invalid private key".into()))?;
        Ok(Account::new(address, SecretString::from(key.to_string())))
    }

    async fn register_account(&self, account: &Account) -> Result<()> {
        if self.fail_register.load(Ordering::SeqCst) {
            return Err(Error::ChainClient("wallet registry unavailable".into()));
        }
        self.registered
            .lock()
            .unwrap()
            .push(account.address().to_string());
        Ok(())
    }

    async fn clear_accounts(&self) -> Result<()> {
        self.registered.lock().unwrap().clear();
        Ok(())
    }

    async fn invoke_write(
        &self,
        _call: &ContractCall,
        _options: &SendOptions,
    ) -> Result<TxEventStream> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = mpsc::unbounded();
        match self.scripts.lock().unwrap().pop_front() {
            Some(events) => {
                for event in events {
                    let _ = sender.unbounded_send(event);
                }
            }
            None => self.open_writes.lock().unwrap().push(sender),
        }
        Ok(receiver.boxed())
    }

    async fn invoke_read(&self, call: &ContractCall) -> Result<Bytes> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::ChainClient("node unreachable".into()));
        }
        self.reads
            .lock()
            .unwrap()
            .get(&call.method)
            .cloned()
            .ok_or_else(|| Error::ChainClient(format!("no response for {}", call.method)))
    }

    async fn block_number(&self) -> Result<u64> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::ChainClient("node unreachable".into()));
        }
        Ok(self.block.fetch_add(1, Ordering::SeqCst))
    }
}
