//! Chain client over a Klaytn endpoint node
//!
//! Klaytn speaks the Ethereum JSON-RPC dialect and uses Ethereum V3
//! keystores, so signing, keystore decryption and transport go through
//! alloy.
//!
//! SECURITY: registered signers live only in this client; the registry is
//! wiped by [`ChainClient::clear_accounts`] on logout.

use super::{ChainClient, ContractCall, SendOptions, TxEvent, TxEventStream, TxReceipt};
use crate::config::{Config, Network};
use crate::wallet::Account;
use crate::{Error, Result};
use alloy::hex;
use alloy::network::{EthereumWallet, ReceiptResponse};
use alloy::primitives::{Address, Bytes};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use futures::channel::mpsc;
use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use std::io::Write;
use std::str::FromStr;
use tokio::sync::RwLock;

/// Chain client backed by alloy's HTTP provider and local signers
pub struct CaverClient {
    rpc_url: url::Url,
    network: Network,
    /// Registered accounts: session address and its signer
    signers: RwLock<Vec<(String, PrivateKeySigner)>>,
}

impl CaverClient {
    pub fn new(rpc_url: &str, network: Network) -> Result<Self> {
        let rpc_url = rpc_url
            .parse()
            .map_err(|e| Error::Config(format!("Invalid RPC URL: {}", e)))?;
        Ok(Self {
            rpc_url,
            network,
            signers: RwLock::new(Vec::new()),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.resolve_rpc_url()?, config.network)
    }

    pub fn network(&self) -> Network {
        self.network
    }

    async fn signer_for(&self, address: &str) -> Result<PrivateKeySigner> {
        self.signers
            .read()
            .await
            .iter()
            .find(|(registered, _)| registered.eq_ignore_ascii_case(address))
            .map(|(_, signer)| signer.clone())
            .ok_or(Error::NotAuthenticated)
    }
}

/// Split a key into its hex private key and, for the Klaytn wallet key form
/// `0x{key}0x00{address}`, the declared address
fn split_wallet_key(raw: &str) -> (&str, Option<&str>) {
    let raw = raw.trim();
    let parts: Vec<&str> = raw.split("0x").collect();
    match parts.as_slice() {
        ["", key, "00", address] if key.len() == 64 && address.len() == 40 => (key, Some(address)),
        _ => (raw.strip_prefix("0x").unwrap_or(raw), None),
    }
}

fn parse_signer(raw: &str) -> Result<(PrivateKeySigner, Option<Address>)> {
    let (key_hex, declared) = split_wallet_key(raw);

    let signer = PrivateKeySigner::from_str(key_hex)
        .map_err(|e| Error::ChainClient(format!("Invalid private key: {}", e)))?;

    let declared = declared
        .map(|address| Address::from_str(&format!("0x{}", address)))
        .transpose()
        .map_err(|e| Error::ChainClient(format!("Invalid wallet key address: {}", e)))?;

    Ok((signer, declared))
}

fn parse_address(address: &str) -> Result<Address> {
    Address::from_str(address)
        .map_err(|e| Error::InvalidArgument(format!("Invalid address {}: {}", address, e)))
}

#[async_trait]
impl ChainClient for CaverClient {
    async fn decrypt_keystore(
        &self,
        keystore: &str,
        password: &SecretString,
    ) -> Result<SecretString> {
        // alloy decrypts from a path; the temp file is removed on drop
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(keystore.as_bytes())?;
        file.flush()?;

        let password = password.expose_secret().as_bytes().to_vec();
        let signer = tokio::task::spawn_blocking(move || {
            PrivateKeySigner::decrypt_keystore(file.path(), password)
        })
        .await
        .map_err(|e| Error::ChainClient(format!("Keystore decryption task failed: {}", e)))?
        .map_err(|e| Error::ChainClient(format!("Keystore decryption failed: {}", e)))?;

        Ok(SecretString::from(hex::encode_prefixed(signer.to_bytes())))
    }

    async fn derive_account(&self, private_key: &SecretString) -> Result<Account> {
        let (signer, declared) = parse_signer(private_key.expose_secret())?;

        // Ethereum-style transactions are signed and sent from the key's own
        // address, so a decoupled Klaytn account cannot be used here.
        if let Some(declared) = declared.filter(|declared| *declared != signer.address()) {
            return Err(Error::ChainClient(format!(
                "Wallet key address {} does not match its key; decoupled accounts are not supported",
                declared.to_checksum(None)
            )));
        }

        Ok(Account::new(
            signer.address().to_checksum(None),
            SecretString::from(private_key.expose_secret().trim().to_string()),
        ))
    }

    async fn register_account(&self, account: &Account) -> Result<()> {
        let (signer, _) = parse_signer(account.signing_key().expose_secret())?;
        if !signer.address().to_string().eq_ignore_ascii_case(account.address()) {
            return Err(Error::ChainClient(format!(
                "Account {} is not controlled by its signing key",
                account.address()
            )));
        }
        let mut signers = self.signers.write().await;
        signers.retain(|(address, _)| !address.eq_ignore_ascii_case(account.address()));
        signers.push((account.address().to_string(), signer));
        tracing::debug!(address = %account.address(), "Registered signing account");
        Ok(())
    }

    async fn clear_accounts(&self) -> Result<()> {
        let mut signers = self.signers.write().await;
        signers.clear();
        Ok(())
    }

    async fn invoke_write(
        &self,
        call: &ContractCall,
        options: &SendOptions,
    ) -> Result<TxEventStream> {
        let signer = self.signer_for(&options.from).await?;
        let to = parse_address(&call.to)?;
        let from = signer.address();

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(self.rpc_url.clone());

        let tx = TransactionRequest::default()
            .from(from)
            .to(to)
            .input(call.data.clone().into())
            .gas_limit(options.gas_limit);

        let (sender, receiver) = mpsc::unbounded();
        let method = call.method.clone();

        tokio::spawn(async move {
            let pending = match provider.send_transaction(tx).await {
                Ok(pending) => pending,
                Err(e) => {
                    let _ = sender.unbounded_send(TxEvent::Failed {
                        error: e.to_string(),
                    });
                    return;
                }
            };

            let tx_hash = pending.tx_hash().to_string();
            tracing::debug!(method = %method, tx_hash = %tx_hash, "Transaction broadcast");
            let _ = sender.unbounded_send(TxEvent::Submitted { tx_hash });

            let event = match pending.get_receipt().await {
                Ok(receipt) if receipt.status() => TxEvent::Confirmed(TxReceipt {
                    tx_hash: receipt.transaction_hash().to_string(),
                    block_number: receipt.block_number().unwrap_or_default(),
                    gas_used: Some(receipt.gas_used()),
                }),
                Ok(receipt) => TxEvent::Failed {
                    error: format!("Transaction {} reverted", receipt.transaction_hash()),
                },
                Err(e) => TxEvent::Failed {
                    error: e.to_string(),
                },
            };
            let _ = sender.unbounded_send(event);
        });

        Ok(receiver.boxed())
    }

    async fn invoke_read(&self, call: &ContractCall) -> Result<Bytes> {
        let to = parse_address(&call.to)?;
        let provider = ProviderBuilder::new().connect_http(self.rpc_url.clone());

        let tx = TransactionRequest::default()
            .to(to)
            .input(call.data.clone().into());

        provider
            .call(tx)
            .await
            .map_err(|e| Error::ChainClient(format!("Call to {} failed: {}", call.method, e)))
    }

    async fn block_number(&self) -> Result<u64> {
        let provider = ProviderBuilder::new().connect_http(self.rpc_url.clone());
        provider
            .get_block_number()
            .await
            .map_err(|e| Error::ChainClient(format!("Failed to get block number: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test private key (DO NOT use in production!)
    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TEST_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    fn client() -> CaverClient {
        CaverClient::new("http://localhost:8551", Network::Baobab).unwrap()
    }

    #[test]
    fn split_plain_and_wallet_keys() {
        let (key, declared) = split_wallet_key(TEST_KEY);
        assert_eq!(key.len(), 64);
        assert!(declared.is_none());

        let wallet_key = format!(
            "{}0x000x{}",
            TEST_KEY,
            "1111111111111111111111111111111111111111"
        );
        let (key, declared) = split_wallet_key(&wallet_key);
        assert_eq!(key, &TEST_KEY[2..]);
        assert_eq!(declared, Some("1111111111111111111111111111111111111111"));
    }

    #[tokio::test]
    async fn derive_account_from_hex_key() {
        let account = client()
            .derive_account(&SecretString::from(TEST_KEY.to_string()))
            .await
            .unwrap();
        assert_eq!(account.address(), TEST_ADDRESS);
    }

    #[tokio::test]
    async fn derive_account_accepts_matching_wallet_key() {
        let wallet_key = format!("{}0x000x{}", TEST_KEY, &TEST_ADDRESS[2..]);
        let account = client()
            .derive_account(&SecretString::from(wallet_key))
            .await
            .unwrap();
        assert_eq!(account.address(), TEST_ADDRESS);
    }

    #[tokio::test]
    async fn derive_account_rejects_decoupled_wallet_key() {
        let wallet_key = format!("{}0x000x{}", TEST_KEY, "1111111111111111111111111111111111111111");
        let err = client()
            .derive_account(&SecretString::from(wallet_key))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ChainClient(_)));
    }

    #[tokio::test]
    async fn register_rejects_account_not_controlled_by_key() {
        let client = client();
        let account = Account::new(
            "0x1111111111111111111111111111111111111111",
            SecretString::from(TEST_KEY.to_string()),
        );

        let err = client.register_account(&account).await.unwrap_err();
        assert!(matches!(err, Error::ChainClient(_)));
        tokio_test::assert_err!(client.signer_for(account.address()).await);
    }

    #[tokio::test]
    async fn derive_account_rejects_garbage() {
        let err = client()
            .derive_account(&SecretString::from("not a key".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ChainClient(_)));
    }

    #[tokio::test]
    async fn write_without_registered_account_is_not_authenticated() {
        let client = client();
        let call = ContractCall::new("plus", TEST_ADDRESS, Bytes::new());
        let options = SendOptions {
            from: TEST_ADDRESS.to_string(),
            gas_limit: 200_000,
        };

        let err = client.invoke_write(&call, &options).await.err().unwrap();
        assert!(matches!(err, Error::NotAuthenticated));
    }

    #[tokio::test]
    async fn register_then_clear() {
        let client = client();
        let account = client
            .derive_account(&SecretString::from(TEST_KEY.to_string()))
            .await
            .unwrap();

        client.register_account(&account).await.unwrap();
        tokio_test::assert_ok!(client.signer_for(&TEST_ADDRESS.to_lowercase()).await);

        client.clear_accounts().await.unwrap();
        tokio_test::assert_err!(client.signer_for(TEST_ADDRESS).await);
    }

    #[tokio::test]
    async fn decrypt_rejects_shape_only_keystore() {
        let keystore = r#"{"version":3,"id":"abc","address":"0x1","crypto":{}}"#;
        let err = client()
            .decrypt_keystore(keystore, &SecretString::from("password".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ChainClient(_)));
    }
}
