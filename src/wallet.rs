//! # Wallet Provider Trait
//!
//! This module defines the abstraction over the injected wallet (MetaMask and
//! friends) that the dependency container binds against. The `WalletProvider`
//! trait carries the small JSON-RPC surface the SDK needs plus the lifecycle
//! events a wallet fires when the user switches accounts or chains.
//!
//! ## Overview
//!
//! Hosts embedding the SDK supply whatever wallet their environment has: a
//! browser bridge, a hardware signer front-end, or the bundled [`StaticWallet`]
//! for native tools and tests. The container never talks to a concrete wallet
//! type; it resolves accounts and the chain id through this trait and follows
//! the event stream to keep its snapshot current.
//!
//! ## Implementing a Wallet
//!
//! 1. Answer `eth_requestAccounts`, `eth_accounts` and `eth_chainId` in
//!    [`WalletProvider::request`]
//! 2. Fan wallet lifecycle changes out through the broadcast channel returned
//!    by [`WalletProvider::subscribe_events`]

use async_trait::async_trait;
use ethers::types::Address;
use log::debug;
use serde_json::{json, Value};
use std::str::FromStr;
use tokio::sync::{broadcast, RwLock};

use crate::errors::Web3Error;

/// Lifecycle events an injected wallet fires.
#[derive(Debug, Clone)]
pub enum WalletEvent {
    /// The user switched accounts; the list may be empty when access was revoked.
    AccountsChanged(Vec<Address>),
    /// The wallet moved to another chain. Carries the raw (usually hex) id.
    ChainChanged(String),
    /// The wallet dropped the connection entirely.
    Disconnect,
}

/// Handle to an injected wallet provider.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// JSON-RPC style request entry point.
    ///
    /// Must answer `eth_requestAccounts`, `eth_accounts` and `eth_chainId`.
    async fn request(&self, method: &str, params: Value) -> Result<Value, Web3Error>;

    /// Subscribes to wallet lifecycle events.
    fn subscribe_events(&self) -> broadcast::Receiver<WalletEvent>;
}

/// Requests account access and returns the wallet's accounts.
pub async fn request_accounts(wallet: &dyn WalletProvider) -> Result<Vec<Address>, Web3Error> {
    let raw = wallet.request("eth_requestAccounts", json!([])).await?;
    parse_accounts(&raw)
}

/// Resolves the wallet's active chain id.
pub async fn request_chain_id(wallet: &dyn WalletProvider) -> Result<u64, Web3Error> {
    let raw = wallet.request("eth_chainId", json!([])).await?;
    let text = raw
        .as_str()
        .ok_or_else(|| Web3Error::provider("eth_chainId did not return a string"))?;
    parse_chain_id(text)
}

/// Normalizes a chain id as wallets report it.
///
/// Accepts the EIP-1193 hex form (`"0x539"`) and plain decimal (`"1337"`).
pub fn parse_chain_id(raw: &str) -> Result<u64, Web3Error> {
    let text = raw.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(digits) => u64::from_str_radix(digits, 16),
        None => text.parse::<u64>(),
    };
    parsed.map_err(|_| Web3Error::provider(format!("invalid chain id '{}'", raw)))
}

fn parse_accounts(raw: &Value) -> Result<Vec<Address>, Web3Error> {
    let entries = raw
        .as_array()
        .ok_or_else(|| Web3Error::provider("eth_accounts did not return an array"))?;

    entries
        .iter()
        .map(|entry| {
            let text = entry
                .as_str()
                .ok_or_else(|| Web3Error::provider("account entry is not a string"))?;
            Address::from_str(text)
                .map_err(|e| Web3Error::provider(format!("invalid account address: {}", e)))
        })
        .collect()
}

/// In-process wallet for native hosts and tests.
///
/// Holds a fixed account list and chain id. The `emit_*` methods mirror the
/// events an injected browser wallet would fire, so the container's event
/// handling can be driven without a real wallet.
pub struct StaticWallet {
    accounts: RwLock<Vec<Address>>,
    chain_id: RwLock<String>,
    events: broadcast::Sender<WalletEvent>,
}

impl StaticWallet {
    pub fn new(accounts: Vec<Address>, chain_id: u64) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            accounts: RwLock::new(accounts),
            chain_id: RwLock::new(format!("{:#x}", chain_id)),
            events,
        }
    }

    /// Replaces the account set and fires `AccountsChanged`.
    pub async fn emit_accounts_changed(&self, accounts: Vec<Address>) {
        *self.accounts.write().await = accounts.clone();
        match self.events.send(WalletEvent::AccountsChanged(accounts)) {
            Ok(count) => debug!("AccountsChanged delivered to {} receivers", count),
            Err(_) => debug!("AccountsChanged dropped, no receivers"),
        }
    }

    /// Switches the chain and fires `ChainChanged` with the hex id.
    pub async fn emit_chain_changed(&self, chain_id: u64) {
        let hex = format!("{:#x}", chain_id);
        *self.chain_id.write().await = hex.clone();
        let _ = self.events.send(WalletEvent::ChainChanged(hex));
    }

    pub fn emit_disconnect(&self) {
        let _ = self.events.send(WalletEvent::Disconnect);
    }
}

#[async_trait]
impl WalletProvider for StaticWallet {
    async fn request(&self, method: &str, _params: Value) -> Result<Value, Web3Error> {
        match method {
            "eth_requestAccounts" | "eth_accounts" => {
                let accounts = self.accounts.read().await;
                let listed: Vec<String> =
                    accounts.iter().map(|a| format!("{:#x}", a)).collect();
                Ok(json!(listed))
            }
            "eth_chainId" => Ok(json!(self.chain_id.read().await.clone())),
            other => Err(Web3Error::provider(format!(
                "unsupported wallet method '{}'",
                other
            ))),
        }
    }

    fn subscribe_events(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    fn test_account() -> Address {
        Address::from_low_u64_be(0xabcd)
    }

    #[test]
    fn test_parse_chain_id_forms() {
        assert_eq!(parse_chain_id("0x539").unwrap(), 1337);
        assert_eq!(parse_chain_id("0x5").unwrap(), 5);
        assert_eq!(parse_chain_id("1337").unwrap(), 1337);
        assert!(parse_chain_id("mainnet").is_err());
    }

    #[tokio::test]
    async fn test_static_wallet_answers_requests() {
        let wallet = StaticWallet::new(vec![test_account()], 1337);

        let accounts = request_accounts(&wallet).await.unwrap();
        assert_eq!(accounts, vec![test_account()]);

        let chain_id = request_chain_id(&wallet).await.unwrap();
        assert_eq!(chain_id, 1337);

        assert!(wallet.request("eth_sign", json!([])).await.is_err());
    }

    #[tokio::test]
    async fn test_static_wallet_broadcasts_events() {
        let wallet = StaticWallet::new(vec![test_account()], 1337);
        let mut events = wallet.subscribe_events();

        wallet.emit_chain_changed(5).await;

        let event = timeout(Duration::from_secs(1), events.recv())
            .await
            .expect("timeout waiting for event")
            .unwrap();
        match event {
            WalletEvent::ChainChanged(raw) => assert_eq!(raw, "0x5"),
            other => panic!("unexpected event: {:?}", other),
        }

        // Requests reflect the new chain immediately
        assert_eq!(request_chain_id(&wallet).await.unwrap(), 5);
    }
}
