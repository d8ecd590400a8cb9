//! Thin access layer over the injected wallet and the RPC provider.

use ethers::providers::Middleware;
use ethers::types::Address;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::contracts::NftMarket;
use crate::errors::Web3Error;
use crate::wallet::{self, WalletEvent, WalletProvider};

/// Wallet and provider handles for one host environment.
///
/// Owns no connection state; the dependency container layers lifecycle and
/// snapshots on top of this.
pub struct ChainGateway<M> {
    provider: Arc<M>,
    wallet: Option<Arc<dyn WalletProvider>>,
}

impl<M: Middleware + 'static> ChainGateway<M> {
    /// Gateway with a read-only provider and no wallet.
    pub fn new(provider: Arc<M>) -> Self {
        Self {
            provider,
            wallet: None,
        }
    }

    pub fn with_wallet(mut self, wallet: Arc<dyn WalletProvider>) -> Self {
        self.wallet = Some(wallet);
        self
    }

    pub fn provider(&self) -> Arc<M> {
        Arc::clone(&self.provider)
    }

    pub fn wallet(&self) -> Option<&Arc<dyn WalletProvider>> {
        self.wallet.as_ref()
    }

    /// Prompts the wallet for account access.
    pub async fn request_accounts(&self) -> Result<Vec<Address>, Web3Error> {
        let wallet = self.wallet.as_deref().ok_or(Web3Error::WalletNotFound)?;
        wallet::request_accounts(wallet).await
    }

    /// Chain id the wallet is currently on.
    pub async fn chain_id(&self) -> Result<u64, Web3Error> {
        let wallet = self.wallet.as_deref().ok_or(Web3Error::WalletNotFound)?;
        wallet::request_chain_id(wallet).await
    }

    pub fn subscribe_events(&self) -> Result<broadcast::Receiver<WalletEvent>, Web3Error> {
        let wallet = self.wallet.as_deref().ok_or(Web3Error::WalletNotFound)?;
        Ok(wallet.subscribe_events())
    }

    /// Binds the marketplace contract at `address` to this gateway's provider.
    pub fn bind_contract(&self, address: Address) -> NftMarket<M> {
        NftMarket::new(address, Arc::clone(&self.provider))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::StaticWallet;
    use ethers::providers::Provider;

    #[tokio::test]
    async fn test_gateway_without_wallet_reports_wallet_not_found() {
        let (provider, _mock) = Provider::mocked();
        let gateway = ChainGateway::new(Arc::new(provider));

        assert!(matches!(
            gateway.request_accounts().await,
            Err(Web3Error::WalletNotFound)
        ));
        assert!(matches!(
            gateway.chain_id().await,
            Err(Web3Error::WalletNotFound)
        ));
        assert!(gateway.subscribe_events().is_err());
    }

    #[tokio::test]
    async fn test_gateway_resolves_through_wallet() {
        let (provider, _mock) = Provider::mocked();
        let account = Address::from_low_u64_be(7);
        let wallet = Arc::new(StaticWallet::new(vec![account], 1337));
        let gateway = ChainGateway::new(Arc::new(provider)).with_wallet(wallet);

        assert_eq!(gateway.request_accounts().await.unwrap(), vec![account]);
        assert_eq!(gateway.chain_id().await.unwrap(), 1337);

        let contract = gateway.bind_contract(Address::from_low_u64_be(9));
        assert_eq!(contract.address(), Address::from_low_u64_be(9));
    }
}
