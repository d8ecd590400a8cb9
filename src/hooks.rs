//! # Hook Factory
//!
//! Maps one dependency snapshot to a bundle of read hooks and mutation
//! actions. Building a bundle is pure: no I/O happens until a hook is
//! actually awaited, and equal snapshots produce bundles that address the
//! same cache keys.
//!
//! ## Overview
//!
//! Read hooks go through the shared [`QueryCache`] under contract-scoped
//! keys, so rebinding to another deployment can never serve data cached for
//! the previous one. While no contract is bound every read reports disabled
//! and every mutation rejects with `NotConnected`; nothing panics on a
//! missing wallet.
//!
//! Mutations run through the [`MutationExecutor`]: the returned `Result` only
//! covers argument validation and the connected check, everything after
//! submission is reported through the transaction notifier.

use ethers::providers::Middleware;
use ethers::types::{Address, TxHash, U256};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

use crate::contracts::{NftItem, NftMarket};
use crate::dependencies::Web3Dependencies;
use crate::errors::Web3Error;
use crate::metadata::MetadataClient;
use crate::network::{self, NetworkState};
use crate::query_cache::{QueryCache, QueryResult, SubscriptionGuard};
use crate::settings::Settings;
use crate::transactions::{MutationExecutor, PolledTx};
use crate::types::conversions::{ether_to_wei, wei_to_ether};
use crate::types::Nft;

/// Cache keys used by the hooks.
///
/// Contract-sensitive keys embed the deployment address, account-sensitive
/// keys embed the account, so a rebind naturally misses the old entries.
pub mod keys {
    use ethers::types::Address;

    /// Connected account; derived from the snapshot, not contract-scoped.
    pub const ACCOUNT: &str = "web3/account";
    /// Network validation state; derived from the snapshot.
    pub const NETWORK: &str = "web3/network";

    pub fn listed(contract: Address) -> String {
        format!("web3/listed/{:#x}", contract)
    }

    pub fn owned(contract: Address, account: Address) -> String {
        format!("web3/owned/{:#x}/{:#x}", contract, account)
    }

    pub fn listing_price(contract: Address) -> String {
        format!("web3/listing-price/{:#x}", contract)
    }

    /// Prefixes covering every key scoped to `contract`.
    pub fn scoped_prefixes(contract: Address) -> [String; 3] {
        [
            listed(contract),
            format!("web3/owned/{:#x}/", contract),
            listing_price(contract),
        ]
    }
}

/// Read hooks and mutation actions bound to one dependency snapshot.
///
/// Rebuild with [`build`] whenever the container publishes a new snapshot;
/// bundles are cheap to construct and hold no state of their own.
pub struct HookBundle<M: Middleware> {
    deps: Arc<Web3Dependencies<M>>,
    cache: Arc<QueryCache>,
    metadata: Arc<MetadataClient>,
    executor: Arc<MutationExecutor>,
    target_chain_id: u64,
    poll_interval: Duration,
    confirmation_deadline: Duration,
}

/// Builds the hook bundle for `deps`. Pure; performs no I/O.
pub fn build<M: Middleware + 'static>(
    deps: Arc<Web3Dependencies<M>>,
    cache: Arc<QueryCache>,
    metadata: Arc<MetadataClient>,
    executor: Arc<MutationExecutor>,
    settings: &Settings,
) -> HookBundle<M> {
    HookBundle {
        deps,
        cache,
        metadata,
        executor,
        target_chain_id: settings.network.target_chain_id,
        poll_interval: settings.transactions.poll_interval(),
        confirmation_deadline: settings.transactions.confirmation_deadline(),
    }
}

impl<M: Middleware + 'static> HookBundle<M> {
    pub fn deps(&self) -> &Arc<Web3Dependencies<M>> {
        &self.deps
    }

    fn contract(&self) -> Option<NftMarket<M>> {
        self.deps.contract.clone()
    }

    /// Connected account, disabled while no account is available.
    pub async fn use_account(&self) -> QueryResult<Address> {
        let Some(account) = self.deps.account else {
            return QueryResult::disabled();
        };
        self.cache
            .query(Some(keys::ACCOUNT), move || async move { Ok(account) })
            .await
    }

    /// Wallet chain validated against the target chain.
    pub async fn use_network(&self) -> QueryResult<NetworkState> {
        let state = network::validate(self.deps.chain_id, self.target_chain_id);
        self.cache
            .query(Some(keys::NETWORK), move || async move { Ok(state) })
            .await
    }

    /// All items on sale, joined with their token metadata.
    ///
    /// Disabled while no contract is bound. One failing metadata fetch fails
    /// the whole query; previously cached data stays visible.
    pub async fn use_listed_nfts(&self) -> QueryResult<Vec<Nft>> {
        let Some(contract) = self.contract() else {
            return QueryResult::disabled();
        };
        let key = keys::listed(contract.address());
        let metadata = Arc::clone(&self.metadata);

        self.cache
            .query(Some(&key), move || async move {
                let items = contract
                    .get_all_nfts_on_sale()
                    .call()
                    .await
                    .map_err(|e| Web3Error::fetch("getAllNftsOnSale", e))?;
                join_with_metadata(&contract, &metadata, items).await
            })
            .await
    }

    /// NFTs owned by the connected account, joined with metadata.
    ///
    /// The marketplace scopes ownership by `msg.sender`, so the read is
    /// issued from the account address. An account with no tokens resolves
    /// to an empty list, not an error.
    pub async fn use_owned_nfts(&self) -> QueryResult<Vec<Nft>> {
        let Some(contract) = self.contract() else {
            return QueryResult::disabled();
        };
        let Some(account) = self.deps.account else {
            return QueryResult::disabled();
        };
        let key = keys::owned(contract.address(), account);
        let metadata = Arc::clone(&self.metadata);

        self.cache
            .query(Some(&key), move || async move {
                let items = contract
                    .get_owned_nfts()
                    .from(account)
                    .call()
                    .await
                    .map_err(|e| Web3Error::fetch("getOwnedNfts", e))?;
                join_with_metadata(&contract, &metadata, items).await
            })
            .await
    }

    /// Marketplace listing fee as a decimal ether string.
    pub async fn use_listing_price(&self) -> QueryResult<String> {
        let Some(contract) = self.contract() else {
            return QueryResult::disabled();
        };
        let key = keys::listing_price(contract.address());

        self.cache
            .query(Some(&key), move || async move {
                let wei = contract
                    .listing_price()
                    .call()
                    .await
                    .map_err(|e| Web3Error::fetch("listingPrice", e))?;
                Ok(wei_to_ether(wei)?.to_string())
            })
            .await
    }

    /// Keeps the listed-NFTs entry alive while the returned guard is held.
    pub fn watch_listed_nfts(&self) -> Option<SubscriptionGuard> {
        self.contract()
            .map(|c| self.cache.subscribe(&keys::listed(c.address())))
    }

    /// Buys a listed NFT, attaching `price_in_ether` as call value.
    pub async fn buy_nft(&self, token_id: u64, price_in_ether: Decimal) -> Result<(), Web3Error> {
        let contract = self.contract().ok_or(Web3Error::NotConnected)?;
        let value = ether_to_wei(price_in_ether)?;
        let confirm = self.confirmer()?;

        self.executor
            .execute("buyNft", move || async move {
                let call = contract.buy_nft(U256::from(token_id)).value(value);
                let pending = call
                    .send()
                    .await
                    .map_err(|e| Web3Error::TransactionRejected {
                        detail: e.to_string(),
                    })?;
                Ok(confirm(*pending))
            })
            .await;
        Ok(())
    }

    /// Places an owned NFT on sale for `price_in_ether`.
    ///
    /// The marketplace charges its listing fee on this call; the current fee
    /// is read from the contract and attached as value.
    pub async fn list_nft(&self, token_id: u64, price_in_ether: Decimal) -> Result<(), Web3Error> {
        let contract = self.contract().ok_or(Web3Error::NotConnected)?;
        let price = ether_to_wei(price_in_ether)?;
        let confirm = self.confirmer()?;

        self.executor
            .execute("placeNftOnSale", move || async move {
                let fee = contract
                    .listing_price()
                    .call()
                    .await
                    .map_err(|e| Web3Error::TransactionRejected {
                        detail: e.to_string(),
                    })?;
                let call = contract
                    .place_nft_on_sale(U256::from(token_id), price)
                    .value(fee);
                let pending = call
                    .send()
                    .await
                    .map_err(|e| Web3Error::TransactionRejected {
                        detail: e.to_string(),
                    })?;
                Ok(confirm(*pending))
            })
            .await;
        Ok(())
    }

    /// Mints a new token pointing at `token_uri`, listed at `price_in_ether`.
    pub async fn mint_nft(
        &self,
        token_uri: String,
        price_in_ether: Decimal,
    ) -> Result<(), Web3Error> {
        let contract = self.contract().ok_or(Web3Error::NotConnected)?;
        let price = ether_to_wei(price_in_ether)?;
        let confirm = self.confirmer()?;

        self.executor
            .execute("mintToken", move || async move {
                let fee = contract
                    .listing_price()
                    .call()
                    .await
                    .map_err(|e| Web3Error::TransactionRejected {
                        detail: e.to_string(),
                    })?;
                let call = contract.mint_token(token_uri, price).value(fee);
                let pending = call
                    .send()
                    .await
                    .map_err(|e| Web3Error::TransactionRejected {
                        detail: e.to_string(),
                    })?;
                Ok(confirm(*pending))
            })
            .await;
        Ok(())
    }

    /// Burns an owned token.
    pub async fn burn_nft(&self, token_id: u64) -> Result<(), Web3Error> {
        let contract = self.contract().ok_or(Web3Error::NotConnected)?;
        let confirm = self.confirmer()?;

        self.executor
            .execute("burnToken", move || async move {
                let call = contract.burn_token(U256::from(token_id));
                let pending = call
                    .send()
                    .await
                    .map_err(|e| Web3Error::TransactionRejected {
                        detail: e.to_string(),
                    })?;
                Ok(confirm(*pending))
            })
            .await;
        Ok(())
    }

    /// Updates the marketplace listing fee (owner only on chain).
    pub async fn set_listing_price(&self, price_in_ether: Decimal) -> Result<(), Web3Error> {
        let contract = self.contract().ok_or(Web3Error::NotConnected)?;
        let price = ether_to_wei(price_in_ether)?;
        let confirm = self.confirmer()?;

        self.executor
            .execute("setListingPrice", move || async move {
                let call = contract.set_listing_price(price);
                let pending = call
                    .send()
                    .await
                    .map_err(|e| Web3Error::TransactionRejected {
                        detail: e.to_string(),
                    })?;
                Ok(confirm(*pending))
            })
            .await;
        Ok(())
    }

    /// Marks this contract's read keys stale. Call after a mutation confirms
    /// so the next render re-fetches.
    pub fn revalidate_reads(&self) {
        let Some(contract) = self.contract() else {
            return;
        };
        let address = contract.address();
        self.cache.revalidate(&keys::listed(address));
        self.cache.revalidate(&keys::listing_price(address));
        if let Some(account) = self.deps.account {
            self.cache.revalidate(&keys::owned(address, account));
        }
    }

    /// Builds the receipt poller for a submitted transaction hash.
    fn confirmer(&self) -> Result<impl Fn(TxHash) -> PolledTx<M>, Web3Error> {
        let provider = self
            .deps
            .provider
            .clone()
            .ok_or(Web3Error::NotConnected)?;
        let poll_interval = self.poll_interval;
        let deadline = self.confirmation_deadline;
        Ok(move |hash| PolledTx::new(Arc::clone(&provider), hash, poll_interval, deadline))
    }
}

/// Joins raw marketplace items with their metadata documents, in order.
async fn join_with_metadata<M: Middleware + 'static>(
    contract: &NftMarket<M>,
    metadata: &MetadataClient,
    items: Vec<NftItem>,
) -> Result<Vec<Nft>, Web3Error> {
    let mut nfts = Vec::with_capacity(items.len());
    for item in items {
        let uri = contract
            .token_uri(item.token_id)
            .call()
            .await
            .map_err(|e| Web3Error::fetch("tokenURI", e))?;
        let meta = metadata.fetch(&uri).await?;
        nfts.push(Nft::from_onchain(item, meta)?);
    }
    Ok(nfts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transactions::LogNotifier;
    use ethers::providers::{MockProvider, Provider};
    use std::str::FromStr;

    type MockedDeps = Web3Dependencies<Provider<MockProvider>>;

    fn empty_bundle() -> HookBundle<Provider<MockProvider>> {
        let settings = Settings::default();
        build(
            Arc::new(MockedDeps::empty()),
            QueryCache::new(true),
            Arc::new(MetadataClient::new(Duration::from_secs(1), 8)),
            Arc::new(MutationExecutor::new(Arc::new(LogNotifier))),
            &settings,
        )
    }

    #[test]
    fn test_keys_are_scoped_by_contract_and_account() {
        let contract_a = Address::repeat_byte(0xaa);
        let contract_b = Address::repeat_byte(0xbb);
        let account = Address::repeat_byte(0x01);

        assert_ne!(keys::listed(contract_a), keys::listed(contract_b));
        assert_ne!(
            keys::owned(contract_a, account),
            keys::owned(contract_b, account)
        );
        // Same inputs always address the same entry
        assert_eq!(keys::listed(contract_a), keys::listed(contract_a));

        for prefix in keys::scoped_prefixes(contract_a) {
            assert!(prefix.contains("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"));
        }
    }

    #[tokio::test]
    async fn test_reads_disabled_without_contract() {
        let bundle = empty_bundle();

        assert!(bundle.use_listed_nfts().await.data.is_none());
        assert!(bundle.use_owned_nfts().await.data.is_none());
        assert!(bundle.use_listing_price().await.data.is_none());
        assert!(bundle.use_account().await.data.is_none());
        assert!(bundle.watch_listed_nfts().is_none());
    }

    #[tokio::test]
    async fn test_mutations_reject_without_contract() {
        let bundle = empty_bundle();
        let price = Decimal::from_str("0.3").unwrap();

        assert!(matches!(
            bundle.buy_nft(1, price).await,
            Err(Web3Error::NotConnected)
        ));
        assert!(matches!(
            bundle.list_nft(1, price).await,
            Err(Web3Error::NotConnected)
        ));
        assert!(matches!(
            bundle.mint_nft("https://x.test/1".to_string(), price).await,
            Err(Web3Error::NotConnected)
        ));
        assert!(matches!(
            bundle.burn_nft(1).await,
            Err(Web3Error::NotConnected)
        ));
        assert!(matches!(
            bundle.set_listing_price(price).await,
            Err(Web3Error::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_use_network_reports_mismatch_without_failing() {
        let bundle = empty_bundle();

        let state = bundle.use_network().await;
        let state = state.data.expect("network state always resolves");
        assert!(state.is_loading);
        assert!(!state.is_connected_to_network);
        assert_eq!(state.target_network, "Ganache");
    }
}
