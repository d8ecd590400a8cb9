//! # Dependency Container
//!
//! Owns the wallet/contract binding for one marketplace deployment and
//! publishes it as immutable snapshots. Consumers read the current snapshot
//! or subscribe to replacements; nothing ever mutates a snapshot in place.
//!
//! ## Overview
//!
//! A connection attempt resolves, in order: wallet accounts, the wallet's
//! chain id, the deployment artifact for that chain, and a typed contract
//! handle bound to the provider. Any failure leaves the container in `Error`
//! with an empty snapshot; consumers keep working against null handles.
//!
//! Attempts are sequenced. When wallet events overlap with an in-progress
//! attempt, only the newest attempt may publish; superseded results are
//! discarded, so subscribers never observe an older snapshot after a newer
//! one.

use arc_swap::ArcSwap;
use ethers::providers::Middleware;
use ethers::types::Address;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::instrument;

use crate::artifacts::ArtifactLoader;
use crate::contracts::NftMarket;
use crate::errors::Web3Error;
use crate::gateway::ChainGateway;
use crate::hooks::keys;
use crate::metrics;
use crate::query_cache::QueryCache;
use crate::settings::Settings;
use crate::wallet::{parse_chain_id, WalletEvent, WalletProvider};

/// One immutable view of the wallet/contract binding.
///
/// Field pairs degrade together: while disconnected every handle is `None`
/// and reads built on top render empty instead of failing.
#[derive(Clone)]
pub struct Web3Dependencies<M> {
    pub wallet: Option<Arc<dyn WalletProvider>>,
    pub provider: Option<Arc<M>>,
    pub contract: Option<NftMarket<M>>,
    pub account: Option<Address>,
    pub chain_id: Option<u64>,
    pub is_loading: bool,
}

impl<M> Web3Dependencies<M> {
    /// Snapshot of a container that is not connected.
    pub fn empty() -> Self {
        Self {
            wallet: None,
            provider: None,
            contract: None,
            account: None,
            chain_id: None,
            is_loading: false,
        }
    }

    /// Snapshot published while a connection attempt is running.
    pub fn loading() -> Self {
        Self {
            is_loading: true,
            ..Self::empty()
        }
    }

    pub fn is_connected(&self) -> bool {
        self.contract.is_some()
    }

    pub fn contract_address(&self) -> Option<Address> {
        self.contract.as_ref().map(|c| c.address())
    }
}

/// Connection lifecycle of the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Uninitialized = 0,
    Connecting = 1,
    Connected = 2,
    Error = 3,
}

impl ConnectionState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::Error,
            _ => Self::Uninitialized,
        }
    }
}

/// Snapshot plus the attempt that produced it, for last-writer-wins ordering.
struct Versioned<M> {
    attempt: u64,
    deps: Arc<Web3Dependencies<M>>,
}

/// Owns the connection lifecycle and the current dependency snapshot.
///
/// ## Features
///
/// - **Immutable Snapshots**: `snapshot()` is lock-free; holders of an old
///   `Arc` keep a consistent view
/// - **Last Writer Wins**: overlapping connection attempts cannot publish out
///   of order
/// - **Event Driven**: follows `AccountsChanged`, `ChainChanged` and
///   `Disconnect` from the wallet
pub struct DependencyContainer<M: Middleware> {
    gateway: ChainGateway<M>,
    artifacts: ArtifactLoader,
    cache: Arc<QueryCache>,
    contract_name: String,
    revalidate_on_reconnect: bool,
    snapshot: ArcSwap<Versioned<M>>,
    state: AtomicU8,
    attempts: AtomicU64,
    publisher: broadcast::Sender<Arc<Web3Dependencies<M>>>,
}

impl<M: Middleware + 'static> DependencyContainer<M> {
    pub fn new(
        gateway: ChainGateway<M>,
        artifacts: ArtifactLoader,
        cache: Arc<QueryCache>,
        settings: &Settings,
    ) -> Arc<Self> {
        let (publisher, _) = broadcast::channel(16);
        Arc::new(Self {
            gateway,
            artifacts,
            cache,
            contract_name: settings.artifacts.contract_name.clone(),
            revalidate_on_reconnect: settings.cache.revalidate_on_reconnect,
            snapshot: ArcSwap::from_pointee(Versioned {
                attempt: 0,
                deps: Arc::new(Web3Dependencies::empty()),
            }),
            state: AtomicU8::new(ConnectionState::Uninitialized as u8),
            attempts: AtomicU64::new(0),
            publisher,
        })
    }

    /// Current snapshot; lock-free.
    pub fn snapshot(&self) -> Arc<Web3Dependencies<M>> {
        Arc::clone(&self.snapshot.load().deps)
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Receives every snapshot published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Web3Dependencies<M>>> {
        self.publisher.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.publisher.receiver_count()
    }

    pub fn query_cache(&self) -> Arc<QueryCache> {
        Arc::clone(&self.cache)
    }

    /// Connects the wallet and binds the marketplace contract for its chain.
    ///
    /// Publishes a loading snapshot first, then either the connected snapshot
    /// or an empty one on failure. If a newer attempt started meanwhile, this
    /// attempt publishes nothing and returns the newer snapshot.
    #[instrument(skip(self), fields(contract = %self.contract_name))]
    pub async fn connect(&self) -> Result<Arc<Web3Dependencies<M>>, Web3Error> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        // Read before the loading snapshot replaces it
        let previous_contract = self.snapshot().contract_address();
        self.state
            .store(ConnectionState::Connecting as u8, Ordering::SeqCst);
        self.publish(attempt, Arc::new(Web3Dependencies::loading()));

        match self.resolve().await {
            Ok(deps) => {
                let snapshot = Arc::new(deps);
                if self.publish(attempt, Arc::clone(&snapshot)) {
                    self.state
                        .store(ConnectionState::Connected as u8, Ordering::SeqCst);
                    metrics::increment_snapshot_published();
                    self.after_publish(previous_contract, snapshot.contract_address());
                    info!(
                        "✅ Connected: {} at {:#x} on chain {}",
                        self.contract_name,
                        snapshot.contract_address().unwrap_or_default(),
                        snapshot.chain_id.unwrap_or_default()
                    );
                    Ok(snapshot)
                } else {
                    debug!("Connection attempt {} superseded; discarding result", attempt);
                    Ok(self.snapshot())
                }
            }
            Err(e) => {
                if self.publish(attempt, Arc::new(Web3Dependencies::empty())) {
                    self.state
                        .store(ConnectionState::Error as u8, Ordering::SeqCst);
                    self.refresh_session_keys();
                    warn!("Connection attempt {} failed: {}", attempt, e);
                }
                Err(e)
            }
        }
    }

    /// Drops all handles and returns to `Uninitialized`.
    pub fn reset(&self) {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.publish(attempt, Arc::new(Web3Dependencies::empty())) {
            self.state
                .store(ConnectionState::Uninitialized as u8, Ordering::SeqCst);
            self.refresh_session_keys();
            info!("Dependencies reset; container uninitialized");
        }
    }

    /// Starts the background task that follows wallet events.
    pub fn spawn_event_loop(self: &Arc<Self>) -> Result<JoinHandle<()>, Web3Error> {
        let mut events = self.gateway.subscribe_events()?;
        let container = Arc::clone(self);
        Ok(tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => container.handle_wallet_event(event).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Wallet event stream lagged; {} events dropped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Wallet event stream closed; stopping listener");
                        break;
                    }
                }
            }
        }))
    }

    async fn handle_wallet_event(&self, event: WalletEvent) {
        match event {
            WalletEvent::AccountsChanged(accounts) => {
                info!(
                    "Wallet accounts changed ({} available); re-resolving",
                    accounts.len()
                );
                if let Err(e) = self.connect().await {
                    warn!("Reconnect after account change failed: {}", e);
                }
            }
            WalletEvent::ChainChanged(raw) => {
                match parse_chain_id(&raw) {
                    Ok(chain_id) => info!("Wallet moved to chain {}; re-resolving", chain_id),
                    Err(_) => warn!("Wallet reported unparseable chain '{}'; re-resolving", raw),
                }
                if let Err(e) = self.connect().await {
                    warn!("Reconnect after chain change failed: {}", e);
                }
            }
            WalletEvent::Disconnect => {
                info!("Wallet disconnected");
                self.reset();
            }
        }
    }

    /// Resolves a full dependency set from the wallet's current state.
    async fn resolve(&self) -> Result<Web3Dependencies<M>, Web3Error> {
        let wallet = self
            .gateway
            .wallet()
            .cloned()
            .ok_or(Web3Error::WalletNotFound)?;
        let accounts = self.gateway.request_accounts().await?;
        let account = accounts.first().copied();
        let chain_id = self.gateway.chain_id().await?;
        let deployed = self.artifacts.load(&self.contract_name, chain_id).await?;
        let contract = self.gateway.bind_contract(deployed.address);

        Ok(Web3Dependencies {
            wallet: Some(wallet),
            provider: Some(self.gateway.provider()),
            contract: Some(contract),
            account,
            chain_id: Some(chain_id),
            is_loading: false,
        })
    }

    /// Stores and broadcasts `deps` unless a newer attempt already published.
    fn publish(&self, attempt: u64, deps: Arc<Web3Dependencies<M>>) -> bool {
        let mut published = false;
        self.snapshot.rcu(|current| {
            if current.attempt > attempt {
                published = false;
                Arc::clone(current)
            } else {
                published = true;
                Arc::new(Versioned {
                    attempt,
                    deps: Arc::clone(&deps),
                })
            }
        });
        if published {
            let _ = self.publisher.send(deps);
        }
        published
    }

    /// Cache upkeep after a connected snapshot replaced the previous one.
    fn after_publish(&self, previous: Option<Address>, current: Option<Address>) {
        self.refresh_session_keys();
        if self.revalidate_on_reconnect {
            self.cache.mark_all_stale();
        }
        if let Some(old) = previous {
            if previous != current {
                for prefix in keys::scoped_prefixes(old) {
                    self.cache.remove_prefix(&prefix);
                }
            }
        }
    }

    /// Account and network entries derive from the snapshot, so they must
    /// re-fetch whenever it changes.
    fn refresh_session_keys(&self) {
        self.cache.revalidate(keys::ACCOUNT);
        self.cache.revalidate(keys::NETWORK);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::providers::Provider;

    #[tokio::test]
    async fn test_new_container_starts_uninitialized_and_empty() {
        let (provider, _mock) = Provider::mocked();
        let container = DependencyContainer::new(
            ChainGateway::new(Arc::new(provider)),
            ArtifactLoader::new("does-not-matter"),
            QueryCache::new(true),
            &Settings::default(),
        );

        assert_eq!(container.state(), ConnectionState::Uninitialized);
        let snapshot = container.snapshot();
        assert!(!snapshot.is_connected());
        assert!(snapshot.account.is_none());
        assert!(!snapshot.is_loading);
    }

    #[tokio::test]
    async fn test_connect_without_wallet_errors_and_stays_empty() {
        let (provider, _mock) = Provider::mocked();
        let container = DependencyContainer::new(
            ChainGateway::new(Arc::new(provider)),
            ArtifactLoader::new("does-not-matter"),
            QueryCache::new(true),
            &Settings::default(),
        );

        let result = container.connect().await;
        assert!(matches!(result, Err(Web3Error::WalletNotFound)));
        assert_eq!(container.state(), ConnectionState::Error);
        assert!(!container.snapshot().is_connected());
    }

    #[test]
    fn test_publish_ignores_superseded_attempts() {
        let (provider, _mock) = Provider::mocked();
        let container = DependencyContainer::new(
            ChainGateway::new(Arc::new(provider)),
            ArtifactLoader::new("does-not-matter"),
            QueryCache::new(true),
            &Settings::default(),
        );

        assert!(container.publish(2, Arc::new(Web3Dependencies::loading())));
        assert!(!container.publish(1, Arc::new(Web3Dependencies::empty())));
        assert!(container.snapshot().is_loading);
    }
}
