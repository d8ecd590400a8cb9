//! # Query Cache
//!
//! Shared cache behind all read hooks. Every query is addressed by a string
//! key; concurrent callers for the same key share a single in-flight fetch,
//! and completed results are kept so that later callers see data immediately.
//!
//! ## Overview
//!
//! The cache implements a stale-while-revalidate policy:
//!
//! - A fresh entry answers from memory without touching the fetcher
//! - A stale entry re-runs the fetcher; if that fails, the previous data stays
//!   available next to the error instead of being dropped
//! - Entries flagged stale (after reconnects or mutations) re-fetch on the
//!   next access, never spontaneously
//!
//! Results arriving for a key whose entry was removed or re-fetched in the
//! meantime are discarded, so an old response can never overwrite a newer one.

use dashmap::DashMap;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use log::{debug, warn};
use std::any::Any;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::errors::Web3Error;
use crate::metrics;

type SharedValue = Arc<dyn Any + Send + Sync>;
type SharedFetch = Shared<BoxFuture<'static, Result<SharedValue, String>>>;

/// Outcome of one cache read.
#[derive(Debug, Clone)]
pub struct QueryResult<T> {
    pub data: Option<Arc<T>>,
    pub error: Option<String>,
    pub is_validating: bool,
}

impl<T> QueryResult<T> {
    /// Result for a disabled query (no key, nothing to fetch).
    pub fn disabled() -> Self {
        Self {
            data: None,
            error: None,
            is_validating: false,
        }
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }
}

#[derive(Default)]
struct CacheSlot {
    data: Option<SharedValue>,
    error: Option<String>,
    stale: bool,
    in_flight: Option<(u64, SharedFetch)>,
    subscribers: usize,
}

impl CacheSlot {
    fn fresh(&self) -> bool {
        !self.stale && (self.data.is_some() || self.error.is_some())
    }
}

/// Keyed cache with request deduplication and stale-while-revalidate reads.
///
/// ## Features
///
/// - **Deduplication**: At most one fetch per key is in flight; callers attach
///   to it instead of issuing duplicates
/// - **Stale Data Retention**: A failed refresh keeps the last good value
///   visible alongside the error
/// - **Write-back Guard**: Each fetch carries a sequence number; late results
///   from superseded fetches are discarded
/// - **Subscriber Lifecycle**: Entries can be dropped once their last
///   subscriber goes away, or kept for reuse (`persist_idle`)
pub struct QueryCache {
    entries: DashMap<String, CacheSlot>,
    fetch_seq: AtomicU64,
    persist_idle: bool,
}

impl QueryCache {
    pub fn new(persist_idle: bool) -> Arc<Self> {
        Arc::new(Self {
            entries: DashMap::new(),
            fetch_seq: AtomicU64::new(0),
            persist_idle,
        })
    }

    /// Reads `key` through the cache, running `fetcher` only when needed.
    ///
    /// `None` disables the query: nothing is fetched and nothing is cached.
    /// When the entry is fresh the fetcher is not invoked at all; when a fetch
    /// for this key is already in flight the caller awaits that one instead.
    pub async fn query<T, F, Fut>(self: &Arc<Self>, key: Option<&str>, fetcher: F) -> QueryResult<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, Web3Error>> + Send + 'static,
    {
        let Some(key) = key else {
            return QueryResult::disabled();
        };

        // Decide under the entry lock; never await while holding it.
        let fetch = {
            let mut entry = self.entries.entry(key.to_string()).or_default();
            if let Some((_, fetch)) = &entry.in_flight {
                metrics::increment_fetch_join();
                fetch.clone()
            } else if entry.fresh() {
                metrics::increment_cache_hit("query");
                return QueryResult {
                    data: entry.data.clone().and_then(downcast_value::<T>),
                    error: entry.error.clone(),
                    is_validating: false,
                };
            } else {
                metrics::increment_cache_miss("query");
                let seq = self.fetch_seq.fetch_add(1, Ordering::Relaxed) + 1;
                let cache = Arc::clone(self);
                let owned_key = key.to_string();
                let fut = fetcher();
                let fetch: SharedFetch = async move {
                    let outcome = match fut.await {
                        Ok(value) => Ok(Arc::new(value) as SharedValue),
                        Err(e) => Err(e.to_string()),
                    };
                    cache.complete_fetch(&owned_key, seq, outcome.clone());
                    outcome
                }
                .boxed()
                .shared();
                entry.in_flight = Some((seq, fetch.clone()));
                fetch
            }
        };

        match fetch.await {
            Ok(value) => QueryResult {
                data: downcast_value::<T>(value),
                error: None,
                is_validating: false,
            },
            Err(message) => {
                // Keep showing the previous data next to the error
                let retained = self
                    .entries
                    .get(key)
                    .and_then(|entry| entry.data.clone())
                    .and_then(downcast_value::<T>);
                QueryResult {
                    data: retained,
                    error: Some(message),
                    is_validating: false,
                }
            }
        }
    }

    /// Current state of `key` without triggering a fetch.
    pub fn peek<T: Send + Sync + 'static>(&self, key: &str) -> Option<QueryResult<T>> {
        self.entries.get(key).map(|entry| QueryResult {
            data: entry.data.clone().and_then(downcast_value::<T>),
            error: entry.error.clone(),
            is_validating: entry.in_flight.is_some(),
        })
    }

    /// Registers interest in `key`; the entry lives at least as long as the
    /// returned guard.
    pub fn subscribe(self: &Arc<Self>, key: &str) -> SubscriptionGuard {
        self.entries.entry(key.to_string()).or_default().subscribers += 1;
        SubscriptionGuard {
            cache: Arc::clone(self),
            key: key.to_string(),
        }
    }

    pub fn subscriber_count(&self, key: &str) -> usize {
        self.entries
            .get(key)
            .map(|entry| entry.subscribers)
            .unwrap_or(0)
    }

    /// Marks `key` stale so the next access re-fetches it.
    pub fn revalidate(&self, key: &str) {
        if let Some(mut entry) = self.entries.get_mut(key) {
            entry.stale = true;
        }
    }

    /// Flags every entry for re-fetch on next access. Used after reconnects.
    pub fn mark_all_stale(&self) {
        for mut entry in self.entries.iter_mut() {
            entry.stale = true;
        }
        debug!("Marked {} query entries stale", self.entries.len());
    }

    /// Drops the entry for `key` outright.
    pub fn remove(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Drops every entry whose key starts with `prefix`.
    ///
    /// Used when the bound contract changes: keys embed the contract address,
    /// so the superseded contract's entries can be cleared wholesale.
    pub fn remove_prefix(&self, prefix: &str) {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!("Removed {} query entries under '{}'", removed, prefix);
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn complete_fetch(&self, key: &str, seq: u64, outcome: Result<SharedValue, String>) {
        let Some(mut entry) = self.entries.get_mut(key) else {
            debug!("Fetch for '{}' finished after its entry was dropped; discarding", key);
            return;
        };
        match entry.in_flight {
            Some((current, _)) if current == seq => {}
            _ => {
                debug!("Fetch {} for '{}' was superseded; discarding result", seq, key);
                return;
            }
        }

        entry.in_flight = None;
        entry.stale = false;
        match outcome {
            Ok(value) => {
                entry.data = Some(value);
                entry.error = None;
            }
            Err(message) => {
                entry.error = Some(message);
            }
        }
        drop(entry);
        metrics::set_cache_size("query", self.entries.len() as f64);
    }
}

/// Keeps a cache entry alive while held. Dropping the last guard for a key
/// removes the entry unless the cache was built with `persist_idle`.
pub struct SubscriptionGuard {
    cache: Arc<QueryCache>,
    key: String,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        let mut idle = false;
        if let Some(mut entry) = self.cache.entries.get_mut(&self.key) {
            entry.subscribers = entry.subscribers.saturating_sub(1);
            idle = entry.subscribers == 0;
        }
        if idle && !self.cache.persist_idle {
            self.cache
                .entries
                .remove_if(&self.key, |_, entry| entry.subscribers == 0);
            debug!("Dropped idle query entry '{}'", self.key);
        }
    }
}

fn downcast_value<T: Send + Sync + 'static>(value: SharedValue) -> Option<Arc<T>> {
    match value.downcast::<T>() {
        Ok(typed) => Some(typed),
        Err(_) => {
            warn!("Query entry holds a different type than requested");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::time::sleep;

    fn counting_fetcher(
        counter: Arc<AtomicUsize>,
        value: &'static str,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<&'static str, Web3Error>> {
        move || {
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                sleep(Duration::from_millis(20)).await;
                Ok(value)
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_concurrent_queries_share_one_fetch() {
        let cache = QueryCache::new(true);
        let calls = Arc::new(AtomicUsize::new(0));

        let (first, second) = tokio::join!(
            cache.query(Some("k"), counting_fetcher(calls.clone(), "v")),
            cache.query(Some("k"), counting_fetcher(calls.clone(), "v")),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*first.data.unwrap(), "v");
        assert_eq!(*second.data.unwrap(), "v");
    }

    #[tokio::test]
    async fn test_fresh_entry_skips_the_fetcher() {
        let cache = QueryCache::new(true);
        let calls = Arc::new(AtomicUsize::new(0));

        cache.query(Some("k"), counting_fetcher(calls.clone(), "v")).await;
        let again = cache
            .query(Some("k"), counting_fetcher(calls.clone(), "other"))
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*again.data.unwrap(), "v");
    }

    #[tokio::test]
    async fn test_none_key_disables_the_query() {
        let cache = QueryCache::new(true);
        let calls = Arc::new(AtomicUsize::new(0));

        let result: QueryResult<&'static str> = cache
            .query(None, counting_fetcher(calls.clone(), "v"))
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(result.data.is_none());
        assert!(result.error.is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_stale_data() {
        let cache = QueryCache::new(true);
        let calls = Arc::new(AtomicUsize::new(0));

        cache.query(Some("k"), counting_fetcher(calls.clone(), "good")).await;
        cache.revalidate("k");

        let result: QueryResult<&'static str> = cache
            .query(Some("k"), || {
                async { Err(Web3Error::fetch("getAllNftsOnSale", "rpc down")) }.boxed()
            })
            .await;

        assert_eq!(*result.data.unwrap(), "good");
        assert!(result.error.unwrap().contains("rpc down"));
    }

    #[tokio::test]
    async fn test_revalidate_triggers_refetch_on_next_access() {
        let cache = QueryCache::new(true);
        let calls = Arc::new(AtomicUsize::new(0));

        cache.query(Some("k"), counting_fetcher(calls.clone(), "v1")).await;
        cache.revalidate("k");
        let result = cache
            .query(Some("k"), counting_fetcher(calls.clone(), "v2"))
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(*result.data.unwrap(), "v2");
    }

    #[tokio::test]
    async fn test_result_arriving_after_removal_is_discarded() {
        let cache = QueryCache::new(true);

        let slow = cache.query(Some("k"), || {
            async {
                sleep(Duration::from_millis(50)).await;
                Ok("late")
            }
            .boxed()
        });
        let removal = async {
            sleep(Duration::from_millis(10)).await;
            cache.remove("k");
        };
        let (result, _) = tokio::join!(slow, removal);

        // The caller still gets its value, but the cache was not repopulated
        assert_eq!(*result.data.unwrap(), "late");
        assert!(!cache.contains("k"));
    }

    #[tokio::test]
    async fn test_last_subscriber_drop_removes_entry() {
        let cache = QueryCache::new(false);
        let calls = Arc::new(AtomicUsize::new(0));

        let guard = cache.subscribe("k");
        cache.query(Some("k"), counting_fetcher(calls.clone(), "v")).await;
        assert_eq!(cache.subscriber_count("k"), 1);

        drop(guard);
        assert!(!cache.contains("k"));
    }

    #[tokio::test]
    async fn test_persist_idle_keeps_entry_after_subscribers_leave() {
        let cache = QueryCache::new(true);
        let calls = Arc::new(AtomicUsize::new(0));

        let guard = cache.subscribe("k");
        cache.query(Some("k"), counting_fetcher(calls.clone(), "v")).await;
        drop(guard);

        assert!(cache.contains("k"));
        let result = cache
            .query(Some("k"), counting_fetcher(calls.clone(), "other"))
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*result.data.unwrap(), "v");
    }

    #[tokio::test]
    async fn test_remove_prefix_drops_only_matching_keys() {
        let cache = QueryCache::new(true);
        let calls = Arc::new(AtomicUsize::new(0));

        cache
            .query(Some("web3/listed/0xaa"), counting_fetcher(calls.clone(), "a"))
            .await;
        cache
            .query(Some("web3/listed/0xbb"), counting_fetcher(calls.clone(), "b"))
            .await;
        cache
            .query(Some("web3/account"), counting_fetcher(calls.clone(), "c"))
            .await;

        cache.remove_prefix("web3/listed/0xaa");

        assert!(!cache.contains("web3/listed/0xaa"));
        assert!(cache.contains("web3/listed/0xbb"));
        assert!(cache.contains("web3/account"));
    }
}
