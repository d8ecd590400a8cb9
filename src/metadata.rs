//! Resolves off-chain token metadata documents pointed at by `tokenURI`.

use log::{debug, warn};
use lru::LruCache;
use reqwest::Client;
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio::sync::Mutex;
use url::Url;

use crate::errors::Web3Error;
use crate::metrics;
use crate::types::NftMeta;

/// Inline JSON payloads, used by local fixtures and tests.
const DATA_JSON_PREFIX: &str = "data:application/json,";

/// HTTP client for metadata documents with a small LRU cache keyed by URI.
///
/// ## Features
///
/// - **URI Validation**: Only `http(s)` URLs and inline `data:application/json,`
///   payloads are accepted
/// - **Bounded Cache**: Metadata is immutable in practice, so hits skip the
///   network entirely
/// - **Timeouts**: Slow gateways fail the fetch instead of hanging a query
pub struct MetadataClient {
    http: Client,
    cache: Mutex<LruCache<String, NftMeta>>,
}

impl MetadataClient {
    pub fn new(timeout: Duration, cache_capacity: usize) -> Self {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");
        let capacity = NonZeroUsize::new(cache_capacity).unwrap_or(NonZeroUsize::MIN);

        Self {
            http,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Resolves the metadata document at `uri`, consulting the cache first.
    pub async fn fetch(&self, uri: &str) -> Result<NftMeta, Web3Error> {
        if let Some(meta) = self.cache.lock().await.get(uri) {
            metrics::increment_cache_hit("metadata");
            return Ok(meta.clone());
        }
        metrics::increment_cache_miss("metadata");

        let meta = self.fetch_uncached(uri).await?;
        self.cache.lock().await.put(uri.to_string(), meta.clone());
        Ok(meta)
    }

    async fn fetch_uncached(&self, uri: &str) -> Result<NftMeta, Web3Error> {
        if let Some(inline) = uri.strip_prefix(DATA_JSON_PREFIX) {
            debug!("Decoding inline metadata document ({} bytes)", inline.len());
            return serde_json::from_str(inline).map_err(|e| Web3Error::fetch(uri, e));
        }

        let url = Url::parse(uri).map_err(|e| Web3Error::fetch(uri, e))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            warn!("Rejecting metadata URI with scheme '{}'", url.scheme());
            return Err(Web3Error::fetch(uri, "unsupported URI scheme"));
        }

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Web3Error::fetch(uri, e))?;
        if !response.status().is_success() {
            return Err(Web3Error::fetch(uri, format!("HTTP {}", response.status())));
        }

        response
            .json::<NftMeta>()
            .await
            .map_err(|e| Web3Error::fetch(uri, e))
    }
}

/// Builds an inline metadata URI. Handy for fixtures and demos.
pub fn inline_metadata_uri(meta: &NftMeta) -> Result<String, Web3Error> {
    let body = serde_json::to_string(meta).map_err(|e| Web3Error::fetch("inline metadata", e))?;
    Ok(format!("{}{}", DATA_JSON_PREFIX, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> MetadataClient {
        MetadataClient::new(Duration::from_secs(2), 8)
    }

    fn sample_meta() -> NftMeta {
        NftMeta {
            name: "Plucky Penguin".to_string(),
            description: "Waddles with intent".to_string(),
            image: "https://example.test/penguin.png".to_string(),
            attributes: vec![],
        }
    }

    #[tokio::test]
    async fn test_fetch_inline_document() {
        let client = client();
        let uri = inline_metadata_uri(&sample_meta()).unwrap();

        let meta = client.fetch(&uri).await.unwrap();
        assert_eq!(meta, sample_meta());
    }

    #[tokio::test]
    async fn test_fetch_caches_by_uri() {
        let client = client();
        let uri = inline_metadata_uri(&sample_meta()).unwrap();

        let first = client.fetch(&uri).await.unwrap();
        let second = client.fetch(&uri).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(client.cache.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_rejects_non_http_scheme() {
        let client = client();
        assert!(client.fetch("ftp://example.test/meta.json").await.is_err());
        assert!(client.fetch("not a uri at all").await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_rejects_malformed_inline_json() {
        let client = client();
        let uri = format!("{}{{broken", DATA_JSON_PREFIX);
        assert!(client.fetch(&uri).await.is_err());
    }
}
