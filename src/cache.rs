//! # Metadata Cache
//!
//! Build-once, file-backed memoization of protocol metadata.
//!
//! On-chain metadata (market lists, token decimals, pairings) is expensive to
//! assemble but effectively immutable for a deployment. [`MetadataCache`]
//! computes a document at most once per [`CacheKey`], persists it through a
//! [`MetadataStore`], and serves every later read from memory or the store.
//!
//! ## Guarantees
//!
//! - **Single flight**: concurrent callers for the same key share one build.
//! - **Durable**: a stored document is never recomputed. Invalidation means
//!   deleting the blob out-of-band.
//! - **Clean failure**: a failed, panicked or aborted build persists nothing,
//!   clears its in-flight mark and reports the error to every waiter.
//!
//! Cross-process coordination is not attempted: two processes building the
//! same key race and the last rename wins. Builders are expected to be
//! deterministic for a key, which makes that race benign.
//!
//! ## Example
//!
//! ```rust,no_run
//! use defi_adapters_sdk::cache::{CacheKey, MetadataCache};
//! use defi_adapters_sdk::storage::FileStore;
//! use defi_adapters_sdk::types::Chain;
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let cache: MetadataCache<Vec<String>> = MetadataCache::new(Arc::new(FileStore::new("metadata")));
//! let key = CacheKey::new("flux", Chain::Ethereum, "pool")?;
//! let doc = cache.get_or_build(&key, || async { Ok(vec!["fUSDC".to_string()]) }).await?;
//! # Ok(())
//! # }
//! ```

use crate::metrics;
use crate::storage::MetadataStore;
use crate::types::Chain;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Identity of one metadata document: (protocol, chain, product).
///
/// Protocol and product ids are restricted to `[a-z0-9_-]`, which keeps
/// [`CacheKey::storage_path`] injective.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    protocol_id: String,
    chain: Chain,
    product_id: String,
}

impl CacheKey {
    pub fn new(
        protocol_id: impl Into<String>,
        chain: Chain,
        product_id: impl Into<String>,
    ) -> Result<Self, CacheError> {
        let protocol_id = protocol_id.into();
        let product_id = product_id.into();
        validate_segment("protocol id", &protocol_id)?;
        validate_segment("product id", &product_id)?;
        Ok(Self { protocol_id, chain, product_id })
    }

    pub fn protocol_id(&self) -> &str {
        &self.protocol_id
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    /// Relative location of the document: `<protocol>/<product>/<chain id>.json`.
    pub fn storage_path(&self) -> PathBuf {
        PathBuf::from(&self.protocol_id)
            .join(&self.product_id)
            .join(format!("{}.json", self.chain.id()))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.protocol_id, self.chain, self.product_id)
    }
}

fn validate_segment(field: &'static str, value: &str) -> Result<(), CacheError> {
    let valid = !value.is_empty()
        && value
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-');
    if valid {
        Ok(())
    } else {
        Err(CacheError::InvalidKey { field, value: value.to_string() })
    }
}

/// Errors surfaced by [`MetadataCache`]. Cloneable because one failed flight
/// is reported to every caller awaiting it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("invalid {field} `{value}` in cache key (allowed: a-z, 0-9, '_', '-')")]
    InvalidKey { field: &'static str, value: String },
    #[error("metadata build failed for {key}: {reason}")]
    Build { key: CacheKey, reason: String },
    #[error("metadata storage failed for {key}: {reason}")]
    Storage { key: CacheKey, reason: String },
    #[error("stored metadata for {key} could not be decoded: {reason}")]
    Corrupt { key: CacheKey, reason: String },
    #[error("metadata build for {key} was cancelled before completing")]
    Cancelled { key: CacheKey },
}

type FlightResult<T> = Result<Arc<T>, CacheError>;

struct Flight<T> {
    id: u64,
    future: Shared<BoxFuture<'static, FlightResult<T>>>,
}

type DocumentMap<T> = Arc<DashMap<CacheKey, Arc<T>>>;
type FlightMap<T> = Arc<DashMap<CacheKey, Flight<T>>>;

/// Clears a flight's in-flight mark however the flight task exits.
struct FlightGuard<T> {
    in_flight: FlightMap<T>,
    key: CacheKey,
    id: u64,
}

impl<T> Drop for FlightGuard<T> {
    fn drop(&mut self) {
        let id = self.id;
        self.in_flight.remove_if(&self.key, |_, flight| flight.id == id);
    }
}

/// Durable build-once cache for documents of type `T`.
///
/// Each adapter owns one instance. Documents are handed out as `Arc<T>` and
/// must be treated as read-only.
///
/// Builds run as spawned tokio tasks, so `get_or_build` must be called from
/// within a tokio runtime.
pub struct MetadataCache<T> {
    store: Arc<dyn MetadataStore>,
    documents: DocumentMap<T>,
    in_flight: FlightMap<T>,
    next_flight_id: AtomicU64,
}

impl<T> MetadataCache<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self {
            store,
            documents: Arc::new(DashMap::new()),
            in_flight: Arc::new(DashMap::new()),
            next_flight_id: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &Arc<dyn MetadataStore> {
        &self.store
    }

    /// Returns the document for `key`, loading it from the store or running
    /// `builder` if nothing is stored yet.
    ///
    /// `builder` is invoked inside the flight task, and only when the store
    /// holds nothing for `key`. Callers joining an in-flight build, or finding
    /// the document in memory or in the store, never call it.
    pub async fn get_or_build<F, Fut>(&self, key: &CacheKey, builder: F) -> Result<Arc<T>, CacheError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        if let Some(document) = self.documents.get(key) {
            metrics::increment_cache_hit("memory");
            return Ok(Arc::clone(document.value()));
        }

        let flight = match self.in_flight.entry(key.clone()) {
            Entry::Occupied(entry) => {
                debug!("MetadataCache: joining in-flight load of {}", key);
                entry.get().future.clone()
            }
            Entry::Vacant(entry) => {
                // A flight may have published between the lookup above and taking this entry
                if let Some(document) = self.documents.get(key) {
                    metrics::increment_cache_hit("memory");
                    return Ok(Arc::clone(document.value()));
                }

                let id = self.next_flight_id.fetch_add(1, Ordering::Relaxed);
                let guard = FlightGuard {
                    in_flight: Arc::clone(&self.in_flight),
                    key: key.clone(),
                    id,
                };
                let task = tokio::spawn(load_or_build(
                    Arc::clone(&self.store),
                    Arc::clone(&self.documents),
                    key.clone(),
                    builder,
                    guard,
                ));

                let cancelled_key = key.clone();
                let future = async move {
                    match task.await {
                        Ok(result) => result,
                        Err(join_error) => {
                            warn!("MetadataCache: build task for {} ended abnormally: {}", cancelled_key, join_error);
                            metrics::increment_metadata_build(cancelled_key.protocol_id(), "cancelled");
                            Err(CacheError::Cancelled { key: cancelled_key })
                        }
                    }
                }
                .boxed()
                .shared();

                entry.insert(Flight { id, future: future.clone() });
                future
            }
        };

        flight.await
    }

    /// In-memory copy of the document, if one was loaded or built by this instance.
    pub fn get_cached(&self, key: &CacheKey) -> Option<Arc<T>> {
        self.documents.get(key).map(|document| Arc::clone(document.value()))
    }

    pub fn is_in_flight(&self, key: &CacheKey) -> bool {
        self.in_flight.contains_key(key)
    }

    /// Drops the in-memory copy so the next read goes back to the store.
    /// The stored blob is left untouched.
    pub fn forget(&self, key: &CacheKey) -> bool {
        self.documents.remove(key).is_some()
    }
}

/// Body of one flight. Runs detached from the callers so a dropped caller
/// cannot leave a half-written build behind.
async fn load_or_build<T, F, Fut>(
    store: Arc<dyn MetadataStore>,
    documents: DocumentMap<T>,
    key: CacheKey,
    builder: F,
    _guard: FlightGuard<T>,
) -> FlightResult<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
{
    let location = key.storage_path();

    let stored = store.read(&location).await.map_err(|e| CacheError::Storage {
        key: key.clone(),
        reason: e.to_string(),
    })?;

    if let Some(bytes) = stored {
        let document: T = serde_json::from_slice(&bytes).map_err(|e| {
            warn!("MetadataCache: stored metadata for {} at {} is not decodable: {}", key, location.display(), e);
            CacheError::Corrupt { key: key.clone(), reason: e.to_string() }
        })?;
        metrics::increment_cache_hit("store");
        debug!("MetadataCache: loaded {} from {}", key, location.display());
        return Ok(publish(&documents, key, document));
    }

    metrics::increment_cache_miss(key.protocol_id());
    info!("MetadataCache: no stored metadata for {}, building", key);
    let started = Instant::now();

    // Only reached when nothing is stored
    let document = match builder().await {
        Ok(document) => document,
        Err(e) => {
            metrics::increment_metadata_build(key.protocol_id(), "failure");
            warn!("MetadataCache: build for {} failed: {:#}", key, e);
            return Err(CacheError::Build { key, reason: format!("{:#}", e) });
        }
    };

    let mut bytes = serde_json::to_vec_pretty(&document).map_err(|e| CacheError::Storage {
        key: key.clone(),
        reason: format!("serialization failed: {}", e),
    })?;
    bytes.push(b'\n');

    store.write_atomic(&location, &bytes).await.map_err(|e| {
        metrics::increment_metadata_build(key.protocol_id(), "failure");
        CacheError::Storage { key: key.clone(), reason: e.to_string() }
    })?;

    let elapsed = started.elapsed();
    metrics::increment_metadata_build(key.protocol_id(), "success");
    metrics::record_metadata_build_duration(key.protocol_id(), elapsed);
    info!(
        "MetadataCache: built and stored {} ({} bytes) in {:?}",
        key,
        bytes.len(),
        elapsed
    );

    Ok(publish(&documents, key, document))
}

// Must happen before the guard clears the in-flight mark
fn publish<T>(documents: &DashMap<CacheKey, Arc<T>>, key: CacheKey, document: T) -> Arc<T> {
    let document = Arc::new(document);
    documents.insert(key, Arc::clone(&document));
    document
}
