use parking_lot::{Mutex, RwLock};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::CacheConfig;
use crate::entry::Entry;
use crate::error::{BoxError, Error, Result};
use crate::signal::StopSignal;

/// Internal shared state for the cache
struct CacheInner<K, V> {
    entries: RwLock<HashMap<K, Entry<V>>>,
    default_ttl: Duration,
    /// Cache-owned signal, fired on drop and by `Cache::stop` when no
    /// external signal was configured
    stop: StopSignal,
    /// Whether the task's lifecycle belongs to a caller-supplied signal
    externally_stopped: bool,
    cleanup_task: Mutex<Option<JoinHandle<()>>>,
}

impl<K, V> CacheInner<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Read pass of a sweep: keys whose entries are expired as of `now`
    fn expired_keys(&self, now: Instant) -> Vec<K> {
        self.entries
            .read()
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Write pass of a sweep.
    ///
    /// Each key is re-checked under the write lock, so an entry rewritten
    /// with a fresh TTL after the read pass is kept.
    fn remove_expired(&self, keys: &[K], now: Instant) -> usize {
        if keys.is_empty() {
            return 0;
        }

        let mut removed = Vec::with_capacity(keys.len());
        {
            let mut entries = self.entries.write();
            for key in keys {
                if entries.get(key).is_some_and(|entry| entry.is_expired_at(now)) {
                    removed.extend(entries.remove(key));
                }
            }
        }
        removed.len()
    }

    fn sweep(&self) -> usize {
        let now = Instant::now();
        let expired = self.expired_keys(now);
        self.remove_expired(&expired, now)
    }
}

impl<K, V> Drop for CacheInner<K, V> {
    fn drop(&mut self) {
        // Wake the cleanup task so it exits instead of waiting for its next tick
        self.stop.cancel();
    }
}

/// Thread-safe, generic in-memory cache with per-entry TTL
///
/// Entries live in a `HashMap` behind a single reader/writer lock. The lock
/// is only held around the map access itself, never while a `remember`
/// compute function runs.
///
/// Expired entries are hidden on read and physically removed by a background
/// task that wakes every `cleanup_interval`. That task stops when the
/// configured `StopSignal` fires (or, without one, when `stop` is called),
/// or when the last handle to the cache is dropped. Reads and writes keep
/// working after it stops.
///
/// Cloning a `Cache` is cheap; clones share the same entries.
///
/// # Example
///
/// ```rust,no_run
/// use mempot_core::{Cache, CacheConfig};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let config = CacheConfig::default()
///         .with_default_ttl(Duration::from_secs(30))
///         .with_cleanup_interval(Duration::from_secs(4));
///     let cache: Cache<String, String> = Cache::with_config(config);
///
///     cache.set_with_ttl("foo".to_string(), "bar".to_string(), Duration::from_secs(1));
///     assert_eq!(cache.get("foo").as_deref(), Some("bar"));
/// }
/// ```
pub struct Cache<K, V> {
    inner: Arc<CacheInner<K, V>>,
}

impl<K, V> Clone for Cache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Cache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a new cache with default configuration
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context. The default
    /// configuration runs a background cleanup task.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Creates a new cache with custom configuration
    ///
    /// # Panics
    ///
    /// Panics if `config.cleanup_interval` is non-zero and this is called
    /// outside of a Tokio runtime context. Use [`Cache::try_with_config`] to
    /// get an error instead.
    pub fn with_config(config: CacheConfig) -> Self {
        match Self::try_with_config(config) {
            Ok(cache) => cache,
            Err(err) => panic!(
                "mempot_core::Cache: {err}. Create the cache from within a \
                 #[tokio::main] or #[tokio::test] context, or set a zero \
                 cleanup interval to run without a background task."
            ),
        }
    }

    /// Creates a new cache, returning [`Error::NoRuntime`] if a background
    /// task is requested outside of a Tokio runtime.
    pub fn try_with_config(config: CacheConfig) -> Result<Self> {
        let CacheConfig {
            default_ttl,
            cleanup_interval,
            stop_signal,
        } = config;

        let runtime = if cleanup_interval.is_zero() {
            None
        } else {
            Some(tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?)
        };

        let inner = Arc::new(CacheInner {
            entries: RwLock::new(HashMap::new()),
            default_ttl,
            stop: StopSignal::new(),
            externally_stopped: stop_signal.is_some(),
            cleanup_task: Mutex::new(None),
        });

        if let Some(runtime) = runtime {
            let task = runtime.spawn(cleanup_task(
                Arc::downgrade(&inner),
                cleanup_interval,
                inner.stop.clone(),
                stop_signal,
            ));
            *inner.cleanup_task.lock() = Some(task);
        }

        Ok(Self { inner })
    }

    /// Returns the TTL applied by `set` and `remember`
    pub fn default_ttl(&self) -> Duration {
        self.inner.default_ttl
    }

    /// Stores a value with the default TTL, replacing any existing entry.
    pub fn set(&self, key: K, value: V) {
        self.set_with_ttl(key, value, self.inner.default_ttl);
    }

    /// Stores a value with an explicit TTL, replacing any existing entry.
    ///
    /// A zero TTL means the entry never expires.
    pub fn set_with_ttl(&self, key: K, value: V, ttl: Duration) {
        let entry = Entry::new(value, ttl);
        let replaced = self.inner.entries.write().insert(key, entry);
        drop(replaced);
    }

    /// Retrieves a value by key
    ///
    /// Returns `None` if the key doesn't exist or has expired. Expired
    /// entries are left in place for the cleanup task.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let entries = self.inner.entries.read();
        let entry = entries.get(key)?;
        if entry.is_expired() {
            return None;
        }
        Some(entry.value().clone())
    }

    /// Retrieves the entry for a key, including its expiration instant
    ///
    /// Returns `None` if the key doesn't exist or has expired.
    pub fn get_entry<Q>(&self, key: &Q) -> Option<Entry<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let entries = self.inner.entries.read();
        let entry = entries.get(key)?;
        if entry.is_expired() {
            return None;
        }
        Some(entry.clone())
    }

    /// Checks if a key exists and is not expired.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner
            .entries
            .read()
            .get(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    /// Deletes a key from the cache
    ///
    /// Returns `true` if an entry was present (regardless of expiration).
    pub fn delete<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let removed = self.inner.entries.write().remove(key);
        removed.is_some()
    }

    /// Removes every entry in one atomic swap.
    ///
    /// Concurrent readers and writers see either the old or the empty map.
    /// Returns the number of entries that were dropped.
    pub fn reset(&self) -> usize {
        let previous = std::mem::take(&mut *self.inner.entries.write());
        previous.len()
    }

    /// Returns the cached value for `key`, or computes, stores and returns it.
    ///
    /// The result is stored with the default TTL. See [`Cache::remember_with_ttl`].
    pub fn remember<F, E>(&self, key: K, compute: F) -> Result<V>
    where
        F: FnOnce(&K) -> Result<V, E>,
        E: Into<BoxError>,
    {
        self.remember_with_ttl(key, compute, self.inner.default_ttl)
    }

    /// Returns the cached value for `key`, or computes, stores and returns it
    /// with the given TTL.
    ///
    /// `compute` runs on the calling thread with no lock held. Concurrent
    /// misses on the same key are not de-duplicated: each caller runs its own
    /// `compute` and the last write wins.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Compute`] wrapping the failure of `compute`. Nothing
    /// is stored in that case.
    pub fn remember_with_ttl<F, E>(&self, key: K, compute: F, ttl: Duration) -> Result<V>
    where
        F: FnOnce(&K) -> Result<V, E>,
        E: Into<BoxError>,
    {
        if let Some(value) = self.get(&key) {
            tracing::trace!("remember: cache hit");
            return Ok(value);
        }

        tracing::trace!("remember: cache miss, computing value");
        let value = compute(&key).map_err(compute_failed)?;
        self.set_with_ttl(key, value.clone(), ttl);
        Ok(value)
    }

    /// Async form of [`Cache::remember`] for compute functions that await.
    pub async fn remember_async<F, Fut, E>(&self, key: K, compute: F) -> Result<V>
    where
        F: FnOnce(K) -> Fut,
        Fut: Future<Output = Result<V, E>>,
        E: Into<BoxError>,
    {
        self.remember_async_with_ttl(key, compute, self.inner.default_ttl)
            .await
    }

    /// Async form of [`Cache::remember_with_ttl`].
    ///
    /// No lock is held while the compute future is awaited.
    pub async fn remember_async_with_ttl<F, Fut, E>(
        &self,
        key: K,
        compute: F,
        ttl: Duration,
    ) -> Result<V>
    where
        F: FnOnce(K) -> Fut,
        Fut: Future<Output = Result<V, E>>,
        E: Into<BoxError>,
    {
        if let Some(value) = self.get(&key) {
            tracing::trace!("remember: cache hit");
            return Ok(value);
        }

        tracing::trace!("remember: cache miss, computing value");
        let value = compute(key.clone()).await.map_err(compute_failed)?;
        self.set_with_ttl(key, value.clone(), ttl);
        Ok(value)
    }

    /// Manually removes all expired entries
    ///
    /// Returns the number of entries removed. The background task runs the
    /// same sweep on every tick.
    pub fn cleanup(&self) -> usize {
        self.inner.sweep()
    }

    /// Returns the number of stored entries, including expired ones that
    /// have not been swept yet
    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    /// Returns `true` if no entries are stored
    pub fn is_empty(&self) -> bool {
        self.inner.entries.read().is_empty()
    }

    /// Returns `true` while the background cleanup task is running
    pub fn is_cleanup_running(&self) -> bool {
        self.inner
            .cleanup_task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Stops the background cleanup task
    ///
    /// Idempotent. Entries are left untouched and the cache stays usable;
    /// expiry is still enforced on read.
    ///
    /// Has no effect when the cache was built with
    /// [`CacheConfig::with_stop_signal`]: the task then only stops when that
    /// signal is cancelled.
    pub fn stop(&self) {
        if self.inner.externally_stopped {
            tracing::debug!("stop ignored: cleanup task is owned by an external stop signal");
            return;
        }
        self.inner.stop.cancel();
    }

    /// Stores an entry that is already expired (for testing purposes)
    #[cfg(test)]
    fn insert_expired(&self, key: K, value: V) {
        let expires_at = Instant::now() - Duration::from_secs(1);
        self.inner
            .entries
            .write()
            .insert(key, Entry::with_expiry(value, Some(expires_at)));
    }
}

impl<K, V> Default for Cache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for Cache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("entries", &self.inner.entries.read().len())
            .field("default_ttl", &self.inner.default_ttl)
            .finish()
    }
}

fn compute_failed<E: Into<BoxError>>(err: E) -> Error {
    let err = err.into();
    tracing::debug!(error = %err, "remember: compute failed, nothing cached");
    Error::Compute(err)
}

/// Background task that periodically removes expired entries
async fn cleanup_task<K, V>(
    inner: Weak<CacheInner<K, V>>,
    interval: Duration,
    own_stop: StopSignal,
    external_stop: Option<StopSignal>,
) where
    K: Hash + Eq + Clone,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Skip the first immediate tick - we want to wait for the interval first
    ticker.tick().await;

    tracing::debug!(?interval, "cache cleanup task started");

    loop {
        tokio::select! {
            _ = own_stop.cancelled() => break,
            _ = wait_external(external_stop.as_ref()) => break,
            _ = ticker.tick() => {
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                let removed = inner.sweep();
                if removed > 0 {
                    tracing::debug!(removed, "removed expired cache entries");
                }
            }
        }
    }

    tracing::debug!("cache cleanup task stopped");
}

async fn wait_external(signal: Option<&StopSignal>) {
    match signal {
        Some(signal) => signal.cancelled().await,
        None => std::future::pending().await,
    }
}
