//! Expiring key/value cache
//!
//! Entries live for a fixed lifetime from their last insert. Eviction is lazy:
//! an expired entry is removed by the read that finds it, by
//! [`TtlCache::purge_expired`], or by an explicit removal. There is no size
//! bound and no LRU policy; the cache exists to dedupe short-lived fetches.
//!
//! # Change notifications
//!
//! Every mutation is published on a `tokio::sync::broadcast` channel as a
//! [`CacheEvent`]. If no subscribers exist the event is dropped without
//! blocking, and lagging subscribers lose the oldest events first.
//!
//! ```
//! use libunistore::cache::{CacheEvent, TtlCache};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(60));
//! let mut events = cache.subscribe();
//!
//! cache.insert(42, "answer".to_string());
//! assert_eq!(cache.value(&"answer".to_string()), Some(42));
//! assert!(matches!(events.recv().await, Ok(CacheEvent::Updated { .. })));
//! # }
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::trace;

/// Buffer per notification subscriber
const EVENT_CAPACITY: usize = 64;

/// Stored value and its expiry
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Mutation notifications
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEvent<K> {
    /// A value was inserted or replaced
    Updated { key: K },
    /// An expired entry was evicted by a read or a purge
    Expired { key: K },
    /// An entry was explicitly removed
    Removed { key: K },
    /// Every entry was removed
    Cleared,
}

/// Receiver for cache notifications
pub type CacheEventReceiver<K> = broadcast::Receiver<CacheEvent<K>>;

struct Inner<K, V> {
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
    lifetime: Duration,
    events: broadcast::Sender<CacheEvent<K>>,
}

/// Time-bounded key/value store, cheap to clone and share across tasks
///
/// Each operation holds one lock for its whole read-modify-write, so
/// concurrent inserts and lookups on a key never lose an eviction or an
/// overwrite.
pub struct TtlCache<K, V> {
    inner: Arc<Inner<K, V>>,
}

impl<K, V> Clone for TtlCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Send + std::fmt::Debug + 'static,
    V: Clone,
{
    /// Create a cache whose entries expire `lifetime` after insertion
    pub fn new(lifetime: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                lifetime,
                events,
            }),
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.inner.lifetime
    }

    /// Store `value` under `key`, replacing any previous entry
    pub fn insert(&self, value: V, key: K) {
        let expires_at = Instant::now() + self.inner.lifetime;
        self.lock().insert(key.clone(), CacheEntry { value, expires_at });
        trace!(?key, "Cache insert");
        self.emit(CacheEvent::Updated { key });
    }

    /// The live value for `key`; an expired entry is evicted and reported absent
    pub fn value(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
            Some(_) => {}
            None => return None,
        }
        entries.remove(key);
        drop(entries);
        trace!(?key, "Cache entry expired");
        self.emit(CacheEvent::Expired { key: key.clone() });
        None
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.value(key).is_some()
    }

    /// Explicitly evict `key`, returning the value if it was still live
    pub fn remove_value(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let entry = self.lock().remove(key)?;
        self.emit(CacheEvent::Removed { key: key.clone() });
        (!entry.is_expired(now)).then_some(entry.value)
    }

    /// Evict everything (logout, reset)
    pub fn remove_all(&self) {
        self.lock().clear();
        self.emit(CacheEvent::Cleared);
    }

    /// Evict every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<K> = {
            let mut entries = self.lock();
            let expired: Vec<K> = entries
                .iter()
                .filter(|(_, entry)| entry.is_expired(now))
                .map(|(key, _)| key.clone())
                .collect();
            for key in &expired {
                entries.remove(key);
            }
            expired
        };
        let count = expired.len();
        for key in expired {
            self.emit(CacheEvent::Expired { key });
        }
        count
    }

    /// Number of stored entries, expired or not
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the cached value or await `fetch` and cache its success
    ///
    /// Failures are returned unchanged and never cached.
    pub async fn fetch_or_insert<F, E>(&self, key: K, fetch: F) -> Result<V, E>
    where
        F: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.value(&key) {
            trace!(?key, "Cache hit");
            return Ok(value);
        }
        let value = fetch.await?;
        self.insert(value.clone(), key);
        Ok(value)
    }

    /// Subscribe to mutation notifications
    pub fn subscribe(&self) -> CacheEventReceiver<K> {
        self.inner.events.subscribe()
    }

    fn emit(&self, event: CacheEvent<K>) {
        // No receivers is fine
        let _ = self.inner.events.send(event);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, CacheEntry<V>>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<K, V> std::fmt::Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("lifetime", &self.inner.lifetime)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cache(lifetime_ms: u64) -> TtlCache<String, u32> {
        TtlCache::new(Duration::from_millis(lifetime_ms))
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_then_read_hits() {
        let cache = cache(1000);
        cache.insert(7, "AAPL".to_string());
        assert_eq!(cache.value(&"AAPL".to_string()), Some(7));
        assert!(cache.contains_key(&"AAPL".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_evicted_and_stays_gone() {
        let cache = cache(1000);
        let key = "AAPL".to_string();
        cache.insert(7, key.clone());

        tokio::time::advance(Duration::from_millis(1000)).await;
        assert_eq!(cache.value(&key), None);
        assert_eq!(cache.len(), 0, "expired read evicts");
        assert_eq!(cache.value(&key), None, "no resurrection");
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_refreshes_lifetime() {
        let cache = cache(1000);
        let key = "MSFT".to_string();
        cache.insert(1, key.clone());
        tokio::time::advance(Duration::from_millis(800)).await;
        cache.insert(2, key.clone());
        tokio::time::advance(Duration::from_millis(800)).await;

        assert_eq!(cache.value(&key), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_value_and_remove_all() {
        let cache = cache(1000);
        cache.insert(1, "a".to_string());
        cache.insert(2, "b".to_string());

        assert_eq!(cache.remove_value(&"a".to_string()), Some(1));
        assert_eq!(cache.remove_value(&"a".to_string()), None);
        assert_eq!(cache.len(), 1);

        cache.remove_all();
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired_only_removes_stale_entries() {
        let cache = cache(1000);
        cache.insert(1, "old".to_string());
        tokio::time::advance(Duration::from_millis(600)).await;
        cache.insert(2, "new".to_string());
        tokio::time::advance(Duration::from_millis(600)).await;

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.value(&"new".to_string()), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_are_published() {
        let cache = cache(100);
        let mut events = cache.subscribe();

        cache.insert(1, "k".to_string());
        tokio::time::advance(Duration::from_millis(100)).await;
        cache.value(&"k".to_string());
        cache.remove_all();

        assert_eq!(events.recv().await.unwrap(), CacheEvent::Updated { key: "k".to_string() });
        assert_eq!(events.recv().await.unwrap(), CacheEvent::Expired { key: "k".to_string() });
        assert_eq!(events.recv().await.unwrap(), CacheEvent::Cleared);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_or_insert_dedupes_fetches() {
        let cache = cache(1000);
        let fetches = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let fetches = fetches.clone();
            let value = cache
                .fetch_or_insert("TSLA".to_string(), async move {
                    fetches.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(99)
                })
                .await
                .unwrap();
            assert_eq!(value, 99);
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_or_insert_does_not_cache_failures() {
        let cache = cache(1000);
        let result = cache
            .fetch_or_insert("NVDA".to_string(), async { Err::<u32, _>("offline") })
            .await;
        assert_eq!(result, Err("offline"));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_inserts_and_reads() {
        let cache: TtlCache<u32, u32> = TtlCache::new(Duration::from_secs(60));
        let mut tasks = Vec::new();
        for worker in 0..8u32 {
            let cache = cache.clone();
            tasks.push(tokio::spawn(async move {
                for i in 0..100u32 {
                    cache.insert(worker * 1000 + i, i % 10);
                    let _ = cache.value(&(i % 10));
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(cache.len(), 10);
    }
}
