//! Cache storage.
//!
//! - [`DataStore`]: memoized content query results of any cloneable type
//! - [`ResponseStore`]: rendered HTTP responses keyed by path and query

use std::any::Any;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use bytes::Bytes;
use lru::LruCache;
use metrics::counter;

use super::config::CacheConfig;
use super::keys::{DataKey, ResponseKey};
use super::lock::write;

const SOURCE: &str = "cache::store";

/// Outcome of a store lookup. `Expired` means a stale entry was just dropped.
#[derive(Debug, PartialEq, Eq)]
pub enum Lookup<T> {
    Hit(T),
    Miss,
    Expired,
}

impl<T> Lookup<T> {
    pub fn hit(self) -> Option<T> {
        match self {
            Lookup::Hit(value) => Some(value),
            Lookup::Miss | Lookup::Expired => None,
        }
    }
}

struct DataEntry {
    value: Arc<dyn Any + Send + Sync>,
    expires_at: Instant,
}

/// Memoized query results with LRU eviction and per-entry expiry.
pub struct DataStore {
    entries: RwLock<LruCache<DataKey, DataEntry>>,
    default_ttl: Duration,
}

impl DataStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.data_entry_limit())),
            default_ttl: config.data_ttl(),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Fetch a live entry. Expired entries are dropped; entries of another type miss.
    pub fn get<T>(&self, key: &DataKey) -> Lookup<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let mut entries = write(&self.entries, SOURCE, "data.get");
        let hit = match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => entry
                .value
                .downcast_ref::<T>()
                .cloned()
                .map_or(Lookup::Miss, Lookup::Hit),
            Some(_) => {
                entries.pop(key);
                Lookup::Expired
            }
            None => Lookup::Miss,
        };

        if matches!(hit, Lookup::Hit(_)) {
            counter!("safecircle_cache_data_hit_total").increment(1);
        } else {
            counter!("safecircle_cache_data_miss_total").increment(1);
        }
        hit
    }

    /// Store a value. Returns the key evicted to make room, if any.
    pub fn set<T>(&self, key: DataKey, value: T, ttl: Duration) -> Option<DataKey>
    where
        T: Send + Sync + 'static,
    {
        let entry = DataEntry {
            value: Arc::new(value),
            expires_at: Instant::now() + ttl,
        };
        let mut entries = write(&self.entries, SOURCE, "data.set");
        let evicted = entries
            .push(key.clone(), entry)
            .map(|(old_key, _)| old_key)
            .filter(|old_key| *old_key != key);
        if evicted.is_some() {
            counter!("safecircle_cache_data_evict_total").increment(1);
        }
        evicted
    }

    pub fn invalidate(&self, key: &DataKey) -> bool {
        write(&self.entries, SOURCE, "data.invalidate")
            .pop(key)
            .is_some()
    }

    pub fn clear(&self) {
        write(&self.entries, SOURCE, "data.clear").clear();
    }

    pub fn len(&self) -> usize {
        write(&self.entries, SOURCE, "data.len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A response body and the headers needed to replay it.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

struct ResponseEntry {
    response: CachedResponse,
    expires_at: Instant,
}

/// Rendered responses with LRU eviction.
pub struct ResponseStore {
    entries: RwLock<LruCache<ResponseKey, ResponseEntry>>,
    ttl: Duration,
}

impl ResponseStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.response_entry_limit())),
            ttl: config.response_ttl(),
        }
    }

    pub fn get(&self, key: &ResponseKey) -> Lookup<CachedResponse> {
        let mut entries = write(&self.entries, SOURCE, "response.get");
        let hit = match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                Lookup::Hit(entry.response.clone())
            }
            Some(_) => {
                entries.pop(key);
                Lookup::Expired
            }
            None => Lookup::Miss,
        };

        if matches!(hit, Lookup::Hit(_)) {
            counter!("safecircle_cache_response_hit_total").increment(1);
        } else {
            counter!("safecircle_cache_response_miss_total").increment(1);
        }
        hit
    }

    /// Store a response. Returns the key evicted to make room, if any.
    pub fn set(&self, key: ResponseKey, response: CachedResponse) -> Option<ResponseKey> {
        let entry = ResponseEntry {
            response,
            expires_at: Instant::now() + self.ttl,
        };
        let mut entries = write(&self.entries, SOURCE, "response.set");
        let evicted = entries
            .push(key.clone(), entry)
            .map(|(old_key, _)| old_key)
            .filter(|old_key| *old_key != key);
        if evicted.is_some() {
            counter!("safecircle_cache_response_evict_total").increment(1);
        }
        evicted
    }

    pub fn invalidate(&self, key: &ResponseKey) -> bool {
        write(&self.entries, SOURCE, "response.invalidate")
            .pop(key)
            .is_some()
    }

    /// Drop every cached variant of `path`, whatever its query. Returns the removed keys.
    pub fn invalidate_path(&self, path: &str) -> Vec<ResponseKey> {
        let mut entries = write(&self.entries, SOURCE, "response.invalidate_path");
        let matching: Vec<ResponseKey> = entries
            .iter()
            .filter(|(key, _)| key.path == path)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &matching {
            entries.pop(key);
        }
        matching
    }

    pub fn clear(&self) {
        write(&self.entries, SOURCE, "response.clear").clear();
    }

    pub fn len(&self) -> usize {
        write(&self.entries, SOURCE, "response.len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Locale;

    fn config() -> CacheConfig {
        CacheConfig {
            data_entry_limit: 2,
            response_entry_limit: 2,
            ..Default::default()
        }
    }

    #[test]
    fn data_store_round_trips_typed_values() {
        let store = DataStore::new(&config());
        let key = DataKey::archive("news", Locale::En);
        store.set(key.clone(), vec!["hello-world".to_string()], Duration::from_secs(60));

        let hit: Option<Vec<String>> = store.get(&key).hit();
        assert_eq!(hit, Some(vec!["hello-world".to_string()]));

        assert_eq!(store.get::<u64>(&key), Lookup::Miss);
    }

    #[test]
    fn expired_entries_miss() {
        let store = DataStore::new(&config());
        let key = DataKey::star_count();
        store.set(key.clone(), 42_u64, Duration::ZERO);
        assert_eq!(store.get::<u64>(&key), Lookup::Expired);
        assert!(store.is_empty());
        assert_eq!(store.get::<u64>(&key), Lookup::Miss);
    }

    #[test]
    fn data_store_reports_evictions() {
        let store = DataStore::new(&config());
        let ttl = Duration::from_secs(60);
        assert!(store.set(DataKey::partners(), 1_u8, ttl).is_none());
        assert!(store.set(DataKey::partner_filters(), 2_u8, ttl).is_none());
        let evicted = store.set(DataKey::star_count(), 3_u8, ttl);
        assert_eq!(evicted, Some(DataKey::partners()));
    }

    #[test]
    fn invalidate_path_drops_every_query_variant() {
        let store = ResponseStore::new(&CacheConfig::default());
        let response = CachedResponse {
            status: 200,
            headers: Vec::new(),
            body: Bytes::from_static(b"ok"),
        };
        store.set(ResponseKey::new("/en/partners", ""), response.clone());
        store.set(ResponseKey::new("/en/partners", "region=eu"), response.clone());
        store.set(ResponseKey::new("/en/posts/news", ""), response);

        let removed = store.invalidate_path("/en/partners");
        assert_eq!(removed.len(), 2);
        assert_eq!(store.len(), 1);
    }
}
