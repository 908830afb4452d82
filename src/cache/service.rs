//! Tag-scoped cache facade.
//!
//! Content services memoize queries through [`SiteCache::get_or_load`]; the
//! response middleware stores rendered pages through [`SiteCache::store_response`];
//! revalidators drop entries through [`SiteCache::invalidate_tag`] and
//! [`SiteCache::invalidate_path`].

use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use metrics::counter;
use tracing::debug;

use super::config::CacheConfig;
use super::deps;
use super::keys::{CacheKey, CacheTag, DataKey, ResponseKey};
use super::registry::TagRegistry;
use super::store::{CachedResponse, DataStore, Lookup, ResponseStore};
use crate::domain::types::Visibility;

pub struct SiteCache {
    config: CacheConfig,
    data: DataStore,
    responses: ResponseStore,
    registry: TagRegistry,
    /// Bumped by every invalidation; loads that straddle one are not stored.
    generation: AtomicU64,
}

impl SiteCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            data: DataStore::new(&config),
            responses: ResponseStore::new(&config),
            registry: TagRegistry::new(),
            generation: AtomicU64::new(0),
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Memoized read using the configured data TTL.
    pub async fn get_or_load<T, E, F, Fut>(
        &self,
        visibility: Visibility,
        key: DataKey,
        tags: Vec<CacheTag>,
        load: F,
    ) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let ttl = self.data.default_ttl();
        self.get_or_load_with_ttl(visibility, key, tags, ttl, load)
            .await
    }

    /// Memoized read with an explicit TTL. Draft reads always go to the loader.
    pub async fn get_or_load_with_ttl<T, E, F, Fut>(
        &self,
        visibility: Visibility,
        key: DataKey,
        tags: Vec<CacheTag>,
        ttl: Duration,
        load: F,
    ) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.get_or_load_tagged(visibility, key, ttl, || async move {
            load().await.map(|value| (value, tags))
        })
        .await
    }

    /// Memoized read whose tags depend on the loaded value.
    ///
    /// Hits record the tags registered when the value was stored.
    pub async fn get_or_load_tagged<T, E, F, Fut>(
        &self,
        visibility: Visibility,
        key: DataKey,
        ttl: Duration,
        load: F,
    ) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(T, Vec<CacheTag>), E>>,
    {
        if visibility.is_draft() || !self.config.enable_data_cache {
            return load().await.map(|(value, _)| value);
        }

        match self.data.get::<T>(&key) {
            Lookup::Hit(value) => {
                debug!(target: "safecircle::cache", key = %key, outcome = "hit", "data cache");
                deps::record_all(self.registry.tags_for_key(&CacheKey::Data(key)));
                return Ok(value);
            }
            Lookup::Expired => self.registry.unregister(&CacheKey::Data(key.clone())),
            Lookup::Miss => {}
        }

        let generation = self.generation.load(Ordering::Acquire);
        let (value, tags) = load().await?;
        deps::record_all(tags.iter().cloned());

        if self.generation.load(Ordering::Acquire) == generation {
            if let Some(evicted) = self.data.set(key.clone(), value.clone(), ttl) {
                self.registry.unregister(&CacheKey::Data(evicted));
            }
            self.registry
                .register(CacheKey::Data(key), tags.into_iter().collect());
        } else {
            debug!(target: "safecircle::cache", key = %key, "skipped store after concurrent invalidation");
        }

        Ok(value)
    }

    pub fn lookup_response(&self, key: &ResponseKey) -> Option<CachedResponse> {
        if !self.config.enable_response_cache {
            return None;
        }
        match self.responses.get(key) {
            Lookup::Hit(response) => Some(response),
            Lookup::Expired => {
                self.registry.unregister(&CacheKey::Response(key.clone()));
                None
            }
            Lookup::Miss => None,
        }
    }

    /// Store a rendered response under the tags its handler read.
    pub fn store_response(
        &self,
        key: ResponseKey,
        response: CachedResponse,
        tags: HashSet<CacheTag>,
        generation: u64,
    ) {
        if !self.config.enable_response_cache {
            return;
        }
        if self.generation.load(Ordering::Acquire) != generation {
            return;
        }
        if let Some(evicted) = self.responses.set(key.clone(), response) {
            self.registry.unregister(&CacheKey::Response(evicted));
        }
        self.registry.register(CacheKey::Response(key), tags);
    }

    /// Current invalidation generation, captured before rendering a response.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Drop every entry carrying `tag`. Returns how many entries were removed.
    pub fn invalidate_tag(&self, tag: &CacheTag) -> usize {
        self.generation.fetch_add(1, Ordering::AcqRel);
        let keys = self.registry.take_tag(tag);
        for key in &keys {
            match key {
                CacheKey::Data(data_key) => {
                    self.data.invalidate(data_key);
                }
                CacheKey::Response(response_key) => {
                    self.responses.invalidate(response_key);
                }
            }
        }
        counter!("safecircle_cache_invalidations_total", "scope" => "tag").increment(1);
        keys.len()
    }

    /// Drop every cached response for `path`. Returns how many entries were removed.
    pub fn invalidate_path(&self, path: &str) -> usize {
        self.generation.fetch_add(1, Ordering::AcqRel);
        let removed = self.responses.invalidate_path(path);
        for key in &removed {
            self.registry.unregister(&CacheKey::Response(key.clone()));
        }
        counter!("safecircle_cache_invalidations_total", "scope" => "path").increment(1);
        removed.len()
    }

    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.data.clear();
        self.responses.clear();
        self.registry.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::sync::atomic::AtomicUsize;

    use bytes::Bytes;

    use super::*;
    use crate::domain::types::Locale;

    fn response() -> CachedResponse {
        CachedResponse {
            status: 200,
            headers: Vec::new(),
            body: Bytes::from_static(b"<html></html>"),
        }
    }

    async fn load_archive(cache: &SiteCache, calls: &AtomicUsize) -> Vec<String> {
        let result: Result<_, Infallible> = cache
            .get_or_load(
                Visibility::Published,
                DataKey::archive("news", Locale::En),
                vec![CacheTag::archives(), CacheTag::category_archive("news", Locale::En)],
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec!["hello-world".to_string()])
                },
            )
            .await;
        result.unwrap_or_default()
    }

    #[tokio::test]
    async fn memoizes_until_tag_is_invalidated() {
        let cache = SiteCache::new(CacheConfig::default());
        let calls = AtomicUsize::new(0);

        load_archive(&cache, &calls).await;
        load_archive(&cache, &calls).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(cache.invalidate_tag(&CacheTag::category_archive("news", Locale::En)), 1);
        load_archive(&cache, &calls).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unrelated_tags_leave_entries_alone() {
        let cache = SiteCache::new(CacheConfig::default());
        let calls = AtomicUsize::new(0);

        load_archive(&cache, &calls).await;
        assert_eq!(cache.invalidate_tag(&CacheTag::category_archive("news", Locale::Es)), 0);
        load_archive(&cache, &calls).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn draft_reads_bypass_the_cache() {
        let cache = SiteCache::new(CacheConfig::default());
        let calls = AtomicUsize::new(0);
        for _ in 0..2 {
            let _: Result<u8, Infallible> = cache
                .get_or_load(
                    Visibility::IncludeDrafts,
                    DataKey::page("about", Locale::En),
                    vec![CacheTag::pages()],
                    || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(1)
                    },
                )
                .await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn load_errors_are_not_cached() {
        let cache = SiteCache::new(CacheConfig::default());
        let first: Result<u8, &str> = cache
            .get_or_load(Visibility::Published, DataKey::partners(), vec![], || async {
                Err("down")
            })
            .await;
        assert!(first.is_err());

        let second: Result<u8, &str> = cache
            .get_or_load(Visibility::Published, DataKey::partners(), vec![], || async { Ok(3) })
            .await;
        assert_eq!(second, Ok(3));
    }

    #[test]
    fn tag_invalidation_reaches_responses() {
        let cache = SiteCache::new(CacheConfig::default());
        let key = ResponseKey::new("/en/posts/news", "");
        let tags = [CacheTag::archives()].into_iter().collect();
        cache.store_response(key.clone(), response(), tags, cache.generation());
        assert!(cache.lookup_response(&key).is_some());

        cache.invalidate_tag(&CacheTag::archives());
        assert!(cache.lookup_response(&key).is_none());
    }

    #[test]
    fn path_invalidation_drops_responses() {
        let cache = SiteCache::new(CacheConfig::default());
        let key = ResponseKey::new("/en/posts/news/hello-world", "");
        cache.store_response(key.clone(), response(), HashSet::new(), cache.generation());

        assert_eq!(cache.invalidate_path("/en/posts/news/hello-world"), 1);
        assert!(cache.lookup_response(&key).is_none());
    }

    #[test]
    fn stale_generation_is_not_stored() {
        let cache = SiteCache::new(CacheConfig::default());
        let generation = cache.generation();
        cache.invalidate_path("/en");

        let key = ResponseKey::new("/en", "");
        cache.store_response(key.clone(), response(), HashSet::new(), generation);
        assert!(cache.lookup_response(&key).is_none());
    }

    #[tokio::test]
    async fn expired_entries_drop_their_tag_links() {
        let cache = SiteCache::new(CacheConfig::default());
        let key = DataKey::star_count();
        for tag in [CacheTag::partners(), CacheTag::star_count()] {
            let loaded: Result<u64, Infallible> = cache
                .get_or_load_with_ttl(
                    Visibility::Published,
                    key.clone(),
                    vec![tag],
                    Duration::ZERO,
                    || async { Ok(7) },
                )
                .await;
            assert_eq!(loaded, Ok(7));
        }

        let tags = cache.registry.tags_for_key(&CacheKey::Data(key.clone()));
        assert_eq!(tags, [CacheTag::star_count()].into_iter().collect());
        assert!(cache.registry.keys_for_tag(&CacheTag::partners()).is_empty());
    }

    #[test]
    fn expired_responses_drop_their_tag_links() {
        let config = CacheConfig {
            response_ttl_secs: 0,
            ..Default::default()
        };
        let cache = SiteCache::new(config);
        let key = ResponseKey::new("/en/partners", "");
        let tags = [CacheTag::partners()].into_iter().collect();
        cache.store_response(key.clone(), response(), tags, cache.generation());

        assert!(cache.lookup_response(&key).is_none());
        assert!(cache.registry.keys_for_tag(&CacheTag::partners()).is_empty());
    }
}
