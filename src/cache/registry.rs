//! Bidirectional tag registry.
//!
//! Maps each invalidation tag to the cache entries that read tagged data, and
//! each entry back to its tags so evictions leave no dangling references.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use super::keys::{CacheKey, CacheTag};
use super::lock::{read, write};

const SOURCE: &str = "cache::registry";

#[derive(Default)]
struct Mappings {
    tag_to_keys: HashMap<CacheTag, HashSet<CacheKey>>,
    key_to_tags: HashMap<CacheKey, HashSet<CacheTag>>,
}

#[derive(Default)]
pub struct TagRegistry {
    mappings: RwLock<Mappings>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `tags` to `key`, merging with any tags already registered.
    pub fn register(&self, key: CacheKey, tags: HashSet<CacheTag>) {
        if tags.is_empty() {
            return;
        }
        let mut mappings = write(&self.mappings, SOURCE, "register");
        for tag in &tags {
            mappings
                .tag_to_keys
                .entry(tag.clone())
                .or_default()
                .insert(key.clone());
        }
        mappings.key_to_tags.entry(key).or_default().extend(tags);
    }

    pub fn keys_for_tag(&self, tag: &CacheTag) -> HashSet<CacheKey> {
        read(&self.mappings, SOURCE, "keys_for_tag")
            .tag_to_keys
            .get(tag)
            .cloned()
            .unwrap_or_default()
    }

    pub fn tags_for_key(&self, key: &CacheKey) -> HashSet<CacheTag> {
        read(&self.mappings, SOURCE, "tags_for_key")
            .key_to_tags
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// Remove a tag and every entry registered under it.
    ///
    /// Returns the affected keys; the caller drops them from their stores.
    pub fn take_tag(&self, tag: &CacheTag) -> HashSet<CacheKey> {
        let mut mappings = write(&self.mappings, SOURCE, "take_tag");
        let keys = mappings.tag_to_keys.remove(tag).unwrap_or_default();
        for key in &keys {
            detach_key(&mut mappings, key);
        }
        keys
    }

    /// Forget an evicted or invalidated entry.
    pub fn unregister(&self, key: &CacheKey) {
        let mut mappings = write(&self.mappings, SOURCE, "unregister");
        detach_key(&mut mappings, key);
    }

    pub fn clear(&self) {
        let mut mappings = write(&self.mappings, SOURCE, "clear");
        mappings.tag_to_keys.clear();
        mappings.key_to_tags.clear();
    }

    pub fn tag_count(&self) -> usize {
        read(&self.mappings, SOURCE, "tag_count").tag_to_keys.len()
    }

    pub fn key_count(&self) -> usize {
        read(&self.mappings, SOURCE, "key_count").key_to_tags.len()
    }
}

fn detach_key(mappings: &mut Mappings, key: &CacheKey) {
    let Some(tags) = mappings.key_to_tags.remove(key) else {
        return;
    };
    for tag in tags {
        if let Some(keys) = mappings.tag_to_keys.get_mut(&tag) {
            keys.remove(key);
            if keys.is_empty() {
                mappings.tag_to_keys.remove(&tag);
            }
        }
    }
}
