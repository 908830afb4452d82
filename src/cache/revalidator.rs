//! Invalidation targets.
//!
//! The in-process cache is always a target; a downstream purge webhook can be
//! added as another [`Revalidator`].

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use super::keys::CacheTag;
use super::service::SiteCache;
use crate::domain::paths::localized_path;
use crate::domain::types::Locale;

#[derive(Debug, Error)]
pub enum RevalidateError {
    #[error("revalidation request failed: {0}")]
    Transport(String),
    #[error("revalidation endpoint answered with status {status}")]
    Rejected { status: u16 },
    #[error("revalidation request timed out")]
    Timeout,
}

#[async_trait]
pub trait Revalidator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn revalidate_path(&self, path: &str) -> Result<(), RevalidateError>;

    async fn revalidate_tag(&self, tag: &CacheTag) -> Result<(), RevalidateError>;
}

/// Every cached form of a site path: the bare path and one per locale prefix.
pub fn path_variants(path: &str) -> Vec<String> {
    let mut variants = Vec::with_capacity(Locale::ALL.len() + 1);
    variants.push(path.to_string());
    for locale in Locale::ALL {
        let localized = localized_path(locale, path);
        if !variants.contains(&localized) {
            variants.push(localized);
        }
    }
    variants
}

/// Drops entries from the in-process cache.
pub struct LocalRevalidator {
    cache: Arc<SiteCache>,
}

impl LocalRevalidator {
    pub fn new(cache: Arc<SiteCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl Revalidator for LocalRevalidator {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn revalidate_path(&self, path: &str) -> Result<(), RevalidateError> {
        let removed: usize = path_variants(path)
            .iter()
            .map(|variant| self.cache.invalidate_path(variant))
            .sum();
        debug!(target: "safecircle::cache::revalidator", path, removed, "path invalidated");
        Ok(())
    }

    async fn revalidate_tag(&self, tag: &CacheTag) -> Result<(), RevalidateError> {
        let removed = self.cache.invalidate_tag(tag);
        debug!(target: "safecircle::cache::revalidator", tag = %tag, removed, "tag invalidated");
        Ok(())
    }
}
