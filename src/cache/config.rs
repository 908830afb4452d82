//! Cache configuration.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_DATA_ENTRY_LIMIT: usize = 2_000;
const DEFAULT_RESPONSE_ENTRY_LIMIT: usize = 500;
const DEFAULT_DATA_TTL_SECS: u64 = 3_600;
const DEFAULT_RESPONSE_TTL_SECS: u64 = 3_600;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Memoize content queries.
    pub enable_data_cache: bool,
    /// Cache rendered public responses.
    pub enable_response_cache: bool,
    pub data_entry_limit: usize,
    pub response_entry_limit: usize,
    /// Upper bound on staleness when an invalidation is lost.
    pub data_ttl_secs: u64,
    pub response_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enable_data_cache: true,
            enable_response_cache: true,
            data_entry_limit: DEFAULT_DATA_ENTRY_LIMIT,
            response_entry_limit: DEFAULT_RESPONSE_ENTRY_LIMIT,
            data_ttl_secs: DEFAULT_DATA_TTL_SECS,
            response_ttl_secs: DEFAULT_RESPONSE_TTL_SECS,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enable_data_cache: settings.enable_data_cache,
            enable_response_cache: settings.enable_response_cache,
            data_entry_limit: settings.data_entry_limit.get(),
            response_entry_limit: settings.response_entry_limit.get(),
            data_ttl_secs: settings.data_ttl.as_secs(),
            response_ttl_secs: settings.response_ttl.as_secs(),
        }
    }
}

impl CacheConfig {
    pub fn data_entry_limit(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.data_entry_limit).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn response_entry_limit(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.response_entry_limit).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn data_ttl(&self) -> Duration {
        Duration::from_secs(self.data_ttl_secs)
    }

    pub fn response_ttl(&self) -> Duration {
        Duration::from_secs(self.response_ttl_secs)
    }
}
