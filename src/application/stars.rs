use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::application::integrations::{IntegrationError, StarSource};
use crate::cache::{CacheTag, DataKey, SiteCache};
use crate::domain::types::Visibility;

/// How long a fetched star count is served before asking again.
pub const STAR_COUNT_TTL: Duration = Duration::from_secs(900);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StarCount {
    pub total_stars: u64,
}

#[derive(Clone)]
pub struct StarCountService {
    source: Arc<dyn StarSource>,
    cache: Arc<SiteCache>,
}

impl StarCountService {
    pub fn new(source: Arc<dyn StarSource>, cache: Arc<SiteCache>) -> Self {
        Self { source, cache }
    }

    pub async fn star_count(&self) -> Result<StarCount, IntegrationError> {
        self.cache
            .get_or_load_with_ttl(
                Visibility::Published,
                DataKey::star_count(),
                vec![CacheTag::star_count()],
                STAR_COUNT_TTL,
                || async {
                    let total_stars = self.source.star_count().await?;
                    Ok::<_, IntegrationError>(StarCount { total_stars })
                },
            )
            .await
    }
}
