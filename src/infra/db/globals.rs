use async_trait::async_trait;
use uuid::Uuid;

use crate::application::repos::{GlobalsRepo, RedirectsRepo, RepoError};
use crate::domain::entities::{GlobalRecord, RedirectRecord};
use crate::domain::types::{GlobalSlug, Locale};

use super::util::locale_pair;
use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct RedirectRow {
    id: Uuid,
    from_path: String,
    to_url: String,
    permanent: bool,
}

#[async_trait]
impl GlobalsRepo for PostgresRepositories {
    /// Globals fall back as whole documents: a locale either has its own copy or reads the default.
    async fn find_global(
        &self,
        slug: GlobalSlug,
        locale: Locale,
    ) -> Result<Option<GlobalRecord>, RepoError> {
        let (requested, fallback) = locale_pair(locale);
        let data: Option<serde_json::Value> = sqlx::query_scalar(
            "SELECT data FROM globals WHERE slug = $1 AND locale IN ($2, $3) \
             ORDER BY (locale = $2) DESC LIMIT 1",
        )
        .bind(slug.as_str())
        .bind(requested)
        .bind(fallback)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(data.map(|data| GlobalRecord { slug, locale, data }))
    }
}

#[async_trait]
impl RedirectsRepo for PostgresRepositories {
    async fn find_redirect(&self, from: &str) -> Result<Option<RedirectRecord>, RepoError> {
        let row = sqlx::query_as::<_, RedirectRow>(
            "SELECT id, from_path, to_url, permanent FROM redirects WHERE from_path = $1",
        )
        .bind(from)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(|row| RedirectRecord {
            id: row.id,
            from: row.from_path,
            to: row.to_url,
            permanent: row.permanent,
        }))
    }
}
