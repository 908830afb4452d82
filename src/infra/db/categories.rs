use async_trait::async_trait;
use uuid::Uuid;

use crate::application::repos::{CategoriesRepo, RepoError};
use crate::domain::entities::CategoryRecord;
use crate::domain::types::Locale;

use super::util::locale_pair;
use super::{PostgresRepositories, map_sqlx_error};

macro_rules! category_select {
    () => {
        "SELECT c.id, \
        COALESCE(t.name, d.name) AS name, \
        COALESCE(t.slug, d.slug) AS slug, \
        COALESCE(t.headline, d.headline) AS headline, \
        COALESCE(t.description, d.description) AS description \
        FROM categories c \
        LEFT JOIN category_translations t ON t.category_id = c.id AND t.locale = $1 \
        LEFT JOIN category_translations d ON d.category_id = c.id AND d.locale = $2 \
        WHERE (t.category_id IS NOT NULL OR d.category_id IS NOT NULL) "
    };
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
    slug: String,
    headline: Option<String>,
    description: Option<String>,
}

impl CategoryRow {
    fn into_record(self, locale: Locale) -> CategoryRecord {
        CategoryRecord {
            id: self.id,
            locale,
            name: self.name,
            slug: self.slug,
            headline: self.headline,
            description: self.description,
        }
    }
}

#[async_trait]
impl CategoriesRepo for PostgresRepositories {
    async fn find_category_by_slug(
        &self,
        slug: &str,
        locale: Locale,
    ) -> Result<Option<CategoryRecord>, RepoError> {
        let (requested, fallback) = locale_pair(locale);
        let row = sqlx::query_as::<_, CategoryRow>(concat!(
            category_select!(),
            "AND COALESCE(t.slug, d.slug) = $3 LIMIT 1"
        ))
        .bind(requested)
        .bind(fallback)
        .bind(slug)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.map(|row| row.into_record(locale)))
    }

    async fn find_category_by_id(
        &self,
        id: Uuid,
        locale: Locale,
    ) -> Result<Option<CategoryRecord>, RepoError> {
        let (requested, fallback) = locale_pair(locale);
        let row = sqlx::query_as::<_, CategoryRow>(concat!(
            category_select!(),
            "AND c.id = $3"
        ))
        .bind(requested)
        .bind(fallback)
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.map(|row| row.into_record(locale)))
    }

    async fn list_categories(
        &self,
        locale: Locale,
        exclude_slug: Option<&str>,
    ) -> Result<Vec<CategoryRecord>, RepoError> {
        let (requested, fallback) = locale_pair(locale);
        let rows = sqlx::query_as::<_, CategoryRow>(concat!(
            category_select!(),
            "AND ($3::text IS NULL OR COALESCE(t.slug, d.slug) <> $3) \
             ORDER BY COALESCE(t.name, d.name)"
        ))
        .bind(requested)
        .bind(fallback)
        .bind(exclude_slug)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(|row| row.into_record(locale)).collect())
    }
}
