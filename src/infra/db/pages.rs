use async_trait::async_trait;
use sqlx::types::Json;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{PagesRepo, RepoError};
use crate::domain::blocks::Block;
use crate::domain::entities::{Breadcrumb, Hero, PageRecord, SeoMeta};
use crate::domain::types::{DocumentStatus, Locale, Visibility};

use super::util::{include_drafts, json_or_default, locale_pair};
use super::{PostgresRepositories, map_sqlx_error};

/// Pages coalesced over `$1` (requested locale) and `$2` (default locale).
macro_rules! page_select {
    () => {
        "SELECT p.id, p.status, p.parent_id, p.noindex, p.updated_at, \
        COALESCE(t.title, d.title) AS title, \
        COALESCE(t.slug, d.slug) AS slug, \
        COALESCE(t.breadcrumbs, d.breadcrumbs) AS breadcrumbs, \
        COALESCE(t.hero, d.hero) AS hero, \
        COALESCE(t.layout, d.layout) AS layout, \
        COALESCE(t.meta, d.meta) AS meta \
        FROM pages p \
        LEFT JOIN page_translations t ON t.page_id = p.id AND t.locale = $1 \
        LEFT JOIN page_translations d ON d.page_id = p.id AND d.locale = $2 \
        WHERE (t.page_id IS NOT NULL OR d.page_id IS NOT NULL) "
    };
}

const PAGES_BY_SLUG: &str = concat!(
    page_select!(),
    "AND COALESCE(t.slug, d.slug) = $3 \
     AND ($4 OR p.status = 'published'::document_status) \
     ORDER BY p.updated_at DESC"
);

const PAGE_BY_ID: &str = concat!(page_select!(), "AND p.id = $3");

const PUBLISHED_PAGES: &str = concat!(
    page_select!(),
    "AND p.status = 'published'::document_status \
     AND ($3::text IS NULL OR COALESCE(t.slug, d.slug) <> $3) \
     ORDER BY COALESCE(t.slug, d.slug) \
     LIMIT $4"
);

pub(super) const CHILD_PAGES: &str = concat!(
    page_select!(),
    "AND p.parent_id = $3 ORDER BY COALESCE(t.slug, d.slug)"
);

#[derive(sqlx::FromRow)]
pub(super) struct PageRow {
    id: Uuid,
    status: DocumentStatus,
    parent_id: Option<Uuid>,
    noindex: bool,
    updated_at: OffsetDateTime,
    title: String,
    slug: String,
    breadcrumbs: Option<Json<Vec<Breadcrumb>>>,
    hero: Option<Json<Hero>>,
    layout: Option<Json<Vec<Block>>>,
    meta: Option<Json<SeoMeta>>,
}

impl PageRow {
    pub(super) fn into_record(self, locale: Locale) -> PageRecord {
        PageRecord {
            id: self.id,
            locale,
            status: self.status,
            parent_id: self.parent_id,
            title: self.title,
            slug: self.slug,
            breadcrumbs: json_or_default(self.breadcrumbs),
            hero: self.hero.map(|Json(hero)| hero),
            layout: json_or_default(self.layout),
            meta: json_or_default(self.meta),
            noindex: self.noindex,
            updated_at: self.updated_at,
        }
    }
}

impl PostgresRepositories {
    /// Runs one of the page queries above; `sql` is always a fixed statement.
    pub(super) async fn fetch_pages(
        &self,
        locale: Locale,
        sql: &'static str,
        binds: PageBinds<'_>,
    ) -> Result<Vec<PageRecord>, RepoError> {
        let (requested, fallback) = locale_pair(locale);
        let mut query = sqlx::query_as::<_, PageRow>(sql)
            .bind(requested)
            .bind(fallback);
        query = match binds {
            PageBinds::Id(id) => query.bind(id),
            PageBinds::Slug(slug, drafts) => query.bind(slug).bind(drafts),
            PageBinds::Listing(exclude, limit) => query.bind(exclude).bind(limit),
        };

        let rows = query.fetch_all(self.pool()).await.map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(|row| row.into_record(locale)).collect())
    }
}

/// Parameters bound after the locale pair, in `$3`, `$4` order.
pub(super) enum PageBinds<'a> {
    Id(Uuid),
    Slug(&'a str, bool),
    Listing(Option<&'a str>, i64),
}

#[async_trait]
impl PagesRepo for PostgresRepositories {
    async fn find_pages_by_slug(
        &self,
        slug: &str,
        locale: Locale,
        visibility: Visibility,
    ) -> Result<Vec<PageRecord>, RepoError> {
        self.fetch_pages(
            locale,
            PAGES_BY_SLUG,
            PageBinds::Slug(slug, include_drafts(visibility)),
        )
        .await
    }

    async fn find_page_by_id(
        &self,
        id: Uuid,
        locale: Locale,
    ) -> Result<Option<PageRecord>, RepoError> {
        let mut pages = self
            .fetch_pages(locale, PAGE_BY_ID, PageBinds::Id(id))
            .await?;
        Ok(pages.pop())
    }

    async fn list_published_pages(
        &self,
        locale: Locale,
        exclude_slug: Option<&str>,
        limit: u32,
    ) -> Result<Vec<PageRecord>, RepoError> {
        self.fetch_pages(
            locale,
            PUBLISHED_PAGES,
            PageBinds::Listing(exclude_slug, i64::from(limit)),
        )
        .await
    }
}
