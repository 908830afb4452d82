use async_trait::async_trait;
use sqlx::types::Json;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{PostsRepo, RepoError};
use crate::domain::blocks::{Block, MediaRef};
use crate::domain::entities::{Author, CategoryRecord, PostRecord, SeoMeta};
use crate::domain::types::{DocumentStatus, FeaturedMedia, Locale, Visibility};

use super::util::{include_drafts, json_or_default, locale_pair};
use super::{PostgresRepositories, map_sqlx_error};

/// Posts and their category, both coalesced over `$1` and `$2`.
macro_rules! post_select {
    () => {
        "SELECT p.id, p.status, p.published_on, p.featured_media, \
        p.image, p.video_url, p.authors, p.updated_at, \
        COALESCE(t.title, d.title) AS title, \
        COALESCE(t.slug, d.slug) AS slug, \
        COALESCE(t.excerpt, d.excerpt) AS excerpt, \
        COALESCE(t.content, d.content) AS content, \
        COALESCE(t.meta, d.meta) AS meta, \
        c.id AS category_id, \
        COALESCE(ct.name, cd.name) AS category_name, \
        COALESCE(ct.slug, cd.slug) AS category_slug, \
        COALESCE(ct.headline, cd.headline) AS category_headline, \
        COALESCE(ct.description, cd.description) AS category_description \
        FROM posts p \
        LEFT JOIN post_translations t ON t.post_id = p.id AND t.locale = $1 \
        LEFT JOIN post_translations d ON d.post_id = p.id AND d.locale = $2 \
        LEFT JOIN categories c ON c.id = p.category_id \
        LEFT JOIN category_translations ct ON ct.category_id = c.id AND ct.locale = $1 \
        LEFT JOIN category_translations cd ON cd.category_id = c.id AND cd.locale = $2 \
        WHERE (t.post_id IS NOT NULL OR d.post_id IS NOT NULL) "
    };
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    status: DocumentStatus,
    published_on: Option<OffsetDateTime>,
    featured_media: FeaturedMedia,
    image: Option<Json<MediaRef>>,
    video_url: Option<String>,
    authors: Option<Json<Vec<Author>>>,
    updated_at: OffsetDateTime,
    title: String,
    slug: String,
    excerpt: Option<String>,
    content: Option<Json<Vec<Block>>>,
    meta: Option<Json<SeoMeta>>,
    category_id: Option<Uuid>,
    category_name: Option<String>,
    category_slug: Option<String>,
    category_headline: Option<String>,
    category_description: Option<String>,
}

impl PostRow {
    fn into_record(self, locale: Locale) -> PostRecord {
        let category = match (self.category_id, self.category_name, self.category_slug) {
            (Some(id), Some(name), Some(slug)) => Some(CategoryRecord {
                id,
                locale,
                name,
                slug,
                headline: self.category_headline,
                description: self.category_description,
            }),
            _ => None,
        };

        PostRecord {
            id: self.id,
            locale,
            status: self.status,
            title: self.title,
            slug: self.slug,
            excerpt: self.excerpt,
            category,
            published_on: self.published_on,
            featured_media: self.featured_media,
            image: self.image.map(|Json(image)| image),
            video_url: self.video_url,
            authors: json_or_default(self.authors),
            content: json_or_default(self.content),
            meta: json_or_default(self.meta),
            updated_at: self.updated_at,
        }
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn find_post(
        &self,
        slug: &str,
        category_slug: &str,
        locale: Locale,
        visibility: Visibility,
    ) -> Result<Option<PostRecord>, RepoError> {
        let (requested, fallback) = locale_pair(locale);
        let row = sqlx::query_as::<_, PostRow>(concat!(
            post_select!(),
            "AND COALESCE(t.slug, d.slug) = $3 \
             AND COALESCE(ct.slug, cd.slug) = $4 \
             AND ($5 OR p.status = 'published'::document_status) \
             ORDER BY p.updated_at DESC LIMIT 1"
        ))
        .bind(requested)
        .bind(fallback)
        .bind(slug)
        .bind(category_slug)
        .bind(include_drafts(visibility))
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.map(|row| row.into_record(locale)))
    }

    async fn find_post_by_id(
        &self,
        id: Uuid,
        locale: Locale,
    ) -> Result<Option<PostRecord>, RepoError> {
        let (requested, fallback) = locale_pair(locale);
        let row = sqlx::query_as::<_, PostRow>(concat!(
            post_select!(),
            "AND p.id = $3"
        ))
        .bind(requested)
        .bind(fallback)
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.map(|row| row.into_record(locale)))
    }

    async fn list_published_posts(&self, locale: Locale) -> Result<Vec<PostRecord>, RepoError> {
        let (requested, fallback) = locale_pair(locale);
        let rows = sqlx::query_as::<_, PostRow>(concat!(
            post_select!(),
            "AND p.status = 'published'::document_status \
             ORDER BY p.published_on DESC NULLS LAST, p.id"
        ))
        .bind(requested)
        .bind(fallback)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(|row| row.into_record(locale)).collect())
    }

    async fn list_posts_published_before(
        &self,
        locale: Locale,
        category_id: Option<Uuid>,
        now: OffsetDateTime,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let (requested, fallback) = locale_pair(locale);
        let rows = sqlx::query_as::<_, PostRow>(concat!(
            post_select!(),
            "AND p.status = 'published'::document_status \
             AND p.published_on <= $3 \
             AND ($4::uuid IS NULL OR p.category_id = $4) \
             ORDER BY p.published_on DESC, p.id"
        ))
        .bind(requested)
        .bind(fallback)
        .bind(now)
        .bind(category_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(|row| row.into_record(locale)).collect())
    }
}
