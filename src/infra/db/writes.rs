//! Write side used by the content mutation API.

use async_trait::async_trait;
use sqlx::types::Json;
use uuid::Uuid;

use crate::application::repos::{
    CaseStudyWrite, CategoryWrite, ContentWriteRepo, FormWrite, GlobalWrite, PageWrite,
    PartnerWrite, PostWrite, RedirectWrite, RepoError,
};
use crate::domain::entities::{Breadcrumb, PageRecord};
use crate::domain::snapshots::DocumentSnapshot;
use crate::domain::types::{Collection, Locale};

use super::pages::{CHILD_PAGES, PageBinds};
use super::util::{json_or_default, locale_pair};
use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct PageSnapshotRow {
    slug: String,
    breadcrumbs: Option<Json<Vec<Breadcrumb>>>,
}

#[derive(sqlx::FromRow)]
struct PostSnapshotRow {
    slug: String,
    category_id: Option<Uuid>,
}

impl PostgresRepositories {
    async fn localized_scalar(
        &self,
        sql: &str,
        id: Uuid,
        locale: Locale,
    ) -> Result<Option<String>, RepoError> {
        let (requested, fallback) = locale_pair(locale);
        sqlx::query_scalar::<_, String>(sql)
            .bind(id)
            .bind(requested)
            .bind(fallback)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    async fn scalar_by_id(&self, sql: &str, id: Uuid) -> Result<Option<String>, RepoError> {
        sqlx::query_scalar::<_, String>(sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl ContentWriteRepo for PostgresRepositories {
    async fn snapshot(
        &self,
        collection: Collection,
        id: Uuid,
        locale: Locale,
    ) -> Result<Option<DocumentSnapshot>, RepoError> {
        let snapshot = match collection {
            Collection::Pages => {
                let (requested, fallback) = locale_pair(locale);
                let row = sqlx::query_as::<_, PageSnapshotRow>(
                    "SELECT slug, breadcrumbs FROM page_translations \
                     WHERE page_id = $1 AND locale IN ($2, $3) \
                     ORDER BY (locale = $2) DESC LIMIT 1",
                )
                .bind(id)
                .bind(requested)
                .bind(fallback)
                .fetch_optional(self.pool())
                .await
                .map_err(map_sqlx_error)?;
                row.map(|row| {
                    let breadcrumbs = json_or_default(row.breadcrumbs);
                    DocumentSnapshot::Page {
                        id,
                        slug: row.slug,
                        url: breadcrumbs
                            .last()
                            .map(|crumb| crumb.url.clone())
                            .filter(|url| !url.is_empty()),
                    }
                })
            }
            Collection::Posts => {
                let (requested, fallback) = locale_pair(locale);
                let row = sqlx::query_as::<_, PostSnapshotRow>(
                    "SELECT t.slug, p.category_id FROM posts p \
                     JOIN post_translations t ON t.post_id = p.id \
                     WHERE p.id = $1 AND t.locale IN ($2, $3) \
                     ORDER BY (t.locale = $2) DESC LIMIT 1",
                )
                .bind(id)
                .bind(requested)
                .bind(fallback)
                .fetch_optional(self.pool())
                .await
                .map_err(map_sqlx_error)?;
                row.map(|row| DocumentSnapshot::Post {
                    id,
                    slug: row.slug,
                    category_id: row.category_id,
                })
            }
            Collection::Categories => self
                .localized_scalar(
                    "SELECT slug FROM category_translations \
                     WHERE category_id = $1 AND locale IN ($2, $3) \
                     ORDER BY (locale = $2) DESC LIMIT 1",
                    id,
                    locale,
                )
                .await?
                .map(|slug| DocumentSnapshot::Category { id, slug }),
            Collection::CaseStudies => self
                .localized_scalar(
                    "SELECT slug FROM case_study_translations \
                     WHERE case_study_id = $1 AND locale IN ($2, $3) \
                     ORDER BY (locale = $2) DESC LIMIT 1",
                    id,
                    locale,
                )
                .await?
                .map(|slug| DocumentSnapshot::CaseStudy { id, slug }),
            Collection::Forms => self
                .localized_scalar(
                    "SELECT title FROM form_translations \
                     WHERE form_id = $1 AND locale IN ($2, $3) \
                     ORDER BY (locale = $2) DESC LIMIT 1",
                    id,
                    locale,
                )
                .await?
                .map(|title| DocumentSnapshot::Form { id, title }),
            Collection::Partners => self
                .scalar_by_id("SELECT slug FROM partners WHERE id = $1", id)
                .await?
                .map(|slug| DocumentSnapshot::Partner { id, slug }),
            Collection::Redirects => self
                .scalar_by_id("SELECT from_path FROM redirects WHERE id = $1", id)
                .await?
                .map(|from| DocumentSnapshot::Redirect { id, from }),
            // Globals are addressed by slug, never by id.
            Collection::Globals => None,
        };
        Ok(snapshot)
    }

    async fn save_page(&self, page: &PageWrite) -> Result<(), RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        sqlx::query(
            "INSERT INTO pages (id, status, parent_id, noindex) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (id) DO UPDATE SET status = EXCLUDED.status, \
             parent_id = EXCLUDED.parent_id, noindex = EXCLUDED.noindex, updated_at = now()",
        )
        .bind(page.id)
        .bind(page.status)
        .bind(page.parent_id)
        .bind(page.noindex)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        sqlx::query(
            "INSERT INTO page_translations \
             (page_id, locale, title, slug, breadcrumbs, hero, layout, meta) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (page_id, locale) DO UPDATE SET title = EXCLUDED.title, \
             slug = EXCLUDED.slug, breadcrumbs = EXCLUDED.breadcrumbs, hero = EXCLUDED.hero, \
             layout = EXCLUDED.layout, meta = EXCLUDED.meta",
        )
        .bind(page.id)
        .bind(page.locale.as_str())
        .bind(&page.title)
        .bind(&page.slug)
        .bind(Json(&page.breadcrumbs))
        .bind(page.hero.as_ref().map(Json))
        .bind(Json(&page.layout))
        .bind(Json(&page.meta))
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn save_post(&self, post: &PostWrite) -> Result<(), RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        sqlx::query(
            "INSERT INTO posts \
             (id, status, category_id, published_on, featured_media, image, video_url, authors) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (id) DO UPDATE SET status = EXCLUDED.status, \
             category_id = EXCLUDED.category_id, published_on = EXCLUDED.published_on, \
             featured_media = EXCLUDED.featured_media, image = EXCLUDED.image, \
             video_url = EXCLUDED.video_url, authors = EXCLUDED.authors, updated_at = now()",
        )
        .bind(post.id)
        .bind(post.status)
        .bind(post.category_id)
        .bind(post.published_on)
        .bind(post.featured_media)
        .bind(post.image.as_ref().map(Json))
        .bind(post.video_url.as_deref())
        .bind(Json(&post.authors))
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        sqlx::query(
            "INSERT INTO post_translations (post_id, locale, title, slug, excerpt, content, meta) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (post_id, locale) DO UPDATE SET title = EXCLUDED.title, \
             slug = EXCLUDED.slug, excerpt = EXCLUDED.excerpt, content = EXCLUDED.content, \
             meta = EXCLUDED.meta",
        )
        .bind(post.id)
        .bind(post.locale.as_str())
        .bind(&post.title)
        .bind(&post.slug)
        .bind(post.excerpt.as_deref())
        .bind(Json(&post.content))
        .bind(Json(&post.meta))
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn save_category(&self, category: &CategoryWrite) -> Result<(), RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        sqlx::query("INSERT INTO categories (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
            .bind(category.id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        sqlx::query(
            "INSERT INTO category_translations \
             (category_id, locale, name, slug, headline, description) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (category_id, locale) DO UPDATE SET name = EXCLUDED.name, \
             slug = EXCLUDED.slug, headline = EXCLUDED.headline, \
             description = EXCLUDED.description",
        )
        .bind(category.id)
        .bind(category.locale.as_str())
        .bind(&category.name)
        .bind(&category.slug)
        .bind(category.headline.as_deref())
        .bind(category.description.as_deref())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn save_case_study(&self, case_study: &CaseStudyWrite) -> Result<(), RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        sqlx::query(
            "INSERT INTO case_studies (id, status, partner_id) VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO UPDATE SET status = EXCLUDED.status, \
             partner_id = EXCLUDED.partner_id, updated_at = now()",
        )
        .bind(case_study.id)
        .bind(case_study.status)
        .bind(case_study.partner_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        sqlx::query(
            "INSERT INTO case_study_translations \
             (case_study_id, locale, title, slug, layout, meta) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (case_study_id, locale) DO UPDATE SET title = EXCLUDED.title, \
             slug = EXCLUDED.slug, layout = EXCLUDED.layout, meta = EXCLUDED.meta",
        )
        .bind(case_study.id)
        .bind(case_study.locale.as_str())
        .bind(&case_study.title)
        .bind(&case_study.slug)
        .bind(Json(&case_study.layout))
        .bind(Json(&case_study.meta))
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn save_partner(&self, partner: &PartnerWrite) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO partners (id, status, agency_status, name, slug, website, summary, \
             logo, featured, industries, specialties, regions, budgets) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             ON CONFLICT (id) DO UPDATE SET status = EXCLUDED.status, \
             agency_status = EXCLUDED.agency_status, name = EXCLUDED.name, \
             slug = EXCLUDED.slug, website = EXCLUDED.website, summary = EXCLUDED.summary, \
             logo = EXCLUDED.logo, featured = EXCLUDED.featured, \
             industries = EXCLUDED.industries, specialties = EXCLUDED.specialties, \
             regions = EXCLUDED.regions, budgets = EXCLUDED.budgets, updated_at = now()",
        )
        .bind(partner.id)
        .bind(partner.status)
        .bind(partner.agency_status)
        .bind(&partner.name)
        .bind(&partner.slug)
        .bind(partner.website.as_deref())
        .bind(&partner.summary)
        .bind(partner.logo.as_ref().map(Json))
        .bind(partner.featured)
        .bind(&partner.industries)
        .bind(&partner.specialties)
        .bind(&partner.regions)
        .bind(&partner.budgets)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn save_form(&self, form: &FormWrite) -> Result<(), RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        sqlx::query(
            "INSERT INTO forms (id, require_turnstile) VALUES ($1, $2) \
             ON CONFLICT (id) DO UPDATE SET require_turnstile = EXCLUDED.require_turnstile",
        )
        .bind(form.id)
        .bind(form.require_turnstile)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        sqlx::query(
            "INSERT INTO form_translations (form_id, locale, title, fields, confirmation_message) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (form_id, locale) DO UPDATE SET title = EXCLUDED.title, \
             fields = EXCLUDED.fields, confirmation_message = EXCLUDED.confirmation_message",
        )
        .bind(form.id)
        .bind(form.locale.as_str())
        .bind(&form.title)
        .bind(Json(&form.fields))
        .bind(form.confirmation_message.as_deref())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn save_redirect(&self, redirect: &RedirectWrite) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO redirects (id, from_path, to_url, permanent) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (id) DO UPDATE SET from_path = EXCLUDED.from_path, \
             to_url = EXCLUDED.to_url, permanent = EXCLUDED.permanent",
        )
        .bind(redirect.id)
        .bind(&redirect.from)
        .bind(&redirect.to)
        .bind(redirect.permanent)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn save_global(&self, global: &GlobalWrite) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO globals (slug, locale, data) VALUES ($1, $2, $3) \
             ON CONFLICT (slug, locale) DO UPDATE SET data = EXCLUDED.data, updated_at = now()",
        )
        .bind(global.slug.as_str())
        .bind(global.locale.as_str())
        .bind(&global.data)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn delete_document(&self, collection: Collection, id: Uuid) -> Result<bool, RepoError> {
        let sql = match collection {
            Collection::Pages => "DELETE FROM pages WHERE id = $1",
            Collection::Posts => "DELETE FROM posts WHERE id = $1",
            Collection::Categories => "DELETE FROM categories WHERE id = $1",
            Collection::CaseStudies => "DELETE FROM case_studies WHERE id = $1",
            Collection::Partners => "DELETE FROM partners WHERE id = $1",
            Collection::Forms => "DELETE FROM forms WHERE id = $1",
            Collection::Redirects => "DELETE FROM redirects WHERE id = $1",
            Collection::Globals => return Ok(false),
        };
        let result = sqlx::query(sql)
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_child_pages(
        &self,
        parent_id: Uuid,
        locale: Locale,
    ) -> Result<Vec<PageRecord>, RepoError> {
        self.fetch_pages(locale, CHILD_PAGES, PageBinds::Id(parent_id))
            .await
    }

    async fn update_breadcrumbs(
        &self,
        page_id: Uuid,
        locale: Locale,
        breadcrumbs: &[Breadcrumb],
    ) -> Result<(), RepoError> {
        let updated = sqlx::query(
            "UPDATE page_translations SET breadcrumbs = $3 WHERE page_id = $1 AND locale = $2",
        )
        .bind(page_id)
        .bind(locale.as_str())
        .bind(Json(breadcrumbs))
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        if updated.rows_affected() > 0 {
            return Ok(());
        }

        // The page had no translation in this locale; give it one seeded from the default.
        sqlx::query(
            "INSERT INTO page_translations \
             (page_id, locale, title, slug, breadcrumbs, hero, layout, meta) \
             SELECT page_id, $2, title, slug, $3, hero, layout, meta \
             FROM page_translations WHERE page_id = $1 AND locale = $4",
        )
        .bind(page_id)
        .bind(locale.as_str())
        .bind(Json(breadcrumbs))
        .bind(Locale::DEFAULT.as_str())
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }
}
