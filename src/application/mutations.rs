//! Content write path.
//!
//! Each upsert or delete persists the document, then runs the revalidation
//! hooks in the same request. Hooks never fail a mutation.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::application::error::AppError;
use crate::application::repos::{
    CaseStudyWrite, CategoryWrite, ContentRepos, FormWrite, GlobalWrite, PageWrite, PartnerWrite,
    PostWrite, RedirectWrite,
};
use crate::application::revalidation::{RevalidationHooks, RevalidationReport};
use crate::cache::{ContentEvent, MutationKind};
use crate::domain::blocks::{Block, MediaRef};
use crate::domain::entities::{Author, Breadcrumb, FormField, Hero, PageRecord, SeoMeta};
use crate::domain::error::DomainError;
use crate::domain::paths::{join_path, normalize_slug, post_path};
use crate::domain::snapshots::DocumentSnapshot;
use crate::domain::types::{
    AgencyStatus, Collection, DocumentStatus, FeaturedMedia, GlobalSlug, Locale, Visibility,
};

const TARGET: &str = "safecircle::application::mutations";

/// Parent chains deeper than this are treated as cycles.
const MAX_PAGE_DEPTH: usize = 32;

fn default_status() -> DocumentStatus {
    DocumentStatus::Draft
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub locale: Option<Locale>,
    #[serde(default = "default_status", rename = "_status", alias = "status")]
    pub status: DocumentStatus,
    #[serde(default)]
    pub parent: Option<Uuid>,
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub hero: Option<Hero>,
    #[serde(default)]
    pub layout: Vec<Block>,
    #[serde(default)]
    pub meta: SeoMeta,
    #[serde(default)]
    pub noindex: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub locale: Option<Locale>,
    #[serde(default = "default_status", rename = "_status", alias = "status")]
    pub status: DocumentStatus,
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub category: Option<Uuid>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub published_on: Option<OffsetDateTime>,
    #[serde(default = "default_featured_media")]
    pub featured_media: FeaturedMedia,
    #[serde(default)]
    pub image: Option<MediaRef>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default)]
    pub content: Vec<Block>,
    #[serde(default)]
    pub meta: SeoMeta,
}

fn default_featured_media() -> FeaturedMedia {
    FeaturedMedia::Upload
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub locale: Option<Locale>,
    #[serde(alias = "title")]
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseStudyInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub locale: Option<Locale>,
    #[serde(default = "default_status", rename = "_status", alias = "status")]
    pub status: DocumentStatus,
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub partner: Option<Uuid>,
    #[serde(default)]
    pub layout: Vec<Block>,
    #[serde(default)]
    pub meta: SeoMeta,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default = "default_status", rename = "_status", alias = "status")]
    pub status: DocumentStatus,
    #[serde(default = "default_agency_status")]
    pub agency_status: AgencyStatus,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub logo: Option<MediaRef>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub industries: Vec<String>,
    #[serde(default)]
    pub specialties: Vec<String>,
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default)]
    pub budgets: Vec<String>,
}

fn default_agency_status() -> AgencyStatus {
    AgencyStatus::Active
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub locale: Option<Locale>,
    pub title: String,
    #[serde(default)]
    pub fields: Vec<FormField>,
    #[serde(default)]
    pub require_turnstile: bool,
    #[serde(default)]
    pub confirmation_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub permanent: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalInput {
    pub slug: GlobalSlug,
    #[serde(default)]
    pub locale: Option<Locale>,
    pub data: serde_json::Value,
}

/// Result of one mutation with the hooks it triggered.
#[derive(Debug, Clone)]
pub struct MutationOutcome {
    pub id: String,
    pub operation: MutationKind,
    pub revalidations: Vec<RevalidationReport>,
}

impl MutationOutcome {
    pub fn failed_invalidations(&self) -> usize {
        self.revalidations.iter().map(|report| report.failed).sum()
    }
}

#[derive(Clone)]
pub struct ContentMutationService {
    repos: ContentRepos,
    hooks: RevalidationHooks,
}

impl ContentMutationService {
    pub fn new(repos: ContentRepos, hooks: RevalidationHooks) -> Self {
        Self { repos, hooks }
    }

    pub fn hooks(&self) -> &RevalidationHooks {
        &self.hooks
    }

    /// Create or replace a document of `collection` from its JSON form.
    #[instrument(skip(self, document), fields(collection = %collection))]
    pub async fn upsert(
        &self,
        collection: Collection,
        document: serde_json::Value,
    ) -> Result<MutationOutcome, AppError> {
        match collection {
            Collection::Pages => self.save_page(decode(document)?).await,
            Collection::Posts => self.save_post(decode(document)?).await,
            Collection::Categories => self.save_category(decode(document)?).await,
            Collection::CaseStudies => self.save_case_study(decode(document)?).await,
            Collection::Partners => self.save_partner(decode(document)?).await,
            Collection::Forms => self.save_form(decode(document)?).await,
            Collection::Redirects => self.save_redirect(decode(document)?).await,
            Collection::Globals => self.save_global(decode(document)?).await,
        }
    }

    /// Remove a document with all of its translations.
    ///
    /// `locale` picks the translation whose slugs drive revalidation.
    #[instrument(skip(self), fields(collection = %collection))]
    pub async fn delete(
        &self,
        collection: Collection,
        id: Uuid,
        locale: Locale,
    ) -> Result<MutationOutcome, AppError> {
        if collection == Collection::Globals {
            return Err(AppError::validation("globals cannot be deleted"));
        }

        let snapshot = self
            .repos
            .writes
            .snapshot(collection, id, locale)
            .await?
            .ok_or_else(|| DomainError::not_found(collection.as_str(), id.to_string()))?;

        if !self.repos.writes.delete_document(collection, id).await? {
            return Err(DomainError::not_found(collection.as_str(), id.to_string()).into());
        }

        info!(target: TARGET, %collection, %id, "document deleted");
        let report = self
            .hooks
            .after_mutation(&ContentEvent::deleted(locale, snapshot))
            .await;
        Ok(MutationOutcome {
            id: id.to_string(),
            operation: MutationKind::Delete,
            revalidations: vec![report],
        })
    }

    async fn save_page(&self, input: PageInput) -> Result<MutationOutcome, AppError> {
        let id = input.id.unwrap_or_else(Uuid::new_v4);
        let locale = input.locale.unwrap_or(Locale::DEFAULT);
        let slug = normalize_slug(input.slug.as_deref(), &input.title)?;

        let previous = self
            .repos
            .writes
            .snapshot(Collection::Pages, id, locale)
            .await?;

        let breadcrumbs = self
            .breadcrumbs_for(id, input.parent, locale, &slug, &input.title)
            .await?;
        let url = breadcrumbs.last().map(|crumb| crumb.url.clone());

        if input.status == DocumentStatus::Published {
            if let Some(url) = url.as_deref() {
                self.ensure_page_path_free(id, &slug, url, locale).await?;
            }
        }

        let write = PageWrite {
            id,
            locale,
            status: input.status,
            parent_id: input.parent,
            title: input.title,
            slug: slug.clone(),
            breadcrumbs: breadcrumbs.clone(),
            hero: input.hero,
            layout: input.layout,
            meta: input.meta,
            noindex: input.noindex,
        };
        self.repos.writes.save_page(&write).await?;

        let operation = operation_for(&previous);
        let previous_url = match &previous {
            Some(DocumentSnapshot::Page { url, .. }) => url.clone(),
            _ => None,
        };
        let snapshot = DocumentSnapshot::Page {
            id,
            slug,
            url: url.clone(),
        };
        let mut revalidations = vec![self.fire(locale, snapshot, previous).await];

        if previous_url.is_some() && previous_url != url {
            revalidations.extend(self.rebase_children(id, locale, &breadcrumbs).await?);
        }

        Ok(self.outcome(id.to_string(), operation, revalidations))
    }

    /// Ancestor breadcrumbs followed by the page's own entry.
    async fn breadcrumbs_for(
        &self,
        id: Uuid,
        parent: Option<Uuid>,
        locale: Locale,
        slug: &str,
        title: &str,
    ) -> Result<Vec<Breadcrumb>, AppError> {
        let Some(parent_id) = parent else {
            return Ok(vec![Breadcrumb {
                url: join_path(&[slug]),
                label: title.to_string(),
            }]);
        };

        let parent = self.find_page(parent_id, locale).await?;
        self.ensure_acyclic(id, &parent, locale).await?;

        let mut breadcrumbs = parent.breadcrumbs.clone();
        let parent_url = parent.resolved_url().unwrap_or("").to_string();
        breadcrumbs.push(Breadcrumb {
            url: format!("{parent_url}/{slug}"),
            label: title.to_string(),
        });
        Ok(breadcrumbs)
    }

    async fn find_page(&self, id: Uuid, locale: Locale) -> Result<PageRecord, AppError> {
        self.repos
            .pages
            .find_page_by_id(id, locale)
            .await?
            .ok_or_else(|| DomainError::not_found("page", id.to_string()).into())
    }

    async fn ensure_acyclic(
        &self,
        id: Uuid,
        parent: &PageRecord,
        locale: Locale,
    ) -> Result<(), AppError> {
        let mut current = Some(parent.clone());
        for _ in 0..MAX_PAGE_DEPTH {
            let Some(page) = current else {
                return Ok(());
            };
            if page.id == id {
                return Err(DomainError::validation("a page cannot be its own ancestor").into());
            }
            current = match page.parent_id {
                Some(parent_id) => self.repos.pages.find_page_by_id(parent_id, locale).await?,
                None => None,
            };
        }
        Err(DomainError::validation("page hierarchy is too deep").into())
    }

    async fn ensure_page_path_free(
        &self,
        id: Uuid,
        slug: &str,
        url: &str,
        locale: Locale,
    ) -> Result<(), AppError> {
        let candidates = self
            .repos
            .pages
            .find_pages_by_slug(slug, locale, Visibility::Published)
            .await?;
        if candidates
            .iter()
            .any(|page| page.id != id && page.resolved_url() == Some(url))
        {
            return Err(DomainError::path_conflict(url, locale).into());
        }
        Ok(())
    }

    /// Recompute breadcrumbs below a page whose path changed.
    async fn rebase_children(
        &self,
        parent_id: Uuid,
        locale: Locale,
        parent_breadcrumbs: &[Breadcrumb],
    ) -> Result<Vec<RevalidationReport>, AppError> {
        let mut reports = Vec::new();
        let mut pending = vec![(parent_id, parent_breadcrumbs.to_vec(), 0usize)];

        while let Some((parent, breadcrumbs, depth)) = pending.pop() {
            if depth >= MAX_PAGE_DEPTH {
                break;
            }
            let parent_url = breadcrumbs
                .last()
                .map(|crumb| crumb.url.clone())
                .unwrap_or_default();
            for child in self.repos.writes.list_child_pages(parent, locale).await? {
                let mut child_breadcrumbs = breadcrumbs.clone();
                child_breadcrumbs.push(Breadcrumb {
                    url: format!("{parent_url}/{}", child.slug),
                    label: child.title.clone(),
                });
                self.repos
                    .writes
                    .update_breadcrumbs(child.id, locale, &child_breadcrumbs)
                    .await?;

                let previous = DocumentSnapshot::Page {
                    id: child.id,
                    slug: child.slug.clone(),
                    url: child.resolved_url().map(str::to_string),
                };
                let snapshot = DocumentSnapshot::Page {
                    id: child.id,
                    slug: child.slug.clone(),
                    url: child_breadcrumbs.last().map(|crumb| crumb.url.clone()),
                };
                reports.push(self.fire(locale, snapshot, Some(previous)).await);
                pending.push((child.id, child_breadcrumbs, depth + 1));
            }
        }
        Ok(reports)
    }

    async fn save_post(&self, input: PostInput) -> Result<MutationOutcome, AppError> {
        let id = input.id.unwrap_or_else(Uuid::new_v4);
        let locale = input.locale.unwrap_or(Locale::DEFAULT);
        let slug = normalize_slug(input.slug.as_deref(), &input.title)?;

        if input.status == DocumentStatus::Published {
            if let Some(category_id) = input.category {
                let category = self
                    .repos
                    .categories
                    .find_category_by_id(category_id, locale)
                    .await?
                    .ok_or_else(|| DomainError::not_found("category", category_id.to_string()))?;
                let taken = self
                    .repos
                    .posts
                    .find_post(&slug, &category.slug, locale, Visibility::Published)
                    .await?;
                if taken.is_some_and(|post| post.id != id) {
                    return Err(
                        DomainError::path_conflict(post_path(&category.slug, &slug), locale).into(),
                    );
                }
            }
        }

        let previous = self
            .repos
            .writes
            .snapshot(Collection::Posts, id, locale)
            .await?;
        let write = PostWrite {
            id,
            locale,
            status: input.status,
            title: input.title,
            slug: slug.clone(),
            excerpt: input.excerpt,
            category_id: input.category,
            published_on: input.published_on,
            featured_media: input.featured_media,
            image: input.image,
            video_url: input.video_url,
            authors: input.authors,
            content: input.content,
            meta: input.meta,
        };
        self.repos.writes.save_post(&write).await?;

        let snapshot = DocumentSnapshot::Post {
            id,
            slug,
            category_id: input.category,
        };
        let operation = operation_for(&previous);
        let report = self.fire(locale, snapshot, previous).await;
        Ok(self.outcome(id.to_string(), operation, vec![report]))
    }

    async fn save_category(&self, input: CategoryInput) -> Result<MutationOutcome, AppError> {
        let id = input.id.unwrap_or_else(Uuid::new_v4);
        let locale = input.locale.unwrap_or(Locale::DEFAULT);
        let slug = normalize_slug(input.slug.as_deref(), &input.name)?;

        if let Some(existing) = self
            .repos
            .categories
            .find_category_by_slug(&slug, locale)
            .await?
        {
            if existing.id != id {
                return Err(DomainError::path_conflict(format!("/posts/{slug}"), locale).into());
            }
        }

        let previous = self
            .repos
            .writes
            .snapshot(Collection::Categories, id, locale)
            .await?;
        let write = CategoryWrite {
            id,
            locale,
            name: input.name,
            slug: slug.clone(),
            headline: input.headline,
            description: input.description,
        };
        self.repos.writes.save_category(&write).await?;

        let operation = operation_for(&previous);
        let report = self
            .fire(locale, DocumentSnapshot::Category { id, slug }, previous)
            .await;
        Ok(self.outcome(id.to_string(), operation, vec![report]))
    }

    async fn save_case_study(&self, input: CaseStudyInput) -> Result<MutationOutcome, AppError> {
        let id = input.id.unwrap_or_else(Uuid::new_v4);
        let locale = input.locale.unwrap_or(Locale::DEFAULT);
        let slug = normalize_slug(input.slug.as_deref(), &input.title)?;

        if input.status == DocumentStatus::Published {
            let taken = self
                .repos
                .case_studies
                .find_case_study(&slug, locale, Visibility::Published)
                .await?;
            if taken.is_some_and(|study| study.id != id) {
                return Err(
                    DomainError::path_conflict(format!("/case-studies/{slug}"), locale).into(),
                );
            }
        }

        let previous = self
            .repos
            .writes
            .snapshot(Collection::CaseStudies, id, locale)
            .await?;
        let write = CaseStudyWrite {
            id,
            locale,
            status: input.status,
            title: input.title,
            slug: slug.clone(),
            partner_id: input.partner,
            layout: input.layout,
            meta: input.meta,
        };
        self.repos.writes.save_case_study(&write).await?;

        let operation = operation_for(&previous);
        let report = self
            .fire(locale, DocumentSnapshot::CaseStudy { id, slug }, previous)
            .await;
        Ok(self.outcome(id.to_string(), operation, vec![report]))
    }

    async fn save_partner(&self, input: PartnerInput) -> Result<MutationOutcome, AppError> {
        let id = input.id.unwrap_or_else(Uuid::new_v4);
        let slug = normalize_slug(input.slug.as_deref(), &input.name)?;

        if input.status == DocumentStatus::Published {
            let taken = self
                .repos
                .partners
                .find_partner(&slug, Visibility::Published)
                .await?;
            if taken.is_some_and(|partner| partner.id != id) {
                return Err(DomainError::path_conflict(
                    format!("/partners/{slug}"),
                    Locale::DEFAULT,
                )
                .into());
            }
        }

        let previous = self
            .repos
            .writes
            .snapshot(Collection::Partners, id, Locale::DEFAULT)
            .await?;
        let write = PartnerWrite {
            id,
            status: input.status,
            agency_status: input.agency_status,
            name: input.name,
            slug: slug.clone(),
            website: input.website,
            summary: input.summary,
            logo: input.logo,
            featured: input.featured,
            industries: input.industries,
            specialties: input.specialties,
            regions: input.regions,
            budgets: input.budgets,
        };
        self.repos.writes.save_partner(&write).await?;

        let operation = operation_for(&previous);
        let report = self
            .fire(Locale::DEFAULT, DocumentSnapshot::Partner { id, slug }, previous)
            .await;
        Ok(self.outcome(id.to_string(), operation, vec![report]))
    }

    async fn save_form(&self, input: FormInput) -> Result<MutationOutcome, AppError> {
        let id = input.id.unwrap_or_else(Uuid::new_v4);
        let locale = input.locale.unwrap_or(Locale::DEFAULT);
        if input.title.trim().is_empty() {
            return Err(DomainError::validation("form title must not be empty").into());
        }

        let previous = self
            .repos
            .writes
            .snapshot(Collection::Forms, id, locale)
            .await?;
        let write = FormWrite {
            id,
            locale,
            title: input.title.clone(),
            fields: input.fields,
            require_turnstile: input.require_turnstile,
            confirmation_message: input.confirmation_message,
        };
        self.repos.writes.save_form(&write).await?;

        let operation = operation_for(&previous);
        let report = self
            .fire(
                locale,
                DocumentSnapshot::Form {
                    id,
                    title: input.title,
                },
                previous,
            )
            .await;
        Ok(self.outcome(id.to_string(), operation, vec![report]))
    }

    async fn save_redirect(&self, input: RedirectInput) -> Result<MutationOutcome, AppError> {
        let id = input.id.unwrap_or_else(Uuid::new_v4);
        if !input.from.starts_with('/') {
            return Err(DomainError::validation("redirect source must be a site path").into());
        }

        let previous = self
            .repos
            .writes
            .snapshot(Collection::Redirects, id, Locale::DEFAULT)
            .await?;
        let write = RedirectWrite {
            id,
            from: input.from.clone(),
            to: input.to,
            permanent: input.permanent,
        };
        self.repos.writes.save_redirect(&write).await?;

        let operation = operation_for(&previous);
        let report = self
            .fire(
                Locale::DEFAULT,
                DocumentSnapshot::Redirect {
                    id,
                    from: input.from,
                },
                previous,
            )
            .await;
        Ok(self.outcome(id.to_string(), operation, vec![report]))
    }

    async fn save_global(&self, input: GlobalInput) -> Result<MutationOutcome, AppError> {
        let locale = input.locale.unwrap_or(Locale::DEFAULT);
        let existed = self
            .repos
            .globals
            .find_global(input.slug, locale)
            .await?
            .is_some();

        let write = GlobalWrite {
            slug: input.slug,
            locale,
            data: input.data,
        };
        self.repos.writes.save_global(&write).await?;

        let snapshot = DocumentSnapshot::Global { slug: input.slug };
        let previous = existed.then(|| snapshot.clone());
        let operation = operation_for(&previous);
        let report = self.fire(locale, snapshot, previous).await;
        Ok(self.outcome(input.slug.as_str().to_string(), operation, vec![report]))
    }

    async fn fire(
        &self,
        locale: Locale,
        snapshot: DocumentSnapshot,
        previous: Option<DocumentSnapshot>,
    ) -> RevalidationReport {
        let event = ContentEvent::changed(locale, snapshot, previous);
        info!(
            target: TARGET,
            collection = %event.collection(),
            operation = %event.operation,
            document = %event.snapshot.label(),
            "document saved"
        );
        self.hooks.after_mutation(&event).await
    }

    fn outcome(
        &self,
        id: String,
        operation: MutationKind,
        revalidations: Vec<RevalidationReport>,
    ) -> MutationOutcome {
        MutationOutcome {
            id,
            operation,
            revalidations,
        }
    }
}

fn operation_for(previous: &Option<DocumentSnapshot>) -> MutationKind {
    if previous.is_some() {
        MutationKind::Update
    } else {
        MutationKind::Create
    }
}

fn decode<T: DeserializeOwned>(document: serde_json::Value) -> Result<T, AppError> {
    serde_json::from_value(document).map_err(|err| AppError::validation(err.to_string()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn page_input_defaults_to_draft() {
        let input: PageInput = decode(json!({"title": "About"})).expect("decode");
        assert_eq!(input.status, DocumentStatus::Draft);
        assert!(input.layout.is_empty());
    }

    #[test]
    fn post_input_reads_status_and_dates() {
        let input: PostInput = decode(json!({
            "title": "Hello World",
            "_status": "published",
            "publishedOn": "2024-05-01T10:00:00Z",
            "featuredMedia": "videoUrl",
            "videoUrl": "https://video.example/1"
        }))
        .expect("decode");
        assert_eq!(input.status, DocumentStatus::Published);
        assert_eq!(input.featured_media, FeaturedMedia::VideoUrl);
        assert!(input.published_on.is_some());
    }

    #[test]
    fn malformed_documents_are_validation_errors() {
        let error = decode::<CategoryInput>(json!({"slug": 4})).expect_err("invalid");
        assert!(matches!(error, AppError::Validation(_)));
    }
}
