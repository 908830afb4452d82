//! Repository traits describing the content store adapters.
//!
//! Every read that can see unpublished documents takes an explicit
//! [`Visibility`]; callers derive it from the request's draft mode.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::blocks::{Block, MediaRef};
use crate::domain::entities::{
    Author, Breadcrumb, CaseStudyRecord, CategoryRecord, FormField, FormRecord,
    FormSubmissionRecord, GlobalRecord, Hero, PageRecord, PartnerFilters, PartnerRecord,
    PostRecord, RedirectRecord, SeoMeta, SubmissionEntry,
};
use crate::domain::snapshots::DocumentSnapshot;
use crate::domain::types::{
    AgencyStatus, Collection, DocumentStatus, FeaturedMedia, GlobalSlug, Locale, Visibility,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("stored document could not be decoded: {message}")]
    Decode { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait PagesRepo: Send + Sync {
    /// Pages whose slug in `locale` equals `slug`.
    async fn find_pages_by_slug(
        &self,
        slug: &str,
        locale: Locale,
        visibility: Visibility,
    ) -> Result<Vec<PageRecord>, RepoError>;

    async fn find_page_by_id(
        &self,
        id: Uuid,
        locale: Locale,
    ) -> Result<Option<PageRecord>, RepoError>;

    /// Published pages, optionally skipping one slug.
    async fn list_published_pages(
        &self,
        locale: Locale,
        exclude_slug: Option<&str>,
        limit: u32,
    ) -> Result<Vec<PageRecord>, RepoError>;
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn find_post(
        &self,
        slug: &str,
        category_slug: &str,
        locale: Locale,
        visibility: Visibility,
    ) -> Result<Option<PostRecord>, RepoError>;

    async fn find_post_by_id(
        &self,
        id: Uuid,
        locale: Locale,
    ) -> Result<Option<PostRecord>, RepoError>;

    /// Every published post, newest first.
    async fn list_published_posts(&self, locale: Locale) -> Result<Vec<PostRecord>, RepoError>;

    /// Published posts with `published_on <= now`, optionally limited to a category.
    async fn list_posts_published_before(
        &self,
        locale: Locale,
        category_id: Option<Uuid>,
        now: OffsetDateTime,
    ) -> Result<Vec<PostRecord>, RepoError>;
}

#[async_trait]
pub trait CategoriesRepo: Send + Sync {
    async fn find_category_by_slug(
        &self,
        slug: &str,
        locale: Locale,
    ) -> Result<Option<CategoryRecord>, RepoError>;

    async fn find_category_by_id(
        &self,
        id: Uuid,
        locale: Locale,
    ) -> Result<Option<CategoryRecord>, RepoError>;

    /// All categories sorted by name.
    async fn list_categories(
        &self,
        locale: Locale,
        exclude_slug: Option<&str>,
    ) -> Result<Vec<CategoryRecord>, RepoError>;
}

#[async_trait]
pub trait PartnersRepo: Send + Sync {
    /// Active partners visible under `visibility`, sorted by slug.
    async fn list_active_partners(
        &self,
        visibility: Visibility,
    ) -> Result<Vec<PartnerRecord>, RepoError>;

    async fn find_partner(
        &self,
        slug: &str,
        visibility: Visibility,
    ) -> Result<Option<PartnerRecord>, RepoError>;

    async fn partner_filters(&self, limit: u32) -> Result<PartnerFilters, RepoError>;
}

#[async_trait]
pub trait CaseStudiesRepo: Send + Sync {
    async fn find_case_study(
        &self,
        slug: &str,
        locale: Locale,
        visibility: Visibility,
    ) -> Result<Option<CaseStudyRecord>, RepoError>;

    async fn list_published_case_studies(
        &self,
        locale: Locale,
    ) -> Result<Vec<CaseStudyRecord>, RepoError>;
}

#[async_trait]
pub trait GlobalsRepo: Send + Sync {
    async fn find_global(
        &self,
        slug: GlobalSlug,
        locale: Locale,
    ) -> Result<Option<GlobalRecord>, RepoError>;
}

#[async_trait]
pub trait FormsRepo: Send + Sync {
    async fn find_form(&self, id: Uuid, locale: Locale) -> Result<Option<FormRecord>, RepoError>;

    async fn find_form_by_title(
        &self,
        title: &str,
        locale: Locale,
    ) -> Result<Option<FormRecord>, RepoError>;
}

#[async_trait]
pub trait FormSubmissionsRepo: Send + Sync {
    async fn create_submission(
        &self,
        form_id: Uuid,
        entries: &[SubmissionEntry],
    ) -> Result<FormSubmissionRecord, RepoError>;
}

#[async_trait]
pub trait RedirectsRepo: Send + Sync {
    async fn find_redirect(&self, from: &str) -> Result<Option<RedirectRecord>, RepoError>;
}

#[derive(Debug, Clone)]
pub struct PageWrite {
    pub id: Uuid,
    pub locale: Locale,
    pub status: DocumentStatus,
    pub parent_id: Option<Uuid>,
    pub title: String,
    pub slug: String,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub hero: Option<Hero>,
    pub layout: Vec<Block>,
    pub meta: SeoMeta,
    pub noindex: bool,
}

#[derive(Debug, Clone)]
pub struct PostWrite {
    pub id: Uuid,
    pub locale: Locale,
    pub status: DocumentStatus,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub category_id: Option<Uuid>,
    pub published_on: Option<OffsetDateTime>,
    pub featured_media: FeaturedMedia,
    pub image: Option<MediaRef>,
    pub video_url: Option<String>,
    pub authors: Vec<Author>,
    pub content: Vec<Block>,
    pub meta: SeoMeta,
}

#[derive(Debug, Clone)]
pub struct CategoryWrite {
    pub id: Uuid,
    pub locale: Locale,
    pub name: String,
    pub slug: String,
    pub headline: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CaseStudyWrite {
    pub id: Uuid,
    pub locale: Locale,
    pub status: DocumentStatus,
    pub title: String,
    pub slug: String,
    pub partner_id: Option<Uuid>,
    pub layout: Vec<Block>,
    pub meta: SeoMeta,
}

#[derive(Debug, Clone)]
pub struct PartnerWrite {
    pub id: Uuid,
    pub status: DocumentStatus,
    pub agency_status: AgencyStatus,
    pub name: String,
    pub slug: String,
    pub website: Option<String>,
    pub summary: String,
    pub logo: Option<MediaRef>,
    pub featured: bool,
    pub industries: Vec<String>,
    pub specialties: Vec<String>,
    pub regions: Vec<String>,
    pub budgets: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FormWrite {
    pub id: Uuid,
    pub locale: Locale,
    pub title: String,
    pub fields: Vec<FormField>,
    pub require_turnstile: bool,
    pub confirmation_message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RedirectWrite {
    pub id: Uuid,
    pub from: String,
    pub to: String,
    pub permanent: bool,
}

#[derive(Debug, Clone)]
pub struct GlobalWrite {
    pub slug: GlobalSlug,
    pub locale: Locale,
    pub data: serde_json::Value,
}

/// Write side of the content store used by the mutation service.
#[async_trait]
pub trait ContentWriteRepo: Send + Sync {
    /// Snapshot of the stored document as seen in `locale`, if it exists.
    async fn snapshot(
        &self,
        collection: Collection,
        id: Uuid,
        locale: Locale,
    ) -> Result<Option<DocumentSnapshot>, RepoError>;

    async fn save_page(&self, page: &PageWrite) -> Result<(), RepoError>;

    async fn save_post(&self, post: &PostWrite) -> Result<(), RepoError>;

    async fn save_category(&self, category: &CategoryWrite) -> Result<(), RepoError>;

    async fn save_case_study(&self, case_study: &CaseStudyWrite) -> Result<(), RepoError>;

    async fn save_partner(&self, partner: &PartnerWrite) -> Result<(), RepoError>;

    async fn save_form(&self, form: &FormWrite) -> Result<(), RepoError>;

    async fn save_redirect(&self, redirect: &RedirectWrite) -> Result<(), RepoError>;

    async fn save_global(&self, global: &GlobalWrite) -> Result<(), RepoError>;

    /// Remove a document with all of its translations. Returns whether it existed.
    async fn delete_document(&self, collection: Collection, id: Uuid) -> Result<bool, RepoError>;

    async fn list_child_pages(
        &self,
        parent_id: Uuid,
        locale: Locale,
    ) -> Result<Vec<PageRecord>, RepoError>;

    async fn update_breadcrumbs(
        &self,
        page_id: Uuid,
        locale: Locale,
        breadcrumbs: &[Breadcrumb],
    ) -> Result<(), RepoError>;
}

/// Every read and write adapter, bundled for wiring.
#[derive(Clone)]
pub struct ContentRepos {
    pub pages: Arc<dyn PagesRepo>,
    pub posts: Arc<dyn PostsRepo>,
    pub categories: Arc<dyn CategoriesRepo>,
    pub partners: Arc<dyn PartnersRepo>,
    pub case_studies: Arc<dyn CaseStudiesRepo>,
    pub globals: Arc<dyn GlobalsRepo>,
    pub forms: Arc<dyn FormsRepo>,
    pub submissions: Arc<dyn FormSubmissionsRepo>,
    pub redirects: Arc<dyn RedirectsRepo>,
    pub writes: Arc<dyn ContentWriteRepo>,
}

impl ContentRepos {
    /// Wire every adapter to one backing store.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: PagesRepo
            + PostsRepo
            + CategoriesRepo
            + PartnersRepo
            + CaseStudiesRepo
            + GlobalsRepo
            + FormsRepo
            + FormSubmissionsRepo
            + RedirectsRepo
            + ContentWriteRepo
            + 'static,
    {
        Self {
            pages: store.clone(),
            posts: store.clone(),
            categories: store.clone(),
            partners: store.clone(),
            case_studies: store.clone(),
            globals: store.clone(),
            forms: store.clone(),
            submissions: store.clone(),
            redirects: store.clone(),
            writes: store,
        }
    }
}
