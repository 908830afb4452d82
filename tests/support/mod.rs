//! In-memory content store and fake integrations shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use time::OffsetDateTime;
use tower::ServiceExt;
use uuid::Uuid;

use safecircle_site::application::chrome::ChromeService;
use safecircle_site::application::content::ContentService;
use safecircle_site::application::forms::FormSubmissionService;
use safecircle_site::application::integrations::{
    ChallengeVerifier, IntegrationError, NewContact, NewsletterAudience, StarSource,
};
use safecircle_site::application::mutations::ContentMutationService;
use safecircle_site::application::newsletter::NewsletterService;
use safecircle_site::application::page::PageService;
use safecircle_site::application::repos::{
    CaseStudiesRepo, CaseStudyWrite, CategoriesRepo, CategoryWrite, ContentRepos,
    ContentWriteRepo, FormSubmissionsRepo, FormWrite, FormsRepo, GlobalWrite, GlobalsRepo,
    PageWrite, PagesRepo, PartnerWrite, PartnersRepo, PostWrite, PostsRepo, RedirectWrite,
    RedirectsRepo, RepoError,
};
use safecircle_site::application::revalidation::RevalidationHooks;
use safecircle_site::application::sitemap::SitemapService;
use safecircle_site::application::stars::StarCountService;
use safecircle_site::application::static_params::StaticParams;
use safecircle_site::cache::{
    CacheConfig, CacheState, CacheTag, LocalRevalidator, RevalidateError, Revalidator, SiteCache,
};
use safecircle_site::domain::entities::{
    Breadcrumb, CaseStudyRecord, CategoryRecord, FormRecord, FormSubmissionRecord, GlobalRecord,
    PageRecord, PartnerFilters, PartnerRecord, PostRecord, RedirectRecord, SubmissionEntry,
};
use safecircle_site::domain::snapshots::DocumentSnapshot;
use safecircle_site::domain::types::{
    AgencyStatus, Collection, DocumentStatus, GlobalSlug, Locale, Visibility,
};
use safecircle_site::infra::http::{
    AdminState, DRAFT_COOKIE, HealthProbe, HttpState, build_admin_router, build_router,
};
use safecircle_site::presentation::blocks::BlockRegistry;

pub const SITE_URL: &str = "https://safecircle.test";
pub const ADMIN_TOKEN: &str = "admin-token";
pub const DRAFT_SECRET: &str = "draft-secret";

#[derive(Default)]
struct Tables {
    pages: HashMap<(Uuid, Locale), PageWrite>,
    posts: HashMap<(Uuid, Locale), PostWrite>,
    categories: HashMap<(Uuid, Locale), CategoryWrite>,
    case_studies: HashMap<(Uuid, Locale), CaseStudyWrite>,
    partners: HashMap<Uuid, PartnerWrite>,
    filters: PartnerFilters,
    forms: HashMap<(Uuid, Locale), FormWrite>,
    submissions: Vec<FormSubmissionRecord>,
    redirects: HashMap<Uuid, RedirectWrite>,
    globals: HashMap<(GlobalSlug, Locale), serde_json::Value>,
}

/// Translation of `id` in `locale`, falling back to the default locale.
fn localized<T: Clone>(map: &HashMap<(Uuid, Locale), T>, id: Uuid, locale: Locale) -> Option<T> {
    map.get(&(id, locale))
        .or_else(|| map.get(&(id, Locale::DEFAULT)))
        .cloned()
}

fn ids<T>(map: &HashMap<(Uuid, Locale), T>) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = map.keys().map(|(id, _)| *id).collect();
    ids.sort();
    ids.dedup();
    ids
}

fn page_record(write: PageWrite) -> PageRecord {
    PageRecord {
        id: write.id,
        locale: write.locale,
        status: write.status,
        parent_id: write.parent_id,
        title: write.title,
        slug: write.slug,
        breadcrumbs: write.breadcrumbs,
        hero: write.hero,
        layout: write.layout,
        meta: write.meta,
        noindex: write.noindex,
        updated_at: OffsetDateTime::UNIX_EPOCH,
    }
}

fn category_record(write: CategoryWrite) -> CategoryRecord {
    CategoryRecord {
        id: write.id,
        locale: write.locale,
        name: write.name,
        slug: write.slug,
        headline: write.headline,
        description: write.description,
    }
}

fn partner_record(write: PartnerWrite) -> PartnerRecord {
    PartnerRecord {
        id: write.id,
        status: write.status,
        agency_status: write.agency_status,
        name: write.name,
        slug: write.slug,
        website: write.website,
        summary: write.summary,
        logo: write.logo,
        featured: write.featured,
        industries: write.industries,
        specialties: write.specialties,
        regions: write.regions,
        budgets: write.budgets,
    }
}

fn form_record(write: FormWrite) -> FormRecord {
    FormRecord {
        id: write.id,
        locale: write.locale,
        title: write.title,
        fields: write.fields,
        require_turnstile: write.require_turnstile,
        confirmation_message: write.confirmation_message,
    }
}

/// Content store kept in process memory, with read counters.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    pub post_reads: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_filters(&self, filters: PartnerFilters) {
        self.tables.lock().expect("tables").filters = filters;
    }

    pub fn submissions(&self) -> Vec<FormSubmissionRecord> {
        self.tables.lock().expect("tables").submissions.clone()
    }

    fn post_record(&self, tables: &Tables, write: PostWrite, locale: Locale) -> PostRecord {
        let category = write
            .category_id
            .and_then(|id| localized(&tables.categories, id, locale))
            .map(category_record);
        PostRecord {
            id: write.id,
            locale,
            status: write.status,
            title: write.title,
            slug: write.slug,
            excerpt: write.excerpt,
            category,
            published_on: write.published_on,
            featured_media: write.featured_media,
            image: write.image,
            video_url: write.video_url,
            authors: write.authors,
            content: write.content,
            meta: write.meta,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn pages_in(&self, locale: Locale) -> Vec<PageRecord> {
        let tables = self.tables.lock().expect("tables");
        ids(&tables.pages)
            .into_iter()
            .filter_map(|id| localized(&tables.pages, id, locale))
            .map(page_record)
            .collect()
    }

    fn posts_in(&self, locale: Locale) -> Vec<PostRecord> {
        let tables = self.tables.lock().expect("tables");
        let mut posts: Vec<PostRecord> = ids(&tables.posts)
            .into_iter()
            .filter_map(|id| localized(&tables.posts, id, locale))
            .map(|write| self.post_record(&tables, write, locale))
            .collect();
        posts.sort_by(|a, b| b.published_on.cmp(&a.published_on));
        posts
    }

    fn categories_in(&self, locale: Locale) -> Vec<CategoryRecord> {
        let tables = self.tables.lock().expect("tables");
        ids(&tables.categories)
            .into_iter()
            .filter_map(|id| localized(&tables.categories, id, locale))
            .map(category_record)
            .collect()
    }
}

#[async_trait]
impl PagesRepo for MemoryStore {
    async fn find_pages_by_slug(
        &self,
        slug: &str,
        locale: Locale,
        visibility: Visibility,
    ) -> Result<Vec<PageRecord>, RepoError> {
        Ok(self
            .pages_in(locale)
            .into_iter()
            .filter(|page| page.slug == slug && visibility.admits(page.status))
            .collect())
    }

    async fn find_page_by_id(
        &self,
        id: Uuid,
        locale: Locale,
    ) -> Result<Option<PageRecord>, RepoError> {
        let tables = self.tables.lock().expect("tables");
        Ok(localized(&tables.pages, id, locale).map(page_record))
    }

    async fn list_published_pages(
        &self,
        locale: Locale,
        exclude_slug: Option<&str>,
        limit: u32,
    ) -> Result<Vec<PageRecord>, RepoError> {
        Ok(self
            .pages_in(locale)
            .into_iter()
            .filter(|page| page.status == DocumentStatus::Published)
            .filter(|page| Some(page.slug.as_str()) != exclude_slug)
            .take(limit as usize)
            .collect())
    }
}

#[async_trait]
impl PostsRepo for MemoryStore {
    async fn find_post(
        &self,
        slug: &str,
        category_slug: &str,
        locale: Locale,
        visibility: Visibility,
    ) -> Result<Option<PostRecord>, RepoError> {
        self.post_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.posts_in(locale).into_iter().find(|post| {
            post.slug == slug
                && post.category_slug() == Some(category_slug)
                && visibility.admits(post.status)
        }))
    }

    async fn find_post_by_id(
        &self,
        id: Uuid,
        locale: Locale,
    ) -> Result<Option<PostRecord>, RepoError> {
        let tables = self.tables.lock().expect("tables");
        Ok(localized(&tables.posts, id, locale).map(|write| self.post_record(&tables, write, locale)))
    }

    async fn list_published_posts(&self, locale: Locale) -> Result<Vec<PostRecord>, RepoError> {
        Ok(self
            .posts_in(locale)
            .into_iter()
            .filter(|post| post.status == DocumentStatus::Published)
            .collect())
    }

    async fn list_posts_published_before(
        &self,
        locale: Locale,
        category_id: Option<Uuid>,
        now: OffsetDateTime,
    ) -> Result<Vec<PostRecord>, RepoError> {
        Ok(self
            .posts_in(locale)
            .into_iter()
            .filter(|post| post.status == DocumentStatus::Published)
            .filter(|post| post.published_on.is_some_and(|published| published <= now))
            .filter(|post| match category_id {
                Some(id) => post.category.as_ref().is_some_and(|category| category.id == id),
                None => true,
            })
            .collect())
    }
}

#[async_trait]
impl CategoriesRepo for MemoryStore {
    async fn find_category_by_slug(
        &self,
        slug: &str,
        locale: Locale,
    ) -> Result<Option<CategoryRecord>, RepoError> {
        Ok(self
            .categories_in(locale)
            .into_iter()
            .find(|category| category.slug == slug))
    }

    async fn find_category_by_id(
        &self,
        id: Uuid,
        locale: Locale,
    ) -> Result<Option<CategoryRecord>, RepoError> {
        let tables = self.tables.lock().expect("tables");
        Ok(localized(&tables.categories, id, locale).map(category_record))
    }

    async fn list_categories(
        &self,
        locale: Locale,
        exclude_slug: Option<&str>,
    ) -> Result<Vec<CategoryRecord>, RepoError> {
        let mut categories: Vec<CategoryRecord> = self
            .categories_in(locale)
            .into_iter()
            .filter(|category| Some(category.slug.as_str()) != exclude_slug)
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }
}

#[async_trait]
impl PartnersRepo for MemoryStore {
    async fn list_active_partners(
        &self,
        visibility: Visibility,
    ) -> Result<Vec<PartnerRecord>, RepoError> {
        let tables = self.tables.lock().expect("tables");
        let mut partners: Vec<PartnerRecord> = tables
            .partners
            .values()
            .filter(|partner| {
                partner.agency_status == AgencyStatus::Active && visibility.admits(partner.status)
            })
            .cloned()
            .map(partner_record)
            .collect();
        partners.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(partners)
    }

    async fn find_partner(
        &self,
        slug: &str,
        visibility: Visibility,
    ) -> Result<Option<PartnerRecord>, RepoError> {
        let tables = self.tables.lock().expect("tables");
        Ok(tables
            .partners
            .values()
            .find(|partner| partner.slug == slug && visibility.admits(partner.status))
            .cloned()
            .map(partner_record))
    }

    async fn partner_filters(&self, _limit: u32) -> Result<PartnerFilters, RepoError> {
        Ok(self.tables.lock().expect("tables").filters.clone())
    }
}

#[async_trait]
impl CaseStudiesRepo for MemoryStore {
    async fn find_case_study(
        &self,
        slug: &str,
        locale: Locale,
        visibility: Visibility,
    ) -> Result<Option<CaseStudyRecord>, RepoError> {
        Ok(self
            .list_case_studies(locale)
            .into_iter()
            .find(|study| study.slug == slug && visibility.admits(study.status)))
    }

    async fn list_published_case_studies(
        &self,
        locale: Locale,
    ) -> Result<Vec<CaseStudyRecord>, RepoError> {
        Ok(self
            .list_case_studies(locale)
            .into_iter()
            .filter(|study| study.status == DocumentStatus::Published)
            .collect())
    }
}

impl MemoryStore {
    fn list_case_studies(&self, locale: Locale) -> Vec<CaseStudyRecord> {
        let tables = self.tables.lock().expect("tables");
        ids(&tables.case_studies)
            .into_iter()
            .filter_map(|id| localized(&tables.case_studies, id, locale))
            .map(|write| CaseStudyRecord {
                id: write.id,
                locale,
                status: write.status,
                title: write.title,
                slug: write.slug,
                partner_id: write.partner_id,
                layout: write.layout,
                meta: write.meta,
            })
            .collect()
    }
}

#[async_trait]
impl GlobalsRepo for MemoryStore {
    async fn find_global(
        &self,
        slug: GlobalSlug,
        locale: Locale,
    ) -> Result<Option<GlobalRecord>, RepoError> {
        let tables = self.tables.lock().expect("tables");
        let found = tables
            .globals
            .get(&(slug, locale))
            .map(|data| (locale, data))
            .or_else(|| {
                tables
                    .globals
                    .get(&(slug, Locale::DEFAULT))
                    .map(|data| (Locale::DEFAULT, data))
            });
        Ok(found.map(|(locale, data)| GlobalRecord {
            slug,
            locale,
            data: data.clone(),
        }))
    }
}

#[async_trait]
impl FormsRepo for MemoryStore {
    async fn find_form(&self, id: Uuid, locale: Locale) -> Result<Option<FormRecord>, RepoError> {
        let tables = self.tables.lock().expect("tables");
        Ok(localized(&tables.forms, id, locale).map(form_record))
    }

    async fn find_form_by_title(
        &self,
        title: &str,
        locale: Locale,
    ) -> Result<Option<FormRecord>, RepoError> {
        let tables = self.tables.lock().expect("tables");
        Ok(ids(&tables.forms)
            .into_iter()
            .filter_map(|id| localized(&tables.forms, id, locale))
            .find(|form| form.title == title)
            .map(form_record))
    }
}

#[async_trait]
impl FormSubmissionsRepo for MemoryStore {
    async fn create_submission(
        &self,
        form_id: Uuid,
        entries: &[SubmissionEntry],
    ) -> Result<FormSubmissionRecord, RepoError> {
        let record = FormSubmissionRecord {
            id: Uuid::new_v4(),
            form_id,
            submission_data: entries.to_vec(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.tables
            .lock()
            .expect("tables")
            .submissions
            .push(record.clone());
        Ok(record)
    }
}

#[async_trait]
impl RedirectsRepo for MemoryStore {
    async fn find_redirect(&self, from: &str) -> Result<Option<RedirectRecord>, RepoError> {
        let tables = self.tables.lock().expect("tables");
        Ok(tables
            .redirects
            .values()
            .find(|redirect| redirect.from == from)
            .map(|redirect| RedirectRecord {
                id: redirect.id,
                from: redirect.from.clone(),
                to: redirect.to.clone(),
                permanent: redirect.permanent,
            }))
    }
}

#[async_trait]
impl ContentWriteRepo for MemoryStore {
    async fn snapshot(
        &self,
        collection: Collection,
        id: Uuid,
        locale: Locale,
    ) -> Result<Option<DocumentSnapshot>, RepoError> {
        let tables = self.tables.lock().expect("tables");
        let snapshot = match collection {
            Collection::Pages => localized(&tables.pages, id, locale).map(|page| {
                DocumentSnapshot::Page {
                    id,
                    url: page
                        .breadcrumbs
                        .last()
                        .map(|crumb| crumb.url.clone())
                        .filter(|url| !url.is_empty()),
                    slug: page.slug,
                }
            }),
            Collection::Posts => {
                localized(&tables.posts, id, locale).map(|post| DocumentSnapshot::Post {
                    id,
                    slug: post.slug,
                    category_id: post.category_id,
                })
            }
            Collection::Categories => localized(&tables.categories, id, locale)
                .map(|category| DocumentSnapshot::Category {
                    id,
                    slug: category.slug,
                }),
            Collection::CaseStudies => localized(&tables.case_studies, id, locale)
                .map(|study| DocumentSnapshot::CaseStudy {
                    id,
                    slug: study.slug,
                }),
            Collection::Partners => tables.partners.get(&id).map(|partner| {
                DocumentSnapshot::Partner {
                    id,
                    slug: partner.slug.clone(),
                }
            }),
            Collection::Forms => {
                localized(&tables.forms, id, locale).map(|form| DocumentSnapshot::Form {
                    id,
                    title: form.title,
                })
            }
            Collection::Redirects => tables.redirects.get(&id).map(|redirect| {
                DocumentSnapshot::Redirect {
                    id,
                    from: redirect.from.clone(),
                }
            }),
            Collection::Globals => None,
        };
        Ok(snapshot)
    }

    async fn save_page(&self, page: &PageWrite) -> Result<(), RepoError> {
        let mut tables = self.tables.lock().expect("tables");
        tables.pages.insert((page.id, page.locale), page.clone());
        Ok(())
    }

    async fn save_post(&self, post: &PostWrite) -> Result<(), RepoError> {
        let mut tables = self.tables.lock().expect("tables");
        tables.posts.insert((post.id, post.locale), post.clone());
        Ok(())
    }

    async fn save_category(&self, category: &CategoryWrite) -> Result<(), RepoError> {
        let mut tables = self.tables.lock().expect("tables");
        tables
            .categories
            .insert((category.id, category.locale), category.clone());
        Ok(())
    }

    async fn save_case_study(&self, case_study: &CaseStudyWrite) -> Result<(), RepoError> {
        let mut tables = self.tables.lock().expect("tables");
        tables
            .case_studies
            .insert((case_study.id, case_study.locale), case_study.clone());
        Ok(())
    }

    async fn save_partner(&self, partner: &PartnerWrite) -> Result<(), RepoError> {
        let mut tables = self.tables.lock().expect("tables");
        tables.partners.insert(partner.id, partner.clone());
        Ok(())
    }

    async fn save_form(&self, form: &FormWrite) -> Result<(), RepoError> {
        let mut tables = self.tables.lock().expect("tables");
        tables.forms.insert((form.id, form.locale), form.clone());
        Ok(())
    }

    async fn save_redirect(&self, redirect: &RedirectWrite) -> Result<(), RepoError> {
        let mut tables = self.tables.lock().expect("tables");
        tables.redirects.insert(redirect.id, redirect.clone());
        Ok(())
    }

    async fn save_global(&self, global: &GlobalWrite) -> Result<(), RepoError> {
        let mut tables = self.tables.lock().expect("tables");
        tables
            .globals
            .insert((global.slug, global.locale), global.data.clone());
        Ok(())
    }

    async fn delete_document(&self, collection: Collection, id: Uuid) -> Result<bool, RepoError> {
        let mut tables = self.tables.lock().expect("tables");
        let removed = match collection {
            Collection::Pages => {
                let before = tables.pages.len();
                tables.pages.retain(|(key, _), _| *key != id);
                before != tables.pages.len()
            }
            Collection::Posts => {
                let before = tables.posts.len();
                tables.posts.retain(|(key, _), _| *key != id);
                before != tables.posts.len()
            }
            Collection::Categories => {
                let before = tables.categories.len();
                tables.categories.retain(|(key, _), _| *key != id);
                before != tables.categories.len()
            }
            Collection::CaseStudies => {
                let before = tables.case_studies.len();
                tables.case_studies.retain(|(key, _), _| *key != id);
                before != tables.case_studies.len()
            }
            Collection::Partners => tables.partners.remove(&id).is_some(),
            Collection::Forms => {
                let before = tables.forms.len();
                tables.forms.retain(|(key, _), _| *key != id);
                before != tables.forms.len()
            }
            Collection::Redirects => tables.redirects.remove(&id).is_some(),
            Collection::Globals => false,
        };
        Ok(removed)
    }

    async fn list_child_pages(
        &self,
        parent_id: Uuid,
        locale: Locale,
    ) -> Result<Vec<PageRecord>, RepoError> {
        Ok(self
            .pages_in(locale)
            .into_iter()
            .filter(|page| page.parent_id == Some(parent_id))
            .collect())
    }

    async fn update_breadcrumbs(
        &self,
        page_id: Uuid,
        locale: Locale,
        breadcrumbs: &[Breadcrumb],
    ) -> Result<(), RepoError> {
        let mut tables = self.tables.lock().expect("tables");
        let key = if tables.pages.contains_key(&(page_id, locale)) {
            (page_id, locale)
        } else {
            (page_id, Locale::DEFAULT)
        };
        if let Some(page) = tables.pages.get_mut(&key) {
            page.breadcrumbs = breadcrumbs.to_vec();
        }
        Ok(())
    }
}

/// Revalidator that records every invalidation it receives, in order.
#[derive(Default)]
pub struct RecordingRevalidator {
    pub calls: Mutex<Vec<String>>,
}

impl RecordingRevalidator {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls").clone()
    }

    pub fn tags(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| call.strip_prefix("tag ").map(str::to_string))
            .collect()
    }

    pub fn paths(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| call.strip_prefix("path ").map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl Revalidator for RecordingRevalidator {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn revalidate_path(&self, path: &str) -> Result<(), RevalidateError> {
        self.calls.lock().expect("calls").push(format!("path {path}"));
        Ok(())
    }

    async fn revalidate_tag(&self, tag: &CacheTag) -> Result<(), RevalidateError> {
        self.calls
            .lock()
            .expect("calls")
            .push(format!("tag {}", tag.as_str()));
        Ok(())
    }
}

/// Challenge verifier accepting exactly one token.
pub struct FixedVerifier(pub &'static str);

#[async_trait]
impl ChallengeVerifier for FixedVerifier {
    async fn verify(&self, token: &str, _remote_ip: Option<&str>) -> Result<bool, IntegrationError> {
        Ok(token == self.0)
    }
}

#[derive(Default)]
pub struct MemoryAudience {
    pub contacts: Mutex<Vec<NewContact>>,
}

#[async_trait]
impl NewsletterAudience for MemoryAudience {
    async fn add_contact(&self, contact: &NewContact) -> Result<(), IntegrationError> {
        self.contacts.lock().expect("contacts").push(contact.clone());
        Ok(())
    }

    async fn list_contact_emails(&self) -> Result<Vec<String>, IntegrationError> {
        Ok(self
            .contacts
            .lock()
            .expect("contacts")
            .iter()
            .map(|contact| contact.email.clone())
            .collect())
    }
}

/// Star source counting how often it was asked.
pub struct CountingStars {
    pub stars: u64,
    pub calls: AtomicUsize,
}

#[async_trait]
impl StarSource for CountingStars {
    async fn star_count(&self) -> Result<u64, IntegrationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.stars)
    }
}

struct AlwaysHealthy;

#[async_trait]
impl HealthProbe for AlwaysHealthy {
    async fn check(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

/// Every service wired over one [`MemoryStore`], as the binary wires them over Postgres.
pub struct TestSite {
    pub store: Arc<MemoryStore>,
    pub cache: Arc<SiteCache>,
    pub recorder: Arc<RecordingRevalidator>,
    pub audience: Arc<MemoryAudience>,
    pub stars: Arc<CountingStars>,
    pub mutations: Arc<ContentMutationService>,
    pub content: ContentService,
    pub public: Router,
    pub admin: Router,
}

impl TestSite {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let repos = ContentRepos::from_store(store.clone());
        let cache = Arc::new(SiteCache::new(CacheConfig::default()));
        let content = ContentService::new(repos.clone(), cache.clone());

        let recorder = Arc::new(RecordingRevalidator::default());
        let revalidators: Vec<Arc<dyn Revalidator>> = vec![
            Arc::new(LocalRevalidator::new(cache.clone())),
            recorder.clone(),
        ];
        let hooks = RevalidationHooks::new(revalidators, repos.categories.clone());
        let mutations = Arc::new(ContentMutationService::new(repos, hooks));

        let audience = Arc::new(MemoryAudience::default());
        let stars = Arc::new(CountingStars {
            stars: 42,
            calls: AtomicUsize::new(0),
        });
        let params = StaticParams::new(content.clone());

        let http_state = HttpState {
            pages: Arc::new(PageService::new(
                content.clone(),
                Arc::new(BlockRegistry::standard()),
                Some("site-key".to_string()),
                SITE_URL,
            )),
            chrome: Arc::new(ChromeService::new(content.clone(), None)),
            sitemap: Arc::new(SitemapService::new(params, SITE_URL)),
            forms: Arc::new(FormSubmissionService::new(
                content.clone(),
                Arc::new(FixedVerifier("valid-token")),
                NewsletterService::new(audience.clone()),
            )),
            stars: Arc::new(StarCountService::new(stars.clone(), cache.clone())),
            health: Arc::new(AlwaysHealthy),
            draft_secret: Some(DRAFT_SECRET.to_string()),
            site_url: SITE_URL.to_string(),
            default_locale: Locale::En,
            cache: Some(CacheState {
                cache: cache.clone(),
                bypass_cookie: DRAFT_COOKIE,
            }),
        };
        let admin_state = AdminState {
            mutations: mutations.clone(),
            admin_token: Some(ADMIN_TOKEN.to_string()),
        };

        Self {
            store,
            cache,
            recorder,
            audience,
            stars,
            mutations,
            content,
            public: build_router(http_state),
            admin: build_admin_router(admin_state),
        }
    }

    pub async fn get(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .uri(path)
            .body(Body::empty())
            .expect("request");
        send(&self.public, request).await
    }

    pub async fn get_with_cookie(&self, path: &str, cookie: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .uri(path)
            .header("cookie", cookie)
            .body(Body::empty())
            .expect("request");
        send(&self.public, request).await
    }

    /// Upsert a document through the admin API, returning the response JSON.
    pub async fn put(&self, collection: &str, document: serde_json::Value) -> serde_json::Value {
        let request = Request::builder()
            .method("PUT")
            .uri(format!("/api/content/{collection}"))
            .header("authorization", format!("Bearer {ADMIN_TOKEN}"))
            .header("content-type", "application/json")
            .body(Body::from(document.to_string()))
            .expect("request");
        let (status, body) = send(&self.admin, request).await;
        assert_eq!(status, StatusCode::OK, "upsert failed: {body}");
        serde_json::from_str(&body).expect("json")
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = router.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

pub fn days_ago(days: i64) -> String {
    (OffsetDateTime::now_utc() - time::Duration::days(days))
        .format(&time::format_description::well_known::Rfc3339)
        .expect("rfc3339")
}
