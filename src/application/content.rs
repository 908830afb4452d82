//! Memoized content reads.
//!
//! Every published read goes through the tag-scoped data cache under the key
//! and tags the revalidation hooks know about. Draft reads go straight to the
//! store.

use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{ContentRepos, RepoError};
use crate::application::resolver::PageResolver;
use crate::cache::{CacheTag, DataKey, SiteCache};
use crate::domain::entities::{
    ArchiveRecord, CaseStudyRecord, CategoryRecord, FormRecord, PageRecord, PartnerFilters,
    PartnerRecord, PostRecord, RedirectRecord, SiteGlobals,
};
use crate::domain::paths::slug_segments;
use crate::domain::types::{GlobalSlug, Locale, Visibility};

/// Slug kept out of page listings.
pub const EXCLUDED_PAGE_SLUG: &str = "cloud";
pub const PAGE_LIST_LIMIT: u32 = 300;
pub const FILTER_LIMIT: u32 = 100;

/// Partner directory filters taken from the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PartnerQuery {
    pub industry: Option<String>,
    pub specialty: Option<String>,
    pub region: Option<String>,
    pub budget: Option<String>,
}

impl PartnerQuery {
    pub fn is_empty(&self) -> bool {
        self.industry.is_none()
            && self.specialty.is_none()
            && self.region.is_none()
            && self.budget.is_none()
    }

    pub fn matches(&self, partner: &PartnerRecord) -> bool {
        fn admits(filter: &Option<String>, values: &[String]) -> bool {
            match filter.as_deref().filter(|value| !value.is_empty()) {
                Some(wanted) => values.iter().any(|value| value == wanted),
                None => true,
            }
        }
        admits(&self.industry, &partner.industries)
            && admits(&self.specialty, &partner.specialties)
            && admits(&self.region, &partner.regions)
            && admits(&self.budget, &partner.budgets)
    }
}

#[derive(Clone)]
pub struct ContentService {
    repos: ContentRepos,
    cache: Arc<SiteCache>,
    resolver: PageResolver,
}

impl ContentService {
    pub fn new(repos: ContentRepos, cache: Arc<SiteCache>) -> Self {
        let resolver = PageResolver::new(repos.pages.clone());
        Self {
            repos,
            cache,
            resolver,
        }
    }

    pub fn repos(&self) -> &ContentRepos {
        &self.repos
    }

    pub fn cache(&self) -> &Arc<SiteCache> {
        &self.cache
    }

    pub async fn page<S: AsRef<str>>(
        &self,
        segments: &[S],
        locale: Locale,
        visibility: Visibility,
    ) -> Result<Option<PageRecord>, RepoError> {
        let segments = slug_segments(segments);
        let key = DataKey::page(&segments.join("/"), locale);
        self.cache
            .get_or_load(visibility, key, vec![CacheTag::pages()], || {
                self.resolver.resolve(&segments, locale, visibility)
            })
            .await
    }

    pub async fn pages(&self, locale: Locale) -> Result<Vec<PageRecord>, RepoError> {
        self.cache
            .get_or_load(
                Visibility::Published,
                DataKey::pages(locale),
                vec![CacheTag::pages()],
                || {
                    self.repos.pages.list_published_pages(
                        locale,
                        Some(EXCLUDED_PAGE_SLUG),
                        PAGE_LIST_LIMIT,
                    )
                },
            )
            .await
    }

    pub async fn post(
        &self,
        category_slug: &str,
        slug: &str,
        locale: Locale,
        visibility: Visibility,
    ) -> Result<Option<PostRecord>, RepoError> {
        self.cache
            .get_or_load(
                visibility,
                DataKey::post(category_slug, slug, locale),
                vec![
                    CacheTag::archives(),
                    CacheTag::category_archive(category_slug, locale),
                ],
                || {
                    self.repos
                        .posts
                        .find_post(slug, category_slug, locale, visibility)
                },
            )
            .await
    }

    /// Published posts that carry a category, for path enumeration.
    pub async fn posts(&self, locale: Locale) -> Result<Vec<PostRecord>, RepoError> {
        let posts = self.repos.posts.list_published_posts(locale).await?;
        Ok(posts
            .into_iter()
            .filter(|post| post.category.is_some())
            .collect())
    }

    /// Published posts already live at `now`, newest first.
    pub async fn blog_posts(
        &self,
        locale: Locale,
        now: OffsetDateTime,
    ) -> Result<Vec<PostRecord>, RepoError> {
        self.cache
            .get_or_load(
                Visibility::Published,
                DataKey::blog_posts(locale),
                vec![CacheTag::archives()],
                || {
                    self.repos
                        .posts
                        .list_posts_published_before(locale, None, now)
                },
            )
            .await
    }

    pub async fn archive(
        &self,
        category_slug: &str,
        locale: Locale,
        now: OffsetDateTime,
    ) -> Result<Option<ArchiveRecord>, RepoError> {
        self.cache
            .get_or_load(
                Visibility::Published,
                DataKey::archive(category_slug, locale),
                vec![
                    CacheTag::archives(),
                    CacheTag::category_archive(category_slug, locale),
                ],
                || async move {
                    let Some(category) = self
                        .repos
                        .categories
                        .find_category_by_slug(category_slug, locale)
                        .await?
                    else {
                        return Ok(None);
                    };
                    let posts = self
                        .repos
                        .posts
                        .list_posts_published_before(locale, Some(category.id), now)
                        .await?;
                    Ok::<_, RepoError>(Some(ArchiveRecord { category, posts }))
                },
            )
            .await
    }

    pub async fn categories(
        &self,
        locale: Locale,
        excluding: Option<&str>,
    ) -> Result<Vec<CategoryRecord>, RepoError> {
        self.cache
            .get_or_load(
                Visibility::Published,
                DataKey::archives(locale, excluding),
                vec![CacheTag::archives()],
                || self.repos.categories.list_categories(locale, excluding),
            )
            .await
    }

    pub async fn partners(
        &self,
        query: &PartnerQuery,
        visibility: Visibility,
    ) -> Result<Vec<PartnerRecord>, RepoError> {
        let partners: Vec<PartnerRecord> = self
            .cache
            .get_or_load(
                visibility,
                DataKey::partners(),
                vec![CacheTag::partners()],
                || self.repos.partners.list_active_partners(visibility),
            )
            .await?;
        Ok(partners
            .into_iter()
            .filter(|partner| query.matches(partner))
            .collect())
    }

    pub async fn partner(
        &self,
        slug: &str,
        visibility: Visibility,
    ) -> Result<Option<PartnerRecord>, RepoError> {
        self.cache
            .get_or_load(
                visibility,
                DataKey::partner(slug),
                vec![CacheTag::partners()],
                || self.repos.partners.find_partner(slug, visibility),
            )
            .await
    }

    pub async fn partner_filters(&self) -> Result<PartnerFilters, RepoError> {
        self.cache
            .get_or_load(
                Visibility::Published,
                DataKey::partner_filters(),
                vec![CacheTag::partners()],
                || self.repos.partners.partner_filters(FILTER_LIMIT),
            )
            .await
    }

    pub async fn case_study(
        &self,
        slug: &str,
        locale: Locale,
        visibility: Visibility,
    ) -> Result<Option<CaseStudyRecord>, RepoError> {
        self.cache
            .get_or_load(
                visibility,
                DataKey::case_study(slug, locale),
                vec![CacheTag::case_studies()],
                || {
                    self.repos
                        .case_studies
                        .find_case_study(slug, locale, visibility)
                },
            )
            .await
    }

    pub async fn case_studies(&self, locale: Locale) -> Result<Vec<CaseStudyRecord>, RepoError> {
        self.repos
            .case_studies
            .list_published_case_studies(locale)
            .await
    }

    /// Main menu, footer and top bar of one locale.
    pub async fn globals(&self, locale: Locale) -> Result<SiteGlobals, RepoError> {
        self.cache
            .get_or_load(
                Visibility::Published,
                DataKey::globals(locale),
                vec![CacheTag::globals()],
                || async move {
                    Ok::<_, RepoError>(SiteGlobals {
                        main_menu: self
                            .load_global(GlobalSlug::MainMenu, locale)
                            .await?
                            .unwrap_or_default(),
                        footer: self
                            .load_global(GlobalSlug::Footer, locale)
                            .await?
                            .unwrap_or_default(),
                        top_bar: self
                            .load_global(GlobalSlug::TopBar, locale)
                            .await?
                            .unwrap_or_default(),
                    })
                },
            )
            .await
    }

    /// One global decoded into `T`.
    pub async fn global<T>(&self, slug: GlobalSlug, locale: Locale) -> Result<Option<T>, RepoError>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        self.cache
            .get_or_load(
                Visibility::Published,
                DataKey::global(slug.as_str(), locale),
                vec![CacheTag::globals()],
                || self.load_global(slug, locale),
            )
            .await
    }

    async fn load_global<T: DeserializeOwned>(
        &self,
        slug: GlobalSlug,
        locale: Locale,
    ) -> Result<Option<T>, RepoError> {
        let Some(record) = self.repos.globals.find_global(slug, locale).await? else {
            return Ok(None);
        };
        serde_json::from_value(record.data)
            .map(Some)
            .map_err(|err| RepoError::decode(format!("global `{}`: {err}", slug.as_str())))
    }

    /// A form by id, tagged with its title once loaded.
    pub async fn form(&self, id: Uuid, locale: Locale) -> Result<Option<FormRecord>, RepoError> {
        self.cache
            .get_or_load_tagged(
                Visibility::Published,
                DataKey::form(&id.to_string(), locale),
                self.cache.config().data_ttl(),
                || async move {
                    let form = self.repos.forms.find_form(id, locale).await?;
                    let tags = form
                        .as_ref()
                        .map(|form| vec![CacheTag::form(&form.title)])
                        .unwrap_or_default();
                    Ok::<_, RepoError>((form, tags))
                },
            )
            .await
    }

    pub async fn form_by_title(
        &self,
        title: &str,
        locale: Locale,
    ) -> Result<Option<FormRecord>, RepoError> {
        self.cache
            .get_or_load(
                Visibility::Published,
                DataKey::form(title, locale),
                vec![CacheTag::form(title)],
                || self.repos.forms.find_form_by_title(title, locale),
            )
            .await
    }

    pub async fn redirect(&self, path: &str) -> Result<Option<RedirectRecord>, RepoError> {
        self.cache
            .get_or_load(
                Visibility::Published,
                DataKey::redirect(path),
                vec![CacheTag::redirects()],
                || self.repos.redirects.find_redirect(path),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::domain::types::{AgencyStatus, DocumentStatus};

    fn partner(industries: &[&str], regions: &[&str]) -> PartnerRecord {
        PartnerRecord {
            id: Uuid::new_v4(),
            status: DocumentStatus::Published,
            agency_status: AgencyStatus::Active,
            name: "Acme".into(),
            slug: "acme".into(),
            website: None,
            summary: String::new(),
            logo: None,
            featured: false,
            industries: industries.iter().map(|value| value.to_string()).collect(),
            specialties: Vec::new(),
            regions: regions.iter().map(|value| value.to_string()).collect(),
            budgets: Vec::new(),
        }
    }

    #[test]
    fn empty_query_admits_everything() {
        assert!(PartnerQuery::default().matches(&partner(&[], &[])));
    }

    #[test]
    fn filters_combine_with_and() {
        let query = PartnerQuery {
            industry: Some("education".into()),
            region: Some("eu".into()),
            ..Default::default()
        };
        assert!(query.matches(&partner(&["education"], &["eu", "us"])));
        assert!(!query.matches(&partner(&["education"], &["us"])));
    }

    #[test]
    fn blank_filter_values_are_ignored() {
        let query = PartnerQuery {
            budget: Some(String::new()),
            ..Default::default()
        };
        assert!(query.matches(&partner(&[], &[])));
    }
}
