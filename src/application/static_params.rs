//! Enumeration of every pre-renderable path.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use crate::application::content::ContentService;
use crate::application::repos::RepoError;
use crate::cache::{CacheTag, DataKey, EntityKind, SiteCache};
use crate::domain::paths::{HOME_SLUG, archive_path, localized_path, path_segments, post_path};
use crate::domain::types::{Locale, Visibility};

/// Route parameters of one published page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageParams {
    pub locale: Locale,
    pub slug: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostParams {
    pub locale: Locale,
    pub category: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveParams {
    pub locale: Locale,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlugParams {
    pub locale: Locale,
    pub slug: String,
}

#[derive(Clone)]
pub struct StaticParams {
    content: ContentService,
    cache: Arc<SiteCache>,
}

impl StaticParams {
    pub fn new(content: ContentService) -> Self {
        let cache = content.cache().clone();
        Self { content, cache }
    }

    pub async fn pages(&self, locale: Locale) -> Result<Vec<PageParams>, RepoError> {
        self.cache
            .get_or_load(
                Visibility::Published,
                DataKey::params(EntityKind::Pages, locale, None),
                vec![CacheTag::pages()],
                || async move {
                    let pages = self.content.pages(locale).await?;
                    Ok::<_, RepoError>(
                        pages
                            .iter()
                            .filter_map(|page| page.resolved_url())
                            .map(|url| PageParams {
                                locale,
                                slug: path_segments(url),
                            })
                            .collect(),
                    )
                },
            )
            .await
    }

    /// Posts joined with their category slug; uncategorized posts are skipped.
    pub async fn posts(
        &self,
        locale: Locale,
        category: Option<&str>,
    ) -> Result<Vec<PostParams>, RepoError> {
        self.cache
            .get_or_load(
                Visibility::Published,
                DataKey::params(EntityKind::Posts, locale, category),
                vec![CacheTag::archives()],
                || async move {
                    let posts = self.content.posts(locale).await?;
                    Ok::<_, RepoError>(
                        posts
                            .into_iter()
                            .filter_map(|post| {
                                let category_slug = post.category_slug()?.to_string();
                                if category.is_some_and(|wanted| wanted != category_slug) {
                                    return None;
                                }
                                Some(PostParams {
                                    locale,
                                    category: category_slug,
                                    slug: post.slug,
                                })
                            })
                            .collect(),
                    )
                },
            )
            .await
    }

    pub async fn archives(&self, locale: Locale) -> Result<Vec<ArchiveParams>, RepoError> {
        self.cache
            .get_or_load(
                Visibility::Published,
                DataKey::params(EntityKind::Archives, locale, None),
                vec![CacheTag::archives()],
                || async move {
                    let categories = self.content.categories(locale, None).await?;
                    Ok::<_, RepoError>(
                        categories
                            .into_iter()
                            .map(|category| ArchiveParams {
                                locale,
                                category: category.slug,
                            })
                            .collect(),
                    )
                },
            )
            .await
    }

    pub async fn partners(&self, locale: Locale) -> Result<Vec<SlugParams>, RepoError> {
        self.cache
            .get_or_load(
                Visibility::Published,
                DataKey::params(EntityKind::Partners, locale, None),
                vec![CacheTag::partners()],
                || async move {
                    let partners = self
                        .content
                        .partners(&Default::default(), Visibility::Published)
                        .await?;
                    Ok::<_, RepoError>(
                        partners
                            .into_iter()
                            .map(|partner| SlugParams {
                                locale,
                                slug: partner.slug,
                            })
                            .collect(),
                    )
                },
            )
            .await
    }

    pub async fn case_studies(&self, locale: Locale) -> Result<Vec<SlugParams>, RepoError> {
        self.cache
            .get_or_load(
                Visibility::Published,
                DataKey::params(EntityKind::CaseStudies, locale, None),
                vec![CacheTag::case_studies()],
                || async move {
                    let studies = self.content.case_studies(locale).await?;
                    Ok::<_, RepoError>(
                        studies
                            .into_iter()
                            .map(|study| SlugParams {
                                locale,
                                slug: study.slug,
                            })
                            .collect(),
                    )
                },
            )
            .await
    }

    /// Every published, locale-prefixed path across all entity kinds.
    pub async fn all_paths(&self) -> Result<Vec<String>, RepoError> {
        let mut paths = Vec::new();
        for locale in Locale::ALL {
            for page in self.pages(locale).await? {
                paths.push(page_path(locale, &page.slug));
            }
            for archive in self.archives(locale).await? {
                paths.push(localized_path(locale, &archive_path(&archive.category)));
            }
            for post in self.posts(locale, None).await? {
                paths.push(localized_path(locale, &post_path(&post.category, &post.slug)));
            }
            paths.push(localized_path(locale, "/partners"));
            for partner in self.partners(locale).await? {
                paths.push(localized_path(locale, &format!("/partners/{}", partner.slug)));
            }
            for study in self.case_studies(locale).await? {
                paths.push(localized_path(locale, &format!("/case-studies/{}", study.slug)));
            }
        }
        Ok(dedup_paths(paths))
    }
}

/// Drop repeated paths, keeping the first occurrence of each.
fn dedup_paths(mut paths: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    paths.retain(|path| seen.insert(path.clone()));
    paths
}

/// The home page is served at the locale root.
fn page_path(locale: Locale, segments: &[String]) -> String {
    match segments {
        [only] if only == HOME_SLUG => localized_path(locale, "/"),
        _ => localized_path(locale, &format!("/{}", segments.join("/"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn home_page_maps_to_locale_root() {
        assert_eq!(page_path(Locale::Es, &["home".to_string()]), "/es");
        assert_eq!(
            page_path(Locale::En, &["about".to_string(), "team".to_string()]),
            "/en/about/team"
        );
    }

    #[test]
    fn repeated_paths_are_dropped_in_order() {
        let paths = ["/en", "/en/partners", "/es", "/en", "/en/partners"]
            .map(String::from)
            .to_vec();
        assert_eq!(dedup_paths(paths), ["/en", "/en/partners", "/es"]);
    }
}
