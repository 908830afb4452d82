//! Revalidation plans.
//!
//! Turns a mutation's current and previous state into the ordered list of
//! path and tag invalidations the hooks execute.

use std::fmt;

use super::keys::CacheTag;
use crate::domain::paths::{HOME_SLUG, archive_path, post_path};
use crate::domain::types::Locale;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invalidation {
    Path(String),
    Tag(CacheTag),
}

impl fmt::Display for Invalidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invalidation::Path(path) => write!(f, "path {path}"),
            Invalidation::Tag(tag) => write!(f, "tag {tag}"),
        }
    }
}

/// Where a post is served: its category slug and its own slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostLocation {
    pub category_slug: String,
    pub slug: String,
}

impl PostLocation {
    pub fn new(category_slug: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            category_slug: category_slug.into(),
            slug: slug.into(),
        }
    }
}

/// Ordered, duplicate-free invalidations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevalidationPlan {
    steps: Vec<Invalidation>,
}

impl RevalidationPlan {
    pub fn steps(&self) -> &[Invalidation] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().filter_map(|step| match step {
            Invalidation::Path(path) => Some(path.as_str()),
            Invalidation::Tag(_) => None,
        })
    }

    pub fn tags(&self) -> impl Iterator<Item = &CacheTag> {
        self.steps.iter().filter_map(|step| match step {
            Invalidation::Tag(tag) => Some(tag),
            Invalidation::Path(_) => None,
        })
    }

    pub fn path(&mut self, path: impl Into<String>) -> &mut Self {
        self.push(Invalidation::Path(path.into()))
    }

    pub fn tag(&mut self, tag: CacheTag) -> &mut Self {
        self.push(Invalidation::Tag(tag))
    }

    fn push(&mut self, step: Invalidation) -> &mut Self {
        if !self.steps.contains(&step) {
            self.steps.push(step);
        }
        self
    }

    fn archive_tags(&mut self, category_slug: &str) -> &mut Self {
        for locale in Locale::ALL {
            self.tag(CacheTag::category_archive(category_slug, locale));
        }
        self
    }

    /// Category created or updated.
    pub fn category_changed(slug: &str, previous_slug: Option<&str>) -> Self {
        let mut plan = Self::category_deleted(slug);
        if let Some(previous) = previous_slug.filter(|previous| *previous != slug) {
            plan.path(archive_path(previous)).archive_tags(previous);
        }
        plan
    }

    pub fn category_deleted(slug: &str) -> Self {
        let mut plan = Self::default();
        plan.path(archive_path(slug))
            .tag(CacheTag::archives())
            .archive_tags(slug);
        plan
    }

    /// Post created or updated. Locations are absent for uncategorized posts.
    pub fn post_changed(current: Option<&PostLocation>, previous: Option<&PostLocation>) -> Self {
        let mut plan = Self::default();
        if let Some(current) = current {
            plan.post_location(current);
        }
        if let Some(previous) = previous.filter(|previous| Some(*previous) != current) {
            plan.post_location(previous);
        }
        plan
    }

    pub fn post_deleted(location: Option<&PostLocation>) -> Self {
        let mut plan = Self::default();
        if let Some(location) = location {
            plan.path(archive_path(&location.category_slug))
                .path(post_path(&location.category_slug, &location.slug))
                .tag(CacheTag::archives())
                .archive_tags(&location.category_slug);
        }
        plan
    }

    fn post_location(&mut self, location: &PostLocation) {
        self.path(post_path(&location.category_slug, &location.slug))
            .path(archive_path(&location.category_slug))
            .tag(CacheTag::archives())
            .archive_tags(&location.category_slug);
    }

    /// Page changed or deleted; `urls` are its current and previous breadcrumb urls.
    pub fn page_changed<'a>(urls: impl IntoIterator<Item = &'a str>) -> Self {
        let mut plan = Self::default();
        for url in urls {
            plan.path(url.to_string());
            if url == format!("/{HOME_SLUG}") {
                plan.path("/");
            }
        }
        plan.tag(CacheTag::pages());
        plan
    }

    pub fn partner_changed<'a>(slugs: impl IntoIterator<Item = &'a str>) -> Self {
        let mut plan = Self::default();
        plan.path("/partners");
        for slug in slugs {
            plan.path(format!("/partners/{slug}"));
        }
        plan.tag(CacheTag::partners());
        plan
    }

    pub fn case_study_changed<'a>(slugs: impl IntoIterator<Item = &'a str>) -> Self {
        let mut plan = Self::default();
        for slug in slugs {
            plan.path(format!("/case-studies/{slug}"));
        }
        plan.tag(CacheTag::case_studies());
        plan
    }

    pub fn form_changed<'a>(titles: impl IntoIterator<Item = &'a str>) -> Self {
        let mut plan = Self::default();
        for title in titles {
            plan.tag(CacheTag::form(title));
        }
        plan
    }

    pub fn global_changed() -> Self {
        let mut plan = Self::default();
        plan.tag(CacheTag::globals());
        plan
    }

    pub fn redirect_changed() -> Self {
        let mut plan = Self::default();
        plan.tag(CacheTag::redirects());
        plan
    }

    /// Manual invalidation request.
    pub fn manual<'a>(
        paths: impl IntoIterator<Item = &'a str>,
        tags: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let mut plan = Self::default();
        for path in paths {
            plan.path(path.to_string());
        }
        for tag in tags {
            plan.tag(CacheTag::new(tag));
        }
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag_names(plan: &RevalidationPlan) -> Vec<String> {
        plan.tags().map(|tag| tag.as_str().to_string()).collect()
    }

    #[test]
    fn category_rename_covers_old_and_new_archives() {
        let plan = RevalidationPlan::category_changed("updates", Some("news"));
        assert_eq!(plan.paths().collect::<Vec<_>>(), ["/posts/updates", "/posts/news"]);
        assert_eq!(
            tag_names(&plan),
            [
                "archives",
                "updates-archive-en",
                "updates-archive-es",
                "updates-archive-fr",
                "news-archive-en",
                "news-archive-es",
                "news-archive-fr",
            ]
        );
    }

    #[test]
    fn category_update_without_rename_skips_previous() {
        let plan = RevalidationPlan::category_changed("news", Some("news"));
        assert_eq!(plan.len(), 5);
    }

    #[test]
    fn post_move_invalidates_both_categories() {
        let current = PostLocation::new("updates", "hello-world");
        let previous = PostLocation::new("news", "hello-world");
        let plan = RevalidationPlan::post_changed(Some(&current), Some(&previous));

        let paths: Vec<_> = plan.paths().collect();
        assert_eq!(
            paths,
            [
                "/posts/updates/hello-world",
                "/posts/updates",
                "/posts/news/hello-world",
                "/posts/news",
            ]
        );
        assert_eq!(plan.tags().filter(|tag| tag.as_str() == "archives").count(), 1);
    }

    #[test]
    fn post_delete_touches_only_its_category() {
        let location = PostLocation::new("news", "hello-world");
        let plan = RevalidationPlan::post_deleted(Some(&location));
        assert_eq!(
            plan.paths().collect::<Vec<_>>(),
            ["/posts/news", "/posts/news/hello-world"]
        );
        assert!(tag_names(&plan).iter().all(|tag| tag == "archives" || tag.starts_with("news-archive-")));
    }

    #[test]
    fn uncategorized_post_plans_nothing() {
        assert!(RevalidationPlan::post_changed(None, None).is_empty());
        assert!(RevalidationPlan::post_deleted(None).is_empty());
    }

    #[test]
    fn home_page_also_invalidates_root() {
        let plan = RevalidationPlan::page_changed(["/home"]);
        assert_eq!(plan.paths().collect::<Vec<_>>(), ["/home", "/"]);
        assert_eq!(tag_names(&plan), ["pages"]);
    }
}
