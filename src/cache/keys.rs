//! Cache key and tag types.
//!
//! - [`CacheTag`]: invalidation label shared by many entries
//! - [`DataKey`]: memoized content query
//! - [`ResponseKey`]: rendered HTTP response

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::domain::types::Locale;

/// Invalidation label attached to cached queries and, through them, to responses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheTag(String);

impl CacheTag {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Every archive listing.
    pub fn archives() -> Self {
        Self::new("archives")
    }

    /// The archive of one category in one locale.
    pub fn category_archive(category_slug: &str, locale: Locale) -> Self {
        Self(format!("{category_slug}-archive-{}", locale.as_str()))
    }

    pub fn form(title: &str) -> Self {
        Self(format!("form-{title}"))
    }

    pub fn pages() -> Self {
        Self::new("pages")
    }

    pub fn partners() -> Self {
        Self::new("partners")
    }

    pub fn case_studies() -> Self {
        Self::new("case-studies")
    }

    pub fn globals() -> Self {
        Self::new("globals")
    }

    pub fn redirects() -> Self {
        Self::new("redirects")
    }

    /// The repository star count shown in the header.
    pub fn star_count() -> Self {
        Self::new("star-count")
    }
}

impl fmt::Display for CacheTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Entity kinds enumerated for pre-rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Pages,
    Posts,
    Archives,
    Partners,
    CaseStudies,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Pages => "pages",
            EntityKind::Posts => "allPosts",
            EntityKind::Archives => "archives",
            EntityKind::Partners => "partners",
            EntityKind::CaseStudies => "case-studies",
        }
    }
}

/// Key of a memoized content query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataKey(String);

impl DataKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn page(slug_path: &str, locale: Locale) -> Self {
        Self(format!("page-{slug_path}-{locale}"))
    }

    /// Published page listing of one locale.
    pub fn pages(locale: Locale) -> Self {
        Self(format!("pages-{locale}"))
    }

    pub fn post(category_slug: &str, slug: &str, locale: Locale) -> Self {
        Self(format!("post-{slug}-{locale}@{category_slug}"))
    }

    pub fn blog_posts(locale: Locale) -> Self {
        Self(format!("blogPosts-{locale}"))
    }

    pub fn archive(category_slug: &str, locale: Locale) -> Self {
        Self(format!("{category_slug}-archive-{locale}"))
    }

    pub fn archives(locale: Locale, excluding: Option<&str>) -> Self {
        match excluding {
            Some(slug) => Self(format!("archives-{locale}-without-{slug}")),
            None => Self(format!("archives-{locale}")),
        }
    }

    pub fn globals(locale: Locale) -> Self {
        Self(format!("globals-{locale}"))
    }

    pub fn global(slug: &str, locale: Locale) -> Self {
        Self(format!("global-{slug}-{locale}"))
    }

    pub fn form(title: &str, locale: Locale) -> Self {
        Self(format!("form-{title}-{locale}"))
    }

    pub fn partners() -> Self {
        Self::new_static("partners")
    }

    pub fn partner(slug: &str) -> Self {
        Self(format!("partner-{slug}"))
    }

    pub fn partner_filters() -> Self {
        Self::new_static("partner-filters")
    }

    pub fn case_study(slug: &str, locale: Locale) -> Self {
        Self(format!("case-study-{slug}-{locale}"))
    }

    pub fn redirect(from: &str) -> Self {
        Self(format!("redirect-{from}"))
    }

    /// Path enumeration memo, keyed by `(entity-kind, locale, optional category)`.
    pub fn params(kind: EntityKind, locale: Locale, category: Option<&str>) -> Self {
        match category {
            Some(category) => Self(format!("{}-{locale}-{category}", kind.as_str())),
            None => Self(format!("{}-{locale}", kind.as_str())),
        }
    }

    pub fn star_count() -> Self {
        Self::new_static("star-count")
    }

    fn new_static(value: &'static str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key of a cached rendered response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResponseKey {
    pub path: String,
    pub query_hash: u64,
}

impl ResponseKey {
    pub fn new(path: impl Into<String>, query: &str) -> Self {
        Self {
            path: path.into(),
            query_hash: hash_query(query),
        }
    }
}

/// Any entry tracked by the tag registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Data(DataKey),
    Response(ResponseKey),
}

pub fn hash_query(query: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    query.hash(&mut hasher);
    hasher.finish()
}
