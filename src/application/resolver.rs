//! Page resolution by slug path.
//!
//! A page is addressed by the slugs of its ancestors and itself. The store is
//! queried by the terminal slug only; candidates sharing that slug are told
//! apart by the url of their last breadcrumb.

use std::sync::Arc;

use tracing::debug;

use crate::application::repos::{PagesRepo, RepoError};
use crate::domain::entities::PageRecord;
use crate::domain::paths::{breadcrumb_matches, join_path, slug_segments};
use crate::domain::types::{Locale, Visibility};

#[derive(Clone)]
pub struct PageResolver {
    pages: Arc<dyn PagesRepo>,
}

impl PageResolver {
    pub fn new(pages: Arc<dyn PagesRepo>) -> Self {
        Self { pages }
    }

    pub async fn resolve<S: AsRef<str>>(
        &self,
        segments: &[S],
        locale: Locale,
        visibility: Visibility,
    ) -> Result<Option<PageRecord>, RepoError> {
        let segments = slug_segments(segments);
        let expected = join_path(&segments);
        let Some(last) = segments.last() else {
            return Ok(None);
        };

        let candidates = self
            .pages
            .find_pages_by_slug(last, locale, visibility)
            .await?;
        let resolved = select_page(candidates, &expected, last, locale);

        debug!(
            target: "safecircle::application::resolver",
            path = %expected,
            %locale,
            found = resolved.is_some(),
            "resolved page"
        );
        Ok(resolved)
    }
}

/// Pick the candidate whose last breadcrumb addresses `expected`, else the
/// first candidate whose own slug is `slug`.
pub fn select_page(
    candidates: Vec<PageRecord>,
    expected: &str,
    slug: &str,
    locale: Locale,
) -> Option<PageRecord> {
    let by_breadcrumb = candidates.iter().position(|page| {
        page.resolved_url()
            .is_some_and(|url| breadcrumb_matches(url, expected, locale))
    });
    let index = by_breadcrumb.or_else(|| candidates.iter().position(|page| page.slug == slug))?;
    candidates.into_iter().nth(index)
}
