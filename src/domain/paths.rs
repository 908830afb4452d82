//! Path helpers shared by the resolver, breadcrumbs and path enumeration.

use slug::slugify;

use super::error::DomainError;
use super::types::Locale;

/// Slug used when a request carries no path segments.
pub const HOME_SLUG: &str = "home";

/// Normalise incoming slug segments, substituting the home slug when empty.
pub fn slug_segments<S: AsRef<str>>(segments: &[S]) -> Vec<String> {
    let cleaned: Vec<String> = segments
        .iter()
        .map(|segment| segment.as_ref().trim_matches('/').to_string())
        .filter(|segment| !segment.is_empty())
        .collect();

    if cleaned.is_empty() {
        vec![HOME_SLUG.to_string()]
    } else {
        cleaned
    }
}

/// `/` followed by the segments joined with `/`.
pub fn join_path<S: AsRef<str>>(segments: &[S]) -> String {
    let joined = segments
        .iter()
        .map(|segment| segment.as_ref())
        .collect::<Vec<_>>()
        .join("/");
    format!("/{joined}")
}

/// Split a path into its segments, dropping one leading and one trailing `/`.
pub fn path_segments(path: &str) -> Vec<String> {
    if path.is_empty() || path == "/" {
        return Vec::new();
    }
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    trimmed.split('/').map(str::to_string).collect()
}

/// Breadcrumb url built from ancestor slugs followed by the document's own slug.
pub fn breadcrumb_url<S: AsRef<str>>(ancestors_and_self: &[S]) -> String {
    ancestors_and_self
        .iter()
        .map(|slug| format!("/{}", slug.as_ref()))
        .collect()
}

/// Whether a breadcrumb url addresses `page_path` in the given locale.
///
/// Accepts the exact path, the locale-prefixed path, and the path with its first
/// `/{locale}` occurrence removed.
pub fn breadcrumb_matches(url: &str, page_path: &str, locale: Locale) -> bool {
    let prefix = format!("/{}", locale.as_str());
    url == page_path
        || url == format!("{prefix}{page_path}")
        || url == page_path.replacen(&prefix, "", 1)
}

/// Public paths of a post, its archive and a category index.
pub fn post_path(category_slug: &str, slug: &str) -> String {
    format!("/posts/{category_slug}/{slug}")
}

pub fn archive_path(category_slug: &str) -> String {
    format!("/posts/{category_slug}")
}

/// Prefix a site path with a locale segment.
pub fn localized_path(locale: Locale, path: &str) -> String {
    if path == "/" || path.is_empty() {
        format!("/{}", locale.as_str())
    } else {
        format!("/{}{}", locale.as_str(), path)
    }
}

/// Validate an explicit slug or derive one from a title.
pub fn normalize_slug(explicit: Option<&str>, title: &str) -> Result<String, DomainError> {
    let source = explicit
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(title);
    let slug = slugify(source);
    if slug.is_empty() {
        return Err(DomainError::validation(format!(
            "cannot derive a slug from `{source}`"
        )));
    }
    Ok(slug)
}
