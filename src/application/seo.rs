//! Document metadata: title, description, Open Graph and robots directives.

use url::Url;

use crate::domain::entities::{
    CaseStudyRecord, CategoryRecord, PageRecord, PartnerRecord, PostRecord,
};
use crate::domain::types::{FeaturedMedia, Locale};
use crate::presentation::i18n;

pub const SITE_NAME: &str = "SafeCircle";
pub const PAGE_TITLE_FALLBACK: &str = "Safecircle";
pub const DEFAULT_DESCRIPTION: &str = "SafeCircle is a privacy-first digital safety platform designed to protect families and educational institutions online ";
pub const DEFAULT_OG_IMAGE: &str = "/images/og-image.jpg";

/// Open Graph properties; unset fields take the site defaults on merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenGraph {
    pub og_type: Option<String>,
    pub site_name: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub images: Option<Vec<String>>,
}

/// Open Graph with every default filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOpenGraph {
    pub og_type: String,
    pub site_name: String,
    pub title: String,
    pub description: String,
    pub url: Option<String>,
    pub images: Vec<String>,
}

/// Overlay `og` on the site defaults. Images are replaced wholesale, never merged.
pub fn merge_open_graph(og: Option<OpenGraph>) -> ResolvedOpenGraph {
    let og = og.unwrap_or_default();
    ResolvedOpenGraph {
        og_type: og.og_type.unwrap_or_else(|| "website".to_string()),
        site_name: og.site_name.unwrap_or_else(|| SITE_NAME.to_string()),
        title: og.title.unwrap_or_else(|| SITE_NAME.to_string()),
        description: og
            .description
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
        url: og.url,
        images: og
            .images
            .unwrap_or_else(|| vec![DEFAULT_OG_IMAGE.to_string()]),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: String,
    pub description: Option<String>,
    pub open_graph: ResolvedOpenGraph,
    pub robots: Option<String>,
}

impl PageMetadata {
    /// Metadata of pages without a document, such as the partner directory.
    pub fn simple(title: impl Into<String>, description: Option<String>) -> Self {
        let title = title.into();
        Self {
            open_graph: merge_open_graph(Some(OpenGraph {
                title: Some(title.clone()),
                description: description.clone(),
                ..Default::default()
            })),
            title,
            description,
            robots: None,
        }
    }

    pub fn not_found() -> Self {
        let mut metadata = Self::simple(format!("Not found | {SITE_NAME}"), None);
        metadata.robots = Some("noindex".to_string());
        metadata
    }
}

pub fn page_metadata(page: Option<&PageRecord>, segments: &[String]) -> PageMetadata {
    let meta = page.map(|page| &page.meta);
    let title = meta
        .and_then(|meta| meta.title.clone())
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| PAGE_TITLE_FALLBACK.to_string());
    let description = meta.and_then(|meta| meta.description.clone());
    let image = meta
        .and_then(|meta| meta.image.as_ref())
        .map(|image| image.url.clone());
    let url = if segments.is_empty() {
        "/".to_string()
    } else {
        segments.join("/")
    };

    PageMetadata {
        open_graph: merge_open_graph(Some(OpenGraph {
            description: description.clone(),
            images: image.map(|url| vec![url]),
            title: Some(title.clone()),
            url: Some(url),
            ..Default::default()
        })),
        title,
        description,
        robots: page
            .filter(|page| page.noindex)
            .map(|_| "noindex".to_string()),
    }
}

/// Og image of a post: explicit meta image, then the uploaded image, then a
/// generated card for video posts.
pub fn post_og_image(post: &PostRecord, category_slug: &str, site_url: &str) -> Option<String> {
    if let Some(image) = post.meta.image.as_ref() {
        return Some(image.url.clone());
    }
    match post.featured_media {
        FeaturedMedia::Upload => post.image.as_ref().map(|image| image.url.clone()),
        FeaturedMedia::VideoUrl if post.video_url.is_some() => {
            generated_og_url(site_url, category_slug, &post.title)
        }
        FeaturedMedia::VideoUrl => None,
    }
}

fn generated_og_url(site_url: &str, category_slug: &str, title: &str) -> Option<String> {
    let mut url = Url::parse(site_url).ok()?.join("/api/og").ok()?;
    url.query_pairs_mut()
        .append_pair("type", category_slug)
        .append_pair("title", title);
    Some(url.into())
}

pub fn post_metadata(
    post: Option<&PostRecord>,
    category_slug: &str,
    slug: &str,
    site_url: &str,
) -> PageMetadata {
    let description = post.and_then(|post| post.meta.description.clone());
    let meta_title = post.and_then(|post| post.meta.title.clone());
    let image = post.and_then(|post| post_og_image(post, category_slug, site_url));

    PageMetadata {
        open_graph: merge_open_graph(Some(OpenGraph {
            description: description.clone(),
            images: image.map(|url| vec![url]),
            title: meta_title.clone(),
            url: Some(format!("/{category_slug}/{slug}")),
            ..Default::default()
        })),
        title: meta_title
            .or_else(|| post.map(|post| post.title.clone()))
            .unwrap_or_else(|| PAGE_TITLE_FALLBACK.to_string()),
        description,
        robots: None,
    }
}

pub fn archive_metadata(category: &CategoryRecord) -> PageMetadata {
    PageMetadata::simple(
        format!("{} | {SITE_NAME}", category.name),
        category.description.clone(),
    )
}

/// The partner directory has no document of its own; its copy is localized here.
pub fn partners_metadata(locale: Locale) -> PageMetadata {
    let strings = i18n::strings(locale);
    PageMetadata::simple(
        strings.find_partner,
        Some(strings.connect_with_expert.to_string()),
    )
}

pub fn partner_metadata(partner: &PartnerRecord) -> PageMetadata {
    let mut metadata = PageMetadata::simple(
        format!("{} | {SITE_NAME}", partner.name),
        Some(partner.summary.clone()).filter(|summary| !summary.is_empty()),
    );
    if let Some(logo) = partner.logo.as_ref() {
        metadata.open_graph.images = vec![logo.url.clone()];
    }
    metadata
}

pub fn case_study_metadata(study: &CaseStudyRecord) -> PageMetadata {
    let title = study
        .meta
        .title
        .clone()
        .unwrap_or_else(|| format!("{} | {SITE_NAME}", study.title));
    let mut metadata = PageMetadata::simple(title, study.meta.description.clone());
    if let Some(image) = study.meta.image.as_ref() {
        metadata.open_graph.images = vec![image.url.clone()];
    }
    metadata
}
