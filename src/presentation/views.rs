use crate::application::error::{ErrorReport, HttpError};
use crate::application::seo::PageMetadata;
use crate::domain::blocks::MediaRef;
use crate::presentation::i18n::UiStrings;
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    let content = ErrorPageView::not_found(&chrome);
    let chrome = chrome.with_meta(SeoHead::new(PageMetadata::not_found(), None));
    let view = LayoutContext::new(chrome, content);
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavLinkView {
    pub label: String,
    pub href: String,
    pub new_tab: bool,
}

#[derive(Clone, Debug)]
pub struct TopBarView {
    pub message: String,
    pub link: Option<NavLinkView>,
}

#[derive(Clone, Debug)]
pub struct FooterColumnView {
    pub label: String,
    pub links: Vec<NavLinkView>,
}

#[derive(Clone, Debug)]
pub struct FooterView {
    pub columns: Vec<FooterColumnView>,
    pub copyright: String,
}

/// One entry of the language switcher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocaleLinkView {
    pub code: &'static str,
    pub label: &'static str,
    pub href: String,
    pub is_active: bool,
}

/// Analytics script injected client-side once the consent cookie is set.
#[derive(Clone, Debug)]
pub struct AnalyticsView {
    pub website_id: String,
    pub script_src: String,
    pub consent_cookie: &'static str,
    pub consent_value: &'static str,
}

/// Everything rendered into `<head>` for one document.
#[derive(Clone, Debug)]
pub struct SeoHead {
    pub title: String,
    pub description: Option<String>,
    pub og_type: String,
    pub og_site_name: String,
    pub og_title: String,
    pub og_description: String,
    pub og_url: Option<String>,
    pub og_images: Vec<String>,
    pub robots: Option<String>,
    pub canonical: Option<String>,
}

impl SeoHead {
    pub fn new(metadata: PageMetadata, canonical: Option<String>) -> Self {
        let PageMetadata {
            title,
            description,
            open_graph,
            robots,
        } = metadata;
        Self {
            title,
            description,
            og_type: open_graph.og_type,
            og_site_name: open_graph.site_name,
            og_title: open_graph.title,
            og_description: open_graph.description,
            og_url: open_graph.url,
            og_images: open_graph.images,
            robots,
            canonical,
        }
    }
}

#[derive(Clone)]
pub struct LayoutChrome {
    pub lang: &'static str,
    pub home_href: String,
    pub top_bar: Option<TopBarView>,
    pub menu: Vec<NavLinkView>,
    pub menu_cta: Option<NavLinkView>,
    pub footer: FooterView,
    pub locales: Vec<LocaleLinkView>,
    pub analytics: Option<AnalyticsView>,
    pub draft_mode: bool,
    pub strings: &'static UiStrings,
    pub meta: SeoHead,
}

impl LayoutChrome {
    pub fn with_meta(self, meta: SeoHead) -> Self {
        Self { meta, ..self }
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub lang: &'static str,
    pub home_href: String,
    pub top_bar: Option<TopBarView>,
    pub menu: Vec<NavLinkView>,
    pub menu_cta: Option<NavLinkView>,
    pub footer: FooterView,
    pub locales: Vec<LocaleLinkView>,
    pub analytics: Option<AnalyticsView>,
    pub draft_mode: bool,
    pub strings: &'static UiStrings,
    pub meta: SeoHead,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            lang: chrome.lang,
            home_href: chrome.home_href,
            top_bar: chrome.top_bar,
            menu: chrome.menu,
            menu_cta: chrome.menu_cta,
            footer: chrome.footer,
            locales: chrome.locales,
            analytics: chrome.analytics,
            draft_mode: chrome.draft_mode,
            strings: chrome.strings,
            meta: chrome.meta,
            content,
        }
    }
}

#[derive(Clone, Debug)]
pub struct HeroView {
    pub heading: Option<String>,
    pub rich_text_html: String,
    pub media: Option<MediaRef>,
    pub links: Vec<NavLinkView>,
}

pub struct PageView {
    pub title: String,
    pub hero: Option<HeroView>,
    pub blocks_html: Vec<String>,
    pub contains_code: bool,
}

#[derive(Template)]
#[template(path = "page.html")]
pub struct PageTemplate {
    pub view: LayoutContext<PageView>,
}

pub struct PostDetailView {
    pub title: String,
    pub category_name: Option<String>,
    pub category_href: Option<String>,
    pub published: Option<String>,
    pub iso_date: Option<String>,
    pub authors: Vec<String>,
    pub image: Option<MediaRef>,
    pub video_url: Option<String>,
    pub blocks_html: Vec<String>,
    pub contains_code: bool,
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub view: LayoutContext<PostDetailView>,
}

#[derive(Clone, Debug)]
pub struct PostCard {
    pub title: String,
    pub href: String,
    pub excerpt: String,
    pub published: Option<String>,
    pub iso_date: Option<String>,
    pub image: Option<MediaRef>,
}

pub struct ArchiveView {
    pub heading: String,
    pub headline: Option<String>,
    pub description: Option<String>,
    pub posts: Vec<PostCard>,
}

#[derive(Template)]
#[template(path = "archive.html")]
pub struct ArchiveTemplate {
    pub view: LayoutContext<ArchiveView>,
}

#[derive(Clone, Debug)]
pub struct FilterOptionView {
    pub value: String,
    pub name: String,
    pub selected: bool,
}

#[derive(Clone, Debug)]
pub struct FilterGroupView {
    /// Query parameter the group submits.
    pub param: &'static str,
    pub label: &'static str,
    pub options: Vec<FilterOptionView>,
}

#[derive(Clone, Debug)]
pub struct PartnerCard {
    pub name: String,
    pub href: String,
    pub summary: String,
    pub logo: Option<MediaRef>,
    pub featured: bool,
}

pub struct PartnerDirectoryView {
    pub featured_description: Option<String>,
    pub featured: Vec<PartnerCard>,
    pub before_html: Vec<String>,
    pub filters: Vec<FilterGroupView>,
    pub partners: Vec<PartnerCard>,
    pub after_html: Vec<String>,
    pub become_partner_href: String,
}

#[derive(Template)]
#[template(path = "partners.html")]
pub struct PartnersTemplate {
    pub view: LayoutContext<PartnerDirectoryView>,
}

pub struct PartnerDetailView {
    pub name: String,
    pub summary: String,
    pub website: Option<String>,
    pub logo: Option<MediaRef>,
    pub directory_href: String,
    pub memberships: Vec<(&'static str, Vec<String>)>,
}

#[derive(Template)]
#[template(path = "partner.html")]
pub struct PartnerTemplate {
    pub view: LayoutContext<PartnerDetailView>,
}

pub struct CaseStudyView {
    pub title: String,
    pub blocks_html: Vec<String>,
    pub contains_code: bool,
}

#[derive(Template)]
#[template(path = "case_study.html")]
pub struct CaseStudyTemplate {
    pub view: LayoutContext<CaseStudyView>,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
    pub primary_action: Option<ErrorAction>,
}

impl ErrorPageView {
    pub fn not_found(chrome: &LayoutChrome) -> Self {
        Self {
            title: chrome.strings.not_found_title.to_string(),
            message: chrome.strings.not_found_message.to_string(),
            primary_action: Some(ErrorAction {
                href: chrome.home_href.clone(),
                label: chrome.strings.back_home.to_string(),
            }),
        }
    }
}

pub struct ErrorAction {
    pub href: String,
    pub label: String,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

/// Social card generated for posts whose featured media is a video.
#[derive(Template)]
#[template(path = "og.svg")]
pub struct OgImageTemplate {
    pub kicker: String,
    pub title: String,
}
