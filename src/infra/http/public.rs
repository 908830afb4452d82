use std::sync::Arc;

use askama::Template;
use axum::{
    Router,
    body::Body,
    extract::{Path, Query, State},
    http::{
        HeaderValue, StatusCode, Uri,
        header::{CACHE_CONTROL, CONTENT_TYPE},
    },
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    application::{
        chrome::ChromeService,
        content::PartnerQuery,
        error::HttpError,
        forms::FormSubmissionService,
        page::PageService,
        seo::{PageMetadata, SITE_NAME},
        sitemap::SitemapService,
        stars::StarCountService,
    },
    cache::{CacheState, response_cache_layer},
    domain::{
        entities::RedirectRecord,
        paths::{localized_path, path_segments},
        types::Locale,
    },
    infra::assets::serve_static,
    presentation::views::{
        ArchiveTemplate, CaseStudyTemplate, LayoutContext, OgImageTemplate, PageTemplate,
        PartnerTemplate, PartnersTemplate, PostTemplate, SeoHead, TemplateRenderError,
        render_not_found_response, render_template_response,
    },
};

use super::{
    HealthProbe, api, db_health_response,
    draft::{self, DraftMode},
    middleware::{log_responses, set_request_context},
};

#[derive(Clone)]
pub struct HttpState {
    pub pages: Arc<PageService>,
    pub chrome: Arc<ChromeService>,
    pub sitemap: Arc<SitemapService>,
    pub forms: Arc<FormSubmissionService>,
    pub stars: Arc<StarCountService>,
    pub health: Arc<dyn HealthProbe>,
    /// Secret that `/api/draft` must be called with. Draft mode is off without it.
    pub draft_secret: Option<String>,
    pub site_url: String,
    pub default_locale: Locale,
    pub cache: Option<CacheState>,
}

pub fn build_router(state: HttpState) -> Router {
    // Rendered documents; the cache layer skips requests in draft mode.
    let cached_routes = Router::new()
        .route("/sitemap.xml", get(sitemap))
        .route("/robots.txt", get(robots_txt))
        .route("/api/og", get(og_image))
        .route("/{locale}", get(home))
        .route("/{locale}/posts", get(blog))
        .route("/{locale}/posts/{category}", get(archive))
        .route("/{locale}/posts/{category}/{slug}", get(post_detail))
        .route("/{locale}/partners", get(partners))
        .route("/{locale}/partners/{slug}", get(partner_detail))
        .route("/{locale}/case-studies/{slug}", get(case_study))
        .route("/{locale}/{*slug}", get(page))
        .fallback(fallback_router);

    let cached_routes = if let Some(cache_state) = state.cache.clone() {
        cached_routes.layer(middleware::from_fn_with_state(
            cache_state,
            response_cache_layer,
        ))
    } else {
        cached_routes
    };

    let uncached_routes = Router::new()
        .route("/", get(root))
        .route("/api/star-count", get(api::star_count))
        .route("/api/form-submissions", post(api::submit_form))
        .route("/api/draft", get(draft::enable_draft))
        .route("/api/draft/disable", get(draft::disable_draft))
        .route("/_health/db", get(public_health))
        .route("/static/{*path}", get(serve_static));

    cached_routes
        .merge(uncached_routes)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn root(State(state): State<HttpState>) -> Redirect {
    Redirect::temporary(&localized_path(state.default_locale, "/"))
}

async fn home(
    State(state): State<HttpState>,
    Path(locale): Path<String>,
    draft: DraftMode,
    uri: Uri,
) -> Response {
    let locale = match resolve_locale(&state, &locale, uri.path()).await {
        Ok(locale) => locale,
        Err(response) => return response,
    };
    let loaded = state
        .pages
        .page_view(&[], locale, draft.visibility())
        .await;
    render(&state, locale, "/", draft, loaded, |view| PageTemplate { view }).await
}

async fn page(
    State(state): State<HttpState>,
    Path((locale, slug)): Path<(String, String)>,
    draft: DraftMode,
    uri: Uri,
) -> Response {
    let locale = match resolve_locale(&state, &locale, uri.path()).await {
        Ok(locale) => locale,
        Err(response) => return response,
    };
    let segments = path_segments(&slug);
    let path = format!("/{}", segments.join("/"));
    let loaded = state
        .pages
        .page_view(&segments, locale, draft.visibility())
        .await;
    render(&state, locale, &path, draft, loaded, |view| PageTemplate { view }).await
}

async fn blog(
    State(state): State<HttpState>,
    Path(locale): Path<String>,
    draft: DraftMode,
    uri: Uri,
) -> Response {
    let locale = match resolve_locale(&state, &locale, uri.path()).await {
        Ok(locale) => locale,
        Err(response) => return response,
    };
    let loaded = state
        .pages
        .blog_view(locale, OffsetDateTime::now_utc())
        .await
        .map(Some);
    render(&state, locale, "/posts", draft, loaded, |view| {
        ArchiveTemplate { view }
    })
    .await
}

async fn archive(
    State(state): State<HttpState>,
    Path((locale, category)): Path<(String, String)>,
    draft: DraftMode,
    uri: Uri,
) -> Response {
    let locale = match resolve_locale(&state, &locale, uri.path()).await {
        Ok(locale) => locale,
        Err(response) => return response,
    };
    let loaded = state
        .pages
        .archive_view(&category, locale, OffsetDateTime::now_utc())
        .await;
    let path = format!("/posts/{category}");
    render(&state, locale, &path, draft, loaded, |view| {
        ArchiveTemplate { view }
    })
    .await
}

async fn post_detail(
    State(state): State<HttpState>,
    Path((locale, category, slug)): Path<(String, String, String)>,
    draft: DraftMode,
    uri: Uri,
) -> Response {
    let locale = match resolve_locale(&state, &locale, uri.path()).await {
        Ok(locale) => locale,
        Err(response) => return response,
    };
    let loaded = state
        .pages
        .post_view(&category, &slug, locale, draft.visibility())
        .await;
    let path = format!("/posts/{category}/{slug}");
    render(&state, locale, &path, draft, loaded, |view| PostTemplate { view }).await
}

async fn partners(
    State(state): State<HttpState>,
    Path(locale): Path<String>,
    Query(query): Query<PartnerQuery>,
    draft: DraftMode,
    uri: Uri,
) -> Response {
    let locale = match resolve_locale(&state, &locale, uri.path()).await {
        Ok(locale) => locale,
        Err(response) => return response,
    };
    let loaded = state
        .pages
        .partners_view(&query, locale, draft.visibility())
        .await;
    render(&state, locale, "/partners", draft, loaded, |view| {
        PartnersTemplate { view }
    })
    .await
}

async fn partner_detail(
    State(state): State<HttpState>,
    Path((locale, slug)): Path<(String, String)>,
    draft: DraftMode,
    uri: Uri,
) -> Response {
    let locale = match resolve_locale(&state, &locale, uri.path()).await {
        Ok(locale) => locale,
        Err(response) => return response,
    };
    let loaded = state
        .pages
        .partner_view(&slug, locale, draft.visibility())
        .await;
    let path = format!("/partners/{slug}");
    render(&state, locale, &path, draft, loaded, |view| {
        PartnerTemplate { view }
    })
    .await
}

async fn case_study(
    State(state): State<HttpState>,
    Path((locale, slug)): Path<(String, String)>,
    draft: DraftMode,
    uri: Uri,
) -> Response {
    let locale = match resolve_locale(&state, &locale, uri.path()).await {
        Ok(locale) => locale,
        Err(response) => return response,
    };
    let loaded = state
        .pages
        .case_study_view(&slug, locale, draft.visibility())
        .await;
    let path = format!("/case-studies/{slug}");
    render(&state, locale, &path, draft, loaded, |view| {
        CaseStudyTemplate { view }
    })
    .await
}

async fn fallback_router(State(state): State<HttpState>, draft: DraftMode, uri: Uri) -> Response {
    let raw_path = uri.path();
    let (first, rest) = raw_path
        .trim_start_matches('/')
        .split_once('/')
        .unwrap_or((raw_path.trim_start_matches('/'), ""));

    match first.parse::<Locale>() {
        Ok(locale) => not_found(&state, locale, &format!("/{rest}"), draft).await,
        Err(_) => not_found(&state, state.default_locale, raw_path, draft).await,
    }
}

/// Render a loaded view inside the layout, or the not-found page when nothing loaded.
///
/// `path` is the request path without its locale prefix.
async fn render<T, V>(
    state: &HttpState,
    locale: Locale,
    path: &str,
    draft: DraftMode,
    loaded: Result<Option<(T, PageMetadata)>, HttpError>,
    template: impl FnOnce(LayoutContext<T>) -> V,
) -> Response
where
    V: Template,
{
    let (content, metadata) = match loaded {
        Ok(Some(loaded)) => loaded,
        Ok(None) => return not_found(state, locale, path, draft).await,
        Err(err) => return err.into_response(),
    };

    let chrome = match state.chrome.load(locale, path, draft.0).await {
        Ok(chrome) => chrome,
        Err(err) => return err.into_response(),
    };
    let canonical = canonical_url(&state.site_url, &localized_path(locale, path));
    let view = LayoutContext::new(
        chrome.with_meta(SeoHead::new(metadata, Some(canonical))),
        content,
    );

    let mut response = render_template_response(template(view), StatusCode::OK);
    if draft.0 {
        set_no_store(&mut response);
    }
    response
}

/// A configured redirect for the path, otherwise the localized not-found page.
async fn not_found(state: &HttpState, locale: Locale, path: &str, draft: DraftMode) -> Response {
    let localized = localized_path(locale, path);
    for candidate in [localized.as_str(), path] {
        match state.pages.content().redirect(candidate).await {
            Ok(Some(redirect)) => return redirect_response(&redirect),
            Ok(None) => {}
            Err(err) => return HttpError::from(err).into_response(),
        }
    }

    match state.chrome.load(locale, path, draft.0).await {
        Ok(chrome) => {
            let mut response = render_not_found_response(chrome);
            if draft.0 {
                set_no_store(&mut response);
            }
            response
        }
        Err(err) => err.into_response(),
    }
}

/// Parse the leading path segment as a locale.
///
/// Unknown locales resolve a redirect for the whole path, or move the request
/// under the default locale.
async fn resolve_locale(state: &HttpState, raw: &str, full_path: &str) -> Result<Locale, Response> {
    if let Ok(locale) = raw.parse::<Locale>() {
        return Ok(locale);
    }
    match state.pages.content().redirect(full_path).await {
        Ok(Some(redirect)) => Err(redirect_response(&redirect)),
        Ok(None) => Err(
            Redirect::temporary(&localized_path(state.default_locale, full_path)).into_response(),
        ),
        Err(err) => Err(HttpError::from(err).into_response()),
    }
}

fn redirect_response(redirect: &RedirectRecord) -> Response {
    if redirect.permanent {
        Redirect::permanent(&redirect.to).into_response()
    } else {
        Redirect::temporary(&redirect.to).into_response()
    }
}

fn set_no_store(response: &mut Response) {
    let value = HeaderValue::from_static("no-store");
    response.headers_mut().insert(CACHE_CONTROL, value);
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.health.check().await)
}

async fn sitemap(State(state): State<HttpState>) -> Response {
    match state.sitemap.sitemap_xml().await {
        Ok(body) => typed_response(body, "application/xml"),
        Err(err) => HttpError::from_error(
            "infra::http::public::sitemap",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to generate sitemap",
            &err,
        )
        .into_response(),
    }
}

async fn robots_txt(State(state): State<HttpState>) -> Response {
    typed_response(state.sitemap.robots_txt(), "text/plain; charset=utf-8")
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OgQuery {
    #[serde(rename = "type")]
    kind: Option<String>,
    title: Option<String>,
}

/// Social card for documents without an uploaded image.
async fn og_image(Query(query): Query<OgQuery>) -> Response {
    let template = OgImageTemplate {
        kicker: query
            .kind
            .map(|kind| kind.replace('-', " ").to_uppercase())
            .unwrap_or_default(),
        title: query
            .title
            .filter(|title| !title.trim().is_empty())
            .unwrap_or_else(|| SITE_NAME.to_string()),
    };

    match template.render() {
        Ok(body) => {
            let mut response = typed_response(body, "image/svg+xml");
            response.headers_mut().insert(
                CACHE_CONTROL,
                HeaderValue::from_static("public, max-age=86400"),
            );
            response
        }
        Err(err) => HttpError::from(TemplateRenderError::new(
            "infra::http::public::og_image",
            "Failed to render image",
            err,
        ))
        .into_response(),
    }
}

pub(crate) fn canonical_url(site_url: &str, path: &str) -> String {
    format!("{}{}", site_url.trim_end_matches('/'), path)
}

fn typed_response(body: String, content_type: &str) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_urls_join_without_double_slashes() {
        assert_eq!(
            canonical_url("https://safecircle.tech/", "/en/about"),
            "https://safecircle.tech/en/about"
        );
        assert_eq!(canonical_url("https://safecircle.tech", "/es"), "https://safecircle.tech/es");
    }

    #[test]
    fn redirects_keep_their_permanence() {
        let mut redirect = RedirectRecord {
            id: uuid::Uuid::nil(),
            from: "/old".into(),
            to: "/en/new".into(),
            permanent: true,
        };
        assert_eq!(
            redirect_response(&redirect).status(),
            StatusCode::PERMANENT_REDIRECT
        );
        redirect.permanent = false;
        assert_eq!(
            redirect_response(&redirect).status(),
            StatusCode::TEMPORARY_REDIRECT
        );
    }
}
