//! Response cache middleware.
//!
//! Serves cached GET responses for public routes and stores fresh 200 responses
//! under the tags their handlers read. Draft mode requests bypass the cache.

use std::sync::Arc;

use axum::{
    body::{Body, HttpBody},
    extract::State,
    http::{HeaderValue, Method, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, instrument, warn};

use super::deps;
use super::keys::ResponseKey;
use super::service::SiteCache;
use super::store::CachedResponse;

/// Largest body the cache will buffer.
const MAX_CACHED_BODY: usize = 1024 * 1024;

#[derive(Clone)]
pub struct CacheState {
    pub cache: Arc<SiteCache>,
    /// Requests carrying this cookie are rendered fresh and never stored.
    pub bypass_cookie: &'static str,
}

#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn response_cache_layer(
    State(state): State<CacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.cache.config().enable_response_cache || request.method() != Method::GET {
        return next.run(request).await;
    }

    let jar = CookieJar::from_headers(request.headers());
    if jar.get(state.bypass_cookie).is_some() {
        return next.run(request).await;
    }

    let key = ResponseKey::new(
        request.uri().path(),
        request.uri().query().unwrap_or(""),
    );

    if let Some(cached) = state.cache.lookup_response(&key) {
        debug!(cache = "response", outcome = "hit", "serving cached response");
        return build_response(cached);
    }

    let generation = state.cache.generation();
    let (response, tags) = deps::with_collector(next.run(request)).await;

    if response.status() != StatusCode::OK || !is_storable(&response) {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_CACHED_BODY).await {
        Ok(bytes) => bytes,
        Err(error) => {
            warn!(%error, "failed to buffer response body for caching");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let cached = CachedResponse {
        status: parts.status.as_u16(),
        headers: parts
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.to_string(), value.to_string()))
            })
            .collect(),
        body: bytes.clone(),
    };

    debug!(cache = "response", tags = tags.len(), "storing response");
    state.cache.store_response(key, cached, tags, generation);

    Response::from_parts(parts, Body::from(bytes))
}

/// Whether a response may be shared. Bodies that may exceed `MAX_CACHED_BODY`
/// are passed through unstored.
fn is_storable(response: &Response) -> bool {
    let headers = response.headers();
    if headers.contains_key(header::SET_COOKIE) {
        return false;
    }
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());
    let upper = declared.or_else(|| response.body().size_hint().upper());
    if upper.is_none_or(|len| len > MAX_CACHED_BODY as u64) {
        return false;
    }
    headers
        .get(header::CACHE_CONTROL)
        .and_then(|value| value.to_str().ok())
        .is_none_or(|value| !value.contains("no-store") && !value.contains("private"))
}

fn build_response(cached: CachedResponse) -> Response {
    let mut builder = Response::builder().status(cached.status);
    for (name, value) in cached.headers {
        if let Ok(value) = HeaderValue::from_str(&value) {
            builder = builder.header(name, value);
        }
    }
    builder
        .body(Body::from(cached.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::{Router, middleware::from_fn_with_state, routing::get};
    use tower::ServiceExt;

    use super::*;
    use crate::cache::config::CacheConfig;
    use crate::cache::keys::CacheTag;

    fn app(cache: Arc<SiteCache>, hits: Arc<AtomicUsize>) -> Router {
        let state = CacheState {
            cache,
            bypass_cookie: "draft",
        };
        Router::new()
            .route(
                "/en/posts/news",
                get({
                    let hits = hits.clone();
                    move || {
                        let hits = hits.clone();
                        async move {
                            hits.fetch_add(1, Ordering::SeqCst);
                            deps::record(CacheTag::archives());
                            "archive"
                        }
                    }
                }),
            )
            .route(
                "/en/partners",
                get({
                    let hits = hits.clone();
                    move || {
                        let hits = hits.clone();
                        async move {
                            hits.fetch_add(1, Ordering::SeqCst);
                            deps::record(CacheTag::partners());
                            "p".repeat(2 * MAX_CACHED_BODY)
                        }
                    }
                }),
            )
            .layer(from_fn_with_state(state, response_cache_layer))
    }

    fn get_request(cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/en/posts/news");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).expect("request")
    }

    #[tokio::test]
    async fn second_request_is_served_from_cache_until_tag_invalidation() {
        let cache = Arc::new(SiteCache::new(CacheConfig::default()));
        let hits = Arc::new(AtomicUsize::new(0));
        let app = app(cache.clone(), hits.clone());

        for _ in 0..2 {
            let response = app.clone().oneshot(get_request(None)).await.expect("response");
            assert_eq!(response.status(), StatusCode::OK);
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        cache.invalidate_tag(&CacheTag::archives());
        app.oneshot(get_request(None)).await.expect("response");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn bypass_cookie_skips_cache() {
        let cache = Arc::new(SiteCache::new(CacheConfig::default()));
        let hits = Arc::new(AtomicUsize::new(0));
        let app = app(cache, hits.clone());

        for _ in 0..2 {
            app.clone()
                .oneshot(get_request(Some("draft=token")))
                .await
                .expect("response");
        }
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn oversized_pages_are_served_but_not_stored() {
        let cache = Arc::new(SiteCache::new(CacheConfig::default()));
        let hits = Arc::new(AtomicUsize::new(0));
        let app = app(cache, hits.clone());

        for _ in 0..2 {
            let request = Request::builder()
                .uri("/en/partners")
                .body(Body::empty())
                .expect("request");
            let response = app.clone().oneshot(request).await.expect("response");
            assert_eq!(response.status(), StatusCode::OK);
            let body = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .expect("body");
            assert_eq!(body.len(), 2 * MAX_CACHED_BODY);
        }
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
