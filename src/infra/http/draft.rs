//! Draft mode: a signed cookie that lets a request see unpublished documents.

use axum::{
    extract::{FromRef, FromRequestParts, Query, State},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::info;

use crate::application::error::HttpError;
use crate::domain::types::Visibility;

use super::public::HttpState;

const SOURCE: &str = "infra::http::draft";

/// Cookie carrying the draft token. The response cache skips requests that send it.
pub const DRAFT_COOKIE: &str = "safecircle-draft";

/// Cookie value proving knowledge of the draft secret.
pub fn draft_token(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

/// Whether the request runs in draft mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DraftMode(pub bool);

impl DraftMode {
    pub fn visibility(self) -> Visibility {
        Visibility::from_draft_mode(self.0)
    }
}

impl<S> FromRequestParts<S> for DraftMode
where
    HttpState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = HttpState::from_ref(state);
        let Some(secret) = state.draft_secret.as_deref() else {
            return Ok(DraftMode(false));
        };
        let jar = CookieJar::from_headers(&parts.headers);
        let enabled = jar.get(DRAFT_COOKIE).is_some_and(|cookie| {
            let expected = draft_token(secret);
            bool::from(cookie.value().as_bytes().ct_eq(expected.as_bytes()))
        });
        Ok(DraftMode(enabled))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct EnableQuery {
    secret: Option<String>,
    path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct DisableQuery {
    path: Option<String>,
}

/// A same-site path, never a scheme-relative or absolute url.
fn safe_path(path: Option<&str>) -> Option<&str> {
    path.filter(|path| path.starts_with('/') && !path.starts_with("//") && !path.contains('\\'))
}

pub(super) async fn enable_draft(
    State(state): State<HttpState>,
    jar: CookieJar,
    Query(query): Query<EnableQuery>,
) -> Response {
    let Some(secret) = state.draft_secret.as_deref() else {
        return HttpError::new(
            SOURCE,
            StatusCode::UNAUTHORIZED,
            "Invalid token",
            "draft mode is not configured",
        )
        .into_response();
    };
    let provided = query.secret.unwrap_or_default();
    if !bool::from(provided.as_bytes().ct_eq(secret.as_bytes())) {
        return HttpError::new(
            SOURCE,
            StatusCode::UNAUTHORIZED,
            "Invalid token",
            "draft secret mismatch",
        )
        .into_response();
    }
    let Some(path) = safe_path(query.path.as_deref()) else {
        return HttpError::new(
            SOURCE,
            StatusCode::UNAUTHORIZED,
            "Invalid path",
            "draft redirect path must be a site path",
        )
        .into_response();
    };

    info!(target: "safecircle::http::draft", path, "draft mode enabled");
    let cookie = Cookie::build((DRAFT_COOKIE, draft_token(secret)))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.site_url.starts_with("https://"))
        .build();
    (jar.add(cookie), Redirect::temporary(path)).into_response()
}

pub(super) async fn disable_draft(jar: CookieJar, Query(query): Query<DisableQuery>) -> Response {
    let path = safe_path(query.path.as_deref()).unwrap_or("/");
    let cookie = Cookie::build(DRAFT_COOKIE).path("/").build();
    (jar.remove(cookie), Redirect::temporary(path)).into_response()
}
