//! Embedded static asset serving.

use axum::{
    body::Body,
    extract::Path,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use include_dir::{Dir, include_dir};
use mime_guess::Mime;

use crate::application::error::ErrorReport;

const SOURCE: &str = "infra::assets::serve_static";

static STATIC_ASSETS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/static");

/// Serve a file from the embedded `static/` bundle.
pub async fn serve_static(path: Option<Path<String>>) -> Response {
    let captured = path.map(|Path(value)| value);
    match resolve_asset(&STATIC_ASSETS, captured.as_deref()) {
        Some((contents, mime)) => build_response(Bytes::from_static(contents), mime),
        None => {
            let mut response = StatusCode::NOT_FOUND.into_response();
            ErrorReport::from_message(SOURCE, StatusCode::NOT_FOUND, "Static asset not found")
                .attach(&mut response);
            response
        }
    }
}

fn resolve_asset(bundle: &'static Dir<'static>, path: Option<&str>) -> Option<(&'static [u8], Mime)> {
    let candidate = path.unwrap_or_default().trim_start_matches('/');
    if candidate.is_empty() || candidate.ends_with('/') || candidate.contains("..") {
        return None;
    }
    let file = bundle.get_file(candidate)?;
    Some((
        file.contents(),
        mime_guess::from_path(candidate).first_or_octet_stream(),
    ))
}

fn build_response(bytes: Bytes, mime: Mime) -> Response {
    let len = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&len.to_string()) {
        headers.insert(header::CONTENT_LENGTH, value);
    }
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=86400"),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stylesheet_is_embedded() {
        let (contents, mime) = resolve_asset(&STATIC_ASSETS, Some("site.css")).expect("asset");
        assert!(!contents.is_empty());
        assert_eq!(mime.essence_str(), "text/css");
    }

    #[test]
    fn traversal_and_directories_are_rejected() {
        assert!(resolve_asset(&STATIC_ASSETS, Some("../Cargo.toml")).is_none());
        assert!(resolve_asset(&STATIC_ASSETS, Some("")).is_none());
        assert!(resolve_asset(&STATIC_ASSETS, None).is_none());
    }
}
