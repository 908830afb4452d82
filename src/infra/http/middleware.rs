use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderValue, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use metrics::histogram;
use tracing::{error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

const TARGET: &str = "safecircle::http::response";
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request identifier, echoed back in `x-request-id`.
#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
}

/// Marks a request authenticated with the admin bearer token.
#[derive(Clone, Copy, Debug)]
pub struct AdminCaller;

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    // An id set by the edge proxy is kept so logs line up across hops.
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty() && value.len() <= 64)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let ctx = RequestContext { request_id };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&ctx.request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response.extensions_mut().insert(ctx);
    response
}

pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();
    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();
    let elapsed = start.elapsed();
    histogram!("safecircle_http_request_ms", "status" => status_class(status))
        .record(elapsed.as_secs_f64() * 1000.0);

    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let admin = response.extensions().get::<AdminCaller>().is_some();
    let (source, chain) = match response.extensions_mut().remove::<ErrorReport>() {
        Some(report) => (report.source, report.messages),
        None => ("unknown", Vec::new()),
    };
    let detail = chain
        .first()
        .map(String::as_str)
        .unwrap_or("no diagnostic available");
    let elapsed_ms = elapsed.as_millis();

    if status.is_server_error() {
        error!(
            target: TARGET,
            status = status.as_u16(),
            %method,
            path = %uri.path(),
            query = uri.query().unwrap_or(""),
            elapsed_ms,
            source,
            detail,
            chain = ?chain,
            request_id,
            admin,
            "request failed",
        );
    } else if status != StatusCode::NOT_FOUND || source != "unknown" {
        warn!(
            target: TARGET,
            status = status.as_u16(),
            %method,
            path = %uri.path(),
            query = uri.query().unwrap_or(""),
            elapsed_ms,
            source,
            detail,
            request_id,
            admin,
            "client request error",
        );
    }

    response
}

fn status_class(status: StatusCode) -> &'static str {
    match status.as_u16() {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_group_by_class() {
        assert_eq!(status_class(StatusCode::OK), "2xx");
        assert_eq!(status_class(StatusCode::PERMANENT_REDIRECT), "3xx");
        assert_eq!(status_class(StatusCode::NOT_FOUND), "4xx");
        assert_eq!(status_class(StatusCode::BAD_GATEWAY), "5xx");
    }
}
