//! Prerendering: request every published path once so the response cache is warm.

use std::time::Instant;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use futures::{StreamExt, stream};
use thiserror::Error;
use tower::ServiceExt;
use tracing::{info, warn};

use crate::application::{repos::RepoError, static_params::StaticParams};

const TARGET: &str = "safecircle::cache_warmer";

#[derive(Debug, Error)]
pub enum CacheWarmError {
    #[error("failed to enumerate published paths: {0}")]
    Enumerate(#[from] RepoError),
}

/// Outcome of one prerender pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarmReport {
    pub rendered: usize,
    /// Paths that did not answer `200 OK`, with the status they returned.
    pub failed: Vec<(String, u16)>,
}

pub struct CacheWarmer {
    router: Router,
    params: StaticParams,
}

impl CacheWarmer {
    pub fn new(router: Router, params: StaticParams) -> Self {
        Self { router, params }
    }

    pub async fn warm(&self, concurrency: usize) -> Result<WarmReport, CacheWarmError> {
        let paths = self.params.all_paths().await?;
        let started = Instant::now();
        info!(target: TARGET, paths = paths.len(), concurrency, "prerendering published paths");

        let statuses: Vec<(String, StatusCode)> = stream::iter(paths)
            .map(|path| {
                let router = self.router.clone();
                async move {
                    let status = render_path(router, &path).await;
                    (path, status)
                }
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        let mut report = WarmReport::default();
        for (path, status) in statuses {
            if status == StatusCode::OK {
                report.rendered += 1;
            } else {
                warn!(target: TARGET, %path, status = status.as_u16(), "path did not prerender");
                report.failed.push((path, status.as_u16()));
            }
        }
        report.failed.sort();

        info!(
            target: TARGET,
            rendered = report.rendered,
            failed = report.failed.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "prerender finished"
        );
        Ok(report)
    }
}

async fn render_path(router: Router, path: &str) -> StatusCode {
    let request = match Request::builder()
        .method(Method::GET)
        .uri(path)
        .body(Body::empty())
    {
        Ok(request) => request,
        Err(_) => return StatusCode::BAD_REQUEST,
    };
    match router.oneshot(request).await {
        Ok(response) => response.status(),
        Err(never) => match never {},
    }
}
