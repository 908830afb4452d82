mod admin;
mod api;
mod draft;
mod middleware;
mod public;

pub use admin::{AdminState, build_admin_router};
pub use draft::{DRAFT_COOKIE, DraftMode, draft_token};
pub use middleware::{AdminCaller, RequestContext};
pub use public::{HttpState, build_router};

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::error::ErrorReport;
use crate::application::repos::RepoError;
use crate::infra::db::{PostgresRepositories, map_sqlx_error};

/// Liveness of the content store behind `/_health/db`.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn check(&self) -> Result<(), RepoError>;
}

#[async_trait]
impl HealthProbe for PostgresRepositories {
    async fn check(&self) -> Result<(), RepoError> {
        self.health_check().await.map_err(map_sqlx_error)
    }
}

fn db_health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
