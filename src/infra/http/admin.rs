//! Admin listener: content mutations and manual revalidation behind a bearer token.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderValue, Request, StatusCode, header::AUTHORIZATION},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, post, put},
};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::info;
use uuid::Uuid;

use crate::application::error::HttpError;
use crate::application::mutations::{ContentMutationService, MutationOutcome};
use crate::application::revalidation::RevalidationReport;
use crate::cache::RevalidationPlan;
use crate::domain::types::{Collection, Locale};

use super::middleware::{AdminCaller, log_responses, set_request_context};

const SOURCE: &str = "infra::http::admin";
const TARGET: &str = "safecircle::http::admin";

#[derive(Clone)]
pub struct AdminState {
    pub mutations: Arc<ContentMutationService>,
    /// Bearer token every admin request must present. Every request is refused without it.
    pub admin_token: Option<String>,
}

pub fn build_admin_router(state: AdminState) -> Router {
    let auth_state = state.clone();

    Router::new()
        .route("/api/content/{collection}", put(upsert_document))
        .route("/api/content/{collection}/{id}", delete(delete_document))
        .route("/api/revalidate", post(revalidate))
        .with_state(state)
        .layer(middleware::from_fn_with_state(auth_state, admin_auth))
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn admin_auth(State(state): State<AdminState>, request: Request<Body>, next: Next) -> Response {
    let Some(expected) = state.admin_token.as_deref() else {
        return unauthorized("admin token is not configured");
    };
    let authorized = extract_token(request.headers().get(AUTHORIZATION))
        .is_some_and(|token| bool::from(token.as_bytes().ct_eq(expected.as_bytes())));
    if !authorized {
        return unauthorized("missing or invalid bearer token");
    }

    let mut response = next.run(request).await;
    response.extensions_mut().insert(AdminCaller);
    response
}

fn extract_token(header: Option<&HeaderValue>) -> Option<&str> {
    header?.to_str().ok()?.strip_prefix("Bearer ")
}

fn unauthorized(detail: &'static str) -> Response {
    HttpError::new(SOURCE, StatusCode::UNAUTHORIZED, "Unauthorized", detail)
        .json()
        .into_response()
}

#[derive(Debug, Serialize)]
struct RevalidationSummary {
    applied: usize,
    failed: usize,
    steps: Vec<String>,
}

impl From<&RevalidationReport> for RevalidationSummary {
    fn from(report: &RevalidationReport) -> Self {
        Self {
            applied: report.applied,
            failed: report.failed,
            steps: report.plan.steps().iter().map(ToString::to_string).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct MutationSummary {
    id: String,
    operation: String,
    revalidations: Vec<RevalidationSummary>,
}

impl From<MutationOutcome> for MutationSummary {
    fn from(outcome: MutationOutcome) -> Self {
        Self {
            revalidations: outcome
                .revalidations
                .iter()
                .map(RevalidationSummary::from)
                .collect(),
            operation: outcome.operation.to_string(),
            id: outcome.id,
        }
    }
}

async fn upsert_document(
    State(state): State<AdminState>,
    Path(collection): Path<Collection>,
    Json(document): Json<serde_json::Value>,
) -> Result<Json<MutationSummary>, HttpError> {
    let outcome = state
        .mutations
        .upsert(collection, document)
        .await
        .map_err(|err| HttpError::from(err).json())?;
    info!(
        target: TARGET,
        collection = %collection,
        id = %outcome.id,
        operation = %outcome.operation,
        failed_invalidations = outcome.failed_invalidations(),
        "document saved"
    );
    Ok(Json(outcome.into()))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DeleteQuery {
    locale: Option<Locale>,
}

async fn delete_document(
    State(state): State<AdminState>,
    Path((collection, id)): Path<(Collection, Uuid)>,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<MutationSummary>, HttpError> {
    let outcome = state
        .mutations
        .delete(collection, id, query.locale.unwrap_or(Locale::DEFAULT))
        .await
        .map_err(|err| HttpError::from(err).json())?;
    info!(
        target: TARGET,
        collection = %collection,
        %id,
        failed_invalidations = outcome.failed_invalidations(),
        "document deleted"
    );
    Ok(Json(outcome.into()))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RevalidateRequest {
    paths: Vec<String>,
    tags: Vec<String>,
}

async fn revalidate(
    State(state): State<AdminState>,
    Json(request): Json<RevalidateRequest>,
) -> Result<Json<RevalidationSummary>, HttpError> {
    let plan = RevalidationPlan::manual(
        request.paths.iter().map(String::as_str),
        request.tags.iter().map(String::as_str),
    );
    if plan.is_empty() {
        return Err(HttpError::new(
            SOURCE,
            StatusCode::BAD_REQUEST,
            "Nothing to revalidate",
            "request named no paths and no tags",
        )
        .json());
    }

    let report = state.mutations.hooks().execute(plan).await;
    Ok(Json(RevalidationSummary::from(&report)))
}
