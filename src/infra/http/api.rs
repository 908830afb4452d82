//! JSON endpoints served next to the public pages.

use axum::{
    Form, Json,
    extract::{FromRequest, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::application::error::HttpError;
use crate::application::forms::{FieldError, FormSubmissionError, SubmissionRequest, VERIFICATION_FIELD};
use crate::domain::entities::SubmissionEntry;
use crate::domain::types::Locale;

use super::public::HttpState;

const SOURCE: &str = "infra::http::api";

/// Form field the Turnstile widget fills in on plain HTML forms.
const WIDGET_TOKEN_FIELD: &str = "cf-turnstile-response";

/// Keys of an HTML form post that describe the submission rather than its data.
const RESERVED_FIELDS: [&str; 6] = [
    "form",
    "locale",
    "pageName",
    "pageUri",
    VERIFICATION_FIELD,
    WIDGET_TOKEN_FIELD,
];

pub(super) async fn star_count(State(state): State<HttpState>) -> Response {
    match state.stars.star_count().await {
        Ok(count) => {
            let mut response = Json(count).into_response();
            response.headers_mut().insert(
                header::CACHE_CONTROL,
                HeaderValue::from_static("public, s-maxage=900"),
            );
            response
        }
        Err(err) => HttpError::from_error(
            "infra::http::api::star_count",
            StatusCode::BAD_GATEWAY,
            "Failed to fetch star count",
            &err,
        )
        .json()
        .into_response(),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmissionPayload {
    form: Option<String>,
    #[serde(default)]
    submission_data: Vec<SubmissionEntry>,
    #[serde(default)]
    locale: Option<Locale>,
    #[serde(default)]
    turnstile: Option<String>,
    #[serde(default)]
    page_name: Option<String>,
    #[serde(default)]
    page_uri: Option<String>,
}

impl SubmissionPayload {
    fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let lookup = |key: &str| {
            pairs
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value.clone())
                .filter(|value| !value.is_empty())
        };
        Self {
            form: lookup("form"),
            locale: lookup("locale").and_then(|value| value.parse().ok()),
            turnstile: lookup(VERIFICATION_FIELD).or_else(|| lookup(WIDGET_TOKEN_FIELD)),
            page_name: lookup("pageName"),
            page_uri: lookup("pageUri"),
            submission_data: pairs
                .iter()
                .filter(|(name, _)| !RESERVED_FIELDS.contains(&name.as_str()))
                .map(|(field, value)| SubmissionEntry {
                    field: field.clone(),
                    value: value.clone(),
                })
                .collect(),
        }
    }
}

/// A submission posted either as JSON or as an HTML form.
pub(super) struct SubmissionBody(SubmissionPayload);

impl<S> FromRequest<S> for SubmissionBody
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = request
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(request, state)
                .await
                .map_err(IntoResponse::into_response)?;
            Ok(Self(SubmissionPayload::from_pairs(pairs)))
        } else {
            let Json(payload) = Json::<SubmissionPayload>::from_request(request, state)
                .await
                .map_err(IntoResponse::into_response)?;
            Ok(Self(payload))
        }
    }
}

#[derive(Serialize)]
struct Created {
    id: Uuid,
}

#[derive(Serialize)]
struct Rejected {
    errors: Vec<FieldError>,
}

pub(super) async fn submit_form(
    State(state): State<HttpState>,
    headers: HeaderMap,
    SubmissionBody(mut payload): SubmissionBody,
) -> Response {
    let Some(form_id) = payload.form.as_deref().and_then(|id| Uuid::parse_str(id).ok()) else {
        return rejected(vec![FieldError::new("form", "Form not found")]);
    };

    if payload.turnstile.is_none() {
        if let Some(index) = payload
            .submission_data
            .iter()
            .position(|entry| entry.field == VERIFICATION_FIELD)
        {
            payload.turnstile = Some(payload.submission_data.remove(index).value);
        }
    }

    let request = SubmissionRequest {
        form_id,
        locale: payload.locale,
        entries: payload.submission_data,
        verification_token: payload.turnstile,
        remote_ip: client_ip(&headers),
        page_name: payload.page_name,
        page_uri: payload.page_uri,
    };

    match state.forms.submit(request).await {
        Ok(record) => (StatusCode::CREATED, Json(Created { id: record.id })).into_response(),
        Err(FormSubmissionError::Repo(err)) => {
            warn!(target: "safecircle::http::forms", %form_id, error = %err, "failed to store submission");
            HttpError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to store submission",
                &err,
            )
            .json()
            .into_response()
        }
        Err(err) => rejected(err.field_errors()),
    }
}

fn rejected(errors: Vec<FieldError>) -> Response {
    (StatusCode::BAD_REQUEST, Json(Rejected { errors })).into_response()
}

/// Address of the visitor as reported by the edge proxy.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("cf-connecting-ip")
        .or_else(|| headers.get("x-forwarded-for"))
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
