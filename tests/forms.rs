//! Form submissions through `POST /api/form-submissions`.

mod support;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};

use support::{TestSite, send};

async fn contact_form(site: &TestSite) -> String {
    let form = site
        .put(
            "forms",
            json!({
                "title": "Contact",
                "requireTurnstile": true,
                "fields": [
                    { "name": "email", "label": "Email", "kind": "email", "required": true },
                    { "name": "firstName", "label": "First name", "kind": "text" }
                ]
            }),
        )
        .await;
    form["id"].as_str().expect("form id").to_string()
}

async fn submit(site: &TestSite, payload: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/form-submissions")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request");
    let (status, body) = send(&site.public, request).await;
    (status, serde_json::from_str(&body).unwrap_or(Value::Null))
}

#[tokio::test]
async fn verified_submission_is_stored_and_subscribed() {
    let site = TestSite::new();
    let form_id = contact_form(&site).await;

    let (status, body) = submit(
        &site,
        json!({
            "form": form_id,
            "turnstile": "valid-token",
            "submissionData": [
                { "field": "email", "value": "ada@example.com" },
                { "field": "firstName", "value": "Ada" }
            ]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body["id"].is_string());
    assert_eq!(site.store.submissions().len(), 1);

    let contacts = site.audience.contacts.lock().expect("contacts");
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0].email, "ada@example.com");
    assert_eq!(contacts[0].first_name.as_deref(), Some("Ada"));
}

#[tokio::test]
async fn unverified_form_accepts_any_token() {
    let site = TestSite::new();
    let form = site
        .put(
            "forms",
            json!({
                "title": "Newsletter",
                "fields": [
                    { "name": "email", "label": "Email", "kind": "email", "required": true }
                ]
            }),
        )
        .await;
    let form_id = form["id"].as_str().expect("form id");

    for token in [None, Some("garbage")] {
        let mut payload = json!({
            "form": form_id,
            "submissionData": [{ "field": "email", "value": "grace@example.com" }]
        });
        if let Some(token) = token {
            payload["turnstile"] = json!(token);
        }
        let (status, body) = submit(&site, payload).await;
        assert_eq!(status, StatusCode::CREATED, "token {token:?}: {body}");
    }
    assert_eq!(site.store.submissions().len(), 2);
}

#[tokio::test]
async fn missing_token_is_rejected() {
    let site = TestSite::new();
    let form_id = contact_form(&site).await;

    let (status, body) = submit(
        &site,
        json!({
            "form": form_id,
            "submissionData": [{ "field": "email", "value": "ada@example.com" }]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "turnstile");
    assert_eq!(body["errors"][0]["message"], "Please complete the verification");
    assert!(site.store.submissions().is_empty());
}

#[tokio::test]
async fn invalid_token_is_rejected() {
    let site = TestSite::new();
    let form_id = contact_form(&site).await;

    let (status, body) = submit(
        &site,
        json!({
            "form": form_id,
            "turnstile": "forged",
            "submissionData": [{ "field": "email", "value": "ada@example.com" }]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["message"], "Invalid verification token");
    assert!(site.audience.contacts.lock().expect("contacts").is_empty());
}

#[tokio::test]
async fn unknown_form_reports_the_form_field() {
    let site = TestSite::new();

    let (status, body) = submit(
        &site,
        json!({
            "form": uuid::Uuid::new_v4().to_string(),
            "turnstile": "valid-token",
            "submissionData": []
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "form");
}

#[tokio::test]
async fn html_form_posts_are_accepted() {
    let site = TestSite::new();
    let form_id = contact_form(&site).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/form-submissions")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(format!(
            "form={form_id}&email=grace%40example.com&cf-turnstile-response=valid-token"
        )))
        .expect("request");
    let (status, _) = send(&site.public, request).await;

    assert_eq!(status, StatusCode::CREATED);
    let stored = site.store.submissions();
    assert_eq!(stored[0].submission_data[0].field, "email");
    assert_eq!(stored[0].submission_data[0].value, "grace@example.com");
}
