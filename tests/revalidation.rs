//! Content mutations through the admin API and the invalidations they trigger.

mod support;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;

use safecircle_site::application::mutations::ContentMutationService;
use safecircle_site::application::repos::{CategoriesRepo, ContentRepos};
use safecircle_site::application::revalidation::RevalidationHooks;
use safecircle_site::cache::{CacheTag, RevalidateError, Revalidator};
use safecircle_site::domain::types::{Collection, Locale};

use support::{ADMIN_TOKEN, MemoryStore, RecordingRevalidator, TestSite, days_ago, send};

async fn seed_news_post(site: &TestSite) -> (String, String) {
    let category = site
        .put("categories", json!({ "name": "News", "slug": "news" }))
        .await;
    let category_id = category["id"].as_str().expect("category id").to_string();
    let post = site
        .put(
            "posts",
            json!({
                "title": "Hello World",
                "slug": "hello-world",
                "_status": "published",
                "category": category_id,
                "publishedOn": days_ago(1),
            }),
        )
        .await;
    let post_id = post["id"].as_str().expect("post id").to_string();
    (category_id, post_id)
}

#[tokio::test]
async fn category_rename_moves_posts_to_the_new_archive() {
    let site = TestSite::new();
    let (category_id, _) = seed_news_post(&site).await;

    let (status, body) = site.get("/en/posts/news/hello-world").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Hello World"));

    let before = site.recorder.calls().len();
    site.put(
        "categories",
        json!({ "id": category_id, "name": "Updates", "slug": "updates" }),
    )
    .await;
    let calls = site.recorder.calls().split_off(before);

    assert_eq!(
        calls,
        [
            "path /posts/updates",
            "tag archives",
            "tag updates-archive-en",
            "tag updates-archive-es",
            "tag updates-archive-fr",
            "path /posts/news",
            "tag news-archive-en",
            "tag news-archive-es",
            "tag news-archive-fr",
        ]
    );

    let (status, _) = site.get("/en/posts/news/hello-world").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = site.get("/en/posts/updates/hello-world").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Hello World"));
}

#[tokio::test]
async fn moving_a_post_between_categories_updates_both_archives() {
    let site = TestSite::new();
    let (_, post_id) = seed_news_post(&site).await;
    let updates = site
        .put("categories", json!({ "name": "Updates", "slug": "updates" }))
        .await;
    let updates_id = updates["id"].as_str().expect("category id");

    let (_, archive) = site.get("/en/posts/news").await;
    assert!(archive.contains("Hello World"));
    let (status, _) = site.get("/en/posts/news/hello-world").await;
    assert_eq!(status, StatusCode::OK);

    let before = site.recorder.calls().len();
    site.put(
        "posts",
        json!({
            "id": post_id,
            "title": "Hello World",
            "slug": "hello-world",
            "_status": "published",
            "category": updates_id,
            "publishedOn": days_ago(1),
        }),
    )
    .await;
    let calls = site.recorder.calls().split_off(before);
    assert!(calls.contains(&"path /posts/updates/hello-world".to_string()));
    assert!(calls.contains(&"path /posts/news/hello-world".to_string()));
    assert!(calls.contains(&"tag news-archive-en".to_string()));

    let (status, _) = site.get("/en/posts/news/hello-world").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = site.get("/en/posts/updates/hello-world").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Hello World"));

    let (_, archive) = site.get("/en/posts/news").await;
    assert!(!archive.contains("Hello World"));
    let (_, archive) = site.get("/en/posts/updates").await;
    assert!(archive.contains("Hello World"));
}

/// Revalidator whose downstream never answers.
struct UnreachableRevalidator;

#[async_trait]
impl Revalidator for UnreachableRevalidator {
    fn name(&self) -> &'static str {
        "unreachable"
    }

    async fn revalidate_path(&self, _path: &str) -> Result<(), RevalidateError> {
        Err(RevalidateError::Timeout)
    }

    async fn revalidate_tag(&self, _tag: &CacheTag) -> Result<(), RevalidateError> {
        Err(RevalidateError::Rejected { status: 503 })
    }
}

#[tokio::test]
async fn failed_revalidations_do_not_fail_the_mutation() {
    let store = MemoryStore::new();
    let repos = ContentRepos::from_store(store.clone());
    let recorder = Arc::new(RecordingRevalidator::default());
    let revalidators: Vec<Arc<dyn Revalidator>> =
        vec![Arc::new(UnreachableRevalidator), recorder.clone()];
    let hooks = RevalidationHooks::new(revalidators, repos.categories.clone());
    let mutations = ContentMutationService::new(repos, hooks);

    let outcome = mutations
        .upsert(
            Collection::Categories,
            json!({ "name": "News", "slug": "news" }),
        )
        .await
        .expect("mutation succeeds");

    let planned: usize = outcome
        .revalidations
        .iter()
        .map(|report| report.plan.len())
        .sum();
    assert!(planned > 0);
    assert_eq!(outcome.failed_invalidations(), planned);
    assert_eq!(recorder.calls().len(), planned);

    let stored = store
        .find_category_by_slug("news", Locale::En)
        .await
        .expect("read");
    assert!(stored.is_some());
}

#[tokio::test]
async fn deleting_a_post_touches_only_its_category() {
    let site = TestSite::new();
    let (_, post_id) = seed_news_post(&site).await;
    site.put("categories", json!({ "name": "Events", "slug": "events" }))
        .await;

    let before = site.recorder.calls().len();
    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/api/content/posts/{post_id}"))
        .header("authorization", format!("Bearer {ADMIN_TOKEN}"))
        .body(Body::empty())
        .expect("request");
    let (status, body) = send(&site.admin, request).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let calls = site.recorder.calls().split_off(before);
    assert!(calls.contains(&"path /posts/news".to_string()));
    assert!(calls.contains(&"path /posts/news/hello-world".to_string()));
    assert!(calls.iter().all(|call| !call.contains("events")));

    let (status, _) = site.get("/en/posts/news/hello-world").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_a_missing_document_is_not_found() {
    let site = TestSite::new();
    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/api/content/pages/{}", uuid::Uuid::new_v4()))
        .header("authorization", format!("Bearer {ADMIN_TOKEN}"))
        .body(Body::empty())
        .expect("request");
    let (status, _) = send(&site.admin, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(site.recorder.calls().is_empty());
}

#[tokio::test]
async fn cached_post_is_served_without_another_read() {
    let site = TestSite::new();
    seed_news_post(&site).await;
    let reads = site.store.post_reads.load(Ordering::SeqCst);

    for _ in 0..3 {
        let (status, _) = site.get("/en/posts/news/hello-world").await;
        assert_eq!(status, StatusCode::OK);
    }
    assert_eq!(site.store.post_reads.load(Ordering::SeqCst), reads + 1);
}

#[tokio::test]
async fn home_page_update_revalidates_root() {
    let site = TestSite::new();
    site.put(
        "pages",
        json!({ "title": "Home", "slug": "home", "_status": "published" }),
    )
    .await;

    let paths = site.recorder.paths();
    assert_eq!(paths, ["/home", "/"]);
    assert_eq!(site.recorder.tags(), ["pages"]);
}

#[tokio::test]
async fn admin_requests_need_the_bearer_token() {
    let site = TestSite::new();
    let request = Request::builder()
        .method("PUT")
        .uri("/api/content/categories")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "name": "News" }).to_string()))
        .expect("request");
    let (status, _) = send(&site.admin, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .method("PUT")
        .uri("/api/content/categories")
        .header("authorization", "Bearer wrong")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "name": "News" }).to_string()))
        .expect("request");
    let (status, _) = send(&site.admin, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(site.recorder.calls().is_empty());
}

#[tokio::test]
async fn manual_revalidation_runs_requested_steps() {
    let site = TestSite::new();
    let request = Request::builder()
        .method("POST")
        .uri("/api/revalidate")
        .header("authorization", format!("Bearer {ADMIN_TOKEN}"))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "paths": ["/pricing"], "tags": ["pages"] }).to_string(),
        ))
        .expect("request");
    let (status, body) = send(&site.admin, request).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let summary: serde_json::Value = serde_json::from_str(&body).expect("json");
    assert_eq!(summary["failed"], 0);
    assert_eq!(site.recorder.calls(), ["path /pricing", "tag pages"]);

    let request = Request::builder()
        .method("POST")
        .uri("/api/revalidate")
        .header("authorization", format!("Bearer {ADMIN_TOKEN}"))
        .header("content-type", "application/json")
        .body(Body::from("{}"))
        .expect("request");
    let (status, _) = send(&site.admin, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
