use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use url::Url;

use crate::cache::{CacheTag, RevalidateError, Revalidator, path_variants};

/// Forwards invalidations to an edge cache purge endpoint.
pub struct PurgeWebhook {
    client: Client,
    webhook_url: Url,
    token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
enum PurgeRequest<'a> {
    Paths(Vec<String>),
    Tags(Vec<&'a str>),
}

impl PurgeWebhook {
    pub fn new(client: Client, webhook_url: Url, token: Option<String>) -> Self {
        Self {
            client,
            webhook_url,
            token,
        }
    }

    async fn send(&self, body: &PurgeRequest<'_>) -> Result<(), RevalidateError> {
        let mut request = self.client.post(self.webhook_url.clone()).json(body);
        if let Some(token) = self.token.as_deref() {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(|err| {
            if err.is_timeout() {
                RevalidateError::Timeout
            } else {
                RevalidateError::Transport(err.to_string())
            }
        })?;
        if !response.status().is_success() {
            return Err(RevalidateError::Rejected {
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Revalidator for PurgeWebhook {
    fn name(&self) -> &'static str {
        "purge"
    }

    async fn revalidate_path(&self, path: &str) -> Result<(), RevalidateError> {
        self.send(&PurgeRequest::Paths(path_variants(path))).await
    }

    async fn revalidate_tag(&self, tag: &CacheTag) -> Result<(), RevalidateError> {
        self.send(&PurgeRequest::Tags(vec![tag.as_str()])).await
    }
}

#[cfg(test)]
mod tests {
    use httpmock::MockServer;

    use super::*;

    fn webhook(server: &MockServer) -> PurgeWebhook {
        PurgeWebhook::new(
            Client::new(),
            Url::parse(&server.url("/purge")).expect("url"),
            Some("purge-token".into()),
        )
    }

    #[tokio::test]
    async fn paths_are_sent_with_locale_variants() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method("POST")
                    .path("/purge")
                    .header("authorization", "Bearer purge-token")
                    .json_body(serde_json::json!({
                        "paths": ["/posts/news", "/en/posts/news", "/es/posts/news", "/fr/posts/news"]
                    }));
                then.status(200);
            })
            .await;

        webhook(&server)
            .revalidate_path("/posts/news")
            .await
            .expect("purged");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn failures_map_to_rejections() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method("POST").path("/purge");
                then.status(500);
            })
            .await;

        let err = webhook(&server)
            .revalidate_tag(&CacheTag::new("archives".to_string()))
            .await
            .expect_err("rejected");
        assert!(matches!(err, RevalidateError::Rejected { status: 500 }));
    }
}
