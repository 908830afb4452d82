use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use url::Url;

use super::{decode_error, endpoint, ensure_success, observe, transport_error};
use crate::application::integrations::{IntegrationError, StarSource};

const SERVICE: &str = "github";

/// Stargazer count of one GitHub repository.
pub struct GithubStars {
    client: Client,
    api_base: Url,
    repository: String,
    token: Option<String>,
}

#[derive(Deserialize)]
struct RepositoryInfo {
    stargazers_count: u64,
}

impl GithubStars {
    pub fn new(client: Client, api_base: Url, repository: String, token: Option<String>) -> Self {
        Self {
            client,
            api_base,
            repository,
            token,
        }
    }
}

#[async_trait]
impl StarSource for GithubStars {
    async fn star_count(&self) -> Result<u64, IntegrationError> {
        observe(SERVICE, async {
            let mut request = self
                .client
                .get(endpoint(&self.api_base, &format!("repos/{}", self.repository)))
                .header(ACCEPT, "application/vnd.github+json");
            if let Some(token) = self.token.as_deref() {
                request = request.header(AUTHORIZATION, format!("token {token}"));
            }
            let response = request
                .send()
                .await
                .map_err(|err| transport_error(SERVICE, err))?;
            let info: RepositoryInfo = ensure_success(SERVICE, response)
                .await?
                .json()
                .await
                .map_err(|err| decode_error(SERVICE, err))?;
            Ok(info.stargazers_count)
        })
        .await
    }
}
