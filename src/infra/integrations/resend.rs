use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{decode_error, endpoint, ensure_success, observe, transport_error};
use crate::application::integrations::{IntegrationError, NewContact, NewsletterAudience};

const SERVICE: &str = "resend";

/// Resend audience contacts API.
pub struct ResendAudience {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    audience_id: Option<String>,
}

#[derive(Serialize)]
struct CreateContact<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_name: Option<&'a str>,
    unsubscribed: bool,
}

#[derive(Deserialize)]
struct ContactList {
    #[serde(default)]
    data: Vec<ContactEntry>,
}

#[derive(Deserialize)]
struct ContactEntry {
    email: String,
}

impl ResendAudience {
    pub fn new(
        client: Client,
        base_url: Url,
        api_key: Option<String>,
        audience_id: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url,
            api_key,
            audience_id,
        }
    }

    fn credentials(&self) -> Result<(&str, String), IntegrationError> {
        let audience_id = self
            .audience_id
            .as_deref()
            .ok_or(IntegrationError::NotConfigured {
                service: SERVICE,
                message: "Audience ID not configured",
            })?;
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(IntegrationError::NotConfigured {
                service: SERVICE,
                message: "API key not configured",
            })?;
        let url = endpoint(&self.base_url, &format!("audiences/{audience_id}/contacts"));
        Ok((api_key, url))
    }
}

#[async_trait]
impl NewsletterAudience for ResendAudience {
    async fn add_contact(&self, contact: &NewContact) -> Result<(), IntegrationError> {
        let (api_key, url) = self.credentials()?;
        observe(SERVICE, async {
            let body = CreateContact {
                email: &contact.email,
                first_name: contact.first_name.as_deref(),
                last_name: contact.last_name.as_deref(),
                unsubscribed: false,
            };
            let response = self
                .client
                .post(url)
                .bearer_auth(api_key)
                .json(&body)
                .send()
                .await
                .map_err(|err| transport_error(SERVICE, err))?;
            ensure_success(SERVICE, response).await?;
            Ok(())
        })
        .await
    }

    async fn list_contact_emails(&self) -> Result<Vec<String>, IntegrationError> {
        let (api_key, url) = self.credentials()?;
        observe(SERVICE, async {
            let response = self
                .client
                .get(url)
                .bearer_auth(api_key)
                .send()
                .await
                .map_err(|err| transport_error(SERVICE, err))?;
            let list: ContactList = ensure_success(SERVICE, response)
                .await?
                .json()
                .await
                .map_err(|err| decode_error(SERVICE, err))?;
            Ok(list.data.into_iter().map(|entry| entry.email).collect())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use httpmock::MockServer;

    use super::*;

    fn audience(server: &MockServer, audience_id: Option<&str>) -> ResendAudience {
        ResendAudience::new(
            Client::new(),
            Url::parse(&server.base_url()).expect("url"),
            Some("re_test".into()),
            audience_id.map(str::to_string),
        )
    }

    #[tokio::test]
    async fn add_contact_posts_to_audience() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method("POST")
                    .path("/audiences/aud-1/contacts")
                    .header("authorization", "Bearer re_test")
                    .json_body_includes(r#"{"email":"ada@example.com","first_name":"Ada","unsubscribed":false}"#);
                then.status(201)
                    .header("content-type", "application/json")
                    .body(r#"{"object":"contact","id":"c1"}"#);
            })
            .await;

        audience(&server, Some("aud-1"))
            .add_contact(&NewContact {
                email: "ada@example.com".into(),
                first_name: Some("Ada".into()),
                last_name: None,
            })
            .await
            .expect("contact added");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn list_returns_emails() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method("GET").path("/audiences/aud-1/contacts");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(r#"{"object":"list","data":[{"id":"c1","email":"ada@example.com"}]}"#);
            })
            .await;

        let emails = audience(&server, Some("aud-1"))
            .list_contact_emails()
            .await
            .expect("listed");
        assert_eq!(emails, vec!["ada@example.com".to_string()]);
    }

    #[tokio::test]
    async fn missing_audience_is_reported() {
        let server = MockServer::start_async().await;
        let err = audience(&server, None)
            .list_contact_emails()
            .await
            .expect_err("not configured");
        assert_eq!(
            err.to_string(),
            "resend is not configured: Audience ID not configured"
        );
    }

    #[tokio::test]
    async fn upstream_errors_are_rejections() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method("POST").path("/audiences/aud-1/contacts");
                then.status(422).body("invalid email");
            })
            .await;

        let err = audience(&server, Some("aud-1"))
            .add_contact(&NewContact {
                email: "nope".into(),
                first_name: None,
                last_name: None,
            })
            .await
            .expect_err("rejected");
        assert!(matches!(err, IntegrationError::Rejected { status: 422, .. }));
    }
}
