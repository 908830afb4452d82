use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{decode_error, ensure_success, observe, transport_error};
use crate::application::integrations::{ChallengeVerifier, IntegrationError};

const SERVICE: &str = "turnstile";

/// Cloudflare Turnstile siteverify client.
pub struct TurnstileVerifier {
    client: Client,
    verify_url: Url,
    secret_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SiteverifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

impl TurnstileVerifier {
    pub fn new(client: Client, verify_url: Url, secret_key: Option<String>) -> Self {
        Self {
            client,
            verify_url,
            secret_key,
        }
    }
}

#[async_trait]
impl ChallengeVerifier for TurnstileVerifier {
    async fn verify(&self, token: &str, remote_ip: Option<&str>) -> Result<bool, IntegrationError> {
        let Some(secret) = self.secret_key.as_deref() else {
            return Err(IntegrationError::NotConfigured {
                service: SERVICE,
                message: "Turnstile secret key not configured",
            });
        };

        observe(SERVICE, async {
            let mut form = vec![("secret", secret), ("response", token)];
            if let Some(ip) = remote_ip {
                form.push(("remoteip", ip));
            }
            let response = self
                .client
                .post(self.verify_url.clone())
                .form(&form)
                .send()
                .await
                .map_err(|err| transport_error(SERVICE, err))?;
            let outcome: SiteverifyResponse = ensure_success(SERVICE, response)
                .await?
                .json()
                .await
                .map_err(|err| decode_error(SERVICE, err))?;
            if !outcome.success {
                debug!(
                    target: "safecircle::integrations::turnstile",
                    codes = ?outcome.error_codes,
                    "challenge rejected"
                );
            }
            Ok(outcome.success)
        })
        .await
    }
}
