//! HTTP adapters for the outbound services.
//!
//! Every adapter shares one `reqwest` client built with the configured
//! timeout and reports latency and failures through `metrics`.

use std::future::Future;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use reqwest::{Client, Response};

use crate::application::integrations::IntegrationError;
use crate::infra::error::InfraError;

mod github;
mod purge;
mod resend;
mod turnstile;

pub use github::GithubStars;
pub use purge::PurgeWebhook;
pub use resend::ResendAudience;
pub use turnstile::TurnstileVerifier;

/// User agent sent on every outbound call.
pub const USER_AGENT: &str = "safecircleia-landing";

pub fn build_client(timeout: Duration) -> Result<Client, InfraError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|err| InfraError::http_client(err.to_string()))
}

/// Time `call` and count its failure, labelled by `service`.
pub(crate) async fn observe<T, F>(service: &'static str, call: F) -> Result<T, IntegrationError>
where
    F: Future<Output = Result<T, IntegrationError>>,
{
    let started = Instant::now();
    let result = call.await;
    histogram!("safecircle_integration_request_ms", "service" => service)
        .record(started.elapsed().as_secs_f64() * 1000.0);
    if let Err(error) = &result {
        let kind = match error {
            IntegrationError::NotConfigured { .. } => "not_configured",
            IntegrationError::Transport { .. } => "transport",
            IntegrationError::Timeout { .. } => "timeout",
            IntegrationError::Rejected { .. } => "rejected",
            IntegrationError::Decode { .. } => "decode",
        };
        counter!(
            "safecircle_integration_failures_total",
            "service" => service,
            "kind" => kind
        )
        .increment(1);
    }
    result
}

pub(crate) fn transport_error(service: &'static str, error: reqwest::Error) -> IntegrationError {
    if error.is_timeout() {
        IntegrationError::Timeout { service }
    } else {
        IntegrationError::Transport {
            service,
            message: error.to_string(),
        }
    }
}

/// Pass successful responses through; turn anything else into `Rejected`.
pub(crate) async fn ensure_success(
    service: &'static str,
    response: Response,
) -> Result<Response, IntegrationError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(IntegrationError::Rejected {
        service,
        status: status.as_u16(),
        message,
    })
}

pub(crate) fn decode_error(service: &'static str, error: reqwest::Error) -> IntegrationError {
    IntegrationError::Decode {
        service,
        message: error.to_string(),
    }
}

/// `base` with `path` appended, ignoring trailing slashes on the base.
pub(crate) fn endpoint(base: &url::Url, path: &str) -> String {
    format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slashes() {
        let base = url::Url::parse("https://api.resend.com/").expect("url");
        assert_eq!(
            endpoint(&base, "/audiences/a/contacts"),
            "https://api.resend.com/audiences/a/contacts"
        );
    }

    #[tokio::test]
    async fn observe_passes_results_through() {
        let ok = observe("test", async { Ok::<_, IntegrationError>(3) }).await;
        assert_eq!(ok.expect("ok"), 3);

        let err = observe("test", async {
            Err::<u8, _>(IntegrationError::Timeout { service: "test" })
        })
        .await;
        assert!(matches!(err, Err(IntegrationError::Timeout { .. })));
    }
}
