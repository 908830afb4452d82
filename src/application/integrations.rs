//! Seams for the outbound services the site talks to.
//!
//! Adapters live in `infra::integrations`; tests substitute in-memory fakes.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("{service} is not configured: {message}")]
    NotConfigured {
        service: &'static str,
        message: &'static str,
    },
    #[error("{service} request failed: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },
    #[error("{service} request timed out")]
    Timeout { service: &'static str },
    #[error("{service} answered with status {status}: {message}")]
    Rejected {
        service: &'static str,
        status: u16,
        message: String,
    },
    #[error("{service} response could not be decoded: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },
}

impl IntegrationError {
    pub fn service(&self) -> &'static str {
        match self {
            IntegrationError::NotConfigured { service, .. }
            | IntegrationError::Transport { service, .. }
            | IntegrationError::Timeout { service }
            | IntegrationError::Rejected { service, .. }
            | IntegrationError::Decode { service, .. } => service,
        }
    }
}

/// Bot challenge verification (Cloudflare Turnstile in production).
#[async_trait]
pub trait ChallengeVerifier: Send + Sync {
    /// Whether the provider accepted `token`.
    async fn verify(&self, token: &str, remote_ip: Option<&str>) -> Result<bool, IntegrationError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContact {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// The mailing audience newsletter signups are added to (Resend in production).
#[async_trait]
pub trait NewsletterAudience: Send + Sync {
    async fn add_contact(&self, contact: &NewContact) -> Result<(), IntegrationError>;

    async fn list_contact_emails(&self) -> Result<Vec<String>, IntegrationError>;
}

/// Source of the repository star count (GitHub in production).
#[async_trait]
pub trait StarSource: Send + Sync {
    async fn star_count(&self) -> Result<u64, IntegrationError>;
}
