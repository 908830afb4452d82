//! Newsletter signup from form submissions.

use std::sync::Arc;

use tracing::{info, warn};

use crate::application::integrations::{IntegrationError, NewContact, NewsletterAudience};
use crate::domain::entities::SubmissionEntry;

const TARGET: &str = "safecircle::application::newsletter";

/// Contact fields picked out of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsletterSignup {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Where a signup came from, recorded in the log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignupOrigin {
    pub page_name: Option<String>,
    pub page_uri: Option<String>,
    pub source: &'static str,
}

/// Match submission fields by name. The first field whose name looks like an
/// email decides; when it has no value nothing is signed up.
pub fn extract_newsletter_fields(entries: &[SubmissionEntry]) -> Option<NewsletterSignup> {
    let email = entries.iter().find(|entry| {
        entry.field.to_lowercase().contains("email") || entry.field == "email"
    })?;
    if email.value.is_empty() {
        return None;
    }

    let first_name = entries.iter().find(|entry| {
        let lower = entry.field.to_lowercase();
        lower.contains("firstname")
            || lower.contains("first_name")
            || entry.field == "firstName"
            || entry.field == "name"
    });
    let last_name = entries.iter().find(|entry| {
        let lower = entry.field.to_lowercase();
        lower.contains("lastname") || lower.contains("last_name") || entry.field == "lastName"
    });

    Some(NewsletterSignup {
        email: email.value.clone(),
        first_name: first_name.map(|entry| entry.value.clone()),
        last_name: last_name.map(|entry| entry.value.clone()),
    })
}

#[derive(Clone)]
pub struct NewsletterService {
    audience: Arc<dyn NewsletterAudience>,
}

impl NewsletterService {
    pub fn new(audience: Arc<dyn NewsletterAudience>) -> Self {
        Self { audience }
    }

    pub async fn add_to_audience(
        &self,
        signup: &NewsletterSignup,
        origin: &SignupOrigin,
    ) -> Result<(), IntegrationError> {
        let contact = NewContact {
            email: signup.email.clone(),
            first_name: signup.first_name.clone(),
            last_name: signup.last_name.clone(),
        };
        match self.audience.add_contact(&contact).await {
            Ok(()) => {
                info!(
                    target: TARGET,
                    email = %signup.email,
                    source = origin.source,
                    page_name = origin.page_name.as_deref().unwrap_or(""),
                    page_uri = origin.page_uri.as_deref().unwrap_or(""),
                    "added contact to newsletter audience"
                );
                Ok(())
            }
            Err(error) => {
                warn!(
                    target: TARGET,
                    email = %signup.email,
                    source = origin.source,
                    error = %error,
                    "failed to add contact to newsletter audience"
                );
                Err(error)
            }
        }
    }

    /// Any failure answers `false`.
    pub async fn is_email_in_audience(&self, email: &str) -> bool {
        match self.audience.list_contact_emails().await {
            Ok(emails) => emails.iter().any(|candidate| candidate == email),
            Err(error) => {
                warn!(target: TARGET, error = %error, "failed to list newsletter audience");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(pairs: &[(&str, &str)]) -> Vec<SubmissionEntry> {
        pairs
            .iter()
            .map(|(field, value)| SubmissionEntry {
                field: field.to_string(),
                value: value.to_string(),
            })
            .collect()
    }

    #[test]
    fn matches_fields_by_fuzzy_name() {
        let signup = extract_newsletter_fields(&entries(&[
            ("workEmail", "ada@example.com"),
            ("first_name", "Ada"),
            ("LastName", "Lovelace"),
        ]))
        .expect("signup");
        assert_eq!(signup.email, "ada@example.com");
        assert_eq!(signup.first_name.as_deref(), Some("Ada"));
        assert_eq!(signup.last_name.as_deref(), Some("Lovelace"));
    }

    #[test]
    fn plain_name_counts_as_first_name() {
        let signup = extract_newsletter_fields(&entries(&[("email", "a@b.c"), ("name", "Grace")]))
            .expect("signup");
        assert_eq!(signup.first_name.as_deref(), Some("Grace"));
        assert_eq!(signup.last_name, None);
    }

    #[test]
    fn empty_email_means_no_signup() {
        assert_eq!(
            extract_newsletter_fields(&entries(&[("email", ""), ("name", "Grace")])),
            None
        );
        assert_eq!(extract_newsletter_fields(&entries(&[("message", "hi")])), None);
    }

    #[test]
    fn first_email_like_field_decides() {
        let found = extract_newsletter_fields(&entries(&[
            ("emailConsent", ""),
            ("email", "late@example.com"),
        ]));
        assert_eq!(found, None);
    }
}
