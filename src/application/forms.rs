//! Form submissions: challenge verification, persistence, newsletter sync.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::content::ContentService;
use crate::application::integrations::ChallengeVerifier;
use crate::application::newsletter::{NewsletterService, SignupOrigin, extract_newsletter_fields};
use crate::application::repos::{FormSubmissionsRepo, RepoError};
use crate::domain::entities::{FormRecord, FormSubmissionRecord, SubmissionEntry};
use crate::domain::types::Locale;

const TARGET: &str = "safecircle::application::forms";

/// Submission field carrying the challenge token.
pub const VERIFICATION_FIELD: &str = "turnstile";
pub const MISSING_TOKEN_MESSAGE: &str = "Please complete the verification";
pub const INVALID_TOKEN_MESSAGE: &str = "Invalid verification token";
pub const REQUIRED_FIELD_MESSAGE: &str = "This field is required";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum FormSubmissionError {
    #[error("form `{0}` does not exist")]
    FormNotFound(Uuid),
    #[error("submission rejected with {} field error(s)", .0.len())]
    Invalid(Vec<FieldError>),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl FormSubmissionError {
    /// Errors in the `{field, message}` shape returned to the client.
    pub fn field_errors(&self) -> Vec<FieldError> {
        match self {
            FormSubmissionError::FormNotFound(_) => {
                vec![FieldError::new("form", "Form not found")]
            }
            FormSubmissionError::Invalid(errors) => errors.clone(),
            FormSubmissionError::Repo(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SubmissionRequest {
    pub form_id: Uuid,
    pub locale: Option<Locale>,
    pub entries: Vec<SubmissionEntry>,
    pub verification_token: Option<String>,
    pub remote_ip: Option<String>,
    pub page_name: Option<String>,
    pub page_uri: Option<String>,
}

/// Check the challenge token of a submission to `form`.
///
/// Forms that do not require the challenge accept any token, including none.
/// Transport failures reject the submission as invalid.
pub async fn verify_challenge(
    form: &FormRecord,
    token: Option<&str>,
    remote_ip: Option<&str>,
    verifier: &dyn ChallengeVerifier,
) -> Result<(), FieldError> {
    if !form.require_turnstile {
        return Ok(());
    }

    let Some(token) = token.filter(|token| !token.is_empty()) else {
        return Err(FieldError::new(VERIFICATION_FIELD, MISSING_TOKEN_MESSAGE));
    };

    match verifier.verify(token, remote_ip).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(FieldError::new(VERIFICATION_FIELD, INVALID_TOKEN_MESSAGE)),
        Err(error) => {
            warn!(
                target: TARGET,
                form = %form.title,
                service = error.service(),
                error = %error,
                "challenge verification failed"
            );
            Err(FieldError::new(VERIFICATION_FIELD, INVALID_TOKEN_MESSAGE))
        }
    }
}

/// Required fields of `form` missing or blank in `entries`.
pub fn missing_required_fields(form: &FormRecord, entries: &[SubmissionEntry]) -> Vec<FieldError> {
    form.fields
        .iter()
        .filter(|field| field.required)
        .filter(|field| {
            !entries
                .iter()
                .any(|entry| entry.field == field.name && !entry.value.trim().is_empty())
        })
        .map(|field| FieldError::new(field.name.clone(), REQUIRED_FIELD_MESSAGE))
        .collect()
}

#[derive(Clone)]
pub struct FormSubmissionService {
    content: ContentService,
    submissions: Arc<dyn FormSubmissionsRepo>,
    verifier: Arc<dyn ChallengeVerifier>,
    newsletter: NewsletterService,
}

impl FormSubmissionService {
    pub fn new(
        content: ContentService,
        verifier: Arc<dyn ChallengeVerifier>,
        newsletter: NewsletterService,
    ) -> Self {
        let submissions = content.repos().submissions.clone();
        Self {
            content,
            submissions,
            verifier,
            newsletter,
        }
    }

    pub async fn submit(
        &self,
        request: SubmissionRequest,
    ) -> Result<FormSubmissionRecord, FormSubmissionError> {
        let locale = request.locale.unwrap_or(Locale::DEFAULT);
        let form = self
            .content
            .form(request.form_id, locale)
            .await?
            .ok_or(FormSubmissionError::FormNotFound(request.form_id))?;

        let mut errors = missing_required_fields(&form, &request.entries);
        if let Err(error) = verify_challenge(
            &form,
            request.verification_token.as_deref(),
            request.remote_ip.as_deref(),
            self.verifier.as_ref(),
        )
        .await
        {
            errors.push(error);
        }
        if !errors.is_empty() {
            return Err(FormSubmissionError::Invalid(errors));
        }

        let record = self
            .submissions
            .create_submission(form.id, &request.entries)
            .await?;
        info!(
            target: TARGET,
            form = %form.title,
            submission_id = %record.id,
            "Form Submission Received"
        );

        if let Some(signup) = extract_newsletter_fields(&record.submission_data) {
            let origin = SignupOrigin {
                page_name: request.page_name,
                page_uri: request.page_uri,
                source: "form-submission",
            };
            // Failures are logged by the newsletter service and never fail the submission.
            let _ = self.newsletter.add_to_audience(&signup, &origin).await;
        }

        Ok(record)
    }
}
