use std::error::Error as StdError;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::{application::repos::RepoError, domain::error::DomainError, infra::error::InfraError};

/// Diagnostic detail attached to a response for the logging middleware.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorBody {
    Text,
    Json,
}

#[derive(Serialize)]
struct JsonErrorBody<'a> {
    error: &'a str,
}

/// An HTTP failure with a public message and a private report.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    body: ErrorBody,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            status,
            public_message,
            body: ErrorBody::Text,
            report: ErrorReport::from_message(source, status, detail),
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        Self {
            status,
            public_message,
            body: ErrorBody::Text,
            report: ErrorReport::from_error(source, status, error),
        }
    }

    /// Render the public message as `{"error": ...}`.
    pub fn json(mut self) -> Self {
        self.body = ErrorBody::Json;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = match self.body {
            ErrorBody::Text => (self.status, self.public_message).into_response(),
            ErrorBody::Json => (
                self.status,
                Json(JsonErrorBody {
                    error: self.public_message,
                }),
            )
                .into_response(),
        };
        self.report.attach(&mut response);
        response
    }
}

impl From<RepoError> for HttpError {
    fn from(error: RepoError) -> Self {
        let (status, message) = match &error {
            RepoError::NotFound => (StatusCode::NOT_FOUND, "Resource not found"),
            RepoError::InvalidInput { .. } => (StatusCode::BAD_REQUEST, "Invalid request"),
            RepoError::Duplicate { .. } => (StatusCode::CONFLICT, "Document already exists"),
            RepoError::Timeout => (StatusCode::SERVICE_UNAVAILABLE, "Content store timed out"),
            RepoError::Persistence(_) | RepoError::Decode { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };
        HttpError::from_error("application::error::repo_error", status, message, &error)
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("resource not found")]
    NotFound,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Domain(DomainError::NotFound { .. })
            | AppError::Repo(RepoError::NotFound)
            | AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Domain(DomainError::Validation { .. })
            | AppError::Repo(RepoError::InvalidInput { .. })
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Domain(DomainError::PathConflict { .. })
            | AppError::Repo(RepoError::Duplicate { .. }) => StatusCode::CONFLICT,
            AppError::Infra(InfraError::Database { .. }) | AppError::Repo(RepoError::Timeout) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Infra(_)
            | AppError::Repo(RepoError::Persistence(_) | RepoError::Decode { .. })
            | AppError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn presentation_message(&self) -> &'static str {
        match self.status_code() {
            StatusCode::NOT_FOUND => "Resource not found",
            StatusCode::BAD_REQUEST => "Request could not be processed",
            StatusCode::CONFLICT => "Document conflicts with existing content",
            StatusCode::SERVICE_UNAVAILABLE => "Service temporarily unavailable",
            _ => "Unexpected error occurred",
        }
    }
}

impl From<AppError> for HttpError {
    fn from(error: AppError) -> Self {
        let status = error.status_code();
        let message = error.presentation_message();
        HttpError::from_error("application::error::AppError", status, message, &error)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        HttpError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Locale;

    #[test]
    fn path_conflict_maps_to_conflict() {
        let error = AppError::from(DomainError::path_conflict("/about", Locale::En));
        assert_eq!(error.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn report_collects_source_chain() {
        let error = AppError::from(InfraError::Bind {
            addr: "127.0.0.1:80".parse().expect("addr"),
            source: std::io::Error::other("denied"),
        });
        let report = ErrorReport::from_error("test", StatusCode::INTERNAL_SERVER_ERROR, &error);
        assert_eq!(report.messages.len(), 2);
        assert_eq!(report.messages[1], "denied");
    }

    #[test]
    fn json_errors_carry_report() {
        let response = HttpError::new("test", StatusCode::BAD_GATEWAY, "Failed", "upstream")
            .json()
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(response.extensions().get::<ErrorReport>().is_some());
    }
}
