use thiserror::Error;

use super::types::Locale;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{entity} `{key}` not found")]
    NotFound { entity: &'static str, key: String },
    #[error("invalid document: {message}")]
    Validation { message: String },
    #[error("path `{path}` is already taken in locale `{locale}`")]
    PathConflict { path: String, locale: Locale },
}

impl DomainError {
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn path_conflict(path: impl Into<String>, locale: Locale) -> Self {
        Self::PathConflict {
            path: path.into(),
            locale,
        }
    }
}
