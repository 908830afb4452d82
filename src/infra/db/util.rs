use sqlx::types::Json;

use crate::application::repos::RepoError;
use crate::domain::types::{Locale, Visibility};

pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::Database(db) if db.message().contains("duplicate key") => {
            RepoError::Duplicate {
                constraint: db.constraint().unwrap_or("unknown").to_string(),
            }
        }
        sqlx::Error::Database(db)
            if db.message().contains("violates")
                || db.message().contains("invalid input syntax") =>
        {
            RepoError::InvalidInput {
                message: db.message().to_string(),
            }
        }
        sqlx::Error::Database(db)
            if db
                .message()
                .contains("canceling statement due to user request") =>
        {
            RepoError::Timeout
        }
        sqlx::Error::ColumnDecode { index, source } => {
            RepoError::decode(format!("column {index}: {source}"))
        }
        other => RepoError::from_persistence(other),
    }
}

/// The requested locale and the fallback locale, bound as `$1` and `$2`.
pub(super) fn locale_pair(locale: Locale) -> (&'static str, &'static str) {
    (locale.as_str(), Locale::DEFAULT.as_str())
}

/// Bound as a boolean that short-circuits the `status = 'published'` filter.
pub(super) fn include_drafts(visibility: Visibility) -> bool {
    visibility.is_draft()
}

pub(super) fn json_or_default<T: Default>(value: Option<Json<T>>) -> T {
    value.map(|Json(inner)| inner).unwrap_or_default()
}

