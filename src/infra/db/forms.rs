use async_trait::async_trait;
use sqlx::types::Json;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{FormSubmissionsRepo, FormsRepo, RepoError};
use crate::domain::entities::{FormField, FormRecord, FormSubmissionRecord, SubmissionEntry};
use crate::domain::types::Locale;

use super::util::{json_or_default, locale_pair};
use super::{PostgresRepositories, map_sqlx_error};

macro_rules! form_select {
    () => {
        "SELECT f.id, f.require_turnstile, \
        COALESCE(t.title, d.title) AS title, \
        COALESCE(t.fields, d.fields) AS fields, \
        COALESCE(t.confirmation_message, d.confirmation_message) AS confirmation_message \
        FROM forms f \
        LEFT JOIN form_translations t ON t.form_id = f.id AND t.locale = $1 \
        LEFT JOIN form_translations d ON d.form_id = f.id AND d.locale = $2 \
        WHERE (t.form_id IS NOT NULL OR d.form_id IS NOT NULL) "
    };
}

#[derive(sqlx::FromRow)]
struct FormRow {
    id: Uuid,
    require_turnstile: bool,
    title: String,
    fields: Option<Json<Vec<FormField>>>,
    confirmation_message: Option<String>,
}

impl FormRow {
    fn into_record(self, locale: Locale) -> FormRecord {
        FormRecord {
            id: self.id,
            locale,
            title: self.title,
            fields: json_or_default(self.fields),
            require_turnstile: self.require_turnstile,
            confirmation_message: self.confirmation_message,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SubmissionRow {
    id: Uuid,
    form_id: Uuid,
    submission_data: Json<Vec<SubmissionEntry>>,
    created_at: OffsetDateTime,
}

#[async_trait]
impl FormsRepo for PostgresRepositories {
    async fn find_form(&self, id: Uuid, locale: Locale) -> Result<Option<FormRecord>, RepoError> {
        let (requested, fallback) = locale_pair(locale);
        let row = sqlx::query_as::<_, FormRow>(concat!(
            form_select!(),
            "AND f.id = $3"
        ))
        .bind(requested)
        .bind(fallback)
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.map(|row| row.into_record(locale)))
    }

    async fn find_form_by_title(
        &self,
        title: &str,
        locale: Locale,
    ) -> Result<Option<FormRecord>, RepoError> {
        let (requested, fallback) = locale_pair(locale);
        let row = sqlx::query_as::<_, FormRow>(concat!(
            form_select!(),
            "AND COALESCE(t.title, d.title) = $3 LIMIT 1"
        ))
        .bind(requested)
        .bind(fallback)
        .bind(title)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.map(|row| row.into_record(locale)))
    }
}

#[async_trait]
impl FormSubmissionsRepo for PostgresRepositories {
    async fn create_submission(
        &self,
        form_id: Uuid,
        entries: &[SubmissionEntry],
    ) -> Result<FormSubmissionRecord, RepoError> {
        let row = sqlx::query_as::<_, SubmissionRow>(
            "INSERT INTO form_submissions (id, form_id, submission_data) \
             VALUES ($1, $2, $3) \
             RETURNING id, form_id, submission_data, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(form_id)
        .bind(Json(entries))
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(FormSubmissionRecord {
            id: row.id,
            form_id: row.form_id,
            submission_data: row.submission_data.0,
            created_at: row.created_at,
        })
    }
}
