//! Partner directory and case studies.

use async_trait::async_trait;
use sqlx::types::Json;
use uuid::Uuid;

use crate::application::repos::{CaseStudiesRepo, PartnersRepo, RepoError};
use crate::domain::blocks::{Block, MediaRef};
use crate::domain::entities::{
    CaseStudyRecord, FilterOption, PartnerFilters, PartnerRecord, SeoMeta,
};
use crate::domain::types::{AgencyStatus, DocumentStatus, Locale, Visibility};

use super::util::{include_drafts, json_or_default, locale_pair};
use super::{PostgresRepositories, map_sqlx_error};

macro_rules! partner_select {
    () => {
        "SELECT id, status, agency_status, name, slug, website, summary, \
        logo, featured, industries, specialties, regions, budgets \
        FROM partners "
    };
}

macro_rules! case_study_select {
    () => {
        "SELECT s.id, s.status, s.partner_id, \
        COALESCE(t.title, d.title) AS title, \
        COALESCE(t.slug, d.slug) AS slug, \
        COALESCE(t.layout, d.layout) AS layout, \
        COALESCE(t.meta, d.meta) AS meta \
        FROM case_studies s \
        LEFT JOIN case_study_translations t ON t.case_study_id = s.id AND t.locale = $1 \
        LEFT JOIN case_study_translations d ON d.case_study_id = s.id AND d.locale = $2 \
        WHERE (t.case_study_id IS NOT NULL OR d.case_study_id IS NOT NULL) "
    };
}

#[derive(sqlx::FromRow)]
struct PartnerRow {
    id: Uuid,
    status: DocumentStatus,
    agency_status: AgencyStatus,
    name: String,
    slug: String,
    website: Option<String>,
    summary: String,
    logo: Option<Json<MediaRef>>,
    featured: bool,
    industries: Vec<String>,
    specialties: Vec<String>,
    regions: Vec<String>,
    budgets: Vec<String>,
}

impl From<PartnerRow> for PartnerRecord {
    fn from(row: PartnerRow) -> Self {
        Self {
            id: row.id,
            status: row.status,
            agency_status: row.agency_status,
            name: row.name,
            slug: row.slug,
            website: row.website,
            summary: row.summary,
            logo: row.logo.map(|Json(logo)| logo),
            featured: row.featured,
            industries: row.industries,
            specialties: row.specialties,
            regions: row.regions,
            budgets: row.budgets,
        }
    }
}

#[derive(sqlx::FromRow)]
struct FilterOptionRow {
    id: Uuid,
    name: String,
    value: String,
}

impl From<FilterOptionRow> for FilterOption {
    fn from(row: FilterOptionRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            value: row.value,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CaseStudyRow {
    id: Uuid,
    status: DocumentStatus,
    partner_id: Option<Uuid>,
    title: String,
    slug: String,
    layout: Option<Json<Vec<Block>>>,
    meta: Option<Json<SeoMeta>>,
}

impl CaseStudyRow {
    fn into_record(self, locale: Locale) -> CaseStudyRecord {
        CaseStudyRecord {
            id: self.id,
            locale,
            status: self.status,
            title: self.title,
            slug: self.slug,
            partner_id: self.partner_id,
            layout: json_or_default(self.layout),
            meta: json_or_default(self.meta),
        }
    }
}

impl PostgresRepositories {
    async fn filter_options(&self, kind: &str, limit: i64) -> Result<Vec<FilterOption>, RepoError> {
        let rows = sqlx::query_as::<_, FilterOptionRow>(
            "SELECT id, name, value FROM partner_filter_options \
             WHERE kind = $1 ORDER BY name LIMIT $2",
        )
        .bind(kind)
        .bind(limit)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(FilterOption::from).collect())
    }
}

#[async_trait]
impl PartnersRepo for PostgresRepositories {
    async fn list_active_partners(
        &self,
        visibility: Visibility,
    ) -> Result<Vec<PartnerRecord>, RepoError> {
        let rows = sqlx::query_as::<_, PartnerRow>(concat!(
            partner_select!(),
            "WHERE agency_status = 'active'::agency_status \
             AND ($1 OR status = 'published'::document_status) ORDER BY slug"
        ))
        .bind(include_drafts(visibility))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(PartnerRecord::from).collect())
    }

    async fn find_partner(
        &self,
        slug: &str,
        visibility: Visibility,
    ) -> Result<Option<PartnerRecord>, RepoError> {
        let row = sqlx::query_as::<_, PartnerRow>(concat!(
            partner_select!(),
            "WHERE slug = $1 \
             AND ($2 OR status = 'published'::document_status)"
        ))
        .bind(slug)
        .bind(include_drafts(visibility))
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.map(PartnerRecord::from))
    }

    async fn partner_filters(&self, limit: u32) -> Result<PartnerFilters, RepoError> {
        let limit = i64::from(limit);
        Ok(PartnerFilters {
            industries: self.filter_options("industry", limit).await?,
            specialties: self.filter_options("specialty", limit).await?,
            regions: self.filter_options("region", limit).await?,
            budgets: self.filter_options("budget", limit).await?,
        })
    }
}

#[async_trait]
impl CaseStudiesRepo for PostgresRepositories {
    async fn find_case_study(
        &self,
        slug: &str,
        locale: Locale,
        visibility: Visibility,
    ) -> Result<Option<CaseStudyRecord>, RepoError> {
        let (requested, fallback) = locale_pair(locale);
        let row = sqlx::query_as::<_, CaseStudyRow>(concat!(
            case_study_select!(),
            "AND COALESCE(t.slug, d.slug) = $3 \
             AND ($4 OR s.status = 'published'::document_status) \
             ORDER BY s.updated_at DESC LIMIT 1"
        ))
        .bind(requested)
        .bind(fallback)
        .bind(slug)
        .bind(include_drafts(visibility))
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.map(|row| row.into_record(locale)))
    }

    async fn list_published_case_studies(
        &self,
        locale: Locale,
    ) -> Result<Vec<CaseStudyRecord>, RepoError> {
        let (requested, fallback) = locale_pair(locale);
        let rows = sqlx::query_as::<_, CaseStudyRow>(concat!(
            case_study_select!(),
            "AND s.status = 'published'::document_status \
             ORDER BY COALESCE(t.slug, d.slug)"
        ))
        .bind(requested)
        .bind(fallback)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(|row| row.into_record(locale)).collect())
    }
}
