//! Content documents as read from the content store, already resolved for a locale.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::blocks::{Block, Link, MediaRef};
use super::types::{AgencyStatus, DocumentStatus, FeaturedMedia, GlobalSlug, Locale};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breadcrumb {
    pub url: String,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoMeta {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<MediaRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hero {
    #[serde(default)]
    pub heading: Option<String>,
    #[serde(default)]
    pub rich_text_html: String,
    #[serde(default)]
    pub media: Option<MediaRef>,
    #[serde(default)]
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageRecord {
    pub id: Uuid,
    pub locale: Locale,
    pub status: DocumentStatus,
    pub parent_id: Option<Uuid>,
    pub title: String,
    pub slug: String,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub hero: Option<Hero>,
    pub layout: Vec<Block>,
    pub meta: SeoMeta,
    pub noindex: bool,
    pub updated_at: OffsetDateTime,
}

impl PageRecord {
    /// Url of the last breadcrumb, the page's own resolved path.
    pub fn resolved_url(&self) -> Option<&str> {
        self.breadcrumbs
            .last()
            .map(|crumb| crumb.url.as_str())
            .filter(|url| !url.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRecord {
    pub id: Uuid,
    pub locale: Locale,
    pub name: String,
    pub slug: String,
    pub headline: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostRecord {
    pub id: Uuid,
    pub locale: Locale,
    pub status: DocumentStatus,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub category: Option<CategoryRecord>,
    pub published_on: Option<OffsetDateTime>,
    pub featured_media: FeaturedMedia,
    pub image: Option<MediaRef>,
    pub video_url: Option<String>,
    pub authors: Vec<Author>,
    pub content: Vec<Block>,
    pub meta: SeoMeta,
    pub updated_at: OffsetDateTime,
}

impl PostRecord {
    pub fn category_slug(&self) -> Option<&str> {
        self.category.as_ref().map(|category| category.slug.as_str())
    }
}

/// A category with the published posts listed on its archive page.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveRecord {
    pub category: CategoryRecord,
    pub posts: Vec<PostRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOption {
    pub id: Uuid,
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartnerFilters {
    pub industries: Vec<FilterOption>,
    pub specialties: Vec<FilterOption>,
    pub regions: Vec<FilterOption>,
    pub budgets: Vec<FilterOption>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartnerRecord {
    pub id: Uuid,
    pub status: DocumentStatus,
    pub agency_status: AgencyStatus,
    pub name: String,
    pub slug: String,
    pub website: Option<String>,
    pub summary: String,
    pub logo: Option<MediaRef>,
    pub featured: bool,
    pub industries: Vec<String>,
    pub specialties: Vec<String>,
    pub regions: Vec<String>,
    pub budgets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseStudyRecord {
    pub id: Uuid,
    pub locale: Locale,
    pub status: DocumentStatus,
    pub title: String,
    pub slug: String,
    pub partner_id: Option<Uuid>,
    pub layout: Vec<Block>,
    pub meta: SeoMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormFieldKind {
    Text,
    Email,
    Textarea,
    Checkbox,
    Select,
}

impl FormFieldKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FormFieldKind::Text => "text",
            FormFieldKind::Email => "email",
            FormFieldKind::Textarea => "textarea",
            FormFieldKind::Checkbox => "checkbox",
            FormFieldKind::Select => "select",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    pub name: String,
    pub label: String,
    pub kind: FormFieldKind,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormRecord {
    pub id: Uuid,
    pub locale: Locale,
    pub title: String,
    pub fields: Vec<FormField>,
    pub require_turnstile: bool,
    pub confirmation_message: Option<String>,
}

/// One `{field, value}` pair of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionEntry {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSubmissionRecord {
    pub id: Uuid,
    pub form_id: Uuid,
    pub submission_data: Vec<SubmissionEntry>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectRecord {
    pub id: Uuid,
    pub from: String,
    pub to: String,
    pub permanent: bool,
}

/// A localized global document. The payload is typed on read by the consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalRecord {
    pub slug: GlobalSlug,
    pub locale: Locale,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MainMenu {
    #[serde(default)]
    pub tabs: Vec<Link>,
    #[serde(default)]
    pub menu_cta: Option<Link>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FooterColumn {
    pub label: String,
    #[serde(default)]
    pub nav_items: Vec<Link>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Footer {
    #[serde(default)]
    pub columns: Vec<FooterColumn>,
    #[serde(default)]
    pub copyright: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopBar {
    #[serde(default)]
    pub enable_top_bar: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub link: Option<Link>,
}

/// Site-wide chrome assembled from the globals of one locale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteGlobals {
    pub main_menu: MainMenu,
    pub footer: Footer,
    pub top_bar: TopBar,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerProgramBlocks {
    #[serde(default)]
    pub before_directory: Vec<Block>,
    #[serde(default)]
    pub after_directory: Vec<Block>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturedPartners {
    #[serde(default)]
    pub description: String,
    /// Partner slugs, in display order.
    #[serde(default)]
    pub partners: Vec<String>,
}

/// The `partner-program` global that frames the partner directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerProgram {
    #[serde(default)]
    pub content_blocks: PartnerProgramBlocks,
    #[serde(default)]
    pub featured_partners: Option<FeaturedPartners>,
}
