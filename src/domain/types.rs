//! Shared domain enumerations aligned with persisted database enums.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Locales the site is published in. `En` is the fallback for missing translations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    En,
    Es,
    Fr,
}

impl Locale {
    pub const ALL: [Locale; 3] = [Locale::En, Locale::Es, Locale::Fr];

    pub const DEFAULT: Locale = Locale::En;

    pub fn as_str(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Es => "es",
            Locale::Fr => "fr",
        }
    }

    /// Label shown in the language switcher.
    pub fn native_name(self) -> &'static str {
        match self {
            Locale::En => "English",
            Locale::Es => "Español",
            Locale::Fr => "Français",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "en" => Ok(Locale::En),
            "es" => Ok(Locale::Es),
            "fr" => Ok(Locale::Fr),
            other => Err(DomainError::validation(format!(
                "unsupported locale `{other}`"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "document_status", rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    Published,
}

/// Which documents a read may return. Draft mode is the only way to see drafts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Published,
    IncludeDrafts,
}

impl Visibility {
    pub fn from_draft_mode(draft: bool) -> Self {
        if draft {
            Visibility::IncludeDrafts
        } else {
            Visibility::Published
        }
    }

    pub fn is_draft(self) -> bool {
        matches!(self, Visibility::IncludeDrafts)
    }

    pub fn admits(self, status: DocumentStatus) -> bool {
        match self {
            Visibility::Published => status == DocumentStatus::Published,
            Visibility::IncludeDrafts => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "agency_status", rename_all = "snake_case")]
pub enum AgencyStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "camelCase")]
#[sqlx(type_name = "featured_media", rename_all = "snake_case")]
pub enum FeaturedMedia {
    Upload,
    VideoUrl,
}

/// Content collections exposed through the mutation API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Collection {
    Pages,
    Posts,
    Categories,
    CaseStudies,
    Partners,
    Forms,
    Redirects,
    Globals,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Pages => "pages",
            Collection::Posts => "posts",
            Collection::Categories => "categories",
            Collection::CaseStudies => "case-studies",
            Collection::Partners => "partners",
            Collection::Forms => "forms",
            Collection::Redirects => "redirects",
            Collection::Globals => "globals",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pages" => Ok(Collection::Pages),
            "posts" => Ok(Collection::Posts),
            "categories" => Ok(Collection::Categories),
            "case-studies" => Ok(Collection::CaseStudies),
            "partners" => Ok(Collection::Partners),
            "forms" => Ok(Collection::Forms),
            "redirects" => Ok(Collection::Redirects),
            "globals" => Ok(Collection::Globals),
            other => Err(DomainError::validation(format!(
                "unknown collection `{other}`"
            ))),
        }
    }
}

/// Global document slugs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GlobalSlug {
    MainMenu,
    Footer,
    TopBar,
    PartnerProgram,
    GetStarted,
}

impl GlobalSlug {
    pub fn as_str(self) -> &'static str {
        match self {
            GlobalSlug::MainMenu => "main-menu",
            GlobalSlug::Footer => "footer",
            GlobalSlug::TopBar => "top-bar",
            GlobalSlug::PartnerProgram => "partner-program",
            GlobalSlug::GetStarted => "get-started",
        }
    }
}

impl FromStr for GlobalSlug {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "main-menu" => Ok(GlobalSlug::MainMenu),
            "footer" => Ok(GlobalSlug::Footer),
            "top-bar" => Ok(GlobalSlug::TopBar),
            "partner-program" => Ok(GlobalSlug::PartnerProgram),
            "get-started" => Ok(GlobalSlug::GetStarted),
            other => Err(DomainError::validation(format!("unknown global `{other}`"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locale_round_trips_through_str() {
        for locale in Locale::ALL {
            assert_eq!(locale.as_str().parse::<Locale>().unwrap(), locale);
        }
        assert!("de".parse::<Locale>().is_err());
    }

    #[test]
    fn published_visibility_hides_drafts() {
        assert!(!Visibility::Published.admits(DocumentStatus::Draft));
        assert!(Visibility::Published.admits(DocumentStatus::Published));
        assert!(Visibility::IncludeDrafts.admits(DocumentStatus::Draft));
    }
}
