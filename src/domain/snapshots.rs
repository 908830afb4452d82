//! Minimal document snapshots carried by content mutation events.
//!
//! A snapshot holds only the fields that decide which cached paths and tags a
//! mutation affects. Slugs are those of the locale the mutation was made in.

use uuid::Uuid;

use super::types::{Collection, GlobalSlug};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSnapshot {
    Page {
        id: Uuid,
        slug: String,
        url: Option<String>,
    },
    Post {
        id: Uuid,
        slug: String,
        category_id: Option<Uuid>,
    },
    Category {
        id: Uuid,
        slug: String,
    },
    CaseStudy {
        id: Uuid,
        slug: String,
    },
    Partner {
        id: Uuid,
        slug: String,
    },
    Form {
        id: Uuid,
        title: String,
    },
    Redirect {
        id: Uuid,
        from: String,
    },
    Global {
        slug: GlobalSlug,
    },
}

impl DocumentSnapshot {
    pub fn collection(&self) -> Collection {
        match self {
            DocumentSnapshot::Page { .. } => Collection::Pages,
            DocumentSnapshot::Post { .. } => Collection::Posts,
            DocumentSnapshot::Category { .. } => Collection::Categories,
            DocumentSnapshot::CaseStudy { .. } => Collection::CaseStudies,
            DocumentSnapshot::Partner { .. } => Collection::Partners,
            DocumentSnapshot::Form { .. } => Collection::Forms,
            DocumentSnapshot::Redirect { .. } => Collection::Redirects,
            DocumentSnapshot::Global { .. } => Collection::Globals,
        }
    }

    /// Identifier used in logs.
    pub fn label(&self) -> String {
        match self {
            DocumentSnapshot::Page { slug, .. }
            | DocumentSnapshot::Post { slug, .. }
            | DocumentSnapshot::Category { slug, .. }
            | DocumentSnapshot::CaseStudy { slug, .. }
            | DocumentSnapshot::Partner { slug, .. } => slug.clone(),
            DocumentSnapshot::Form { title, .. } => title.clone(),
            DocumentSnapshot::Redirect { from, .. } => from.clone(),
            DocumentSnapshot::Global { slug } => slug.as_str().to_string(),
        }
    }
}
