//! View assembly for every public route.
//!
//! Each method returns `Ok(None)` when the route should render the not-found
//! page, and the view paired with its head metadata otherwise.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::StatusCode;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use uuid::Uuid;

use crate::application::content::{ContentService, PartnerQuery};
use crate::application::error::HttpError;
use crate::application::repos::RepoError;
use crate::application::seo::{
    PageMetadata, SITE_NAME, archive_metadata, case_study_metadata, page_metadata, partner_metadata,
    partners_metadata, post_metadata,
};
use crate::domain::blocks::Block;
use crate::domain::entities::{
    FilterOption, FormRecord, PartnerFilters, PartnerProgram, PartnerRecord, PostRecord,
};
use crate::domain::paths::{archive_path, localized_path, post_path, slug_segments};
use crate::domain::types::{FeaturedMedia, GlobalSlug, Locale, Visibility};
use crate::presentation::blocks::{BlockContext, BlockRegistry, contains_code, form_ids, link_view};
use crate::presentation::i18n;
use crate::presentation::rich_text::sanitize_html;
use crate::presentation::views::{
    ArchiveView, CaseStudyView, FilterGroupView, FilterOptionView, HeroView, PageView,
    PartnerCard, PartnerDetailView, PartnerDirectoryView, PostCard, PostDetailView,
};

const SOURCE: &str = "application::page::PageService";

#[derive(Clone)]
pub struct PageService {
    content: ContentService,
    blocks: Arc<BlockRegistry>,
    turnstile_site_key: Option<String>,
    site_url: String,
}

impl PageService {
    pub fn new(
        content: ContentService,
        blocks: Arc<BlockRegistry>,
        turnstile_site_key: Option<String>,
        site_url: impl Into<String>,
    ) -> Self {
        Self {
            content,
            blocks,
            turnstile_site_key,
            site_url: site_url.into(),
        }
    }

    pub fn content(&self) -> &ContentService {
        &self.content
    }

    pub async fn page_view(
        &self,
        segments: &[String],
        locale: Locale,
        visibility: Visibility,
    ) -> Result<Option<(PageView, PageMetadata)>, HttpError> {
        let segments = slug_segments(segments);
        let Some(page) = self
            .content
            .page(&segments, locale, visibility)
            .await
            .map_err(|err| repo_failure("page", err))?
        else {
            return Ok(None);
        };

        let metadata = page_metadata(Some(&page), &segments);
        let blocks_html = self.render_blocks(&page.layout, locale).await?;
        let hero = page.hero.map(|hero| HeroView {
            heading: hero.heading,
            rich_text_html: sanitize_html(&hero.rich_text_html),
            media: hero.media,
            links: hero.links.iter().map(link_view).collect(),
        });

        Ok(Some((
            PageView {
                title: page.title,
                hero,
                contains_code: contains_code(&page.layout),
                blocks_html,
            },
            metadata,
        )))
    }

    pub async fn post_view(
        &self,
        category_slug: &str,
        slug: &str,
        locale: Locale,
        visibility: Visibility,
    ) -> Result<Option<(PostDetailView, PageMetadata)>, HttpError> {
        let Some(post) = self
            .content
            .post(category_slug, slug, locale, visibility)
            .await
            .map_err(|err| repo_failure("post", err))?
        else {
            return Ok(None);
        };

        let metadata = post_metadata(Some(&post), category_slug, slug, &self.site_url);
        let blocks_html = self.render_blocks(&post.content, locale).await?;
        let (published, iso_date) = post_dates(post.published_on, locale);
        let (image, video_url) = match post.featured_media {
            FeaturedMedia::Upload => (post.image.clone(), None),
            FeaturedMedia::VideoUrl => (None, post.video_url.clone()),
        };

        Ok(Some((
            PostDetailView {
                category_name: post.category.as_ref().map(|category| category.name.clone()),
                category_href: post
                    .category_slug()
                    .map(|slug| localized_path(locale, &archive_path(slug))),
                published,
                iso_date,
                authors: post.authors.iter().map(|author| author.name.clone()).collect(),
                image,
                video_url,
                contains_code: contains_code(&post.content),
                blocks_html,
                title: post.title,
            },
            metadata,
        )))
    }

    pub async fn archive_view(
        &self,
        category_slug: &str,
        locale: Locale,
        now: OffsetDateTime,
    ) -> Result<Option<(ArchiveView, PageMetadata)>, HttpError> {
        let Some(archive) = self
            .content
            .archive(category_slug, locale, now)
            .await
            .map_err(|err| repo_failure("archive", err))?
        else {
            return Ok(None);
        };

        let metadata = archive_metadata(&archive.category);
        let posts = archive
            .posts
            .iter()
            .filter_map(|post| post_card(post, locale))
            .collect();

        Ok(Some((
            ArchiveView {
                heading: archive.category.name,
                headline: archive.category.headline,
                description: archive.category.description,
                posts,
            },
            metadata,
        )))
    }

    /// Every live post across categories.
    pub async fn blog_view(
        &self,
        locale: Locale,
        now: OffsetDateTime,
    ) -> Result<(ArchiveView, PageMetadata), HttpError> {
        let posts = self
            .content
            .blog_posts(locale, now)
            .await
            .map_err(|err| repo_failure("blog_posts", err))?;
        let heading = i18n::strings(locale).latest_posts.to_string();

        Ok((
            ArchiveView {
                posts: posts
                    .iter()
                    .filter_map(|post| post_card(post, locale))
                    .collect(),
                headline: None,
                description: None,
                heading: heading.clone(),
            },
            PageMetadata::simple(format!("{heading} | {SITE_NAME}"), None),
        ))
    }

    pub async fn partners_view(
        &self,
        query: &PartnerQuery,
        locale: Locale,
        visibility: Visibility,
    ) -> Result<Option<(PartnerDirectoryView, PageMetadata)>, HttpError> {
        let Some(program) = self
            .content
            .global::<PartnerProgram>(GlobalSlug::PartnerProgram, locale)
            .await
            .map_err(|err| repo_failure("partner_program", err))?
        else {
            return Ok(None);
        };

        let every_partner = self
            .content
            .partners(&PartnerQuery::default(), visibility)
            .await
            .map_err(|err| repo_failure("partners", err))?;
        let filters = self
            .content
            .partner_filters()
            .await
            .map_err(|err| repo_failure("partner_filters", err))?;

        let featured_slugs = program
            .featured_partners
            .as_ref()
            .map(|featured| featured.partners.as_slice())
            .unwrap_or_default();
        let featured = featured_slugs
            .iter()
            .filter_map(|slug| every_partner.iter().find(|partner| &partner.slug == slug))
            .map(|partner| partner_card(partner, locale, true))
            .collect();

        let partners = every_partner
            .iter()
            .filter(|partner| query.matches(partner))
            .map(|partner| partner_card(partner, locale, partner.featured))
            .collect();

        let before_html = self
            .render_blocks(&program.content_blocks.before_directory, locale)
            .await?;
        let after_html = self
            .render_blocks(&program.content_blocks.after_directory, locale)
            .await?;

        Ok(Some((
            PartnerDirectoryView {
                featured_description: program
                    .featured_partners
                    .map(|featured| featured.description)
                    .filter(|description| !description.is_empty()),
                featured,
                before_html,
                filters: filter_groups(&filters, &every_partner, query, locale),
                partners,
                after_html,
                become_partner_href: localized_path(locale, "/partners"),
            },
            partners_metadata(locale),
        )))
    }

    pub async fn partner_view(
        &self,
        slug: &str,
        locale: Locale,
        visibility: Visibility,
    ) -> Result<Option<(PartnerDetailView, PageMetadata)>, HttpError> {
        let Some(partner) = self
            .content
            .partner(slug, visibility)
            .await
            .map_err(|err| repo_failure("partner", err))?
        else {
            return Ok(None);
        };
        let filters = self
            .content
            .partner_filters()
            .await
            .map_err(|err| repo_failure("partner_filters", err))?;

        let strings = i18n::strings(locale);
        let memberships = vec![
            (strings.industries, names(&filters.industries, &partner.industries)),
            (strings.specialties, names(&filters.specialties, &partner.specialties)),
            (strings.regions, names(&filters.regions, &partner.regions)),
            (strings.budgets, names(&filters.budgets, &partner.budgets)),
        ];
        let metadata = partner_metadata(&partner);

        Ok(Some((
            PartnerDetailView {
                name: partner.name,
                summary: partner.summary,
                website: partner.website,
                logo: partner.logo,
                directory_href: localized_path(locale, "/partners"),
                memberships,
            },
            metadata,
        )))
    }

    pub async fn case_study_view(
        &self,
        slug: &str,
        locale: Locale,
        visibility: Visibility,
    ) -> Result<Option<(CaseStudyView, PageMetadata)>, HttpError> {
        let Some(study) = self
            .content
            .case_study(slug, locale, visibility)
            .await
            .map_err(|err| repo_failure("case_study", err))?
        else {
            return Ok(None);
        };

        let metadata = case_study_metadata(&study);
        let blocks_html = self.render_blocks(&study.layout, locale).await?;

        Ok(Some((
            CaseStudyView {
                contains_code: contains_code(&study.layout),
                blocks_html,
                title: study.title,
            },
            metadata,
        )))
    }

    async fn render_blocks(&self, blocks: &[Block], locale: Locale) -> Result<Vec<String>, HttpError> {
        let forms = self.load_forms(blocks, locale).await?;
        let context = BlockContext::new(locale, &forms, self.turnstile_site_key.as_deref());
        self.blocks
            .render_all(blocks, &context)
            .map_err(HttpError::from)
    }

    async fn load_forms(
        &self,
        blocks: &[Block],
        locale: Locale,
    ) -> Result<HashMap<Uuid, FormRecord>, HttpError> {
        let mut forms = HashMap::new();
        for id in form_ids(blocks) {
            if forms.contains_key(&id) {
                continue;
            }
            if let Some(form) = self
                .content
                .form(id, locale)
                .await
                .map_err(|err| repo_failure("form", err))?
            {
                forms.insert(id, form);
            }
        }
        Ok(forms)
    }
}

fn repo_failure(operation: &'static str, err: RepoError) -> HttpError {
    HttpError::new(
        SOURCE,
        StatusCode::INTERNAL_SERVER_ERROR,
        "Failed to load page content",
        format!("{operation} failed: {err}"),
    )
}

/// Display and ISO renderings of a publication date.
fn post_dates(published_on: Option<OffsetDateTime>, locale: Locale) -> (Option<String>, Option<String>) {
    let Some(date) = published_on else {
        return (None, None);
    };
    let display = match locale {
        Locale::En => date.format(format_description!(
            "[month repr:long] [day padding:none], [year]"
        )),
        Locale::Es | Locale::Fr => date.format(format_description!("[day]/[month]/[year]")),
    };
    (display.ok(), date.format(&Rfc3339).ok())
}

/// Card for a post listing. Posts without a category have no public path.
fn post_card(post: &PostRecord, locale: Locale) -> Option<PostCard> {
    let category_slug = post.category_slug()?;
    let (published, iso_date) = post_dates(post.published_on, locale);
    Some(PostCard {
        title: post.title.clone(),
        href: localized_path(locale, &post_path(category_slug, &post.slug)),
        excerpt: post
            .excerpt
            .clone()
            .or_else(|| post.meta.description.clone())
            .unwrap_or_default(),
        published,
        iso_date,
        image: post.image.clone().or_else(|| post.meta.image.clone()),
    })
}

fn partner_card(partner: &PartnerRecord, locale: Locale, featured: bool) -> PartnerCard {
    PartnerCard {
        name: partner.name.clone(),
        href: localized_path(locale, &format!("/partners/{}", partner.slug)),
        summary: partner.summary.clone(),
        logo: partner.logo.clone(),
        featured,
    }
}

/// Filter groups limited to options at least one listed partner carries.
fn filter_groups(
    filters: &PartnerFilters,
    partners: &[PartnerRecord],
    query: &PartnerQuery,
    locale: Locale,
) -> Vec<FilterGroupView> {
    let strings = i18n::strings(locale);
    [
        filter_group(
            "industry",
            strings.industries,
            &filters.industries,
            query.industry.as_deref(),
            partners,
            |partner| &partner.industries,
        ),
        filter_group(
            "specialty",
            strings.specialties,
            &filters.specialties,
            query.specialty.as_deref(),
            partners,
            |partner| &partner.specialties,
        ),
        filter_group(
            "region",
            strings.regions,
            &filters.regions,
            query.region.as_deref(),
            partners,
            |partner| &partner.regions,
        ),
        filter_group(
            "budget",
            strings.budgets,
            &filters.budgets,
            query.budget.as_deref(),
            partners,
            |partner| &partner.budgets,
        ),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn filter_group(
    param: &'static str,
    label: &'static str,
    options: &[FilterOption],
    selected: Option<&str>,
    partners: &[PartnerRecord],
    values_of: impl Fn(&PartnerRecord) -> &Vec<String>,
) -> Option<FilterGroupView> {
    let options: Vec<FilterOptionView> = options
        .iter()
        .filter(|option| {
            partners
                .iter()
                .any(|partner| values_of(partner).contains(&option.value))
        })
        .map(|option| FilterOptionView {
            value: option.value.clone(),
            name: option.name.clone(),
            selected: selected == Some(option.value.as_str()),
        })
        .collect();
    (!options.is_empty()).then_some(FilterGroupView {
        param,
        label,
        options,
    })
}

/// Display names for filter values, keeping unknown values as-is.
fn names(options: &[FilterOption], values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|value| {
            options
                .iter()
                .find(|option| &option.value == value)
                .map(|option| option.name.clone())
                .unwrap_or_else(|| value.clone())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;
    use uuid::Uuid;

    use super::*;
    use crate::domain::entities::CategoryRecord;
    use crate::domain::entities::SeoMeta;
    use crate::domain::types::{AgencyStatus, DocumentStatus};

    fn option(value: &str) -> FilterOption {
        FilterOption {
            id: Uuid::new_v4(),
            name: value.to_uppercase(),
            value: value.to_string(),
        }
    }

    fn partner(slug: &str, industries: &[&str]) -> PartnerRecord {
        PartnerRecord {
            id: Uuid::new_v4(),
            status: DocumentStatus::Published,
            agency_status: AgencyStatus::Active,
            name: slug.to_string(),
            slug: slug.to_string(),
            website: None,
            summary: String::new(),
            logo: None,
            featured: false,
            industries: industries.iter().map(|value| value.to_string()).collect(),
            specialties: Vec::new(),
            regions: Vec::new(),
            budgets: Vec::new(),
        }
    }

    #[test]
    fn filter_groups_hide_unused_options() {
        let filters = PartnerFilters {
            industries: vec![option("health"), option("retail")],
            specialties: vec![option("audit")],
            ..Default::default()
        };
        let partners = vec![partner("acme", &["health"])];
        let query = PartnerQuery {
            industry: Some("health".into()),
            ..Default::default()
        };

        let groups = filter_groups(&filters, &partners, &query, Locale::En);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].param, "industry");
        assert_eq!(groups[0].options.len(), 1);
        assert!(groups[0].options[0].selected);
    }

    #[test]
    fn membership_names_fall_back_to_values() {
        let resolved = names(&[option("health")], &["health".into(), "legacy".into()]);
        assert_eq!(resolved, vec!["HEALTH".to_string(), "legacy".to_string()]);
    }

    #[test]
    fn post_cards_need_a_category() {
        let mut post = PostRecord {
            id: Uuid::new_v4(),
            locale: Locale::Es,
            status: DocumentStatus::Published,
            title: "Hola".into(),
            slug: "hola".into(),
            excerpt: None,
            category: None,
            published_on: Some(datetime!(2024-03-05 10:00 UTC)),
            featured_media: FeaturedMedia::Upload,
            image: None,
            video_url: None,
            authors: Vec::new(),
            content: Vec::new(),
            meta: SeoMeta::default(),
            updated_at: datetime!(2024-03-05 10:00 UTC),
        };
        assert!(post_card(&post, Locale::Es).is_none());

        post.category = Some(CategoryRecord {
            id: Uuid::new_v4(),
            locale: Locale::Es,
            name: "Noticias".into(),
            slug: "news".into(),
            headline: None,
            description: None,
        });
        let card = post_card(&post, Locale::Es).expect("card");
        assert_eq!(card.href, "/es/posts/news/hola");
        assert_eq!(card.published.as_deref(), Some("05/03/2024"));
    }

    #[test]
    fn english_dates_use_month_names() {
        let (display, iso) = post_dates(Some(datetime!(2024-03-05 10:00 UTC)), Locale::En);
        assert_eq!(display.as_deref(), Some("March 5, 2024"));
        assert_eq!(iso.as_deref(), Some("2024-03-05T10:00:00Z"));
    }
}
