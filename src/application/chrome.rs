use axum::http::StatusCode;

use crate::application::content::ContentService;
use crate::application::error::HttpError;
use crate::application::repos::RepoError;
use crate::application::seo::{PageMetadata, SITE_NAME};
use crate::domain::blocks::Link;
use crate::domain::entities::SiteGlobals;
use crate::domain::paths::localized_path;
use crate::domain::types::Locale;
use crate::presentation::i18n;
use crate::presentation::views::{
    AnalyticsView, FooterColumnView, FooterView, LayoutChrome, LocaleLinkView, NavLinkView,
    SeoHead, TopBarView,
};

const SOURCE: &str = "application::chrome::ChromeService";

pub const CONSENT_COOKIE: &str = "cookie-consent";
pub const CONSENT_ACCEPTED: &str = "accepted";

/// Umami site registration used by the consent-gated analytics script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsTarget {
    pub website_id: String,
    pub script_src: String,
}

#[derive(Clone)]
pub struct ChromeService {
    content: ContentService,
    analytics: Option<AnalyticsTarget>,
}

impl ChromeService {
    pub fn new(content: ContentService, analytics: Option<AnalyticsTarget>) -> Self {
        Self { content, analytics }
    }

    /// Layout chrome for `path`, the request path without its locale prefix.
    pub async fn load(
        &self,
        locale: Locale,
        path: &str,
        draft_mode: bool,
    ) -> Result<LayoutChrome, HttpError> {
        let globals = self
            .content
            .globals(locale)
            .await
            .map_err(|err| repo_failure("globals", err))?;

        Ok(self.assemble(locale, path, draft_mode, globals))
    }

    pub fn assemble(
        &self,
        locale: Locale,
        path: &str,
        draft_mode: bool,
        globals: SiteGlobals,
    ) -> LayoutChrome {
        let SiteGlobals {
            main_menu,
            footer,
            top_bar,
        } = globals;

        let top_bar = top_bar.enable_top_bar.then(|| TopBarView {
            message: top_bar.message,
            link: top_bar.link.as_ref().map(|link| nav_link(locale, link)),
        });

        LayoutChrome {
            lang: locale.as_str(),
            home_href: localized_path(locale, "/"),
            top_bar,
            menu: main_menu
                .tabs
                .iter()
                .map(|link| nav_link(locale, link))
                .collect(),
            menu_cta: main_menu.menu_cta.as_ref().map(|link| nav_link(locale, link)),
            footer: FooterView {
                columns: footer
                    .columns
                    .iter()
                    .map(|column| FooterColumnView {
                        label: column.label.clone(),
                        links: column
                            .nav_items
                            .iter()
                            .map(|link| nav_link(locale, link))
                            .collect(),
                    })
                    .collect(),
                copyright: footer
                    .copyright
                    .unwrap_or_else(|| format!("© {SITE_NAME}")),
            },
            locales: locale_links(locale, path),
            analytics: self.analytics.as_ref().map(|target| AnalyticsView {
                website_id: target.website_id.clone(),
                script_src: target.script_src.clone(),
                consent_cookie: CONSENT_COOKIE,
                consent_value: CONSENT_ACCEPTED,
            }),
            draft_mode,
            strings: i18n::strings(locale),
            meta: SeoHead::new(PageMetadata::simple(SITE_NAME, None), None),
        }
    }
}

/// One switcher entry per locale pointing at the same path.
pub fn locale_links(active: Locale, path: &str) -> Vec<LocaleLinkView> {
    Locale::ALL
        .into_iter()
        .map(|locale| LocaleLinkView {
            code: locale.as_str(),
            label: locale.native_name(),
            href: localized_path(locale, path),
            is_active: locale == active,
        })
        .collect()
}

/// Prefix site-relative links with the locale unless they already carry one.
pub fn localize_href(locale: Locale, url: &str) -> String {
    if !url.starts_with('/') || url.starts_with("//") || url.starts_with("/api/") {
        return url.to_string();
    }
    let first = url.trim_start_matches('/').split('/').next().unwrap_or("");
    if Locale::ALL.iter().any(|candidate| candidate.as_str() == first) {
        return url.to_string();
    }
    localized_path(locale, url)
}

fn nav_link(locale: Locale, link: &Link) -> NavLinkView {
    NavLinkView {
        label: link.label.clone(),
        href: localize_href(locale, &link.url),
        new_tab: link.new_tab,
    }
}

fn repo_failure(operation: &'static str, err: RepoError) -> HttpError {
    HttpError::from_error(
        SOURCE,
        StatusCode::INTERNAL_SERVER_ERROR,
        "Failed to load site chrome",
        &RepoFailure { operation, err },
    )
}

#[derive(Debug, thiserror::Error)]
#[error("{operation} failed: {err}")]
struct RepoFailure {
    operation: &'static str,
    #[source]
    err: RepoError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_links_gain_locale_prefix() {
        assert_eq!(localize_href(Locale::Es, "/partners"), "/es/partners");
        assert_eq!(localize_href(Locale::Es, "/fr/partners"), "/fr/partners");
        assert_eq!(localize_href(Locale::Fr, "https://github.com"), "https://github.com");
        assert_eq!(localize_href(Locale::Fr, "/api/star-count"), "/api/star-count");
        assert_eq!(localize_href(Locale::En, "/"), "/en");
    }

    #[test]
    fn switcher_keeps_path_and_marks_active_locale() {
        let links = locale_links(Locale::Fr, "/posts/news");
        assert_eq!(links.len(), 3);
        assert_eq!(links[0].href, "/en/posts/news");
        assert!(links[2].is_active);
        assert!(!links[0].is_active);
    }
}
