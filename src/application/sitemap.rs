//! sitemap.xml and robots.txt generation.

use crate::application::repos::RepoError;
use crate::application::static_params::StaticParams;

#[derive(Clone)]
pub struct SitemapService {
    params: StaticParams,
    site_url: String,
}

impl SitemapService {
    pub fn new(params: StaticParams, site_url: &str) -> Self {
        Self {
            params,
            site_url: site_url.trim_end_matches('/').to_string(),
        }
    }

    /// Every enumerated published path, one `<url>` each.
    pub async fn sitemap_xml(&self) -> Result<String, RepoError> {
        let paths = self.params.all_paths().await?;

        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
        );
        for path in paths {
            xml.push_str("  <url><loc>");
            xml.push_str(&escape_xml(&format!("{}{path}", self.site_url)));
            xml.push_str("</loc></url>\n");
        }
        xml.push_str("</urlset>\n");
        Ok(xml)
    }

    pub fn robots_txt(&self) -> String {
        format!(
            "User-agent: *\nAllow: /\nDisallow: /api/\nSitemap: {}/sitemap.xml\n",
            self.site_url
        )
    }
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
