//! Layout block rendering.
//!
//! Renderers are looked up by block kind in a [`BlockRegistry`]. A kind with
//! no renderer, and [`Block::Unsupported`], render nothing.

use std::collections::HashMap;

use askama::Template;
use tracing::debug;
use uuid::Uuid;

use crate::domain::blocks::{Block, Link, MediaRef};
use crate::domain::entities::{FormField, FormRecord};
use crate::domain::types::Locale;
use crate::presentation::i18n::{self, UiStrings};
use crate::presentation::rich_text::{highlight_code, render_markdown, sanitize_html};
use crate::presentation::views::{NavLinkView, TemplateRenderError};

/// Request-scoped inputs a block may need beyond its own fields.
pub struct BlockContext<'a> {
    pub locale: Locale,
    pub strings: &'static UiStrings,
    /// Forms referenced by form blocks, loaded ahead of rendering.
    pub forms: &'a HashMap<Uuid, FormRecord>,
    pub turnstile_site_key: Option<&'a str>,
}

impl<'a> BlockContext<'a> {
    pub fn new(
        locale: Locale,
        forms: &'a HashMap<Uuid, FormRecord>,
        turnstile_site_key: Option<&'a str>,
    ) -> Self {
        Self {
            locale,
            strings: i18n::strings(locale),
            forms,
            turnstile_site_key,
        }
    }
}

pub type BlockRenderer = fn(&Block, &BlockContext<'_>) -> Result<String, askama::Error>;

#[derive(Clone)]
pub struct BlockRegistry {
    renderers: HashMap<&'static str, BlockRenderer>,
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl BlockRegistry {
    pub fn empty() -> Self {
        Self {
            renderers: HashMap::new(),
        }
    }

    /// Registry with a renderer for every block kind the site ships.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register("content", render_content);
        registry.register("mediaBlock", render_media);
        registry.register("callToAction", render_call_to_action);
        registry.register("cardGrid", render_card_grid);
        registry.register("code", render_code);
        registry.register("blogContent", render_blog_content);
        registry.register("blogMarkdown", render_blog_markdown);
        registry.register("callout", render_callout);
        registry.register("statement", render_statement);
        registry.register("spotlight", render_spotlight);
        registry.register("form", render_form);
        registry.register("logoGrid", render_logo_grid);
        registry
    }

    pub fn register(&mut self, kind: &'static str, renderer: BlockRenderer) {
        self.renderers.insert(kind, renderer);
    }

    pub fn render(
        &self,
        block: &Block,
        ctx: &BlockContext<'_>,
    ) -> Result<Option<String>, TemplateRenderError> {
        let Some(renderer) = self.renderers.get(block.kind()) else {
            debug!(
                target: "safecircle::presentation::blocks",
                kind = block.kind(),
                "no renderer for block"
            );
            return Ok(None);
        };
        renderer(block, ctx).map(Some).map_err(|err| {
            TemplateRenderError::new(
                "presentation::blocks::BlockRegistry::render",
                "Block rendering failed",
                err,
            )
        })
    }

    pub fn render_all(
        &self,
        blocks: &[Block],
        ctx: &BlockContext<'_>,
    ) -> Result<Vec<String>, TemplateRenderError> {
        let mut rendered = Vec::with_capacity(blocks.len());
        for block in blocks {
            if let Some(html) = self.render(block, ctx)? {
                rendered.push(html);
            }
        }
        Ok(rendered)
    }
}

/// Ids of every form referenced by `blocks`.
pub fn form_ids(blocks: &[Block]) -> Vec<Uuid> {
    blocks
        .iter()
        .filter_map(|block| match block {
            Block::Form(form) => Some(form.form),
            _ => None,
        })
        .collect()
}

pub fn contains_code(blocks: &[Block]) -> bool {
    blocks
        .iter()
        .any(|block| matches!(block, Block::Code(_) | Block::BlogMarkdown(_)))
}

pub fn link_view(link: &Link) -> NavLinkView {
    NavLinkView {
        label: link.label.clone(),
        href: link.url.clone(),
        new_tab: link.new_tab,
    }
}

struct ColumnView {
    class: &'static str,
    html: String,
}

#[derive(Template)]
#[template(path = "blocks/content.html")]
struct ContentTemplate {
    columns: Vec<ColumnView>,
}

fn render_content(block: &Block, _ctx: &BlockContext<'_>) -> Result<String, askama::Error> {
    let Block::Content(content) = block else {
        return Ok(String::new());
    };
    ContentTemplate {
        columns: content
            .columns
            .iter()
            .map(|column| ColumnView {
                class: column.size.css_class(),
                html: sanitize_html(&column.rich_text_html),
            })
            .collect(),
    }
    .render()
}

#[derive(Template)]
#[template(path = "blocks/media.html")]
struct MediaTemplate<'a> {
    media: &'a MediaRef,
    caption: Option<&'a str>,
}

fn render_media(block: &Block, _ctx: &BlockContext<'_>) -> Result<String, askama::Error> {
    let Block::MediaBlock(media) = block else {
        return Ok(String::new());
    };
    MediaTemplate {
        media: &media.media,
        caption: media.caption.as_deref(),
    }
    .render()
}

#[derive(Template)]
#[template(path = "blocks/call_to_action.html")]
struct CallToActionTemplate<'a> {
    heading: &'a str,
    body_html: String,
    links: Vec<NavLinkView>,
}

fn render_call_to_action(block: &Block, _ctx: &BlockContext<'_>) -> Result<String, askama::Error> {
    let Block::CallToAction(cta) = block else {
        return Ok(String::new());
    };
    CallToActionTemplate {
        heading: &cta.heading,
        body_html: sanitize_html(&cta.body_html),
        links: cta.links.iter().map(link_view).collect(),
    }
    .render()
}

struct CardView {
    title: String,
    description: String,
    link: Option<NavLinkView>,
}

#[derive(Template)]
#[template(path = "blocks/card_grid.html")]
struct CardGridTemplate<'a> {
    heading: Option<&'a str>,
    cards: Vec<CardView>,
}

fn render_card_grid(block: &Block, _ctx: &BlockContext<'_>) -> Result<String, askama::Error> {
    let Block::CardGrid(grid) = block else {
        return Ok(String::new());
    };
    CardGridTemplate {
        heading: grid.heading.as_deref(),
        cards: grid
            .cards
            .iter()
            .map(|card| CardView {
                title: card.title.clone(),
                description: card.description.clone(),
                link: card.link.as_ref().map(link_view),
            })
            .collect(),
    }
    .render()
}

#[derive(Template)]
#[template(path = "blocks/raw.html")]
struct RawTemplate {
    class: &'static str,
    html: String,
}

fn render_code(block: &Block, _ctx: &BlockContext<'_>) -> Result<String, askama::Error> {
    let Block::Code(code) = block else {
        return Ok(String::new());
    };
    RawTemplate {
        class: "block-code",
        html: highlight_code(code.language.as_deref(), &code.code),
    }
    .render()
}

fn render_blog_content(block: &Block, _ctx: &BlockContext<'_>) -> Result<String, askama::Error> {
    let Block::BlogContent(content) = block else {
        return Ok(String::new());
    };
    RawTemplate {
        class: "block-blog-content prose",
        html: sanitize_html(&content.rich_text_html),
    }
    .render()
}

fn render_blog_markdown(block: &Block, _ctx: &BlockContext<'_>) -> Result<String, askama::Error> {
    let Block::BlogMarkdown(content) = block else {
        return Ok(String::new());
    };
    RawTemplate {
        class: "block-blog-markdown prose",
        html: render_markdown(&content.markdown),
    }
    .render()
}

fn render_callout(block: &Block, _ctx: &BlockContext<'_>) -> Result<String, askama::Error> {
    let Block::Callout(callout) = block else {
        return Ok(String::new());
    };
    RawTemplate {
        class: "block-callout",
        html: sanitize_html(&callout.content_html),
    }
    .render()
}

#[derive(Template)]
#[template(path = "blocks/statement.html")]
struct StatementTemplate<'a> {
    heading: Option<&'a str>,
    body_html: String,
    links: Vec<NavLinkView>,
}

fn render_statement(block: &Block, _ctx: &BlockContext<'_>) -> Result<String, askama::Error> {
    let Block::Statement(statement) = block else {
        return Ok(String::new());
    };
    StatementTemplate {
        heading: statement.heading.as_deref(),
        body_html: sanitize_html(&statement.body_html),
        links: statement.links.iter().map(link_view).collect(),
    }
    .render()
}

#[derive(Template)]
#[template(path = "blocks/spotlight.html")]
struct SpotlightTemplate {
    tag: &'static str,
    html: String,
}

fn render_spotlight(block: &Block, _ctx: &BlockContext<'_>) -> Result<String, askama::Error> {
    let Block::Spotlight(spotlight) = block else {
        return Ok(String::new());
    };
    SpotlightTemplate {
        tag: spotlight.element.tag(),
        html: sanitize_html(&spotlight.rich_text_html),
    }
    .render()
}

#[derive(Template)]
#[template(path = "blocks/form.html")]
struct FormTemplate<'a> {
    form_id: String,
    locale: &'static str,
    heading: Option<&'a str>,
    intro_html: String,
    fields: &'a [FormField],
    turnstile_site_key: Option<&'a str>,
    submit_label: &'static str,
}

fn render_form(block: &Block, ctx: &BlockContext<'_>) -> Result<String, askama::Error> {
    let Block::Form(form_block) = block else {
        return Ok(String::new());
    };
    let Some(form) = ctx.forms.get(&form_block.form) else {
        debug!(
            target: "safecircle::presentation::blocks",
            form_id = %form_block.form,
            "form block references a missing form"
        );
        return Ok(String::new());
    };
    FormTemplate {
        form_id: form.id.to_string(),
        locale: ctx.locale.as_str(),
        heading: form_block.heading.as_deref(),
        intro_html: sanitize_html(&form_block.intro_html),
        fields: &form.fields,
        turnstile_site_key: ctx.turnstile_site_key.filter(|_| form.require_turnstile),
        submit_label: ctx.strings.submit,
    }
    .render()
}

#[derive(Template)]
#[template(path = "blocks/logo_grid.html")]
struct LogoGridTemplate<'a> {
    heading: Option<&'a str>,
    logos: &'a [MediaRef],
}

fn render_logo_grid(block: &Block, _ctx: &BlockContext<'_>) -> Result<String, askama::Error> {
    let Block::LogoGrid(grid) = block else {
        return Ok(String::new());
    };
    LogoGridTemplate {
        heading: grid.heading.as_deref(),
        logos: &grid.logos,
    }
    .render()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::entities::FormFieldKind;

    fn render(value: serde_json::Value, forms: &HashMap<Uuid, FormRecord>) -> Option<String> {
        let block: Block = serde_json::from_value(value).expect("decode block");
        let ctx = BlockContext::new(Locale::En, forms, Some("site-key"));
        BlockRegistry::standard()
            .render(&block, &ctx)
            .expect("render block")
    }

    #[test]
    fn unsupported_blocks_render_nothing() {
        let forms = HashMap::new();
        assert_eq!(render(json!({"blockType": "pricing"}), &forms), None);
    }

    #[test]
    fn unregistered_kinds_render_nothing() {
        let forms = HashMap::new();
        let block = Block::Callout(crate::domain::blocks::CalloutBlock {
            content_html: "<p>Hi</p>".into(),
        });
        let ctx = BlockContext::new(Locale::En, &forms, None);
        assert_eq!(BlockRegistry::empty().render(&block, &ctx).unwrap(), None);
    }

    #[test]
    fn callout_html_is_sanitized() {
        let forms = HashMap::new();
        let html = render(
            json!({"blockType": "callout", "contentHtml": "<p>Note</p><script>x()</script>"}),
            &forms,
        )
        .expect("callout renders");
        assert!(html.contains("<p>Note</p>"));
        assert!(!html.contains("<script>x()"));
    }

    #[test]
    fn form_block_includes_challenge_only_when_required() {
        let id = Uuid::new_v4();
        let mut forms = HashMap::new();
        forms.insert(
            id,
            FormRecord {
                id,
                locale: Locale::En,
                title: "Newsletter".into(),
                fields: vec![FormField {
                    name: "email".into(),
                    label: "Email".into(),
                    kind: FormFieldKind::Email,
                    required: true,
                }],
                require_turnstile: true,
                confirmation_message: None,
            },
        );
        let html = render(json!({"blockType": "form", "form": id}), &forms).expect("form renders");
        assert!(html.contains("cf-turnstile"));
        assert!(html.contains("name=\"email\""));

        if let Some(form) = forms.get_mut(&id) {
            form.require_turnstile = false;
        }
        let html = render(json!({"blockType": "form", "form": id}), &forms).expect("form renders");
        assert!(!html.contains("cf-turnstile"));
    }

    #[test]
    fn collects_form_ids_and_code_flags() {
        let id = Uuid::new_v4();
        let blocks: Vec<Block> = serde_json::from_value(json!([
            {"blockType": "form", "form": id},
            {"blockType": "code", "code": "let x = 1;", "language": "rust"}
        ]))
        .expect("decode blocks");
        assert_eq!(form_ids(&blocks), vec![id]);
        assert!(contains_code(&blocks));
    }
}
