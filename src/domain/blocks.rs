//! Layout blocks as stored in the content store.
//!
//! Blocks arrive as JSON objects discriminated by `blockType`. Types this site
//! does not know how to render decode to [`Block::Unsupported`] so that a new
//! block added in the store never breaks a page.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "blockType", rename_all = "camelCase")]
pub enum Block {
    Content(ContentBlock),
    MediaBlock(MediaBlock),
    CallToAction(CallToActionBlock),
    CardGrid(CardGridBlock),
    Code(CodeBlock),
    BlogContent(BlogContentBlock),
    BlogMarkdown(BlogMarkdownBlock),
    Callout(CalloutBlock),
    Statement(StatementBlock),
    Spotlight(SpotlightBlock),
    Form(FormBlock),
    LogoGrid(LogoGridBlock),
    #[serde(other)]
    Unsupported,
}

impl Block {
    /// The `blockType` discriminator.
    pub fn kind(&self) -> &'static str {
        match self {
            Block::Content(_) => "content",
            Block::MediaBlock(_) => "mediaBlock",
            Block::CallToAction(_) => "callToAction",
            Block::CardGrid(_) => "cardGrid",
            Block::Code(_) => "code",
            Block::BlogContent(_) => "blogContent",
            Block::BlogMarkdown(_) => "blogMarkdown",
            Block::Callout(_) => "callout",
            Block::Statement(_) => "statement",
            Block::Spotlight(_) => "spotlight",
            Block::Form(_) => "form",
            Block::LogoGrid(_) => "logoGrid",
            Block::Unsupported => "unsupported",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub label: String,
    pub url: String,
    #[serde(default)]
    pub new_tab: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRef {
    pub url: String,
    #[serde(default)]
    pub alt: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnSize {
    OneThird,
    Half,
    TwoThirds,
    #[default]
    Full,
}

impl ColumnSize {
    pub fn css_class(self) -> &'static str {
        match self {
            ColumnSize::OneThird => "col-4",
            ColumnSize::Half => "col-6",
            ColumnSize::TwoThirds => "col-8",
            ColumnSize::Full => "col-12",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentColumn {
    #[serde(default)]
    pub size: ColumnSize,
    #[serde(default)]
    pub rich_text_html: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBlock {
    #[serde(default)]
    pub columns: Vec<ContentColumn>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaBlock {
    pub media: MediaRef,
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToActionBlock {
    pub heading: String,
    #[serde(default)]
    pub body_html: String,
    #[serde(default)]
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub link: Option<Link>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardGridBlock {
    #[serde(default)]
    pub heading: Option<String>,
    #[serde(default)]
    pub cards: Vec<Card>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeBlock {
    #[serde(default)]
    pub language: Option<String>,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogContentBlock {
    #[serde(default)]
    pub rich_text_html: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogMarkdownBlock {
    pub markdown: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalloutBlock {
    #[serde(default)]
    pub content_html: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementBlock {
    #[serde(default)]
    pub heading: Option<String>,
    #[serde(default)]
    pub body_html: String,
    #[serde(default)]
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpotlightElement {
    H1,
    #[default]
    H2,
    H3,
    P,
}

impl SpotlightElement {
    pub fn tag(self) -> &'static str {
        match self {
            SpotlightElement::H1 => "h1",
            SpotlightElement::H2 => "h2",
            SpotlightElement::H3 => "h3",
            SpotlightElement::P => "p",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotlightBlock {
    #[serde(default)]
    pub element: SpotlightElement,
    #[serde(default)]
    pub rich_text_html: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormBlock {
    pub form: Uuid,
    #[serde(default)]
    pub heading: Option<String>,
    #[serde(default)]
    pub intro_html: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoGridBlock {
    #[serde(default)]
    pub heading: Option<String>,
    #[serde(default)]
    pub logos: Vec<MediaRef>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_known_block_by_type() {
        let block: Block = serde_json::from_value(json!({
            "blockType": "blogMarkdown",
            "markdown": "# Hello"
        }))
        .expect("decode block");
        assert_eq!(block.kind(), "blogMarkdown");
    }

    #[test]
    fn unknown_block_types_are_unsupported() {
        let block: Block = serde_json::from_value(json!({
            "blockType": "pricing",
            "plans": []
        }))
        .expect("decode block");
        assert_eq!(block, Block::Unsupported);
    }
}
