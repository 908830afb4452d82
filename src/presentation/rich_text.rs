//! Markdown rendering, syntax highlighting and HTML sanitizing for block bodies.

use std::collections::HashSet;

use ammonia::Builder as AmmoniaBuilder;
use comrak::{Options, markdown_to_html};
use once_cell::sync::Lazy;
use syntect::{
    html::{ClassStyle, ClassedHTMLGenerator},
    parsing::{SyntaxReference, SyntaxSet},
    util::LinesWithEndings,
};
use tracing::warn;

static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);
static SANITIZER: Lazy<AmmoniaBuilder<'static>> = Lazy::new(build_sanitizer);
static MARKDOWN_OPTIONS: Lazy<Options<'static>> = Lazy::new(markdown_options);

const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "syntax-" };

/// Clean editor-produced HTML down to the tags blocks are allowed to emit.
pub fn sanitize_html(html: &str) -> String {
    SANITIZER.clean(html).to_string()
}

/// Render markdown to sanitized HTML.
pub fn render_markdown(markdown: &str) -> String {
    let html = markdown_to_html(markdown, &MARKDOWN_OPTIONS);
    sanitize_html(&html)
}

/// Highlight `code` with CSS classes; unknown languages render as plain text.
pub fn highlight_code(language: Option<&str>, code: &str) -> String {
    let token = language.filter(|value| !value.is_empty()).unwrap_or("text");
    let syntax = find_syntax(&*SYNTAX_SET, token).unwrap_or_else(|| SYNTAX_SET.find_syntax_plain_text());

    let mut source = code.to_string();
    if !source.ends_with('\n') {
        source.push('\n');
    }

    let mut generator = ClassedHTMLGenerator::new_with_class_style(syntax, &*SYNTAX_SET, CLASS_STYLE);
    for line in LinesWithEndings::from(source.as_str()) {
        if let Err(error) = generator.parse_html_for_line_which_includes_newline(line) {
            warn!(
                target: "safecircle::presentation::rich_text",
                language = token,
                %error,
                "highlighting failed, falling back to escaped text"
            );
            return plain_code(token, code);
        }
    }

    let lang = token.to_ascii_lowercase();
    format!(
        "<pre class=\"syntax-highlight syntax-lang-{lang}\" data-language=\"{lang}\"><code class=\"language-{lang}\">{}</code></pre>",
        generator.finalize()
    )
}

fn plain_code(token: &str, code: &str) -> String {
    let lang = ammonia::clean_text(&token.to_ascii_lowercase());
    format!(
        "<pre data-language=\"{lang}\"><code>{}</code></pre>",
        ammonia::clean_text(code)
    )
}

fn find_syntax<'a>(syntax_set: &'a SyntaxSet, token: &str) -> Option<&'a SyntaxReference> {
    let lowercase = token.to_ascii_lowercase();
    syntax_set
        .find_syntax_by_token(&lowercase)
        .or_else(|| syntax_set.find_syntax_by_name(token))
        .or_else(|| syntax_set.find_syntax_by_extension(&lowercase))
}

fn markdown_options() -> Options<'static> {
    let mut options = Options::default();
    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.table = true;
    ext.autolink = true;
    ext.tasklist = true;
    ext.footnotes = true;
    ext.underline = true;

    options.render.github_pre_lang = true;
    options
}

fn build_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    let tags: HashSet<&'static str> = HashSet::from([
        "a", "abbr", "blockquote", "br", "code", "del", "div", "em", "figcaption", "figure",
        "h1", "h2", "h3", "h4", "h5", "h6", "hr", "i", "img", "input", "li", "mark", "ol", "p",
        "pre", "s", "section", "span", "strong", "sub", "sup", "table", "tbody", "td", "th",
        "thead", "tr", "u", "ul",
    ]);
    builder.tags(tags);

    let generic: HashSet<&'static str> =
        HashSet::from(["class", "id", "title", "lang", "dir", "aria-label", "role"]);
    builder.generic_attributes(generic);

    builder.add_tag_attributes("a", &["target"]);
    builder.add_tag_attributes("img", &["alt", "width", "height", "loading"]);
    builder.add_tag_attributes("th", &["align", "colspan", "rowspan", "scope"]);
    builder.add_tag_attributes("td", &["align", "colspan", "rowspan"]);
    builder.add_tag_attributes("input", &["type", "checked", "disabled"]);
    builder.add_url_schemes(["http", "https", "mailto", "tel"].iter().copied());

    builder
}
