//! Markdown rendering with syntax highlighting

use pulldown_cmark::{html, BrokenLink, CowStr, Options, Parser};
use serde::Serialize;
use std::collections::HashMap;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::{styled_line_to_highlighted_html, IncludeBackground};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

use super::blocks::{Block, CodeFence};
use crate::config::HighlightConfig;

/// Converts prose markup into HTML
pub trait MarkupConverter: Send + Sync {
    fn convert(&self, markup: &str) -> String;

    /// Convert the prose blocks of one document, in order.
    ///
    /// Converters that support references should let a definition in one
    /// block resolve references in the others.
    fn convert_all(&self, blocks: &[&str]) -> Vec<String> {
        blocks.iter().map(|markup| self.convert(markup)).collect()
    }
}

/// Turns literal code into HTML without changing what the code says
pub trait Highlighter: Send + Sync {
    fn highlight(&self, lang: Option<&str>, code: &str) -> String;
}

/// CommonMark with the usual GitHub extensions
#[derive(Debug, Default, Clone, Copy)]
pub struct CommonMark;

/// Link destination and title, keyed by normalized label
type LinkDefinitions = HashMap<String, (String, String)>;

impl CommonMark {
    fn options() -> Options {
        // Front matter is handled separately; YAML metadata blocks stay off.
        // Old-style footnotes link a reference even when its definition sits
        // in another block.
        Options::ENABLE_TABLES
            | Options::ENABLE_OLD_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_SMART_PUNCTUATION
            | Options::ENABLE_HEADING_ATTRIBUTES
    }

    /// Link reference definitions found anywhere in `blocks`
    fn link_definitions(blocks: &[&str]) -> LinkDefinitions {
        let joined = blocks.join("\n\n");
        let parser = Parser::new_ext(&joined, Self::options());
        parser
            .reference_definitions()
            .iter()
            .map(|(label, def)| {
                let title = def.title.as_deref().unwrap_or_default().to_string();
                (normalize_label(label), (def.dest.to_string(), title))
            })
            .collect()
    }

    fn convert_with<'a>(&self, markup: &'a str, definitions: &LinkDefinitions) -> String {
        let resolve = |link: BrokenLink<'a>| -> Option<(CowStr<'a>, CowStr<'a>)> {
            let (dest, title) = definitions.get(&normalize_label(&link.reference))?;
            Some((dest.clone().into(), title.clone().into()))
        };
        let parser =
            Parser::new_with_broken_link_callback(markup, Self::options(), Some(resolve));

        let mut html_output = String::new();
        html::push_html(&mut html_output, parser);
        html_output
    }
}

impl MarkupConverter for CommonMark {
    fn convert(&self, markup: &str) -> String {
        let parser = Parser::new_ext(markup, Self::options());

        let mut html_output = String::new();
        html::push_html(&mut html_output, parser);
        html_output
    }

    fn convert_all(&self, blocks: &[&str]) -> Vec<String> {
        let definitions = Self::link_definitions(blocks);
        blocks
            .iter()
            .map(|markup| self.convert_with(markup, &definitions))
            .collect()
    }
}

/// Reference labels match case-insensitively with whitespace collapsed
fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Escapes code into a plain `<pre><code>` block
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainHighlighter;

impl Highlighter for PlainHighlighter {
    fn highlight(&self, lang: Option<&str>, code: &str) -> String {
        code_block(lang, &html_escape(code))
    }
}

/// Syntect-backed highlighter
pub struct SyntectHighlighter {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    theme_name: String,
    line_numbers: bool,
}

impl SyntectHighlighter {
    /// Create a new highlighter
    pub fn new() -> Self {
        Self::with_options("base16-ocean.dark", true)
    }

    /// Create with custom settings
    pub fn with_options(theme: &str, line_numbers: bool) -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
            theme_name: theme.to_string(),
            line_numbers,
        }
    }

    /// Highlight `code` line by line; each entry keeps its line ending
    fn highlight_lines(
        &self,
        code: &str,
        syntax: &SyntaxReference,
        theme: &Theme,
    ) -> Result<Vec<String>, syntect::Error> {
        let mut highlighter = HighlightLines::new(syntax, theme);
        LinesWithEndings::from(code)
            .map(|line| {
                let regions = highlighter.highlight_line(line, &self.syntax_set)?;
                styled_line_to_highlighted_html(&regions, IncludeBackground::No)
            })
            .collect()
    }

    /// Lay out highlighted lines next to a line-number gutter
    fn add_line_numbers(&self, lines: &[String], lang: &str) -> String {
        let gutter = (1..=lines.len())
            .map(|n| format!(r#"<span class="line-number">{}</span>"#, n))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"<figure class="highlight {}"><table><tr><td class="gutter"><pre>{}</pre></td><td class="code"><pre>{}</pre></td></tr></table></figure>"#,
            html_escape(lang),
            gutter,
            lines.concat()
        )
    }
}

impl Default for SyntectHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl Highlighter for SyntectHighlighter {
    fn highlight(&self, lang: Option<&str>, code: &str) -> String {
        let lang = lang.unwrap_or("text");

        let syntax = self
            .syntax_set
            .find_syntax_by_token(lang)
            .or_else(|| self.syntax_set.find_syntax_by_extension(lang))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let Some(theme) = self
            .theme_set
            .themes
            .get(&self.theme_name)
            .or_else(|| self.theme_set.themes.values().next())
        else {
            tracing::warn!("No highlighting themes available, emitting plain code");
            return code_block(Some(lang), &html_escape(code));
        };

        match self.highlight_lines(code, syntax, theme) {
            Ok(lines) if self.line_numbers => self.add_line_numbers(&lines, lang),
            Ok(lines) => code_block(Some(lang), &lines.concat()),
            Err(e) => {
                tracing::debug!("Highlighting {} failed, falling back: {}", lang, e);
                code_block(Some(lang), &html_escape(code))
            }
        }
    }
}

/// A block after conversion to HTML
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderedBlock {
    Prose {
        html: String,
    },
    CodeFence {
        lang: Option<String>,
        html: String,
    },
}

impl RenderedBlock {
    pub fn html(&self) -> &str {
        match self {
            RenderedBlock::Prose { html } | RenderedBlock::CodeFence { html, .. } => html,
        }
    }
}

/// Renders body blocks through a markup converter and a highlighter
pub struct MarkdownRenderer {
    converter: Box<dyn MarkupConverter>,
    highlighter: Box<dyn Highlighter>,
}

impl MarkdownRenderer {
    /// CommonMark prose with syntect highlighting
    pub fn new() -> Self {
        Self::with_parts(CommonMark, SyntectHighlighter::new())
    }

    /// Build from the site's highlight settings
    pub fn from_config(config: &HighlightConfig) -> Self {
        if config.enable {
            Self::with_parts(
                CommonMark,
                SyntectHighlighter::with_options(&config.theme, config.line_number),
            )
        } else {
            Self::with_parts(CommonMark, PlainHighlighter)
        }
    }

    /// Plug in other collaborators
    pub fn with_parts<C, H>(converter: C, highlighter: H) -> Self
    where
        C: MarkupConverter + 'static,
        H: Highlighter + 'static,
    {
        Self {
            converter: Box::new(converter),
            highlighter: Box::new(highlighter),
        }
    }

    /// Render a single block
    pub fn render_block(&self, block: &Block) -> RenderedBlock {
        match block {
            Block::Prose { text, .. } => RenderedBlock::Prose {
                html: self.converter.convert(text),
            },
            Block::CodeFence(CodeFence { lang, content, .. }) => RenderedBlock::CodeFence {
                lang: lang.clone(),
                html: self.highlighter.highlight(lang.as_deref(), content),
            },
        }
    }

    /// Render all non-blank blocks in order.
    ///
    /// Prose blocks are converted together so references resolve across them.
    pub fn render_blocks(&self, blocks: &[Block]) -> Vec<RenderedBlock> {
        let blocks: Vec<&Block> = blocks.iter().filter(|b| !b.is_blank()).collect();
        let prose: Vec<&str> = blocks
            .iter()
            .filter_map(|b| match b {
                Block::Prose { text, .. } => Some(text.as_str()),
                Block::CodeFence(_) => None,
            })
            .collect();
        let mut converted = self.converter.convert_all(&prose).into_iter();

        blocks
            .into_iter()
            .map(|block| match block {
                Block::Prose { .. } => RenderedBlock::Prose {
                    html: converted.next().unwrap_or_default(),
                },
                Block::CodeFence(_) => self.render_block(block),
            })
            .collect()
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn code_block(lang: Option<&str>, inner: &str) -> String {
    match lang {
        Some(lang) => format!(
            r#"<pre><code class="language-{}">{}</code></pre>"#,
            html_escape(lang),
            inner
        ),
        None => format!("<pre><code>{}</code></pre>", inner),
    }
}

/// Simple HTML escaping
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::blocks::render_body;

    #[test]
    fn test_render_basic_markdown() {
        let html = CommonMark.convert("# Hello World\n\nThis is a test.");
        assert!(html.contains("<h1>Hello World</h1>"));
        assert!(html.contains("<p>This is a test.</p>"));
    }

    fn render_prose(body: &str) -> Vec<RenderedBlock> {
        let blocks: Vec<_> = render_body(body).collect::<Result<_, _>>().unwrap();
        MarkdownRenderer::with_parts(CommonMark, PlainHighlighter).render_blocks(&blocks)
    }

    #[test]
    fn test_render_code_block() {
        let html = SyntectHighlighter::new().highlight(Some("rust"), "fn main() {}\n");
        assert!(html.contains("highlight rust"));
        assert_eq!(html.matches("class=\"line-number\"").count(), 1);
        assert_eq!(html.matches("<pre").count(), 2);
    }

    #[test]
    fn test_gutter_matches_code_lines() {
        let code = "let a = 1;\nlet b = 2;\nlet c = a + b;\n";
        let html = SyntectHighlighter::new().highlight(Some("rust"), code);
        assert_eq!(html.matches("class=\"line-number\"").count(), 3);
        assert!(html.contains(r#"<span class="line-number">3</span></pre>"#));
        assert!(!html.contains("<pre style"));
    }

    #[test]
    fn test_fence_language_is_escaped_in_figure_class() {
        let html = SyntectHighlighter::new().highlight(Some("x\"><script>"), "1\n");
        assert!(html.starts_with(r#"<figure class="highlight x&quot;&gt;&lt;script&gt;">"#));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_link_definition_in_later_block() {
        let rendered = render_prose(
            "See [NSOperation][docs].\n\n## More\n\n[docs]: https://developer.apple.com/nsoperation\n",
        );
        assert_eq!(rendered.len(), 2);
        assert!(rendered[0]
            .html()
            .contains(r#"<a href="https://developer.apple.com/nsoperation">NSOperation</a>"#));
        assert_eq!(rendered[1].html(), "<h2>More</h2>\n");
    }

    #[test]
    fn test_footnote_definition_in_later_block() {
        let rendered = render_prose("KVO is required[^kvo].\n\n## Notes\n\n[^kvo]: See the docs.\n");
        assert!(rendered[0].html().contains(r##"href="#kvo""##));
        assert!(rendered[1].html().contains(r#"id="kvo""#));
    }

    #[test]
    fn test_undefined_reference_stays_text() {
        let rendered = render_prose("See [NSOperation][nowhere].\n");
        assert_eq!(rendered[0].html(), "<p>See [NSOperation][nowhere].</p>\n");
    }

    #[test]
    fn test_plain_highlighter_escapes() {
        let html = PlainHighlighter.highlight(Some("objc"), "if (a < b && c) {}\n");
        assert_eq!(
            html,
            "<pre><code class=\"language-objc\">if (a &lt; b &amp;&amp; c) {}\n</code></pre>"
        );
    }

    #[test]
    fn test_fence_content_skips_markup() {
        let renderer = MarkdownRenderer::with_parts(CommonMark, PlainHighlighter);
        let blocks: Vec<_> = render_body("Some *prose*.\n\n```md\n# not a heading\n*raw*\n```\n")
            .collect::<Result<_, _>>()
            .unwrap();
        let rendered = renderer.render_blocks(&blocks);

        assert_eq!(rendered.len(), 2);
        assert!(rendered[0].html().contains("<em>prose</em>"));
        assert_eq!(
            rendered[1],
            RenderedBlock::CodeFence {
                lang: Some("md".to_string()),
                html: "<pre><code class=\"language-md\"># not a heading\n*raw*\n</code></pre>"
                    .to_string(),
            }
        );
    }

    #[test]
    fn test_unknown_language_falls_back_to_plain_text() {
        let html = SyntectHighlighter::with_options("base16-ocean.dark", false)
            .highlight(Some("no-such-lang"), "x\n");
        assert!(html.starts_with("<pre><code class=\"language-no-such-lang\">"));
    }
}
