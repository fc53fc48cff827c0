//! Body scanning: splits a post body into prose and fenced code blocks

use serde::Serialize;

use super::error::{ParseError, ParseErrorKind};

/// A unit of post body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    /// Markup text, handed to the markup converter
    Prose { text: String, line: usize },
    /// Literal text between a pair of fence markers
    CodeFence(CodeFence),
}

/// A fenced code region; `content` is never interpreted as markup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeFence {
    /// First word of the info string, if any
    pub lang: Option<String>,
    /// Full info string after the opening marker
    pub info: String,
    /// Exact bytes between the opening and closing marker lines
    pub content: String,
    /// Line of the opening marker
    pub line: usize,
    #[serde(skip)]
    open_marker: String,
    #[serde(skip)]
    close_marker: String,
}

#[cfg(test)]
impl CodeFence {
    /// Build a fence from its parts, with plain backtick markers
    pub(crate) fn new(lang: Option<&str>, content: &str) -> Self {
        let info = lang.unwrap_or_default().to_string();
        Self {
            lang: lang.map(str::to_string),
            open_marker: format!("```{}\n", info),
            close_marker: "```\n".to_string(),
            info,
            content: content.to_string(),
            line: 1,
        }
    }
}

impl Block {
    /// The source line this block starts on
    pub fn line(&self) -> usize {
        match self {
            Block::Prose { line, .. } => *line,
            Block::CodeFence(fence) => fence.line,
        }
    }

    /// Prose made only of whitespace renders to nothing
    pub fn is_blank(&self) -> bool {
        matches!(self, Block::Prose { text, .. } if text.trim().is_empty())
    }

    /// Re-serialize the block exactly as it appeared in the source
    pub fn to_source(&self) -> String {
        match self {
            Block::Prose { text, .. } => text.clone(),
            Block::CodeFence(fence) => {
                let mut out = String::with_capacity(
                    fence.open_marker.len() + fence.content.len() + fence.close_marker.len(),
                );
                out.push_str(&fence.open_marker);
                out.push_str(&fence.content);
                out.push_str(&fence.close_marker);
                out
            }
        }
    }
}

/// Concatenate blocks back into body text
pub fn to_source(blocks: &[Block]) -> String {
    blocks.iter().map(Block::to_source).collect()
}

/// Scan a body into blocks, numbering lines from 1
pub fn render_body(text: &str) -> BlockScanner<'_> {
    BlockScanner::new(text, 1)
}

/// Single forward pass over a body, yielding one block at a time.
///
/// After an error the scanner is exhausted.
pub struct BlockScanner<'a> {
    rest: &'a str,
    line: usize,
    done: bool,
}

impl<'a> BlockScanner<'a> {
    /// `first_line` is the document line the body starts on
    pub fn new(text: &'a str, first_line: usize) -> Self {
        Self {
            rest: text,
            line: first_line,
            done: false,
        }
    }

    /// Take `len` bytes spanning `lines` lines off the front of the input
    fn advance(&mut self, len: usize, lines: usize) -> &'a str {
        let (taken, rest) = self.rest.split_at(len);
        self.rest = rest;
        self.line += lines;
        taken
    }

    fn scan_fence(&mut self, open: FenceOpen, open_len: usize) -> Result<Block, ParseError> {
        let start_line = self.line;
        let open_marker = self.advance(open_len, 1).to_string();

        let rest = self.rest;
        let mut content_len = 0;
        let mut content_lines = 0;
        for raw_line in rest.split_inclusive('\n') {
            if open.is_closed_by(raw_line) {
                let content = self.advance(content_len, content_lines).to_string();
                let close_marker = self.advance(raw_line.len(), 1).to_string();
                return Ok(Block::CodeFence(CodeFence {
                    lang: open.info.split_whitespace().next().map(str::to_string),
                    info: open.info,
                    content,
                    line: start_line,
                    open_marker,
                    close_marker,
                }));
            }
            content_len += raw_line.len();
            content_lines += 1;
        }

        Err(ParseError::new(start_line, ParseErrorKind::UnterminatedFence))
    }

    fn scan_prose(&mut self) -> Block {
        let start_line = self.line;
        let mut len = 0;
        let mut lines = 0;
        for raw_line in self.rest.split_inclusive('\n') {
            let boundary = FenceOpen::parse(raw_line).is_some() || is_atx_heading(raw_line);
            if boundary && lines > 0 {
                break;
            }
            len += raw_line.len();
            lines += 1;
        }
        let text = self.advance(len, lines).to_string();
        Block::Prose {
            text,
            line: start_line,
        }
    }
}

impl Iterator for BlockScanner<'_> {
    type Item = Result<Block, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.rest.is_empty() {
            return None;
        }

        let rest = self.rest;
        let first = rest.split_inclusive('\n').next().unwrap_or(rest);
        let block = match FenceOpen::parse(first) {
            Some(open) => self.scan_fence(open, first.len()),
            None => Ok(self.scan_prose()),
        };
        if block.is_err() {
            self.done = true;
        }
        Some(block)
    }
}

/// An opening fence marker: at least three backticks or tildes
#[derive(Debug)]
struct FenceOpen {
    ch: char,
    len: usize,
    info: String,
}

impl FenceOpen {
    fn parse(raw_line: &str) -> Option<Self> {
        let rest = strip_indent(raw_line)?;
        let ch = rest.chars().next().filter(|c| *c == '`' || *c == '~')?;
        let len = rest.len() - rest.trim_start_matches(ch).len();
        if len < 3 {
            return None;
        }
        let info = rest[len..].trim();
        // Backtick fences cannot carry backticks in their info string
        if ch == '`' && info.contains('`') {
            return None;
        }
        Some(Self {
            ch,
            len,
            info: info.to_string(),
        })
    }

    fn is_closed_by(&self, raw_line: &str) -> bool {
        let Some(rest) = strip_indent(raw_line) else {
            return false;
        };
        let rest = rest.trim_end();
        let run = rest.len() - rest.trim_start_matches(self.ch).len();
        run >= self.len && run == rest.len()
    }
}

/// Strip up to three leading spaces; `None` when the line is indented further
fn strip_indent(raw_line: &str) -> Option<&str> {
    let line = raw_line.trim_end_matches(['\n', '\r']);
    let rest = line.trim_start_matches(' ');
    if line.len() - rest.len() > 3 {
        return None;
    }
    Some(rest)
}

/// `#` through `######` followed by whitespace or end of line
fn is_atx_heading(raw_line: &str) -> bool {
    let Some(rest) = strip_indent(raw_line) else {
        return false;
    };
    let hashes = rest.len() - rest.trim_start_matches('#').len();
    (1..=6).contains(&hashes) && rest[hashes..]
            .chars()
            .next()
            .map_or(true, char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(text: &str) -> Vec<Block> {
        render_body(text).collect::<Result<Vec<_>, _>>().unwrap()
    }

    #[test]
    fn test_prose_and_fence() {
        let body = "Intro text.\n\n```swift\nlet queue = OperationQueue()\n```\nOutro.\n";
        let blocks = scan(body);
        assert_eq!(blocks.len(), 3);

        assert!(matches!(&blocks[0], Block::Prose { text, line: 1 } if text == "Intro text.\n\n"));
        match &blocks[1] {
            Block::CodeFence(fence) => {
                assert_eq!(fence.lang.as_deref(), Some("swift"));
                assert_eq!(fence.content, "let queue = OperationQueue()\n");
                assert_eq!(fence.line, 3);
            }
            other => panic!("expected code fence, got {:?}", other),
        }
        assert_eq!(blocks[2].line(), 6);
        assert_eq!(to_source(&blocks), body);
    }

    #[test]
    fn test_fence_content_is_literal() {
        let body = "~~~\n# not a heading\n```\n*not emphasis* [not](a link)\n~~~\n";
        let blocks = scan(body);
        assert_eq!(blocks.len(), 1);
        match &blocks[0] {
            Block::CodeFence(fence) => {
                assert_eq!(fence.lang, None);
                assert_eq!(
                    fence.content,
                    "# not a heading\n```\n*not emphasis* [not](a link)\n"
                );
            }
            other => panic!("expected code fence, got {:?}", other),
        }
    }

    #[test]
    fn test_longer_fence_needs_longer_close() {
        let body = "````md\n```\ninner\n```\n````\n";
        let blocks = scan(body);
        assert_eq!(blocks.len(), 1);
        match &blocks[0] {
            Block::CodeFence(fence) => assert_eq!(fence.content, "```\ninner\n```\n"),
            other => panic!("expected code fence, got {:?}", other),
        }
    }

    #[test]
    fn test_counts_fence_pairs() {
        let body = "a\n```c\nint x;\n```\nb\n```\n\n```\n```objc\n[self start];\n```";
        let fences: Vec<_> = scan(body)
            .into_iter()
            .filter(|b| matches!(b, Block::CodeFence(_)))
            .collect();
        assert_eq!(fences.len(), 3);
        assert_eq!(to_source(&scan(body)), body);
    }

    #[test]
    fn test_headings_split_prose() {
        let body = "# Title\nsome text\n- item\n## Section\n[link](x)\n";
        let blocks = scan(body);
        assert_eq!(blocks.len(), 2);
        assert!(matches!(&blocks[0], Block::Prose { text, .. } if text == "# Title\nsome text\n- item\n"));
        assert!(matches!(&blocks[1], Block::Prose { text, line: 4 } if text == "## Section\n[link](x)\n"));
    }

    #[test]
    fn test_hashtag_is_not_heading() {
        assert!(!is_atx_heading("#hashtag\n"));
        assert!(!is_atx_heading("####### seven\n"));
        assert!(is_atx_heading("###\n"));
        assert!(is_atx_heading("   # indented\n"));
        assert!(!is_atx_heading("    # code\n"));
    }

    #[test]
    fn test_indented_code_is_not_a_fence() {
        let body = "text\n\n    ```\n    still prose\n";
        let blocks = scan(body);
        assert_eq!(blocks.len(), 1);
        assert!(matches!(&blocks[0], Block::Prose { .. }));
    }

    #[test]
    fn test_unterminated_fence() {
        let mut scanner = BlockScanner::new("Intro\n```swift\nlet x = 1\n", 7);
        assert!(matches!(scanner.next(), Some(Ok(Block::Prose { line: 7, .. }))));
        let err = scanner.next().unwrap().unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnterminatedFence);
        assert_eq!(err.line, 8);
        assert!(scanner.next().is_none());
    }

    #[test]
    fn test_code_fence_new_round_trips() {
        let fence = Block::CodeFence(CodeFence::new(Some("rust"), "fn main() {}\n"));
        assert_eq!(fence.to_source(), "```rust\nfn main() {}\n```\n");
    }

    #[test]
    fn test_empty_body() {
        assert!(scan("").is_empty());
    }
}
