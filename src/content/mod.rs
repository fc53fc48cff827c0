//! Content module - parses posts and renders their bodies

mod address;
pub mod blocks;
mod error;
mod frontmatter;
pub mod loader;
pub mod markdown;
mod post;

pub use address::{derive_address, slugify_title};
pub use blocks::{render_body, Block, BlockScanner, CodeFence};
pub use error::{BatchError, ParseError, ParseErrorKind, ReadError, Warning};
pub use frontmatter::{parse_date, FieldValue, FrontMatter};
pub use markdown::{MarkdownRenderer, RenderedBlock};
pub use post::{Post, RenderedPage};

/// Parse the front matter of a document, returning it with the remaining body
pub fn parse_front_matter(raw: &str) -> Result<(FrontMatter, &str), ParseError> {
    FrontMatter::parse(raw)
}
