//! Post model and rendered page

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::path::PathBuf;

use super::address::derive_address;
use super::blocks::{to_source, Block, BlockScanner};
use super::error::{ParseError, Warning};
use super::markdown::{MarkdownRenderer, RenderedBlock};
use super::FrontMatter;

/// A parsed blog post
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    /// Source file path (relative to the source directory)
    pub source: PathBuf,

    /// Validated front matter
    pub front_matter: FrontMatter,

    /// Body split into prose and code fences
    pub blocks: Vec<Block>,

    /// Canonical address, `YYYY/MM/DD/<slug>`
    pub address: String,
}

impl Post {
    /// Parse a post from its raw source text
    pub fn parse(source: impl Into<PathBuf>, raw: &str) -> Result<Self, ParseError> {
        let (front_matter, body) = FrontMatter::parse(raw)?;

        // The body starts on the line after the closing delimiter
        let header = &raw[..raw.len() - body.len()];
        let first_line = header.matches('\n').count() + 1;
        let blocks = BlockScanner::new(body, first_line).collect::<Result<Vec<_>, _>>()?;

        let address = derive_address(&front_matter)?;

        Ok(Self {
            source: source.into(),
            front_matter,
            blocks,
            address,
        })
    }

    pub fn title(&self) -> &str {
        &self.front_matter.title
    }

    pub fn date(&self) -> &DateTime<FixedOffset> {
        &self.front_matter.date
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.front_matter.warnings
    }

    /// The body text, rebuilt from blocks
    pub fn body_source(&self) -> String {
        to_source(&self.blocks)
    }

    /// Convert every block to HTML
    pub fn render(self, renderer: &MarkdownRenderer) -> RenderedPage {
        let blocks = renderer.render_blocks(&self.blocks);
        RenderedPage {
            source: self.source,
            address: self.address,
            front_matter: self.front_matter,
            blocks,
        }
    }
}

/// A post ready for templating
#[derive(Debug, Clone, Serialize)]
pub struct RenderedPage {
    pub source: PathBuf,
    pub address: String,
    pub front_matter: FrontMatter,
    pub blocks: Vec<RenderedBlock>,
}

impl RenderedPage {
    /// Concatenated HTML of all blocks
    pub fn content(&self) -> String {
        self.blocks.iter().map(RenderedBlock::html).collect()
    }

    pub fn date(&self) -> &DateTime<FixedOffset> {
        &self.front_matter.date
    }
}
