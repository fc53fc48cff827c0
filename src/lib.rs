//! fencepost: renders front-matter Markdown posts into a static site
//!
//! Each post is parsed into validated front matter and a sequence of prose
//! and fenced-code blocks, given a date-based address, and rendered through
//! built-in Tera templates. A malformed post is reported and skipped without
//! stopping the rest of the batch.

pub mod commands;
pub mod config;
pub mod content;
pub mod generator;
pub mod helpers;
pub mod templates;

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

/// A site rooted at a directory
#[derive(Debug, Clone)]
pub struct Site {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: std::path::PathBuf,
    /// Source directory
    pub source_dir: std::path::PathBuf,
    /// Public (output) directory
    pub public_dir: std::path::PathBuf,
}

impl Site {
    /// Create a new site from a directory, reading `_config.yml` when present
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            tracing::debug!("No _config.yml in {:?}, using defaults", base_dir);
            config::SiteConfig::default()
        };

        Ok(Self::with_config(base_dir, config))
    }

    /// Create a site with an explicit configuration
    pub fn with_config<P: AsRef<Path>>(base_dir: P, config: config::SiteConfig) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        let source_dir = base_dir.join(&config.source_dir);
        let public_dir = base_dir.join(&config.public_dir);

        Self {
            config,
            base_dir,
            source_dir,
            public_dir,
        }
    }

    /// Load and render every document without writing anything
    pub async fn render(&self) -> Result<generator::BatchReport> {
        let documents = content::loader::ContentLoader::new(self).load_documents()?;
        let renderer = Arc::new(content::MarkdownRenderer::from_config(
            &self.config.highlight,
        ));
        generator::batch::run(
            documents,
            renderer,
            self.config.worker_count(),
            self.config.collision_policy,
        )
        .await
    }

    /// Render the site and write it to the public directory
    pub async fn generate(&self) -> Result<generator::BatchReport> {
        commands::render::run(self).await
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}
