//! Generator module - writes rendered pages, listings and the manifest

pub mod batch;
pub mod index;

use anyhow::{Context as _, Result};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tera::Context;

pub use batch::{BatchReport, DocumentError, DocumentFailure};
pub use index::{group_by_category, CategoryGroup};

use crate::content::{FieldValue, RenderedPage};
use crate::helpers::{full_url_for, page_path, url_for};
use crate::templates::{CategoryData, CategoryLink, ConfigData, PostData, TemplateRenderer};
use crate::Site;

/// Manifest file written next to the pages
pub const MANIFEST_FILE: &str = "manifest.json";

/// Static site generator using Tera templates
pub struct Generator {
    site: Site,
    renderer: TemplateRenderer,
}

impl Generator {
    /// Create a new generator
    pub fn new(site: &Site) -> Result<Self> {
        Ok(Self {
            site: site.clone(),
            renderer: TemplateRenderer::new()?,
        })
    }

    /// Write every output file for a batch
    pub fn generate(&self, report: &BatchReport) -> Result<()> {
        fs::create_dir_all(&self.site.public_dir)
            .with_context(|| format!("Failed to create {:?}", self.site.public_dir))?;

        let config_data = self.build_config_data();
        let post_data: Vec<PostData> = report
            .pages
            .iter()
            .map(|p| self.build_post_data(p))
            .collect();

        self.generate_post_pages(&report.pages, &post_data, &config_data)?;
        self.generate_index_page(&post_data, &config_data)?;
        self.generate_category_pages(&report.pages, &post_data, &config_data)?;
        self.generate_manifest(report)?;

        tracing::info!(
            "Wrote {} pages to {:?}",
            report.pages.len(),
            self.site.public_dir
        );
        Ok(())
    }

    /// Build config data for templates
    fn build_config_data(&self) -> ConfigData {
        let config = &self.site.config;
        ConfigData {
            title: config.title.clone(),
            description: config.description.clone(),
            author: config.author.clone(),
            url: config.url.clone(),
            root: url_for(config, ""),
        }
    }

    fn build_post_data(&self, page: &RenderedPage) -> PostData {
        let config = &self.site.config;
        let fm = &page.front_matter;
        let path = page_path(config, &page.address);

        PostData {
            title: fm.title.clone(),
            date: page.date().format("%Y-%m-%d").to_string(),
            date_iso: page.date().to_rfc3339(),
            permalink: full_url_for(config, &path),
            path,
            layout: fm.layout.clone(),
            categories: fm
                .categories
                .iter()
                .map(|name| CategoryLink {
                    name: name.clone(),
                    path: self.category_path(&slug::slugify(name)),
                })
                .collect(),
            tags: fm.tags.clone(),
            extra: fm.extra.clone(),
            content: page.content(),
        }
    }

    fn category_path(&self, slug: &str) -> String {
        url_for(
            &self.site.config,
            &format!("{}/{}/", self.site.config.category_dir, slug),
        )
    }

    /// Generate one page per post at its address
    fn generate_post_pages(
        &self,
        pages: &[RenderedPage],
        post_data: &[PostData],
        config_data: &ConfigData,
    ) -> Result<()> {
        for (page, data) in pages.iter().zip(post_data) {
            let template = TemplateRenderer::layout_template(
                &page.front_matter.layout,
                &self.site.config.default_layout,
            );

            let mut context = Context::new();
            context.insert("config", config_data);
            context.insert("post", data);

            let html = self
                .renderer
                .render(&template, &context)
                .with_context(|| format!("Failed to render {:?}", page.source))?;
            self.write_page(&Path::new(&page.address).join("index.html"), &html)?;
        }
        Ok(())
    }

    /// Generate the chronological index
    fn generate_index_page(&self, post_data: &[PostData], config_data: &ConfigData) -> Result<()> {
        let mut context = Context::new();
        context.insert("config", config_data);
        context.insert("posts", post_data);

        let html = self.renderer.render("index.html", &context)?;
        self.write_page(Path::new("index.html"), &html)
    }

    /// Generate one listing per category
    fn generate_category_pages(
        &self,
        pages: &[RenderedPage],
        post_data: &[PostData],
        config_data: &ConfigData,
    ) -> Result<()> {
        let by_address: HashMap<&str, &PostData> = pages
            .iter()
            .map(|p| p.address.as_str())
            .zip(post_data)
            .collect();

        for group in group_by_category(pages) {
            let posts: Vec<&PostData> = group
                .pages
                .iter()
                .filter_map(|p| by_address.get(p.address.as_str()).copied())
                .collect();
            let category = CategoryData {
                name: group.name.clone(),
                slug: group.slug.clone(),
                path: self.category_path(&group.slug),
                count: posts.len(),
            };

            let mut context = Context::new();
            context.insert("config", config_data);
            context.insert("category", &category);
            context.insert("posts", &posts);

            let html = self.renderer.render("category.html", &context)?;
            let output = PathBuf::from(&self.site.config.category_dir)
                .join(&group.slug)
                .join("index.html");
            self.write_page(&output, &html)?;
        }
        Ok(())
    }

    /// Write `manifest.json`: every page and every skipped document
    fn generate_manifest(&self, report: &BatchReport) -> Result<()> {
        let manifest = Manifest::new(&self.site, report);
        let json = serde_json::to_string_pretty(&manifest)?;
        self.write_page(Path::new(MANIFEST_FILE), &json)
    }

    fn write_page(&self, relative: &Path, contents: &str) -> Result<()> {
        let output_path = self.site.public_dir.join(relative);
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&output_path, contents)
            .with_context(|| format!("Failed to write {:?}", output_path))?;
        tracing::debug!("Generated: {:?}", output_path);
        Ok(())
    }
}

/// Machine-readable listing of a batch
#[derive(Debug, Serialize)]
pub struct Manifest<'a> {
    pub pages: Vec<ManifestPage<'a>>,
    pub categories: Vec<ManifestCategory>,
    pub failures: &'a [DocumentFailure],
}

#[derive(Debug, Serialize)]
pub struct ManifestPage<'a> {
    pub address: &'a str,
    pub path: String,
    pub title: &'a str,
    /// Date as written in the source
    pub date: &'a str,
    pub layout: &'a str,
    pub categories: &'a [String],
    pub tags: &'a [String],
    /// Uninterpreted front-matter keys, passed through as written
    pub extra: &'a IndexMap<String, FieldValue>,
    pub source: &'a Path,
}

#[derive(Debug, Serialize)]
pub struct ManifestCategory {
    pub name: String,
    pub slug: String,
    /// Addresses, newest first
    pub pages: Vec<String>,
}

impl<'a> Manifest<'a> {
    pub fn new(site: &Site, report: &'a BatchReport) -> Self {
        let pages = report
            .pages
            .iter()
            .map(|p| ManifestPage {
                address: &p.address,
                path: page_path(&site.config, &p.address),
                title: &p.front_matter.title,
                date: &p.front_matter.date_raw,
                layout: &p.front_matter.layout,
                categories: &p.front_matter.categories,
                tags: &p.front_matter.tags,
                extra: &p.front_matter.extra,
                source: &p.source,
            })
            .collect();

        let categories = group_by_category(&report.pages)
            .into_iter()
            .map(|g| ManifestCategory {
                name: g.name,
                slug: g.slug,
                pages: g.pages.iter().map(|p| p.address.clone()).collect(),
            })
            .collect();

        Self {
            pages,
            categories,
            failures: &report.failures,
        }
    }
}
