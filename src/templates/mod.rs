//! Built-in page templates using the Tera template engine
//!
//! Templates are embedded in the binary; a post's `layout` picks one of the
//! page layouts, falling back to the site's default layout.

use anyhow::Result;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::content::FieldValue;

/// Layouts a post may name in its front matter
pub const PAGE_LAYOUTS: &[&str] = &["post", "page"];

/// Template renderer with the embedded theme
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        // Content is already HTML; titles are escaped explicitly in templates
        tera.autoescape_on(vec![]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("theme/layout.html")),
            ("post.html", include_str!("theme/post.html")),
            ("page.html", include_str!("theme/page.html")),
            ("index.html", include_str!("theme/index.html")),
            ("category.html", include_str!("theme/category.html")),
            (
                "partials/header.html",
                include_str!("theme/partials/header.html"),
            ),
            (
                "partials/post_meta.html",
                include_str!("theme/partials/post_meta.html"),
            ),
        ])?;

        tera.register_filter("strip_html", strip_html_filter);
        tera.register_filter("truncate_chars", truncate_chars_filter);

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }

    /// Template file for a post layout
    pub fn layout_template(layout: &str, default_layout: &str) -> String {
        let layout = if PAGE_LAYOUTS.contains(&layout) {
            layout
        } else {
            tracing::debug!(
                "Unknown layout `{}`, using `{}` instead",
                layout,
                default_layout
            );
            if PAGE_LAYOUTS.contains(&default_layout) {
                default_layout
            } else {
                "post"
            }
        };
        format!("{}.html", layout)
    }
}

/// Tera filter: strip HTML tags
fn strip_html_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("strip_html", "value", String, value);
    let mut result = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }
    Ok(tera::Value::String(result))
}

/// Tera filter: truncate by character count
fn truncate_chars_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("truncate_chars", "value", String, value);
    let length = match args.get("length") {
        Some(val) => tera::try_get_value!("truncate_chars", "length", usize, val),
        None => 150,
    };

    if s.chars().count() <= length {
        Ok(tera::Value::String(s))
    } else {
        let truncated: String = s.chars().take(length).collect();
        Ok(tera::Value::String(format!("{}…", truncated.trim_end())))
    }
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct ConfigData {
    pub title: String,
    pub description: String,
    pub author: String,
    pub url: String,
    pub root: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryLink {
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostData {
    pub title: String,
    /// Calendar date, `YYYY-MM-DD`
    pub date: String,
    pub date_iso: String,
    pub path: String,
    pub permalink: String,
    pub layout: String,
    pub categories: Vec<CategoryLink>,
    pub tags: Vec<String>,
    /// Front-matter keys the renderer does not interpret, in source order
    pub extra: IndexMap<String, FieldValue>,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryData {
    pub name: String,
    pub slug: String,
    pub path: String,
    pub count: usize,
}
