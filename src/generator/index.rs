//! Listing views: the chronological index and per-category groups

use std::collections::BTreeMap;

use crate::content::RenderedPage;

/// Pages sharing a category, newest first
#[derive(Debug)]
pub struct CategoryGroup<'a> {
    /// Display name, as first seen in the newest page
    pub name: String,
    pub slug: String,
    pub pages: Vec<&'a RenderedPage>,
}

/// Group pages by category slug.
///
/// `pages` must already be in index order; each group keeps that order.
/// Groups come back sorted by slug.
pub fn group_by_category(pages: &[RenderedPage]) -> Vec<CategoryGroup<'_>> {
    let mut groups: BTreeMap<String, CategoryGroup<'_>> = BTreeMap::new();

    for page in pages {
        for name in &page.front_matter.categories {
            let slug = slug::slugify(name);
            if slug.is_empty() {
                tracing::debug!("Ignoring category {:?} with an empty slug", name);
                continue;
            }
            let group = groups.entry(slug.clone()).or_insert_with(|| CategoryGroup {
                name: name.clone(),
                slug,
                pages: Vec::new(),
            });
            // A page listing the same category twice appears once
            if !group.pages.iter().any(|p| p.address == page.address) {
                group.pages.push(page);
            }
        }
    }

    groups.into_values().collect()
}
