//! List site content

use anyhow::Result;

use crate::generator::group_by_category;
use crate::Site;

/// List site content by type
pub async fn run(site: &Site, content_type: &str) -> Result<()> {
    match content_type {
        "post" | "posts" => {
            let report = site.render().await?;
            println!("Posts ({}):", report.pages.len());
            for page in &report.pages {
                println!(
                    "  {} - {} [{}]",
                    page.date().format("%Y-%m-%d"),
                    page.front_matter.title,
                    page.address
                );
            }
        }
        "category" | "categories" => {
            let report = site.render().await?;
            let groups = group_by_category(&report.pages);
            println!("Categories ({}):", groups.len());
            for group in groups {
                println!("  {} ({})", group.name, group.pages.len());
            }
        }
        "failure" | "failures" => {
            let report = site.render().await?;
            println!("Failures ({}):", report.failures.len());
            for failure in &report.failures {
                println!("  {}: {}", failure.source.display(), failure.error);
            }
        }
        _ => {
            anyhow::bail!(
                "Unknown type: {}. Available: post, category, failure",
                content_type
            );
        }
    }

    Ok(())
}
