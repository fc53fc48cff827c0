//! Render the site into the public directory

use anyhow::Result;

use crate::generator::{BatchReport, Generator};
use crate::Site;

/// Render every document and write the output
pub async fn run(site: &Site) -> Result<BatchReport> {
    let start = std::time::Instant::now();

    let report = site.render().await?;
    let generator = Generator::new(site)?;
    generator.generate(&report)?;

    let duration = start.elapsed();
    tracing::info!("Generated in {:.2}s", duration.as_secs_f64());

    Ok(report)
}
