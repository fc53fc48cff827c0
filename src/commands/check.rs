//! Validate every document without writing output

use anyhow::Result;

use crate::generator::BatchReport;
use crate::Site;

/// Render in memory and print a per-document report
pub async fn run(site: &Site) -> Result<BatchReport> {
    let report = site.render().await?;
    print!("{}", format_report(&report));
    Ok(report)
}

/// One line per page, warning and failure
pub fn format_report(report: &BatchReport) -> String {
    let mut out = String::new();

    for page in &report.pages {
        out.push_str(&format!(
            "ok    {} <- {}\n",
            page.address,
            page.source.display()
        ));
        for warning in &page.front_matter.warnings {
            out.push_str(&format!("warn  {}: {}\n", page.source.display(), warning));
        }
    }
    for failure in &report.failures {
        out.push_str(&format!(
            "fail  {}: {}\n",
            failure.source.display(),
            failure.error
        ));
    }

    out.push_str(&format!(
        "{} rendered, {} skipped, {} warnings\n",
        report.pages.len(),
        report.failures.len(),
        report.warning_count()
    ));
    out
}
