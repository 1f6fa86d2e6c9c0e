//! Export the site as static files

use anyhow::Result;

use crate::generator::{ExportReport, PageBuilder};
use crate::Site;

/// Export the listing and every post to the public directory
pub async fn run(site: &Site) -> Result<()> {
    let builder = site.page_builder()?;
    export(site, &builder).await?;
    Ok(())
}

pub async fn export(site: &Site, builder: &PageBuilder) -> Result<ExportReport> {
    let start = std::time::Instant::now();

    let report = builder.export(&site.public_dir, &site.static_dir).await?;

    tracing::info!(
        posts = report.posts,
        assets = report.assets,
        "Generated in {:.2}s",
        start.elapsed().as_secs_f64()
    );

    Ok(report)
}
