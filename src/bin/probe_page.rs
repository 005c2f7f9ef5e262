//! Fetch one review page through stealth Chrome and report what the extractor sees.
//!
//! Usage: probe_page <product-url> [page]

use anyhow::{Context, Result};
use dotenv::dotenv;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sentiment_harvester::config::PipelineConfig;
use sentiment_harvester::extractor;
use sentiment_harvester::fetcher::{review_page_url, ChromeFetcher, PageFetcher};
use sentiment_harvester::record::ProductTarget;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .init();

    let mut args = std::env::args().skip(1);
    let url = args.next().context("usage: probe_page <product-url> [page]")?;
    let page: u32 = match args.next() {
        Some(raw) => raw.parse().with_context(|| format!("invalid page number {:?}", raw))?,
        None => 1,
    };

    let config = PipelineConfig::from_env();
    let target = ProductTarget::from_url(&url);
    info!("🕵️ Probing {} ({})", review_page_url(&target.url, page), target.name);

    let fetcher = ChromeFetcher::launch(config.page_load_timeout).context("Failed to launch Chrome")?;
    let html = fetcher.fetch(&target.url, page).await?;
    info!("Fetched {} bytes", html.len());

    let extraction = extractor::extract(&html, &target.name);
    info!(
        "{} review blocks: {} valid, {} rejected",
        extraction.block_count(),
        extraction.records.len(),
        extraction.failures.len()
    );
    for record in &extraction.records {
        info!("  [{}★ {}] {}", record.rating, record.review_date, record.review_text);
    }
    for failure in &extraction.failures {
        warn!("  rejected: {}", failure);
    }
    if extraction.is_exhausted() {
        warn!("No review blocks on this page; the crawl would stop here.");
    }

    Ok(())
}
