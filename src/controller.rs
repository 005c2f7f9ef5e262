//! Crawl controller: walks each product's paginated review listing.
//!
//! Per product the crawl moves through
//! `Pending -> Fetching(1) -> { Accumulating -> Fetching(n+1) } -> Exhausted | Aborted`.
//! A failed fetch skips its page. The batch is flushed to the corpus once the
//! product is exhausted, so completed products survive a later crash.

use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::corpus::CorpusStore;
use crate::error::PersistenceFailure;
use crate::extractor;
use crate::fetcher::PageFetcher;
use crate::record::{ProductTarget, ReviewRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    Pending,
    Fetching { page: u32 },
    Accumulating { page: u32 },
    Exhausted,
    Aborted,
}

impl CrawlState {
    pub fn is_terminal(self) -> bool {
        matches!(self, CrawlState::Exhausted | CrawlState::Aborted)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CrawlSettings {
    /// Hard cap on pages visited per product.
    pub pages_per_product: u32,
    /// Pause after every fetch, successful or not.
    pub page_delay: Duration,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            pages_per_product: crate::config::DEFAULT_PAGES_PER_PRODUCT,
            page_delay: Duration::from_millis(crate::config::DEFAULT_PAGE_DELAY_MS),
        }
    }
}

/// What happened while crawling one product.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductReport {
    pub product: String,
    pub final_state: CrawlState,
    pub fetch_attempts: u32,
    pub pages_skipped: u32,
    pub blocks_rejected: usize,
    pub records_saved: usize,
}

impl ProductReport {
    fn new(target: &ProductTarget) -> Self {
        Self {
            product: target.name.clone(),
            final_state: CrawlState::Pending,
            fetch_attempts: 0,
            pages_skipped: 0,
            blocks_rejected: 0,
            records_saved: 0,
        }
    }
}

#[derive(Debug, Default)]
pub struct CrawlSummary {
    pub products: Vec<ProductReport>,
}

impl CrawlSummary {
    pub fn records_saved(&self) -> usize {
        self.products.iter().map(|p| p.records_saved).sum()
    }

    pub fn aborted(&self) -> usize {
        self.products
            .iter()
            .filter(|p| p.final_state == CrawlState::Aborted)
            .count()
    }
}

pub struct CrawlController<'a, F: PageFetcher> {
    fetcher: &'a F,
    store: &'a CorpusStore,
    settings: CrawlSettings,
}

impl<'a, F: PageFetcher> CrawlController<'a, F> {
    pub fn new(fetcher: &'a F, store: &'a CorpusStore, settings: CrawlSettings) -> Self {
        Self {
            fetcher,
            store,
            settings,
        }
    }

    /// Crawl every product in order. Only a corpus write failure stops the run.
    pub async fn crawl_all(&self, targets: &[ProductTarget]) -> Result<CrawlSummary, PersistenceFailure> {
        info!("🚀 Starting crawl for {} products...", targets.len());
        let mut summary = CrawlSummary::default();

        for (i, target) in targets.iter().enumerate() {
            info!("👟 Product {}/{}: {}", i + 1, targets.len(), target.name);
            let report = self.crawl_product(target).await?;
            summary.products.push(report);
        }

        info!(
            "🏁 Crawl finished: {} records saved, {} products aborted",
            summary.records_saved(),
            summary.aborted()
        );
        Ok(summary)
    }

    /// Run one product's state machine to a terminal state and flush its batch.
    pub async fn crawl_product(&self, target: &ProductTarget) -> Result<ProductReport, PersistenceFailure> {
        let mut report = ProductReport::new(target);
        let mut batch: Vec<ReviewRecord> = Vec::new();
        let mut state = CrawlState::Pending;

        while !state.is_terminal() {
            state = match state {
                CrawlState::Pending => {
                    if target.is_crawlable() {
                        CrawlState::Fetching { page: 1 }
                    } else {
                        warn!("⚠️ Not a crawlable product URL: {:?}", target.url);
                        CrawlState::Aborted
                    }
                }
                CrawlState::Fetching { page } if page > self.settings.pages_per_product => CrawlState::Exhausted,
                CrawlState::Fetching { page } => {
                    report.fetch_attempts += 1;
                    let fetched = self.fetcher.fetch(&target.url, page).await;
                    sleep(self.settings.page_delay).await;

                    match fetched {
                        Ok(html) => {
                            let extraction = extractor::extract(&html, &target.name);
                            report.blocks_rejected += extraction.failures.len();
                            if extraction.is_exhausted() {
                                CrawlState::Exhausted
                            } else {
                                batch.extend(extraction.records);
                                CrawlState::Accumulating { page }
                            }
                        }
                        Err(failure) => {
                            warn!("⚠️ Page {} skipped: {}", page, failure);
                            report.pages_skipped += 1;
                            CrawlState::Fetching { page: page + 1 }
                        }
                    }
                }
                CrawlState::Accumulating { page } => CrawlState::Fetching { page: page + 1 },
                terminal @ (CrawlState::Exhausted | CrawlState::Aborted) => terminal,
            };
        }

        if state == CrawlState::Exhausted {
            if batch.is_empty() {
                info!("   No reviews found ({} blocks rejected).", report.blocks_rejected);
            } else {
                report.records_saved = self.store.append(&batch)?;
                info!(
                    "   ✅ Saved {} reviews ({} blocks rejected).",
                    report.records_saved, report.blocks_rejected
                );
            }
        }

        report.final_state = state;
        Ok(report)
    }
}
