use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use sentiment_harvester::controller::{CrawlController, CrawlSettings, CrawlState};
use sentiment_harvester::corpus::CorpusStore;
use sentiment_harvester::curator::Curator;
use sentiment_harvester::error::FetchFailure;
use sentiment_harvester::fetcher::PageFetcher;
use sentiment_harvester::labeler::Labeler;
use sentiment_harvester::record::{ProductTarget, Sentiment};
use sentiment_harvester::training::{self, ClassifierArtifact, TrainingParams};

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Canned review listings keyed by (product url, page). Unknown pages are empty.
#[derive(Default)]
struct FakeSite {
    pages: HashMap<(String, u32), String>,
    calls: Mutex<usize>,
}

impl FakeSite {
    fn with_page(mut self, url: &str, page: u32, reviews: &[(&str, usize)]) -> Self {
        let blocks: String = reviews
            .iter()
            .map(|(text, stars)| {
                format!(
                    "<div class=\"user-review\"><div>{}</div><p>{}</p></div>",
                    "<i class=\"sd-icon-star-active\"></i>".repeat(*stars),
                    text
                )
            })
            .collect();
        self.pages
            .insert((url.to_string(), page), format!("<html><body>{}</body></html>", blocks));
        self
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl PageFetcher for FakeSite {
    async fn fetch(&self, product_url: &str, page: u32) -> Result<String, FetchFailure> {
        *self.calls.lock().unwrap() += 1;
        Ok(self
            .pages
            .get(&(product_url.to_string(), page))
            .cloned()
            .unwrap_or_else(|| "<html><body><p>No reviews yet</p></body></html>".to_string()))
    }
}

const SHOES_A: &str = "https://www.snapdeal.com/product/asian-blue-running-shoes/647066066887";
const SHOES_B: &str = "https://www.snapdeal.com/product/asian-blue-sport-shoes-for/646041775158";

fn settings() -> CrawlSettings {
    CrawlSettings {
        pages_per_product: 10,
        page_delay: Duration::ZERO,
    }
}

fn curator() -> Curator<StdRng> {
    Curator::new(StdRng::seed_from_u64(42))
}

#[tokio::test]
async fn empty_first_page_appends_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = CorpusStore::new(dir.path().join("reviews.csv"));
    let site = FakeSite::default();

    let summary = CrawlController::new(&site, &store, settings())
        .crawl_all(&[ProductTarget::from_url(SHOES_A)])
        .await
        .unwrap();

    assert_eq!(summary.products[0].final_state, CrawlState::Exhausted);
    assert_eq!(summary.records_saved(), 0);
    assert_eq!(site.calls(), 1);
    assert!(!store.exists());
}

#[tokio::test]
async fn duplicate_text_across_products_survives_once() {
    let dir = tempfile::tempdir().unwrap();
    let store = CorpusStore::new(dir.path().join("reviews.csv"));
    let site = FakeSite::default()
        .with_page(SHOES_A, 1, &[("great shoes 123", 5), ("light and comfortable", 4)])
        .with_page(SHOES_B, 1, &[("great shoes 123", 4)]);

    let summary = CrawlController::new(&site, &store, settings())
        .crawl_all(&[ProductTarget::from_url(SHOES_A), ProductTarget::from_url(SHOES_B)])
        .await
        .unwrap();
    assert_eq!(summary.records_saved(), 3);

    let (curated, report) = curator().curate(store.load().unwrap(), 10);
    assert_eq!(report.duplicates_removed, 1);

    let survivors: Vec<_> = curated.iter().filter(|r| r.review_text == "great shoes 123").collect();
    assert_eq!(survivors.len(), 1);
    assert_eq!(survivors[0].product_name, "Asian Blue Running Shoes");
}

#[tokio::test]
async fn crawl_curate_label_train_predict() {
    let dir = tempfile::tempdir().unwrap();
    let store = CorpusStore::new(dir.path().join("reviews.csv"));

    let mut site = FakeSite::default();
    for page in 1..=5 {
        let texts: Vec<String> = (0..10)
            .map(|i| format!("really good comfortable shoes, pair {} on page {}", i, page))
            .collect();
        let reviews: Vec<(&str, usize)> = texts.iter().map(|t| (t.as_str(), 5)).collect();
        site = site.with_page(SHOES_A, page, &reviews);
    }

    let summary = CrawlController::new(&site, &store, settings())
        .crawl_all(&[ProductTarget::from_url(SHOES_A)])
        .await
        .unwrap();
    assert_eq!(summary.records_saved(), 50);
    assert_eq!(site.calls(), 6);

    // 50 real records topped up with 800 synthetics per class
    let (curated, _) = curator().curate(store.load().unwrap(), 800);
    store.rewrite(&curated).unwrap();
    let reloaded = store.load().unwrap();
    assert_eq!(reloaded.len(), 1650);
    let texts: HashSet<&str> = reloaded.iter().map(|r| r.review_text.as_str()).collect();
    assert_eq!(texts.len(), 1650);

    // curating the rewritten corpus again changes nothing
    let (again, report) = curator().curate(reloaded.clone(), 800);
    assert_eq!(again.len(), 1650);
    assert_eq!(report.negative_added + report.neutral_added, 0);

    let labeler = Labeler::default();
    let labeled = labeler.label_all(reloaded.clone());
    assert_eq!(labeled, labeler.label_all(reloaded));
    assert_eq!(labeled.iter().filter(|l| l.sentiment == Sentiment::Negative).count(), 800);
    assert_eq!(labeled.iter().filter(|l| l.sentiment == Sentiment::Neutral).count(), 800);
    assert_eq!(labeled.iter().filter(|l| l.sentiment == Sentiment::Positive).count(), 50);

    let outcome = training::train(&labeled, TrainingParams::default()).unwrap();
    let vectorizer = dir.path().join("vectorizer.json");
    let model = dir.path().join("model.json");
    outcome.artifact.save(&vectorizer, &model).unwrap();

    let artifact = ClassifierArtifact::load(&vectorizer, &model).unwrap();
    let prediction = artifact.predict("Really good and comfortable shoes!");
    assert!((0.0..=1.0).contains(&prediction.confidence));
    assert_eq!(prediction.sentiment, Sentiment::Positive);
}
