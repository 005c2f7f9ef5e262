//! Runtime configuration.
//!
//! Every value comes from the environment (a `.env` file is honoured) and falls
//! back to the defaults below. The CLI may override individual fields.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::record::ProductTarget;

pub const DEFAULT_CORPUS_FILE: &str = "reviews.csv";
pub const DEFAULT_MODEL_FILE: &str = "model.json";
pub const DEFAULT_VECTORIZER_FILE: &str = "vectorizer.json";
pub const DEFAULT_PAGES_PER_PRODUCT: u32 = 10;
pub const DEFAULT_PAGE_DELAY_MS: u64 = 1500;
pub const DEFAULT_PAGE_LOAD_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_TARGET_BALANCE_COUNT: usize = 800;
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";

pub const DEFAULT_PRODUCTS: &[&str] = &[
    "https://www.snapdeal.com/product/asian-mexico11-beige-mens-sneakers/5188147402095882363",
    "https://www.snapdeal.com/product/asian-everest24-black-mens-trekking/8070451150763703721",
    "https://www.snapdeal.com/product/campus-oxyfit-n-blue-running/4899917063895353934",
    "https://www.snapdeal.com/product/asian-desire-lifestyle-white-casual/629748687908",
    "https://www.snapdeal.com/product/asian-white-mesh-textile-sport/662912850947",
    "https://www.snapdeal.com/product/asian-blue-running-shoes/6917529689503073923",
    "https://www.snapdeal.com/product/asian-blue-running-shoes/647066066887",
    "https://www.snapdeal.com/product/asian-blue-sport-shoes-for/646041775158",
    "https://www.snapdeal.com/product/asian-superfit-blue-running-shoes/673170361588",
    "https://www.snapdeal.com/product/asian-cosco-navy-mens-sports/7493990423950623709",
    "https://www.snapdeal.com/product/asian-white-mesh-textile-sport/6917529690553932803",
];

/// Which page fetcher backs the crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetcherKind {
    /// Headless Chrome with stealth settings.
    Chrome,
    /// Plain HTTP client, for listings that render server-side.
    Http,
}

impl FromStr for FetcherKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chrome" => Ok(FetcherKind::Chrome),
            "http" => Ok(FetcherKind::Http),
            other => Err(format!("unknown fetcher '{}', expected 'chrome' or 'http'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub corpus_file: PathBuf,
    pub products_file: Option<PathBuf>,
    pub pages_per_product: u32,
    pub page_delay: Duration,
    pub page_load_timeout: Duration,
    pub target_balance_count: usize,
    pub model_file: PathBuf,
    pub vectorizer_file: PathBuf,
    pub bind_addr: String,
    pub fetcher: FetcherKind,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            corpus_file: PathBuf::from(DEFAULT_CORPUS_FILE),
            products_file: None,
            pages_per_product: DEFAULT_PAGES_PER_PRODUCT,
            page_delay: Duration::from_millis(DEFAULT_PAGE_DELAY_MS),
            page_load_timeout: Duration::from_secs(DEFAULT_PAGE_LOAD_TIMEOUT_SECS),
            target_balance_count: DEFAULT_TARGET_BALANCE_COUNT,
            model_file: PathBuf::from(DEFAULT_MODEL_FILE),
            vectorizer_file: PathBuf::from(DEFAULT_VECTORIZER_FILE),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            fetcher: FetcherKind::Chrome,
        }
    }
}

impl PipelineConfig {
    /// Build from the process environment. Call `dotenv().ok()` first to pick up `.env`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; the environment is one such lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let path = |key: &str, default: PathBuf| lookup(key).map(PathBuf::from).unwrap_or(default);

        Self {
            corpus_file: path("CORPUS_FILE", defaults.corpus_file),
            products_file: lookup("PRODUCTS_FILE").map(PathBuf::from),
            pages_per_product: parse_or(&lookup, "PAGES_PER_PRODUCT", defaults.pages_per_product),
            page_delay: Duration::from_millis(parse_or(&lookup, "PAGE_DELAY_MS", DEFAULT_PAGE_DELAY_MS)),
            page_load_timeout: Duration::from_secs(parse_or(
                &lookup,
                "PAGE_LOAD_TIMEOUT_SECS",
                DEFAULT_PAGE_LOAD_TIMEOUT_SECS,
            )),
            target_balance_count: parse_or(&lookup, "TARGET_BALANCE_COUNT", defaults.target_balance_count),
            model_file: path("MODEL_FILE", defaults.model_file),
            vectorizer_file: path("VECTORIZER_FILE", defaults.vectorizer_file),
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            fetcher: parse_or(&lookup, "FETCHER", defaults.fetcher),
        }
    }

    /// Products to crawl: the products file when configured, the built-in list otherwise.
    pub fn products(&self) -> std::io::Result<Vec<ProductTarget>> {
        match &self.products_file {
            Some(path) => load_products(path),
            None => Ok(DEFAULT_PRODUCTS.iter().map(|u| ProductTarget::from_url(u)).collect()),
        }
    }
}

/// One URL per line; blank lines and `#` comments are ignored.
pub fn load_products(path: &Path) -> std::io::Result<Vec<ProductTarget>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ProductTarget::from_url)
        .collect())
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("⚠️ Ignoring invalid {}={:?}, using default", key, raw);
                default
            }
        },
        None => default,
    }
}
