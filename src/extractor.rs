//! Review extraction from a fetched listing page.
//!
//! Each `div.user-review` block becomes one `Result<ReviewRecord, ExtractionFailure>`.
//! Failed blocks are reported to the caller and skipped, never fatal.

use chrono::{Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::debug;

use crate::error::ExtractionFailure;
use crate::record::{ReviewRecord, Verified, MIN_TEXT_CHARS};

static REVIEW_BLOCK: Lazy<Selector> = Lazy::new(|| parse_selector("div.user-review"));
static ACTIVE_STAR: Lazy<Selector> = Lazy::new(|| parse_selector("i.sd-icon-star-active"));
static HELPFUL_WIDGET: Lazy<Selector> = Lazy::new(|| parse_selector("div.review-helpful"));

static LEADING_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z][a-z]{2}) (\d{1,2}), (\d{4})\.").expect("valid date regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

const BADGE_TEXT: &str = "Verified Buyer";
const MAX_STARS: usize = 5;

fn parse_selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid built-in selector '{}': {:?}", css, e))
}

/// Everything extracted from one page.
#[derive(Debug, Default)]
pub struct PageExtraction {
    pub records: Vec<ReviewRecord>,
    pub failures: Vec<ExtractionFailure>,
}

impl PageExtraction {
    pub fn block_count(&self) -> usize {
        self.records.len() + self.failures.len()
    }

    /// No review blocks at all: the product's listing is exhausted. A page whose
    /// blocks were all rejected is not.
    pub fn is_exhausted(&self) -> bool {
        self.block_count() == 0
    }
}

/// Parse every review block of a page, one result per block.
pub fn extract_blocks(html: &str, product_name: &str) -> Vec<Result<ReviewRecord, ExtractionFailure>> {
    let document = Html::parse_document(html);
    let crawl_date = Local::now().date_naive();

    document
        .select(&REVIEW_BLOCK)
        .enumerate()
        .map(|(index, block)| parse_block(index, block, product_name, crawl_date))
        .collect()
}

/// Parse a page and split the results into records and skipped blocks.
pub fn extract(html: &str, product_name: &str) -> PageExtraction {
    let mut page = PageExtraction::default();
    for result in extract_blocks(html, product_name) {
        match result {
            Ok(record) => page.records.push(record),
            Err(failure) => {
                debug!("Skipping review block: {}", failure);
                page.failures.push(failure);
            }
        }
    }
    page
}

fn parse_block(
    index: usize,
    block: ElementRef<'_>,
    product_name: &str,
    crawl_date: NaiveDate,
) -> Result<ReviewRecord, ExtractionFailure> {
    let stars = block.select(&ACTIVE_STAR).count();
    if stars > MAX_STARS {
        return Err(ExtractionFailure::RatingOutOfRange { index, stars });
    }

    let raw_text = block_text(block);
    if raw_text.is_empty() {
        return Err(ExtractionFailure::EmptyText { index });
    }

    let text = normalize_text(&raw_text);
    let len = text.chars().count();
    if len <= MIN_TEXT_CHARS {
        return Err(ExtractionFailure::TooShort { index, len });
    }

    Ok(ReviewRecord {
        product_name: product_name.to_string(),
        review_date: leading_date(&text).unwrap_or(crawl_date),
        review_text: text,
        rating: stars as u8,
        verified: Verified::Yes,
    })
}

/// Trimmed text nodes of the block joined with ". ", helpful-vote widgets excluded.
fn block_text(block: ElementRef<'_>) -> String {
    let excluded: Vec<_> = block.select(&HELPFUL_WIDGET).map(|w| w.id()).collect();

    block
        .descendants()
        .filter(|node| !node.ancestors().any(|a| excluded.contains(&a.id())))
        .filter_map(|node| match node.value() {
            Node::Text(text) => Some(text.trim()),
            _ => None,
        })
        .filter(|chunk| !chunk.is_empty())
        .collect::<Vec<_>>()
        .join(". ")
}

/// Newlines to spaces, badge text removed, whitespace collapsed.
pub fn normalize_text(raw: &str) -> String {
    let without_badge = raw.replace('\n', " ").replace(BADGE_TEXT, "");
    WHITESPACE.replace_all(&without_badge, " ").trim().to_string()
}

/// Review text usually opens with its posting date, e.g. `Jan 12, 2024. Great fit`.
fn leading_date(text: &str) -> Option<NaiveDate> {
    let caps = LEADING_DATE.captures(text)?;
    let stamp = format!("{} {} {}", &caps[1], &caps[2], &caps[3]);
    NaiveDate::parse_from_str(&stamp, "%b %d %Y").ok()
}
