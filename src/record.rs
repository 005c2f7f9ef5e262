use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reviews whose normalized text is not longer than this are never persisted.
pub const MIN_TEXT_CHARS: usize = 10;

/// Rating value marking a synthetic Negative record.
pub const NEGATIVE_SENTINEL: u8 = 1;
/// Rating value marking a synthetic Neutral record.
pub const NEUTRAL_SENTINEL: u8 = 3;

/// Who vouches for a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verified {
    Yes,
    No,
    /// Generated by the curator, never scraped.
    System,
}

/// One row of the corpus file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    #[serde(rename = "Product Name")]
    pub product_name: String,
    #[serde(rename = "Review Text")]
    pub review_text: String,
    #[serde(rename = "Review Rating")]
    pub rating: u8,
    #[serde(rename = "Review Date")]
    pub review_date: NaiveDate,
    #[serde(rename = "Reviewer Verified")]
    pub verified: Verified,
}

impl ReviewRecord {
    pub fn is_synthetic(&self) -> bool {
        self.verified == Verified::System
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Sentiment {
    Negative,
    Neutral,
    Positive,
}

impl Sentiment {
    /// Fixed class order used for model rows and reports.
    pub const ALL: [Sentiment; 3] = [Sentiment::Negative, Sentiment::Neutral, Sentiment::Positive];

    pub fn index(self) -> usize {
        match self {
            Sentiment::Negative => 0,
            Sentiment::Neutral => 1,
            Sentiment::Positive => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
            Sentiment::Positive => "Positive",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledRecord {
    pub record: ReviewRecord,
    pub sentiment: Sentiment,
}

/// A product whose review listing should be crawled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductTarget {
    /// Product URL with any `#fragment` removed.
    pub url: String,
    pub name: String,
}

impl ProductTarget {
    pub fn from_url(link: &str) -> Self {
        let url = link.split('#').next().unwrap_or_default().trim().trim_end_matches('/').to_string();
        let name = product_name_from_url(&url).unwrap_or_else(|| "Unknown Product".to_string());
        Self { url, name }
    }

    /// The crawl can only start from an absolute http(s) URL.
    pub fn is_crawlable(&self) -> bool {
        reqwest::Url::parse(&self.url)
            .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
            .unwrap_or(false)
    }
}

/// `.../product/asian-mexico11-beige-mens-sneakers/5188147402095882363`
/// becomes `Asian Mexico11 Beige Mens Sneakers`.
fn product_name_from_url(url: &str) -> Option<String> {
    let segments: Vec<&str> = url.split('/').collect();
    if segments.len() < 2 {
        return None;
    }
    let slug = segments[segments.len() - 2];
    if slug.is_empty() || slug.contains(':') {
        return None;
    }

    let name = slug
        .split('-')
        .filter(|w| !w.is_empty())
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ");

    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}
