//! Corpus curation: dedup by review text, then top up the Negative and Neutral
//! classes with synthetic records until each holds `target_balance_count`.

use chrono::{Local, NaiveDate};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use tracing::info;

use crate::record::{ReviewRecord, Sentiment, Verified, NEGATIVE_SENTINEL, NEUTRAL_SENTINEL};

pub const SYNTHETIC_PRODUCT_NAME: &str = "Synthetic Data";

const NEGATIVE_PHRASES: &[&str] = &[
    "waste of money",
    "bad quality",
    "terrible product",
    "fake item",
    "poor stitching",
    "sole came off",
    "uncomfortable",
    "worst purchase",
    "do not buy",
    "damaged product",
    "size is wrong",
    "very cheap material",
    "not original",
    "totally disappointed",
    "return request rejected",
];

const NEUTRAL_PHRASES: &[&str] = &[
    "product received",
    "delivery on time",
    "received the package",
    "packaging was okay",
    "average product",
    "it is what it is",
    "standard quality",
    "ok for the price",
    "size 9 delivered",
    "just okay",
    "not bad not good",
    "item arrived today",
    "is this washable?",
    "can I return this?",
    "color is slightly different",
];

const SUFFIX_RANGE: std::ops::RangeInclusive<u32> = 1..=1000;
const MAX_REDRAWS: usize = 16;

/// Counts from one curation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurationReport {
    pub input: usize,
    pub duplicates_removed: usize,
    /// Synthetics beyond the target, dropped from the end of each class.
    pub excess_removed: usize,
    pub negative_added: usize,
    pub neutral_added: usize,
    pub output: usize,
}

/// Keep the first record for every distinct `review_text`, in input order.
pub fn dedup(records: Vec<ReviewRecord>) -> Vec<ReviewRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|r| seen.insert(r.review_text.clone()))
        .collect()
}

fn synthetic_class(record: &ReviewRecord) -> Option<Sentiment> {
    if !record.is_synthetic() {
        return None;
    }
    match record.rating {
        NEGATIVE_SENTINEL => Some(Sentiment::Negative),
        NEUTRAL_SENTINEL => Some(Sentiment::Neutral),
        _ => None,
    }
}

pub struct Curator<R: Rng> {
    rng: R,
    date: NaiveDate,
}

impl<R: Rng> Curator<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            date: Local::now().date_naive(),
        }
    }

    /// Date stamped on generated records.
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    /// Dedup, trim each synthetic class to its first `target_balance_count`
    /// records, then append the shortfall: original order, new Negatives, new
    /// Neutrals.
    pub fn curate(
        &mut self,
        records: Vec<ReviewRecord>,
        target_balance_count: usize,
    ) -> (Vec<ReviewRecord>, CurationReport) {
        let input = records.len();
        let mut corpus = dedup(records);
        let duplicates_removed = input - corpus.len();

        let mut seen_per_class = [0usize; Sentiment::ALL.len()];
        corpus.retain(|r| match synthetic_class(r) {
            Some(class) => {
                seen_per_class[class.index()] += 1;
                seen_per_class[class.index()] <= target_balance_count
            }
            None => true,
        });
        let excess_removed = input - duplicates_removed - corpus.len();

        let existing = |class: Sentiment| corpus.iter().filter(|r| synthetic_class(r) == Some(class)).count();
        let negative_needed = target_balance_count.saturating_sub(existing(Sentiment::Negative));
        let neutral_needed = target_balance_count.saturating_sub(existing(Sentiment::Neutral));

        let mut taken: HashSet<String> = corpus.iter().map(|r| r.review_text.clone()).collect();
        let negatives = self.generate(Sentiment::Negative, negative_needed, &mut taken);
        let neutrals = self.generate(Sentiment::Neutral, neutral_needed, &mut taken);
        corpus.extend(negatives);
        corpus.extend(neutrals);

        let report = CurationReport {
            input,
            duplicates_removed,
            excess_removed,
            negative_added: negative_needed,
            neutral_added: neutral_needed,
            output: corpus.len(),
        };
        info!(
            "💉 Curated corpus: {} in, {} duplicates removed, {} excess synthetics removed, +{} Negative, +{} Neutral, {} out",
            report.input,
            report.duplicates_removed,
            report.excess_removed,
            report.negative_added,
            report.neutral_added,
            report.output
        );
        (corpus, report)
    }

    fn generate(&mut self, class: Sentiment, count: usize, taken: &mut HashSet<String>) -> Vec<ReviewRecord> {
        let (phrases, rating) = match class {
            Sentiment::Negative => (NEGATIVE_PHRASES, NEGATIVE_SENTINEL),
            _ => (NEUTRAL_PHRASES, NEUTRAL_SENTINEL),
        };

        (0..count)
            .map(|i| {
                let text = self.unique_text(phrases, i, taken);
                ReviewRecord {
                    product_name: SYNTHETIC_PRODUCT_NAME.to_string(),
                    review_text: text,
                    rating,
                    review_date: self.date,
                    verified: Verified::System,
                }
            })
            .collect()
    }

    /// Phrase plus random numeric suffix, re-drawn on collision with any text
    /// already in the corpus. After `MAX_REDRAWS` misses a counter suffix is
    /// added, which is unique by construction.
    fn unique_text(&mut self, phrases: &[&str], ordinal: usize, taken: &mut HashSet<String>) -> String {
        let mut phrase = phrases[0];
        for _ in 0..MAX_REDRAWS {
            phrase = phrases.choose(&mut self.rng).copied().unwrap_or(phrases[0]);
            let candidate = format!("{} {}", phrase, self.rng.gen_range(SUFFIX_RANGE));
            if taken.insert(candidate.clone()) {
                return candidate;
            }
        }

        let mut n = ordinal;
        loop {
            let candidate = format!("{} {}-{}", phrase, self.rng.gen_range(SUFFIX_RANGE), n);
            if taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}
