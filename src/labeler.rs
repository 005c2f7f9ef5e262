//! Sentiment labeling.
//!
//! Rules are tried in order; the first one that applies wins. Sentinel ratings
//! written by the curator come first and are trusted as ground truth, the
//! polarity rule always applies and closes the list.

use crate::polarity;
use crate::record::{LabeledRecord, ReviewRecord, Sentiment, NEGATIVE_SENTINEL, NEUTRAL_SENTINEL};
use crate::text;

pub const POSITIVE_THRESHOLD: f64 = 0.1;
pub const NEGATIVE_THRESHOLD: f64 = -0.05;

#[derive(Debug, Clone, PartialEq)]
pub enum LabelRule {
    /// Records carrying `rating` get `sentiment`, whatever their text says.
    SentinelRating { rating: u8, sentiment: Sentiment },
    /// Polarity above `positive_above` is Positive, below `negative_below` is
    /// Negative, anything in between is Neutral.
    Polarity { positive_above: f64, negative_below: f64 },
}

impl LabelRule {
    fn apply(&self, record: &ReviewRecord) -> Option<Sentiment> {
        match *self {
            LabelRule::SentinelRating { rating, sentiment } => (record.rating == rating).then_some(sentiment),
            LabelRule::Polarity {
                positive_above,
                negative_below,
            } => {
                let score = polarity::polarity(&text::clean(&record.review_text));
                Some(if score > positive_above {
                    Sentiment::Positive
                } else if score < negative_below {
                    Sentiment::Negative
                } else {
                    Sentiment::Neutral
                })
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Labeler {
    rules: Vec<LabelRule>,
}

impl Default for Labeler {
    fn default() -> Self {
        Self::new(vec![
            LabelRule::SentinelRating {
                rating: NEGATIVE_SENTINEL,
                sentiment: Sentiment::Negative,
            },
            LabelRule::SentinelRating {
                rating: NEUTRAL_SENTINEL,
                sentiment: Sentiment::Neutral,
            },
            LabelRule::Polarity {
                positive_above: POSITIVE_THRESHOLD,
                negative_below: NEGATIVE_THRESHOLD,
            },
        ])
    }
}

impl Labeler {
    pub fn new(rules: Vec<LabelRule>) -> Self {
        Self { rules }
    }

    /// First matching rule wins; Neutral if no rule applies.
    pub fn label(&self, record: &ReviewRecord) -> Sentiment {
        self.rules
            .iter()
            .find_map(|rule| rule.apply(record))
            .unwrap_or(Sentiment::Neutral)
    }

    pub fn label_all(&self, records: Vec<ReviewRecord>) -> Vec<LabeledRecord> {
        records
            .into_iter()
            .map(|record| LabeledRecord {
                sentiment: self.label(&record),
                record,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Verified;
    use chrono::NaiveDate;

    fn record(rating: u8, text: &str) -> ReviewRecord {
        ReviewRecord {
            product_name: "Test Shoe".to_string(),
            review_text: text.to_string(),
            rating,
            review_date: NaiveDate::from_ymd_opt(2025, 1, 20).unwrap(),
            verified: Verified::Yes,
        }
    }

    #[test]
    fn test_sentinels_override_text() {
        let labeler = Labeler::default();
        assert_eq!(labeler.label(&record(1, "excellent perfect amazing shoes")), Sentiment::Negative);
        assert_eq!(labeler.label(&record(3, "worst terrible fake product")), Sentiment::Neutral);
        assert_eq!(labeler.label(&record(3, "excellent perfect amazing shoes")), Sentiment::Neutral);
    }

    #[test]
    fn test_polarity_fallback() {
        let labeler = Labeler::default();
        assert_eq!(labeler.label(&record(5, "Really good shoes, great fit")), Sentiment::Positive);
        assert_eq!(labeler.label(&record(0, "Terrible quality, sole came off")), Sentiment::Negative);
        assert_eq!(labeler.label(&record(5, "Item arrived today")), Sentiment::Neutral);
    }

    #[test]
    fn test_thresholds_are_asymmetric() {
        // A slightly positive score that does not clear 0.1 stays Neutral.
        let labeler = Labeler::new(vec![LabelRule::Polarity {
            positive_above: POSITIVE_THRESHOLD,
            negative_below: NEGATIVE_THRESHOLD,
        }]);
        assert_eq!(labeler.label(&record(5, "soft sole")), Sentiment::Neutral);
        assert_eq!(labeler.label(&record(5, "loose sole")), Sentiment::Negative);
    }

    #[test]
    fn test_empty_policy_defaults_to_neutral() {
        let labeler = Labeler::new(Vec::new());
        assert_eq!(labeler.label(&record(1, "anything")), Sentiment::Neutral);
    }

    #[test]
    fn test_label_all_preserves_order() {
        let labeled = Labeler::default().label_all(vec![record(1, "a b c d e f g h"), record(3, "i j k l m n o")]);
        assert_eq!(labeled[0].sentiment, Sentiment::Negative);
        assert_eq!(labeled[1].sentiment, Sentiment::Neutral);
        assert_eq!(labeled[1].record.rating, 3);
    }
}
