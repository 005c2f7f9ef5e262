//! Lexicon-based polarity scoring.
//!
//! Each known word carries a polarity in [-1, 1]. A preceding intensifier
//! scales it, a negation within the two preceding words flips and halves it.
//! The text's polarity is the mean over scored words, 0.0 when none match.

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

static LEXICON: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    vec![
        // positive
        ("good", 0.7), ("great", 0.8), ("excellent", 1.0), ("amazing", 0.6),
        ("wonderful", 1.0), ("fantastic", 0.4), ("superb", 1.0), ("outstanding", 0.5),
        ("brilliant", 0.9), ("love", 0.5), ("loved", 0.7), ("lovely", 0.5),
        ("best", 1.0), ("better", 0.5), ("nice", 0.6), ("happy", 0.8),
        ("beautiful", 0.85), ("perfect", 1.0), ("perfectly", 1.0), ("awesome", 1.0),
        ("comfortable", 0.4), ("comfy", 0.5), ("satisfied", 0.5), ("recommend", 0.3),
        ("recommended", 0.3), ("impressive", 1.0), ("quality", 0.3), ("valuable", 0.5),
        ("worth", 0.3), ("stylish", 0.5), ("durable", 0.4), ("light", 0.2),
        ("lightweight", 0.3), ("genuine", 0.4), ("original", 0.375), ("fine", 0.4),
        ("value", 0.2), ("super", 0.35), ("fast", 0.2), ("smooth", 0.4),
        ("soft", 0.1), ("sturdy", 0.4), ("reliable", 0.4), ("pleased", 0.5),
        // negative
        ("bad", -0.7), ("terrible", -1.0), ("awful", -1.0), ("horrible", -1.0),
        ("poor", -0.4), ("worst", -1.0), ("worse", -0.4), ("hate", -0.8),
        ("disappointing", -0.6), ("disappointed", -0.75), ("useless", -0.5), ("waste", -0.6),
        ("fake", -0.5), ("cheap", -0.2), ("damaged", -0.5), ("broken", -0.4),
        ("wrong", -0.5), ("uncomfortable", -0.5), ("tight", -0.2), ("loose", -0.1),
        ("defective", -0.6), ("rejected", -0.3), ("torn", -0.4), ("pathetic", -1.0),
        ("rubbish", -0.8), ("garbage", -0.8), ("fraud", -0.8), ("scam", -0.8),
        ("overpriced", -0.4), ("worthless", -0.8), ("pain", -0.5), ("painful", -0.7),
        ("hard", -0.3), ("smelly", -0.5), ("faded", -0.3), ("late", -0.3),
        ("small", -0.25), ("average", -0.15), ("mediocre", -0.5), ("dirty", -0.6),
    ]
    .into_iter()
    .collect()
});

static INTENSIFIERS: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    vec![
        ("very", 1.3), ("really", 1.3), ("extremely", 1.5), ("too", 1.2),
        ("so", 1.2), ("totally", 1.4), ("highly", 1.4), ("absolutely", 1.5),
        ("quite", 1.1), ("most", 1.3),
    ]
    .into_iter()
    .collect()
});

static NEGATIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    vec![
        "not", "no", "never", "dont", "didnt", "doesnt", "isnt", "wasnt", "cant",
        "wont", "nothing", "neither", "nor", "hardly",
    ]
    .into_iter()
    .collect()
});

const NEGATION_FACTOR: f64 = -0.5;
const NEGATION_WINDOW: usize = 2;

/// Mean polarity in [-1, 1] of already cleaned text (lowercase, letters and
/// whitespace only).
pub fn polarity(clean_text: &str) -> f64 {
    let words: Vec<&str> = clean_text.split_whitespace().collect();
    let mut scores = Vec::new();

    for (i, word) in words.iter().enumerate() {
        let Some(&base) = LEXICON.get(word) else {
            continue;
        };

        let mut score = base;
        if i > 0 {
            if let Some(&factor) = INTENSIFIERS.get(words[i - 1]) {
                score *= factor;
            }
        }
        let start = i.saturating_sub(NEGATION_WINDOW);
        if words[start..i].iter().any(|w| NEGATIONS.contains(w)) {
            score *= NEGATION_FACTOR;
        }
        scores.push(score.clamp(-1.0, 1.0));
    }

    if scores.is_empty() {
        0.0
    } else {
        (scores.iter().sum::<f64>() / scores.len() as f64).clamp(-1.0, 1.0)
    }
}
