//! Training adapter: turns labeled reviews into a `ClassifierArtifact`.
//!
//! Features are TF-IDF weighted unigrams and bigrams; the model is a
//! multinomial logistic regression with balanced class weights, fitted by
//! full-batch gradient descent. The artifact is two JSON blobs, vectorizer
//! and model, always loaded together.

use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{PersistenceFailure, StartupFailure, TrainingError};
use crate::record::{LabeledRecord, Sentiment};
use crate::text;

const NUM_CLASSES: usize = Sentiment::ALL.len();

/// Sorted `(feature index, value)` pairs.
pub type SparseVector = Vec<(usize, f64)>;

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "about", "above", "after", "again", "all", "am", "an", "and", "any", "are", "as", "at",
        "be", "because", "been", "before", "being", "below", "between", "both", "but", "by", "could",
        "did", "do", "does", "doing", "down", "during", "each", "few", "for", "from", "further", "had",
        "has", "have", "having", "he", "her", "here", "hers", "herself", "him", "himself", "his", "how",
        "i", "if", "in", "into", "is", "it", "its", "itself", "me", "more", "my", "myself", "of",
        "off", "on", "once", "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own",
        "same", "she", "should", "some", "such", "than", "that", "the", "their", "theirs", "them",
        "themselves", "then", "there", "these", "they", "this", "those", "through", "to", "under",
        "until", "up", "us", "was", "we", "were", "what", "when", "where", "which", "while", "who",
        "whom", "why", "will", "with", "would", "you", "your", "yours", "yourself", "yourselves",
    ]
    .into_iter()
    .collect()
});

// ============================================================================
// Vectorizer
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
}

/// Unigrams and bigrams of cleaned text, stop words and 1-letter tokens removed.
fn terms(clean_text: &str) -> Vec<String> {
    let tokens: Vec<&str> = clean_text
        .split_whitespace()
        .filter(|t| t.len() > 1 && !STOP_WORDS.contains(t))
        .collect();

    let mut terms: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
    terms.extend(tokens.windows(2).map(|pair| format!("{} {}", pair[0], pair[1])));
    terms
}

impl TfidfVectorizer {
    /// Keep the `max_features` most frequent terms across `docs`.
    pub fn fit(docs: &[String], max_features: usize) -> Result<Self, TrainingError> {
        let mut totals: HashMap<String, usize> = HashMap::new();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for doc in docs {
            let doc_terms = terms(doc);
            let mut seen = HashSet::new();
            for term in doc_terms {
                *totals.entry(term.clone()).or_default() += 1;
                if seen.insert(term.clone()) {
                    *doc_freq.entry(term).or_default() += 1;
                }
            }
        }

        if totals.is_empty() {
            return Err(TrainingError::EmptyVocabulary);
        }

        let mut ranked: Vec<(String, usize)> = totals.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(max_features);

        let mut kept: Vec<String> = ranked.into_iter().map(|(term, _)| term).collect();
        kept.sort();

        let n = docs.len() as f64;
        let idf = kept
            .iter()
            .map(|term| {
                let df = doc_freq.get(term).copied().unwrap_or(0) as f64;
                ((1.0 + n) / (1.0 + df)).ln() + 1.0
            })
            .collect();
        let vocabulary = kept.into_iter().enumerate().map(|(i, term)| (term, i)).collect();

        Ok(Self { vocabulary, idf })
    }

    pub fn len(&self) -> usize {
        self.idf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.idf.is_empty()
    }

    /// L2-normalised TF-IDF vector of already cleaned text.
    pub fn transform(&self, clean_text: &str) -> SparseVector {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for term in terms(clean_text) {
            if let Some(&index) = self.vocabulary.get(&term) {
                *counts.entry(index).or_default() += 1.0;
            }
        }

        let mut vector: SparseVector = counts
            .into_iter()
            .map(|(index, tf)| (index, tf * self.idf[index]))
            .collect();
        vector.sort_by_key(|(index, _)| *index);

        let norm = vector.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, v) in vector.iter_mut() {
                *v /= norm;
            }
        }
        vector
    }
}

// ============================================================================
// Model
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct RegressionParams {
    /// Inverse regularisation strength.
    pub c: f64,
    pub max_iter: usize,
    pub learning_rate: f64,
    /// Stop once the largest gradient component falls below this.
    pub tolerance: f64,
    pub balanced_class_weight: bool,
}

impl Default for RegressionParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            learning_rate: 1.0,
            tolerance: 1e-4,
            balanced_class_weight: true,
        }
    }
}

/// Multinomial logistic regression over the three sentiment classes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftmaxRegression {
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
}

fn softmax(logits: [f64; NUM_CLASSES]) -> [f64; NUM_CLASSES] {
    let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let mut out = logits.map(|z| (z - max).exp());
    let sum: f64 = out.iter().sum();
    for p in out.iter_mut() {
        *p /= sum;
    }
    out
}

impl SoftmaxRegression {
    pub fn fit(x: &[SparseVector], y: &[Sentiment], n_features: usize, params: RegressionParams) -> Self {
        let mut model = Self {
            weights: vec![vec![0.0; n_features]; NUM_CLASSES],
            bias: vec![0.0; NUM_CLASSES],
        };
        if x.is_empty() {
            return model;
        }

        let sample_weights = sample_weights(y, params.balanced_class_weight);
        let total_weight: f64 = sample_weights.iter().sum();
        let l2 = 1.0 / (params.c * total_weight);

        for iteration in 0..params.max_iter {
            let mut grad_w = vec![vec![0.0; n_features]; NUM_CLASSES];
            let mut grad_b = [0.0; NUM_CLASSES];

            for ((features, label), sw) in x.iter().zip(y).zip(&sample_weights) {
                let probs = model.predict_proba(features);
                for class in 0..NUM_CLASSES {
                    let target = if class == label.index() { 1.0 } else { 0.0 };
                    let g = sw * (probs[class] - target) / total_weight;
                    grad_b[class] += g;
                    for &(j, v) in features {
                        grad_w[class][j] += g * v;
                    }
                }
            }

            let mut max_grad: f64 = 0.0;
            for class in 0..NUM_CLASSES {
                for j in 0..n_features {
                    let g = grad_w[class][j] + l2 * model.weights[class][j];
                    max_grad = max_grad.max(g.abs());
                    model.weights[class][j] -= params.learning_rate * g;
                }
                max_grad = max_grad.max(grad_b[class].abs());
                model.bias[class] -= params.learning_rate * grad_b[class];
            }

            if max_grad < params.tolerance {
                debug!("Converged after {} iterations", iteration + 1);
                break;
            }
        }

        model
    }

    /// Posterior probability per class, indexed by `Sentiment::index`.
    pub fn predict_proba(&self, features: &SparseVector) -> [f64; NUM_CLASSES] {
        let mut logits = [0.0; NUM_CLASSES];
        for (class, logit) in logits.iter_mut().enumerate() {
            *logit = self.bias[class]
                + features
                    .iter()
                    .map(|&(j, v)| self.weights[class].get(j).copied().unwrap_or(0.0) * v)
                    .sum::<f64>();
        }
        softmax(logits)
    }

    pub fn predict(&self, features: &SparseVector) -> Sentiment {
        argmax(&self.predict_proba(features)).0
    }

    fn n_features(&self) -> usize {
        self.weights.first().map(Vec::len).unwrap_or(0)
    }
}

/// `n / (classes_present * n_class)` per sample when balanced, 1.0 otherwise.
fn sample_weights(y: &[Sentiment], balanced: bool) -> Vec<f64> {
    if !balanced {
        return vec![1.0; y.len()];
    }
    let counts = class_counts(y);
    let present = counts.iter().filter(|c| **c > 0).count() as f64;
    let n = y.len() as f64;
    y.iter()
        .map(|label| n / (present * counts[label.index()] as f64))
        .collect()
}

fn class_counts(y: &[Sentiment]) -> [usize; NUM_CLASSES] {
    let mut counts = [0; NUM_CLASSES];
    for label in y {
        counts[label.index()] += 1;
    }
    counts
}

fn argmax(probs: &[f64; NUM_CLASSES]) -> (Sentiment, f64) {
    let (index, p) = probs
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, p)| if p > best.1 { (i, p) } else { best });
    (Sentiment::from_index(index).unwrap_or(Sentiment::Neutral), p)
}

// ============================================================================
// Split & evaluation
// ============================================================================

/// Per-class shuffled split; classes with a single record stay in training.
pub fn stratified_split(labels: &[Sentiment], test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for class in Sentiment::ALL {
        let mut members: Vec<usize> = (0..labels.len()).filter(|&i| labels[i] == class).collect();
        members.shuffle(&mut rng);
        let n_test = if members.len() < 2 {
            0
        } else {
            ((members.len() as f64 * test_fraction).round() as usize).clamp(1, members.len() - 1)
        };
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    (train, test)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassMetrics {
    pub sentiment: Sentiment,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Held-out evaluation. Advisory only; not part of the serving contract.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    pub accuracy: f64,
    pub classes: Vec<ClassMetrics>,
    pub test_size: usize,
}

impl EvaluationReport {
    pub fn compute(truth: &[Sentiment], predicted: &[Sentiment]) -> Self {
        let test_size = truth.len();
        let correct = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
        let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };

        let classes = Sentiment::ALL
            .iter()
            .map(|&class| {
                let tp = truth.iter().zip(predicted).filter(|(t, p)| **t == class && **p == class).count();
                let predicted_pos = predicted.iter().filter(|p| **p == class).count();
                let support = truth.iter().filter(|t| **t == class).count();
                let precision = ratio(tp, predicted_pos);
                let recall = ratio(tp, support);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics {
                    sentiment: class,
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect();

        Self {
            accuracy: ratio(correct, test_size),
            classes,
            test_size,
        }
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Accuracy: {:.2} ({} held out)", self.accuracy, self.test_size)?;
        writeln!(f, "{:>10} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        for m in &self.classes {
            writeln!(
                f,
                "{:>10} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                m.sentiment.as_str(),
                m.precision,
                m.recall,
                m.f1,
                m.support
            )?;
        }
        Ok(())
    }
}

// ============================================================================
// Artifact
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub sentiment: Sentiment,
    /// Maximum posterior class probability, in [0, 1].
    pub confidence: f64,
}

/// Vectorizer and model, produced together by one training run and immutable afterwards.
#[derive(Debug, Clone)]
pub struct ClassifierArtifact {
    vectorizer: TfidfVectorizer,
    model: SoftmaxRegression,
}

impl ClassifierArtifact {
    pub fn predict(&self, text: &str) -> Prediction {
        let features = self.vectorizer.transform(&text::clean(text));
        let (sentiment, confidence) = argmax(&self.model.predict_proba(&features));
        Prediction {
            sentiment,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn save(&self, vectorizer_path: &Path, model_path: &Path) -> Result<(), PersistenceFailure> {
        write_json(vectorizer_path, &self.vectorizer)?;
        write_json(model_path, &self.model)
    }

    /// Both blobs must exist; a missing one fails before anything is parsed.
    pub fn load(vectorizer_path: &Path, model_path: &Path) -> Result<Self, StartupFailure> {
        for path in [vectorizer_path, model_path] {
            if !path.exists() {
                return Err(StartupFailure::MissingArtifact(path.to_path_buf()));
            }
        }

        let vectorizer: TfidfVectorizer = read_json(vectorizer_path)?;
        let model: SoftmaxRegression = read_json(model_path)?;
        if model.n_features() != vectorizer.len() {
            return Err(StartupFailure::UnreadableArtifact {
                path: model_path.to_path_buf(),
                reason: format!(
                    "model expects {} features, vectorizer produces {}",
                    model.n_features(),
                    vectorizer.len()
                ),
            });
        }

        Ok(Self { vectorizer, model })
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistenceFailure> {
    let failure = |reason: String| PersistenceFailure::Artifact {
        path: path.to_path_buf(),
        reason,
    };
    let bytes = serde_json::to_vec(value).map_err(|e| failure(e.to_string()))?;

    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    std::fs::write(&tmp, bytes).map_err(|e| failure(e.to_string()))?;
    std::fs::rename(&tmp, path).map_err(|e| failure(e.to_string()))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StartupFailure> {
    let unreadable = |reason: String| StartupFailure::UnreadableArtifact {
        path: path.to_path_buf(),
        reason,
    };
    let bytes = std::fs::read(path).map_err(|e| unreadable(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| unreadable(e.to_string()))
}

// ============================================================================
// Training run
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct TrainingParams {
    pub max_features: usize,
    pub test_fraction: f64,
    pub seed: u64,
    pub regression: RegressionParams,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            max_features: 2000,
            test_fraction: 0.2,
            seed: 42,
            regression: RegressionParams::default(),
        }
    }
}

pub struct TrainingOutcome {
    pub artifact: ClassifierArtifact,
    pub report: EvaluationReport,
    /// Records per class, indexed by `Sentiment::index`.
    pub class_counts: [usize; NUM_CLASSES],
}

pub fn train(labeled: &[LabeledRecord], params: TrainingParams) -> Result<TrainingOutcome, TrainingError> {
    if labeled.is_empty() {
        return Err(TrainingError::EmptyCorpus);
    }

    let labels: Vec<Sentiment> = labeled.iter().map(|l| l.sentiment).collect();
    let class_counts = class_counts(&labels);
    let present = class_counts.iter().filter(|c| **c > 0).count();
    if present < 2 {
        return Err(TrainingError::SingleClass(present));
    }

    info!("--- Class Balance ---");
    for class in Sentiment::ALL {
        info!("{:>10}: {}", class.as_str(), class_counts[class.index()]);
    }

    let docs: Vec<String> = labeled.iter().map(|l| text::clean(&l.record.review_text)).collect();
    let vectorizer = TfidfVectorizer::fit(&docs, params.max_features)?;
    let features: Vec<SparseVector> = docs.iter().map(|d| vectorizer.transform(d)).collect();

    let (train_idx, test_idx) = stratified_split(&labels, params.test_fraction, params.seed);
    let pick_x = |idx: &[usize]| idx.iter().map(|&i| features[i].clone()).collect::<Vec<_>>();
    let pick_y = |idx: &[usize]| idx.iter().map(|&i| labels[i]).collect::<Vec<_>>();

    info!(
        "🧠 Training on {} records ({} features), holding out {}...",
        train_idx.len(),
        vectorizer.len(),
        test_idx.len()
    );
    let model = SoftmaxRegression::fit(&pick_x(&train_idx), &pick_y(&train_idx), vectorizer.len(), params.regression);

    let test_x = pick_x(&test_idx);
    let predicted: Vec<Sentiment> = test_x.iter().map(|x| model.predict(x)).collect();
    let report = EvaluationReport::compute(&pick_y(&test_idx), &predicted);
    info!("📊 Model Performance:\n{}", report);

    Ok(TrainingOutcome {
        artifact: ClassifierArtifact { vectorizer, model },
        report,
        class_counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ReviewRecord, Verified};
    use chrono::NaiveDate;

    fn labeled(text: &str, sentiment: Sentiment) -> LabeledRecord {
        LabeledRecord {
            record: ReviewRecord {
                product_name: "Test".to_string(),
                review_text: text.to_string(),
                rating: 5,
                review_date: NaiveDate::from_ymd_opt(2025, 1, 20).unwrap(),
                verified: Verified::Yes,
            },
            sentiment,
        }
    }

    fn toy_corpus() -> Vec<LabeledRecord> {
        let mut out = Vec::new();
        for i in 0..30 {
            out.push(labeled(&format!("great comfortable lovely fit {}", i), Sentiment::Positive));
            out.push(labeled(&format!("terrible fake broken sole {}", i), Sentiment::Negative));
            out.push(labeled(&format!("package delivered arrived today {}", i), Sentiment::Neutral));
        }
        out
    }

    #[test]
    fn test_terms_include_bigrams_without_stop_words() {
        let t = terms("the shoes are very comfortable");
        assert_eq!(t, vec!["shoes", "very", "comfortable", "shoes very", "very comfortable"]);
    }

    #[test]
    fn test_vectorizer_limits_features_and_normalises() {
        let docs = vec!["good shoes".to_string(), "good sole".to_string(), "bad sole".to_string()];
        let vectorizer = TfidfVectorizer::fit(&docs, 3).unwrap();
        assert_eq!(vectorizer.len(), 3);

        let v = vectorizer.transform("good sole");
        let norm: f64 = v.iter().map(|(_, x)| x * x).sum();
        assert!((norm - 1.0).abs() < 1e-9);
        assert!(vectorizer.transform("nothing known here").is_empty());
    }

    #[test]
    fn test_empty_vocabulary_is_error() {
        let docs = vec!["a".to_string(), "the".to_string()];
        assert!(matches!(TfidfVectorizer::fit(&docs, 10), Err(TrainingError::EmptyVocabulary)));
    }

    #[test]
    fn test_stratified_split_keeps_every_class() {
        let mut labels = vec![Sentiment::Positive; 50];
        labels.extend(vec![Sentiment::Negative; 10]);
        labels.push(Sentiment::Neutral);

        let (train, test) = stratified_split(&labels, 0.2, 42);
        assert_eq!(train.len() + test.len(), labels.len());
        assert_eq!(test.iter().filter(|&&i| labels[i] == Sentiment::Positive).count(), 10);
        assert_eq!(test.iter().filter(|&&i| labels[i] == Sentiment::Negative).count(), 2);
        assert!(train.iter().any(|&i| labels[i] == Sentiment::Neutral));
        assert_eq!(stratified_split(&labels, 0.2, 42), (train, test));
    }

    #[test]
    fn test_train_and_predict() {
        let outcome = train(&toy_corpus(), TrainingParams::default()).unwrap();
        assert_eq!(outcome.class_counts, [30, 30, 30]);
        assert_eq!(outcome.report.test_size, 18);
        assert!(outcome.report.accuracy > 0.9);

        let p = outcome.artifact.predict("Great, comfortable fit!");
        assert_eq!(p.sentiment, Sentiment::Positive);
        assert!(p.confidence > 1.0 / 3.0 && p.confidence <= 1.0);

        assert_eq!(outcome.artifact.predict("fake and broken").sentiment, Sentiment::Negative);
        assert_eq!(outcome.artifact.predict("package arrived today").sentiment, Sentiment::Neutral);
    }

    #[test]
    fn test_single_class_is_rejected() {
        let corpus: Vec<_> = (0..5).map(|i| labeled(&format!("good shoes {}", i), Sentiment::Positive)).collect();
        assert!(matches!(train(&corpus, TrainingParams::default()), Err(TrainingError::SingleClass(1))));
        assert!(matches!(train(&[], TrainingParams::default()), Err(TrainingError::EmptyCorpus)));
    }

    #[test]
    fn test_artifact_roundtrip_and_missing_blob() {
        let dir = tempfile::tempdir().unwrap();
        let vec_path = dir.path().join("vectorizer.json");
        let model_path = dir.path().join("model.json");

        let outcome = train(&toy_corpus(), TrainingParams::default()).unwrap();
        outcome.artifact.save(&vec_path, &model_path).unwrap();

        let loaded = ClassifierArtifact::load(&vec_path, &model_path).unwrap();
        let (before, after) = (outcome.artifact.predict("terrible sole"), loaded.predict("terrible sole"));
        assert_eq!(after.sentiment, before.sentiment);
        assert!((after.confidence - before.confidence).abs() < 1e-9);

        std::fs::remove_file(&model_path).unwrap();
        assert!(matches!(
            ClassifierArtifact::load(&vec_path, &model_path),
            Err(StartupFailure::MissingArtifact(p)) if p == model_path
        ));
    }

    #[test]
    fn test_evaluation_report_metrics() {
        use Sentiment::*;
        let truth = [Positive, Positive, Negative, Neutral];
        let predicted = [Positive, Negative, Negative, Neutral];
        let report = EvaluationReport::compute(&truth, &predicted);

        assert_eq!(report.accuracy, 0.75);
        let negative = &report.classes[Negative.index()];
        assert_eq!(negative.precision, 0.5);
        assert_eq!(negative.recall, 1.0);
        let positive = &report.classes[Positive.index()];
        assert_eq!(positive.recall, 0.5);
        assert_eq!(positive.support, 2);
    }
}
