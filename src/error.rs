//! Failure taxonomy for the harvesting pipeline.
//!
//! Only `PersistenceFailure` and `StartupFailure` are fatal. Fetch and
//! extraction failures are absorbed by the crawl loop and logged.

use std::path::PathBuf;
use thiserror::Error;

/// A review page could not be retrieved (navigation error, timeout, HTTP status).
#[derive(Debug, Error)]
#[error("failed to fetch page {page} of '{product}': {reason}")]
pub struct FetchFailure {
    pub product: String,
    pub page: u32,
    pub reason: String,
}

impl FetchFailure {
    pub fn new(product: &str, page: u32, reason: impl ToString) -> Self {
        Self {
            product: product.to_string(),
            page,
            reason: reason.to_string(),
        }
    }
}

/// A single review block was malformed and has been skipped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionFailure {
    #[error("review block {index} has no text")]
    EmptyText { index: usize },

    #[error("review block {index} text is too short ({len} chars)")]
    TooShort { index: usize, len: usize },

    #[error("review block {index} shows {stars} active stars")]
    RatingOutOfRange { index: usize, stars: usize },
}

/// Writing the corpus file failed. Fatal for the current run.
#[derive(Debug, Error)]
pub enum PersistenceFailure {
    #[error("i/o error on corpus file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error on corpus file '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to write artifact '{path}': {reason}")]
    Artifact { path: PathBuf, reason: String },
}

/// Required input is missing or unreadable. The process must not continue.
#[derive(Debug, Error)]
pub enum StartupFailure {
    #[error("corpus file '{0}' not found, run the crawl first")]
    MissingCorpus(PathBuf),

    #[error("corpus file '{path}' is unreadable: {reason}")]
    UnreadableCorpus { path: PathBuf, reason: String },

    #[error("classifier artifact '{0}' not found, run training first")]
    MissingArtifact(PathBuf),

    #[error("classifier artifact '{path}' is unreadable: {reason}")]
    UnreadableArtifact { path: PathBuf, reason: String },
}

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("no labeled records to train on")]
    EmptyCorpus,

    #[error("need at least two sentiment classes, found {0}")]
    SingleClass(usize),

    #[error("no usable features after vectorization")]
    EmptyVocabulary,
}
