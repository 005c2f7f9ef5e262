//! On-disk review corpus.
//!
//! A CSV file with columns `Product Name, Review Text, Review Rating,
//! Review Date, Reviewer Verified`. The crawl appends one batch per product;
//! curation rewrites the whole file through a temporary sibling.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{PersistenceFailure, StartupFailure};
use crate::record::ReviewRecord;

#[derive(Debug, Clone)]
pub struct CorpusStore {
    path: PathBuf,
}

impl CorpusStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Append a batch. The header is written only when the file is new or empty.
    /// An empty batch leaves the file untouched.
    pub fn append(&self, records: &[ReviewRecord]) -> Result<usize, PersistenceFailure> {
        if records.is_empty() {
            return Ok(0);
        }

        let needs_header = fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_failure(e))?;

        let mut writer = csv::WriterBuilder::new().has_headers(needs_header).from_writer(file);
        for record in records {
            writer.serialize(record).map_err(|e| self.csv_failure(e))?;
        }
        writer.flush().map_err(|e| self.io_failure(e))?;

        debug!("Appended {} records to {}", records.len(), self.path.display());
        Ok(records.len())
    }

    /// Read the whole corpus in file order.
    pub fn load(&self) -> Result<Vec<ReviewRecord>, StartupFailure> {
        if !self.path.exists() {
            return Err(StartupFailure::MissingCorpus(self.path.clone()));
        }

        let unreadable = |reason: String| StartupFailure::UnreadableCorpus {
            path: self.path.clone(),
            reason,
        };

        let mut reader = csv::Reader::from_path(&self.path).map_err(|e| unreadable(e.to_string()))?;
        reader
            .deserialize()
            .collect::<Result<Vec<ReviewRecord>, _>>()
            .map_err(|e| unreadable(e.to_string()))
    }

    /// Replace the corpus wholesale. The new content is written to a temporary
    /// file first so a failed rewrite never leaves a truncated corpus behind.
    pub fn rewrite(&self, records: &[ReviewRecord]) -> Result<(), PersistenceFailure> {
        self.rewrite_with(|writer| {
            for record in records {
                writer.serialize(record).map_err(|e| self.csv_failure(e))?;
            }
            Ok(())
        })
    }

    /// Temp file, `write`, sync, rename. On any failure the temp file is removed
    /// and the corpus is left as it was.
    fn rewrite_with<F>(&self, write: F) -> Result<(), PersistenceFailure>
    where
        F: FnOnce(&mut csv::Writer<fs::File>) -> Result<(), PersistenceFailure>,
    {
        let tmp_path = self.tmp_path();
        let result = self
            .write_tmp(&tmp_path, write)
            .and_then(|()| fs::rename(&tmp_path, &self.path).map_err(|e| self.io_failure(e)));

        if result.is_err() && tmp_path.is_file() {
            if let Err(e) = fs::remove_file(&tmp_path) {
                warn!("Could not remove {}: {}", tmp_path.display(), e);
            }
        }
        result
    }

    fn write_tmp<F>(&self, tmp_path: &Path, write: F) -> Result<(), PersistenceFailure>
    where
        F: FnOnce(&mut csv::Writer<fs::File>) -> Result<(), PersistenceFailure>,
    {
        let file = fs::File::create(tmp_path).map_err(|e| self.io_failure(e))?;
        let mut writer = csv::Writer::from_writer(file);
        write(&mut writer)?;
        writer.flush().map_err(|e| self.io_failure(e))?;
        let file = writer
            .into_inner()
            .map_err(|e| self.io_failure(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))?;
        file.sync_all().map_err(|e| self.io_failure(e))
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "corpus.csv".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_failure(&self, source: std::io::Error) -> PersistenceFailure {
        PersistenceFailure::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn csv_failure(&self, source: csv::Error) -> PersistenceFailure {
        PersistenceFailure::Csv {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Verified;
    use chrono::NaiveDate;

    fn record(text: &str, rating: u8) -> ReviewRecord {
        ReviewRecord {
            product_name: "Asian Blue Running Shoes".to_string(),
            review_text: text.to_string(),
            rating,
            review_date: NaiveDate::from_ymd_opt(2025, 1, 20).unwrap(),
            verified: Verified::Yes,
        }
    }

    #[test]
    fn test_append_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = CorpusStore::new(dir.path().join("reviews.csv"));

        store.append(&[record("first batch review", 5)]).unwrap();
        store.append(&[record("second batch, with comma", 4), record("third one here", 0)]).unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        assert_eq!(content.matches("Product Name").count(), 1);
        assert!(content.starts_with("Product Name,Review Text,Review Rating,Review Date,Reviewer Verified"));

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[1].review_text, "second batch, with comma");
        assert_eq!(loaded[2].rating, 0);
    }

    #[test]
    fn test_empty_append_does_not_create_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = CorpusStore::new(dir.path().join("reviews.csv"));
        assert_eq!(store.append(&[]).unwrap(), 0);
        assert!(!store.exists());
    }

    #[test]
    fn test_load_missing_corpus_is_startup_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = CorpusStore::new(dir.path().join("missing.csv"));
        assert!(matches!(store.load(), Err(StartupFailure::MissingCorpus(_))));
    }

    #[test]
    fn test_rewrite_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = CorpusStore::new(dir.path().join("reviews.csv"));
        store.append(&[record("old review text", 5), record("another old one", 5)]).unwrap();

        let mut synthetic = record("waste of money 42", 1);
        synthetic.verified = Verified::System;
        store.rewrite(&[record("old review text", 5), synthetic.clone()]).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1], synthetic);
        assert!(!store.tmp_path().exists());

        // appending after a rewrite keeps a single header
        store.append(&[record("post curation review", 5)]).unwrap();
        let content = fs::read_to_string(store.path()).unwrap();
        assert_eq!(content.matches("Review Text").count(), 1);
    }

    #[test]
    fn test_failed_rewrite_keeps_corpus_and_removes_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let store = CorpusStore::new(dir.path().join("reviews.csv"));
        store.append(&[record("flushed before curation", 5), record("second flushed review", 4)]).unwrap();
        let before = fs::read_to_string(store.path()).unwrap();

        let result = store.rewrite_with(|writer| {
            writer.serialize(record("half written replacement", 1)).unwrap();
            Err(store.io_failure(std::io::Error::new(std::io::ErrorKind::Other, "disk full")))
        });

        assert!(matches!(result, Err(PersistenceFailure::Io { .. })));
        assert!(!store.tmp_path().exists());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), before);
        assert_eq!(store.load().unwrap().len(), 2);
    }

    #[test]
    fn test_rewrite_fails_cleanly_when_tmp_cannot_be_created() {
        let dir = tempfile::tempdir().unwrap();
        let store = CorpusStore::new(dir.path().join("reviews.csv"));
        store.append(&[record("flushed before curation", 5)]).unwrap();
        fs::create_dir(store.tmp_path()).unwrap();

        assert!(store.rewrite(&[record("replacement review", 5)]).is_err());
        assert_eq!(store.load().unwrap()[0].review_text, "flushed before curation");
    }

    #[test]
    fn test_reads_pandas_style_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reviews.csv");
        fs::write(
            &path,
            "Product Name,Review Text,Review Rating,Review Date,Reviewer Verified\n\
             Synthetic Data,bad quality 17,1,2025-01-21,System\n",
        )
        .unwrap();

        let loaded = CorpusStore::new(path).load().unwrap();
        assert_eq!(loaded[0].verified, Verified::System);
        assert!(loaded[0].is_synthetic());
    }
}
