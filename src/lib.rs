//! Review corpus pipeline: crawl product review pages, curate a balanced
//! corpus, label it, train a sentiment classifier and serve predictions.

pub mod config;
pub mod controller;
pub mod corpus;
pub mod curator;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod labeler;
pub mod polarity;
pub mod record;
pub mod server;
pub mod stealth;
pub mod text;
pub mod training;
