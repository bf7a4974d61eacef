//! `spamfilter` is a Naive Bayes spam classifier with a content-addressed
//! training store.
//!
//! Training writes per-message token statistics to a pending store keyed by
//! a content fingerprint; a merge folds them into the aggregate counters,
//! archives the records and remembers their fingerprints so the same
//! content is never counted twice. Scoring uses fixed-point decimal
//! arithmetic, so results are reproducible to the last digit.

pub mod classifier;
pub mod config;
pub mod error;
pub mod extract;
pub mod merge;
pub mod model;
pub mod scoring;
pub mod store;
pub mod tokenizer;

pub use classifier::{Classifier, StatsSummary, TrainOutcome, Verdict};
pub use error::{Result, SpamError};
