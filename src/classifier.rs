//! The classifier facade: training, scoring and the aggregate lifecycle.
//!
//! A [`Classifier`] is `Send + Sync` and meant to be shared through an
//! `Arc`. Scoring holds the aggregate read lock for the whole computation;
//! the merge engine takes the write lock only to fold one message at a time.

use std::fmt;
use std::path::PathBuf;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::Result;
use crate::merge::{MergeEngine, MergeReport};
use crate::model::{AggregateStats, Fingerprint, Label, PendingRecord};
use crate::scoring::{self, Probability};
use crate::store::fs::{FsMessageStore, FsStatsStore};
use crate::store::{self, MessageStore, StatsStore};
use crate::tokenizer::{Delimiter, Tokenizer};

/// Probability at or above which a message is reported as spam.
pub const DEFAULT_SPAM_THRESHOLD: f64 = 0.5;

/// Result of [`Classifier::train`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrainOutcome {
    /// The content was merged before; nothing was written.
    AlreadyProcessed(Fingerprint),
    /// A pending record was written and awaits a merge.
    Pending(Fingerprint),
    /// A pending record was written and a merge ran right away.
    Merged {
        fingerprint: Fingerprint,
        report: MergeReport,
    },
}

impl TrainOutcome {
    pub fn fingerprint(&self) -> &Fingerprint {
        match self {
            Self::AlreadyProcessed(fp) | Self::Pending(fp) => fp,
            Self::Merged { fingerprint, .. } => fingerprint,
        }
    }

    pub fn was_skipped(&self) -> bool {
        matches!(self, Self::AlreadyProcessed(_))
    }
}

/// A scored message together with the decision taken from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub is_spam: bool,
    pub probability: f64,
    #[serde(skip)]
    micros: u32,
}

impl Verdict {
    fn new(probability: &Probability, threshold: f64) -> Self {
        Self {
            is_spam: probability.value() >= threshold,
            probability: probability.value(),
            micros: probability.micros(),
        }
    }

    /// Confidence in the reported class, as a whole percentage rounded
    /// half-up.
    pub fn confidence_percent(&self) -> u32 {
        let micros = if self.is_spam {
            self.micros
        } else {
            1_000_000 - self.micros.min(1_000_000)
        };
        (micros + 5_000) / 10_000
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = if self.is_spam { "SPAM" } else { "NOT SPAM" };
        write!(f, "{label} ({}%)", self.confidence_percent())
    }
}

/// Aggregate and store counters for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsSummary {
    pub total_spam_messages: u64,
    pub total_ham_messages: u64,
    pub total_spam_tokens: u64,
    pub total_ham_tokens: u64,
    pub spam_vocabulary: usize,
    pub ham_vocabulary: usize,
    pub stop_words: usize,
    pub pending_spam: usize,
    pub pending_ham: usize,
}

/// Naive Bayes spam classifier over a message store and a stats store.
pub struct Classifier<M = FsMessageStore, S = FsStatsStore> {
    state: RwLock<AggregateStats>,
    merge_lock: Mutex<()>,
    messages: M,
    stats_store: S,
    delimiter: Delimiter,
    spam_threshold: f64,
}

impl Classifier {
    /// Open file-backed stores under the two roots and load the aggregate.
    pub fn open(messages_root: impl Into<PathBuf>, stats_root: impl Into<PathBuf>) -> Result<Self> {
        let stats_root = stats_root.into();
        let messages = FsMessageStore::open(messages_root, stats_root.clone())?;
        Ok(Self::new(messages, FsStatsStore::new(stats_root)))
    }

    /// Open the directories named by `config` and apply its tokenizer and
    /// classifier settings.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::open(config.messages_dir(), config.stats_dir())?
            .with_delimiter(Delimiter::from_config(config.tokenizer.delimiter.as_deref()))
            .with_spam_threshold(config.classifier.spam_threshold))
    }
}

impl<M: MessageStore, S: StatsStore> Classifier<M, S> {
    /// Build a classifier and load the persisted aggregate.
    pub fn new(messages: M, stats_store: S) -> Self {
        let stats = stats_store.load();
        debug!(
            spam = stats.total_spam_messages,
            ham = stats.total_ham_messages,
            stop_words = stats.stop_words.len(),
            "Classifier ready"
        );
        Self {
            state: RwLock::new(stats),
            merge_lock: Mutex::new(()),
            messages,
            stats_store,
            delimiter: Delimiter::default(),
            spam_threshold: DEFAULT_SPAM_THRESHOLD,
        }
    }

    pub fn with_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_spam_threshold(mut self, threshold: f64) -> Self {
        self.spam_threshold = threshold;
        self
    }

    pub fn messages(&self) -> &M {
        &self.messages
    }

    pub fn stats_store(&self) -> &S {
        &self.stats_store
    }

    /// Record `text` as a spam or ham example.
    ///
    /// Content already in the processed log is ignored. Otherwise a pending
    /// record is written; with `commit_now` a merge runs before returning.
    pub fn train(&self, text: &str, is_spam: bool, commit_now: bool) -> Result<TrainOutcome> {
        let label = Label::from_is_spam(is_spam);
        let fingerprint = store::fingerprint(text);
        if self.messages.is_processed(&fingerprint) {
            debug!(fingerprint = %fingerprint, "Already processed, skipping");
            return Ok(TrainOutcome::AlreadyProcessed(fingerprint));
        }

        let (token_counts, total_tokens) = {
            let stats = self.state.read();
            Tokenizer::new(text, &stats.stop_words)
                .with_delimiter(&self.delimiter)
                .counts()
        };
        let record = PendingRecord::new(fingerprint.clone(), token_counts, total_tokens);
        self.messages.write_pending(&record, label)?;

        if commit_now {
            let report = self.merge_stats()?;
            Ok(TrainOutcome::Merged {
                fingerprint,
                report,
            })
        } else {
            Ok(TrainOutcome::Pending(fingerprint))
        }
    }

    /// Exact spam probability of `text`.
    pub fn probability(&self, text: &str) -> Result<Probability> {
        let stats = self.state.read();
        let tokens = Tokenizer::new(text, &stats.stop_words)
            .with_delimiter(&self.delimiter)
            .tokens();
        scoring::spam_probability(&stats, tokens)
    }

    /// Spam probability of `text` in `[0, 1]`.
    pub fn score(&self, text: &str) -> Result<f64> {
        self.probability(text).map(|p| p.value())
    }

    pub fn classify(&self, text: &str) -> Result<Verdict> {
        let probability = self.probability(text)?;
        Ok(Verdict::new(&probability, self.spam_threshold))
    }

    /// Fold every completed pending record into the aggregate.
    pub fn merge_stats(&self) -> Result<MergeReport> {
        self.merge_stats_with_progress(None)
    }

    pub fn merge_stats_with_progress(
        &self,
        progress: Option<&dyn Fn(u64, u64)>,
    ) -> Result<MergeReport> {
        MergeEngine::new(
            &self.messages,
            &self.stats_store,
            &self.state,
            &self.merge_lock,
        )
        .run(progress)
    }

    /// Replace the in-memory aggregate with the persisted one.
    pub fn load_stats(&self) {
        let _guard = self.merge_lock.lock();
        let stats = self.stats_store.load();
        *self.state.write() = stats;
        info!("Reloaded statistics");
    }

    pub fn save_stats(&self) -> Result<()> {
        let _guard = self.merge_lock.lock();
        self.stats_store.save(&self.state.read())?;
        info!("Saved statistics");
        Ok(())
    }

    /// Reset the in-memory aggregate to zero counters and the built-in stop
    /// words. Persisted files are untouched until [`Self::save_stats`].
    pub fn clear_stats(&self) {
        let _guard = self.merge_lock.lock();
        *self.state.write() = AggregateStats::default();
        info!("Cleared statistics");
    }

    /// Copy of the current aggregate.
    pub fn snapshot(&self) -> AggregateStats {
        self.state.read().clone()
    }

    pub fn summary(&self) -> Result<StatsSummary> {
        let pending_spam = self.messages.pending_count(Label::Spam)?;
        let pending_ham = self.messages.pending_count(Label::Ham)?;
        let stats = self.state.read();
        Ok(StatsSummary {
            total_spam_messages: stats.message_count(Label::Spam),
            total_ham_messages: stats.message_count(Label::Ham),
            total_spam_tokens: stats.token_total(Label::Spam),
            total_ham_tokens: stats.token_total(Label::Ham),
            spam_vocabulary: stats.token_counts(Label::Spam).len(),
            ham_vocabulary: stats.token_counts(Label::Ham).len(),
            stop_words: stats.stop_words.len(),
            pending_spam,
            pending_ham,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SpamError;
    use crate::store::memory::{MemMessageStore, MemStatsStore};

    fn classifier() -> Classifier<MemMessageStore, MemStatsStore> {
        Classifier::new(MemMessageStore::new(), MemStatsStore::new())
    }

    fn humpty() -> Classifier<MemMessageStore, MemStatsStore> {
        let c = classifier();
        c.train("Humpty Dumpty sat on a wall", true, false).unwrap();
        c.train("Humpty Dumpty had a great fall", true, false).unwrap();
        c.train("All the king's horses and all the king's men", false, false)
            .unwrap();
        c.train("Couldn't put Humpty together again", false, false)
            .unwrap();
        c.merge_stats().unwrap();
        c
    }

    #[test]
    fn test_train_defers_merge() {
        let c = classifier();
        let outcome = c.train("cheap pills", true, false).unwrap();
        assert!(matches!(outcome, TrainOutcome::Pending(_)));
        assert_eq!(c.snapshot().total_spam_messages, 0);
        assert_eq!(c.summary().unwrap().pending_spam, 1);
    }

    #[test]
    fn test_train_commit_now_merges() {
        let c = classifier();
        let outcome = c.train("cheap pills", true, true).unwrap();
        match outcome {
            TrainOutcome::Merged { report, .. } => assert_eq!(report.spam_messages, 1),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(c.snapshot().total_spam_tokens, 2);
    }

    #[test]
    fn test_retrain_after_merge_is_noop() {
        let c = classifier();
        c.train("free money", true, true).unwrap();
        let writes = c.messages().pending_writes();
        let outcome = c.train("free money", false, true).unwrap();
        assert!(outcome.was_skipped());
        assert_eq!(c.messages().pending_writes(), writes);
        assert_eq!(c.snapshot().total_ham_messages, 0);
    }

    #[test]
    fn test_duplicate_pending_counted_once() {
        let c = classifier();
        c.train("same body", true, false).unwrap();
        c.train("same body", true, false).unwrap();
        let report = c.merge_stats().unwrap();
        assert_eq!(report.spam_messages, 1);
        assert_eq!(c.snapshot().token_count(Label::Spam, "same"), 1);
    }

    #[test]
    fn test_score_humpty() {
        let c = humpty();
        assert_eq!(c.probability("humpty dumpty").unwrap().micros(), 866_310);
        assert_eq!(c.probability("all the king").unwrap().micros(), 324_325);
        assert!((c.score("humpty dumpty").unwrap() - 0.86631).abs() < 1e-9);
    }

    #[test]
    fn test_untrained_score_is_error() {
        let err = classifier().score("hello").unwrap_err();
        assert!(matches!(err, SpamError::UntrainedModel));
    }

    #[test]
    fn test_classify_display() {
        let c = humpty();
        let spam = c.classify("humpty dumpty").unwrap();
        assert!(spam.is_spam);
        assert_eq!(spam.to_string(), "SPAM (87%)");
        let ham = c.classify("all the king").unwrap();
        assert!(!ham.is_spam);
        assert_eq!(ham.to_string(), "NOT SPAM (68%)");
    }

    #[test]
    fn test_threshold() {
        let c = humpty().with_spam_threshold(0.9);
        assert!(!c.classify("humpty dumpty").unwrap().is_spam);
    }

    #[test]
    fn test_merge_persists_and_reload() {
        let c = humpty();
        assert_eq!(c.stats_store().save_count(), 4);
        c.clear_stats();
        assert_eq!(c.snapshot().total_messages(), 0);
        c.load_stats();
        assert_eq!(c.snapshot().total_messages(), 4);
    }

    #[test]
    fn test_clear_then_save() {
        let c = humpty();
        c.clear_stats();
        c.save_stats().unwrap();
        let saved = c.stats_store().last_saved().unwrap();
        assert_eq!(saved, AggregateStats::default());
    }

    #[test]
    fn test_write_failure_reported() {
        let c = classifier();
        c.messages().set_simulate_write_error(true);
        assert!(c.train("anything", true, false).is_err());
    }

    #[test]
    fn test_literal_delimiter() {
        let c = classifier().with_delimiter(Delimiter::Literal(",".into()));
        c.train("cheap pills,free money", true, true).unwrap();
        assert_eq!(c.snapshot().token_count(Label::Spam, "cheap pills"), 1);
    }

    #[test]
    fn test_summary() {
        let c = humpty();
        c.train("still pending", false, false).unwrap();
        let summary = c.summary().unwrap();
        assert_eq!(summary.total_spam_messages, 2);
        assert_eq!(summary.total_ham_tokens, 11);
        assert_eq!(summary.pending_ham, 1);
        assert_eq!(summary.stop_words, 33);
    }
}
