//! Global aggregate counters shared by merge and scoring.

use std::collections::{HashMap, HashSet};

use super::label::Label;
use super::record::PendingRecord;
use crate::tokenizer::default_stop_words;

/// Process-wide classifier state.
///
/// Mutated only by the merge engine; persisted after every merged message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateStats {
    pub total_spam_messages: u64,
    pub total_ham_messages: u64,
    pub total_spam_tokens: u64,
    pub total_ham_tokens: u64,
    pub spam_token_counts: HashMap<String, u64>,
    pub ham_token_counts: HashMap<String, u64>,
    pub stop_words: HashSet<String>,
}

impl Default for AggregateStats {
    /// Zero counters and the built-in stop words.
    fn default() -> Self {
        Self {
            stop_words: default_stop_words(),
            ..Self::empty()
        }
    }
}

impl AggregateStats {
    /// Zero counters and no stop words.
    pub fn empty() -> Self {
        Self {
            total_spam_messages: 0,
            total_ham_messages: 0,
            total_spam_tokens: 0,
            total_ham_tokens: 0,
            spam_token_counts: HashMap::new(),
            ham_token_counts: HashMap::new(),
            stop_words: HashSet::new(),
        }
    }

    pub fn total_messages(&self) -> u64 {
        self.total_spam_messages + self.total_ham_messages
    }

    pub fn message_count(&self, label: Label) -> u64 {
        match label {
            Label::Spam => self.total_spam_messages,
            Label::Ham => self.total_ham_messages,
        }
    }

    pub fn token_total(&self, label: Label) -> u64 {
        match label {
            Label::Spam => self.total_spam_tokens,
            Label::Ham => self.total_ham_tokens,
        }
    }

    pub fn token_counts(&self, label: Label) -> &HashMap<String, u64> {
        match label {
            Label::Spam => &self.spam_token_counts,
            Label::Ham => &self.ham_token_counts,
        }
    }

    /// Count of `token` in `label` messages, zero when unseen.
    pub fn token_count(&self, label: Label, token: &str) -> u64 {
        self.token_counts(label).get(token).copied().unwrap_or(0)
    }

    /// Fold one message's statistics into the counters for `label`.
    pub fn fold(&mut self, label: Label, record: &PendingRecord) {
        let (messages, tokens, counts) = match label {
            Label::Spam => (
                &mut self.total_spam_messages,
                &mut self.total_spam_tokens,
                &mut self.spam_token_counts,
            ),
            Label::Ham => (
                &mut self.total_ham_messages,
                &mut self.total_ham_tokens,
                &mut self.ham_token_counts,
            ),
        };
        *messages += 1;
        *tokens += record.total_tokens;
        for (token, count) in &record.token_counts {
            *counts.entry(token.clone()).or_default() += count;
        }
    }
}
