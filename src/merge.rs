//! Folding pending records into the aggregate statistics.
//!
//! A merge run drains spam first, then ham. For every completed record:
//!
//! 1. read the record (no lock held),
//! 2. move its files to the label's archive,
//! 3. append its fingerprint to the processed log,
//! 4. fold it into the aggregate under the write lock,
//! 5. persist an aggregate snapshot under the read lock.
//!
//! The aggregate only changes once the record has left the pending bucket
//! and is in the processed log, so a failure or crash at any step loses at
//! most one message's contribution and never counts a message twice.

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::model::{AggregateStats, Label};
use crate::store::{MessageStore, StatsStore};

/// What a merge run folded in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub spam_messages: u64,
    pub ham_messages: u64,
    pub spam_tokens: u64,
    pub ham_tokens: u64,
}

impl MergeReport {
    pub fn messages(&self) -> u64 {
        self.spam_messages + self.ham_messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages() == 0
    }

    fn record(&mut self, label: Label, tokens: u64) {
        match label {
            Label::Spam => {
                self.spam_messages += 1;
                self.spam_tokens += tokens;
            }
            Label::Ham => {
                self.ham_messages += 1;
                self.ham_tokens += tokens;
            }
        }
    }
}

/// One merge over the stores, serialized by `merge_lock`.
pub struct MergeEngine<'a> {
    messages: &'a dyn MessageStore,
    stats_store: &'a dyn StatsStore,
    state: &'a RwLock<AggregateStats>,
    merge_lock: &'a Mutex<()>,
}

impl<'a> MergeEngine<'a> {
    pub fn new(
        messages: &'a dyn MessageStore,
        stats_store: &'a dyn StatsStore,
        state: &'a RwLock<AggregateStats>,
        merge_lock: &'a Mutex<()>,
    ) -> Self {
        Self {
            messages,
            stats_store,
            state,
            merge_lock,
        }
    }

    /// Merge every completed pending record.
    ///
    /// Stops at the first failure; records merged before it stay merged.
    pub fn run(&self, progress: Option<&dyn Fn(u64, u64)>) -> Result<MergeReport> {
        let _guard = self.merge_lock.lock();
        let mut report = MergeReport::default();
        for label in Label::ALL {
            self.merge_label(label, &mut report, progress)?;
        }
        if report.is_empty() {
            debug!("Nothing to merge");
        } else {
            info!(
                spam = report.spam_messages,
                ham = report.ham_messages,
                "Merged pending messages"
            );
        }
        Ok(report)
    }

    fn merge_label(
        &self,
        label: Label,
        report: &mut MergeReport,
        progress: Option<&dyn Fn(u64, u64)>,
    ) -> Result<()> {
        let pending = self.messages.list_completed(label)?;
        let total = pending.len() as u64;
        debug!(label = %label, count = total, "Merging label");

        for (done, fingerprint) in pending.iter().enumerate() {
            let record = self.messages.read_pending(fingerprint, label)?;

            self.messages.archive(fingerprint, label)?;
            self.messages.mark_processed(fingerprint)?;
            self.state.write().fold(label, &record);
            self.stats_store.save(&self.state.read())?;

            report.record(label, record.total_tokens);
            debug!(fingerprint = %fingerprint, label = %label, tokens = record.total_tokens, "Merged");
            if let Some(cb) = progress {
                cb(done as u64 + 1, total);
            }
        }
        Ok(())
    }
}
