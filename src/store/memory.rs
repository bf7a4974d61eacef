//! In-memory stores for tests and benchmarks.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::{MessageStore, StatsStore};
use crate::error::{Result, SpamError};
use crate::model::{AggregateStats, Fingerprint, Label, PendingRecord};

fn simulated_failure() -> SpamError {
    SpamError::io("memory://", std::io::Error::other("Simulated write error"))
}

/// In-memory [`MessageStore`].
#[derive(Default)]
pub struct MemMessageStore {
    pending: Mutex<HashMap<(Label, Fingerprint), PendingRecord>>,
    archived: Mutex<Vec<(Label, Fingerprint)>>,
    processed: Mutex<Vec<String>>,
    corrupted: Mutex<HashSet<(Label, Fingerprint)>>,
    writes: AtomicUsize,
    simulate_write_error: AtomicBool,
    fail_archive: AtomicBool,
    fail_mark_processed: AtomicBool,
}

impl MemMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        self.simulate_write_error.store(simulate, Ordering::SeqCst);
    }

    /// Make only `archive` fail.
    pub fn set_fail_archive(&self, fail: bool) {
        self.fail_archive.store(fail, Ordering::SeqCst);
    }

    /// Make only `mark_processed` fail.
    pub fn set_fail_mark_processed(&self, fail: bool) {
        self.fail_mark_processed.store(fail, Ordering::SeqCst);
    }

    /// Number of successful `write_pending` calls.
    pub fn pending_writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Archived records, in archive order.
    pub fn archived(&self) -> Vec<(Label, Fingerprint)> {
        self.archived.lock().clone()
    }

    /// Keep a pending record listed but make reading it fail, as if its
    /// token file vanished.
    pub fn corrupt(&self, fingerprint: &Fingerprint, label: Label) {
        self.corrupted.lock().insert((label, fingerprint.clone()));
    }

    fn check_writable(&self, step: Option<&AtomicBool>) -> Result<()> {
        let step_fails = step.is_some_and(|flag| flag.load(Ordering::SeqCst));
        if step_fails || self.simulate_write_error.load(Ordering::SeqCst) {
            Err(simulated_failure())
        } else {
            Ok(())
        }
    }
}

impl MessageStore for MemMessageStore {
    fn is_processed(&self, fingerprint: &Fingerprint) -> bool {
        self.processed.lock().iter().any(|l| fingerprint.matches(l))
    }

    fn write_pending(&self, record: &PendingRecord, label: Label) -> Result<()> {
        self.check_writable(None)?;
        self.pending
            .lock()
            .insert((label, record.fingerprint.clone()), record.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn list_completed(&self, label: Label) -> Result<Vec<Fingerprint>> {
        let mut listed: Vec<Fingerprint> = self
            .pending
            .lock()
            .keys()
            .filter(|(l, _)| *l == label)
            .map(|(_, fp)| fp.clone())
            .collect();
        listed.sort();
        Ok(listed)
    }

    fn read_pending(&self, fingerprint: &Fingerprint, label: Label) -> Result<PendingRecord> {
        let key = (label, fingerprint.clone());
        if self.corrupted.lock().contains(&key) {
            return Err(SpamError::corrupt(fingerprint, "missing tokens artifact"));
        }
        self.pending
            .lock()
            .get(&key)
            .cloned()
            .ok_or_else(|| SpamError::corrupt(fingerprint, "no pending record"))
    }

    fn archive(&self, fingerprint: &Fingerprint, label: Label) -> Result<()> {
        self.check_writable(Some(&self.fail_archive))?;
        if self
            .pending
            .lock()
            .remove(&(label, fingerprint.clone()))
            .is_some()
        {
            self.archived.lock().push((label, fingerprint.clone()));
        }
        Ok(())
    }

    fn mark_processed(&self, fingerprint: &Fingerprint) -> Result<()> {
        self.check_writable(Some(&self.fail_mark_processed))?;
        self.processed.lock().push(fingerprint.to_string());
        Ok(())
    }
}

/// In-memory [`StatsStore`] that remembers the last saved aggregate.
#[derive(Default)]
pub struct MemStatsStore {
    saved: Mutex<Option<AggregateStats>>,
    saves: AtomicUsize,
    fail_save: AtomicBool,
}

impl MemStatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `save` fail.
    pub fn set_fail_save(&self, fail: bool) {
        self.fail_save.store(fail, Ordering::SeqCst);
    }

    /// Number of successful `save` calls so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn last_saved(&self) -> Option<AggregateStats> {
        self.saved.lock().clone()
    }
}

impl StatsStore for MemStatsStore {
    fn load(&self) -> AggregateStats {
        self.saved.lock().clone().unwrap_or_default()
    }

    fn save(&self, stats: &AggregateStats) -> Result<()> {
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(simulated_failure());
        }
        *self.saved.lock() = Some(stats.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
