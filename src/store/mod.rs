//! Training data storage.
//!
//! [`MessageStore`] holds pending per-message records, their archive and the
//! processed-fingerprint log. [`StatsStore`] persists the global aggregate.
//! Both have a file-backed implementation ([`fs`]) defining the on-disk
//! format, and an in-memory one ([`memory`]) for tests.

pub mod fs;
pub mod memory;
pub mod properties;

use crate::error::Result;
use crate::model::{AggregateStats, Fingerprint, Label, PendingRecord};

/// Fingerprint message content. Pure and deterministic.
pub fn fingerprint(content: &str) -> Fingerprint {
    Fingerprint::of(content)
}

/// Content-addressed store of trained-but-unmerged messages.
pub trait MessageStore: Send + Sync {
    /// True if `fingerprint` is in the processed log. Read failures count
    /// as "not processed".
    fn is_processed(&self, fingerprint: &Fingerprint) -> bool;

    /// Write the token counts, the token total and finally the completion
    /// marker for `record` into the `label` pending bucket. Overwrites an
    /// existing record with the same fingerprint.
    fn write_pending(&self, record: &PendingRecord, label: Label) -> Result<()>;

    /// Fingerprints of pending records whose completion marker exists.
    fn list_completed(&self, label: Label) -> Result<Vec<Fingerprint>>;

    /// Read back a pending record. A missing or malformed artifact is
    /// [`crate::error::SpamError::CorruptRecord`].
    fn read_pending(&self, fingerprint: &Fingerprint, label: Label) -> Result<PendingRecord>;

    /// Move every artifact of `fingerprint` from the pending bucket to the
    /// archive bucket.
    fn archive(&self, fingerprint: &Fingerprint, label: Label) -> Result<()>;

    /// Append `fingerprint` to the processed log.
    fn mark_processed(&self, fingerprint: &Fingerprint) -> Result<()>;

    /// Number of completed pending records in `label`.
    fn pending_count(&self, label: Label) -> Result<usize> {
        Ok(self.list_completed(label)?.len())
    }
}

/// Persistence of [`AggregateStats`].
pub trait StatsStore: Send + Sync {
    /// Load the aggregate. Missing files and malformed values fall back to
    /// defaults; an empty stop-word list falls back to the built-in one.
    fn load(&self) -> AggregateStats;

    /// Persist the full aggregate.
    fn save(&self, stats: &AggregateStats) -> Result<()>;
}
