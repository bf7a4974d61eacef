//! Core data model: labels, fingerprints, pending records and the global
//! aggregate counters.

pub mod fingerprint;
pub mod label;
pub mod record;
pub mod stats;

pub use fingerprint::Fingerprint;
pub use label::Label;
pub use record::PendingRecord;
pub use stats::AggregateStats;
