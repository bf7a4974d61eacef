//! Centralized error types for the spam filter.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the spamfilter library.
#[derive(Error, Debug)]
pub enum SpamError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A required directory or file could not be created at startup.
    #[error("Cannot prepare '{path}': {source}")]
    Config {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A listed pending record is missing an artifact or holds garbage.
    #[error("Corrupt pending record {fingerprint}: {reason}")]
    CorruptRecord { fingerprint: String, reason: String },

    /// Scoring was requested before any message was merged.
    #[error("Model is untrained: no spam or ham messages have been merged")]
    UntrainedModel,

    /// Both class likelihoods rounded to zero, so the ratio is undefined.
    #[error("Score is indeterminate: both class likelihoods rounded to zero")]
    IndeterminateScore,
}

/// Convenience alias for `Result<T, SpamError>`.
pub type Result<T> = std::result::Result<T, SpamError>;

impl SpamError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a `Config` variant for a setup failure on `path`.
    pub fn config(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Config {
            path: path.into(),
            source,
        }
    }

    /// Create a `CorruptRecord` variant.
    pub fn corrupt(fingerprint: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        Self::CorruptRecord {
            fingerprint: fingerprint.to_string(),
            reason: reason.into(),
        }
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (rare; prefer `SpamError::io`).
impl From<std::io::Error> for SpamError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrupt_record_message() {
        let err = SpamError::corrupt("abc123", "missing tokens file");
        assert_eq!(
            err.to_string(),
            "Corrupt pending record abc123: missing tokens file"
        );
    }
}
