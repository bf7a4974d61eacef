//! Content fingerprints and the sharded directory layout derived from them.
//!
//! A fingerprint is the lowercase hex SHA-256 of the message text. Files of
//! one message share the fingerprint as a name prefix, and archived files
//! live under a shard path built from its leading characters:
//!
//! ```text
//! 3fa9c0...e1  →  <archive>/3/f/a/9/c/3fa9c0...e1_tokens.properties
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// Number of hex digits in a fingerprint produced by [`Fingerprint::of`].
pub const FINGERPRINT_LEN: usize = 64;

/// Maximum number of nested single-character shard directories.
pub const SHARD_DEPTH: usize = 5;

/// Deterministic identifier of a message body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint the UTF-8 bytes of `content`.
    pub fn of(content: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Accept a fingerprint read back from a file name or the processed log.
    ///
    /// Any non-empty run of hex digits is accepted, so records written with
    /// a shorter digest (e.g. 32-digit MD5 names) still merge. Case is kept
    /// as found because it is part of the on-disk file name.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if !value.is_empty() && value.chars().all(|c| c.is_ascii_hexdigit()) {
            Some(Self(value.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against a line of the processed log.
    pub fn matches(&self, line: &str) -> bool {
        line.trim().eq_ignore_ascii_case(&self.0)
    }

    /// True if `file_name` is one of this message's artifacts.
    pub fn owns_file(&self, file_name: &str) -> bool {
        file_name
            .strip_prefix(self.0.as_str())
            .is_some_and(|rest| rest.starts_with('_') || rest.starts_with('.'))
    }

    /// Shard directory for this fingerprint under `base`.
    pub fn shard_path(&self, base: &Path) -> PathBuf {
        shard_path(base, &self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Nest one directory per leading character of `name`, at most
/// [`SHARD_DEPTH`] levels, stopping at the first `.` or `_`.
pub fn shard_path(base: &Path, name: &str) -> PathBuf {
    let mut dir = base.to_path_buf();
    for ch in name.chars().take(SHARD_DEPTH) {
        if ch == '.' || ch == '_' {
            break;
        }
        dir.push(ch.to_string());
    }
    dir
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = Fingerprint::of("Humpty Dumpty sat on a wall");
        let b = Fingerprint::of("Humpty Dumpty sat on a wall");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), FINGERPRINT_LEN);
        assert_ne!(a, Fingerprint::of("Humpty Dumpty sat on a wall "));
    }

    #[test]
    fn test_known_digest() {
        assert_eq!(
            Fingerprint::of("").as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_parse() {
        assert!(Fingerprint::parse("ABCDEF0123456789ABCDEF0123456789").is_some());
        assert!(Fingerprint::parse("  abc \n").is_some());
        assert!(Fingerprint::parse("").is_none());
        assert!(Fingerprint::parse("not-hex").is_none());
    }

    #[test]
    fn test_matches_is_case_insensitive() {
        let fp = Fingerprint::of("hello");
        assert!(fp.matches(&fp.as_str().to_uppercase()));
        assert!(fp.matches(&format!("  {}\r", fp)));
        assert!(!fp.matches("deadbeef"));
    }

    #[test]
    fn test_owns_file() {
        let fp = Fingerprint::parse("abc123").unwrap();
        assert!(fp.owns_file("abc123_tokens.properties"));
        assert!(fp.owns_file("abc123.complete"));
        assert!(!fp.owns_file("abc1234.complete"));
        assert!(!fp.owns_file(".abc123_tokens.properties.tmp"));
    }

    #[test]
    fn test_shard_path_depth() {
        let base = Path::new("/archive");
        assert_eq!(
            shard_path(base, "abcdef0123"),
            PathBuf::from("/archive/a/b/c/d/e")
        );
    }

    #[test]
    fn test_shard_path_stops_at_separator() {
        let base = Path::new("/archive");
        assert_eq!(shard_path(base, "ab_cdef"), PathBuf::from("/archive/a/b"));
        assert_eq!(shard_path(base, "a.b"), PathBuf::from("/archive/a"));
        assert_eq!(shard_path(base, "_x"), PathBuf::from("/archive"));
    }
}
