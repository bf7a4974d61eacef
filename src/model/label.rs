//! Spam / ham training labels.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The class a training message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Spam,
    Ham,
}

impl Label {
    /// Merge order: spam bucket first, then ham.
    pub const ALL: [Label; 2] = [Label::Spam, Label::Ham];

    pub fn from_is_spam(is_spam: bool) -> Self {
        if is_spam {
            Label::Spam
        } else {
            Label::Ham
        }
    }

    pub fn is_spam(self) -> bool {
        self == Label::Spam
    }

    /// Lenient flag parsing used by the command line: anything starting
    /// with `y` (any case) or exactly `1` means spam.
    pub fn from_flag_str(value: &str) -> Self {
        let value = value.trim();
        let is_spam = value
            .chars()
            .next()
            .is_some_and(|c| c.eq_ignore_ascii_case(&'y'))
            || value == "1";
        Self::from_is_spam(is_spam)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::Spam => "spam",
            Label::Ham => "ham",
        }
    }

    /// Directory name of the pending bucket under the messages root.
    pub fn pending_dir_name(self) -> &'static str {
        self.as_str()
    }

    /// Directory name of the archive bucket under the messages root.
    pub fn archive_dir_name(self) -> &'static str {
        match self {
            Label::Spam => "spam_archive",
            Label::Ham => "ham_archive",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flag_str() {
        assert_eq!(Label::from_flag_str("yes"), Label::Spam);
        assert_eq!(Label::from_flag_str("Y"), Label::Spam);
        assert_eq!(Label::from_flag_str("1"), Label::Spam);
        assert_eq!(Label::from_flag_str("no"), Label::Ham);
        assert_eq!(Label::from_flag_str("true"), Label::Ham);
        assert_eq!(Label::from_flag_str(""), Label::Ham);
        assert_eq!(Label::from_flag_str("10"), Label::Ham);
    }

    #[test]
    fn test_bucket_names() {
        assert_eq!(Label::Spam.pending_dir_name(), "spam");
        assert_eq!(Label::Ham.archive_dir_name(), "ham_archive");
    }
}
