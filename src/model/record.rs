//! Per-message token statistics awaiting merge.

use std::collections::HashMap;

use super::fingerprint::Fingerprint;

/// Token counts of one trained message, stored until the merge engine
/// folds them into the aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRecord {
    pub fingerprint: Fingerprint,
    pub token_counts: HashMap<String, u64>,
    /// Number of tokens emitted for the message (sum of `token_counts`).
    pub total_tokens: u64,
}

impl PendingRecord {
    pub fn new(
        fingerprint: Fingerprint,
        token_counts: HashMap<String, u64>,
        total_tokens: u64,
    ) -> Self {
        Self {
            fingerprint,
            token_counts,
            total_tokens,
        }
    }

    /// Build a record by counting an already tokenized message.
    pub fn from_tokens<I>(fingerprint: Fingerprint, tokens: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut token_counts: HashMap<String, u64> = HashMap::new();
        let mut total_tokens = 0u64;
        for token in tokens {
            *token_counts.entry(token.into()).or_default() += 1;
            total_tokens += 1;
        }
        Self::new(fingerprint, token_counts, total_tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_tokens() {
        let fp = Fingerprint::of("x");
        let record = PendingRecord::from_tokens(fp.clone(), ["a", "b", "a"]);
        assert_eq!(record.fingerprint, fp);
        assert_eq!(record.total_tokens, 3);
        assert_eq!(record.token_counts["a"], 2);
        assert_eq!(record.token_counts["b"], 1);
    }
}
