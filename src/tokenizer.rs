//! Term tokenizer.
//!
//! Splits text on a delimiter, trims and lowercases every piece, and drops
//! empty pieces and stop words. Tokens are produced lazily; calling
//! [`Tokenizer::tokens`] again restarts from the beginning of the text.

use std::collections::{HashMap, HashSet};

/// Stop words used when no `stopwords.txt` has been persisted yet.
pub const DEFAULT_STOP_WORDS: [&str; 33] = [
    "but", "be", "with", "such", "then", "for", "no", "will", "not", "are", "and", "their", "if",
    "this", "on", "into", "a", "or", "there", "in", "that", "they", "was", "is", "it", "an", "the",
    "as", "at", "these", "by", "to", "of",
];

/// Build the default stop-word set.
pub fn default_stop_words() -> HashSet<String> {
    DEFAULT_STOP_WORDS.iter().map(|w| w.to_string()).collect()
}

/// How raw text is split into candidate terms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Delimiter {
    /// Any run of Unicode whitespace.
    #[default]
    Whitespace,
    /// A literal separator string.
    Literal(String),
}

impl Delimiter {
    /// Map the optional `tokenizer.delimiter` setting. Unset or empty means
    /// whitespace.
    pub fn from_config(value: Option<&str>) -> Self {
        match value {
            Some(s) if !s.is_empty() => Self::Literal(s.to_string()),
            _ => Self::Whitespace,
        }
    }
}

static WHITESPACE: Delimiter = Delimiter::Whitespace;

/// A restartable token source over borrowed text.
#[derive(Debug, Clone, Copy)]
pub struct Tokenizer<'a> {
    text: &'a str,
    stop_words: &'a HashSet<String>,
    delimiter: &'a Delimiter,
}

impl<'a> Tokenizer<'a> {
    /// Tokenize on whitespace with the given stop words.
    pub fn new(text: &'a str, stop_words: &'a HashSet<String>) -> Self {
        Self {
            text,
            stop_words,
            delimiter: &WHITESPACE,
        }
    }

    /// Use a different delimiter.
    pub fn with_delimiter(mut self, delimiter: &'a Delimiter) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Start a fresh pass over the text.
    pub fn tokens(&self) -> Tokens<'a> {
        let pieces = match self.delimiter {
            Delimiter::Whitespace => Pieces::Whitespace(self.text.split_whitespace()),
            Delimiter::Literal(sep) => Pieces::Literal(self.text.split(sep.as_str())),
        };
        Tokens {
            pieces,
            stop_words: self.stop_words,
        }
    }

    /// Count occurrences of every token. Returns the per-token counts and
    /// the total number of tokens emitted.
    pub fn counts(&self) -> (HashMap<String, u64>, u64) {
        let mut counts: HashMap<String, u64> = HashMap::new();
        let mut total = 0u64;
        for token in self.tokens() {
            *counts.entry(token).or_default() += 1;
            total += 1;
        }
        (counts, total)
    }
}

impl<'a> IntoIterator for &Tokenizer<'a> {
    type Item = String;
    type IntoIter = Tokens<'a>;

    fn into_iter(self) -> Tokens<'a> {
        self.tokens()
    }
}

enum Pieces<'a> {
    Whitespace(std::str::SplitWhitespace<'a>),
    Literal(std::str::Split<'a, &'a str>),
}

impl<'a> Iterator for Pieces<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        match self {
            Pieces::Whitespace(it) => it.next(),
            Pieces::Literal(it) => it.next(),
        }
    }
}

/// Lazy iterator of normalized, stop-word-filtered tokens.
pub struct Tokens<'a> {
    pieces: Pieces<'a>,
    stop_words: &'a HashSet<String>,
}

impl Iterator for Tokens<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            let token = self.pieces.next()?.trim().to_lowercase();
            if token.is_empty() || self.stop_words.contains(&token) {
                continue;
            }
            return Some(token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(text: &str) -> Vec<String> {
        let stop = default_stop_words();
        Tokenizer::new(text, &stop).tokens().collect()
    }

    #[test]
    fn test_lowercases_and_drops_stop_words() {
        assert_eq!(
            collect("Humpty Dumpty sat on a wall"),
            vec!["humpty", "dumpty", "sat", "wall"]
        );
    }

    #[test]
    fn test_stop_words_never_emitted() {
        let stop = default_stop_words();
        let text = DEFAULT_STOP_WORDS.join(" ").to_uppercase();
        let tokens: Vec<String> = Tokenizer::new(&text, &stop).tokens().collect();
        assert!(tokens.is_empty(), "got {tokens:?}");
    }

    #[test]
    fn test_long_run_of_stop_words() {
        let stop = default_stop_words();
        let mut text = "the ".repeat(200_000);
        text.push_str("survivor");
        let tokens: Vec<String> = Tokenizer::new(&text, &stop).tokens().collect();
        assert_eq!(tokens, vec!["survivor"]);
    }

    #[test]
    fn test_empty_piece_is_skipped_not_terminal() {
        let stop = HashSet::new();
        let delim = Delimiter::Literal(" ".to_string());
        let tokens: Vec<String> = Tokenizer::new("alpha  beta", &stop)
            .with_delimiter(&delim)
            .tokens()
            .collect();
        assert_eq!(tokens, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_literal_delimiter_keeps_inner_spaces_trimmed() {
        let stop = HashSet::new();
        let delim = Delimiter::Literal(",".to_string());
        let tokens: Vec<String> = Tokenizer::new(" One, two words ,THREE", &stop)
            .with_delimiter(&delim)
            .tokens()
            .collect();
        assert_eq!(tokens, vec!["one", "two words", "three"]);
    }

    #[test]
    fn test_no_punctuation_stripping() {
        assert_eq!(collect("king's men!"), vec!["king's", "men!"]);
    }

    #[test]
    fn test_restartable() {
        let stop = default_stop_words();
        let tokenizer = Tokenizer::new("free money free", &stop);
        let first: Vec<String> = tokenizer.tokens().collect();
        let second: Vec<String> = (&tokenizer).into_iter().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_counts() {
        let stop = default_stop_words();
        let (counts, total) = Tokenizer::new("Free money, free MONEY free", &stop).counts();
        assert_eq!(total, 5);
        assert_eq!(counts["free"], 3);
        assert_eq!(counts["money,"], 1);
        assert_eq!(counts["money"], 1);
    }

    #[test]
    fn test_delimiter_from_config() {
        assert_eq!(Delimiter::from_config(None), Delimiter::Whitespace);
        assert_eq!(Delimiter::from_config(Some("")), Delimiter::Whitespace);
        assert_eq!(
            Delimiter::from_config(Some(";")),
            Delimiter::Literal(";".to_string())
        );
    }
}
