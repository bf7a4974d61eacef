//! File-backed stores.
//!
//! ```text
//! <messages>/spam/<fp>_tokens.properties     token=count
//! <messages>/spam/<fp>_stats.properties      totalTokens=N
//! <messages>/spam/<fp>.complete              empty, written last
//! <messages>/spam_archive/a/b/c/d/e/<fp>*    merged records
//! <messages>/ham/..., <messages>/ham_archive/...
//!
//! <stats>/messages_completed.txt             one fingerprint per line
//! <stats>/stopwords.txt                      one stop word per line
//! <stats>/stats.properties                   totalSpam, totalHam, ...
//! <stats>/spamtokens.properties              token=count
//! <stats>/hamtokens.properties               token=count
//! ```

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info, warn};

use super::properties;
use super::{MessageStore, StatsStore};
use crate::error::{Result, SpamError};
use crate::model::{AggregateStats, Fingerprint, Label, PendingRecord};
use crate::tokenizer::default_stop_words;

const TOKENS_SUFFIX: &str = "_tokens.properties";
const STATS_SUFFIX: &str = "_stats.properties";
const COMPLETE_SUFFIX: &str = ".complete";
const ARTIFACT_SUFFIXES: [&str; 3] = [TOKENS_SUFFIX, STATS_SUFFIX, COMPLETE_SUFFIX];
const TOTAL_TOKENS_KEY: &str = "totalTokens";

/// Processed-fingerprint log, under the stats root.
pub const PROCESSED_LOG_FILE: &str = "messages_completed.txt";
pub const STOP_WORDS_FILE: &str = "stopwords.txt";
pub const TOTALS_FILE: &str = "stats.properties";
pub const SPAM_TOKENS_FILE: &str = "spamtokens.properties";
pub const HAM_TOKENS_FILE: &str = "hamtokens.properties";

const KEY_TOTAL_SPAM: &str = "totalSpam";
const KEY_TOTAL_HAM: &str = "totalHam";
const KEY_TOTAL_SPAM_TOKENS: &str = "totalSpamTokens";
const KEY_TOTAL_HAM_TOKENS: &str = "totalHamTokens";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Write `contents` to `dir/name` through a hidden temporary file and a
/// rename, so readers never observe a partial file.
fn write_atomic(dir: &Path, name: &str, contents: &[u8]) -> Result<()> {
    let tmp = dir.join(format!(
        ".{name}.{}.{}.tmp",
        std::process::id(),
        TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    let target = dir.join(name);
    fs::write(&tmp, contents).map_err(|e| SpamError::io(&tmp, e))?;
    fs::rename(&tmp, &target).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        SpamError::io(&target, e)
    })
}

fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| SpamError::config(path, e))
}

// ── Message store ───────────────────────────────────────────────

/// Pending and archive buckets under a messages root, plus the processed
/// log under a stats root.
#[derive(Debug, Clone)]
pub struct FsMessageStore {
    messages_root: PathBuf,
    processed_log: PathBuf,
}

impl FsMessageStore {
    /// Create (if needed) all bucket directories and the processed log.
    ///
    /// Any failure here is a [`SpamError::Config`] error.
    pub fn open(messages_root: impl Into<PathBuf>, stats_root: impl Into<PathBuf>) -> Result<Self> {
        let messages_root = messages_root.into();
        let stats_root = stats_root.into();

        for label in Label::ALL {
            ensure_dir(&messages_root.join(label.pending_dir_name()))?;
            ensure_dir(&messages_root.join(label.archive_dir_name()))?;
        }
        ensure_dir(&stats_root)?;

        let processed_log = stats_root.join(PROCESSED_LOG_FILE);
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&processed_log)
            .map_err(|e| SpamError::config(&processed_log, e))?;

        info!(
            messages = %messages_root.display(),
            stats = %stats_root.display(),
            "Opened message store"
        );

        Ok(Self {
            messages_root,
            processed_log,
        })
    }

    pub fn pending_dir(&self, label: Label) -> PathBuf {
        self.messages_root.join(label.pending_dir_name())
    }

    pub fn archive_dir(&self, label: Label) -> PathBuf {
        self.messages_root.join(label.archive_dir_name())
    }

    pub fn processed_log_path(&self) -> &Path {
        &self.processed_log
    }

    /// Archive directory that holds (or will hold) `fingerprint`'s files.
    pub fn archived_path(&self, fingerprint: &Fingerprint, label: Label) -> PathBuf {
        fingerprint.shard_path(&self.archive_dir(label))
    }

    fn read_artifact(&self, fingerprint: &Fingerprint, path: &Path) -> Result<String> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(SpamError::corrupt(
                fingerprint,
                format!("missing artifact {}", path.display()),
            )),
            Err(e) => Err(SpamError::io(path, e)),
        }
    }
}

/// Move any other files owned by `fingerprint` from `source` to `target`.
fn archive_stray_files(
    fingerprint: &Fingerprint,
    source: &Path,
    target: &Path,
) -> Result<usize> {
    let mut moved = 0usize;
    for entry in fs::read_dir(source).map_err(|e| SpamError::io(source, e))? {
        let entry = entry.map_err(|e| SpamError::io(source, e))?;
        let name = entry.file_name();
        if !name.to_str().is_some_and(|n| fingerprint.owns_file(n)) {
            continue;
        }
        let dest = target.join(&name);
        fs::rename(entry.path(), &dest).map_err(|e| SpamError::io(&dest, e))?;
        moved += 1;
    }
    Ok(moved)
}

impl MessageStore for FsMessageStore {
    fn is_processed(&self, fingerprint: &Fingerprint) -> bool {
        let file = match fs::File::open(&self.processed_log) {
            Ok(f) => f,
            Err(e) => {
                debug!(path = %self.processed_log.display(), error = %e, "Processed log unreadable");
                return false;
            }
        };
        BufReader::new(file)
            .lines()
            .filter_map(std::result::Result::ok)
            .any(|line| fingerprint.matches(&line))
    }

    fn write_pending(&self, record: &PendingRecord, label: Label) -> Result<()> {
        let dir = self.pending_dir(label);
        fs::create_dir_all(&dir).map_err(|e| SpamError::io(&dir, e))?;
        let fp = record.fingerprint.as_str();

        let tokens = properties::render(
            record
                .token_counts
                .iter()
                .map(|(token, count)| (token.as_str(), count.to_string())),
        );
        write_atomic(&dir, &format!("{fp}{TOKENS_SUFFIX}"), tokens.as_bytes())?;

        let totals = properties::render([(TOTAL_TOKENS_KEY, record.total_tokens.to_string())]);
        write_atomic(&dir, &format!("{fp}{STATS_SUFFIX}"), totals.as_bytes())?;

        write_atomic(&dir, &format!("{fp}{COMPLETE_SUFFIX}"), b"")?;

        debug!(fingerprint = %fp, %label, tokens = record.total_tokens, "Pending record written");
        Ok(())
    }

    fn list_completed(&self, label: Label) -> Result<Vec<Fingerprint>> {
        let dir = self.pending_dir(label);
        let entries = fs::read_dir(&dir).map_err(|e| SpamError::io(&dir, e))?;

        let mut completed = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SpamError::io(&dir, e))?;
            let name = entry.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(COMPLETE_SUFFIX)) else {
                continue;
            };
            match Fingerprint::parse(stem) {
                Some(fp) => completed.push(fp),
                None => warn!(file = %name.to_string_lossy(), "Ignoring foreign completion marker"),
            }
        }
        completed.sort();
        Ok(completed)
    }

    fn read_pending(&self, fingerprint: &Fingerprint, label: Label) -> Result<PendingRecord> {
        let dir = self.pending_dir(label);
        let fp = fingerprint.as_str();

        let totals_text = self.read_artifact(fingerprint, &dir.join(format!("{fp}{STATS_SUFFIX}")))?;
        let totals = properties::parse_map(&totals_text);
        let total_tokens = totals
            .get(TOTAL_TOKENS_KEY)
            .ok_or_else(|| SpamError::corrupt(fingerprint, "stats file lacks totalTokens"))?
            .trim()
            .parse::<u64>()
            .map_err(|e| SpamError::corrupt(fingerprint, format!("bad totalTokens: {e}")))?;

        let tokens_text =
            self.read_artifact(fingerprint, &dir.join(format!("{fp}{TOKENS_SUFFIX}")))?;
        let mut token_counts = HashMap::new();
        for (token, value) in properties::parse(&tokens_text) {
            let count = value.trim().parse::<u64>().map_err(|e| {
                SpamError::corrupt(fingerprint, format!("bad count for token '{token}': {e}"))
            })?;
            token_counts.insert(token, count);
        }

        Ok(PendingRecord::new(
            fingerprint.clone(),
            token_counts,
            total_tokens,
        ))
    }

    fn archive(&self, fingerprint: &Fingerprint, label: Label) -> Result<()> {
        let source = self.pending_dir(label);
        let target = self.archived_path(fingerprint, label);
        fs::create_dir_all(&target).map_err(|e| SpamError::io(&target, e))?;

        let mut moved = 0usize;
        for suffix in ARTIFACT_SUFFIXES {
            let name = format!("{fingerprint}{suffix}");
            let dest = target.join(&name);
            match fs::rename(source.join(&name), &dest) {
                Ok(()) => moved += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(SpamError::io(&dest, e)),
            }
        }

        // Partial or hand-made records may carry other artifact names.
        if moved < ARTIFACT_SUFFIXES.len() {
            moved += archive_stray_files(fingerprint, &source, &target)?;
        }

        if moved == 0 {
            warn!(fingerprint = %fingerprint, %label, "No pending files to archive");
        } else {
            debug!(fingerprint = %fingerprint, %label, files = moved, "Archived");
        }
        Ok(())
    }

    fn mark_processed(&self, fingerprint: &Fingerprint) -> Result<()> {
        let path = &self.processed_log;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| SpamError::io(path, e))?;
        writeln!(file, "{fingerprint}").map_err(|e| SpamError::io(path, e))?;
        file.sync_data().map_err(|e| SpamError::io(path, e))
    }
}

// ── Stats store ─────────────────────────────────────────────────

/// Aggregate counters persisted as text files under the stats root.
#[derive(Debug, Clone)]
pub struct FsStatsStore {
    stats_root: PathBuf,
}

impl FsStatsStore {
    pub fn new(stats_root: impl Into<PathBuf>) -> Self {
        Self {
            stats_root: stats_root.into(),
        }
    }

    pub fn stats_root(&self) -> &Path {
        &self.stats_root
    }

    fn read_optional(&self, name: &str) -> Option<String> {
        let path = self.stats_root.join(name);
        match fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Stats file not loaded, using defaults");
                None
            }
        }
    }

    fn load_token_counts(&self, name: &str) -> HashMap<String, u64> {
        let mut counts = HashMap::new();
        let Some(text) = self.read_optional(name) else {
            return counts;
        };
        for (token, value) in properties::parse(&text) {
            match value.trim().parse::<u64>() {
                Ok(count) => {
                    counts.insert(token, count);
                }
                Err(e) => warn!(file = name, token = %token, error = %e, "Skipping malformed token count"),
            }
        }
        counts
    }
}

fn parse_counter(totals: &HashMap<String, String>, key: &str) -> u64 {
    let Some(raw) = totals.get(key) else {
        return 0;
    };
    raw.trim().parse::<u64>().unwrap_or_else(|e| {
        warn!(key = key, value = %raw, error = %e, "Malformed counter, keeping default");
        0
    })
}

impl StatsStore for FsStatsStore {
    fn load(&self) -> AggregateStats {
        info!(path = %self.stats_root.display(), "Loading stats");
        let mut stats = AggregateStats::empty();

        if let Some(text) = self.read_optional(STOP_WORDS_FILE) {
            stats.stop_words = text
                .lines()
                .map(|l| l.trim().to_lowercase())
                .filter(|l| !l.is_empty())
                .collect();
        }
        if stats.stop_words.is_empty() {
            stats.stop_words = default_stop_words();
        }

        let totals = self
            .read_optional(TOTALS_FILE)
            .map(|t| properties::parse_map(&t))
            .unwrap_or_default();
        stats.total_spam_messages = parse_counter(&totals, KEY_TOTAL_SPAM);
        stats.total_ham_messages = parse_counter(&totals, KEY_TOTAL_HAM);
        stats.total_spam_tokens = parse_counter(&totals, KEY_TOTAL_SPAM_TOKENS);
        stats.total_ham_tokens = parse_counter(&totals, KEY_TOTAL_HAM_TOKENS);

        stats.spam_token_counts = self.load_token_counts(SPAM_TOKENS_FILE);
        stats.ham_token_counts = self.load_token_counts(HAM_TOKENS_FILE);

        info!(
            total_spam = stats.total_spam_messages,
            total_ham = stats.total_ham_messages,
            total_spam_tokens = stats.total_spam_tokens,
            total_ham_tokens = stats.total_ham_tokens,
            spam_vocabulary = stats.spam_token_counts.len(),
            ham_vocabulary = stats.ham_token_counts.len(),
            "Loading stats completed"
        );
        stats
    }

    fn save(&self, stats: &AggregateStats) -> Result<()> {
        debug!(path = %self.stats_root.display(), "Saving stats");
        let root = &self.stats_root;
        fs::create_dir_all(root).map_err(|e| SpamError::io(root, e))?;

        let mut stop_words: Vec<&str> = stats.stop_words.iter().map(String::as_str).collect();
        stop_words.sort_unstable();
        let mut text = stop_words.join("\n");
        text.push('\n');
        write_atomic(root, STOP_WORDS_FILE, text.as_bytes())?;

        let totals = properties::render([
            (KEY_TOTAL_SPAM, stats.total_spam_messages.to_string()),
            (KEY_TOTAL_HAM, stats.total_ham_messages.to_string()),
            (KEY_TOTAL_SPAM_TOKENS, stats.total_spam_tokens.to_string()),
            (KEY_TOTAL_HAM_TOKENS, stats.total_ham_tokens.to_string()),
        ]);
        write_atomic(root, TOTALS_FILE, totals.as_bytes())?;

        for (name, counts) in [
            (SPAM_TOKENS_FILE, &stats.spam_token_counts),
            (HAM_TOKENS_FILE, &stats.ham_token_counts),
        ] {
            let text = properties::render(counts.iter().map(|(t, c)| (t.as_str(), c.to_string())));
            write_atomic(root, name, text.as_bytes())?;
        }

        debug!("Saving stats completed");
        Ok(())
    }
}
