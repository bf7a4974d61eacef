//! On-disk layout of the file-backed stores.

use std::path::Path;

use assert_fs::prelude::*;
use predicates::prelude::*;

use spamfilter::model::{Fingerprint, Label};
use spamfilter::store::fs::{
    FsMessageStore, HAM_TOKENS_FILE, PROCESSED_LOG_FILE, SPAM_TOKENS_FILE, STOP_WORDS_FILE,
    TOTALS_FILE,
};
use spamfilter::Classifier;

/// Match on a file's UTF-8 contents.
fn content<P: Predicate<str>>(pred: P) -> impl Predicate<Path> {
    pred.from_utf8().from_file_path()
}

fn shard(fp: &Fingerprint) -> String {
    fp.as_str()[..5]
        .chars()
        .map(String::from)
        .collect::<Vec<_>>()
        .join("/")
}

#[test]
fn test_open_creates_buckets_and_log() {
    let temp = assert_fs::TempDir::new().unwrap();
    FsMessageStore::open(temp.child("messages").path(), temp.child("stats").path()).unwrap();

    for dir in ["spam", "ham", "spam_archive", "ham_archive"] {
        temp.child("messages")
            .child(dir)
            .assert(predicate::path::is_dir());
    }
    temp.child("stats")
        .child(PROCESSED_LOG_FILE)
        .assert(predicate::path::is_file());
}

#[test]
fn test_pending_record_triple() {
    let temp = assert_fs::TempDir::new().unwrap();
    let c = Classifier::open(temp.child("messages").path(), temp.child("stats").path()).unwrap();
    let fp = c.train("free money free", true, false).unwrap().fingerprint().clone();

    let spam = temp.child("messages").child("spam");
    spam.child(format!("{fp}_tokens.properties"))
        .assert(content(
            predicate::str::contains("free=2").and(predicate::str::contains("money=1")),
        ));
    spam.child(format!("{fp}_stats.properties"))
        .assert(content(predicate::str::contains("totalTokens=3")));
    spam.child(format!("{fp}.complete"))
        .assert(predicate::path::is_file());
    temp.child("messages")
        .child("ham")
        .child(format!("{fp}.complete"))
        .assert(predicate::path::missing());
}

#[test]
fn test_merge_archives_into_shards() {
    let temp = assert_fs::TempDir::new().unwrap();
    let c = Classifier::open(temp.child("messages").path(), temp.child("stats").path()).unwrap();
    let fp = c.train("lunch on friday", false, true).unwrap().fingerprint().clone();

    let pending = temp.child("messages").child("ham");
    pending
        .child(format!("{fp}.complete"))
        .assert(predicate::path::missing());

    let archived = temp
        .child("messages")
        .child("ham_archive")
        .child(shard(&fp));
    for suffix in ["_tokens.properties", "_stats.properties", ".complete"] {
        archived
            .child(format!("{fp}{suffix}"))
            .assert(predicate::path::is_file());
    }

    temp.child("stats")
        .child(PROCESSED_LOG_FILE)
        .assert(content(predicate::str::contains(fp.as_str())));
}

#[test]
fn test_stats_files_written_after_merge() {
    let temp = assert_fs::TempDir::new().unwrap();
    let c = Classifier::open(temp.child("messages").path(), temp.child("stats").path()).unwrap();
    c.train("cheap pills", true, true).unwrap();
    c.train("team meeting", false, true).unwrap();

    let stats = temp.child("stats");
    stats.child(TOTALS_FILE).assert(content(
        predicate::str::contains("totalSpam=1")
            .and(predicate::str::contains("totalHam=1"))
            .and(predicate::str::contains("totalSpamTokens=2"))
            .and(predicate::str::contains("totalHamTokens=2"))
            .and(predicate::str::starts_with("#\n#")),
    ));
    stats
        .child(SPAM_TOKENS_FILE)
        .assert(content(
            predicate::str::contains("cheap=1").and(predicate::str::contains("pills=1")),
        ));
    stats
        .child(HAM_TOKENS_FILE)
        .assert(content(predicate::str::contains("meeting=1")));
    stats
        .child(STOP_WORDS_FILE)
        .assert(content(predicate::str::contains("the\n")));
}

#[test]
fn test_legacy_md5_named_record_merges() {
    let temp = assert_fs::TempDir::new().unwrap();
    let legacy = "0cc175b9c0f1b6a831c399e269772661";
    let spam = temp.child("messages").child("spam");
    spam.child(format!("{legacy}_tokens.properties"))
        .write_str("#\nwin=2\nprize=1\n")
        .unwrap();
    spam.child(format!("{legacy}_stats.properties"))
        .write_str("totalTokens=3\n")
        .unwrap();
    spam.child(format!("{legacy}.complete")).touch().unwrap();

    let c = Classifier::open(temp.child("messages").path(), temp.child("stats").path()).unwrap();
    let report = c.merge_stats().unwrap();
    assert_eq!(report.spam_messages, 1);
    assert_eq!(c.snapshot().token_count(Label::Spam, "win"), 2);

    temp.child("messages")
        .child("spam_archive")
        .child("0/c/c/1/7")
        .child(format!("{legacy}.complete"))
        .assert(predicate::path::is_file());
}
