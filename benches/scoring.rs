use criterion::{criterion_group, criterion_main, Criterion};

use spamfilter::model::{AggregateStats, Fingerprint, Label, PendingRecord};
use spamfilter::scoring::spam_probability;
use spamfilter::tokenizer::Tokenizer;

const SPAM: &str = "Congratulations you have won a free cruise claim your prize now \
    limited offer cheap pills no prescription act now winner";
const HAM: &str = "Hi team the quarterly report is attached please review before the \
    meeting on thursday and send comments to the list";

fn trained_stats() -> AggregateStats {
    let mut stats = AggregateStats::default();
    let stop = stats.stop_words.clone();
    for i in 0..500 {
        for (label, base) in [(Label::Spam, SPAM), (Label::Ham, HAM)] {
            let text = format!("{base} token{i} variant{}", i % 37);
            let record = PendingRecord::from_tokens(
                Fingerprint::of(&text),
                Tokenizer::new(&text, &stop).tokens(),
            );
            stats.fold(label, &record);
        }
    }
    stats
}

fn bench_tokenize(c: &mut Criterion) {
    let stats = AggregateStats::default();
    let text = SPAM.repeat(50);
    c.bench_function("tokenize_counts", |b| {
        b.iter(|| Tokenizer::new(&text, &stats.stop_words).counts())
    });
}

fn bench_score(c: &mut Criterion) {
    let stats = trained_stats();
    c.bench_function("score_short_message", |b| {
        b.iter(|| {
            spam_probability(&stats, Tokenizer::new(SPAM, &stats.stop_words).tokens()).unwrap()
        })
    });
}

fn bench_fingerprint(c: &mut Criterion) {
    let text = HAM.repeat(100);
    c.bench_function("fingerprint_4k", |b| b.iter(|| Fingerprint::of(&text)));
}

criterion_group!(benches, bench_tokenize, bench_score, bench_fingerprint);
criterion_main!(benches);
