//! CLI entry point for `spamfilter`.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use spamfilter::config::{self, Config};
use spamfilter::merge::MergeReport;
use spamfilter::model::Label;
use spamfilter::{extract, Classifier, TrainOutcome};

#[derive(Parser)]
#[command(name = "spamfilter", version, about = "Naive Bayes spam classifier")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory of pending and archived training records
    #[arg(long, global = true, value_name = "DIR")]
    messages_dir: Option<PathBuf>,

    /// Directory of the aggregate statistics
    #[arg(long, global = true, value_name = "DIR")]
    stats_dir: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Train every file in a directory, then merge once
    Train {
        dir: PathBuf,
        /// "yes"/"y"/"1" for spam, anything else for ham
        #[arg(value_name = "IS_SPAM")]
        is_spam: String,
        /// Leave the records pending
        #[arg(long)]
        no_merge: bool,
    },
    /// Train a single message ("-" reads stdin)
    Mark {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        #[arg(value_name = "IS_SPAM")]
        is_spam: String,
    },
    /// Score a message ("-" reads stdin)
    Classify {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Merge pending training records
    Merge,
    /// Show aggregate statistics
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Reset the persisted statistics to defaults
    Clear,
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = config::load_config();
    if let Some(dir) = cli.messages_dir {
        config.data.messages_dir = Some(dir);
    }
    if let Some(dir) = cli.stats_dir {
        config.data.stats_dir = Some(dir);
    }

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Train {
            dir,
            is_spam,
            no_merge,
        } => cmd_train(&config, &dir, Label::from_flag_str(&is_spam), !no_merge),
        Commands::Mark { input, is_spam } => {
            cmd_mark(&config, &input, Label::from_flag_str(&is_spam))
        }
        Commands::Classify { input, json } => cmd_classify(&config, &input, json),
        Commands::Merge => cmd_merge(&config),
        Commands::Stats { json } => cmd_stats(&config, json),
        Commands::Clear => cmd_clear(&config),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = config.log_dir();
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, config::LOG_FILE_NAME);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

fn open_classifier(config: &Config) -> anyhow::Result<Classifier> {
    Classifier::from_config(config).with_context(|| {
        format!(
            "Cannot open training data in {} and {}",
            config.messages_dir().display(),
            config.stats_dir().display()
        )
    })
}

/// Read a raw message from a file, or stdin for `-`, and extract its text.
fn read_message(input: &Path) -> anyhow::Result<String> {
    let raw = if input == Path::new("-") {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        std::fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?
    };
    Ok(extract::extract_text(&raw))
}

fn progress_bar(len: u64, verb: &str) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} {verb} [{{bar:40.cyan/blue}}] {{pos}}/{{len}}"
            ))?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Train every regular file in `dir` with one label.
fn cmd_train(config: &Config, dir: &Path, label: Label, merge: bool) -> anyhow::Result<()> {
    if !dir.is_dir() {
        anyhow::bail!("Not a directory: {}", dir.display());
    }
    let classifier = open_classifier(config)?;

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    let start = Instant::now();
    let pb = progress_bar(files.len() as u64, "Training")?;
    let (mut trained, mut skipped) = (0u64, 0u64);
    for path in &files {
        let text = read_message(path)?;
        let outcome = classifier
            .train(&text, label.is_spam(), false)
            .with_context(|| format!("Failed to train {}", path.display()))?;
        if outcome.was_skipped() {
            skipped += 1;
        } else {
            trained += 1;
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    let report = if merge {
        let pb = progress_bar(0, "Merging")?;
        let report = classifier.merge_stats_with_progress(Some(&|current, total| {
            pb.set_length(total);
            pb.set_position(current);
        }))?;
        pb.finish_and_clear();
        Some(report)
    } else {
        None
    };

    println!();
    println!("  Training complete ({label}):");
    println!("  {:<25} {}", "Files", files.len());
    println!("  {:<25} {}", "Trained", trained);
    println!("  {:<25} {}", "Already processed", skipped);
    match report {
        Some(report) => println!("  {:<25} {}", "Merged", report.messages()),
        None => println!("  {:<25} {}", "Merged", "deferred"),
    }
    println!("  {:<25} {:.2?}", "Elapsed", start.elapsed());
    println!();
    Ok(())
}

/// Train a single message.
fn cmd_mark(config: &Config, input: &Path, label: Label) -> anyhow::Result<()> {
    let classifier = open_classifier(config)?;
    let text = read_message(input)?;
    let outcome = classifier.train(&text, label.is_spam(), config.classifier.commit_on_train)?;
    match outcome {
        TrainOutcome::AlreadyProcessed(fp) => println!("Already processed: {fp}"),
        TrainOutcome::Pending(fp) => println!("Marked as {label} (pending merge): {fp}"),
        TrainOutcome::Merged { fingerprint, .. } => println!("Marked as {label}: {fingerprint}"),
    }
    Ok(())
}

fn cmd_classify(config: &Config, input: &Path, json: bool) -> anyhow::Result<()> {
    let classifier = open_classifier(config)?;
    let text = read_message(input)?;
    let verdict = classifier.classify(&text)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
    } else {
        println!("{verdict}");
    }
    Ok(())
}

fn cmd_merge(config: &Config) -> anyhow::Result<()> {
    let classifier = open_classifier(config)?;
    let report = classifier.merge_stats()?;
    print_merge_report(&report);
    Ok(())
}

fn print_merge_report(report: &MergeReport) {
    println!();
    println!("  Merge complete:");
    println!("  {:<25} {}", "Spam messages", report.spam_messages);
    println!("  {:<25} {}", "Ham messages", report.ham_messages);
    println!("  {:<25} {}", "Spam tokens", report.spam_tokens);
    println!("  {:<25} {}", "Ham tokens", report.ham_tokens);
    println!();
}

fn cmd_stats(config: &Config, json: bool) -> anyhow::Result<()> {
    let classifier = open_classifier(config)?;
    let summary = classifier.summary()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    println!();
    println!("  {:<25} {}", "Spam messages", summary.total_spam_messages);
    println!("  {:<25} {}", "Ham messages", summary.total_ham_messages);
    println!("  {:<25} {}", "Spam tokens", summary.total_spam_tokens);
    println!("  {:<25} {}", "Ham tokens", summary.total_ham_tokens);
    println!("  {:<25} {}", "Spam vocabulary", summary.spam_vocabulary);
    println!("  {:<25} {}", "Ham vocabulary", summary.ham_vocabulary);
    println!("  {:<25} {}", "Stop words", summary.stop_words);
    println!("  {:<25} {}", "Pending spam", summary.pending_spam);
    println!("  {:<25} {}", "Pending ham", summary.pending_ham);
    println!("  {:<25} {}", "Stats directory", config.stats_dir().display());
    println!();
    Ok(())
}

/// Overwrite the persisted aggregate with defaults. The processed log and
/// the archives are kept.
fn cmd_clear(config: &Config) -> anyhow::Result<()> {
    let classifier = open_classifier(config)?;
    classifier.clear_stats();
    classifier.save_stats()?;
    println!("Statistics cleared in {}", config.stats_dir().display());
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "spamfilter", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}
