//! # chatsift CLI (`sift`)
//!
//! The `sift` binary is the front-end for the extraction engine. It locates
//! store directories, captures lock-free snapshot copies, and runs the
//! extraction queries against a snapshot dump.
//!
//! ## Usage
//!
//! ```bash
//! sift [--config ./config/sift.toml] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `sift discover` | List known store locations on this machine |
//! | `sift snapshot <store-dir>` | Copy a live store to a private location |
//! | `sift list --snapshot <dump>` | List all extracted conversations |
//! | `sift unread --snapshot <dump>` | List conversations with unread content |
//! | `sift recent --snapshot <dump>` | List recently active conversations |
//!
//! The extraction commands read a JSONL snapshot dump (one
//! `{"store", "key", "value"}` object per line) as produced by an external
//! store reader pointed at a snapshot copy.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use chatsift::config::{self, Config};
use chatsift::discovery;
use chatsift::models::Conversation;
use chatsift::snapshot::Snapshot;
use chatsift::source::JsonlSource;
use chatsift::Extraction;

/// chatsift — a local-first conversation extraction and unread-detection
/// engine for desktop chat clients.
#[derive(Parser)]
#[command(
    name = "sift",
    about = "chatsift — conversation extraction and unread detection for desktop chat clients",
    version,
    long_about = "chatsift reconstructs conversations, messages, profiles, and unread state \
    from a snapshot of a desktop chat client's local key-value store. The engine is read-only: \
    it never writes to the store, marks anything read, or sends messages."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// When omitted, `./config/sift.toml` is used if present, otherwise the
    /// built-in defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// List known store locations on this machine.
    ///
    /// Checks the well-known install and browser-profile paths for the
    /// current platform and reports each hit with its validity.
    Discover,

    /// Capture a lock-free copy of a live store directory.
    ///
    /// Copies everything except the lock files, so an external store reader
    /// can open the copy while the client keeps running.
    Snapshot {
        /// The live store directory to copy.
        store_dir: PathBuf,

        /// Keep the copy on disk and print its path (it is otherwise
        /// removed when the command exits).
        #[arg(long)]
        keep: bool,
    },

    /// List all extracted conversations, newest first.
    List {
        /// Path to the JSONL snapshot dump.
        #[arg(long)]
        snapshot: PathBuf,

        /// Maximum number of conversations to print.
        #[arg(long, default_value_t = 10)]
        limit: usize,

        /// Exclude hidden/archived conversations.
        #[arg(long)]
        exclude_hidden: bool,
    },

    /// List conversations with unread content, newest first.
    Unread {
        /// Path to the JSONL snapshot dump.
        #[arg(long)]
        snapshot: PathBuf,

        /// Maximum number of conversations to print.
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// List conversations active within the last N hours.
    Recent {
        /// Path to the JSONL snapshot dump.
        #[arg(long)]
        snapshot: PathBuf,

        /// Look-back window in hours.
        #[arg(long, default_value_t = 24)]
        hours: i64,

        /// Maximum number of conversations to print.
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("chatsift=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = load_cli_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Discover => run_discover(),
        Commands::Snapshot { store_dir, keep } => run_snapshot(&cfg, &store_dir, keep)?,
        Commands::List {
            snapshot,
            limit,
            exclude_hidden,
        } => {
            let mut cfg = cfg;
            if exclude_hidden {
                cfg.filters.exclude_hidden = true;
            }
            let source = JsonlSource::new(snapshot);
            let extraction = chatsift::extract(&source, &cfg).await?;
            print_conversations("conversations", &extraction, limit, false);
        }
        Commands::Unread { snapshot, limit } => {
            let source = JsonlSource::new(snapshot);
            let extraction = chatsift::unread_only(&source, &cfg).await?;
            print_conversations("unread conversations", &extraction, limit, true);
        }
        Commands::Recent {
            snapshot,
            hours,
            limit,
        } => {
            let source = JsonlSource::new(snapshot);
            let mut extraction = chatsift::extract(&source, &cfg).await?;
            let cutoff = chrono::Utc::now() - chrono::Duration::hours(hours);
            extraction
                .conversations
                .retain(|c| c.last_message_time.as_utc().is_some_and(|t| t >= cutoff));
            print_conversations(
                &format!("conversations in the last {} hours", hours),
                &extraction,
                limit,
                false,
            );
        }
    }

    Ok(())
}

fn load_cli_config(explicit: Option<&std::path::Path>) -> Result<Config> {
    match explicit {
        Some(path) => config::load_config(path),
        None => {
            let default_path = PathBuf::from("./config/sift.toml");
            if default_path.exists() {
                config::load_config(&default_path)
            } else {
                Ok(Config::default())
            }
        }
    }
}

fn run_discover() {
    let locations = discovery::discover();
    if locations.is_empty() {
        println!("No store locations found on this machine.");
        return;
    }

    println!("{:<28} {:<10} {:>4}   {}", "SOURCE", "PLATFORM", "PRI", "PATH");
    for loc in &locations {
        let status = if discovery::validate(loc) { "" } else { "  (invalid)" };
        println!(
            "{:<28} {:<10} {:>4}   {}{}",
            loc.source,
            loc.platform,
            loc.priority,
            loc.path.display(),
            status
        );
    }
    println!("ok");
}

fn run_snapshot(cfg: &Config, store_dir: &std::path::Path, keep: bool) -> Result<()> {
    let snapshot = Snapshot::capture(store_dir, &cfg.snapshot)?;
    println!("snapshot {}", store_dir.display());
    println!("  files copied: {}", snapshot.files_copied);
    println!("  lock files skipped: {}", snapshot.files_skipped);
    if keep {
        let path = snapshot.persist();
        println!("  kept at: {}", path.display());
    }
    println!("ok");
    Ok(())
}

fn print_conversations(label: &str, extraction: &Extraction, limit: usize, unread_detail: bool) {
    println!("Found {} {}.", extraction.conversations.len(), label);
    println!();

    for conv in extraction.conversations.iter().take(limit) {
        print_conversation(conv, unread_detail);
    }

    let stats = &extraction.stats;
    println!("  resolved: {}", stats.conversations_resolved);
    println!("  filtered: {}", stats.conversations_filtered);
    if stats.malformed_records > 0 {
        println!("  malformed records skipped: {}", stats.malformed_records);
    }
    if stats.unclassified_records > 0 {
        println!("  unclassified records skipped: {}", stats.unclassified_records);
    }
    println!("ok");
}

fn print_conversation(conv: &Conversation, unread_detail: bool) {
    println!("{} [{}]", conv.title, conv.thread_type);
    println!("  id: {}", conv.id);
    println!("  last active: {}", conv.last_message_time);
    println!("  cached messages: {}", conv.messages.len());
    if conv.unread_count > 0 {
        println!("  unread: {}", conv.unread_count);
    }

    // Unread view shows the unread messages; the plain view the last three.
    let shown: Vec<_> = if unread_detail {
        let unread: Vec<_> = conv.messages.iter().filter(|m| m.is_unread).collect();
        if unread.is_empty() {
            conv.messages.iter().rev().take(3).rev().collect()
        } else {
            unread
        }
    } else {
        conv.messages.iter().rev().take(3).rev().collect()
    };

    for msg in shown {
        let preview: String = msg.content.chars().take(100).collect();
        println!("  [{}] {}: {}", msg.timestamp, msg.sender_name, preview);
    }
    println!();
}
