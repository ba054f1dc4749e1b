//! `cairn` — command-line front end for a Cairn knowledge store.
//!
//! # Usage
//!
//! ```
//! cairn ingest --session 2026-10-17-a findings.jsonl
//! cairn record-session federal-reserve --session 2026-10-17-a --hours 1.5 origins
//! cairn stats federal-reserve
//! cairn contradictions federal-reserve --all
//! cairn resolve 6f1c... "Closed the gold window in August 1971"
//! cairn export federal-reserve --out fed.json
//! ```
//!
//! Results are printed to stdout as JSON; logs go to stderr.

mod settings;

use std::{
  io::{self, Read as _},
  path::PathBuf,
};

use anyhow::{Context as _, Result};
use cairn_core::{finding::Finding, store::KnowledgeStore};
use cairn_store_sqlite::SqliteStore;
use clap::{Parser, Subcommand};
use serde::Serialize;
use settings::Settings;
use tokio_util::sync::CancellationToken;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Accumulate research findings into a knowledge store")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "cairn.toml")]
  config: PathBuf,

  /// Database file; overrides `store_path` from the config.
  #[arg(long, env = "CAIRN_STORE")]
  store: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Ingest findings from a JSON-lines file (`-` for stdin).
  Ingest {
    /// Session the findings belong to.
    #[arg(short, long)]
    session: String,
    file:    PathBuf,
  },
  /// Record a finished research session against a topic.
  RecordSession {
    topic:     String,
    #[arg(short, long)]
    session:   String,
    #[arg(long)]
    hours:     f64,
    /// Subtopics the session explored.
    subtopics: Vec<String>,
  },
  /// Queue subtopics for future sessions.
  Plan {
    topic:     String,
    #[arg(required = true)]
    subtopics: Vec<String>,
  },
  /// Show counts and progress for a topic.
  Stats { topic: String },
  /// List contradictions awaiting review.
  Contradictions {
    topic: String,
    /// Include resolved contradictions.
    #[arg(long)]
    all:   bool,
  },
  /// Mark a contradiction as reviewed.
  Resolve { id: Uuid, resolution: String },
  /// Dump everything known about a topic.
  Export {
    topic: String,
    #[arg(short, long)]
    out:   Option<PathBuf>,
  },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(&cli.config)?;
  let store_path = cli.store.unwrap_or_else(|| settings.store_path());

  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {}", parent.display()))?;
  }

  let store = SqliteStore::open(&store_path, settings.engine.clone())
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command {
    Command::Ingest { session, file } => {
      let findings = read_findings(&file)?;
      let cancel = CancellationToken::new();
      tokio::spawn({
        let cancel = cancel.clone();
        async move {
          if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; stopping after the current finding");
            cancel.cancel();
          }
        }
      });
      let summary = store.ingest_batch_until(session, findings, &cancel).await?;
      print_json(&summary)?;
    }
    Command::RecordSession { topic, session, hours, subtopics } => {
      let progress = store.record_session(topic, session, subtopics, hours).await?;
      print_json(&progress)?;
    }
    Command::Plan { topic, subtopics } => {
      let progress = store.plan_subtopics(topic, subtopics).await?;
      print_json(&progress)?;
    }
    Command::Stats { topic } => {
      print_json(&store.query_stats(&topic).await?)?;
    }
    Command::Contradictions { topic, all } => {
      print_json(&store.query_contradictions(&topic, all).await?)?;
    }
    Command::Resolve { id, resolution } => {
      print_json(&store.resolve_contradiction(id, resolution).await?)?;
    }
    Command::Export { topic, out } => {
      let snapshot = store.export_all(&topic).await?;
      match out {
        Some(path) => {
          let json = serde_json::to_string_pretty(&snapshot)?;
          std::fs::write(&path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
          tracing::info!(path = %path.display(), nodes = snapshot.nodes.len(), "export written");
        }
        None => print_json(&snapshot)?,
      }
    }
  }

  Ok(())
}

/// Parse one [`Finding`] per non-blank line.
fn read_findings(path: &PathBuf) -> Result<Vec<Finding>> {
  let raw = if path.as_os_str() == "-" {
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf).context("failed to read stdin")?;
    buf
  } else {
    std::fs::read_to_string(path)
      .with_context(|| format!("failed to read {}", path.display()))?
  };

  raw
    .lines()
    .enumerate()
    .filter(|(_, line)| !line.trim().is_empty())
    .map(|(n, line)| {
      serde_json::from_str(line).with_context(|| format!("line {}: malformed finding", n + 1))
    })
    .collect()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
