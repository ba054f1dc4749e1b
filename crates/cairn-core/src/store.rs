//! The `KnowledgeStore` trait — the entry points collaborators call.
//!
//! Implemented by storage backends (e.g. `cairn-store-sqlite`). Fetchers,
//! extractors and report writers depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  contradiction::Contradiction,
  finding::Finding,
  outcome::{IngestResult, KnowledgeSnapshot, SessionSummary, Stats},
  progress::Progress,
};

/// Abstraction over a knowledge-accumulation backend.
///
/// Every ingest runs as one atomic, serialized transaction. Reads observe the
/// last committed state and never a partially applied finding.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait KnowledgeStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Ingestion ─────────────────────────────────────────────────────────

  /// Run one finding through normalize → dedup → cluster → claim →
  /// contradiction → persist.
  fn ingest(
    &self,
    finding: Finding,
  ) -> impl Future<Output = Result<IngestResult, Self::Error>> + Send + '_;

  /// Ingest a session's findings in order, each in its own transaction.
  /// Every finding is stamped with `session_id`.
  fn ingest_batch(
    &self,
    session_id: String,
    findings: Vec<Finding>,
  ) -> impl Future<Output = Result<SessionSummary, Self::Error>> + Send + '_;

  // ── Progress ──────────────────────────────────────────────────────────

  /// Commit a finished session's subtopics and hours to the topic's
  /// progress. Fails if `session_id` was already recorded.
  fn record_session(
    &self,
    topic: String,
    session_id: String,
    subtopics: Vec<String>,
    hours: f64,
  ) -> impl Future<Output = Result<Progress, Self::Error>> + Send + '_;

  /// Queue subtopics as pending for `topic`.
  fn plan_subtopics(
    &self,
    topic: String,
    subtopics: Vec<String>,
  ) -> impl Future<Output = Result<Progress, Self::Error>> + Send + '_;

  // ── Review ────────────────────────────────────────────────────────────

  /// Mark a contradiction reviewed. The record itself is kept.
  fn resolve_contradiction(
    &self,
    id: Uuid,
    resolution: String,
  ) -> impl Future<Output = Result<Contradiction, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  fn query_stats<'a>(
    &'a self,
    topic: &'a str,
  ) -> impl Future<Output = Result<Stats, Self::Error>> + Send + 'a;

  /// Contradictions for `topic`; resolved ones only when `include_resolved`.
  fn query_contradictions<'a>(
    &'a self,
    topic: &'a str,
    include_resolved: bool,
  ) -> impl Future<Output = Result<Vec<Contradiction>, Self::Error>> + Send + 'a;

  /// A consistent copy of every table's rows for `topic`.
  fn export_all<'a>(
    &'a self,
    topic: &'a str,
  ) -> impl Future<Output = Result<KnowledgeSnapshot, Self::Error>> + Send + 'a;
}
