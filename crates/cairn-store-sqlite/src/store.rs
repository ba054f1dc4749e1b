//! [`SqliteStore`] — the SQLite implementation of [`KnowledgeStore`].

use std::{
  path::Path,
  sync::{Arc, Mutex},
  time::Duration,
};

use cairn_core::{
  config::EngineConfig,
  contradiction::Contradiction,
  finding::Finding,
  normalize,
  outcome::{IngestResult, KnowledgeSnapshot, SessionSummary, Stats},
  progress::{self, Progress},
  scoring::{DiceScorer, NegationComparator, PolarityComparator, SimilarityScorer},
  store::KnowledgeStore,
};
use chrono::Utc;
use rusqlite::TransactionBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  cache::{EngineCache, lock},
  ingest::{Pipeline, Prepared},
  queries,
  schema::{READER_PRAGMAS, SCHEMA},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Cairn knowledge store backed by a single SQLite file.
///
/// Writes go through one connection, so ingest transactions are strictly
/// serialized. A file-backed store reads through a second, query-only
/// connection that sees the last committed state (WAL snapshot) without
/// blocking the writer. Cloning is cheap; clones share both connections and
/// the caches.
#[derive(Clone)]
pub struct SqliteStore {
  writer:   tokio_rusqlite::Connection,
  reader:   tokio_rusqlite::Connection,
  pipeline: Pipeline,
}

impl SqliteStore {
  /// Open (or create) a store at `path`, run schema initialisation, and
  /// rebuild the caches from the persisted nodes.
  pub async fn open(path: impl AsRef<Path>, config: EngineConfig) -> Result<Self> {
    config.validate()?;
    let path = path.as_ref().to_path_buf();
    let writer = tokio_rusqlite::Connection::open(&path).await?;
    let busy_timeout = Duration::from_millis(config.busy_timeout_ms);
    let cache = init_writer(&writer, busy_timeout).await?;

    let reader = tokio_rusqlite::Connection::open(&path).await?;
    reader
      .call(move |conn| {
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch(READER_PRAGMAS)?;
        Ok(())
      })
      .await?;

    info!(path = %path.display(), nodes = cache.fingerprints.len(), "store opened");
    Ok(Self::assemble(writer, reader, cache, config))
  }

  /// Open an in-memory store — useful for testing. Reads share the writer
  /// connection.
  pub async fn open_in_memory(config: EngineConfig) -> Result<Self> {
    config.validate()?;
    let writer = tokio_rusqlite::Connection::open_in_memory().await?;
    let cache =
      init_writer(&writer, Duration::from_millis(config.busy_timeout_ms)).await?;
    Ok(Self::assemble(writer.clone(), writer, cache, config))
  }

  fn assemble(
    writer: tokio_rusqlite::Connection,
    reader: tokio_rusqlite::Connection,
    cache: EngineCache,
    config: EngineConfig,
  ) -> Self {
    Self {
      writer,
      reader,
      pipeline: Pipeline {
        config,
        scorer: Arc::new(DiceScorer),
        comparator: Arc::new(NegationComparator::default()),
        cache: Arc::new(Mutex::new(cache)),
      },
    }
  }

  /// Replace the similarity scorer (e.g. with an embedding-backed or indexed
  /// implementation).
  pub fn with_scorer(mut self, scorer: Arc<dyn SimilarityScorer>) -> Self {
    self.pipeline.scorer = scorer;
    self
  }

  /// Replace the polarity comparator.
  pub fn with_comparator(mut self, comparator: Arc<dyn PolarityComparator>) -> Self {
    self.pipeline.comparator = comparator;
    self
  }

  pub fn config(&self) -> &EngineConfig { &self.pipeline.config }

  /// Run `f` on the writer connection, retrying on `SQLITE_BUSY` /
  /// `SQLITE_LOCKED` up to `max_transaction_retries` times.
  async fn write<T, F>(&self, op: &'static str, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: Fn(&mut rusqlite::Connection) -> Result<T> + Send + Sync + 'static,
  {
    let f = Arc::new(f);
    let max_retries = self.pipeline.config.max_transaction_retries;
    let mut attempts: u32 = 0;
    loop {
      attempts += 1;
      let call = Arc::clone(&f);
      let outcome = match self
        .writer
        .call(move |conn| Ok::<_, tokio_rusqlite::Error>(call(conn)))
        .await
      {
        Ok(inner) => inner,
        Err(e) => Err(Error::Database(e)),
      };
      match outcome {
        Err(e) if e.is_conflict() && attempts <= max_retries => {
          warn!(op, attempts, error = %e, "write conflict; retrying");
          tokio::time::sleep(Duration::from_millis(10 * u64::from(attempts))).await;
        }
        Err(e) if e.is_conflict() => {
          return Err(Error::TransactionConflict { attempts });
        }
        other => return other,
      }
    }
  }

  /// Run `f` on the reader connection.
  async fn read<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&mut rusqlite::Connection) -> Result<T> + Send + 'static,
  {
    self
      .reader
      .call(move |conn| Ok::<_, tokio_rusqlite::Error>(f(conn)))
      .await?
  }

  /// [`KnowledgeStore::ingest_batch`] that stops between findings once
  /// `cancel` fires. Findings committed before the stop stay committed.
  pub async fn ingest_batch_until(
    &self,
    session_id: String,
    findings: Vec<Finding>,
    cancel: &CancellationToken,
  ) -> Result<SessionSummary> {
    if session_id.trim().is_empty() {
      return Err(cairn_core::Error::InvalidInput("session id is empty".into()).into());
    }

    let mut summary = SessionSummary::new(session_id.clone());
    let total = findings.len();
    for (index, mut finding) in findings.into_iter().enumerate() {
      if cancel.is_cancelled() {
        summary.cancelled = true;
        info!(session = %session_id, done = index, total, "session batch cancelled");
        break;
      }
      finding.session_id = session_id.clone();
      match self.ingest(finding).await {
        Ok(result) => summary.record(&result),
        Err(Error::Core(cairn_core::Error::InvalidInput(reason))) => {
          debug!(session = %session_id, index, %reason, "finding rejected");
          summary.reject(index, reason);
        }
        Err(e) => return Err(e),
      }
    }

    info!(
      session = %session_id,
      processed = summary.processed,
      new_claims = summary.new_claims,
      duplicates = summary.duplicates,
      clustered = summary.clustered,
      contradictions = summary.contradictions,
      rejected = summary.rejected.len(),
      "session batch committed"
    );
    Ok(summary)
  }
}

/// Apply the schema on the writer connection and rebuild the caches.
async fn init_writer(
  writer: &tokio_rusqlite::Connection,
  busy_timeout: Duration,
) -> Result<EngineCache> {
  writer
    .call(move |conn| {
      conn.busy_timeout(busy_timeout)?;
      conn.execute_batch(SCHEMA)?;
      Ok(EngineCache::rebuild(conn))
    })
    .await?
}

// ─── KnowledgeStore impl ─────────────────────────────────────────────────────

impl KnowledgeStore for SqliteStore {
  type Error = Error;

  // ── Ingestion ─────────────────────────────────────────────────────────────

  async fn ingest(&self, finding: Finding) -> Result<IngestResult> {
    normalize::validate(&finding)?;
    let normalized = normalize::normalize(&finding)?;
    let claim = normalize::canonical_claim(&finding, &normalized)?;
    let prepared = Prepared { finding, normalized, claim };

    let pipeline = self.pipeline.clone();
    self
      .write("ingest", move |conn| pipeline.run(conn, &prepared))
      .await
  }

  async fn ingest_batch(
    &self,
    session_id: String,
    findings: Vec<Finding>,
  ) -> Result<SessionSummary> {
    self
      .ingest_batch_until(session_id, findings, &CancellationToken::new())
      .await
  }

  // ── Progress ──────────────────────────────────────────────────────────────

  async fn record_session(
    &self,
    topic: String,
    session_id: String,
    subtopics: Vec<String>,
    hours: f64,
  ) -> Result<Progress> {
    if topic.trim().is_empty() || session_id.trim().is_empty() {
      return Err(
        cairn_core::Error::InvalidInput("topic and session id are required".into()).into(),
      );
    }
    progress::check_hours(hours)?;

    let progress = self
      .write("record_session", move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if queries::session_exists(&tx, &session_id)? {
          return Err(cairn_core::Error::DuplicateSession(session_id.clone()).into());
        }
        let now = Utc::now();
        let mut progress =
          queries::load_progress(&tx, &topic)?.unwrap_or_else(|| Progress::new(topic.clone()));
        progress.record_session(&subtopics, hours, now)?;
        queries::save_progress(&tx, &progress)?;
        queries::insert_session(&tx, &session_id, &topic, &subtopics, hours, now)?;
        tx.commit()?;
        Ok(progress)
      })
      .await?;

    info!(
      topic = %progress.topic,
      sessions = progress.total_sessions,
      hours = progress.total_hours,
      "session recorded"
    );
    Ok(progress)
  }

  async fn plan_subtopics(&self, topic: String, subtopics: Vec<String>) -> Result<Progress> {
    if topic.trim().is_empty() {
      return Err(cairn_core::Error::InvalidInput("topic is required".into()).into());
    }
    self
      .write("plan_subtopics", move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut progress =
          queries::load_progress(&tx, &topic)?.unwrap_or_else(|| Progress::new(topic.clone()));
        let added = progress.plan(&subtopics);
        queries::save_progress(&tx, &progress)?;
        tx.commit()?;
        debug!(topic = %topic, added, "subtopics planned");
        Ok(progress)
      })
      .await
  }

  // ── Review ────────────────────────────────────────────────────────────────

  async fn resolve_contradiction(&self, id: Uuid, resolution: String) -> Result<Contradiction> {
    if resolution.trim().is_empty() {
      return Err(cairn_core::Error::InvalidInput("resolution text is empty".into()).into());
    }
    self
      .write("resolve_contradiction", move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut record =
          queries::get_contradiction(&tx, id)?.ok_or(Error::ContradictionNotFound(id))?;
        if record.is_resolved() {
          return Err(Error::AlreadyResolved(id));
        }
        record.resolve(resolution.trim());
        queries::save_resolution(&tx, &record)?;
        tx.commit()?;
        Ok(record)
      })
      .await
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn query_stats(&self, topic: &str) -> Result<Stats> {
    let topic_owned = topic.to_owned();
    let (counts, progress) = self
      .read(move |conn| {
        let tx = conn.transaction()?;
        let counts = queries::topic_counts(&tx, &topic_owned)?;
        let progress = queries::load_progress(&tx, &topic_owned)?;
        Ok((counts, progress))
      })
      .await?;

    let duplicates_avoided = lock(&self.pipeline.cache).duplicates_avoided(topic);

    Ok(Stats {
      topic: topic.to_owned(),
      total_nodes: counts.nodes,
      total_claims: counts.claims,
      total_contradictions: counts.contradictions,
      total_clusters: counts.clusters,
      duplicates_avoided,
      progress,
    })
  }

  async fn query_contradictions(
    &self,
    topic: &str,
    include_resolved: bool,
  ) -> Result<Vec<Contradiction>> {
    let topic = topic.to_owned();
    self
      .read(move |conn| queries::contradictions_for_topic(conn, &topic, include_resolved))
      .await
  }

  async fn export_all(&self, topic: &str) -> Result<KnowledgeSnapshot> {
    let topic = topic.to_owned();
    self
      .read(move |conn| {
        let tx = conn.transaction()?;
        let snapshot = KnowledgeSnapshot {
          nodes:          queries::nodes_for_topic(&tx, &topic)?,
          claims:         queries::claims_for_topic(&tx, &topic)?,
          contradictions: queries::contradictions_for_topic(&tx, &topic, true)?,
          progress:       queries::load_progress(&tx, &topic)?,
          exported_at:    Utc::now(),
          topic,
        };
        Ok(snapshot)
      })
      .await
  }
}
