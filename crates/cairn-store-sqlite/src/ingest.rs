//! The ingest transaction: one finding, start to commit.
//!
//! Runs synchronously on the writer connection's thread. Because every
//! writer call is queued onto that one thread, the read-modify-write steps
//! here (cluster assignment, claim evidence) never interleave with another
//! ingest.

use std::sync::{Arc, Mutex};

use cairn_core::{
  claim::{self, Polarity},
  cluster::{Assignment, Cluster, Clusterer},
  config::EngineConfig,
  contradiction::{Conflict, Contradiction, ContradictionDetector},
  finding::{Finding, Node, NormalizedFinding},
  outcome::{IngestIds, IngestKind, IngestResult},
  scoring::{PolarityComparator, SimilarityScorer},
};
use chrono::Utc;
use rusqlite::{Connection, TransactionBehavior};
use tracing::{debug, warn};

use crate::{
  Result,
  cache::{CacheDelta, ClusterChange, EngineCache, lock},
  queries,
};

/// A finding that already passed validation and normalization.
#[derive(Debug, Clone)]
pub struct Prepared {
  pub finding:    Finding,
  pub normalized: NormalizedFinding,
  /// Canonical claim text.
  pub claim:      String,
}

/// Everything the ingest transaction needs besides the connection.
#[derive(Clone)]
pub struct Pipeline {
  pub config:     EngineConfig,
  pub scorer:     Arc<dyn SimilarityScorer>,
  pub comparator: Arc<dyn PolarityComparator>,
  pub cache:      Arc<Mutex<EngineCache>>,
}

impl Pipeline {
  pub fn run(&self, conn: &mut Connection, prepared: &Prepared) -> Result<IngestResult> {
    let Prepared { finding, normalized, claim: claim_text } = prepared;
    let topic = finding.topic.as_str();

    // ── Exact duplicate: no writes at all ─────────────────────────────────
    {
      let mut cache = lock(&self.cache);
      if let Some(existing) = cache.fingerprints.lookup(&normalized.fingerprint) {
        cache.note_duplicate(topic);
        debug!(node = %existing, topic, "duplicate finding skipped");
        return Ok(IngestResult::duplicate(existing));
      }
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let node_id = normalized.fingerprint.node_id();
    let now = Utc::now();
    let mut degraded = false;

    // ── Cluster assignment ────────────────────────────────────────────────
    let clusterer = Clusterer::new(self.config.dedup_threshold, self.config.cluster_related);
    let assigned = {
      let cache = lock(&self.cache);
      clusterer.assign(normalized, cache.clusters.candidates(topic), self.scorer.as_ref())
    };
    let mut assignment = match assigned {
      Ok(assignment) => Some(assignment),
      Err(e) => {
        warn!(node = %node_id, topic, error = %e, "similarity failed; storing unclustered");
        degraded = true;
        None
      }
    };

    // ── Contradiction check ───────────────────────────────────────────────
    let mut conflict: Option<Conflict> = None;
    if self.config.track_contradictions && !degraded {
      let scope_cluster = match assignment {
        Some(Assignment::Join { cluster_id, .. }) => Some(cluster_id),
        _ => None,
      };
      let scope = queries::claims_in_scope(
        &tx,
        claim_text,
        scope_cluster,
        topic,
        finding.subtopic.as_deref(),
      )?;
      let detector = ContradictionDetector::new(self.config.contradiction_floor);
      match detector.check(claim_text, node_id, &scope, self.comparator.as_ref()) {
        Ok(found) => conflict = found,
        Err(e) => {
          warn!(
            node = %node_id, topic, error = %e,
            "contradiction check failed; storing unclustered"
          );
          degraded = true;
          assignment = None;
        }
      }
    }

    // ── Node ──────────────────────────────────────────────────────────────
    let cluster_id = match assignment {
      Some(Assignment::Join { cluster_id, .. }) => Some(cluster_id),
      Some(Assignment::Open) => Some(node_id),
      None => None,
    };
    let node = Node {
      id: node_id,
      content: finding.text.trim().to_owned(),
      content_hash: normalized.fingerprint.to_hex(),
      cluster_id,
      source: finding.source.clone(),
      confidence: finding.confidence,
      timestamp: finding.timestamp,
      session_id: finding.session_id.clone(),
      topic: topic.to_owned(),
      subtopic: finding.subtopic.clone(),
    };
    queries::insert_node(&tx, &node)?;

    // ── Claim ─────────────────────────────────────────────────────────────
    let existing = queries::find_claim(&tx, claim_text)?;
    let upsert = claim::upsert(
      existing,
      claim_text,
      topic,
      node_id,
      Polarity::Support,
      finding.confidence,
      now,
    );
    if upsert.created {
      queries::insert_claim(&tx, &upsert.claim)?;
    } else {
      queries::update_claim_evidence(&tx, &upsert.claim)?;
    }
    queries::link_evidence(&tx, upsert.claim.id, node_id, Polarity::Support)?;

    // ── Contradiction record ──────────────────────────────────────────────
    let mut contradiction_id = None;
    if let Some(Conflict { mut existing, pair, score }) = conflict {
      if existing.add_evidence(node_id, Polarity::Contradiction, now) {
        queries::update_claim_evidence(&tx, &existing)?;
        queries::link_evidence(&tx, existing.id, node_id, Polarity::Contradiction)?;
      }
      let id = match queries::find_contradiction(&tx, &pair)? {
        Some(id) => id,
        None => {
          let record = Contradiction::open(pair, topic, now);
          queries::insert_contradiction(&tx, &record)?;
          record.id
        }
      };
      debug!(contradiction = %id, against = %existing.id, score, "contradiction flagged");
      contradiction_id = Some(id);
    }

    queries::ensure_progress(&tx, topic)?;
    tx.commit()?;

    // ── Caches follow the commit ──────────────────────────────────────────
    let change = match assignment {
      Some(Assignment::Join { cluster_id, .. }) => ClusterChange::Joined(cluster_id),
      Some(Assignment::Open) => {
        ClusterChange::Opened(Cluster::new(node_id, topic, normalized.text.clone()))
      }
      None => ClusterChange::Unclustered,
    };
    lock(&self.cache).apply(CacheDelta {
      fingerprint: normalized.fingerprint,
      node_id,
      topic: topic.to_owned(),
      cluster: change,
    });

    let kind = if contradiction_id.is_some() {
      IngestKind::ContradictionFlagged
    } else if matches!(assignment, Some(Assignment::Join { .. })) {
      IngestKind::Clustered
    } else if upsert.created {
      IngestKind::NewClaim
    } else {
      IngestKind::ClaimUpdated
    };

    debug!(node = %node_id, topic, ?kind, "finding committed");

    Ok(IngestResult {
      kind,
      ids: IngestIds {
        node:          Some(node_id),
        cluster:       cluster_id,
        claim:         Some(upsert.claim.id),
        contradiction: contradiction_id,
      },
      new_cluster: matches!(assignment, Some(Assignment::Open)),
      degraded,
    })
  }
}
