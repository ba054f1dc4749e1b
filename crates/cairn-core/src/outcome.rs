//! What the engine reports back to collaborators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  claim::{Claim, ClaimId},
  contradiction::Contradiction,
  finding::{ClusterId, Node, NodeId},
  progress::Progress,
};

// ─── Per finding ─────────────────────────────────────────────────────────────

/// The outcome of one ingest transaction.
///
/// Precedence when several apply: a flagged contradiction wins, then joining
/// an existing cluster, then updating an existing claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestKind {
  /// Verbatim repeat of an existing node; nothing was written.
  Duplicate,
  /// Joined an existing cluster.
  Clustered,
  /// Opened a new cluster (or stayed unclustered) and created a claim.
  NewClaim,
  /// Opened a new cluster (or stayed unclustered) and restated a claim.
  ClaimUpdated,
  /// The finding's claim contradicts a claim already in scope.
  ContradictionFlagged,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestIds {
  /// The new node, or the existing node for a duplicate.
  pub node:          Option<NodeId>,
  pub cluster:       Option<ClusterId>,
  pub claim:         Option<ClaimId>,
  /// The contradiction row, whether created now or already present.
  pub contradiction: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestResult {
  pub kind:        IngestKind,
  pub ids:         IngestIds,
  /// A new cluster was opened for this finding.
  pub new_cluster: bool,
  /// Scoring failed; the node was stored unclustered and contradiction
  /// checking was skipped.
  pub degraded:    bool,
}

impl IngestResult {
  pub fn duplicate(existing: NodeId) -> Self {
    Self {
      kind:        IngestKind::Duplicate,
      ids:         IngestIds { node: Some(existing), ..Default::default() },
      new_cluster: false,
      degraded:    false,
    }
  }
}

// ─── Per session ─────────────────────────────────────────────────────────────

/// A finding a batch refused before writing anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedFinding {
  /// Position in the submitted batch.
  pub index:  usize,
  pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
  pub session_id:     String,
  /// Findings that completed a transaction (duplicates included).
  pub processed:      usize,
  pub new_claims:     usize,
  pub claims_updated: usize,
  pub duplicates:     usize,
  pub clustered:      usize,
  pub new_clusters:   usize,
  pub contradictions: usize,
  pub degraded:       usize,
  pub rejected:       Vec<RejectedFinding>,
  /// The batch stopped early; everything counted above is committed.
  pub cancelled:      bool,
}

impl SessionSummary {
  pub fn new(session_id: impl Into<String>) -> Self {
    Self { session_id: session_id.into(), ..Default::default() }
  }

  pub fn record(&mut self, result: &IngestResult) {
    self.processed += 1;
    match result.kind {
      IngestKind::Duplicate => self.duplicates += 1,
      IngestKind::Clustered => self.clustered += 1,
      IngestKind::NewClaim => self.new_claims += 1,
      IngestKind::ClaimUpdated => self.claims_updated += 1,
      IngestKind::ContradictionFlagged => self.contradictions += 1,
    }
    if result.new_cluster {
      self.new_clusters += 1;
    }
    if result.degraded {
      self.degraded += 1;
    }
  }

  pub fn reject(&mut self, index: usize, reason: impl Into<String>) {
    self.rejected.push(RejectedFinding { index, reason: reason.into() });
  }
}

// ─── Queries ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
  pub topic:                String,
  pub total_nodes:          u64,
  pub total_claims:         u64,
  pub total_contradictions: u64,
  pub total_clusters:       u64,
  /// Exact repeats skipped since this store was opened.
  pub duplicates_avoided:   u64,
  pub progress:             Option<Progress>,
}

/// Everything the store holds for one topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeSnapshot {
  pub topic:          String,
  pub exported_at:    DateTime<Utc>,
  pub nodes:          Vec<Node>,
  pub claims:         Vec<Claim>,
  pub contradictions: Vec<Contradiction>,
  pub progress:       Option<Progress>,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn result(kind: IngestKind, new_cluster: bool, degraded: bool) -> IngestResult {
    IngestResult { kind, ids: IngestIds::default(), new_cluster, degraded }
  }

  #[test]
  fn summary_counts_each_kind() {
    let mut s = SessionSummary::new("s1");
    s.record(&result(IngestKind::NewClaim, true, false));
    s.record(&result(IngestKind::Clustered, false, false));
    s.record(&IngestResult::duplicate(Uuid::nil()));
    s.record(&result(IngestKind::ContradictionFlagged, true, false));
    s.record(&result(IngestKind::ClaimUpdated, false, true));
    s.reject(5, "empty");

    assert_eq!(s.processed, 5);
    assert_eq!(s.new_claims, 1);
    assert_eq!(s.clustered, 1);
    assert_eq!(s.duplicates, 1);
    assert_eq!(s.contradictions, 1);
    assert_eq!(s.claims_updated, 1);
    assert_eq!(s.new_clusters, 2);
    assert_eq!(s.degraded, 1);
    assert_eq!(s.rejected.len(), 1);
  }

  #[test]
  fn kind_serializes_snake_case() {
    assert_eq!(
      serde_json::to_string(&IngestKind::ContradictionFlagged).unwrap(),
      "\"contradiction_flagged\""
    );
  }
}
