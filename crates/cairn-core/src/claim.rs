//! Claims — distilled assertions with running evidence.
//!
//! Claim identity is the exact canonical text; near-duplicate wording is the
//! clusterer's concern, not this module's. Confidence is always derived from
//! the evidence lists and is recomputed on every change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::finding::NodeId;

pub type ClaimId = Uuid;

/// Whether a node backs or disputes a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
  Support,
  Contradiction,
}

/// Laplace-smoothed support ratio whose prior success mass is the extraction
/// confidence of the finding that created the claim.
///
/// Strictly increasing in `support`, strictly decreasing in `contradicting`
/// (for `support >= 1`), and always within [0, 1].
pub fn derive_confidence(support: usize, contradicting: usize, origin: f64) -> f64 {
  let origin = if origin.is_finite() { origin.clamp(0.0, 1.0) } else { 0.0 };
  let s = support as f64;
  let x = contradicting as f64;
  ((s + origin) / (s + x + 2.0)).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
  pub id:                  ClaimId,
  pub claim:               String,
  pub evidence_count:      usize,
  pub supporting_nodes:    Vec<NodeId>,
  pub contradicting_nodes: Vec<NodeId>,
  pub confidence:          f64,
  pub first_seen:          DateTime<Utc>,
  pub last_updated:        DateTime<Utc>,
  pub topic:               String,
  /// Extraction confidence of the creating finding.
  pub origin_confidence:   f64,
}

impl Claim {
  /// A claim first asserted by `node`.
  pub fn new(
    claim: impl Into<String>,
    topic: impl Into<String>,
    node: NodeId,
    origin_confidence: f64,
    now: DateTime<Utc>,
  ) -> Self {
    let mut created = Self {
      id: Uuid::new_v4(),
      claim: claim.into(),
      evidence_count: 0,
      supporting_nodes: Vec::new(),
      contradicting_nodes: Vec::new(),
      confidence: 0.0,
      first_seen: now,
      last_updated: now,
      topic: topic.into(),
      origin_confidence,
    };
    created.add_evidence(node, Polarity::Support, now);
    created
  }

  /// Link `node` as evidence. A node already linked on either side is
  /// ignored and `false` is returned.
  pub fn add_evidence(
    &mut self,
    node: NodeId,
    polarity: Polarity,
    now: DateTime<Utc>,
  ) -> bool {
    if self.supporting_nodes.contains(&node) || self.contradicting_nodes.contains(&node) {
      return false;
    }
    match polarity {
      Polarity::Support => self.supporting_nodes.push(node),
      Polarity::Contradiction => self.contradicting_nodes.push(node),
    }
    self.recompute();
    self.last_updated = now;
    true
  }

  fn recompute(&mut self) {
    self.evidence_count = self.supporting_nodes.len() + self.contradicting_nodes.len();
    self.confidence = derive_confidence(
      self.supporting_nodes.len(),
      self.contradicting_nodes.len(),
      self.origin_confidence,
    );
  }
}

/// Result of [`upsert`].
#[derive(Debug, Clone)]
pub struct ClaimUpsert {
  pub claim:   Claim,
  pub created: bool,
}

/// Create the claim or add `node` to the existing one.
///
/// A claim is only ever created by supporting evidence; `polarity` applies
/// when `existing` is `Some`.
pub fn upsert(
  existing: Option<Claim>,
  text: &str,
  topic: &str,
  node: NodeId,
  polarity: Polarity,
  origin_confidence: f64,
  now: DateTime<Utc>,
) -> ClaimUpsert {
  match existing {
    Some(mut claim) => {
      claim.add_evidence(node, polarity, now);
      ClaimUpsert { claim, created: false }
    }
    None => ClaimUpsert {
      claim:   Claim::new(text, topic, node, origin_confidence, now),
      created: true,
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn node(n: u128) -> NodeId { Uuid::from_u128(n) }

  #[test]
  fn confidence_is_bounded() {
    for s in 0..6 {
      for x in 0..6 {
        for origin in [0.0, 0.3, 1.0, 7.0, -1.0, f64::NAN] {
          let c = derive_confidence(s, x, origin);
          assert!((0.0..=1.0).contains(&c), "s={s} x={x} o={origin} -> {c}");
        }
      }
    }
  }

  #[test]
  fn support_strictly_raises_confidence() {
    for origin in [0.0, 0.5, 1.0] {
      for x in 0..4 {
        for s in 1..8 {
          assert!(
            derive_confidence(s + 1, x, origin) > derive_confidence(s, x, origin),
            "s={s} x={x} o={origin}"
          );
        }
      }
    }
  }

  #[test]
  fn contradiction_strictly_lowers_confidence() {
    for origin in [0.0, 0.5, 1.0] {
      for s in 1..5 {
        for x in 0..8 {
          assert!(derive_confidence(s, x + 1, origin) < derive_confidence(s, x, origin));
        }
      }
    }
  }

  #[test]
  fn origin_matters_most_for_single_evidence() {
    let spread_1 = derive_confidence(1, 0, 1.0) - derive_confidence(1, 0, 0.0);
    let spread_10 = derive_confidence(10, 0, 1.0) - derive_confidence(10, 0, 0.0);
    assert!(spread_1 > spread_10);
  }

  #[test]
  fn upsert_creates_then_accumulates() {
    let now = Utc::now();
    let first = upsert(None, "gold standard ended", "t", node(1), Polarity::Support, 0.8, now);
    assert!(first.created);
    assert_eq!(first.claim.evidence_count, 1);
    assert_eq!(first.claim.supporting_nodes, vec![node(1)]);
    let c1 = first.claim.confidence;

    let second = upsert(
      Some(first.claim),
      "gold standard ended",
      "t",
      node(2),
      Polarity::Support,
      0.1,
      now,
    );
    assert!(!second.created);
    assert_eq!(second.claim.evidence_count, 2);
    assert_eq!(second.claim.origin_confidence, 0.8);
    assert!(second.claim.confidence > c1);

    let third = upsert(
      Some(second.claim.clone()),
      "gold standard ended",
      "t",
      node(3),
      Polarity::Contradiction,
      0.9,
      now,
    );
    assert_eq!(third.claim.evidence_count, 3);
    assert_eq!(third.claim.contradicting_nodes, vec![node(3)]);
    assert!(third.claim.confidence < second.claim.confidence);
  }

  #[test]
  fn relinking_a_node_is_ignored() {
    let now = Utc::now();
    let mut claim = Claim::new("x", "t", node(1), 0.5, now);
    let before = claim.confidence;
    assert!(!claim.add_evidence(node(1), Polarity::Contradiction, now));
    assert_eq!(claim.evidence_count, 1);
    assert_eq!(claim.confidence, before);
  }
}
