//! Contradiction detection between claims in the same scope.
//!
//! A contradiction is stored once per unordered claim pair. Records are never
//! deleted: resolving one clears `needs_review` and fills `resolution`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  claim::Claim,
  finding::NodeId,
  scoring::{PolarityComparator, ScoreError},
};

// ─── Records ─────────────────────────────────────────────────────────────────

/// An unordered claim pair in canonical order (`claim_1 < claim_2`), each side
/// with one supporting node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimPair {
  pub claim_1:    String,
  pub claim_2:    String,
  pub evidence_1: NodeId,
  pub evidence_2: NodeId,
}

impl ClaimPair {
  pub fn new(a: (&str, NodeId), b: (&str, NodeId)) -> Self {
    let (first, second) = if a.0 <= b.0 { (a, b) } else { (b, a) };
    Self {
      claim_1:    first.0.to_owned(),
      claim_2:    second.0.to_owned(),
      evidence_1: first.1,
      evidence_2: second.1,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contradiction {
  pub id:           Uuid,
  pub claim_1:      String,
  pub claim_2:      String,
  pub evidence_1:   NodeId,
  pub evidence_2:   NodeId,
  pub resolution:   Option<String>,
  pub needs_review: bool,
  pub topic:        String,
  pub detected_at:  DateTime<Utc>,
}

impl Contradiction {
  /// A freshly flagged contradiction awaiting review.
  pub fn open(pair: ClaimPair, topic: impl Into<String>, now: DateTime<Utc>) -> Self {
    Self {
      id:           Uuid::new_v4(),
      claim_1:      pair.claim_1,
      claim_2:      pair.claim_2,
      evidence_1:   pair.evidence_1,
      evidence_2:   pair.evidence_2,
      resolution:   None,
      needs_review: true,
      topic:        topic.into(),
      detected_at:  now,
    }
  }

  pub fn resolve(&mut self, resolution: impl Into<String>) {
    self.resolution = Some(resolution.into());
    self.needs_review = false;
  }

  pub fn is_resolved(&self) -> bool { !self.needs_review }
}

// ─── Detector ────────────────────────────────────────────────────────────────

/// The strongest conflict found for a new claim.
#[derive(Debug, Clone)]
pub struct Conflict {
  /// The existing claim the new one contradicts.
  pub existing: Claim,
  pub score:    f64,
  pub pair:     ClaimPair,
}

#[derive(Debug, Clone, Copy)]
pub struct ContradictionDetector {
  /// Minimum comparator score that counts as a conflict (inclusive).
  pub floor: f64,
}

impl ContradictionDetector {
  pub fn new(floor: f64) -> Self { Self { floor } }

  /// Compare `new_claim`, evidenced by `new_node`, against the claims in
  /// `scope`. The caller is responsible for scoping; this never looks beyond
  /// the slice.
  pub fn check(
    &self,
    new_claim: &str,
    new_node: NodeId,
    scope: &[Claim],
    comparator: &dyn PolarityComparator,
  ) -> Result<Option<Conflict>, ScoreError> {
    let mut best: Option<(&Claim, NodeId, f64)> = None;

    for existing in scope {
      if existing.claim == new_claim {
        continue;
      }
      let Some(&evidence) = existing.supporting_nodes.first() else {
        continue;
      };
      let score = comparator.conflict(new_claim, &existing.claim)?;
      if !(0.0..=1.0).contains(&score) {
        return Err(ScoreError(format!(
          "conflict score {score} against claim {} is outside [0, 1]",
          existing.id
        )));
      }
      if score < self.floor || score <= 0.0 {
        continue;
      }
      if best.is_none_or(|(_, _, s)| score > s) {
        best = Some((existing, evidence, score));
      }
    }

    Ok(best.map(|(existing, evidence, score)| Conflict {
      pair: ClaimPair::new((new_claim, new_node), (&existing.claim, evidence)),
      existing: existing.clone(),
      score,
    }))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  /// Flags any pair where exactly one side contains " not ".
  struct NotComparator;

  impl PolarityComparator for NotComparator {
    fn conflict(&self, a: &str, b: &str) -> Result<f64, ScoreError> {
      let neg = |s: &str| s.split_whitespace().any(|w| w == "not");
      Ok(if neg(a) != neg(b) { 0.9 } else { 0.0 })
    }
  }

  struct BrokenComparator;

  impl PolarityComparator for BrokenComparator {
    fn conflict(&self, _a: &str, _b: &str) -> Result<f64, ScoreError> {
      Err(ScoreError("timeout".into()))
    }
  }

  fn claim(text: &str, node: u128) -> Claim {
    Claim::new(text, "t", Uuid::from_u128(node), 0.5, Utc::now())
  }

  #[test]
  fn pair_order_is_canonical() {
    let ab = ClaimPair::new(("b claim", Uuid::from_u128(2)), ("a claim", Uuid::from_u128(1)));
    let ba = ClaimPair::new(("a claim", Uuid::from_u128(1)), ("b claim", Uuid::from_u128(2)));
    assert_eq!(ab, ba);
    assert_eq!(ab.claim_1, "a claim");
    assert_eq!(ab.evidence_1, Uuid::from_u128(1));
  }

  #[test]
  fn flags_conflict_in_scope() {
    let scope = vec![claim("gold standard ended in 1971", 1)];
    let got = ContradictionDetector::new(0.5)
      .check("gold standard was not ended in 1971", Uuid::from_u128(2), &scope, &NotComparator)
      .unwrap()
      .unwrap();
    assert_eq!(got.existing.claim, "gold standard ended in 1971");
    assert_eq!(got.pair.claim_1, "gold standard ended in 1971");
    assert_eq!(got.pair.evidence_2, Uuid::from_u128(2));
  }

  #[test]
  fn below_floor_is_ignored() {
    let scope = vec![claim("gold standard ended", 1)];
    let got = ContradictionDetector::new(0.95)
      .check("gold standard not ended", Uuid::from_u128(2), &scope, &NotComparator)
      .unwrap();
    assert!(got.is_none());
  }

  #[test]
  fn same_claim_is_never_compared() {
    let scope = vec![claim("not x", 1)];
    let got = ContradictionDetector::new(0.0)
      .check("not x", Uuid::from_u128(2), &scope, &BrokenComparator)
      .unwrap();
    assert!(got.is_none());
  }

  #[test]
  fn comparator_failure_propagates() {
    let scope = vec![claim("x", 1)];
    assert!(
      ContradictionDetector::new(0.5)
        .check("not x", Uuid::from_u128(2), &scope, &BrokenComparator)
        .is_err()
    );
  }

  #[test]
  fn out_of_range_conflict_score_is_reported() {
    struct Overshoot;

    impl PolarityComparator for Overshoot {
      fn conflict(&self, _a: &str, _b: &str) -> Result<f64, ScoreError> { Ok(3.5) }
    }

    let scope = vec![claim("x", 1)];
    assert!(
      ContradictionDetector::new(0.5)
        .check("not x", Uuid::from_u128(2), &scope, &Overshoot)
        .is_err()
    );
  }

  #[test]
  fn resolve_clears_review_flag() {
    let pair = ClaimPair::new(("a", Uuid::from_u128(1)), ("b", Uuid::from_u128(2)));
    let mut c = Contradiction::open(pair, "t", Utc::now());
    assert!(c.needs_review);
    c.resolve("b was a misreading");
    assert!(c.is_resolved());
    assert_eq!(c.resolution.as_deref(), Some("b was a misreading"));
  }
}
