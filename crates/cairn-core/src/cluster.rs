//! Similarity clustering of non-duplicate findings.
//!
//! A cluster is implicit in the store (the `cluster_id` column on nodes). Its
//! id is the id of its first node, which is also its representative, so the
//! in-memory [`ClusterSet`] can be rebuilt from `nodes` alone.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
  finding::{ClusterId, NormalizedFinding},
  scoring::{ScoreError, SimilarityScorer},
};

// ─── Cluster ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
  pub id:             ClusterId,
  pub topic:          String,
  /// Normalized text of the first member.
  pub representative: String,
  pub member_count:   usize,
}

impl Cluster {
  /// A new single-member cluster.
  pub fn new(
    id: ClusterId,
    topic: impl Into<String>,
    representative: impl Into<String>,
  ) -> Self {
    Self {
      id,
      topic: topic.into(),
      representative: representative.into(),
      member_count: 1,
    }
  }
}

/// Per-topic cluster cache; clustering never crosses topics.
#[derive(Debug, Default, Clone)]
pub struct ClusterSet {
  by_topic: HashMap<String, Vec<Cluster>>,
}

impl ClusterSet {
  pub fn new() -> Self { Self::default() }

  pub fn candidates(&self, topic: &str) -> &[Cluster] {
    self.by_topic.get(topic).map(Vec::as_slice).unwrap_or(&[])
  }

  /// Register a newly opened cluster.
  pub fn open(&mut self, cluster: Cluster) {
    self
      .by_topic
      .entry(cluster.topic.clone())
      .or_default()
      .push(cluster);
  }

  /// Count one more member. Returns `false` if the cluster is unknown.
  pub fn add_member(&mut self, topic: &str, id: ClusterId) -> bool {
    match self
      .by_topic
      .get_mut(topic)
      .and_then(|clusters| clusters.iter_mut().find(|c| c.id == id))
    {
      Some(cluster) => {
        cluster.member_count += 1;
        true
      }
      None => false,
    }
  }

  pub fn topic_len(&self, topic: &str) -> usize { self.candidates(topic).len() }

  pub fn len(&self) -> usize { self.by_topic.values().map(Vec::len).sum() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

// ─── Clusterer ───────────────────────────────────────────────────────────────

/// Where a finding lands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Assignment {
  /// Join an existing cluster.
  Join { cluster_id: ClusterId, score: f64 },
  /// Open a new cluster with this finding as representative.
  Open,
}

#[derive(Debug, Clone, Copy)]
pub struct Clusterer {
  /// Minimum similarity to join a cluster (inclusive).
  pub threshold: f64,
  /// When `false` every finding opens its own singleton cluster.
  pub enabled:   bool,
}

impl Clusterer {
  pub fn new(threshold: f64, enabled: bool) -> Self { Self { threshold, enabled } }

  /// Pick the best cluster for `finding` among same-topic `candidates`.
  ///
  /// The highest score at or above the threshold wins; scores equal within
  /// `f64::EPSILON` go to the cluster with more members, then to the older
  /// cluster (earlier in `candidates`).
  pub fn assign(
    &self,
    finding: &NormalizedFinding,
    candidates: &[Cluster],
    scorer: &dyn SimilarityScorer,
  ) -> Result<Assignment, ScoreError> {
    if !self.enabled || candidates.is_empty() {
      return Ok(Assignment::Open);
    }

    let ranked = scorer.rank(&finding.text, candidates)?;

    let mut best: Option<(&Cluster, f64)> = None;
    for scored in ranked {
      let Some(cluster) = candidates.get(scored.index) else {
        return Err(ScoreError(format!(
          "scorer returned candidate index {} of {}",
          scored.index,
          candidates.len()
        )));
      };
      if !(0.0..=1.0).contains(&scored.score) {
        return Err(ScoreError(format!(
          "similarity {} against cluster {} is outside [0, 1]",
          scored.score, cluster.id
        )));
      }
      if scored.score < self.threshold {
        continue;
      }
      best = match best {
        None => Some((cluster, scored.score)),
        Some((current, current_score)) => {
          let tied = (scored.score - current_score).abs() <= f64::EPSILON;
          let better = if tied {
            cluster.member_count > current.member_count
          } else {
            scored.score > current_score
          };
          if better {
            Some((cluster, scored.score))
          } else {
            Some((current, current_score))
          }
        }
      };
    }

    Ok(match best {
      Some((cluster, score)) => Assignment::Join { cluster_id: cluster.id, score },
      None => Assignment::Open,
    })
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use uuid::Uuid;

  use super::*;
  use crate::normalize::fingerprint;

  /// Scores from a fixed table keyed by the candidate text.
  struct TableScorer(HashMap<&'static str, f64>);

  impl SimilarityScorer for TableScorer {
    fn score(&self, _a: &str, b: &str) -> Result<f64, ScoreError> {
      Ok(self.0.get(b).copied().unwrap_or(0.0))
    }
  }

  struct FailingScorer;

  impl SimilarityScorer for FailingScorer {
    fn score(&self, _a: &str, _b: &str) -> Result<f64, ScoreError> {
      Err(ScoreError("model offline".into()))
    }
  }

  fn finding(text: &str) -> NormalizedFinding {
    NormalizedFinding { text: text.into(), fingerprint: fingerprint(text) }
  }

  fn cluster(n: u128, text: &str, members: usize) -> Cluster {
    let mut c = Cluster::new(Uuid::from_u128(n), "topic", text);
    c.member_count = members;
    c
  }

  #[test]
  fn joins_best_cluster_above_threshold() {
    let scorer = TableScorer(HashMap::from([("a", 0.86), ("b", 0.95), ("c", 0.2)]));
    let candidates = vec![cluster(1, "a", 1), cluster(2, "b", 1), cluster(3, "c", 9)];
    let got = Clusterer::new(0.85, true)
      .assign(&finding("x"), &candidates, &scorer)
      .unwrap();
    assert_eq!(got, Assignment::Join { cluster_id: Uuid::from_u128(2), score: 0.95 });
  }

  #[test]
  fn threshold_is_inclusive_and_monotone() {
    let scorer = TableScorer(HashMap::from([("a", 0.9)]));
    let candidates = vec![cluster(1, "a", 1)];
    let at = Clusterer::new(0.9, true).assign(&finding("x"), &candidates, &scorer).unwrap();
    assert!(matches!(at, Assignment::Join { .. }));

    for threshold in [0.91, 0.95, 1.0] {
      let above = Clusterer::new(threshold, true)
        .assign(&finding("x"), &candidates, &scorer)
        .unwrap();
      assert_eq!(above, Assignment::Open);
    }
  }

  #[test]
  fn ties_prefer_larger_cluster() {
    let scorer = TableScorer(HashMap::from([("a", 0.9), ("b", 0.9)]));
    let candidates = vec![cluster(1, "a", 2), cluster(2, "b", 5)];
    let got = Clusterer::new(0.5, true).assign(&finding("x"), &candidates, &scorer).unwrap();
    assert_eq!(got, Assignment::Join { cluster_id: Uuid::from_u128(2), score: 0.9 });
  }

  #[test]
  fn equal_ties_keep_older_cluster() {
    let scorer = TableScorer(HashMap::from([("a", 0.9), ("b", 0.9)]));
    let candidates = vec![cluster(1, "a", 3), cluster(2, "b", 3)];
    let got = Clusterer::new(0.5, true).assign(&finding("x"), &candidates, &scorer).unwrap();
    assert_eq!(got, Assignment::Join { cluster_id: Uuid::from_u128(1), score: 0.9 });
  }

  #[test]
  fn disabled_clustering_always_opens() {
    let scorer = TableScorer(HashMap::from([("a", 1.0)]));
    let candidates = vec![cluster(1, "a", 1)];
    let got = Clusterer::new(0.1, false).assign(&finding("a"), &candidates, &scorer).unwrap();
    assert_eq!(got, Assignment::Open);
  }

  #[test]
  fn scorer_failure_is_reported() {
    let candidates = vec![cluster(1, "a", 1)];
    let got = Clusterer::new(0.5, true).assign(&finding("x"), &candidates, &FailingScorer);
    assert!(got.is_err());
  }

  #[test]
  fn out_of_range_score_is_reported() {
    let candidates = vec![cluster(1, "a", 1)];
    for bad in [7.0, -0.1, f64::NAN] {
      let scorer = TableScorer(HashMap::from([("a", bad)]));
      let got = Clusterer::new(1.0, true).assign(&finding("x"), &candidates, &scorer);
      assert!(got.is_err(), "{bad} should be rejected");
    }
  }

  #[test]
  fn cluster_set_is_scoped_by_topic() {
    let mut set = ClusterSet::new();
    set.open(Cluster::new(Uuid::from_u128(1), "gold", "a"));
    set.open(Cluster::new(Uuid::from_u128(2), "fed", "b"));
    assert_eq!(set.candidates("gold").len(), 1);
    assert!(set.candidates("other").is_empty());

    assert!(set.add_member("gold", Uuid::from_u128(1)));
    assert!(!set.add_member("fed", Uuid::from_u128(1)));
    assert_eq!(set.candidates("gold")[0].member_count, 2);
    assert_eq!(set.len(), 2);
  }
}
