//! Pluggable similarity and polarity capabilities.
//!
//! The engine never decides on its own whether two passages say the same
//! thing or opposite things; it asks a [`SimilarityScorer`] and a
//! [`PolarityComparator`]. The defaults here are lexical. Callers with an
//! embedding model or a nearest-neighbour index inject their own.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::cluster::Cluster;

/// A scorer or comparator could not produce a value for this finding.
///
/// Never fatal: the engine stores the finding unclustered and skips the
/// contradiction check.
#[derive(Debug, Clone, Error)]
#[error("scoring failed: {0}")]
pub struct ScoreError(pub String);

/// One candidate's score, by position in the slice passed to
/// [`SimilarityScorer::rank`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredCandidate {
  pub index: usize,
  pub score: f64,
}

// ─── Similarity ──────────────────────────────────────────────────────────────

pub trait SimilarityScorer: Send + Sync {
  /// Similarity of two normalized texts in [0, 1].
  fn score(&self, a: &str, b: &str) -> Result<f64, ScoreError>;

  /// Score `text` against cluster representatives.
  ///
  /// The default walks every candidate. An indexed implementation may return
  /// only a shortlist; candidates it omits are treated as non-matches.
  fn rank(
    &self,
    text: &str,
    candidates: &[Cluster],
  ) -> Result<Vec<ScoredCandidate>, ScoreError> {
    candidates
      .iter()
      .enumerate()
      .map(|(index, cluster)| {
        self
          .score(text, &cluster.representative)
          .map(|score| ScoredCandidate { index, score })
      })
      .collect()
  }
}

/// Sørensen–Dice coefficient over character bigrams.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiceScorer;

impl SimilarityScorer for DiceScorer {
  fn score(&self, a: &str, b: &str) -> Result<f64, ScoreError> {
    Ok(strsim::sorensen_dice(a, b))
  }
}

// ─── Polarity ────────────────────────────────────────────────────────────────

pub trait PolarityComparator: Send + Sync {
  /// How strongly `a` and `b` assert mutually exclusive things about the
  /// same subject, in [0, 1]. Zero means no conflict.
  fn conflict(&self, a: &str, b: &str) -> Result<f64, ScoreError>;
}

const NEGATIONS: &[&str] = &[
  "not", "no", "never", "none", "nor", "neither", "cannot", "false", "untrue",
  "denied", "nobody", "nothing",
];

const STOPWORDS: &[&str] = &[
  "a", "an", "the", "was", "were", "is", "are", "be", "been", "in", "on", "of",
  "to", "by", "at", "it", "that", "this", "and", "did", "does", "do", "has",
  "had", "have",
];

/// Lexical negation and numeric-disagreement detector.
///
/// Flags a pair when exactly one side is negated and the remaining words
/// largely coincide, or when every non-numeric word matches but the numbers
/// differ.
#[derive(Debug, Clone, Copy)]
pub struct NegationComparator {
  /// Minimum word overlap for a negation flip to count.
  pub min_overlap: f64,
}

impl Default for NegationComparator {
  fn default() -> Self { Self { min_overlap: 0.6 } }
}

#[derive(Debug, Default)]
struct Terms {
  words:     BTreeSet<String>,
  numbers:   BTreeSet<String>,
  negations: usize,
}

fn terms(text: &str) -> Terms {
  let mut out = Terms::default();
  let raw = text
    .split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '.'))
    .map(|t| t.trim_matches(|c| c == '.' || c == '\''))
    .filter(|t| !t.is_empty());

  for token in raw {
    let token = token.to_lowercase();
    if NEGATIONS.contains(&token.as_str()) {
      out.negations += 1;
      continue;
    }
    let token = match token.strip_suffix("n't") {
      Some(stem) => {
        out.negations += 1;
        stem.to_owned()
      }
      None => token,
    };
    if token.is_empty() || STOPWORDS.contains(&token.as_str()) {
      continue;
    }
    if token.parse::<f64>().is_ok() {
      out.numbers.insert(token);
    } else {
      out.words.insert(token);
    }
  }
  out
}

fn dice(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
  if a.is_empty() && b.is_empty() {
    return 0.0;
  }
  let shared = a.intersection(b).count();
  (2 * shared) as f64 / (a.len() + b.len()) as f64
}

impl PolarityComparator for NegationComparator {
  fn conflict(&self, a: &str, b: &str) -> Result<f64, ScoreError> {
    let ta = terms(a);
    let tb = terms(b);

    let all_a: BTreeSet<String> = ta.words.union(&ta.numbers).cloned().collect();
    let all_b: BTreeSet<String> = tb.words.union(&tb.numbers).cloned().collect();

    if ta.negations % 2 != tb.negations % 2 {
      let overlap = dice(&all_a, &all_b);
      return Ok(if overlap >= self.min_overlap { overlap } else { 0.0 });
    }

    let numbers_disagree = !ta.numbers.is_empty()
      && !tb.numbers.is_empty()
      && ta.numbers != tb.numbers;
    if numbers_disagree && !ta.words.is_empty() && ta.words == tb.words {
      return Ok(1.0);
    }

    Ok(0.0)
  }
}

#[cfg(test)]
mod tests {
  use uuid::Uuid;

  use super::*;

  #[test]
  fn dice_scorer_is_symmetric_and_bounded() {
    let s = DiceScorer;
    let ab = s.score("fed created in 1913", "federal reserve created in 1913").unwrap();
    let ba = s.score("federal reserve created in 1913", "fed created in 1913").unwrap();
    assert!((ab - ba).abs() < 1e-12);
    assert!((0.0..=1.0).contains(&ab));
    assert_eq!(s.score("same", "same").unwrap(), 1.0);
  }

  #[test]
  fn default_rank_scores_every_candidate() {
    let clusters = vec![
      Cluster::new(Uuid::from_u128(1), "t", "gold standard ended"),
      Cluster::new(Uuid::from_u128(2), "t", "fed created in 1913"),
    ];
    let ranked = DiceScorer.rank("fed created in 1913", &clusters).unwrap();
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[1].index, 1);
    assert_eq!(ranked[1].score, 1.0);
  }

  #[test]
  fn negation_flip_is_flagged() {
    let c = NegationComparator::default();
    let score = c
      .conflict(
        "nixon ended gold standard in 1971",
        "gold standard was not ended in 1971",
      )
      .unwrap();
    assert!(score > 0.8, "score was {score}");
  }

  #[test]
  fn contraction_counts_as_negation() {
    let c = NegationComparator::default();
    assert_eq!(c.conflict("the fed raised rates", "the fed hasn't raised rates").unwrap(), 1.0);
    assert!(c.conflict("the fed raised rates", "the fed didn't raise rates").unwrap() > 0.6);
  }

  #[test]
  fn numeric_disagreement_is_flagged() {
    let c = NegationComparator::default();
    assert_eq!(c.conflict("fed created in 1913", "fed created in 1914").unwrap(), 1.0);
  }

  #[test]
  fn agreement_and_unrelated_text_are_not_flagged() {
    let c = NegationComparator::default();
    assert_eq!(c.conflict("fed created in 1913", "fed created in 1913").unwrap(), 0.0);
    assert_eq!(c.conflict("gold is not money", "bitcoin launched in 2009").unwrap(), 0.0);
  }
}
