//! Engine configuration.
//!
//! Deserialised from the `[engine]` table of the settings file. Unknown keys
//! are ignored so settings written for the extraction collaborator can share
//! the table.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Minimum similarity for a finding to join an existing cluster.
  pub dedup_threshold:         f64,
  /// When `false`, every finding becomes its own singleton cluster.
  pub cluster_related:         bool,
  pub track_contradictions:    bool,
  /// Research depth for the extraction collaborator. Any value is accepted
  /// and carried as-is; the engine never reads it.
  pub depth_level:             Option<serde_json::Value>,
  /// Minimum comparator score that counts as a contradiction.
  pub contradiction_floor:     f64,
  /// Retries for an ingest transaction that hits a write conflict.
  pub max_transaction_retries: u32,
  /// How long SQLite waits on a held lock before reporting it busy.
  pub busy_timeout_ms:         u64,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      dedup_threshold:         0.85,
      cluster_related:         true,
      track_contradictions:    true,
      depth_level:             None,
      contradiction_floor:     0.5,
      max_transaction_retries: 3,
      busy_timeout_ms:         5000,
    }
  }
}

impl EngineConfig {
  /// Fail fast on out-of-range thresholds.
  pub fn validate(&self) -> Result<()> {
    for (name, value) in [
      ("dedup_threshold", self.dedup_threshold),
      ("contradiction_floor", self.contradiction_floor),
    ] {
      if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(Error::ThresholdConfiguration { name, value });
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_are_valid() {
    let cfg = EngineConfig::default();
    assert_eq!(cfg.dedup_threshold, 0.85);
    assert!(cfg.cluster_related);
    assert!(cfg.track_contradictions);
    cfg.validate().unwrap();
  }

  #[test]
  fn threshold_outside_unit_interval_fails() {
    for bad in [-0.01, 1.01, f64::NAN, f64::INFINITY] {
      let cfg = EngineConfig { dedup_threshold: bad, ..Default::default() };
      assert!(matches!(
        cfg.validate(),
        Err(Error::ThresholdConfiguration { name: "dedup_threshold", .. })
      ));
    }
    let cfg = EngineConfig { contradiction_floor: 2.0, ..Default::default() };
    assert!(cfg.validate().is_err());
  }

  #[test]
  fn depth_level_and_unknown_keys_are_tolerated() {
    let cfg: EngineConfig = serde_json::from_str(
      r#"{"dedup_threshold":0.8,"depth_level":7,"max_hours":5,"llm":{"model":"x"}}"#,
    )
    .unwrap();
    assert_eq!(cfg.dedup_threshold, 0.8);
    assert_eq!(cfg.depth_level, Some(serde_json::json!(7)));
    assert!(cfg.cluster_related);
    cfg.validate().unwrap();
  }

  #[test]
  fn depth_level_of_any_shape_is_ignored() {
    for raw in [r#"{"depth_level":7.5}"#, r#"{"depth_level":"deep"}"#] {
      let cfg: EngineConfig = serde_json::from_str(raw).unwrap();
      assert!(cfg.depth_level.is_some());
      assert_eq!(cfg.dedup_threshold, 0.85);
      cfg.validate().unwrap();
    }
  }
}
