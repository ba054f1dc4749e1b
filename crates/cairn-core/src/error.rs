//! Error types for `cairn-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The finding (or session input) is empty or malformed. Rejected before
  /// any write; callers should not retry it.
  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("session {0:?} has already been recorded")]
  DuplicateSession(String),

  #[error("{name} must be within [0, 1], got {value}")]
  ThresholdConfiguration { name: &'static str, value: f64 },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
