//! Findings and nodes — the raw input and its persisted, immutable form.
//!
//! A finding is transient: the extraction collaborator hands it to the engine,
//! which turns it into at most one [`Node`]. Nodes are never edited; a
//! correction arrives as a new finding and becomes a new node.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Content-addressed node identifier (first 16 bytes of the fingerprint).
pub type NodeId = Uuid;

/// A cluster is identified by the node id of its representative.
pub type ClusterId = Uuid;

// ─── Fingerprint ─────────────────────────────────────────────────────────────

/// SHA-256 digest of a finding's normalized text.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
  pub fn from_bytes(bytes: [u8; 32]) -> Self { Self(bytes) }

  pub fn as_bytes(&self) -> &[u8; 32] { &self.0 }

  /// Lowercase hex; the form stored in `nodes.content_hash`.
  pub fn to_hex(&self) -> String { hex::encode(self.0) }

  pub fn from_hex(s: &str) -> Result<Self> {
    let bytes = hex::decode(s)
      .map_err(|e| Error::InvalidInput(format!("fingerprint {s:?}: {e}")))?;
    let bytes: [u8; 32] = bytes.try_into().map_err(|_| {
      Error::InvalidInput(format!("fingerprint {s:?} is not 32 bytes"))
    })?;
    Ok(Self(bytes))
  }

  /// The node id a finding with this fingerprint is stored under.
  pub fn node_id(&self) -> NodeId {
    let mut head = [0u8; 16];
    head.copy_from_slice(&self.0[..16]);
    Uuid::from_bytes(head)
  }
}

impl fmt::Debug for Fingerprint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Fingerprint({})", self.to_hex())
  }
}

impl fmt::Display for Fingerprint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.to_hex())
  }
}

// ─── Finding ─────────────────────────────────────────────────────────────────

/// One unit of freshly extracted research text with provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
  pub text:       String,
  pub source:     String,
  /// Extraction confidence in [0, 1].
  pub confidence: f64,
  /// Overwritten by the batch session id when ingested through a batch.
  #[serde(default)]
  pub session_id: String,
  #[serde(default = "Utc::now")]
  pub timestamp:  DateTime<Utc>,
  pub topic:      String,
  /// Subtopic tag assigned by the caller; scopes contradiction checks.
  #[serde(default)]
  pub subtopic:   Option<String>,
  /// Distilled assertion; the normalized text is used when absent.
  #[serde(default)]
  pub claim:      Option<String>,
}

impl Finding {
  /// Convenience constructor with the optional fields left empty.
  pub fn new(
    topic: impl Into<String>,
    text: impl Into<String>,
    source: impl Into<String>,
    confidence: f64,
  ) -> Self {
    Self {
      text: text.into(),
      source: source.into(),
      confidence,
      session_id: String::new(),
      timestamp: Utc::now(),
      topic: topic.into(),
      subtopic: None,
      claim: None,
    }
  }

  pub fn with_subtopic(mut self, subtopic: impl Into<String>) -> Self {
    self.subtopic = Some(subtopic.into());
    self
  }

  pub fn with_claim(mut self, claim: impl Into<String>) -> Self {
    self.claim = Some(claim.into());
    self
  }

  pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
    self.session_id = session_id.into();
    self
  }
}

/// Output of the normalizer: canonical text plus its fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedFinding {
  pub text:        String,
  pub fingerprint: Fingerprint,
}

// ─── Node ────────────────────────────────────────────────────────────────────

/// A persisted, immutable record of a finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
  pub id:           NodeId,
  /// The finding text as supplied (trimmed), not the normalized form.
  pub content:      String,
  pub content_hash: String,
  /// `None` when clustering was skipped because scoring failed.
  pub cluster_id:   Option<ClusterId>,
  pub source:       String,
  pub confidence:   f64,
  pub timestamp:    DateTime<Utc>,
  pub session_id:   String,
  pub topic:        String,
  pub subtopic:     Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fingerprint_hex_roundtrip_and_node_id_prefix() {
    let mut bytes = [0u8; 32];
    for (i, b) in bytes.iter_mut().enumerate() {
      *b = i as u8;
    }
    let fp = Fingerprint::from_bytes(bytes);
    let hex = fp.to_hex();
    assert_eq!(hex.len(), 64);
    assert_eq!(Fingerprint::from_hex(&hex).unwrap(), fp);
    assert_eq!(&fp.node_id().as_bytes()[..], &bytes[..16]);
  }

  #[test]
  fn fingerprint_rejects_short_hex() {
    assert!(matches!(
      Fingerprint::from_hex("abcd"),
      Err(Error::InvalidInput(_))
    ));
  }

  #[test]
  fn finding_deserializes_with_defaults() {
    let f: Finding = serde_json::from_str(
      r#"{"text":"Fed created in 1913.","source":"web","confidence":0.7,"topic":"fed"}"#,
    )
    .unwrap();
    assert!(f.session_id.is_empty());
    assert!(f.subtopic.is_none());
    assert!(f.claim.is_none());
  }
}
