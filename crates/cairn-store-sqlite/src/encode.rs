//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Ordered id lists and
//! subtopic lists are stored as compact JSON arrays. UUIDs are stored as
//! hyphenated lowercase strings.

use chrono::{DateTime, Utc};
use cairn_core::{
  claim::{Claim, Polarity},
  contradiction::Contradiction,
  finding::Node,
  progress::Progress,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Lists ────────────────────────────────────────────────────────────────────

pub fn encode_ids(ids: &[Uuid]) -> Result<String> {
  let strings: Vec<String> = ids.iter().copied().map(encode_uuid).collect();
  Ok(serde_json::to_string(&strings)?)
}

pub fn decode_ids(s: &str) -> Result<Vec<Uuid>> {
  let strings: Vec<String> = serde_json::from_str(s)?;
  strings.iter().map(|s| decode_uuid(s)).collect()
}

pub fn encode_strings(items: &[String]) -> Result<String> {
  Ok(serde_json::to_string(items)?)
}

pub fn decode_strings(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Polarity ─────────────────────────────────────────────────────────────────

pub fn encode_polarity(p: Polarity) -> &'static str {
  match p {
    Polarity::Support => "support",
    Polarity::Contradiction => "contradiction",
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const NODE_COLUMNS: &str = "id, content, content_hash, cluster_id, source, \
   confidence, timestamp, session_id, topic, subtopic";

/// Raw values read directly from a `nodes` row.
pub struct RawNode {
  pub id:           String,
  pub content:      String,
  pub content_hash: String,
  pub cluster_id:   Option<String>,
  pub source:       String,
  pub confidence:   f64,
  pub timestamp:    String,
  pub session_id:   String,
  pub topic:        String,
  pub subtopic:     Option<String>,
}

impl RawNode {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get(0)?,
      content:      row.get(1)?,
      content_hash: row.get(2)?,
      cluster_id:   row.get(3)?,
      source:       row.get(4)?,
      confidence:   row.get(5)?,
      timestamp:    row.get(6)?,
      session_id:   row.get(7)?,
      topic:        row.get(8)?,
      subtopic:     row.get(9)?,
    })
  }

  pub fn into_node(self) -> Result<Node> {
    Ok(Node {
      id:           decode_uuid(&self.id)?,
      content:      self.content,
      content_hash: self.content_hash,
      cluster_id:   self.cluster_id.as_deref().map(decode_uuid).transpose()?,
      source:       self.source,
      confidence:   self.confidence,
      timestamp:    decode_dt(&self.timestamp)?,
      session_id:   self.session_id,
      topic:        self.topic,
      subtopic:     self.subtopic,
    })
  }
}

pub const CLAIM_COLUMNS: &str = "c.id, c.claim, c.evidence_count, \
   c.supporting_nodes, c.contradicting_nodes, c.confidence, c.first_seen, \
   c.last_updated, c.topic, c.origin_confidence";

/// Raw values read directly from a `claims` row (aliased as `c`).
pub struct RawClaim {
  pub id:                  String,
  pub claim:               String,
  pub evidence_count:      i64,
  pub supporting_nodes:    String,
  pub contradicting_nodes: String,
  pub confidence:          f64,
  pub first_seen:          String,
  pub last_updated:        String,
  pub topic:               String,
  pub origin_confidence:   f64,
}

impl RawClaim {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                  row.get(0)?,
      claim:               row.get(1)?,
      evidence_count:      row.get(2)?,
      supporting_nodes:    row.get(3)?,
      contradicting_nodes: row.get(4)?,
      confidence:          row.get(5)?,
      first_seen:          row.get(6)?,
      last_updated:        row.get(7)?,
      topic:               row.get(8)?,
      origin_confidence:   row.get(9)?,
    })
  }

  pub fn into_claim(self) -> Result<Claim> {
    Ok(Claim {
      id:                  decode_uuid(&self.id)?,
      claim:               self.claim,
      evidence_count:      usize::try_from(self.evidence_count).unwrap_or(0),
      supporting_nodes:    decode_ids(&self.supporting_nodes)?,
      contradicting_nodes: decode_ids(&self.contradicting_nodes)?,
      confidence:          self.confidence,
      first_seen:          decode_dt(&self.first_seen)?,
      last_updated:        decode_dt(&self.last_updated)?,
      topic:               self.topic,
      origin_confidence:   self.origin_confidence,
    })
  }
}

pub const CONTRADICTION_COLUMNS: &str = "id, claim_1, claim_2, evidence_1, \
   evidence_2, resolution, needs_review, topic, detected_at";

/// Raw values read directly from a `contradictions` row.
pub struct RawContradiction {
  pub id:           String,
  pub claim_1:      String,
  pub claim_2:      String,
  pub evidence_1:   String,
  pub evidence_2:   String,
  pub resolution:   Option<String>,
  pub needs_review: bool,
  pub topic:        String,
  pub detected_at:  String,
}

impl RawContradiction {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get(0)?,
      claim_1:      row.get(1)?,
      claim_2:      row.get(2)?,
      evidence_1:   row.get(3)?,
      evidence_2:   row.get(4)?,
      resolution:   row.get(5)?,
      needs_review: row.get(6)?,
      topic:        row.get(7)?,
      detected_at:  row.get(8)?,
    })
  }

  pub fn into_contradiction(self) -> Result<Contradiction> {
    Ok(Contradiction {
      id:           decode_uuid(&self.id)?,
      claim_1:      self.claim_1,
      claim_2:      self.claim_2,
      evidence_1:   decode_uuid(&self.evidence_1)?,
      evidence_2:   decode_uuid(&self.evidence_2)?,
      resolution:   self.resolution,
      needs_review: self.needs_review,
      topic:        self.topic,
      detected_at:  decode_dt(&self.detected_at)?,
    })
  }
}

pub const PROGRESS_COLUMNS: &str = "topic, subtopics_explored, \
   subtopics_pending, total_sessions, total_hours, last_session";

/// Raw values read directly from a `progress` row.
pub struct RawProgress {
  pub topic:              String,
  pub subtopics_explored: String,
  pub subtopics_pending:  String,
  pub total_sessions:     i64,
  pub total_hours:        f64,
  pub last_session:       Option<String>,
}

impl RawProgress {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      topic:              row.get(0)?,
      subtopics_explored: row.get(1)?,
      subtopics_pending:  row.get(2)?,
      total_sessions:     row.get(3)?,
      total_hours:        row.get(4)?,
      last_session:       row.get(5)?,
    })
  }

  pub fn into_progress(self) -> Result<Progress> {
    Ok(Progress {
      topic:              self.topic,
      subtopics_explored: decode_strings(&self.subtopics_explored)?,
      subtopics_pending:  decode_strings(&self.subtopics_pending)?,
      total_sessions:     u64::try_from(self.total_sessions).unwrap_or(0),
      total_hours:        self.total_hours,
      last_session:       self.last_session.as_deref().map(decode_dt).transpose()?,
    })
  }
}
