//! Row-level reads and writes shared by the ingest pipeline and the
//! [`SqliteStore`](crate::SqliteStore) methods.
//!
//! Every function takes a plain connection so it can run inside whichever
//! transaction the caller opened (`Transaction` derefs to `Connection`).

use cairn_core::{
  claim::{Claim, ClaimId, Polarity},
  contradiction::{ClaimPair, Contradiction},
  finding::{ClusterId, Node, NodeId},
  progress::Progress,
};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _, params};
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    CLAIM_COLUMNS, CONTRADICTION_COLUMNS, NODE_COLUMNS, PROGRESS_COLUMNS, RawClaim,
    RawContradiction, RawNode, RawProgress, decode_uuid, encode_dt, encode_ids,
    encode_polarity, encode_strings, encode_uuid,
  },
};

// ─── Nodes ───────────────────────────────────────────────────────────────────

pub fn insert_node(conn: &Connection, node: &Node) -> Result<()> {
  conn.execute(
    "INSERT INTO nodes (
       id, content, content_hash, cluster_id, source,
       confidence, timestamp, session_id, topic, subtopic
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    params![
      encode_uuid(node.id),
      node.content,
      node.content_hash,
      node.cluster_id.map(encode_uuid),
      node.source,
      node.confidence,
      encode_dt(node.timestamp),
      node.session_id,
      node.topic,
      node.subtopic,
    ],
  )?;
  Ok(())
}

/// Every node in insertion order; used to rebuild the in-memory caches.
pub fn all_nodes(conn: &Connection) -> Result<Vec<Node>> {
  let mut stmt =
    conn.prepare(&format!("SELECT {NODE_COLUMNS} FROM nodes ORDER BY rowid"))?;
  let raws = stmt
    .query_map([], RawNode::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawNode::into_node).collect()
}

pub fn nodes_for_topic(conn: &Connection, topic: &str) -> Result<Vec<Node>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {NODE_COLUMNS} FROM nodes WHERE topic = ?1 ORDER BY rowid"
  ))?;
  let raws = stmt
    .query_map(params![topic], RawNode::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawNode::into_node).collect()
}

// ─── Claims ──────────────────────────────────────────────────────────────────

pub fn find_claim(conn: &Connection, text: &str) -> Result<Option<Claim>> {
  let raw = conn
    .query_row(
      &format!("SELECT {CLAIM_COLUMNS} FROM claims c WHERE c.claim = ?1"),
      params![text],
      RawClaim::from_row,
    )
    .optional()?;
  raw.map(RawClaim::into_claim).transpose()
}

/// Claims supported by a node in `cluster`, or by a node with the same `topic`
/// and `subtopic`, other than `exclude` itself.
///
/// A `None` cluster matches nothing; a `None` subtopic matches the topic's
/// untagged nodes.
pub fn claims_in_scope(
  conn: &Connection,
  exclude: &str,
  cluster: Option<ClusterId>,
  topic: &str,
  subtopic: Option<&str>,
) -> Result<Vec<Claim>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT DISTINCT {CLAIM_COLUMNS}
     FROM nodes n
     JOIN claim_evidence e ON e.node_id = n.id AND e.polarity = 'support'
     JOIN claims c         ON c.id = e.claim_id
     WHERE c.claim != ?1
       AND (n.cluster_id = ?2 OR (n.topic = ?3 AND n.subtopic IS ?4))
     ORDER BY c.first_seen, c.claim"
  ))?;
  let raws = stmt
    .query_map(
      params![exclude, cluster.map(encode_uuid), topic, subtopic],
      RawClaim::from_row,
    )?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawClaim::into_claim).collect()
}

/// Claims with at least one piece of evidence from a node of `topic`. A claim
/// first seen under another topic is included once this topic restates it.
pub fn claims_for_topic(conn: &Connection, topic: &str) -> Result<Vec<Claim>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {CLAIM_COLUMNS} FROM claims c
     WHERE c.id IN (
       SELECT e.claim_id FROM claim_evidence e
       JOIN nodes n ON n.id = e.node_id
       WHERE n.topic = ?1
     )
     ORDER BY c.rowid"
  ))?;
  let raws = stmt
    .query_map(params![topic], RawClaim::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawClaim::into_claim).collect()
}

pub fn insert_claim(conn: &Connection, claim: &Claim) -> Result<()> {
  conn.execute(
    "INSERT INTO claims (
       id, claim, evidence_count, supporting_nodes, contradicting_nodes,
       confidence, first_seen, last_updated, topic, origin_confidence
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    params![
      encode_uuid(claim.id),
      claim.claim,
      claim.evidence_count as i64,
      encode_ids(&claim.supporting_nodes)?,
      encode_ids(&claim.contradicting_nodes)?,
      claim.confidence,
      encode_dt(claim.first_seen),
      encode_dt(claim.last_updated),
      claim.topic,
      claim.origin_confidence,
    ],
  )?;
  Ok(())
}

/// Write back the evidence-derived columns; text, topic and origin never
/// change after creation.
pub fn update_claim_evidence(conn: &Connection, claim: &Claim) -> Result<()> {
  conn.execute(
    "UPDATE claims
     SET evidence_count = ?2, supporting_nodes = ?3, contradicting_nodes = ?4,
         confidence = ?5, last_updated = ?6
     WHERE id = ?1",
    params![
      encode_uuid(claim.id),
      claim.evidence_count as i64,
      encode_ids(&claim.supporting_nodes)?,
      encode_ids(&claim.contradicting_nodes)?,
      claim.confidence,
      encode_dt(claim.last_updated),
    ],
  )?;
  Ok(())
}

pub fn link_evidence(
  conn: &Connection,
  claim: ClaimId,
  node: NodeId,
  polarity: Polarity,
) -> Result<()> {
  conn.execute(
    "INSERT OR IGNORE INTO claim_evidence (claim_id, node_id, polarity)
     VALUES (?1, ?2, ?3)",
    params![encode_uuid(claim), encode_uuid(node), encode_polarity(polarity)],
  )?;
  Ok(())
}

// ─── Contradictions ──────────────────────────────────────────────────────────

pub fn find_contradiction(conn: &Connection, pair: &ClaimPair) -> Result<Option<Uuid>> {
  let id: Option<String> = conn
    .query_row(
      "SELECT id FROM contradictions WHERE claim_1 = ?1 AND claim_2 = ?2",
      params![pair.claim_1, pair.claim_2],
      |row| row.get(0),
    )
    .optional()?;
  id.as_deref().map(decode_uuid).transpose()
}

pub fn get_contradiction(conn: &Connection, id: Uuid) -> Result<Option<Contradiction>> {
  let raw = conn
    .query_row(
      &format!("SELECT {CONTRADICTION_COLUMNS} FROM contradictions WHERE id = ?1"),
      params![encode_uuid(id)],
      RawContradiction::from_row,
    )
    .optional()?;
  raw.map(RawContradiction::into_contradiction).transpose()
}

pub fn insert_contradiction(conn: &Connection, c: &Contradiction) -> Result<()> {
  conn.execute(
    "INSERT INTO contradictions (
       id, claim_1, claim_2, evidence_1, evidence_2,
       resolution, needs_review, topic, detected_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    params![
      encode_uuid(c.id),
      c.claim_1,
      c.claim_2,
      encode_uuid(c.evidence_1),
      encode_uuid(c.evidence_2),
      c.resolution,
      c.needs_review,
      c.topic,
      encode_dt(c.detected_at),
    ],
  )?;
  Ok(())
}

pub fn save_resolution(conn: &Connection, c: &Contradiction) -> Result<()> {
  conn.execute(
    "UPDATE contradictions SET resolution = ?2, needs_review = ?3 WHERE id = ?1",
    params![encode_uuid(c.id), c.resolution, c.needs_review],
  )?;
  Ok(())
}

pub fn contradictions_for_topic(
  conn: &Connection,
  topic: &str,
  include_resolved: bool,
) -> Result<Vec<Contradiction>> {
  let filter = if include_resolved { "" } else { "AND needs_review = 1" };
  let mut stmt = conn.prepare(&format!(
    "SELECT {CONTRADICTION_COLUMNS} FROM contradictions
     WHERE topic = ?1 {filter}
     ORDER BY rowid"
  ))?;
  let raws = stmt
    .query_map(params![topic], RawContradiction::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawContradiction::into_contradiction).collect()
}

// ─── Progress and sessions ───────────────────────────────────────────────────

/// Create an empty progress row for `topic` if there is none.
pub fn ensure_progress(conn: &Connection, topic: &str) -> Result<()> {
  conn.execute(
    "INSERT OR IGNORE INTO progress (topic) VALUES (?1)",
    params![topic],
  )?;
  Ok(())
}

pub fn load_progress(conn: &Connection, topic: &str) -> Result<Option<Progress>> {
  let raw = conn
    .query_row(
      &format!("SELECT {PROGRESS_COLUMNS} FROM progress WHERE topic = ?1"),
      params![topic],
      RawProgress::from_row,
    )
    .optional()?;
  raw.map(RawProgress::into_progress).transpose()
}

pub fn save_progress(conn: &Connection, p: &Progress) -> Result<()> {
  conn.execute(
    "INSERT INTO progress (
       topic, subtopics_explored, subtopics_pending,
       total_sessions, total_hours, last_session
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
     ON CONFLICT(topic) DO UPDATE SET
       subtopics_explored = excluded.subtopics_explored,
       subtopics_pending  = excluded.subtopics_pending,
       total_sessions     = excluded.total_sessions,
       total_hours        = excluded.total_hours,
       last_session       = excluded.last_session",
    params![
      p.topic,
      encode_strings(&p.subtopics_explored)?,
      encode_strings(&p.subtopics_pending)?,
      p.total_sessions as i64,
      p.total_hours,
      p.last_session.map(encode_dt),
    ],
  )?;
  Ok(())
}

pub fn session_exists(conn: &Connection, session_id: &str) -> Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM sessions WHERE session_id = ?1",
        params![session_id],
        |_| Ok(true),
      )
      .optional()?
      .unwrap_or(false),
  )
}

pub fn insert_session(
  conn: &Connection,
  session_id: &str,
  topic: &str,
  subtopics: &[String],
  hours: f64,
  recorded_at: DateTime<Utc>,
) -> Result<()> {
  conn.execute(
    "INSERT INTO sessions (session_id, topic, subtopics, hours, recorded_at)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    params![
      session_id,
      topic,
      encode_strings(subtopics)?,
      hours,
      encode_dt(recorded_at),
    ],
  )?;
  Ok(())
}

// ─── Counts ──────────────────────────────────────────────────────────────────

pub struct TopicCounts {
  pub nodes:          u64,
  pub claims:         u64,
  pub contradictions: u64,
  pub clusters:       u64,
}

pub fn topic_counts(conn: &Connection, topic: &str) -> Result<TopicCounts> {
  let count = |sql: &str| -> Result<u64> {
    let n: i64 = conn.query_row(sql, params![topic], |row| row.get(0))?;
    Ok(u64::try_from(n).unwrap_or(0))
  };
  Ok(TopicCounts {
    nodes:          count("SELECT COUNT(*) FROM nodes WHERE topic = ?1")?,
    claims:         count(
      "SELECT COUNT(DISTINCT e.claim_id) FROM claim_evidence e
       JOIN nodes n ON n.id = e.node_id
       WHERE n.topic = ?1",
    )?,
    contradictions: count("SELECT COUNT(*) FROM contradictions WHERE topic = ?1")?,
    clusters:       count(
      "SELECT COUNT(DISTINCT cluster_id) FROM nodes
       WHERE topic = ?1 AND cluster_id IS NOT NULL",
    )?,
  })
}
