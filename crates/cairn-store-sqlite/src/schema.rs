//! SQL schema for the Cairn SQLite store.
//!
//! Executed once on the writer connection at startup. Table and column names
//! of `nodes`, `claims`, `progress` and `contradictions` are a compatibility
//! surface; the `topic`/`subtopic` columns, `claim_evidence` and `sessions`
//! are additive.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Nodes are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS nodes (
    id           TEXT PRIMARY KEY,        -- first 16 bytes of content_hash
    content      TEXT NOT NULL,
    content_hash TEXT NOT NULL UNIQUE,    -- sha-256 hex of normalized text
    cluster_id   TEXT,                    -- id of the cluster's first node
    source       TEXT NOT NULL,
    confidence   REAL NOT NULL,
    timestamp    TEXT NOT NULL,
    session_id   TEXT NOT NULL,
    topic        TEXT NOT NULL,
    subtopic     TEXT
);

CREATE TABLE IF NOT EXISTS claims (
    id                  TEXT PRIMARY KEY,
    claim               TEXT NOT NULL UNIQUE,
    evidence_count      INTEGER NOT NULL,
    supporting_nodes    TEXT NOT NULL DEFAULT '[]',  -- JSON array of node ids
    contradicting_nodes TEXT NOT NULL DEFAULT '[]',  -- JSON array of node ids
    confidence          REAL NOT NULL CHECK (confidence BETWEEN 0 AND 1),
    first_seen          TEXT NOT NULL,
    last_updated        TEXT NOT NULL,
    topic               TEXT NOT NULL,
    origin_confidence   REAL NOT NULL
);

-- Relational mirror of the JSON evidence lists, for scoped lookups.
CREATE TABLE IF NOT EXISTS claim_evidence (
    claim_id TEXT NOT NULL REFERENCES claims(id),
    node_id  TEXT NOT NULL REFERENCES nodes(id),
    polarity TEXT NOT NULL,                -- 'support' | 'contradiction'
    PRIMARY KEY (claim_id, node_id)
);

CREATE TABLE IF NOT EXISTS progress (
    topic              TEXT PRIMARY KEY,
    subtopics_explored TEXT NOT NULL DEFAULT '[]',
    subtopics_pending  TEXT NOT NULL DEFAULT '[]',
    total_sessions     INTEGER NOT NULL DEFAULT 0,
    total_hours        REAL NOT NULL DEFAULT 0,
    last_session       TEXT
);

-- One row per unordered claim pair; rows are never deleted.
CREATE TABLE IF NOT EXISTS contradictions (
    id           TEXT PRIMARY KEY,
    claim_1      TEXT NOT NULL,
    claim_2      TEXT NOT NULL,
    evidence_1   TEXT NOT NULL REFERENCES nodes(id),
    evidence_2   TEXT NOT NULL REFERENCES nodes(id),
    resolution   TEXT,
    needs_review INTEGER NOT NULL DEFAULT 1,
    topic        TEXT NOT NULL,
    detected_at  TEXT NOT NULL,
    UNIQUE (claim_1, claim_2),
    CHECK  (claim_1 < claim_2)
);

-- Committed sessions; guards against replayed record_session calls.
CREATE TABLE IF NOT EXISTS sessions (
    session_id  TEXT PRIMARY KEY,
    topic       TEXT NOT NULL,
    subtopics   TEXT NOT NULL DEFAULT '[]',
    hours       REAL NOT NULL,
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS nodes_cluster_idx        ON nodes(cluster_id);
CREATE INDEX IF NOT EXISTS nodes_topic_subtopic_idx ON nodes(topic, subtopic);
CREATE INDEX IF NOT EXISTS claims_topic_idx         ON claims(topic);
CREATE INDEX IF NOT EXISTS claim_evidence_node_idx  ON claim_evidence(node_id);
CREATE INDEX IF NOT EXISTS contradictions_topic_idx ON contradictions(topic);

PRAGMA user_version = 1;
";

/// Applied to the dedicated reader connection of a file-backed store.
pub const READER_PRAGMAS: &str = "PRAGMA query_only = ON;";
