//! In-memory caches derived from the `nodes` table.
//!
//! Rebuilt from scratch on open; afterwards only the writer thread mutates
//! them, and only once the transaction that wrote the matching rows has
//! committed.

use std::{
  collections::HashMap,
  sync::{Mutex, MutexGuard, PoisonError},
};

use cairn_core::{
  cluster::{Cluster, ClusterSet},
  dedup::FingerprintIndex,
  finding::{ClusterId, Fingerprint, NodeId},
  normalize::normalize_text,
};
use rusqlite::Connection;

use crate::{Result, queries};

#[derive(Debug, Default)]
pub struct EngineCache {
  pub fingerprints: FingerprintIndex,
  pub clusters:     ClusterSet,
  /// Exact repeats skipped per topic since open. Never persisted: a
  /// duplicate performs no writes.
  duplicates:       HashMap<String, u64>,
}

/// How a committed ingest changed the cluster cache.
#[derive(Debug, Clone)]
pub enum ClusterChange {
  Opened(Cluster),
  Joined(ClusterId),
  Unclustered,
}

/// Cache updates for one committed node.
#[derive(Debug, Clone)]
pub struct CacheDelta {
  pub fingerprint: Fingerprint,
  pub node_id:     NodeId,
  pub topic:       String,
  pub cluster:     ClusterChange,
}

impl EngineCache {
  /// Replay every node in insertion order. A cluster's representative is its
  /// first node, so it is always seen before the cluster's other members.
  pub fn rebuild(conn: &Connection) -> Result<Self> {
    let mut cache = Self::default();
    for node in queries::all_nodes(conn)? {
      let fingerprint = Fingerprint::from_hex(&node.content_hash)?;
      cache.fingerprints.insert(fingerprint, node.id);
      match node.cluster_id {
        Some(cluster_id) if cluster_id == node.id => cache.clusters.open(Cluster::new(
          cluster_id,
          node.topic.clone(),
          normalize_text(&node.content),
        )),
        Some(cluster_id) => {
          if !cache.clusters.add_member(&node.topic, cluster_id) {
            tracing::warn!(node = %node.id, %cluster_id, "node references unknown cluster");
          }
        }
        None => {}
      }
    }
    Ok(cache)
  }

  pub fn apply(&mut self, delta: CacheDelta) {
    self.fingerprints.insert(delta.fingerprint, delta.node_id);
    match delta.cluster {
      ClusterChange::Opened(cluster) => self.clusters.open(cluster),
      ClusterChange::Joined(cluster_id) => {
        self.clusters.add_member(&delta.topic, cluster_id);
      }
      ClusterChange::Unclustered => {}
    }
  }

  pub fn note_duplicate(&mut self, topic: &str) {
    *self.duplicates.entry(topic.to_owned()).or_default() += 1;
  }

  pub fn duplicates_avoided(&self, topic: &str) -> u64 {
    self.duplicates.get(topic).copied().unwrap_or(0)
  }
}

/// Lock the cache, recovering the data if a previous holder panicked; the
/// cache is only ever updated after commit, so its contents stay valid.
pub fn lock(cache: &Mutex<EngineCache>) -> MutexGuard<'_, EngineCache> {
  cache.lock().unwrap_or_else(PoisonError::into_inner)
}
