//! Exact-duplicate index: fingerprint → node id.
//!
//! A derived cache of `nodes.content_hash`. The store rebuilds it on open and
//! inserts into it only after the transaction that wrote the node commits.

use std::collections::HashMap;

use crate::finding::{Fingerprint, NodeId};

#[derive(Debug, Default, Clone)]
pub struct FingerprintIndex {
  entries: HashMap<Fingerprint, NodeId>,
}

impl FingerprintIndex {
  pub fn new() -> Self { Self::default() }

  pub fn lookup(&self, fingerprint: &Fingerprint) -> Option<NodeId> {
    self.entries.get(fingerprint).copied()
  }

  /// Returns the previously indexed node if the fingerprint was already
  /// present; the existing entry is kept.
  pub fn insert(&mut self, fingerprint: Fingerprint, node_id: NodeId) -> Option<NodeId> {
    match self.entries.get(&fingerprint) {
      Some(existing) => Some(*existing),
      None => {
        self.entries.insert(fingerprint, node_id);
        None
      }
    }
  }

  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::normalize::fingerprint;

  #[test]
  fn lookup_after_insert() {
    let mut index = FingerprintIndex::new();
    let fp = fingerprint("fed created in 1913");
    assert_eq!(index.lookup(&fp), None);

    assert_eq!(index.insert(fp, fp.node_id()), None);
    assert_eq!(index.lookup(&fp), Some(fp.node_id()));
    assert_eq!(index.len(), 1);
  }

  #[test]
  fn insert_keeps_first_entry() {
    let mut index = FingerprintIndex::new();
    let fp = fingerprint("a");
    let first = fp.node_id();
    index.insert(fp, first);
    assert_eq!(index.insert(fp, uuid::Uuid::nil()), Some(first));
    assert_eq!(index.lookup(&fp), Some(first));
  }
}
