//! Novelty detection between consecutive snapshots.
//!
//! Only key presence matters: a record is novel when its key is in the
//! current snapshot and not in the previous one. A record whose key persists
//! while its visible text changes is never reported.

use serde::Serialize;

use crate::models::{Record, Snapshot};

/// Records of the current snapshot whose keys the previous one lacked.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NoveltySet {
    /// Novel records in the current snapshot's rank order
    pub records: Vec<Record>,
}

impl NoveltySet {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }
}

impl IntoIterator for NoveltySet {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

/// Relative complement of `previous` in `current`, by key.
pub fn novel(previous: &Snapshot, current: &Snapshot) -> NoveltySet {
    NoveltySet {
        records: current
            .iter()
            .filter(|record| !previous.contains_key(&record.key))
            .cloned()
            .collect(),
    }
}
