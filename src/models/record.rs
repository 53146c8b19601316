// src/models/record.rs

//! Listing records and ranked snapshots.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// One row of a verified-contracts listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    /// Natural identifier (the contract address)
    pub key: String,

    /// Full row text, cells joined by single spaces
    pub raw_text: String,

    /// First whitespace token, searched as an address
    pub primary_token: String,

    /// Second whitespace token, searched as a contract name
    pub secondary_token: String,
}

impl Record {
    /// Build a record from the cell texts of one listing row.
    ///
    /// Layout rule: the first token of the row is the address and the second
    /// token is the contract name. This depends on the explorer's column order;
    /// a layout change upstream only needs fixing here.
    pub fn from_cells(cells: &[String]) -> std::result::Result<Self, String> {
        let raw_text = cells
            .iter()
            .flat_map(|cell| cell.split_whitespace())
            .collect::<Vec<_>>()
            .join(" ");

        let mut tokens = raw_text.split(' ').filter(|t| !t.is_empty());
        let primary = tokens
            .next()
            .ok_or_else(|| "row has no address token".to_string())?
            .to_string();
        let secondary = tokens
            .next()
            .ok_or_else(|| format!("row '{raw_text}' has no name token"))?
            .to_string();

        Ok(Self {
            key: primary.clone(),
            primary_token: primary,
            secondary_token: secondary,
            raw_text,
        })
    }

    /// Build a record directly from row text (mostly for tests and tooling).
    pub fn from_text(text: &str) -> Result<Self> {
        Self::from_cells(&[text.to_string()]).map_err(|e| AppError::malformed("<text>", e))
    }
}

/// Top-N rows of a listing, keyed by record key, in rank order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    records: Vec<Record>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl Snapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record at the next rank.
    ///
    /// Keys are unique: a repeated key keeps its first (higher-ranked) record
    /// and the call returns `false`.
    pub fn insert(&mut self, record: Record) -> bool {
        if self.index.contains_key(&record.key) {
            return false;
        }
        self.index.insert(record.key.clone(), self.records.len());
        self.records.push(record);
        true
    }

    pub fn get(&self, key: &str) -> Option<&Record> {
        self.index.get(key).map(|&i| &self.records[i])
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in rank order.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    /// Keys in rank order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.key.as_str())
    }
}

impl FromIterator<Record> for Snapshot {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        let mut snapshot = Snapshot::new();
        for record in iter {
            snapshot.insert(record);
        }
        snapshot
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_from_cells_splits_address_and_name() {
        let record =
            Record::from_cells(&cells(&["0xabc123", "UniswapV3Pool", "Solidity", "0.8.7"]))
                .unwrap();
        assert_eq!(record.key, "0xabc123");
        assert_eq!(record.primary_token, "0xabc123");
        assert_eq!(record.secondary_token, "UniswapV3Pool");
        assert_eq!(record.raw_text, "0xabc123 UniswapV3Pool Solidity 0.8.7");
    }

    #[test]
    fn test_from_cells_normalizes_whitespace() {
        let record = Record::from_cells(&cells(&["  0xdef\n", "\tToken  Extra "])).unwrap();
        assert_eq!(record.raw_text, "0xdef Token Extra");
        assert_eq!(record.secondary_token, "Token");
    }

    #[test]
    fn test_from_cells_requires_name_token() {
        assert!(Record::from_cells(&cells(&["0xonly"])).is_err());
        assert!(Record::from_cells(&cells(&["   "])).is_err());
        assert!(Record::from_cells(&[]).is_err());
    }

    #[test]
    fn test_snapshot_keeps_rank_order_and_first_duplicate() {
        let snapshot: Snapshot = ["0x2 B", "0x1 A", "0x2 Dup"]
            .iter()
            .map(|t| Record::from_text(t).unwrap())
            .collect();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.keys().collect::<Vec<_>>(), vec!["0x2", "0x1"]);
        assert_eq!(snapshot.get("0x2").unwrap().raw_text, "0x2 B");
        assert!(!snapshot.contains_key("0x3"));
    }
}
