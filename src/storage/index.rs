//! Ordered in-memory indexes
//!
//! Each index maps a key built from the indexed column values to the row ids
//! holding that key. Unique indexes reject a second row with the same key;
//! keys containing NULL are never checked for uniqueness.

use super::table::RowId;
use super::tuple::{Tuple, Value};
use crate::catalog::IndexDef;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Index key - supports composite keys
#[derive(Debug, Clone)]
pub struct IndexKey(pub Vec<Value>);

impl IndexKey {
    /// Build the key for `def`'s columns from a row
    pub fn from_tuple(def: &IndexDef, tuple: &Tuple) -> Self {
        Self(tuple.project(&def.columns))
    }

    /// Does any component of the key hold NULL?
    pub fn has_null(&self) -> bool {
        self.0.iter().any(Value::is_null)
    }

    /// Compare two index keys
    pub fn compare(&self, other: &IndexKey) -> Ordering {
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            match a.sort_cmp(b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        self.0.len().cmp(&other.0.len())
    }
}

impl PartialEq for IndexKey {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl Eq for IndexKey {}

impl PartialOrd for IndexKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

impl Ord for IndexKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

/// An index over one table
#[derive(Debug, Clone)]
pub struct Index {
    /// Index definition
    pub def: IndexDef,
    entries: BTreeMap<IndexKey, BTreeSet<RowId>>,
}

impl Index {
    /// Create a new empty index
    pub fn new(def: IndexDef) -> Self {
        Self {
            def,
            entries: BTreeMap::new(),
        }
    }

    /// Index name
    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// Would inserting `tuple` under `row_id` break uniqueness?
    pub fn conflicts(&self, tuple: &Tuple, row_id: RowId) -> bool {
        if !self.def.unique {
            return false;
        }
        let key = IndexKey::from_tuple(&self.def, tuple);
        if key.has_null() {
            return false;
        }
        self.entries
            .get(&key)
            .map_or(false, |ids| ids.iter().any(|&id| id != row_id))
    }

    /// Add an entry. The caller checks [`Index::conflicts`] first.
    pub fn insert(&mut self, tuple: &Tuple, row_id: RowId) {
        let key = IndexKey::from_tuple(&self.def, tuple);
        self.entries.entry(key).or_default().insert(row_id);
    }

    /// Remove an entry
    pub fn remove(&mut self, tuple: &Tuple, row_id: RowId) {
        let key = IndexKey::from_tuple(&self.def, tuple);
        if let Some(ids) = self.entries.get_mut(&key) {
            ids.remove(&row_id);
            if ids.is_empty() {
                self.entries.remove(&key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i32, name: &str) -> Tuple {
        Tuple::new(vec![Value::Int(id), Value::from(name)])
    }

    #[test]
    fn test_unique_conflict() {
        let mut idx = Index::new(IndexDef::new("pk", vec![0]).primary(true));
        idx.insert(&row(1, "a"), 10);

        assert!(idx.conflicts(&row(1, "b"), 11));
        assert!(!idx.conflicts(&row(1, "b"), 10));
        assert!(!idx.conflicts(&row(2, "b"), 11));

        idx.remove(&row(1, "a"), 10);
        assert!(idx.entries.is_empty());
        assert!(!idx.conflicts(&row(1, "b"), 11));
    }

    #[test]
    fn test_null_keys_do_not_conflict() {
        let mut idx = Index::new(IndexDef::new("uq", vec![1]).unique(true));
        let t = Tuple::new(vec![Value::Int(1), Value::Null]);
        idx.insert(&t, 1);
        assert!(!idx.conflicts(&Tuple::new(vec![Value::Int(2), Value::Null]), 2));
    }

    #[test]
    fn test_non_unique_keys_share_an_entry() {
        let mut idx = Index::new(IndexDef::new("by_name", vec![1]));
        idx.insert(&row(1, "x"), 1);
        idx.insert(&row(2, "x"), 2);
        assert!(!idx.conflicts(&row(3, "x"), 3));

        idx.remove(&row(1, "x"), 1);
        assert_eq!(idx.entries.len(), 1);
        idx.remove(&row(2, "x"), 2);
        assert!(idx.entries.is_empty());
    }
}
