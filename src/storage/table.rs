//! Table storage for QuillDB
//!
//! A table keeps its rows in memory keyed by a monotonically increasing row
//! id, so iteration order is insertion order. Updates replace a row in place
//! and keep its position. Indexes enforce primary key and unique constraints.

use super::index::Index;
use super::tuple::Tuple;
use crate::catalog::{IndexDef, Schema, TableDef};
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Physical row identifier, never reused within a table
pub type RowId = u64;

/// A table combining schema and storage
#[derive(Debug, Clone)]
pub struct Table {
    /// Table definition (metadata)
    def: Arc<TableDef>,
    /// Rows in insertion order
    rows: BTreeMap<RowId, Tuple>,
    /// Next physical row id
    next_row_id: RowId,
    /// Next identity value, not rewound by deletes or rollbacks
    next_identity: i64,
    /// Indexes, in the order of the table definition
    indexes: Vec<Index>,
}

impl Table {
    /// Create a new empty table
    pub fn new(def: Arc<TableDef>) -> Self {
        let indexes = def.indexes.iter().cloned().map(Index::new).collect();
        Self {
            def,
            rows: BTreeMap::new(),
            next_row_id: 1,
            next_identity: 1,
            indexes,
        }
    }

    /// Get table name
    pub fn name(&self) -> &str {
        self.def.name()
    }

    /// Get table schema
    pub fn schema(&self) -> &Schema {
        self.def.schema()
    }

    /// Get table definition
    pub fn definition(&self) -> &Arc<TableDef> {
        &self.def
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Take the next identity value
    pub fn next_identity(&mut self) -> i64 {
        let value = self.next_identity;
        self.next_identity += 1;
        value
    }

    /// Get a row by id
    pub fn get(&self, row_id: RowId) -> Option<&Tuple> {
        self.rows.get(&row_id)
    }

    /// Scan all rows in insertion order
    pub fn scan(&self) -> impl Iterator<Item = (RowId, &Tuple)> {
        self.rows.iter().map(|(&id, t)| (id, t))
    }

    fn violation(&self, index: &Index) -> Error {
        if index.def.primary {
            Error::PrimaryKeyViolation(self.name().to_string())
        } else {
            Error::UniqueViolation(index.name().to_string())
        }
    }

    fn check_arity(&self, tuple: &Tuple) -> Result<()> {
        if tuple.len() != self.schema().column_count() {
            return Err(Error::Internal(format!(
                "row has {} values but table '{}' has {} columns",
                tuple.len(),
                self.name(),
                self.schema().column_count()
            )));
        }
        Ok(())
    }

    /// Insert a tuple, returning its row id
    pub fn insert(&mut self, tuple: Tuple) -> Result<RowId> {
        self.check_arity(&tuple)?;
        let row_id = self.next_row_id;

        if let Some(index) = self.indexes.iter().find(|i| i.conflicts(&tuple, row_id)) {
            return Err(self.violation(index));
        }

        self.next_row_id += 1;
        for index in &mut self.indexes {
            index.insert(&tuple, row_id);
        }
        self.rows.insert(row_id, tuple);
        Ok(row_id)
    }

    /// Delete a row, returning its last image
    pub fn delete(&mut self, row_id: RowId) -> Result<Tuple> {
        let tuple = self
            .rows
            .remove(&row_id)
            .ok_or_else(|| Error::Internal(format!("row {} not found in '{}'", row_id, self.name())))?;
        for index in &mut self.indexes {
            index.remove(&tuple, row_id);
        }
        Ok(tuple)
    }

    /// Replace several rows at once. Uniqueness is checked against the state
    /// after all replacements; on a violation nothing changes. Returns the
    /// before images.
    pub fn update(&mut self, changes: Vec<(RowId, Tuple)>) -> Result<Vec<(RowId, Tuple)>> {
        let mut before = Vec::with_capacity(changes.len());
        for (row_id, tuple) in &changes {
            self.check_arity(tuple)?;
            let old = self
                .rows
                .get(row_id)
                .ok_or_else(|| Error::Internal(format!("row {} not found in '{}'", row_id, self.name())))?;
            before.push((*row_id, old.clone()));
        }

        for (row_id, old) in &before {
            for index in &mut self.indexes {
                index.remove(old, *row_id);
            }
        }

        let mut failed = None;
        let mut applied = 0;
        'outer: for (row_id, tuple) in &changes {
            for (i, index) in self.indexes.iter().enumerate() {
                if index.conflicts(tuple, *row_id) {
                    failed = Some(i);
                    break 'outer;
                }
            }
            for index in &mut self.indexes {
                index.insert(tuple, *row_id);
            }
            applied += 1;
        }

        if let Some(i) = failed {
            for (row_id, tuple) in &changes[..applied] {
                for index in &mut self.indexes {
                    index.remove(tuple, *row_id);
                }
            }
            for (row_id, old) in &before {
                for index in &mut self.indexes {
                    index.insert(old, *row_id);
                }
            }
            return Err(self.violation(&self.indexes[i]));
        }

        for (row_id, tuple) in changes {
            self.rows.insert(row_id, tuple);
        }
        Ok(before)
    }

    /// Put a row image back under its original id. Used by rollback, which
    /// replays images that were valid when they were taken.
    pub fn restore(&mut self, row_id: RowId, tuple: Tuple) {
        if let Some(old) = self.rows.remove(&row_id) {
            for index in &mut self.indexes {
                index.remove(&old, row_id);
            }
        }
        for index in &mut self.indexes {
            index.insert(&tuple, row_id);
        }
        self.rows.insert(row_id, tuple);
    }

    /// Remove a row without reporting a missing id. Used by rollback.
    pub fn discard(&mut self, row_id: RowId) {
        let _ = self.delete(row_id);
    }

    /// Build a new index over the existing rows and adopt the new definition
    pub fn add_index(&mut self, def: Arc<TableDef>, index_def: IndexDef) -> Result<()> {
        let mut index = Index::new(index_def);
        for (&row_id, tuple) in &self.rows {
            if index.conflicts(tuple, row_id) {
                return Err(self.violation(&index));
            }
            index.insert(tuple, row_id);
        }
        self.indexes.push(index);
        self.def = def;
        Ok(())
    }

    /// Drop an index by name and adopt the new definition
    pub fn remove_index(&mut self, def: Arc<TableDef>, name: &str) {
        self.indexes.retain(|i| !i.name().eq_ignore_ascii_case(name));
        self.def = def;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Column, DataType};
    use crate::storage::Value;

    fn people() -> Table {
        let schema = Schema::from_columns(vec![
            Column::new("id", DataType::Int, 0).primary_key(true),
            Column::new("name", DataType::Varchar(Some(20)), 1),
        ]);
        Table::new(Arc::new(TableDef::new("people", schema, 1)))
    }

    fn row(id: i32, name: &str) -> Tuple {
        Tuple::new(vec![Value::Int(id), Value::from(name)])
    }

    #[test]
    fn test_insert_keeps_order() {
        let mut t = people();
        t.insert(row(3, "c")).unwrap();
        t.insert(row(1, "a")).unwrap();
        t.insert(row(2, "b")).unwrap();

        let ids: Vec<_> = t.scan().map(|(_, r)| r.get(0).cloned().unwrap()).collect();
        assert_eq!(ids, vec![Value::Int(3), Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn test_primary_key_violation() {
        let mut t = people();
        t.insert(row(1, "a")).unwrap();
        let err = t.insert(row(1, "b")).unwrap_err();
        assert!(matches!(err, Error::PrimaryKeyViolation(_)));
        assert_eq!(t.row_count(), 1);
    }

    #[test]
    fn test_update_shifts_keys_atomically() {
        let mut t = people();
        let a = t.insert(row(1, "a")).unwrap();
        let b = t.insert(row(2, "b")).unwrap();

        // every key moves up by one; only the final state must be unique
        t.update(vec![(a, row(2, "a")), (b, row(3, "b"))]).unwrap();
        assert_eq!(t.get(a).unwrap().get(0), Some(&Value::Int(2)));

        let err = t.update(vec![(a, row(3, "a"))]).unwrap_err();
        assert!(matches!(err, Error::PrimaryKeyViolation(_)));
        assert_eq!(t.get(a).unwrap().get(0), Some(&Value::Int(2)));
        // the index still knows row a under its old key
        assert!(t.insert(row(2, "dup")).is_err());
    }

    #[test]
    fn test_delete_and_restore_position() {
        let mut t = people();
        let a = t.insert(row(1, "a")).unwrap();
        let b = t.insert(row(2, "b")).unwrap();
        let before = t.delete(a).unwrap();
        assert_eq!(t.row_count(), 1);

        t.restore(a, before);
        let order: Vec<_> = t.scan().map(|(id, _)| id).collect();
        assert_eq!(order, vec![a, b]);
        assert!(t.insert(row(1, "again")).is_err());
    }

    #[test]
    fn test_identity_is_monotonic() {
        let mut t = people();
        assert_eq!(t.next_identity(), 1);
        assert_eq!(t.next_identity(), 2);
        assert_eq!(t.next_identity(), 3);
    }
}
