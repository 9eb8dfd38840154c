//! Schema Catalog for QuillDB
//!
//! This module manages metadata about tables and their indexes. Names are
//! matched case-insensitively; the declared casing is kept for display.
//!
//! A table created inside a transaction is pending: only that transaction
//! can see it until [`Catalog::publish`] runs at commit time. A committed
//! table dropped inside a transaction is retired: hidden from that
//! transaction, still visible to everyone else until commit.

use super::schema::{Column, IndexDef, Schema, TableDef};
use crate::error::{Error, Result};
use crate::transaction::TxnId;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;

/// A committed table dropped by a still-open transaction
#[derive(Debug, Clone)]
struct Retired {
    owner: TxnId,
    def: Arc<TableDef>,
    /// Position in `tables` before the drop
    position: usize,
}

/// System Catalog - manages all table metadata of one database
#[derive(Debug, Clone)]
pub struct Catalog {
    /// Table definitions by lowercased name, in creation order
    tables: IndexMap<String, Arc<TableDef>>,
    /// Tables created by a still-open transaction
    pending: HashMap<String, TxnId>,
    /// Tables dropped by a still-open transaction
    retired: HashMap<String, Retired>,
    /// Next table ID
    next_table_id: u32,
}

fn key(name: &str) -> String {
    name.to_lowercase()
}

impl Catalog {
    /// Create a new empty catalog
    pub fn new() -> Self {
        Self {
            tables: IndexMap::new(),
            pending: HashMap::new(),
            retired: HashMap::new(),
            next_table_id: 1,
        }
    }

    fn visible(&self, key: &str, viewer: Option<TxnId>) -> bool {
        match self.pending.get(key) {
            Some(owner) => viewer == Some(*owner),
            None => true,
        }
    }

    /// Create a new table. With an `owner` the table stays private to that
    /// transaction until published.
    pub fn create_table(
        &mut self,
        name: &str,
        schema: Schema,
        owner: Option<TxnId>,
    ) -> Result<Arc<TableDef>> {
        let k = key(name);
        let retired_elsewhere = self
            .retired
            .get(&k)
            .map_or(false, |r| owner != Some(r.owner));
        if self.tables.contains_key(&k) || retired_elsewhere {
            return Err(Error::TableAlreadyExists(name.to_string()));
        }

        let table_def = Arc::new(TableDef::new(name, schema, self.next_table_id));
        self.next_table_id += 1;

        if let Some(txn) = owner {
            self.pending.insert(k.clone(), txn);
        }
        self.tables.insert(k, table_def.clone());
        Ok(table_def)
    }

    /// Whether `viewer` sees the retired copy of a table rather than the
    /// live entry
    pub fn is_retired_for(&self, name: &str, viewer: Option<TxnId>) -> bool {
        self.retired
            .get(&key(name))
            .map_or(false, |r| viewer != Some(r.owner))
    }

    /// Resolve a table visible to `viewer`
    pub fn resolve_table(&self, name: &str, viewer: Option<TxnId>) -> Result<Arc<TableDef>> {
        let k = key(name);
        if let Some(retired) = self.retired.get(&k) {
            if viewer != Some(retired.owner) {
                return Ok(retired.def.clone());
            }
        }
        self.tables
            .get(&k)
            .filter(|_| self.visible(&k, viewer))
            .cloned()
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }

    /// Resolve a column of a table to its ordinal
    pub fn resolve_column<'a>(table: &'a TableDef, name: &str) -> Result<(usize, &'a Column)> {
        table
            .get_column(name)
            .map(|c| (c.position, c))
            .ok_or_else(|| Error::ColumnNotFound(name.to_string(), table.name().to_string()))
    }

    /// Check if a table exists for `viewer`
    pub fn table_exists(&self, name: &str, viewer: Option<TxnId>) -> bool {
        self.resolve_table(name, viewer).is_ok()
    }

    fn remove_live(
        &mut self,
        name: &str,
        viewer: Option<TxnId>,
    ) -> Result<(usize, Arc<TableDef>)> {
        if self.is_retired_for(name, viewer) {
            return Err(Error::TableNotFound(name.to_string()));
        }
        self.resolve_table(name, viewer)?;
        self.tables
            .shift_remove_full(&key(name))
            .map(|(position, _, def)| (position, def))
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }

    /// Drop a table at once, returning its definition and the position it
    /// held
    pub fn drop_table(
        &mut self,
        name: &str,
        viewer: Option<TxnId>,
    ) -> Result<(Arc<TableDef>, usize)> {
        let (position, def) = self.remove_live(name, viewer)?;
        self.pending.remove(&key(name));
        Ok((def, position))
    }

    /// Drop a committed table on behalf of `owner`. The table disappears for
    /// `owner` only; [`Catalog::publish`] removes it for good.
    pub fn retire_table(&mut self, name: &str, owner: TxnId) -> Result<Arc<TableDef>> {
        let (position, def) = self.remove_live(name, Some(owner))?;
        self.retired.insert(
            key(name),
            Retired {
                owner,
                def: def.clone(),
                position,
            },
        );
        Ok(def)
    }

    /// Undo a retirement, putting the table back where it was
    pub fn reinstate_table(&mut self, name: &str) {
        if let Some(retired) = self.retired.remove(&key(name)) {
            let position = retired.position.min(self.tables.len());
            self.tables.shift_insert(position, key(name), retired.def);
        }
    }

    /// Put back a dropped table definition at its old position. Used by
    /// rollback.
    pub fn restore_table(&mut self, def: Arc<TableDef>, position: usize, owner: Option<TxnId>) {
        let k = key(def.name());
        if let Some(txn) = owner {
            self.pending.insert(k.clone(), txn);
        }
        let position = position.min(self.tables.len());
        self.tables.shift_insert(position, k, def);
    }

    /// Remove a table without visibility checks. Used by rollback.
    pub fn discard_table(&mut self, name: &str) {
        let k = key(name);
        self.pending.remove(&k);
        self.tables.shift_remove(&k);
    }

    /// Owner of a pending table, if it is pending
    pub fn pending_owner(&self, name: &str) -> Option<TxnId> {
        self.pending.get(&key(name)).copied()
    }

    /// Make every table created by `txn` visible to everyone and forget the
    /// tables it dropped. Returns the lowercased names of the latter.
    pub fn publish(&mut self, txn: TxnId) -> Vec<String> {
        self.pending.retain(|_, owner| *owner != txn);
        let dropped: Vec<String> = self
            .retired
            .iter()
            .filter(|(_, r)| r.owner == txn)
            .map(|(k, _)| k.clone())
            .collect();
        for k in &dropped {
            self.retired.remove(k);
        }
        dropped
    }

    /// List all table names visible to `viewer`, in creation order
    pub fn list_tables(&self, viewer: Option<TxnId>) -> Vec<String> {
        let mut retired: Vec<&Retired> = self
            .retired
            .values()
            .filter(|r| viewer != Some(r.owner))
            .collect();
        retired.sort_by_key(|r| r.position);
        let mut retired = retired.into_iter().peekable();

        let mut names = Vec::new();
        for (position, (k, def)) in self.tables.iter().enumerate() {
            while let Some(r) = retired.next_if(|r| r.position <= position) {
                names.push(r.def.name().to_string());
            }
            if self.visible(k, viewer) {
                names.push(def.name().to_string());
            }
        }
        names.extend(retired.map(|r| r.def.name().to_string()));
        names
    }

    /// Create an index, returning the updated table definition
    pub fn create_index(
        &mut self,
        name: &str,
        table_name: &str,
        columns: &[String],
        unique: bool,
        viewer: Option<TxnId>,
    ) -> Result<Arc<TableDef>> {
        if self.is_retired_for(table_name, viewer) {
            return Err(Error::ExecutionError(format!(
                "table '{}' is being dropped by another transaction",
                table_name
            )));
        }
        let table = self.resolve_table(table_name, viewer)?;

        let mut positions = Vec::with_capacity(columns.len());
        for col_name in columns {
            let (position, _) = Self::resolve_column(&table, col_name)?;
            positions.push(position);
        }

        if self.find_index(name).is_some() {
            return Err(Error::IndexAlreadyExists(name.to_string()));
        }

        let mut new_table = (*table).clone();
        new_table
            .indexes
            .push(IndexDef::new(name, positions).unique(unique));
        let new_table = Arc::new(new_table);
        self.tables.insert(key(table_name), new_table.clone());
        Ok(new_table)
    }

    /// Drop an index, returning the updated table definition
    pub fn drop_index(&mut self, table_name: &str, name: &str) -> Result<Arc<TableDef>> {
        let k = key(table_name);
        let table = self
            .tables
            .get(&k)
            .ok_or_else(|| Error::TableNotFound(table_name.to_string()))?;
        if table.get_index(name).is_none() {
            return Err(Error::IndexNotFound(name.to_string()));
        }

        let mut new_table = (**table).clone();
        new_table.indexes.retain(|i| !i.name.eq_ignore_ascii_case(name));
        let new_table = Arc::new(new_table);
        self.tables.insert(k, new_table.clone());
        Ok(new_table)
    }

    /// Find the table owning an index
    pub fn find_index(&self, name: &str) -> Option<(Arc<TableDef>, IndexDef)> {
        self.tables.values().find_map(|t| {
            t.get_index(name)
                .map(|i| (t.clone(), i.clone()))
        })
    }

    /// Get table schema info as a formatted string (for .schema command)
    pub fn describe_table(&self, name: &str, viewer: Option<TxnId>) -> Result<String> {
        let table = self.resolve_table(name, viewer)?;
        let mut info = format!("Table: {}\n", table.name());
        info.push_str("Columns:\n");

        for col in table.schema().columns() {
            let mut flags = Vec::new();
            if col.identity {
                flags.push("IDENTITY".to_string());
            }
            if col.primary_key {
                flags.push("PRIMARY KEY".to_string());
            }
            if !col.nullable {
                flags.push("NOT NULL".to_string());
            }
            if col.unique {
                flags.push("UNIQUE".to_string());
            }
            if let Some(default) = &col.default {
                flags.push(format!("DEFAULT {}", default.to_sql_literal()));
            }

            let flags_str = if flags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", flags.join(", "))
            };

            info.push_str(&format!(
                "  {} {} ({}){}\n",
                col.name,
                col.data_type,
                col.data_type.scalar_kind(),
                flags_str
            ));
        }

        if !table.indexes.is_empty() {
            info.push_str("Indexes:\n");
            for idx in &table.indexes {
                let cols: Vec<&str> = idx
                    .columns
                    .iter()
                    .filter_map(|&p| table.schema().get_column_by_index(p))
                    .map(|c| c.name.as_str())
                    .collect();
                info.push_str(&format!(
                    "  {} ({}){}\n",
                    idx.name,
                    cols.join(", "),
                    if idx.primary {
                        " PRIMARY"
                    } else if idx.unique {
                        " UNIQUE"
                    } else {
                        ""
                    }
                ));
            }
        }

        Ok(info)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DataType;

    fn single_column(
        catalog: &mut Catalog,
        name: &str,
        owner: Option<TxnId>,
    ) -> Result<Arc<TableDef>> {
        let schema = Schema::from_columns(vec![Column::new("x", DataType::Int, 0)]);
        catalog.create_table(name, schema, owner)
    }

    #[test]
    fn test_create_and_resolve_case_insensitive() {
        let mut catalog = Catalog::new();
        let schema = Schema::from_columns(vec![
            Column::new("Id", DataType::Int, 0).identity(true),
            Column::new("Name", DataType::Varchar(Some(50)), 1).nullable(false),
        ]);
        catalog.create_table("Users", schema, None).unwrap();

        let table = catalog.resolve_table("USERS", None).unwrap();
        assert_eq!(table.name(), "Users");

        let (ordinal, col) = Catalog::resolve_column(&table, "name").unwrap();
        assert_eq!(ordinal, 1);
        assert_eq!(col.name, "Name");

        assert!(matches!(
            Catalog::resolve_column(&table, "missing"),
            Err(Error::ColumnNotFound(_, _))
        ));
    }

    #[test]
    fn test_duplicate_table() {
        let mut catalog = Catalog::new();
        single_column(&mut catalog, "t", None).unwrap();
        let err = single_column(&mut catalog, "T", None).unwrap_err();
        assert!(matches!(err, Error::TableAlreadyExists(_)));
    }

    #[test]
    fn test_pending_table_visibility() {
        let mut catalog = Catalog::new();
        single_column(&mut catalog, "draft", Some(7)).unwrap();

        assert!(catalog.table_exists("draft", Some(7)));
        assert!(!catalog.table_exists("draft", Some(8)));
        assert!(!catalog.table_exists("draft", None));
        assert!(catalog.list_tables(None).is_empty());

        assert!(catalog.publish(7).is_empty());
        assert!(catalog.table_exists("draft", None));
    }

    #[test]
    fn test_create_and_drop_index() {
        let mut catalog = Catalog::new();
        let schema = Schema::from_columns(vec![
            Column::new("sku", DataType::Char(8), 0),
            Column::new("qty", DataType::Int, 1),
        ]);
        catalog.create_table("items", schema, None).unwrap();

        let def = catalog
            .create_index("ix_sku", "items", &["SKU".to_string()], true, None)
            .unwrap();
        assert_eq!(def.indexes.len(), 1);
        assert!(catalog.find_index("IX_SKU").is_some());

        let err = catalog
            .create_index("ix_sku", "items", &["qty".to_string()], false, None)
            .unwrap_err();
        assert!(matches!(err, Error::IndexAlreadyExists(_)));

        let def = catalog.drop_index("items", "ix_sku").unwrap();
        assert!(def.indexes.is_empty());
    }

    #[test]
    fn test_list_tables_in_creation_order() {
        let mut catalog = Catalog::new();
        for name in ["b", "a", "c"] {
            single_column(&mut catalog, name, None).unwrap();
        }
        assert_eq!(catalog.list_tables(None), vec!["b", "a", "c"]);

        let (def, position) = catalog.drop_table("a", None).unwrap();
        assert_eq!(position, 1);
        assert_eq!(catalog.list_tables(None), vec!["b", "c"]);

        catalog.restore_table(def, position, None);
        assert_eq!(catalog.list_tables(None), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_retired_table_stays_visible_to_others() {
        let mut catalog = Catalog::new();
        for name in ["a", "b", "c"] {
            single_column(&mut catalog, name, None).unwrap();
        }

        catalog.retire_table("A", 5).unwrap();
        catalog.retire_table("c", 5).unwrap();
        assert!(!catalog.table_exists("a", Some(5)));
        assert!(catalog.table_exists("a", Some(6)));
        assert!(catalog.is_retired_for("a", Some(6)));
        assert_eq!(catalog.list_tables(Some(5)), vec!["b"]);
        assert_eq!(catalog.list_tables(Some(6)), vec!["a", "b", "c"]);

        // only the dropping transaction may reuse the name
        assert!(single_column(&mut catalog, "a", Some(6)).is_err());
        single_column(&mut catalog, "a", Some(5)).unwrap();
        assert_eq!(catalog.list_tables(Some(5)), vec!["b", "a"]);
        assert_eq!(catalog.list_tables(Some(6)), vec!["a", "b", "c"]);

        // rollback
        catalog.discard_table("a");
        catalog.reinstate_table("c");
        catalog.reinstate_table("a");
        assert_eq!(catalog.list_tables(Some(5)), vec!["a", "b", "c"]);

        catalog.retire_table("b", 5).unwrap();
        let mut dropped = catalog.publish(5);
        dropped.sort();
        assert_eq!(dropped, vec!["b"]);
        assert_eq!(catalog.list_tables(Some(6)), vec!["a", "c"]);
    }
}
