//! Database storage state
//!
//! The catalog and the row storage of every table, kept together so that
//! DDL changes both in one step and rollback can replay undo records
//! against either.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use super::table::Table;
use crate::catalog::{Catalog, Schema, TableDef};
use crate::error::{Error, Result};
use crate::transaction::{TxnId, UndoRecord};

/// Catalog plus table storage of one database
#[derive(Debug, Default)]
pub struct Store {
    /// Table metadata
    pub catalog: Catalog,
    /// Table storage by lowercased name
    tables: HashMap<String, Table>,
    /// Storage of tables retired by an open transaction
    retired: HashMap<String, Table>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage of a table visible to `viewer`
    pub fn table(&self, name: &str, viewer: Option<TxnId>) -> Result<&Table> {
        let def = self.catalog.resolve_table(name, viewer)?;
        let tables = if self.catalog.is_retired_for(name, viewer) {
            &self.retired
        } else {
            &self.tables
        };
        tables
            .get(&def.name().to_lowercase())
            .ok_or_else(|| Error::Internal(format!("no storage for table '{}'", name)))
    }

    /// Mutable storage of a table visible to `viewer`
    pub fn table_mut(&mut self, name: &str, viewer: Option<TxnId>) -> Result<&mut Table> {
        let def = self.catalog.resolve_table(name, viewer)?;
        let tables = if self.catalog.is_retired_for(name, viewer) {
            &mut self.retired
        } else {
            &mut self.tables
        };
        tables
            .get_mut(&def.name().to_lowercase())
            .ok_or_else(|| Error::Internal(format!("no storage for table '{}'", name)))
    }

    /// Create a table in the catalog and allocate its storage
    pub fn create_table(
        &mut self,
        name: &str,
        schema: Schema,
        owner: Option<TxnId>,
    ) -> Result<Arc<TableDef>> {
        let def = self.catalog.create_table(name, schema, owner)?;
        self.tables
            .insert(name.to_lowercase(), Table::new(def.clone()));
        Ok(def)
    }

    /// Drop a table, returning the undo record that brings it back.
    ///
    /// With an `owner`, a committed table is only retired: the rows stay
    /// readable by other transactions until [`Store::publish`]. Tables
    /// without an owner, or pending ones, go at once.
    pub fn drop_table(
        &mut self,
        name: &str,
        viewer: Option<TxnId>,
        owner: Option<TxnId>,
    ) -> Result<UndoRecord> {
        let key = name.to_lowercase();
        let pending_owner = self.catalog.pending_owner(name);
        if let (Some(txn), None) = (owner, pending_owner) {
            let def = self.catalog.retire_table(name, txn)?;
            let table = self
                .tables
                .remove(&key)
                .ok_or_else(|| Error::Internal(format!("no storage for table '{}'", name)))?;
            self.retired.insert(key, table);
            return Ok(UndoRecord::RetireTable {
                table: def.name().to_string(),
            });
        }

        let (def, position) = self.catalog.drop_table(name, viewer)?;
        let table = self
            .tables
            .remove(&key)
            .ok_or_else(|| Error::Internal(format!("no storage for table '{}'", name)))?;
        Ok(UndoRecord::DropTable {
            def,
            position,
            storage: Box::new(table),
            pending_owner,
        })
    }

    /// Create an index on a table and build it over the existing rows
    pub fn create_index(
        &mut self,
        name: &str,
        table_name: &str,
        columns: &[String],
        unique: bool,
        viewer: Option<TxnId>,
    ) -> Result<()> {
        let def = self
            .catalog
            .create_index(name, table_name, columns, unique, viewer)?;
        let index_def = def
            .get_index(name)
            .cloned()
            .ok_or_else(|| Error::IndexNotFound(name.to_string()))?;

        let built = match self.tables.get_mut(&table_name.to_lowercase()) {
            Some(table) => table.add_index(def, index_def),
            None => Err(Error::Internal(format!("no storage for table '{}'", table_name))),
        };
        if let Err(e) = built {
            // keep catalog and storage in step
            let _ = self.catalog.drop_index(table_name, name);
            return Err(e);
        }
        Ok(())
    }

    /// Revert changes, newest record first
    pub fn undo(&mut self, records: Vec<UndoRecord>) {
        for record in records.into_iter().rev() {
            trace!(?record, "undo");
            match record {
                UndoRecord::Insert { table, row_id } => {
                    if let Some(t) = self.tables.get_mut(&table.to_lowercase()) {
                        t.discard(row_id);
                    }
                }
                UndoRecord::Update {
                    table,
                    row_id,
                    before,
                }
                | UndoRecord::Delete {
                    table,
                    row_id,
                    before,
                } => {
                    if let Some(t) = self.tables.get_mut(&table.to_lowercase()) {
                        t.restore(row_id, before);
                    }
                }
                UndoRecord::CreateTable { table } => {
                    self.catalog.discard_table(&table);
                    self.tables.remove(&table.to_lowercase());
                }
                UndoRecord::DropTable {
                    def,
                    position,
                    storage,
                    pending_owner,
                } => {
                    let key = def.name().to_lowercase();
                    self.catalog.restore_table(def, position, pending_owner);
                    self.tables.insert(key, *storage);
                }
                UndoRecord::RetireTable { table } => {
                    let key = table.to_lowercase();
                    self.catalog.reinstate_table(&table);
                    if let Some(storage) = self.retired.remove(&key) {
                        self.tables.insert(key, storage);
                    }
                }
                UndoRecord::CreateIndex { table, index } => {
                    if let Ok(def) = self.catalog.drop_index(&table, &index) {
                        if let Some(t) = self.tables.get_mut(&table.to_lowercase()) {
                            t.remove_index(def, &index);
                        }
                    }
                }
            }
        }
    }

    /// Commit-time publication of the DDL of `txn`: created tables become
    /// visible, retired ones are released
    pub fn publish(&mut self, txn: TxnId) {
        for key in self.catalog.publish(txn) {
            trace!(table = %key, "retired table released");
            self.retired.remove(&key);
        }
    }
}
