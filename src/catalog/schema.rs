//! Schema definitions for QuillDB
//!
//! This module defines table schemas, column metadata and index definitions.
//! Column and table names are matched case-insensitively but keep the casing
//! they were declared with.

use super::types::DataType;
use crate::storage::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Column definition in a table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    /// Column name as declared
    pub name: String,
    /// Data type
    pub data_type: DataType,
    /// Column position (0-indexed)
    pub position: usize,
    /// Is this column nullable?
    pub nullable: bool,
    /// Default value, already coerced to the column type
    pub default: Option<Value>,
    /// Is this part of the primary key?
    pub primary_key: bool,
    /// Is this column unique?
    pub unique: bool,
    /// Is this an auto-incrementing identity column?
    pub identity: bool,
}

impl Column {
    /// Create a new column with minimal required fields
    pub fn new(name: impl Into<String>, data_type: DataType, position: usize) -> Self {
        Self {
            name: name.into(),
            data_type,
            position,
            nullable: true,
            default: None,
            primary_key: false,
            unique: false,
            identity: false,
        }
    }

    /// Set nullable flag
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Set default value
    pub fn default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Set primary key flag
    pub fn primary_key(mut self, pk: bool) -> Self {
        self.primary_key = pk;
        if pk {
            self.nullable = false;
        }
        self
    }

    /// Set unique flag
    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Mark as identity. Identity columns are the primary key.
    pub fn identity(mut self, identity: bool) -> Self {
        self.identity = identity;
        if identity {
            self = self.primary_key(true);
        }
        self
    }
}

/// Table schema - defines the structure of a table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    /// Ordered list of columns
    columns: Vec<Column>,
    /// Lowercased column name to index mapping
    name_to_index: HashMap<String, usize>,
}

impl Schema {
    /// Create a new empty schema
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            name_to_index: HashMap::new(),
        }
    }

    /// Create a schema from a list of columns
    pub fn from_columns(columns: Vec<Column>) -> Self {
        let mut schema = Self::new();
        for col in columns {
            schema.add_column(col);
        }
        schema
    }

    /// Add a column to the schema. Returns false if the name is taken.
    pub fn add_column(&mut self, mut column: Column) -> bool {
        let key = column.name.to_lowercase();
        if self.name_to_index.contains_key(&key) {
            return false;
        }
        column.position = self.columns.len();
        self.name_to_index.insert(key, column.position);
        self.columns.push(column);
        true
    }

    /// Get column by name
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.get_column_index(name).map(|idx| &self.columns[idx])
    }

    /// Get column by index
    pub fn get_column_by_index(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Get column index by name
    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(&name.to_lowercase()).copied()
    }

    /// Get all columns
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Get number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Check if column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.get_column_index(name).is_some()
    }

    /// Positions of the primary key columns
    pub fn primary_key_positions(&self) -> Vec<usize> {
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.position)
            .collect()
    }

    /// Position of the identity column, if any
    pub fn identity_position(&self) -> Option<usize> {
        self.columns.iter().position(|c| c.identity)
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

/// Index definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDef {
    /// Index name
    pub name: String,
    /// Column positions included in the index
    pub columns: Vec<usize>,
    /// Is this a unique index?
    pub unique: bool,
    /// Is this the primary key index?
    pub primary: bool,
}

impl IndexDef {
    /// Create a new non-unique index definition
    pub fn new(name: impl Into<String>, columns: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            columns,
            unique: false,
            primary: false,
        }
    }

    /// Set unique flag
    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Set primary flag. Primary indexes are always unique.
    pub fn primary(mut self, primary: bool) -> Self {
        self.primary = primary;
        if primary {
            self.unique = true;
        }
        self
    }
}

/// Table definition - full table metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDef {
    /// Table name as declared
    pub name: String,
    /// Table schema
    pub schema: Schema,
    /// Table ID (for internal use)
    pub id: u32,
    /// Indexes, primary index first when present
    pub indexes: Vec<IndexDef>,
}

impl TableDef {
    /// Create a new table definition. Indexes for PRIMARY KEY and UNIQUE
    /// column flags are derived from the schema.
    pub fn new(name: impl Into<String>, schema: Schema, id: u32) -> Self {
        let name = name.into();
        let mut indexes = Vec::new();

        let pk = schema.primary_key_positions();
        let single_pk = pk.len() == 1;
        if !pk.is_empty() {
            indexes.push(IndexDef::new(format!("pk_{}", name.to_lowercase()), pk).primary(true));
        }
        for col in schema.columns() {
            // a lone primary key column is already covered by the primary index
            if col.unique && !(col.primary_key && single_pk) {
                indexes.push(
                    IndexDef::new(
                        format!("uq_{}_{}", name.to_lowercase(), col.name.to_lowercase()),
                        vec![col.position],
                    )
                    .unique(true),
                );
            }
        }

        Self {
            name,
            schema,
            id,
            indexes,
        }
    }

    /// Get the table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the table schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Get column by name
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.schema.get_column(name)
    }

    /// The primary index, if the table has one
    pub fn primary_index(&self) -> Option<&IndexDef> {
        self.indexes.iter().find(|i| i.primary)
    }

    /// Find an index by name (case-insensitive)
    pub fn get_index(&self, name: &str) -> Option<&IndexDef> {
        self.indexes
            .iter()
            .find(|i| i.name.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_creation() {
        let mut schema = Schema::new();
        schema.add_column(Column::new("Id", DataType::Int, 0).primary_key(true));
        schema.add_column(Column::new("Name", DataType::Varchar(Some(100)), 1).nullable(false));
        schema.add_column(Column::new("Email", DataType::Varchar(Some(255)), 2));

        assert_eq!(schema.column_count(), 3);
        assert!(schema.has_column("id"));
        assert!(schema.has_column("NAME"));
        assert!(!schema.has_column("unknown"));

        let id_col = schema.get_column("ID").unwrap();
        assert_eq!(id_col.name, "Id");
        assert!(id_col.primary_key);
        assert!(!id_col.nullable);
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let mut schema = Schema::new();
        assert!(schema.add_column(Column::new("a", DataType::Int, 0)));
        assert!(!schema.add_column(Column::new("A", DataType::Int, 0)));
        assert_eq!(schema.column_count(), 1);
    }

    #[test]
    fn test_table_def_indexes() {
        let schema = Schema::from_columns(vec![
            Column::new("id", DataType::Int, 0).identity(true),
            Column::new("code", DataType::Char(4), 0).unique(true),
            Column::new("value", DataType::Varchar(None), 0),
        ]);

        let table = TableDef::new("Things", schema, 1);

        assert_eq!(table.name(), "Things");
        assert_eq!(table.schema().identity_position(), Some(0));
        assert_eq!(table.indexes.len(), 2);
        assert_eq!(table.primary_index().unwrap().columns, vec![0]);
        assert!(table.get_index("UQ_THINGS_CODE").unwrap().unique);
    }
}
