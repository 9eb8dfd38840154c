//! Query results
//!
//! The result of one executed statement: column descriptors, row snapshots,
//! the update count and, for failed statements, the error message and code.

use serde::Serialize;

use crate::catalog::{DataType, ScalarKind};
use crate::error::Error;
use crate::storage::{Tuple, Value};

/// Update count reported by statements that return rows
pub const NO_UPDATE_COUNT: i64 = -1;

/// Description of one result column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDescriptor {
    /// Column name or alias
    pub name: String,
    /// Table the column was read from, for plain column references
    pub source_table: Option<String>,
    /// Declared (or inferred) type
    pub data_type: DataType,
    /// Scalar kind callers receive values as
    pub kind: ScalarKind,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, source_table: Option<String>, data_type: DataType) -> Self {
        let kind = data_type.scalar_kind();
        Self {
            name: name.into(),
            source_table,
            data_type,
            kind,
        }
    }
}

/// Query result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    /// Column descriptors, empty for statements without rows
    pub columns: Vec<ColumnDescriptor>,
    /// Result rows
    pub rows: Vec<Tuple>,
    /// Rows affected by INSERT/UPDATE/DELETE, 0 for DDL, -1 for SELECT
    pub update_count: i64,
    /// Error message of a failed statement
    pub error: Option<String>,
    /// Numeric code of the error
    pub error_code: Option<i32>,
}

impl QueryResult {
    /// Result of a row-returning statement
    pub fn with_rows(columns: Vec<ColumnDescriptor>, rows: Vec<Tuple>) -> Self {
        Self {
            columns,
            rows,
            update_count: NO_UPDATE_COUNT,
            error: None,
            error_code: None,
        }
    }

    /// Result of a statement that only reports affected rows
    pub fn with_update_count(count: usize) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            update_count: count as i64,
            error: None,
            error_code: None,
        }
    }

    /// Error-bearing result. Carries no columns or rows.
    pub fn from_error(error: &Error) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            update_count: NO_UPDATE_COUNT,
            error: Some(error.to_string()),
            error_code: Some(error.code()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Ordinal of a column by name (case-insensitive)
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Value of a named column in a given row
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)
    }

    /// Rows as plain value vectors
    pub fn row_values(&self) -> Vec<Vec<Value>> {
        self.rows.iter().map(|t| t.values().to_vec()).collect()
    }
}
