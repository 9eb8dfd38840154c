//! Per-statement execution context and session variables

use std::collections::HashMap;

use crate::catalog::DataType;
use crate::error::{Error, Result};
use crate::storage::Value;
use crate::transaction::{LockManager, LockMode, TxnId, UndoLog};

/// A declared `@variable`
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// Name as declared, without the `@`
    pub name: String,
    pub data_type: DataType,
    pub value: Value,
}

/// Session-scoped declared variables, matched case-insensitively
#[derive(Debug, Clone, Default)]
pub struct Variables {
    vars: HashMap<String, Variable>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a variable. Declaring it again resets it to NULL.
    pub fn declare(&mut self, name: &str, data_type: DataType) {
        self.vars.insert(
            name.to_lowercase(),
            Variable {
                name: name.to_string(),
                data_type,
                value: Value::Null,
            },
        );
    }

    /// Assign a value, coerced to the declared type
    pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
        let var = self
            .vars
            .get_mut(&name.to_lowercase())
            .ok_or_else(|| Error::VariableNotFound(name.to_string()))?;
        var.value = value.cast(&var.data_type)?;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&Variable> {
        self.vars
            .get(&name.to_lowercase())
            .ok_or_else(|| Error::VariableNotFound(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn clear(&mut self) {
        self.vars.clear();
    }
}

/// Everything a statement needs from its session while it runs
#[derive(Debug)]
pub struct ExecContext<'a> {
    /// Transaction the statement runs in; owns locks and sees its own
    /// pending tables
    pub txn_id: TxnId,
    /// Owner recorded for tables created by this statement. `None` under
    /// autocommit, where new tables are visible at once.
    pub owner: Option<TxnId>,
    /// Whether reads take shared table locks
    pub lock_reads: bool,
    /// Whether CHAR(n) values are stored space-padded
    pub pad_char: bool,
    /// Table locks of the database
    pub locks: &'a LockManager,
    /// Undo records of the statement are appended here
    pub undo: &'a mut UndoLog,
    /// Identity value generated last in the session
    pub last_identity: Option<i64>,
}

impl<'a> ExecContext<'a> {
    pub fn viewer(&self) -> Option<TxnId> {
        Some(self.txn_id)
    }

    pub(crate) fn lock(&self, table: &str, mode: LockMode) -> Result<()> {
        if mode == LockMode::Shared && !self.lock_reads {
            return Ok(());
        }
        self.locks.acquire(table, self.txn_id, mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variables_are_case_insensitive() {
        let mut vars = Variables::new();
        vars.declare("Total", DataType::Int);
        vars.set("TOTAL", Value::BigInt(5)).unwrap();
        assert_eq!(vars.get("total").unwrap().value, Value::Int(5));
        assert_eq!(vars.get("total").unwrap().name, "Total");
    }

    #[test]
    fn test_redeclare_resets_value() {
        let mut vars = Variables::new();
        vars.declare("p", DataType::Varchar(Some(10)));
        vars.set("p", Value::from("abc")).unwrap();
        vars.declare("p", DataType::Varchar(Some(10)));
        assert!(vars.get("p").unwrap().value.is_null());
    }

    #[test]
    fn test_set_undeclared_variable() {
        let mut vars = Variables::new();
        assert!(matches!(
            vars.set("nope", Value::Int(1)),
            Err(Error::VariableNotFound(_))
        ));
        vars.declare("small", DataType::TinyInt);
        assert!(vars.set("small", Value::Int(1000)).is_err());
    }
}
