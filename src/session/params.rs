//! Statement parameters
//!
//! Parameters travel as declared variables: each one is declared (and, for
//! inputs, assigned) in a prelude put in front of the batch, and output
//! values are read back with a trailing `SELECT @out, ...`.

use crate::catalog::DataType;
use crate::error::{Error, Result};
use crate::executor::QueryResult;
use crate::storage::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
    InputOutput,
}

impl Direction {
    fn is_input(self) -> bool {
        self != Direction::Output
    }

    fn is_output(self) -> bool {
        self != Direction::Input
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Name without the leading `@`
    pub name: String,
    pub data_type: DataType,
    pub direction: Direction,
    pub value: Value,
}

/// Ordered set of named parameters
#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    params: Vec<Parameter>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_input(&mut self, name: &str, data_type: DataType, value: impl Into<Value>) -> &mut Self {
        self.add(name, data_type, Direction::Input, value.into())
    }

    pub fn add_output(&mut self, name: &str, data_type: DataType) -> &mut Self {
        self.add(name, data_type, Direction::Output, Value::Null)
    }

    pub fn add_inout(&mut self, name: &str, data_type: DataType, value: impl Into<Value>) -> &mut Self {
        self.add(name, data_type, Direction::InputOutput, value.into())
    }

    fn add(&mut self, name: &str, data_type: DataType, direction: Direction, value: Value) -> &mut Self {
        let name = name.trim_start_matches('@').to_string();
        self.params.retain(|p| !p.name.eq_ignore_ascii_case(&name));
        self.params.push(Parameter {
            name,
            data_type,
            direction,
            value,
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        let name = name.trim_start_matches('@');
        self.params.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Current value of a parameter; outputs hold what the last execution
    /// read back
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.get(name).map(|p| &p.value)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    /// `DECLARE @p TYPE;SET @p = literal;` for every parameter
    pub fn prelude(&self) -> String {
        let mut sql = String::new();
        for p in &self.params {
            sql.push_str(&format!("DECLARE @{} {};", p.name, p.data_type));
            if p.direction.is_input() {
                sql.push_str(&format!("SET @{} = {};", p.name, p.value.to_sql_literal()));
            }
        }
        sql
    }

    /// Query reading back every output parameter, if there is any
    pub fn output_query(&self) -> Option<String> {
        let outputs: Vec<String> = self
            .params
            .iter()
            .filter(|p| p.direction.is_output())
            .map(|p| format!("@{}", p.name))
            .collect();
        if outputs.is_empty() {
            None
        } else {
            Some(format!("SELECT {}", outputs.join(", ")))
        }
    }

    /// Store output values from the last row of `result`, matching columns
    /// by name
    pub fn read_outputs(&mut self, result: &QueryResult) -> Result<()> {
        let last = result
            .rows
            .len()
            .checked_sub(1)
            .ok_or_else(|| Error::ExecutionError("output query returned no rows".to_string()))?;
        for p in self.params.iter_mut().filter(|p| p.direction.is_output()) {
            let column = format!("@{}", p.name);
            p.value = result
                .value(last, &column)
                .cloned()
                .ok_or_else(|| Error::ColumnNotFound(column, "(result)".to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ColumnDescriptor;
    use crate::storage::Tuple;

    #[test]
    fn test_prelude_declares_all_assigns_inputs() {
        let mut params = ParameterSet::new();
        params
            .add_input("@name", DataType::Varchar(Some(20)), "O'Brien")
            .add_output("total", DataType::Decimal(10, 2))
            .add_inout("n", DataType::Int, 3);

        assert_eq!(
            params.prelude(),
            "DECLARE @name VARCHAR(20);SET @name = 'O''Brien';\
             DECLARE @total DECIMAL(10,2);\
             DECLARE @n INT;SET @n = 3;"
        );
        assert_eq!(params.output_query().unwrap(), "SELECT @total, @n");
    }

    #[test]
    fn test_no_outputs_no_query() {
        let mut params = ParameterSet::new();
        params.add_input("a", DataType::Int, 1);
        params.add_input("A", DataType::Int, 2);
        assert_eq!(params.len(), 1);
        assert_eq!(params.value("@a"), Some(&Value::Int(2)));
        assert!(params.output_query().is_none());
    }

    #[test]
    fn test_read_outputs_from_last_row() {
        let mut params = ParameterSet::new();
        params.add_output("out", DataType::Int);
        let result = QueryResult::with_rows(
            vec![ColumnDescriptor::new("@out", None, DataType::Int)],
            vec![Tuple::new(vec![Value::Int(7)])],
        );
        params.read_outputs(&result).unwrap();
        assert_eq!(params.value("out"), Some(&Value::Int(7)));

        let empty = QueryResult::with_rows(Vec::new(), Vec::new());
        assert!(params.read_outputs(&empty).is_err());
    }
}
