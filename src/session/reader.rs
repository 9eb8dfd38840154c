//! Forward-only reader over a query result

use bytes::Bytes;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::handle::Slot;
use crate::catalog::{DataType, ScalarKind};
use crate::error::{Error, Result};
use crate::executor::{ColumnDescriptor, QueryResult};
use crate::storage::{Tuple, Value};

/// Reader returned by [`crate::Session::execute_reader`].
///
/// While a reader is open its session refuses new statements. Close it, or
/// drop it, before executing the next batch.
#[derive(Debug)]
pub struct Reader {
    result: QueryResult,
    current: Option<usize>,
    next: usize,
    slot: Slot,
    closed: bool,
}

impl Reader {
    pub(crate) fn new(result: QueryResult, slot: Slot) -> Self {
        Self {
            result,
            current: None,
            next: 0,
            slot,
            closed: false,
        }
    }

    /// Advance to the next row. Returns false once the rows are exhausted.
    pub fn read(&mut self) -> Result<bool> {
        if self.closed {
            return Err(Error::ExecutionError("reader is closed".to_string()));
        }
        if self.next < self.result.rows.len() {
            self.current = Some(self.next);
            self.next += 1;
            Ok(true)
        } else {
            self.current = None;
            Ok(false)
        }
    }

    pub fn field_count(&self) -> usize {
        self.result.columns.len()
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.result.columns
    }

    /// Name of the column at `ordinal`
    pub fn name(&self, ordinal: usize) -> Result<&str> {
        Ok(&self.column(ordinal)?.name)
    }

    /// Ordinal of a column, matched case-insensitively
    pub fn ordinal(&self, name: &str) -> Result<usize> {
        self.result
            .column_index(name)
            .ok_or_else(|| Error::ColumnNotFound(name.to_string(), "(result)".to_string()))
    }

    pub fn field_kind(&self, ordinal: usize) -> Result<ScalarKind> {
        Ok(self.column(ordinal)?.kind)
    }

    /// Update count of the statement that produced the result
    pub fn records_affected(&self) -> i64 {
        self.result.update_count
    }

    pub fn is_null(&self, ordinal: usize) -> Result<bool> {
        Ok(self.get_value(ordinal)?.is_null())
    }

    /// Value of a column in the current row
    pub fn get_value(&self, ordinal: usize) -> Result<&Value> {
        self.column(ordinal)?;
        self.current_row()?
            .get(ordinal)
            .ok_or_else(|| Error::Internal(format!("row has no value at {}", ordinal)))
    }

    /// Every value of the current row, in column order
    pub fn get_values(&self) -> Result<&[Value]> {
        Ok(self.current_row()?.values())
    }

    pub fn get_bool(&self, ordinal: usize) -> Result<bool> {
        match self.typed(ordinal, &DataType::Bit)? {
            Value::Bit(b) => Ok(b),
            other => Err(mismatch(&other, "BIT")),
        }
    }

    pub fn get_u8(&self, ordinal: usize) -> Result<u8> {
        match self.typed(ordinal, &DataType::TinyInt)? {
            Value::TinyInt(i) => Ok(i),
            other => Err(mismatch(&other, "TINYINT")),
        }
    }

    pub fn get_i16(&self, ordinal: usize) -> Result<i16> {
        match self.typed(ordinal, &DataType::SmallInt)? {
            Value::SmallInt(i) => Ok(i),
            other => Err(mismatch(&other, "SMALLINT")),
        }
    }

    pub fn get_i32(&self, ordinal: usize) -> Result<i32> {
        match self.typed(ordinal, &DataType::Int)? {
            Value::Int(i) => Ok(i),
            other => Err(mismatch(&other, "INT")),
        }
    }

    pub fn get_i64(&self, ordinal: usize) -> Result<i64> {
        match self.typed(ordinal, &DataType::BigInt)? {
            Value::BigInt(i) => Ok(i),
            other => Err(mismatch(&other, "BIGINT")),
        }
    }

    pub fn get_f64(&self, ordinal: usize) -> Result<f64> {
        match self.typed(ordinal, &DataType::Float)? {
            Value::Float(f) => Ok(f),
            other => Err(mismatch(&other, "FLOAT")),
        }
    }

    /// Exact decimal, keeping the stored scale
    pub fn get_decimal(&self, ordinal: usize) -> Result<Decimal> {
        let value = self.non_null(ordinal, "DECIMAL")?;
        value.as_decimal().ok_or_else(|| mismatch(value, "DECIMAL"))
    }

    pub fn get_string(&self, ordinal: usize) -> Result<String> {
        let value = self.non_null(ordinal, "VARCHAR")?;
        value.to_text().ok_or_else(|| mismatch(value, "VARCHAR"))
    }

    pub fn get_datetime(&self, ordinal: usize) -> Result<NaiveDateTime> {
        match self.typed(ordinal, &DataType::DateTime)? {
            Value::DateTime(dt) => Ok(dt),
            other => Err(mismatch(&other, "DATETIME")),
        }
    }

    pub fn get_guid(&self, ordinal: usize) -> Result<Uuid> {
        match self.typed(ordinal, &DataType::Guid)? {
            Value::Guid(g) => Ok(g),
            other => Err(mismatch(&other, "GUID")),
        }
    }

    pub fn get_bytes(&self, ordinal: usize) -> Result<Bytes> {
        match self.typed(ordinal, &DataType::Blob)? {
            Value::Blob(b) => Ok(b),
            other => Err(mismatch(&other, "BLOB")),
        }
    }

    /// Close the reader, letting the session run statements again
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.current = None;
            self.slot.close();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn current_row(&self) -> Result<&Tuple> {
        self.current
            .and_then(|i| self.result.rows.get(i))
            .ok_or_else(|| Error::ExecutionError("no current row".to_string()))
    }

    fn column(&self, ordinal: usize) -> Result<&ColumnDescriptor> {
        self.result.columns.get(ordinal).ok_or_else(|| {
            Error::ExecutionError(format!(
                "ordinal {} out of range for {} columns",
                ordinal,
                self.result.columns.len()
            ))
        })
    }

    fn non_null(&self, ordinal: usize, target: &str) -> Result<&Value> {
        let value = self.get_value(ordinal)?;
        if value.is_null() {
            return Err(mismatch(value, target));
        }
        Ok(value)
    }

    fn typed(&self, ordinal: usize, target: &DataType) -> Result<Value> {
        self.non_null(ordinal, &target.to_string())?.cast(target)
    }
}

fn mismatch(value: &Value, target: &str) -> Error {
    Error::TypeMismatch {
        from: value.type_name().to_string(),
        to: target.to_string(),
    }
}

impl Drop for Reader {
    fn drop(&mut self) {
        if !self.closed {
            self.slot.abandon();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn reader() -> Reader {
        let result = QueryResult::with_rows(
            vec![
                ColumnDescriptor::new("Id", Some("T".into()), DataType::Int),
                ColumnDescriptor::new("Price", Some("T".into()), DataType::Decimal(10, 2)),
                ColumnDescriptor::new("Note", Some("T".into()), DataType::Varchar(None)),
            ],
            vec![
                Tuple::new(vec![
                    Value::Int(1),
                    Value::Decimal(Decimal::from_str("12.50").unwrap()),
                    Value::Null,
                ]),
                Tuple::new(vec![Value::Int(2), Value::Null, Value::from("x")]),
            ],
        );
        Reader::new(result, Slot::new())
    }

    #[test]
    fn test_read_rows_in_order() {
        let mut r = reader();
        assert!(r.get_value(0).is_err());
        assert!(r.read().unwrap());
        assert_eq!(r.get_i32(0).unwrap(), 1);
        assert_eq!(r.get_i64(0).unwrap(), 1);
        assert_eq!(r.get_decimal(1).unwrap().to_string(), "12.50");
        assert!(r.is_null(2).unwrap());
        assert!(matches!(r.get_string(2), Err(Error::TypeMismatch { .. })));

        assert!(r.read().unwrap());
        assert_eq!(r.get_string(2).unwrap(), "x");
        assert_eq!(r.get_i16(0).unwrap(), 2);
        assert_eq!(r.get_u8(0).unwrap(), 2);
        assert_eq!(
            r.get_values().unwrap(),
            &[Value::Int(2), Value::Null, Value::from("x")][..]
        );
        assert!(!r.read().unwrap());
        assert!(r.get_values().is_err());
        assert_eq!(r.records_affected(), -1);
    }

    #[test]
    fn test_column_metadata() {
        let r = reader();
        assert_eq!(r.field_count(), 3);
        assert_eq!(r.ordinal("price").unwrap(), 1);
        assert_eq!(r.name(2).unwrap(), "Note");
        assert_eq!(r.field_kind(1).unwrap(), ScalarKind::Decimal);
        assert!(matches!(r.ordinal("nope"), Err(Error::ColumnNotFound(..))));
        assert!(r.name(7).is_err());
    }

    #[test]
    fn test_close_and_drop_mark_slot() {
        use super::super::handle::SlotState;

        let slot = Slot::new();
        let mut r = Reader::new(QueryResult::with_update_count(3), slot.clone());
        assert_eq!(r.records_affected(), 3);
        r.close();
        assert!(r.read().is_err());
        drop(r);
        assert_eq!(slot.state(), SlotState::Closed);

        let slot = Slot::new();
        drop(Reader::new(QueryResult::with_update_count(0), slot.clone()));
        assert_eq!(slot.state(), SlotState::Abandoned);
    }
}
