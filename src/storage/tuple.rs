//! Tuple and Value types for QuillDB
//!
//! This module defines how data values are represented in memory, how they
//! compare, combine arithmetically, and how they are coerced to declared
//! column types.

use crate::catalog::DataType;
use crate::error::{Error, Result};
use bytes::Bytes;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

/// Formats accepted when a string is coerced to `DATETIME`
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y.%m.%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y.%m.%d", "%Y/%m/%d"];

/// Format used when rendering a `DATETIME`
pub const DATETIME_DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// A value in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    /// NULL value
    Null,
    /// BIT value
    Bit(bool),
    /// Unsigned 8-bit integer
    TinyInt(u8),
    /// 16-bit integer
    SmallInt(i16),
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    BigInt(i64),
    /// Double-precision float
    Float(f64),
    /// Exact decimal
    Decimal(Decimal),
    /// String value
    String(String),
    /// Date and time
    DateTime(NaiveDateTime),
    /// Binary data
    Blob(Bytes),
    /// Unique identifier
    Guid(Uuid),
}

// Floats compare bitwise so that values can key hash maps
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bit(a), Value::Bit(b)) => a == b,
            (Value::TinyInt(a), Value::TinyInt(b)) => a == b,
            (Value::SmallInt(a), Value::SmallInt(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Blob(a), Value::Blob(b)) => a == b,
            (Value::Guid(a), Value::Guid(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bit(v) => v.hash(state),
            Value::TinyInt(v) => v.hash(state),
            Value::SmallInt(v) => v.hash(state),
            Value::Int(v) => v.hash(state),
            Value::BigInt(v) => v.hash(state),
            Value::Float(v) => v.to_bits().hash(state),
            Value::Decimal(v) => v.hash(state),
            Value::String(v) => v.hash(state),
            Value::DateTime(v) => v.hash(state),
            Value::Blob(v) => v.hash(state),
            Value::Guid(v) => v.hash(state),
        }
    }
}

/// Numeric view of a value used for promotion
#[derive(Debug, Clone, Copy)]
enum Numeric {
    /// `wide` is set when either side was a BIGINT
    Int { value: i64, wide: bool },
    Decimal(Decimal),
    Float(f64),
}

impl Numeric {
    fn to_decimal(self) -> Option<Decimal> {
        match self {
            Numeric::Int { value, .. } => Some(Decimal::from(value)),
            Numeric::Decimal(d) => Some(d),
            Numeric::Float(f) => Decimal::from_f64(f),
        }
    }

    fn to_f64(self) -> f64 {
        match self {
            Numeric::Int { value, .. } => value as f64,
            Numeric::Decimal(d) => d.to_f64().unwrap_or(f64::NAN),
            Numeric::Float(f) => f,
        }
    }
}

/// Arithmetic operators understood by [`Value::arithmetic`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Rem => "%",
        };
        f.write_str(s)
    }
}

impl Value {
    /// Check if this value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to convert to boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bit(b) => Some(*b),
            _ => self.as_i64().map(|i| i != 0),
        }
    }

    /// Try to convert to i64 (integer types only)
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::TinyInt(i) => Some(*i as i64),
            Value::SmallInt(i) => Some(*i as i64),
            Value::Int(i) => Some(*i as i64),
            Value::BigInt(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to convert to f64
    pub fn as_f64(&self) -> Option<f64> {
        self.numeric().map(Numeric::to_f64)
    }

    /// Try to convert to an exact decimal
    pub fn as_decimal(&self) -> Option<Decimal> {
        self.numeric().and_then(Numeric::to_decimal)
    }

    /// Try to borrow as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bit(_) => "BIT",
            Value::TinyInt(_) => "TINYINT",
            Value::SmallInt(_) => "SMALLINT",
            Value::Int(_) => "INT",
            Value::BigInt(_) => "BIGINT",
            Value::Float(_) => "FLOAT",
            Value::Decimal(_) => "DECIMAL",
            Value::String(_) => "VARCHAR",
            Value::DateTime(_) => "DATETIME",
            Value::Blob(_) => "BLOB",
            Value::Guid(_) => "GUID",
        }
    }

    /// The natural declared type of this value, if it has one
    pub fn data_type(&self) -> Option<DataType> {
        let dt = match self {
            Value::Null => return None,
            Value::Bit(_) => DataType::Bit,
            Value::TinyInt(_) => DataType::TinyInt,
            Value::SmallInt(_) => DataType::SmallInt,
            Value::Int(_) => DataType::Int,
            Value::BigInt(_) => DataType::BigInt,
            Value::Float(_) => DataType::Float,
            Value::Decimal(d) => {
                let digits = d.mantissa().unsigned_abs().to_string().len() as u8;
                let scale = d.scale() as u8;
                DataType::Decimal(digits.max(scale).max(1), scale)
            }
            Value::String(_) => DataType::Varchar(None),
            Value::DateTime(_) => DataType::DateTime,
            Value::Blob(_) => DataType::Blob,
            Value::Guid(_) => DataType::Guid,
        };
        Some(dt)
    }

    fn numeric(&self) -> Option<Numeric> {
        match self {
            Value::TinyInt(_) | Value::SmallInt(_) | Value::Int(_) => Some(Numeric::Int {
                value: self.as_i64()?,
                wide: false,
            }),
            Value::BigInt(i) => Some(Numeric::Int {
                value: *i,
                wide: true,
            }),
            Value::Decimal(d) => Some(Numeric::Decimal(*d)),
            Value::Float(f) => Some(Numeric::Float(*f)),
            _ => None,
        }
    }

    /// Compare two non-null values (for WHERE clauses and joins of
    /// predicates). Returns `None` if either side is NULL or the types are
    /// not comparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Bit(a), Value::Bit(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => {
                // trailing blanks are insignificant, as with padded CHAR columns
                Some(a.trim_end_matches(' ').cmp(b.trim_end_matches(' ')))
            }
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (Value::Blob(a), Value::Blob(b)) => Some(a.cmp(b)),
            (Value::Guid(a), Value::Guid(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::String(s)) => {
                parse_datetime(s).map(|b| a.cmp(&b))
            }
            (Value::String(s), Value::DateTime(b)) => parse_datetime(s).map(|a| a.cmp(b)),
            (Value::Guid(a), Value::String(s)) => Uuid::parse_str(s.trim()).ok().map(|b| a.cmp(&b)),
            (Value::String(s), Value::Guid(b)) => Uuid::parse_str(s.trim()).ok().map(|a| a.cmp(b)),
            _ => {
                let (a, b) = (self.numeric()?, other.numeric()?);
                match (a, b) {
                    (Numeric::Int { value: x, .. }, Numeric::Int { value: y, .. }) => Some(x.cmp(&y)),
                    (Numeric::Float(_), _) | (_, Numeric::Float(_)) => {
                        a.to_f64().partial_cmp(&b.to_f64())
                    }
                    _ => Some(a.to_decimal()?.cmp(&b.to_decimal()?)),
                }
            }
        }
    }

    /// Canonical form under `=`: values that compare equal map to the same
    /// key. Used to remove duplicate rows.
    pub fn equality_key(&self) -> Value {
        match self {
            Value::String(s) => Value::String(s.trim_end_matches(' ').to_string()),
            _ => match self.as_decimal() {
                Some(d) => Value::Decimal(d.normalize()),
                None => self.clone(),
            },
        }
    }

    /// Total order used for sorting and index keys. NULL sorts first; values
    /// of incomparable types fall back to a fixed type rank.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            _ => self
                .compare(other)
                .unwrap_or_else(|| self.type_rank().cmp(&other.type_rank())),
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bit(_) => 1,
            Value::TinyInt(_)
            | Value::SmallInt(_)
            | Value::Int(_)
            | Value::BigInt(_)
            | Value::Float(_)
            | Value::Decimal(_) => 2,
            Value::String(_) => 3,
            Value::DateTime(_) => 4,
            Value::Blob(_) => 5,
            Value::Guid(_) => 6,
        }
    }

    /// Apply an arithmetic operator. NULL operands yield NULL; two strings
    /// under `+` concatenate.
    pub fn arithmetic(&self, op: ArithOp, other: &Value) -> Result<Value> {
        if self.is_null() || other.is_null() {
            return Ok(Value::Null);
        }
        if let (ArithOp::Add, Value::String(a), Value::String(b)) = (op, self, other) {
            return Ok(Value::String(format!("{}{}", a, b)));
        }

        let mismatch = || Error::TypeMismatch {
            from: format!("{} {} {}", self.type_name(), op, other.type_name()),
            to: "a numeric value".to_string(),
        };
        let (a, b) = match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => (a, b),
            _ => return Err(mismatch()),
        };
        let overflow = || Error::NumericOverflow(format!("{} {} {}", self, op, other));

        match (a, b) {
            (Numeric::Int { value: x, wide: wx }, Numeric::Int { value: y, wide: wy }) => {
                let result = match op {
                    ArithOp::Add => x.checked_add(y),
                    ArithOp::Sub => x.checked_sub(y),
                    ArithOp::Mul => x.checked_mul(y),
                    ArithOp::Div | ArithOp::Rem if y == 0 => return Err(Error::DivisionByZero),
                    ArithOp::Div => x.checked_div(y),
                    ArithOp::Rem => x.checked_rem(y),
                }
                .ok_or_else(overflow)?;
                if wx || wy {
                    Ok(Value::BigInt(result))
                } else {
                    i32::try_from(result).map(Value::Int).map_err(|_| overflow())
                }
            }
            (Numeric::Float(_), _) | (_, Numeric::Float(_)) => {
                let (x, y) = (a.to_f64(), b.to_f64());
                let result = match op {
                    ArithOp::Add => x + y,
                    ArithOp::Sub => x - y,
                    ArithOp::Mul => x * y,
                    ArithOp::Div | ArithOp::Rem if y == 0.0 => return Err(Error::DivisionByZero),
                    ArithOp::Div => x / y,
                    ArithOp::Rem => x % y,
                };
                if !result.is_finite() {
                    return Err(overflow());
                }
                Ok(Value::Float(result))
            }
            _ => {
                let x = a.to_decimal().ok_or_else(overflow)?;
                let y = b.to_decimal().ok_or_else(overflow)?;
                let result = match op {
                    ArithOp::Add => x.checked_add(y),
                    ArithOp::Sub => x.checked_sub(y),
                    ArithOp::Mul => x.checked_mul(y),
                    ArithOp::Div | ArithOp::Rem if y.is_zero() => {
                        return Err(Error::DivisionByZero)
                    }
                    ArithOp::Div => x.checked_div(y),
                    ArithOp::Rem => x.checked_rem(y),
                }
                .ok_or_else(overflow)?;
                Ok(Value::Decimal(result))
            }
        }
    }

    /// Arithmetic negation
    pub fn negate(&self) -> Result<Value> {
        match self {
            Value::Null => Ok(Value::Null),
            Value::TinyInt(i) => Ok(Value::SmallInt(-(*i as i16))),
            Value::SmallInt(i) => i
                .checked_neg()
                .map(Value::SmallInt)
                .ok_or_else(|| Error::NumericOverflow(format!("-{}", i))),
            Value::Int(i) => i
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| Error::NumericOverflow(format!("-{}", i))),
            Value::BigInt(i) => i
                .checked_neg()
                .map(Value::BigInt)
                .ok_or_else(|| Error::NumericOverflow(format!("-{}", i))),
            Value::Float(f) => Ok(Value::Float(-f)),
            Value::Decimal(d) => Ok(Value::Decimal(-*d)),
            other => Err(Error::TypeMismatch {
                from: other.type_name().to_string(),
                to: "a numeric value".to_string(),
            }),
        }
    }

    /// Coerce this value to a declared column type.
    ///
    /// NULL passes through unchanged; nullability is checked by the caller.
    /// Length and range errors name the target type; callers that know the
    /// column re-label them.
    pub fn cast(&self, target: &DataType) -> Result<Value> {
        if self.is_null() {
            return Ok(Value::Null);
        }
        let mismatch = || Error::TypeMismatch {
            from: self.type_name().to_string(),
            to: target.to_string(),
        };
        let out_of_range = || Error::NumericOverflow(format!("{} for {}", self, target));

        let value = match target {
            DataType::Bit => match self {
                Value::Bit(b) => Value::Bit(*b),
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" => Value::Bit(true),
                    "false" | "0" => Value::Bit(false),
                    _ => return Err(mismatch()),
                },
                _ => Value::Bit(self.as_i64().ok_or_else(mismatch)? != 0),
            },
            DataType::TinyInt | DataType::SmallInt | DataType::Int | DataType::BigInt => {
                let i = self.to_integer().ok_or_else(mismatch)??;
                match target {
                    DataType::TinyInt => Value::TinyInt(u8::try_from(i).map_err(|_| out_of_range())?),
                    DataType::SmallInt => {
                        Value::SmallInt(i16::try_from(i).map_err(|_| out_of_range())?)
                    }
                    DataType::Int => Value::Int(i32::try_from(i).map_err(|_| out_of_range())?),
                    _ => Value::BigInt(i),
                }
            }
            DataType::Float | DataType::Real => match self {
                Value::String(s) => Value::Float(
                    s.trim()
                        .parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .ok_or_else(mismatch)?,
                ),
                _ => Value::Float(self.as_f64().ok_or_else(mismatch)?),
            },
            DataType::Decimal(precision, scale) => {
                let d = match self {
                    Value::String(s) => s.trim().parse::<Decimal>().map_err(|_| mismatch())?,
                    _ => self.as_decimal().ok_or_else(mismatch)?,
                };
                Value::Decimal(fit_decimal(d, *precision, *scale).ok_or_else(out_of_range)?)
            }
            DataType::Char(n) => {
                let s = self.to_text().ok_or_else(mismatch)?;
                let trimmed = s.trim_end_matches(' ');
                let len = trimmed.chars().count();
                if len > *n {
                    return Err(Error::ValueTooLarge(target.to_string()));
                }
                let mut padded = trimmed.to_string();
                padded.extend(std::iter::repeat(' ').take(n - len));
                Value::String(padded)
            }
            DataType::Varchar(limit) => {
                let s = self.to_text().ok_or_else(mismatch)?;
                if let Some(n) = limit {
                    if s.chars().count() > *n {
                        return Err(Error::ValueTooLarge(target.to_string()));
                    }
                }
                Value::String(s)
            }
            DataType::DateTime => match self {
                Value::DateTime(dt) => Value::DateTime(*dt),
                Value::String(s) => Value::DateTime(parse_datetime(s).ok_or_else(mismatch)?),
                _ => return Err(mismatch()),
            },
            DataType::Blob => match self {
                Value::Blob(b) => Value::Blob(b.clone()),
                Value::String(s) => Value::Blob(Bytes::from(hex::decode(s.trim()).map_err(|_| mismatch())?)),
                Value::Guid(g) => Value::Blob(Bytes::copy_from_slice(g.as_bytes())),
                _ => return Err(mismatch()),
            },
            DataType::Guid => match self {
                Value::Guid(g) => Value::Guid(*g),
                Value::String(s) => Value::Guid(Uuid::parse_str(s.trim()).map_err(|_| mismatch())?),
                Value::Blob(b) => Value::Guid(Uuid::from_slice(b).map_err(|_| mismatch())?),
                _ => return Err(mismatch()),
            },
            DataType::Other(_) => self.clone(),
        };
        Ok(value)
    }

    /// Integer conversion: exact for integers, truncating for decimals and
    /// floats, parsed for strings. `None` when the type does not convert.
    fn to_integer(&self) -> Option<Result<i64>> {
        let overflow = || Error::NumericOverflow(format!("{} as integer", self));
        match self {
            Value::Bit(b) => Some(Ok(*b as i64)),
            Value::TinyInt(_) | Value::SmallInt(_) | Value::Int(_) | Value::BigInt(_) => {
                self.as_i64().map(Ok)
            }
            Value::Decimal(d) => Some(d.trunc().to_i64().ok_or_else(overflow)),
            Value::Float(f) => {
                if f.is_finite() && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                    Some(Ok(f.trunc() as i64))
                } else {
                    Some(Err(overflow()))
                }
            }
            Value::String(s) => s.trim().parse::<i64>().ok().map(Ok),
            _ => None,
        }
    }

    /// Text rendering used when a value is stored into a character column
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Blob(b) => Some(hex::encode_upper(b)),
            other => Some(other.to_string()),
        }
    }

    /// Render as a SQL literal that parses back to an equal value
    pub fn to_sql_literal(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bit(b) => (if *b { "1" } else { "0" }).to_string(),
            Value::Float(f) if !f.is_finite() => "NULL".to_string(),
            Value::Float(f) => {
                let s = f.to_string();
                if s.contains('.') || s.contains('e') {
                    s
                } else {
                    format!("{}.0E0", s)
                }
            }
            Value::String(s) => format!("'{}'", s.replace('\'', "''")),
            Value::DateTime(dt) => format!("'{}'", dt.format(DATETIME_DISPLAY_FORMAT)),
            Value::Blob(b) => format!("X'{}'", hex::encode_upper(b)),
            Value::Guid(g) => format!("'{}'", g.simple()),
            other => other.to_string(),
        }
    }
}

/// Round `d` to `scale` places and check it fits `precision` digits
fn fit_decimal(d: Decimal, precision: u8, scale: u8) -> Option<Decimal> {
    let mut rounded = d.round_dp_with_strategy(scale as u32, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(scale as u32);
    let integer_digits = precision.saturating_sub(scale) as u32;
    let limit = Decimal::from_i128_with_scale(10i128.pow(integer_digits), 0);
    if rounded.abs() >= limit {
        return None;
    }
    Some(rounded)
}

/// Parse a date or date-time string in one of the accepted formats
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bit(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::TinyInt(i) => write!(f, "{}", i),
            Value::SmallInt(i) => write!(f, "{}", i),
            Value::Int(i) => write!(f, "{}", i),
            Value::BigInt(i) => write!(f, "{}", i),
            Value::Float(n) => write!(f, "{}", n),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::String(s) => write!(f, "{}", s),
            Value::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_DISPLAY_FORMAT)),
            Value::Blob(b) => write!(f, "X'{}'", hex::encode_upper(b)),
            Value::Guid(g) => write!(f, "{}", g),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bit(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Guid(v)
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Self {
        Value::Blob(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// A tuple (row) in the database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tuple {
    /// Values in this tuple
    values: Vec<Value>,
}

impl Tuple {
    /// Create a new tuple from values
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Get a value by index
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Set a value by index
    pub fn set(&mut self, index: usize, value: Value) {
        if index < self.values.len() {
            self.values[index] = value;
        }
    }

    /// Get all values
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Get number of values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if tuple is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consume the tuple and return the values
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Project specific columns
    pub fn project(&self, indices: &[usize]) -> Vec<Value> {
        indices
            .iter()
            .map(|&i| self.values.get(i).cloned().unwrap_or(Value::Null))
            .collect()
    }
}
