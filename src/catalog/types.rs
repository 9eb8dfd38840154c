//! Data types for QuillDB
//!
//! This module defines the declared SQL column types and the scalar kinds
//! they map to when results are handed to callers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default precision for `DECIMAL` without arguments
pub const DEFAULT_DECIMAL_PRECISION: u8 = 18;

/// Largest precision representable by the decimal backend
pub const MAX_DECIMAL_PRECISION: u8 = 28;

/// SQL Data Types
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Single bit boolean
    Bit,
    /// Unsigned 8-bit integer
    TinyInt,
    /// Small integer (16-bit)
    SmallInt,
    /// Integer (32-bit)
    Int,
    /// Big integer (64-bit), also declared as `INTEGER`
    BigInt,
    /// Double-precision floating point
    Float,
    /// Floating point declared as `REAL`, stored with double precision
    Real,
    /// Fixed-point decimal with precision and scale
    Decimal(u8, u8),
    /// Fixed-length character string, space padded
    Char(usize),
    /// Variable-length character string with optional max length
    Varchar(Option<usize>),
    /// Date and time
    DateTime,
    /// Binary data
    Blob,
    /// 128-bit unique identifier
    Guid,
    /// Any type name the engine does not interpret
    Other(String),
}

/// Scalar kinds exposed to callers through result column descriptors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    Boolean,
    Byte,
    Int16,
    Int32,
    Int64,
    Double,
    Decimal,
    String,
    DateTime,
    Bytes,
    Guid,
    Object,
}

impl DataType {
    /// Resolve a declared type name with its optional parenthesised arguments.
    ///
    /// Unknown names are kept as [`DataType::Other`].
    pub fn from_name(name: &str, args: &[u64]) -> std::result::Result<DataType, String> {
        let upper = name.to_ascii_uppercase();
        let arg = |i: usize| args.get(i).copied();
        let dt = match upper.as_str() {
            "BIT" | "BOOLEAN" | "BOOL" => DataType::Bit,
            "TINYINT" => DataType::TinyInt,
            "SMALLINT" => DataType::SmallInt,
            "INT" => DataType::Int,
            "BIGINT" | "INTEGER" => DataType::BigInt,
            "FLOAT" | "DOUBLE" => DataType::Float,
            "REAL" => DataType::Real,
            "DECIMAL" | "NUMERIC" => {
                let precision = arg(0).unwrap_or(DEFAULT_DECIMAL_PRECISION as u64);
                let scale = arg(1).unwrap_or(0);
                if precision == 0 || precision > MAX_DECIMAL_PRECISION as u64 {
                    return Err(format!("DECIMAL precision {} out of range", precision));
                }
                if scale > precision {
                    return Err(format!(
                        "DECIMAL scale {} exceeds precision {}",
                        scale, precision
                    ));
                }
                DataType::Decimal(precision as u8, scale as u8)
            }
            "CHAR" | "NCHAR" | "CHARACTER" => DataType::Char(arg(0).unwrap_or(1) as usize),
            "VARCHAR" | "NVARCHAR" | "TEXT" | "LONGVARCHAR" => {
                DataType::Varchar(arg(0).map(|n| n as usize))
            }
            "DATETIME" | "DATE" | "TIME" | "TIMESTAMP" => DataType::DateTime,
            "BLOB" | "BINARY" | "VARBINARY" | "IMAGE" => DataType::Blob,
            "GUID" | "UNIQUEIDENTIFIER" | "UUID" => DataType::Guid,
            _ => DataType::Other(upper),
        };
        Ok(dt)
    }

    /// The scalar kind callers see for values of this type
    pub fn scalar_kind(&self) -> ScalarKind {
        match self {
            DataType::Bit => ScalarKind::Boolean,
            DataType::TinyInt => ScalarKind::Byte,
            DataType::SmallInt => ScalarKind::Int16,
            DataType::Int => ScalarKind::Int32,
            DataType::BigInt => ScalarKind::Int64,
            DataType::Float | DataType::Real => ScalarKind::Double,
            DataType::Decimal(_, _) => ScalarKind::Decimal,
            DataType::Char(_) | DataType::Varchar(_) => ScalarKind::String,
            DataType::DateTime => ScalarKind::DateTime,
            DataType::Blob => ScalarKind::Bytes,
            DataType::Guid => ScalarKind::Guid,
            DataType::Other(_) => ScalarKind::Object,
        }
    }

    /// Check if this type is an integer type
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DataType::TinyInt | DataType::SmallInt | DataType::Int | DataType::BigInt
        )
    }

    /// Check if this type is numeric
    pub fn is_numeric(&self) -> bool {
        self.is_integer()
            || matches!(self, DataType::Float | DataType::Real | DataType::Decimal(_, _))
    }

    /// Check if this type is a string type
    pub fn is_string(&self) -> bool {
        matches!(self, DataType::Char(_) | DataType::Varchar(_))
    }

    /// Check if this type is comparable with another type
    pub fn is_comparable_with(&self, other: &DataType) -> bool {
        match (self, other) {
            (a, b) if a == b => true,
            (a, b) if a.is_numeric() && b.is_numeric() => true,
            (a, b) if a.is_string() && b.is_string() => true,
            // string literals are accepted for dates and guids
            (DataType::DateTime | DataType::Guid, b) if b.is_string() => true,
            (a, DataType::DateTime | DataType::Guid) if a.is_string() => true,
            _ => false,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Bit => write!(f, "BIT"),
            DataType::TinyInt => write!(f, "TINYINT"),
            DataType::SmallInt => write!(f, "SMALLINT"),
            DataType::Int => write!(f, "INT"),
            DataType::BigInt => write!(f, "BIGINT"),
            DataType::Float => write!(f, "FLOAT"),
            DataType::Real => write!(f, "REAL"),
            DataType::Decimal(p, s) => write!(f, "DECIMAL({},{})", p, s),
            DataType::Char(n) => write!(f, "CHAR({})", n),
            DataType::Varchar(Some(n)) => write!(f, "VARCHAR({})", n),
            DataType::Varchar(None) => write!(f, "VARCHAR"),
            DataType::DateTime => write!(f, "DATETIME"),
            DataType::Blob => write!(f, "BLOB"),
            DataType::Guid => write!(f, "GUID"),
            DataType::Other(name) => write!(f, "{}", name),
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarKind::Boolean => "Boolean",
            ScalarKind::Byte => "Byte",
            ScalarKind::Int16 => "Int16",
            ScalarKind::Int32 => "Int32",
            ScalarKind::Int64 => "Int64",
            ScalarKind::Double => "Double",
            ScalarKind::Decimal => "Decimal",
            ScalarKind::String => "String",
            ScalarKind::DateTime => "DateTime",
            ScalarKind::Bytes => "Bytes",
            ScalarKind::Guid => "Guid",
            ScalarKind::Object => "Object",
        };
        f.write_str(name)
    }
}
