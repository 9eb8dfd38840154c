//! Catalog module
//!
//! This module contains the schema catalog, schema definitions, and data types.

pub mod catalog;
pub mod schema;
pub mod types;

pub use catalog::Catalog;
pub use schema::{Column, IndexDef, Schema, TableDef};
pub use types::{DataType, ScalarKind};
