//! Storage engine module
//!
//! This module contains the in-memory storage components:
//! - Values and tuples
//! - Ordered indexes
//! - Table row storage
//! - The per-database store tying catalog and tables together

pub mod index;
pub mod store;
pub mod table;
pub mod tuple;

pub use index::{Index, IndexKey};
pub use store::Store;
pub use table::{RowId, Table};
pub use tuple::{ArithOp, Tuple, Value};
