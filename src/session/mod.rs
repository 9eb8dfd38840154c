//! Session layer
//!
//! The registry of databases, sessions running batches against them, and
//! the readers, transaction handles and parameters sessions hand out.

pub mod database;
pub mod handle;
pub mod params;
pub mod reader;
pub mod registry;
pub mod session;

pub use database::Database;
pub use handle::{SlotState, TransactionHandle};
pub use params::{Direction, Parameter, ParameterSet};
pub use reader::Reader;
pub use registry::Registry;
pub use session::Session;
