//! Query execution module
//!
//! This module contains the binder (planner), expression evaluation, the
//! executor and the result types.

pub mod context;
pub mod eval;
pub mod executor;
pub mod planner;
pub mod result;

pub use context::{ExecContext, Variable, Variables};
pub use eval::BoundExpr;
pub use executor::Executor;
pub use planner::{LogicalPlan, Planner, SelectPlan};
pub use result::{ColumnDescriptor, QueryResult, NO_UPDATE_COUNT};
