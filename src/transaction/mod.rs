//! Transaction module
//!
//! Transaction lifecycle, table locks and the undo log used for rollback.

pub mod transaction;
pub mod undo;

pub use transaction::{
    IsolationLevel, LockManager, LockMode, Transaction, TransactionManager, TransactionState,
    TxnId,
};
pub use undo::{UndoLog, UndoRecord};
