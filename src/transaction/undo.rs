//! Undo log
//!
//! Records the before images of every change a transaction (or a single
//! statement) makes, so the change can be reverted. Records are replayed
//! newest first.

use std::sync::Arc;

use crate::catalog::TableDef;
use super::TxnId;
use crate::storage::{RowId, Table, Tuple};

/// A single undo record
#[derive(Debug, Clone)]
pub enum UndoRecord {
    /// A row was inserted; undo removes it
    Insert { table: String, row_id: RowId },
    /// A row was updated; undo puts the old image back
    Update {
        table: String,
        row_id: RowId,
        before: Tuple,
    },
    /// A row was deleted; undo restores it at its old position
    Delete {
        table: String,
        row_id: RowId,
        before: Tuple,
    },
    /// A table was created; undo drops it
    CreateTable { table: String },
    /// A table was dropped; undo brings back definition and rows at the
    /// catalog position it held
    DropTable {
        def: Arc<TableDef>,
        position: usize,
        storage: Box<Table>,
        pending_owner: Option<TxnId>,
    },
    /// A committed table was retired by the transaction; undo reinstates it
    RetireTable { table: String },
    /// An index was created; undo drops it
    CreateIndex { table: String, index: String },
}

/// Ordered list of undo records
#[derive(Debug, Default)]
pub struct UndoLog {
    records: Vec<UndoRecord>,
}

impl UndoLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record
    pub fn push(&mut self, record: UndoRecord) {
        self.records.push(record);
    }

    /// Position to roll back to later
    pub fn mark(&self) -> usize {
        self.records.len()
    }

    /// Remove and return every record after `mark`, oldest first
    pub fn split_off(&mut self, mark: usize) -> Vec<UndoRecord> {
        self.records.split_off(mark.min(self.records.len()))
    }

    /// Remove and return every record, oldest first
    pub fn take(&mut self) -> Vec<UndoRecord> {
        std::mem::take(&mut self.records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_and_split() {
        let mut log = UndoLog::new();
        log.push(UndoRecord::CreateTable { table: "a".into() });
        let mark = log.mark();
        log.push(UndoRecord::Insert {
            table: "a".into(),
            row_id: 1,
        });
        log.push(UndoRecord::Insert {
            table: "a".into(),
            row_id: 2,
        });

        let tail = log.split_off(mark);
        assert_eq!(tail.len(), 2);
        assert!(matches!(tail[0], UndoRecord::Insert { row_id: 1, .. }));
        assert_eq!(log.len(), 1);

        assert_eq!(log.take().len(), 1);
        assert!(log.is_empty());
    }
}
