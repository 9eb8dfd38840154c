//! Liveness slots and transaction handles
//!
//! A [`Slot`] is shared between a session and a handle it gave out. The
//! handle marks the slot when it is closed or dropped; the session looks
//! at the slot before every statement.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use super::session::Session;
use crate::error::Result;
use crate::transaction::{IsolationLevel, TxnId};

const OPEN: u8 = 0;
const CLOSED: u8 = 1;
const ABANDONED: u8 = 2;

/// State of a handle as seen by its session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Open,
    /// Closed explicitly
    Closed,
    /// Dropped while still open
    Abandoned,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Slot(Arc<AtomicU8>);

impl Slot {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn state(&self) -> SlotState {
        match self.0.load(Ordering::Acquire) {
            OPEN => SlotState::Open,
            CLOSED => SlotState::Closed,
            _ => SlotState::Abandoned,
        }
    }

    fn mark(&self, state: u8) {
        // only the first transition out of OPEN counts
        let _ = self
            .0
            .compare_exchange(OPEN, state, Ordering::AcqRel, Ordering::Acquire);
    }

    pub(crate) fn close(&self) {
        self.mark(CLOSED);
    }

    pub(crate) fn abandon(&self) {
        self.mark(ABANDONED);
    }

    /// Do both refer to the same slot?
    pub(crate) fn same(&self, other: &Slot) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Handle to a transaction started with [`Session::begin_transaction`].
///
/// Dropping the handle without committing makes the session roll the
/// transaction back before its next statement.
#[derive(Debug)]
pub struct TransactionHandle {
    txn_id: TxnId,
    isolation: IsolationLevel,
    slot: Slot,
}

impl TransactionHandle {
    pub(crate) fn new(txn_id: TxnId, isolation: IsolationLevel, slot: Slot) -> Self {
        Self {
            txn_id,
            isolation,
            slot,
        }
    }

    pub fn id(&self) -> TxnId {
        self.txn_id
    }

    pub fn isolation(&self) -> IsolationLevel {
        self.isolation
    }

    /// Commit. Fails with `NoActiveTransaction` when the transaction was
    /// already finished, for example by a SQL `COMMIT`, or when `session` is
    /// not the session that began it.
    pub fn commit(self, session: &mut Session) -> Result<()> {
        self.slot.close();
        session.finish_handle(&self.slot, self.txn_id, true)
    }

    /// Roll back. Fails with `NoActiveTransaction` when the transaction was
    /// already finished or belongs to another session.
    pub fn rollback(self, session: &mut Session) -> Result<()> {
        self.slot.close();
        session.finish_handle(&self.slot, self.txn_id, false)
    }
}

impl Drop for TransactionHandle {
    fn drop(&mut self) {
        self.slot.abandon();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_transitions_once() {
        let slot = Slot::new();
        let shared = slot.clone();
        assert_eq!(slot.state(), SlotState::Open);

        shared.close();
        shared.abandon();
        assert_eq!(slot.state(), SlotState::Closed);

        let other = Slot::new();
        other.abandon();
        other.close();
        assert_eq!(other.state(), SlotState::Abandoned);

        assert!(slot.same(&shared));
        assert!(!slot.same(&other));
    }
}
