//! Transaction Manager
//!
//! Handles transaction id allocation, the lifecycle of transactions
//! (Begin, Commit, Rollback) and table-level two-phase locking.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use super::undo::UndoLog;
use crate::error::{Error, Result};

/// Transaction identifier, unique within a database
pub type TxnId = u64;

/// Transaction State
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    Aborted,
}

/// Isolation levels accepted by `begin_transaction`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IsolationLevel {
    /// Reads take no shared locks
    ReadUncommitted,
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    /// Do reads under this level take shared table locks?
    pub fn locks_reads(self) -> bool {
        self != IsolationLevel::ReadUncommitted
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        };
        f.write_str(s)
    }
}

/// An open transaction owned by a session
#[derive(Debug)]
pub struct Transaction {
    pub id: TxnId,
    pub isolation: IsolationLevel,
    /// Changes to revert on rollback, oldest first
    pub undo: UndoLog,
}

impl Transaction {
    pub fn new(id: TxnId, isolation: IsolationLevel) -> Self {
        Self {
            id,
            isolation,
            undo: UndoLog::new(),
        }
    }
}

/// Lock Mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Lock Manager
#[derive(Debug, Default)]
pub struct LockManager {
    /// Locks: Table Name -> (Exclusive Lock Holder, Shared Lock Holders)
    locks: Mutex<HashMap<String, (Option<TxnId>, Vec<TxnId>)>>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire a lock, failing immediately with `LockConflict` if another
    /// transaction holds an incompatible one.
    pub fn acquire(&self, table: &str, trans_id: TxnId, mode: LockMode) -> Result<()> {
        let mut locks = lock(&self.locks);
        let entry = locks
            .entry(table.to_lowercase())
            .or_insert((None, Vec::new()));
        let conflict = || Error::LockConflict(table.to_string());

        match mode {
            LockMode::Shared => {
                if let Some(current_exclusive) = entry.0 {
                    if current_exclusive == trans_id {
                        // Already have exclusive, so we have shared implicitly
                        return Ok(());
                    }
                    return Err(conflict());
                }
                if !entry.1.contains(&trans_id) {
                    entry.1.push(trans_id);
                }
                Ok(())
            }
            LockMode::Exclusive => {
                if let Some(current_exclusive) = entry.0 {
                    if current_exclusive == trans_id {
                        return Ok(());
                    }
                    return Err(conflict());
                }
                if entry.1.iter().any(|&id| id != trans_id) {
                    return Err(conflict());
                }
                // Upgrade (or plain grant)
                entry.1.clear();
                entry.0 = Some(trans_id);
                Ok(())
            }
        }
    }

    /// Release locks for a transaction
    pub fn release_all(&self, trans_id: TxnId) {
        let mut locks = lock(&self.locks);
        for (_, (exclusive, shared)) in locks.iter_mut() {
            if *exclusive == Some(trans_id) {
                *exclusive = None;
            }
            shared.retain(|&id| id != trans_id);
        }
        locks.retain(|_, (exclusive, shared)| exclusive.is_some() || !shared.is_empty());
    }
}

/// Transaction Manager, shared by all sessions of a database
#[derive(Debug)]
pub struct TransactionManager {
    /// Transaction states
    transactions: Mutex<HashMap<TxnId, TransactionState>>,
    /// Next Transaction ID
    next_trans_id: AtomicU64,
    /// Lock Manager
    lock_manager: LockManager,
}

impl TransactionManager {
    /// Create a new transaction manager
    pub fn new() -> Self {
        Self {
            transactions: Mutex::new(HashMap::new()),
            next_trans_id: AtomicU64::new(1),
            lock_manager: LockManager::new(),
        }
    }

    /// Begin a new transaction
    pub fn begin(&self) -> TxnId {
        let trans_id = self.next_trans_id.fetch_add(1, Ordering::SeqCst);
        lock(&self.transactions).insert(trans_id, TransactionState::Active);
        debug!(trans_id, "transaction started");
        trans_id
    }

    fn finish(&self, trans_id: TxnId, state: TransactionState) -> Result<()> {
        {
            let mut transactions = lock(&self.transactions);
            match transactions.get(&trans_id) {
                Some(TransactionState::Active) => {
                    // finished transactions are forgotten
                    transactions.remove(&trans_id);
                }
                _ => return Err(Error::NoActiveTransaction),
            }
        }
        self.lock_manager.release_all(trans_id);
        debug!(trans_id, ?state, "transaction finished");
        Ok(())
    }

    /// Commit a transaction and release its locks
    pub fn commit(&self, trans_id: TxnId) -> Result<()> {
        self.finish(trans_id, TransactionState::Committed)
    }

    /// Abort a transaction and release its locks. Data changes are reverted
    /// by the owner's undo log before this is called.
    pub fn rollback(&self, trans_id: TxnId) -> Result<()> {
        self.finish(trans_id, TransactionState::Aborted)
    }

    /// Access the lock manager
    pub fn lock_manager(&self) -> &LockManager {
        &self.lock_manager
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_locks_coexist() {
        let locks = LockManager::new();
        locks.acquire("t", 1, LockMode::Shared).unwrap();
        locks.acquire("T", 2, LockMode::Shared).unwrap();
        assert!(matches!(
            locks.acquire("t", 1, LockMode::Exclusive),
            Err(Error::LockConflict(_))
        ));
    }

    #[test]
    fn test_exclusive_upgrade_and_release() {
        let locks = LockManager::new();
        locks.acquire("t", 1, LockMode::Shared).unwrap();
        locks.acquire("t", 1, LockMode::Exclusive).unwrap();
        locks.acquire("t", 1, LockMode::Shared).unwrap();
        assert!(locks.acquire("t", 2, LockMode::Shared).is_err());

        locks.release_all(1);
        locks.acquire("t", 2, LockMode::Exclusive).unwrap();
    }

    #[test]
    fn test_transaction_lifecycle() {
        let tm = TransactionManager::new();
        let a = tm.begin();
        let b = tm.begin();
        assert_ne!(a, b);

        let locks = tm.lock_manager();
        locks.acquire("t", a, LockMode::Exclusive).unwrap();
        assert!(locks.acquire("t", b, LockMode::Shared).is_err());

        tm.commit(a).unwrap();
        locks.acquire("t", b, LockMode::Shared).unwrap();

        assert!(matches!(tm.commit(a), Err(Error::NoActiveTransaction)));
        tm.rollback(b).unwrap();
        assert!(matches!(tm.rollback(b), Err(Error::NoActiveTransaction)));
    }
}
