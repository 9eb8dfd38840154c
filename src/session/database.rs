//! A named database: its store, transactions and users

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::error::{Error, Result};
use crate::executor::{ExecContext, Executor, LogicalPlan, Planner, QueryResult, Variables};
use crate::sql::Statement;
use crate::storage::Store;
use crate::transaction::{TransactionManager, TxnId, UndoLog};

/// How one statement runs: the transaction it belongs to and the session
/// settings it sees
#[derive(Debug, Clone, Copy)]
pub(crate) struct StatementScope {
    pub txn_id: TxnId,
    pub owner: Option<TxnId>,
    pub lock_reads: bool,
    pub pad_char: bool,
    pub last_identity: Option<i64>,
}

/// One database shared by its sessions
#[derive(Debug)]
pub struct Database {
    name: String,
    store: RwLock<Store>,
    transactions: TransactionManager,
    /// Lowercased user name to password
    users: RwLock<HashMap<String, String>>,
}

impl Database {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            store: RwLock::new(Store::new()),
            transactions: TransactionManager::new(),
            users: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared access to the store. A poisoned lock is recovered: every
    /// mutation is undone on failure, so the store stays consistent.
    pub fn read(&self) -> RwLockReadGuard<'_, Store> {
        self.store.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Store> {
        self.store.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn transactions(&self) -> &TransactionManager {
        &self.transactions
    }

    pub fn add_user(&self, user: &str, password: &str) {
        self.users
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(user.to_lowercase(), password.to_string());
    }

    pub fn authenticate(&self, user: &str, password: &str) -> bool {
        self.users
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&user.to_lowercase())
            .map_or(false, |p| p == password)
    }

    /// Bind and execute one data statement. Reads run under the shared
    /// store lock, everything else under the exclusive one. On failure the
    /// statement's own undo records are replayed before the lock is
    /// released. Returns the result and the session's new last identity.
    pub(crate) fn run_statement(
        &self,
        stmt: Statement,
        scope: StatementScope,
        variables: &mut Variables,
        undo: &mut UndoLog,
    ) -> Result<(QueryResult, Option<i64>)> {
        let viewer = Some(scope.txn_id);
        if !stmt.is_mutation() {
            let store = self.read();
            let plan = Planner::new(&store, viewer, variables, scope.last_identity).plan(stmt)?;
            debug!(database = %self.name, "plan bound");
            let mut executor = Executor::new(context(scope, &self.transactions, undo));
            let result = match plan {
                LogicalPlan::SetVariable { name, value } => {
                    let value = executor.evaluate(&store, value)?;
                    variables.set(&name, value)?;
                    QueryResult::with_update_count(0)
                }
                LogicalPlan::Select(select) => executor.query(&store, select)?,
                other => {
                    return Err(Error::Internal(format!(
                        "read path cannot run {:?}",
                        other
                    )))
                }
            };
            return Ok((result, executor.last_identity()));
        }

        let mark = undo.mark();
        let mut store = self.write();
        let plan = Planner::new(&store, viewer, variables, scope.last_identity).plan(stmt);
        let outcome = plan.and_then(|plan| {
            debug!(database = %self.name, "plan bound");
            let mut executor = Executor::new(context(scope, &self.transactions, &mut *undo));
            let result = executor.execute(&mut store, plan)?;
            Ok((result, executor.last_identity()))
        });
        if outcome.is_err() {
            let records = undo.split_off(mark);
            debug!(database = %self.name, records = records.len(), "reverting failed statement");
            store.undo(records);
        }
        outcome
    }
}

fn context<'a>(
    scope: StatementScope,
    transactions: &'a TransactionManager,
    undo: &'a mut UndoLog,
) -> ExecContext<'a> {
    ExecContext {
        txn_id: scope.txn_id,
        owner: scope.owner,
        lock_reads: scope.lock_reads,
        pad_char: scope.pad_char,
        locks: transactions.lock_manager(),
        undo,
        last_identity: scope.last_identity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_users_are_case_insensitive() {
        let db = Database::new("Shop");
        db.add_user("Alice", "pw");
        assert!(db.authenticate("alice", "pw"));
        assert!(!db.authenticate("alice", "PW"));
        assert!(!db.authenticate("bob", ""));
    }

    #[test]
    fn test_failed_statement_is_reverted() {
        let db = Database::new("d");
        let mut vars = Variables::new();
        let mut undo = UndoLog::new();
        let scope = StatementScope {
            txn_id: db.transactions().begin(),
            owner: None,
            lock_reads: true,
            pad_char: true,
            last_identity: None,
        };

        let mut run = |sql: &str| {
            let stmt = crate::sql::parse_batch(sql).unwrap().remove(0);
            db.run_statement(stmt, scope, &mut vars, &mut undo)
        };
        run("CREATE TABLE t (id INT PRIMARY KEY)").unwrap();
        run("INSERT INTO t VALUES (1)").unwrap();
        assert!(run("INSERT INTO t VALUES (2), (1)").is_err());

        let (result, _) = run("SELECT * FROM t").unwrap();
        assert_eq!(result.rows.len(), 1);
    }
}
