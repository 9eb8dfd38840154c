//! Sessions
//!
//! A session runs batches against one database, one statement at a time.
//! It owns the session state: declared variables, the open transaction,
//! the last generated identity and the liveness slots of the reader and
//! transaction handle it has given out.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::database::{Database, StatementScope};
use super::handle::{Slot, SlotState, TransactionHandle};
use super::params::ParameterSet;
use super::reader::Reader;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::executor::{QueryResult, Variables};
use crate::sql::{parse_batch, Statement};
use crate::storage::Value;
use crate::transaction::{IsolationLevel, Transaction, TxnId, UndoLog};

/// A connection to one database
#[derive(Debug)]
pub struct Session {
    id: u64,
    user: String,
    db: Arc<Database>,
    config: Arc<EngineConfig>,
    variables: Variables,
    transaction: Option<Transaction>,
    last_identity: Option<i64>,
    reader_slot: Option<Slot>,
    txn_slot: Option<(TxnId, Slot)>,
    closed: bool,
}

impl Session {
    pub(crate) fn new(id: u64, user: &str, db: Arc<Database>, config: Arc<EngineConfig>) -> Self {
        Self {
            id,
            user: user.to_string(),
            db,
            config,
            variables: Variables::new(),
            transaction: None,
            last_identity: None,
            reader_slot: None,
            txn_slot: None,
            closed: false,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn database(&self) -> &str {
        self.db.name()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    /// Isolation level of the open transaction
    pub fn isolation(&self) -> Option<IsolationLevel> {
        self.transaction.as_ref().map(|t| t.isolation)
    }

    /// Identity value generated last by an INSERT of this session
    pub fn last_identity(&self) -> Option<i64> {
        self.last_identity
    }

    /// Current value of a declared variable
    pub fn variable(&self, name: &str) -> Result<Value> {
        Ok(self.variables.get(name.trim_start_matches('@'))?.value.clone())
    }

    /// Execute a batch and return the result of its last statement.
    ///
    /// Parse, catalog, type, constraint and execution errors come back as
    /// an error-bearing result; execution stops at the first of them.
    /// Session-protocol faults are returned as `Err`.
    pub fn execute(&mut self, sql: &str) -> Result<QueryResult> {
        self.ensure_open()?;
        self.check_liveness()?;
        Ok(self
            .run_batch(sql)?
            .unwrap_or_else(|e| QueryResult::from_error(&e)))
    }

    /// Execute a batch and open a reader over the result of its last
    /// statement. Any failure is returned as `Err`.
    pub fn execute_reader(&mut self, sql: &str) -> Result<Reader> {
        self.ensure_open()?;
        self.check_liveness()?;
        let result = self.run_batch(sql)??;
        let slot = Slot::new();
        self.reader_slot = Some(slot.clone());
        Ok(Reader::new(result, slot))
    }

    /// Execute a batch with parameters. The parameters are declared and
    /// assigned in front of the batch; output parameters are read back
    /// afterwards. Returns the result of the batch itself.
    pub fn execute_with(&mut self, sql: &str, params: &mut ParameterSet) -> Result<QueryResult> {
        self.ensure_open()?;
        self.check_liveness()?;

        let batch = format!("{}{}", params.prelude(), sql);
        let result = match self.run_batch(&batch)? {
            Ok(result) => result,
            Err(e) => return Ok(QueryResult::from_error(&e)),
        };
        if let Some(query) = params.output_query() {
            match self.run_batch(&query)? {
                Ok(outputs) => params.read_outputs(&outputs)?,
                Err(e) => return Ok(QueryResult::from_error(&e)),
            }
        }
        Ok(result)
    }

    /// Start a transaction owned by the returned handle
    pub fn begin_transaction(&mut self, level: IsolationLevel) -> Result<TransactionHandle> {
        self.ensure_open()?;
        self.check_liveness()?;
        let id = self.begin(level, false)?;
        let slot = Slot::new();
        self.txn_slot = Some((id, slot.clone()));
        Ok(TransactionHandle::new(id, level, slot))
    }

    /// Commit the open transaction
    pub fn commit(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.finish_transaction(true)
    }

    /// Roll back the open transaction
    pub fn rollback(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.finish_transaction(false)
    }

    /// Names of the tables this session can see
    pub fn tables(&self) -> Result<Vec<String>> {
        self.ensure_open()?;
        Ok(self.db.read().catalog.list_tables(self.viewer()))
    }

    /// Human-readable description of a table
    pub fn describe_table(&self, name: &str) -> Result<String> {
        self.ensure_open()?;
        self.db.read().catalog.describe_table(name, self.viewer())
    }

    /// Close the session, rolling back an open transaction. Also done on
    /// drop; closing twice is a no-op.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        if self.transaction.is_some() {
            if let Err(e) = self.finish_transaction(false) {
                warn!(session = self.id, error = %e, "rollback on close failed");
            }
        }
        self.reader_slot = None;
        self.txn_slot = None;
        self.closed = true;
        info!(session = self.id, database = %self.db.name(), "session closed");
    }

    /// Finish the transaction behind a handle. Transaction ids are only
    /// unique within a database, so the handle's slot decides ownership.
    pub(crate) fn finish_handle(
        &mut self,
        slot: &Slot,
        txn_id: TxnId,
        commit: bool,
    ) -> Result<()> {
        self.ensure_open()?;
        match &self.txn_slot {
            Some((id, own)) if own.same(slot) && *id == txn_id => self.txn_slot = None,
            _ => return Err(Error::NoActiveTransaction),
        }
        match &self.transaction {
            Some(txn) if txn.id == txn_id => self.finish_transaction(commit),
            _ => Err(Error::NoActiveTransaction),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::SessionClosed);
        }
        Ok(())
    }

    fn viewer(&self) -> Option<TxnId> {
        self.transaction.as_ref().map(|t| t.id)
    }

    /// Pre-statement cleanup of readers and transaction handles that were
    /// closed or dropped since the last statement
    fn check_liveness(&mut self) -> Result<()> {
        match self.reader_slot.as_ref().map(Slot::state) {
            Some(SlotState::Open) => return Err(Error::ReaderAlreadyOpen),
            Some(SlotState::Abandoned) => {
                warn!(session = self.id, "reader dropped without close");
                self.reader_slot = None;
            }
            Some(SlotState::Closed) => self.reader_slot = None,
            None => {}
        }

        let handle = self
            .txn_slot
            .as_ref()
            .map(|(id, slot)| (*id, slot.state()));
        match handle {
            Some((_, SlotState::Closed)) => self.txn_slot = None,
            Some((txn_id, SlotState::Abandoned)) => {
                self.txn_slot = None;
                self.absorb_abandoned(txn_id);
            }
            _ => {}
        }
        Ok(())
    }

    /// Roll back a transaction whose handle was dropped. A transaction that
    /// was already finished is ignored.
    fn absorb_abandoned(&mut self, txn_id: TxnId) {
        if self.viewer() == Some(txn_id) {
            warn!(session = self.id, txn_id, "rolling back abandoned transaction");
            if let Err(e) = self.finish_transaction(false) {
                warn!(session = self.id, error = %e, "rollback of abandoned transaction failed");
            }
        } else {
            warn!(session = self.id, txn_id, "abandoned transaction was already finished");
        }
    }

    /// Run every statement of a batch. The outer error is a session fault,
    /// the inner one a failed statement.
    fn run_batch(&mut self, sql: &str) -> Result<Result<QueryResult>> {
        let statements = match parse_batch(sql) {
            Ok(statements) => statements,
            Err(e) => {
                debug!(session = self.id, error = %e, "batch rejected by parser");
                return Ok(Err(e));
            }
        };

        let mut last = QueryResult::with_update_count(0);
        for stmt in statements {
            let kind = stmt.kind();
            debug!(session = self.id, statement = kind, "executing");
            match self.run_statement(stmt) {
                Ok(result) => last = result,
                Err(e) if e.is_session_fault() => return Err(e),
                Err(e) => {
                    debug!(session = self.id, statement = kind, error = %e, "statement failed");
                    return Ok(Err(e));
                }
            }
        }
        Ok(Ok(last))
    }

    fn run_statement(&mut self, stmt: Statement) -> Result<QueryResult> {
        let done = QueryResult::with_update_count(0);
        match stmt {
            Statement::BeginTransaction(level) => {
                self.begin(level.unwrap_or(self.config.default_isolation), false)?;
                Ok(done)
            }
            Statement::Commit => {
                self.finish_transaction(true)?;
                Ok(done)
            }
            Statement::Rollback => {
                self.finish_transaction(false)?;
                Ok(done)
            }
            Statement::SetAutocommit(true) => {
                if self.transaction.is_some() {
                    self.finish_transaction(true)?;
                }
                Ok(done)
            }
            Statement::SetAutocommit(false) => {
                if self.transaction.is_none() {
                    self.begin(self.config.default_isolation, true)?;
                }
                Ok(done)
            }
            Statement::Declare { name, data_type } => {
                self.variables.declare(&name, data_type);
                Ok(done)
            }
            other => self.run_data_statement(other),
        }
    }

    fn run_data_statement(&mut self, stmt: Statement) -> Result<QueryResult> {
        let pad_char = self.config.pad_char;
        let last_identity = self.last_identity;

        let (result, identity) = match self.transaction.as_mut() {
            Some(txn) => {
                let scope = StatementScope {
                    txn_id: txn.id,
                    owner: Some(txn.id),
                    lock_reads: txn.isolation.locks_reads(),
                    pad_char,
                    last_identity,
                };
                self.db
                    .run_statement(stmt, scope, &mut self.variables, &mut txn.undo)?
            }
            None => {
                // autocommit: the statement is its own transaction
                let txn_id = self.db.transactions().begin();
                let scope = StatementScope {
                    txn_id,
                    owner: None,
                    lock_reads: self.config.default_isolation.locks_reads(),
                    pad_char,
                    last_identity,
                };
                let mut undo = UndoLog::new();
                let outcome = self
                    .db
                    .run_statement(stmt, scope, &mut self.variables, &mut undo);
                if let Err(e) = self.db.transactions().commit(txn_id) {
                    warn!(session = self.id, txn_id, error = %e, "releasing statement locks failed");
                }
                outcome?
            }
        };
        self.last_identity = identity;
        Ok(result)
    }

    fn begin(&mut self, level: IsolationLevel, implicit: bool) -> Result<TxnId> {
        if self.transaction.is_some() {
            return Err(Error::TransactionAlreadyActive);
        }
        let id = self.db.transactions().begin();
        self.transaction = Some(Transaction::new(id, level));
        debug!(session = self.id, txn_id = id, isolation = %level, implicit, "transaction begun");
        Ok(id)
    }

    /// Finish the open transaction. Either way the session is back in
    /// autocommit mode afterwards.
    fn finish_transaction(&mut self, commit: bool) -> Result<()> {
        let mut txn = self.transaction.take().ok_or(Error::NoActiveTransaction)?;
        if commit {
            self.db.write().publish(txn.id);
            self.db.transactions().commit(txn.id)?;
        } else {
            let records = txn.undo.take();
            debug!(session = self.id, txn_id = txn.id, records = records.len(), "rolling back");
            self.db.write().undo(records);
            self.db.transactions().rollback(txn.id)?;
        }
        debug!(session = self.id, txn_id = txn.id, commit, "transaction finished");
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}
