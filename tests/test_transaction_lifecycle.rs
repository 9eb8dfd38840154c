use quilldb::storage::Value;
use quilldb::{Error, ErrorKind, IsolationLevel, Registry, Session};

fn setup(registry: &Registry) -> Session {
    let mut session = registry.connect("Database=txn;User ID=sa").unwrap();
    session
        .execute("CREATE TABLE accounts (id INT PRIMARY KEY, balance INT)")
        .unwrap();
    session
        .execute("INSERT INTO accounts VALUES (1, 100), (2, 50)")
        .unwrap();
    session
}

fn balances(session: &mut Session) -> Vec<Vec<Value>> {
    session
        .execute("SELECT id, balance FROM accounts")
        .unwrap()
        .row_values()
}

#[test]
fn test_transaction_lifecycle() {
    let registry = Registry::default();
    let mut session = setup(&registry);

    // BEGIN ... COMMIT keeps the changes
    session.execute("BEGIN TRANSACTION").unwrap();
    assert!(session.in_transaction());
    session
        .execute("UPDATE accounts SET balance = balance - 10 WHERE id = 1")
        .unwrap();
    session.execute("COMMIT").unwrap();
    assert!(!session.in_transaction());

    // BEGIN ... ROLLBACK discards them
    session.execute("BEGIN").unwrap();
    session.execute("DELETE FROM accounts").unwrap();
    assert!(balances(&mut session).is_empty());
    session.execute("ROLLBACK").unwrap();

    assert_eq!(
        balances(&mut session),
        vec![
            vec![Value::Int(1), Value::Int(90)],
            vec![Value::Int(2), Value::Int(50)],
        ]
    );
}

#[test]
fn test_rollback_restores_dropped_table_and_index() {
    let registry = Registry::default();
    let mut session = setup(&registry);

    session.execute("BEGIN").unwrap();
    session
        .execute("CREATE UNIQUE INDEX ix_balance ON accounts (balance)")
        .unwrap();
    session.execute("DROP TABLE accounts").unwrap();
    session.execute("ROLLBACK").unwrap();

    assert_eq!(balances(&mut session).len(), 2);
    // the index is gone with the rollback, so duplicates are accepted
    let result = session
        .execute("INSERT INTO accounts VALUES (3, 50)")
        .unwrap();
    assert_eq!(result.update_count, 1);
}

#[test]
fn test_handle_commit_and_rollback() {
    let registry = Registry::default();
    let mut session = setup(&registry);

    let handle = session
        .begin_transaction(IsolationLevel::Serializable)
        .unwrap();
    assert_eq!(handle.isolation(), IsolationLevel::Serializable);
    assert_eq!(session.isolation(), Some(IsolationLevel::Serializable));
    session
        .execute("INSERT INTO accounts VALUES (3, 0)")
        .unwrap();
    handle.commit(&mut session).unwrap();
    assert_eq!(balances(&mut session).len(), 3);

    let handle = session
        .begin_transaction(IsolationLevel::ReadCommitted)
        .unwrap();
    session.execute("DELETE FROM accounts WHERE id = 3").unwrap();
    handle.rollback(&mut session).unwrap();
    assert_eq!(balances(&mut session).len(), 3);
}

#[test]
fn test_explicit_rollback_without_transaction_fails() {
    let registry = Registry::default();
    let mut session = setup(&registry);

    let err = session.execute("ROLLBACK").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoActiveTransaction);
    assert!(matches!(session.rollback(), Err(Error::NoActiveTransaction)));
    assert!(matches!(session.commit(), Err(Error::NoActiveTransaction)));

    // a handle whose transaction was finished by SQL has nothing to roll back
    let handle = session
        .begin_transaction(IsolationLevel::ReadCommitted)
        .unwrap();
    session.execute("COMMIT").unwrap();
    assert!(matches!(
        handle.rollback(&mut session),
        Err(Error::NoActiveTransaction)
    ));
}

#[test]
fn test_abandoned_handle_is_cleaned_up_silently() {
    let registry = Registry::default();
    let mut session = setup(&registry);

    // dropped while its transaction is open: rolled back before the next statement
    let handle = session
        .begin_transaction(IsolationLevel::ReadCommitted)
        .unwrap();
    session.execute("DELETE FROM accounts").unwrap();
    drop(handle);
    assert_eq!(balances(&mut session).len(), 2);
    assert!(!session.in_transaction());

    // dropped after its transaction already ended: nothing to do, no error
    let handle = session
        .begin_transaction(IsolationLevel::ReadCommitted)
        .unwrap();
    session.execute("ROLLBACK").unwrap();
    drop(handle);
    let result = session.execute("SELECT * FROM accounts").unwrap();
    assert!(!result.is_error());
    assert_eq!(result.rows.len(), 2);
}

#[test]
fn test_close_rolls_back() {
    let registry = Registry::default();
    let mut session = setup(&registry);
    session.execute("BEGIN").unwrap();
    session.execute("DELETE FROM accounts").unwrap();
    session.close();

    let mut other = registry.connect("Database=txn;User ID=sa").unwrap();
    assert_eq!(balances(&mut other).len(), 2);
}

#[test]
fn test_drop_table_is_private_until_commit() {
    let registry = Registry::default();
    let mut a = setup(&registry);
    a.execute("CREATE TABLE audit (note VARCHAR(20))").unwrap();
    let mut b = registry.connect("Database=txn;User ID=sa").unwrap();

    a.execute("BEGIN").unwrap();
    a.execute("DROP TABLE accounts").unwrap();
    assert_eq!(a.tables().unwrap(), vec!["audit".to_string()]);
    assert_eq!(a.execute("SELECT * FROM accounts").unwrap().error_code, Some(2001));

    // everyone else still has the committed table, behind the writer's lock
    assert_eq!(b.tables().unwrap(), vec!["accounts", "audit"]);
    assert_eq!(b.execute("SELECT * FROM accounts").unwrap().error_code, Some(4001));
    assert!(b.execute("CREATE TABLE accounts (x INT)").unwrap().is_error());
    let handle = b
        .begin_transaction(IsolationLevel::ReadUncommitted)
        .unwrap();
    assert_eq!(b.execute("SELECT * FROM accounts").unwrap().rows.len(), 2);
    handle.rollback(&mut b).unwrap();

    a.execute("ROLLBACK").unwrap();
    assert_eq!(a.tables().unwrap(), vec!["accounts", "audit"]);
    assert_eq!(balances(&mut b).len(), 2);

    // dropped and recreated in one transaction, published together
    a.execute("BEGIN; DROP TABLE accounts; CREATE TABLE accounts (id INT)")
        .unwrap();
    assert_eq!(b.tables().unwrap(), vec!["accounts", "audit"]);
    a.execute("COMMIT").unwrap();

    let result = b.execute("SELECT * FROM accounts").unwrap();
    assert!(result.rows.is_empty());
    assert_eq!(result.columns.len(), 1);
    assert_eq!(b.tables().unwrap(), vec!["audit", "accounts"]);
}

#[test]
fn test_handle_only_finishes_its_own_session() {
    let registry = Registry::default();
    let mut left = registry.connect("Database=left;User ID=sa").unwrap();
    let mut right = registry.connect("Database=right;User ID=sa").unwrap();

    let left_handle = left
        .begin_transaction(IsolationLevel::ReadCommitted)
        .unwrap();
    let right_handle = right
        .begin_transaction(IsolationLevel::ReadCommitted)
        .unwrap();
    // ids are numbered per database
    assert_eq!(left_handle.id(), right_handle.id());
    right.execute("CREATE TABLE t (id INT)").unwrap();

    assert!(matches!(
        left_handle.commit(&mut right),
        Err(Error::NoActiveTransaction)
    ));
    assert!(right.in_transaction());
    right_handle.rollback(&mut right).unwrap();
    assert!(right.tables().unwrap().is_empty());

    // the misused handle is closed, not abandoned: left keeps its transaction
    assert!(!left.execute("SELECT 1").unwrap().is_error());
    assert!(left.in_transaction());
    left.rollback().unwrap();
}
