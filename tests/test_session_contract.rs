use chrono::NaiveDate;
use uuid::Uuid;

use quilldb::catalog::{DataType, ScalarKind};
use quilldb::storage::Value;
use quilldb::{EngineConfig, Error, ErrorKind, IsolationLevel, ParameterSet, Registry};

#[test]
fn test_second_reader_is_refused() {
    let registry = Registry::default();
    let mut s = registry.connect("Database=r;User ID=sa").unwrap();
    s.execute("CREATE TABLE t (id INT); INSERT INTO t VALUES (1), (2)")
        .unwrap();

    let mut first = s.execute_reader("SELECT id FROM t").unwrap();
    assert!(matches!(
        s.execute_reader("SELECT id FROM t"),
        Err(Error::ReaderAlreadyOpen)
    ));
    assert!(matches!(s.execute("SELECT 1"), Err(Error::ReaderAlreadyOpen)));

    // the first reader is untouched by the refused calls
    assert!(first.read().unwrap());
    assert_eq!(first.get_i32(0).unwrap(), 1);
    first.close();

    let mut second = s.execute_reader("SELECT id FROM t").unwrap();
    let mut ids = Vec::new();
    while second.read().unwrap() {
        ids.push(second.get_i64(0).unwrap());
    }
    assert_eq!(ids, vec![1, 2]);
    drop(second);

    // a dropped reader is cleared before the next statement
    assert!(!s.execute("SELECT 1").unwrap().is_error());
}

#[test]
fn test_reader_errors_are_raised() {
    let registry = Registry::default();
    let mut s = registry.connect("Database=r;User ID=sa").unwrap();

    let err = s.execute_reader("SELECT * FROM missing").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TableNotFound);
    // no reader was opened
    assert!(!s.execute("SELECT 1").unwrap().is_error());

    s.execute("CREATE TABLE t (id INT)").unwrap();
    let reader = s.execute_reader("INSERT INTO t VALUES (5)").unwrap();
    assert_eq!(reader.records_affected(), 1);
    assert_eq!(reader.field_count(), 0);
}

#[test]
fn test_reader_typed_getters() {
    let registry = Registry::default();
    let mut s = registry.connect("Database=r;User ID=sa").unwrap();
    s.execute(
        "CREATE TABLE kinds (flag BIT, stamp DATETIME, uid GUID, data BLOB, ratio FLOAT, code CHAR(4), note VARCHAR(10))",
    )
    .unwrap();
    s.execute(
        "INSERT INTO kinds VALUES (1, '2024-02-29 13:45:00', '67e55044-10b1-426f-9247-bb680e5fe0c8', X'0AFF', 0.5, 'ab', NULL)",
    )
    .unwrap();

    let mut r = s.execute_reader("SELECT * FROM kinds").unwrap();
    assert!(r.read().unwrap());
    assert_eq!(r.field_kind(r.ordinal("FLAG").unwrap()).unwrap(), ScalarKind::Boolean);
    assert!(r.get_bool(0).unwrap());
    assert_eq!(
        r.get_datetime(1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_opt(13, 45, 0)
            .unwrap()
    );
    assert_eq!(
        r.get_guid(2).unwrap(),
        Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap()
    );
    assert_eq!(&r.get_bytes(3).unwrap()[..], &[0x0au8, 0xff][..]);
    assert_eq!(r.get_f64(4).unwrap(), 0.5);
    assert_eq!(r.get_string(5).unwrap(), "ab  ");
    assert!(r.is_null(6).unwrap());
    assert!(matches!(r.get_string(6), Err(Error::TypeMismatch { .. })));
    assert!(!r.read().unwrap());
    r.close();
}

#[test]
fn test_char_padding_can_be_disabled() {
    let registry = Registry::new(EngineConfig::new().pad_char(false));
    let mut s = registry.connect("Database=c;User ID=sa").unwrap();
    s.execute("CREATE TABLE c (code CHAR(4))").unwrap();
    s.execute("INSERT INTO c VALUES ('ab')").unwrap();
    let result = s.execute("SELECT code FROM c").unwrap();
    assert_eq!(result.row_values(), vec![vec![Value::from("ab")]]);
}

#[test]
fn test_parameters_in_and_out() {
    let registry = Registry::default();
    let mut s = registry.connect("Database=p;User ID=sa").unwrap();
    s.execute("CREATE TABLE people (id INT IDENTITY PRIMARY KEY, name VARCHAR(20))")
        .unwrap();

    let mut params = ParameterSet::new();
    params
        .add_input("name", DataType::Varchar(Some(20)), "O'Neil")
        .add_output("newid", DataType::BigInt);

    let result = s
        .execute_with(
            "INSERT INTO people (name) VALUES (@name); SET @newid = IDENTITY(); SELECT name FROM people WHERE id = @newid",
            &mut params,
        )
        .unwrap();
    assert_eq!(result.row_values(), vec![vec![Value::from("O'Neil")]]);
    assert_eq!(params.value("newid"), Some(&Value::BigInt(1)));

    // a failing batch reports its error and leaves outputs alone
    let failed = s
        .execute_with("SELECT * FROM nowhere", &mut params)
        .unwrap();
    assert_eq!(failed.error_code, Some(2001));
    assert_eq!(params.value("newid"), Some(&Value::BigInt(1)));
}

#[test]
fn test_connection_strings() {
    let registry = Registry::new(EngineConfig::new().admin("admin", "s3cret"));
    assert!(matches!(
        registry.connect("Database=x"),
        Err(Error::InvalidConnectionString(_))
    ));
    assert!(matches!(
        registry.connect("Database=x;User ID=admin;Password=nope"),
        Err(Error::AuthFailed(_))
    ));

    let s = registry
        .connect("Initial Catalog=Sales;UID=admin;PWD=s3cret")
        .unwrap();
    assert_eq!(s.database(), "Sales");
    assert_eq!(s.user(), "admin");

    registry.add_user("sales", "clerk", "pw").unwrap();
    assert!(registry.connect("Database=SALES;User ID=clerk;Password=pw").is_ok());
    assert!(registry.connect("Database=Other;User ID=clerk;Password=pw").is_err());
}

#[test]
fn test_pending_tables_are_private_until_commit() {
    let registry = Registry::default();
    let mut a = registry.connect("Database=v;User ID=sa").unwrap();
    let mut b = registry.connect("Database=v;User ID=sa").unwrap();

    a.execute("BEGIN").unwrap();
    a.execute("CREATE TABLE pending (id INT)").unwrap();
    assert_eq!(a.tables().unwrap(), vec!["pending".to_string()]);
    assert!(b.tables().unwrap().is_empty());
    assert_eq!(
        b.execute("SELECT * FROM pending").unwrap().error_code,
        Some(2001)
    );

    a.execute("COMMIT").unwrap();
    assert!(!b.execute("SELECT * FROM pending").unwrap().is_error());
    assert!(b.describe_table("PENDING").unwrap().contains("pending"));
}

#[test]
fn test_writers_lock_out_other_sessions() {
    let registry = Registry::default();
    let mut a = registry.connect("Database=l;User ID=sa").unwrap();
    let mut b = registry.connect("Database=l;User ID=sa").unwrap();
    a.execute("CREATE TABLE t (id INT); INSERT INTO t VALUES (1)")
        .unwrap();

    a.execute("BEGIN").unwrap();
    a.execute("INSERT INTO t VALUES (2)").unwrap();

    let blocked = b.execute("SELECT * FROM t").unwrap();
    assert_eq!(blocked.error_code, Some(4001));
    assert!(blocked.error.unwrap().contains("locked"));
    assert_eq!(
        b.execute("INSERT INTO t VALUES (3)").unwrap().error_code,
        Some(4001)
    );

    // dirty reads take no lock
    let handle = b
        .begin_transaction(IsolationLevel::ReadUncommitted)
        .unwrap();
    assert_eq!(b.execute("SELECT * FROM t").unwrap().rows.len(), 2);
    handle.rollback(&mut b).unwrap();

    a.execute("COMMIT").unwrap();
    assert_eq!(b.execute("SELECT * FROM t").unwrap().rows.len(), 2);
}
