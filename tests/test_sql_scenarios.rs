use std::str::FromStr;

use rust_decimal::Decimal;

use quilldb::catalog::ScalarKind;
use quilldb::executor::NO_UPDATE_COUNT;
use quilldb::storage::Value;
use quilldb::{ErrorKind, Registry, Session};

fn session(registry: &Registry) -> Session {
    registry.create_session("scenarios", "sa", "").unwrap()
}

#[test]
fn test_select_after_insert() {
    let registry = Registry::default();
    let mut s = session(&registry);

    let created = s.execute("CREATE TABLE T (Id INT, Name VARCHAR(50))").unwrap();
    assert_eq!(created.update_count, 0);
    assert_eq!(
        s.execute("INSERT INTO T VALUES (1,'Alice')").unwrap().update_count,
        1
    );

    let result = s.execute("SELECT * FROM T WHERE Id=1").unwrap();
    assert_eq!(result.update_count, NO_UPDATE_COUNT);
    assert!(result.error.is_none());
    assert_eq!(
        result.row_values(),
        vec![vec![Value::Int(1), Value::from("Alice")]]
    );
    let names: Vec<&str> = result.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Id", "Name"]);
    assert_eq!(result.columns[0].kind, ScalarKind::Int32);
    assert_eq!(result.columns[1].kind, ScalarKind::String);
}

#[test]
fn test_select_keeps_insertion_order() {
    let registry = Registry::default();
    let mut s = session(&registry);
    s.execute("CREATE TABLE items (code INT PRIMARY KEY, label VARCHAR(10))")
        .unwrap();

    let codes = [42, 7, 19, 3, 88, 1];
    for code in codes {
        s.execute(&format!("INSERT INTO items VALUES ({}, 'x')", code))
            .unwrap();
    }

    let result = s.execute("SELECT code FROM items").unwrap();
    let read: Vec<Value> = result.row_values().into_iter().map(|mut r| r.remove(0)).collect();
    let expected: Vec<Value> = codes.iter().map(|c| Value::Int(*c)).collect();
    assert_eq!(read, expected);

    let sorted = s.execute("SELECT code FROM items ORDER BY code DESC LIMIT 2").unwrap();
    assert_eq!(
        sorted.row_values(),
        vec![vec![Value::Int(88)], vec![Value::Int(42)]]
    );
}

#[test]
fn test_primary_key_violation_keeps_row_count() {
    let registry = Registry::default();
    let mut s = session(&registry);
    s.execute("CREATE TABLE p (id INT PRIMARY KEY, v INT)").unwrap();
    s.execute("INSERT INTO p VALUES (1, 1), (2, 2)").unwrap();

    let failed = s.execute("INSERT INTO p VALUES (3, 3), (1, 9)").unwrap();
    assert!(failed.is_error());
    assert_eq!(failed.error_code, Some(3001));
    assert!(failed.rows.is_empty());

    assert_eq!(s.execute("SELECT * FROM p").unwrap().rows.len(), 2);
}

#[test]
fn test_update_matching_nothing() {
    let registry = Registry::default();
    let mut s = session(&registry);
    s.execute("CREATE TABLE u (id INT, v INT)").unwrap();
    s.execute("INSERT INTO u VALUES (1, 1)").unwrap();

    let result = s.execute("UPDATE u SET v = 5 WHERE id = 99").unwrap();
    assert_eq!(result.update_count, 0);
    assert!(result.error.is_none());

    let result = s.execute("UPDATE u SET v = v + 1").unwrap();
    assert_eq!(result.update_count, 1);
}

#[test]
fn test_deleted_rows_stay_deleted() {
    let registry = Registry::default();
    let mut s = session(&registry);
    s.execute("CREATE TABLE d (id INT PRIMARY KEY, name VARCHAR(20))")
        .unwrap();
    s.execute("INSERT INTO d VALUES (1, 'a'), (2, 'b'), (3, 'c')")
        .unwrap();

    assert_eq!(
        s.execute("DELETE FROM d WHERE id = 2").unwrap().update_count,
        1
    );
    let result = s.execute("SELECT id FROM d").unwrap();
    assert_eq!(
        result.row_values(),
        vec![vec![Value::Int(1)], vec![Value::Int(3)]]
    );
    assert!(s.execute("SELECT * FROM d WHERE id = 2").unwrap().rows.is_empty());

    // the key is free again
    assert_eq!(
        s.execute("INSERT INTO d VALUES (2, 'again')").unwrap().update_count,
        1
    );
}

#[test]
fn test_decimal_round_trip() {
    let registry = Registry::default();
    let mut s = session(&registry);
    s.execute("CREATE TABLE prices (id INT, amount DECIMAL(10,2))")
        .unwrap();
    s.execute("INSERT INTO prices VALUES (1, 12.50), (2, '12.5'), (3, 7)")
        .unwrap();

    let result = s.execute("SELECT amount FROM prices").unwrap();
    assert_eq!(result.columns[0].kind, ScalarKind::Decimal);
    let amounts: Vec<String> = result
        .row_values()
        .into_iter()
        .map(|r| r[0].to_string())
        .collect();
    assert_eq!(amounts, vec!["12.50", "12.50", "7.00"]);

    let mut reader = s.execute_reader("SELECT amount FROM prices WHERE id = 1").unwrap();
    assert!(reader.read().unwrap());
    assert_eq!(
        reader.get_decimal(0).unwrap(),
        Decimal::from_str("12.50").unwrap()
    );
    assert_eq!(reader.get_decimal(0).unwrap().scale(), 2);
    reader.close();
}

#[test]
fn test_errors_are_reported_in_results() {
    let registry = Registry::default();
    let mut s = session(&registry);
    s.execute("CREATE TABLE e (id INT NOT NULL, name VARCHAR(3))")
        .unwrap();

    let cases = [
        ("SELEC * FROM e", ErrorKind::Syntax),
        ("SELECT * FROM missing", ErrorKind::TableNotFound),
        ("SELECT nope FROM e", ErrorKind::ColumnNotFound),
        ("CREATE TABLE e (id INT)", ErrorKind::DuplicateTable),
        ("INSERT INTO e VALUES (NULL, 'a')", ErrorKind::ConstraintViolation),
        ("INSERT INTO e VALUES (1, 'abcd')", ErrorKind::TypeMismatch),
        ("SELECT 1 / 0", ErrorKind::Execution),
        ("SELECT 1 /* never closed", ErrorKind::Syntax),
        ("SELECT 1e308 * 10", ErrorKind::TypeMismatch),
    ];
    for (sql, kind) in cases {
        let result = s.execute(sql).unwrap();
        assert!(result.is_error(), "{} should fail", sql);
        let code = result.error_code.unwrap();
        let expected = match kind {
            ErrorKind::Syntax => 1001,
            ErrorKind::TableNotFound => 2001,
            ErrorKind::ColumnNotFound => 2002,
            ErrorKind::DuplicateTable => 2003,
            ErrorKind::ConstraintViolation => 3001,
            ErrorKind::TypeMismatch => 3002,
            _ => 4001,
        };
        assert_eq!(code, expected, "{}", sql);
    }
    assert!(s.execute("SELECT * FROM e").unwrap().rows.is_empty());
}

#[test]
fn test_floats_stay_finite_and_ordered() {
    let registry = Registry::default();
    let mut s = session(&registry);
    s.execute("CREATE TABLE f (id INT, v FLOAT)").unwrap();
    s.execute("INSERT INTO f VALUES (1, 2.5), (2, -1.0e0), (3, NULL)")
        .unwrap();

    let rejected = s
        .execute("INSERT INTO f VALUES (4, 1e308 * 10 - 1e308 * 10)")
        .unwrap();
    assert_eq!(rejected.error_code, Some(3002));
    let rejected = s.execute("INSERT INTO f VALUES (5, 'NaN')").unwrap();
    assert_eq!(rejected.error_code, Some(3002));
    assert_eq!(
        s.execute("UPDATE f SET v = v * 1e308 * 1e308 WHERE id = 1")
            .unwrap()
            .error_code,
        Some(3002)
    );

    let ordered = s.execute("SELECT id FROM f ORDER BY v").unwrap();
    assert_eq!(
        ordered.row_values(),
        vec![vec![Value::Int(3)], vec![Value::Int(2)], vec![Value::Int(1)]]
    );
}

#[test]
fn test_distinct_agrees_with_equality() {
    let registry = Registry::default();
    let mut s = session(&registry);
    s.execute("CREATE TABLE d (v VARCHAR(5))").unwrap();
    s.execute("INSERT INTO d VALUES ('a'), ('a '), ('b')").unwrap();

    assert_eq!(s.execute("SELECT v FROM d WHERE v = 'a'").unwrap().rows.len(), 2);
    let distinct = s.execute("SELECT DISTINCT v FROM d").unwrap();
    assert_eq!(
        distinct.row_values(),
        vec![vec![Value::from("a")], vec![Value::from("b")]]
    );
}

#[test]
fn test_identity_and_defaults() {
    let registry = Registry::default();
    let mut s = session(&registry);
    s.execute(
        "CREATE TABLE orders (id BIGINT IDENTITY PRIMARY KEY, item VARCHAR(20) NOT NULL, qty INT DEFAULT 1)",
    )
    .unwrap();
    s.execute("INSERT INTO orders (item) VALUES ('pen'), ('ink')")
        .unwrap();
    s.execute("INSERT INTO orders (item, qty) VALUES ('pad', 4)")
        .unwrap();

    assert_eq!(s.last_identity(), Some(3));
    let result = s.execute("SELECT id, item, qty FROM orders WHERE qty > 1").unwrap();
    assert_eq!(
        result.row_values(),
        vec![vec![Value::BigInt(3), Value::from("pad"), Value::Int(4)]]
    );

    let identity = s.execute("SELECT IDENTITY()").unwrap();
    assert_eq!(identity.row_values(), vec![vec![Value::BigInt(3)]]);

    let rejected = s.execute("UPDATE orders SET id = 10 WHERE id = 1").unwrap();
    assert_eq!(rejected.error_code, Some(3001));
}

#[test]
fn test_query_features() {
    let registry = Registry::default();
    let mut s = session(&registry);
    s.execute("CREATE TABLE people (id INT PRIMARY KEY, name VARCHAR(20), city VARCHAR(20))")
        .unwrap();
    s.execute(
        "INSERT INTO people VALUES (1, 'Alice', 'Oslo'), (2, 'Bob', NULL), (3, 'Carol', 'Oslo'), (4, 'Dave', 'Rome')",
    )
    .unwrap();

    let like = s
        .execute("SELECT name FROM people WHERE name LIKE '%o%' ORDER BY name")
        .unwrap();
    assert_eq!(
        like.row_values(),
        vec![vec![Value::from("Bob")], vec![Value::from("Carol")]]
    );

    let nulls = s.execute("SELECT id FROM people WHERE city IS NULL").unwrap();
    assert_eq!(nulls.row_values(), vec![vec![Value::Int(2)]]);

    let distinct = s
        .execute("SELECT DISTINCT city FROM people WHERE city IS NOT NULL")
        .unwrap();
    assert_eq!(
        distinct.row_values(),
        vec![vec![Value::from("Oslo")], vec![Value::from("Rome")]]
    );

    let sub = s
        .execute("SELECT UPPER(name) AS shout FROM people WHERE id IN (SELECT id FROM people WHERE city = 'Oslo')")
        .unwrap();
    assert_eq!(sub.columns[0].name, "shout");
    assert_eq!(
        sub.row_values(),
        vec![vec![Value::from("ALICE")], vec![Value::from("CAROL")]]
    );

    let paged = s
        .execute("SELECT id FROM people ORDER BY id LIMIT 2 OFFSET 1")
        .unwrap();
    assert_eq!(
        paged.row_values(),
        vec![vec![Value::Int(2)], vec![Value::Int(3)]]
    );
}
