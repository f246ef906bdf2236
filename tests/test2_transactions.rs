use mysql_middleware::native::{NativeValue, RawField};
use mysql_middleware::prelude::*;
use mysql_middleware::test_utils::{
    ER_ERROR_DURING_COMMIT, FakeServer, Fault, Script, fake_database,
};
use mysql_middleware::wire::WireType;

const INSERT: &str = "INSERT INTO accounts (id, state) VALUES (?, ?)";
const UPDATE: &str = "UPDATE accounts SET state = ?";
const SELECT: &str = "SELECT id, state FROM accounts";

fn accounts() -> Result<(FakeServer, Database<FakeServer>), MysqlMiddlewareError> {
    let server = FakeServer::new();
    server.create_table(
        "accounts",
        vec![
            RawField::new("id", WireType::LongLong),
            RawField::new("state", WireType::VarString),
        ],
    );
    server.script(INSERT, Script::Insert { table: "accounts".into() });
    server.script(SELECT, Script::Select { table: "accounts".into() });
    server.script(
        UPDATE,
        Script::Update {
            table: "accounts".into(),
            column: 1,
        },
    );
    let db = fake_database(&server)?;
    db.execute(INSERT, &[1_i64.into(), "A".into()])?;
    Ok((server, db))
}

fn state_of(db: &Database<FakeServer>) -> Result<Option<String>, MysqlMiddlewareError> {
    let rows = db.execute(SELECT, &[])?;
    Ok(rows
        .first()
        .and_then(|row| row.get("state"))
        .and_then(TypedValue::as_text)
        .map(str::to_owned))
}

#[test]
fn committed_work_is_kept() -> Result<(), Box<dyn std::error::Error>> {
    let (server, db) = accounts()?;

    let updated = db.transaction(|conn| {
        conn.execute(UPDATE, &["B".into()])?;
        Ok(conn.execute(SELECT, &[])?.len())
    })?;

    assert_eq!(updated, 1);
    assert!(!db.default_connection().in_transaction());

    let journal = server.journal();
    assert_eq!(
        journal[journal.len() - 4..],
        ["START TRANSACTION", UPDATE, SELECT, "COMMIT"]
    );
    assert_eq!(state_of(&db)?.as_deref(), Some("B"));
    Ok(())
}

#[test]
fn failed_work_is_rolled_back_with_the_original_error() -> Result<(), Box<dyn std::error::Error>> {
    let (server, db) = accounts()?;

    let err = db
        .transaction(|conn| {
            conn.execute(UPDATE, &["B".into()])?;
            conn.execute("UPDATE accounts SET state = ? WHERE", &["C".into()])?;
            Ok(())
        })
        .unwrap_err();

    assert!(matches!(err, MysqlMiddlewareError::PrepareError(_)), "{err}");
    assert_eq!(server.journal().last().map(String::as_str), Some("ROLLBACK"));
    assert_eq!(state_of(&db)?.as_deref(), Some("A"));
    assert!(!db.default_connection().in_transaction());
    Ok(())
}

#[test]
fn nested_transaction_fails_fast() -> Result<(), Box<dyn std::error::Error>> {
    let (server, db) = accounts()?;

    let err = db
        .transaction(|conn| conn.transaction(|inner| inner.execute(UPDATE, &["B".into()])))
        .unwrap_err();

    assert!(matches!(err, MysqlMiddlewareError::TransactionError(_)), "{err}");
    let starts = server
        .journal()
        .iter()
        .filter(|sql| *sql == "START TRANSACTION")
        .count();
    assert_eq!(starts, 1);
    assert_eq!(state_of(&db)?.as_deref(), Some("A"));
    Ok(())
}

#[test]
fn rollback_failure_carries_both_errors() -> Result<(), Box<dyn std::error::Error>> {
    let (server, db) = accounts()?;
    server.inject(Fault::Rollback);

    let err = db
        .transaction(|conn| -> Result<(), MysqlMiddlewareError> {
            conn.execute(UPDATE, &["B".into()])?;
            Err(MysqlMiddlewareError::Other("work failed".into()))
        })
        .unwrap_err();

    let MysqlMiddlewareError::RollbackError { original, rollback } = &err else {
        panic!("expected a rollback error, got {err}");
    };
    assert!(matches!(**original, MysqlMiddlewareError::Other(ref msg) if msg == "work failed"));
    assert!(matches!(**rollback, MysqlMiddlewareError::ExecuteError(_)));
    assert!(!db.default_connection().in_transaction());

    // the connection stays usable once the fault clears
    server.clear_faults();
    db.transaction(|conn| conn.execute(UPDATE, &["C".into()]))?;
    assert_eq!(state_of(&db)?.as_deref(), Some("C"));
    Ok(())
}

#[test]
fn failed_commit_is_rolled_back() -> Result<(), Box<dyn std::error::Error>> {
    let (server, db) = accounts()?;
    server.inject(Fault::Commit);

    let err = db
        .transaction(|conn| conn.execute(UPDATE, &["B".into()]))
        .unwrap_err();

    assert!(matches!(err, MysqlMiddlewareError::ExecuteError(_)), "{err}");
    assert_eq!(err.code(), Some(ER_ERROR_DURING_COMMIT));
    let journal = server.journal();
    assert_eq!(journal[journal.len() - 2..], ["COMMIT", "ROLLBACK"]);
    assert!(!db.default_connection().in_transaction());

    server.clear_faults();
    assert_eq!(state_of(&db)?.as_deref(), Some("A"));
    db.transaction(|conn| conn.execute(UPDATE, &["C".into()]))?;
    assert_eq!(state_of(&db)?.as_deref(), Some("C"));
    Ok(())
}

#[test]
fn transactions_on_separate_connections_are_independent() -> Result<(), Box<dyn std::error::Error>> {
    let (server, db) = accounts()?;
    let other = db.make_connection()?;

    other.transaction(|conn| conn.execute(INSERT, &[2_i64.into(), "Z".into()]))?;
    assert!(!db.default_connection().in_transaction());
    assert_eq!(server.rows("accounts").len(), 2);
    assert_eq!(
        server.rows("accounts")[1],
        vec![NativeValue::Int(2), NativeValue::Bytes(b"Z".to_vec())]
    );
    Ok(())
}
