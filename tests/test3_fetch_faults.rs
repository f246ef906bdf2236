use mysql_middleware::native::{NativeValue, RawField};
use mysql_middleware::prelude::*;
use mysql_middleware::test_utils::{CR_CONN_HOST_ERROR, FakeServer, Fault, Script, fake_database};
use mysql_middleware::wire::{BINARY_CHARSET, WireType};

const INSERT_DOC: &str = "INSERT INTO docs (name, body) VALUES (?, ?)";
const SELECT_DOCS: &str = "SELECT name, body FROM docs";

/// `body` advertises 8 bytes, so anything longer must be re-fetched.
fn docs_server() -> FakeServer {
    let server = FakeServer::new();
    server.create_table(
        "docs",
        vec![
            RawField::new("name", WireType::VarString).with_length(32),
            RawField::new("body", WireType::Blob)
                .with_charset(BINARY_CHARSET)
                .with_length(8),
        ],
    );
    server.script(INSERT_DOC, Script::Insert { table: "docs".into() });
    server.script(SELECT_DOCS, Script::Select { table: "docs".into() });
    server
}

#[test]
fn oversized_values_are_refetched_in_full() -> Result<(), Box<dyn std::error::Error>> {
    let server = docs_server();
    let db = fake_database(&server)?;
    let body: Vec<u8> = (0..=255).cycle().take(5000).collect();

    db.execute(INSERT_DOC, &["big".into(), TypedValue::Bytes(body.clone())])?;
    db.execute(INSERT_DOC, &["small".into(), TypedValue::Bytes(vec![1, 2])])?;

    let rows = db.execute(SELECT_DOCS, &[])?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("body"), Some(&TypedValue::Bytes(body)));
    // the grown buffer must not leak into the next row
    assert_eq!(rows[1].get("body"), Some(&TypedValue::Bytes(vec![1, 2])));
    Ok(())
}

#[test]
fn value_that_still_does_not_fit_is_a_truncation_error() -> Result<(), Box<dyn std::error::Error>> {
    let server = docs_server();
    let db = fake_database(&server)?;
    db.execute(INSERT_DOC, &["big".into(), TypedValue::Bytes(vec![7; 64])])?;
    server.inject(Fault::GrowingValue);

    let err = db.execute(SELECT_DOCS, &[]).unwrap_err();
    let MysqlMiddlewareError::TruncationError {
        column,
        required,
        capacity,
    } = err
    else {
        panic!("expected a truncation error, got {err}");
    };
    assert_eq!(column, "body");
    assert_eq!((required, capacity), (65, 64));
    assert_eq!(server.open_statements(), 0);
    Ok(())
}

#[test]
fn fetch_failure_discards_collected_rows() -> Result<(), Box<dyn std::error::Error>> {
    let server = docs_server();
    let db = fake_database(&server)?;
    for name in ["a", "b", "c"] {
        db.execute(INSERT_DOC, &[name.into(), TypedValue::Null])?;
    }
    server.inject(Fault::FetchAfter(2));

    let err = db.execute(SELECT_DOCS, &[]).unwrap_err();
    assert!(matches!(err, MysqlMiddlewareError::FetchError(_)), "{err}");
    assert_eq!(err.code(), Some(2013));
    assert_eq!(server.open_statements(), 0);

    server.clear_faults();
    assert_eq!(db.execute(SELECT_DOCS, &[])?.len(), 3);
    Ok(())
}

#[test]
fn metadata_failure_is_a_fetch_fields_error() -> Result<(), Box<dyn std::error::Error>> {
    let server = docs_server();
    let db = fake_database(&server)?;
    server.inject(Fault::Metadata);

    let err = db.execute(SELECT_DOCS, &[]).unwrap_err();
    assert!(matches!(err, MysqlMiddlewareError::FetchFieldsError(_)), "{err}");
    assert_eq!(server.open_statements(), 0);
    Ok(())
}

#[test]
fn output_bind_failure_is_reported() -> Result<(), Box<dyn std::error::Error>> {
    let server = docs_server();
    let db = fake_database(&server)?;
    server.inject(Fault::BindResult);

    let err = db.execute(SELECT_DOCS, &[]).unwrap_err();
    assert!(matches!(err, MysqlMiddlewareError::OutputBindError(_)), "{err}");

    // statements without a result set never bind output buffers
    db.execute(INSERT_DOC, &["still".into(), TypedValue::Null])?;
    assert_eq!(server.rows("docs").len(), 1);
    Ok(())
}

#[test]
fn connect_failure_is_a_connection_error() {
    let server = docs_server();
    server.inject(Fault::Connect);

    let Err(err) = fake_database(&server) else {
        panic!("connect should fail");
    };
    assert!(matches!(err, MysqlMiddlewareError::ConnectionError(_)), "{err}");
    assert_eq!(err.code(), Some(CR_CONN_HOST_ERROR));
    assert_eq!(server.open_connections(), 0);
}

#[test]
fn narrow_integer_columns_keep_sign() -> Result<(), Box<dyn std::error::Error>> {
    let server = FakeServer::new();
    let sql = "SELECT t, s, m, y, f FROM narrow";
    server.script(
        sql,
        Script::Rows {
            columns: vec![
                RawField::new("t", WireType::Tiny),
                RawField::new("s", WireType::Short),
                RawField::new("m", WireType::Int24),
                RawField::new("y", WireType::Year),
                RawField::new("f", WireType::Float),
            ],
            rows: vec![vec![
                NativeValue::Int(-1),
                NativeValue::Int(-300),
                NativeValue::Int(-70_000),
                NativeValue::Int(2024),
                NativeValue::Double(0.5),
            ]],
        },
    );
    let db = fake_database(&server)?;

    let rows = db.execute(sql, &[])?;
    let row = &rows[0];
    assert_eq!(row.get("t"), Some(&TypedValue::SignedInt(-1)));
    assert_eq!(row.get("s"), Some(&TypedValue::SignedInt(-300)));
    assert_eq!(row.get("m"), Some(&TypedValue::SignedInt(-70_000)));
    assert_eq!(row.get("y"), Some(&TypedValue::UnsignedInt(2024)));
    assert_eq!(row.get("f"), Some(&TypedValue::Double(0.5)));
    Ok(())
}
