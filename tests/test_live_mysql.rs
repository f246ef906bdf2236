#![cfg(feature = "mysql")]
//! Runs against a real server when `MYSQL_MIDDLEWARE_TEST_HOST` is set.
//!
//! Optional: `MYSQL_MIDDLEWARE_TEST_PORT`, `_USER` (root), `_PASSWORD`,
//! `_DATABASE` (test).

use chrono::{NaiveDate, Timelike};
use mysql_middleware::prelude::*;

fn live_database() -> Result<Option<Database<MysqlConnector>>, Box<dyn std::error::Error>> {
    let Ok(host) = std::env::var("MYSQL_MIDDLEWARE_TEST_HOST") else {
        eprintln!("MYSQL_MIDDLEWARE_TEST_HOST not set; skipping live test");
        return Ok(None);
    };
    let var = |name: &str, default: &str| {
        std::env::var(format!("MYSQL_MIDDLEWARE_TEST_{name}")).unwrap_or_else(|_| default.to_string())
    };

    let mut builder = MysqlOptions::builder()
        .host(host)
        .user(var("USER", "root"))
        .database(var("DATABASE", "test"))
        .port(var("PORT", "3306").parse()?)
        .read_default_files(Vec::new());
    if let Ok(password) = std::env::var("MYSQL_MIDDLEWARE_TEST_PASSWORD") {
        builder = builder.password(password);
    }
    Ok(Some(builder.build(MysqlConnector)?))
}

#[test]
fn select_literals() -> Result<(), Box<dyn std::error::Error>> {
    let Some(db) = live_database()? else {
        return Ok(());
    };
    let rows = db.execute("SELECT @@version, @@version, 1337, 3.14, 'what up', NULL", &[])?;
    let row = rows.first().ok_or("no row")?;
    assert!(row.get("@@version").and_then(TypedValue::as_text).is_some_and(|v| !v.is_empty()));
    assert_eq!(row.get("1337").and_then(TypedValue::as_i64), Some(1337));
    // DECIMAL columns carry the binary character set
    assert_eq!(row.get("3.14").and_then(TypedValue::as_bytes), Some(&b"3.14"[..]));
    assert_eq!(row.get("what up").and_then(TypedValue::as_text), Some("what up"));
    assert_eq!(row.get("NULL"), Some(&TypedValue::Null));
    Ok(())
}

#[test]
fn parameterized_lookups() -> Result<(), Box<dyn std::error::Error>> {
    let Some(db) = live_database()? else {
        return Ok(());
    };
    db.execute("DROP TABLE IF EXISTS mm_params", &[])?;
    db.execute(
        "CREATE TABLE mm_params (d DOUBLE, i INT, s VARCHAR(16), u INT UNSIGNED)",
        &[],
    )?;
    let insert = "INSERT INTO mm_params VALUES (?, ?, ?, ?)";
    db.execute(insert, &[2.5.into(), TypedValue::Null, "pi".into(), TypedValue::Null])?;
    db.execute(insert, &[TypedValue::Null, TypedValue::Null, "life".into(), 42_u32.into()])?;
    db.execute(insert, &[TypedValue::Null, (-1_i32).into(), "test".into(), TypedValue::Null])?;

    let rows = db.execute("SELECT * FROM mm_params WHERE u = ?", &[42_u64.into()])?;
    let row = rows.first().ok_or("no life row")?;
    assert_eq!(row.get("s").and_then(TypedValue::as_text), Some("life"));
    assert_eq!(row.get("u"), Some(&TypedValue::UnsignedInt(42)));
    assert_eq!(row.get("d"), Some(&TypedValue::Null));

    let rows = db.execute("SELECT * FROM mm_params WHERE i = ?", &[(-1_i64).into()])?;
    let row = rows.first().ok_or("no test row")?;
    assert_eq!(row.get("i"), Some(&TypedValue::SignedInt(-1)));
    assert_eq!(row.get("s").and_then(TypedValue::as_text), Some("test"));

    let rows = db.execute("SELECT * FROM mm_params WHERE s = ?", &["pi".into()])?;
    assert_eq!(rows.first().and_then(|r| r.get("d")).and_then(TypedValue::as_f64), Some(2.5));
    Ok(())
}

#[test]
fn datetimes_round_trip_to_the_second() -> Result<(), Box<dyn std::error::Error>> {
    let Some(db) = live_database()? else {
        return Ok(());
    };
    let input = NaiveDate::from_ymd_opt(2016, 5, 5)
        .and_then(|d| d.and_hms_micro_opt(5, 5, 5, 123_456))
        .ok_or("bad date")?;
    db.execute("DROP TABLE IF EXISTS mm_times", &[])?;
    db.execute("CREATE TABLE mm_times (at DATETIME, d DATE, t TIME)", &[])?;
    db.execute(
        "INSERT INTO mm_times VALUES (?, ?, '13:42')",
        &[input.into(), input.date().into()],
    )?;

    let rows = db.execute("SELECT at, d, t FROM mm_times", &[])?;
    let row = rows.first().ok_or("no row")?;
    assert_eq!(
        row.get("at").and_then(TypedValue::as_datetime),
        input.with_nanosecond(0)
    );
    assert_eq!(
        row.get("d").and_then(TypedValue::as_datetime),
        input.date().and_hms_opt(0, 0, 0)
    );
    assert_eq!(
        row.get("t").and_then(TypedValue::as_datetime),
        NaiveDate::from_ymd_opt(1970, 1, 1).and_then(|d| d.and_hms_opt(13, 42, 0))
    );
    Ok(())
}

#[test]
fn many_inserts_then_read_from_another_connection() -> Result<(), Box<dyn std::error::Error>> {
    let Some(db) = live_database()? else {
        return Ok(());
    };
    let writer = db.make_connection()?;
    writer.execute("DROP TABLE IF EXISTS mm_spam", &[])?;
    writer.execute("CREATE TABLE mm_spam (s VARCHAR(64), at TIME)", &[])?;
    for _ in 0..10_000 {
        writer.execute("INSERT INTO mm_spam VALUES (?, '13:42')", &["hello".into()])?;
    }

    let reader = db.make_connection()?;
    assert_eq!(reader.execute("SELECT * FROM mm_spam", &[])?.len(), 10_000);
    Ok(())
}

#[test]
fn malformed_sql_is_a_prepare_error() -> Result<(), Box<dyn std::error::Error>> {
    let Some(db) = live_database()? else {
        return Ok(());
    };
    let err = db.execute("error", &[]).unwrap_err();
    assert!(matches!(err, MysqlMiddlewareError::PrepareError(_)), "{err}");
    assert_eq!(err.code(), Some(1064));
    Ok(())
}

#[test]
fn transaction_commit_and_rollback() -> Result<(), Box<dyn std::error::Error>> {
    let Some(db) = live_database()? else {
        return Ok(());
    };
    let conn = db.make_connection()?;
    conn.execute("DROP TABLE IF EXISTS mm_tx", &[])?;
    conn.execute("CREATE TABLE mm_tx (name VARCHAR(64)) ENGINE=InnoDB", &[])?;
    conn.execute("INSERT INTO mm_tx VALUES (?)", &["tommy".into()])?;

    let name = |conn: &Connection<_>| -> Result<Option<String>, MysqlMiddlewareError> {
        Ok(conn
            .execute("SELECT name FROM mm_tx", &[])?
            .first()
            .and_then(|row| row.get("name"))
            .and_then(TypedValue::as_text)
            .map(str::to_owned))
    };

    let failed = conn.transaction(|c| {
        c.execute("UPDATE mm_tx SET name = 'Timmy'", &[])?;
        c.execute("💉", &[])
    });
    assert!(matches!(failed, Err(MysqlMiddlewareError::PrepareError(_))));
    assert_eq!(name(&conn)?.as_deref(), Some("tommy"));

    conn.transaction(|c| c.execute("UPDATE mm_tx SET name = 'Tommy' WHERE name = 'tommy'", &[]))?;
    assert_eq!(name(&conn)?.as_deref(), Some("Tommy"));
    Ok(())
}

#[test]
fn blob_bytes_are_preserved() -> Result<(), Box<dyn std::error::Error>> {
    let Some(db) = live_database()? else {
        return Ok(());
    };
    let bytes = vec![
        0xc3, 0x28, 0xa0, 0xa1, 0xe2, 0x28, 0xa1, 0xe2, 0x82, 0x28, 0xf0, 0x28, 0x8c, 0xbc,
    ];
    let conn = db.make_connection()?;
    conn.execute("DROP TABLE IF EXISTS mm_blobs", &[])?;
    conn.execute("CREATE TABLE mm_blobs (raw BLOB, big LONGBLOB)", &[])?;
    let big: Vec<u8> = (0..=255).cycle().take(200_000).collect();
    conn.execute(
        "INSERT INTO mm_blobs VALUES (?, ?)",
        &[TypedValue::Bytes(bytes.clone()), TypedValue::Bytes(big.clone())],
    )?;

    let rows = conn.execute("SELECT raw, big FROM mm_blobs", &[])?;
    let row = rows.first().ok_or("no row")?;
    assert_eq!(row.get("raw"), Some(&TypedValue::Bytes(bytes)));
    assert_eq!(row.get("big"), Some(&TypedValue::Bytes(big)));
    Ok(())
}
