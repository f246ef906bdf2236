//! [`NativeClient`] backed by the pure-Rust `mysql` crate.
//!
//! The crate speaks the binary protocol and hands back whole rows, so this
//! back end buffers the result set at execute time and copies one row into
//! the bound slots per fetch. Values larger than a slot are reported as
//! truncated exactly like a C client would.

use std::collections::VecDeque;

use mysql::consts::CapabilityFlags;
use mysql::prelude::Queryable;
use mysql::{Column, Conn, OptsBuilder, Params, Row, Value};
use tracing::debug;

use crate::binding::{BindingSet, BindingSlot, MysqlTime};
use crate::codec;
use crate::config::MysqlOptions;
use crate::error::DriverDiagnostic;

use super::{Connector, FetchStatus, NativeClient, NativeResult, NativeValue, RawField};

/// Opens [`MysqlClient`] connections over TCP or a unix socket.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlConnector;

impl Connector for MysqlConnector {
    type Client = MysqlClient;

    fn connect(&self, options: &MysqlOptions) -> NativeResult<MysqlClient> {
        let set_names = options
            .set_names_statement()
            .map_err(|e| DriverDiagnostic::new(e.to_string()))?;
        let builder = OptsBuilder::new()
            .ip_or_hostname(options.host.clone())
            .tcp_port(options.port())
            .socket(options.socket.clone())
            .user(options.user.clone())
            .pass(options.password.clone())
            .db_name(options.database.clone())
            .additional_capabilities(CapabilityFlags::from_bits_truncate(options.flags))
            .init(vec![set_names]);

        let conn = Conn::new(builder).map_err(|e| diagnostic(&e))?;
        Ok(MysqlClient {
            conn: Some(conn),
            last_error: String::new(),
        })
    }
}

/// One `mysql::Conn`.
pub struct MysqlClient {
    conn: Option<Conn>,
    last_error: String,
}

/// Prepared statement plus the state a C client keeps per handle.
#[derive(Default)]
pub struct MysqlStmt {
    prepared: Option<mysql::Statement>,
    params: Vec<Value>,
    /// Columns of the executed result set; `Some(vec![])` when it had none.
    result_fields: Option<Vec<RawField>>,
    rows: VecDeque<Vec<Value>>,
    current: Vec<Value>,
}

impl MysqlClient {
    fn conn(&mut self) -> NativeResult<&mut Conn> {
        self.conn
            .as_mut()
            .ok_or_else(|| DriverDiagnostic::new("connection already closed"))
    }

    fn record<T>(&mut self, result: Result<T, mysql::Error>) -> NativeResult<T> {
        self.settle(result.map_err(|e| diagnostic(&e)))
    }

    /// Failures set the last error, successes clear it.
    fn settle<T>(&mut self, result: NativeResult<T>) -> NativeResult<T> {
        match &result {
            Ok(_) => self.last_error.clear(),
            Err(diag) => self.last_error.clone_from(&diag.message),
        }
        result
    }
}

fn prepared(stmt: &MysqlStmt) -> NativeResult<&mysql::Statement> {
    stmt.prepared
        .as_ref()
        .ok_or_else(|| DriverDiagnostic::new("statement is not prepared"))
}

impl NativeClient for MysqlClient {
    type Stmt = MysqlStmt;

    fn last_error(&self) -> String {
        self.last_error.clone()
    }

    fn query(&mut self, sql: &str) -> NativeResult {
        let result = self.conn()?.query_drop(sql);
        self.record(result)
    }

    fn stmt_init(&mut self) -> NativeResult<MysqlStmt> {
        Ok(MysqlStmt::default())
    }

    fn stmt_prepare(&mut self, stmt: &mut MysqlStmt, query: &str) -> NativeResult {
        let result = self.conn()?.prep(query);
        stmt.prepared = Some(self.record(result)?);
        Ok(())
    }

    fn stmt_param_count(&self, stmt: &MysqlStmt) -> usize {
        stmt.prepared
            .as_ref()
            .map_or(0, |prepared| usize::from(prepared.num_params()))
    }

    fn stmt_bind_param(&mut self, stmt: &mut MysqlStmt, binds: &BindingSet) -> NativeResult {
        stmt.params = binds
            .slots()
            .iter()
            .map(|slot| codec::decode_input(slot).and_then(to_mysql))
            .collect::<NativeResult<Vec<_>>>()?;
        Ok(())
    }

    fn stmt_result_metadata(&mut self, stmt: &MysqlStmt) -> NativeResult<Option<Vec<RawField>>> {
        // the executed result set is authoritative; prepare-time types are a fallback
        let fields = match &stmt.result_fields {
            Some(fields) => fields.clone(),
            None => prepared(stmt)?.columns().iter().map(raw_field).collect(),
        };
        Ok((!fields.is_empty()).then_some(fields))
    }

    fn stmt_bind_result(&mut self, _stmt: &mut MysqlStmt, _binds: &BindingSet) -> NativeResult {
        // slots are written by `stmt_fetch`
        Ok(())
    }

    fn stmt_execute(&mut self, stmt: &mut MysqlStmt) -> NativeResult {
        let params = if stmt.params.is_empty() {
            Params::Empty
        } else {
            Params::Positional(std::mem::take(&mut stmt.params))
        };
        let prepared = prepared(stmt)?;
        let result = exec_buffered(self.conn()?, prepared, params);
        let (fields, rows) = self.record(result)?;
        debug!(columns = fields.len(), rows = rows.len(), "result set buffered");
        stmt.result_fields = Some(fields);
        stmt.rows = rows.into_iter().map(row_values).collect();
        Ok(())
    }

    fn stmt_fetch(&mut self, stmt: &mut MysqlStmt, binds: &mut BindingSet) -> NativeResult<FetchStatus> {
        let Some(row) = stmt.rows.pop_front() else {
            stmt.current.clear();
            return Ok(FetchStatus::NoData);
        };
        let stored = store_row(&row, binds);
        stmt.current = row;
        Ok(if self.settle(stored)? {
            FetchStatus::Truncated
        } else {
            FetchStatus::Row
        })
    }

    fn stmt_fetch_column(
        &mut self,
        stmt: &mut MysqlStmt,
        slot: &mut BindingSlot,
        column: usize,
        offset: usize,
    ) -> NativeResult {
        let value = stmt
            .current
            .get(column)
            .ok_or_else(|| DriverDiagnostic::new(format!("no column {column} in current row")))?;
        match from_mysql(value) {
            NativeValue::Bytes(bytes) => {
                slot.store_bytes(bytes.get(offset..).unwrap_or_default())?;
            }
            other => {
                other.store_into(slot)?;
            }
        }
        Ok(())
    }

    fn stmt_close(&mut self, stmt: MysqlStmt) {
        let Some(prepared) = stmt.prepared else {
            return;
        };
        if let Some(conn) = self.conn.as_mut() {
            if let Err(e) = conn.close(prepared) {
                debug!(error = %e, "closing statement failed");
            }
        }
    }

    fn close(&mut self) {
        // dropping the Conn sends COM_QUIT
        self.conn.take();
    }
}

/// Execute and drain the first result set, keeping its column definitions.
fn exec_buffered(
    conn: &mut Conn,
    prepared: &mysql::Statement,
    params: Params,
) -> Result<(Vec<RawField>, Vec<Row>), mysql::Error> {
    let mut result = conn.exec_iter(prepared, params)?;
    let fields = result.columns().as_ref().iter().map(raw_field).collect();
    let rows = result.by_ref().collect::<Result<Vec<Row>, _>>()?;
    Ok((fields, rows))
}

fn raw_field(column: &Column) -> RawField {
    RawField {
        name: column.name_str().into_owned(),
        type_code: column.column_type() as u8,
        flags: column.flags().bits(),
        charset: column.character_set(),
        length: column.column_length(),
    }
}

/// Copy one row into the output slots. `Ok(true)` when a value was truncated.
fn store_row(row: &[Value], binds: &mut BindingSet) -> NativeResult<bool> {
    binds
        .slots_mut()
        .iter_mut()
        .zip(row)
        .try_fold(false, |truncated, (slot, value)| {
            Ok(from_mysql(value).store_into(slot)? || truncated)
        })
}

fn row_values(mut row: Row) -> Vec<Value> {
    (0..row.len())
        .map(|idx| row.take::<Value, _>(idx).unwrap_or(Value::NULL))
        .collect()
}

fn diagnostic(err: &mysql::Error) -> DriverDiagnostic {
    match err {
        mysql::Error::MySqlError(server) => DriverDiagnostic::new(server.message.clone())
            .with_code(server.code)
            .with_sql_state(server.state.clone()),
        other => DriverDiagnostic::new(other.to_string()),
    }
}

fn from_mysql(value: &Value) -> NativeValue {
    match value {
        Value::NULL => NativeValue::Null,
        Value::Bytes(bytes) => NativeValue::Bytes(bytes.clone()),
        Value::Int(i) => NativeValue::Int(*i),
        Value::UInt(u) => NativeValue::UInt(*u),
        Value::Float(f) => NativeValue::Double(f64::from(*f)),
        Value::Double(f) => NativeValue::Double(*f),
        Value::Date(year, month, day, hour, minute, second, micros) => NativeValue::Time(MysqlTime {
            year: *year,
            month: *month,
            day: *day,
            hour: u32::from(*hour),
            minute: *minute,
            second: *second,
            microsecond: *micros,
            negative: false,
        }),
        Value::Time(negative, days, hour, minute, second, micros) => NativeValue::Time(MysqlTime {
            hour: days * 24 + u32::from(*hour),
            minute: *minute,
            second: *second,
            microsecond: *micros,
            negative: *negative,
            ..MysqlTime::default()
        }),
    }
}

fn to_mysql(value: NativeValue) -> NativeResult<Value> {
    Ok(match value {
        NativeValue::Null => Value::NULL,
        NativeValue::Int(i) => Value::Int(i),
        NativeValue::UInt(u) => Value::UInt(u),
        NativeValue::Double(f) => Value::Double(f),
        NativeValue::Bytes(bytes) => Value::Bytes(bytes),
        NativeValue::Time(time) => {
            let hour = u8::try_from(time.hour).map_err(|_| {
                DriverDiagnostic::new(format!("hour {} out of range for DATETIME", time.hour))
            })?;
            Value::Date(
                time.year,
                time.month,
                time.day,
                hour,
                time.minute,
                time.second,
                time.microsecond,
            )
        }
    })
}
