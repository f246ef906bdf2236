//! Scripted in-memory server.
//!
//! Statements are matched by their exact SQL text against registered
//! [`Script`]s; anything unregistered fails to prepare with a syntax error,
//! the way a real server rejects malformed SQL. Raw queries only understand
//! transaction control and are otherwise journaled and accepted.

use std::cell::Cell;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::binding::{BindingSet, BindingSlot};
use crate::codec;
use crate::config::MysqlOptions;
use crate::error::DriverDiagnostic;
use crate::native::{Connector, FetchStatus, NativeClient, NativeResult, NativeValue, RawField};

pub const ER_PARSE_ERROR: u16 = 1064;
pub const ER_NO_SUCH_TABLE: u16 = 1146;
pub const ER_WRONG_VALUE_COUNT: u16 = 1136;
pub const CR_CONN_HOST_ERROR: u16 = 2003;
pub const ER_ERROR_DURING_COMMIT: u16 = 1180;

thread_local! {
    static THREAD_HOOKS: Cell<(usize, usize)> = const { Cell::new((0, 0)) };
}

/// `(thread_init, thread_end)` calls fake clients have made on the current thread.
#[must_use]
pub fn thread_hook_calls() -> (usize, usize) {
    THREAD_HOOKS.with(Cell::get)
}

/// What the server does when a prepared statement with a given text runs.
#[derive(Debug, Clone, PartialEq)]
pub enum Script {
    /// Return fixed rows.
    Rows {
        columns: Vec<RawField>,
        rows: Vec<Vec<NativeValue>>,
    },
    /// Append the bound parameters as one row of `table`.
    Insert { table: String },
    /// Return every row of `table`.
    Select { table: String },
    /// Set `column` of every row in `table` to the first parameter.
    Update { table: String, column: usize },
    /// Delete every row of `table`.
    Reset { table: String },
    /// Fail at execute time.
    Fail(DriverDiagnostic),
}

/// Failure injected into every matching native call until cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Connect,
    Metadata,
    BindResult,
    /// Fail the fetch that follows the given number of delivered rows.
    FetchAfter(usize),
    Commit,
    Rollback,
    /// A column re-fetch still does not fit its grown buffer.
    GrowingValue,
}

#[derive(Debug, Clone, Default)]
struct Table {
    columns: Vec<RawField>,
    rows: Vec<Vec<NativeValue>>,
}

#[derive(Debug, Default)]
struct ServerState {
    tables: HashMap<String, Table>,
    scripts: HashMap<String, Script>,
    snapshot: Option<HashMap<String, Table>>,
    faults: Vec<Fault>,
    journal: Vec<String>,
    open_statements: usize,
    open_connections: usize,
}

impl ServerState {
    fn has_fault(&self, fault: Fault) -> bool {
        self.faults.contains(&fault)
    }

    fn fetch_limit(&self) -> Option<usize> {
        self.faults.iter().find_map(|fault| match fault {
            Fault::FetchAfter(n) => Some(*n),
            _ => None,
        })
    }

    fn table_mut(&mut self, name: &str) -> NativeResult<&mut Table> {
        self.tables.get_mut(name).ok_or_else(|| no_such_table(name))
    }
}

/// In-memory server shared by every client it hands out.
#[derive(Debug, Clone, Default)]
pub struct FakeServer {
    state: Arc<Mutex<ServerState>>,
}

impl FakeServer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_table(&self, name: &str, columns: Vec<RawField>) {
        self.lock().tables.insert(
            name.to_string(),
            Table {
                columns,
                rows: Vec::new(),
            },
        );
    }

    /// Register what running `sql` does.
    pub fn script(&self, sql: &str, script: Script) {
        self.lock().scripts.insert(sql.to_string(), script);
    }

    pub fn inject(&self, fault: Fault) {
        self.lock().faults.push(fault);
    }

    pub fn clear_faults(&self) {
        self.lock().faults.clear();
    }

    /// Current rows of `table`, empty if it does not exist.
    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<Vec<NativeValue>> {
        self.lock()
            .tables
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    /// Every statement executed so far, raw queries included, in order.
    #[must_use]
    pub fn journal(&self) -> Vec<String> {
        self.lock().journal.clone()
    }

    /// Statement handles allocated and not yet closed.
    #[must_use]
    pub fn open_statements(&self) -> usize {
        self.lock().open_statements
    }

    #[must_use]
    pub fn open_connections(&self) -> usize {
        self.lock().open_connections
    }

    fn lock(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Connector for FakeServer {
    type Client = FakeClient;

    fn connect(&self, _options: &MysqlOptions) -> NativeResult<FakeClient> {
        let mut state = self.lock();
        if state.has_fault(Fault::Connect) {
            return Err(DriverDiagnostic::new("Can't connect to MySQL server")
                .with_code(CR_CONN_HOST_ERROR)
                .with_sql_state("HY000"));
        }
        state.open_connections += 1;
        Ok(FakeClient {
            server: self.clone(),
            last_error: String::new(),
            closed: false,
        })
    }
}

/// One client of a [`FakeServer`].
#[derive(Debug)]
pub struct FakeClient {
    server: FakeServer,
    last_error: String,
    closed: bool,
}

/// Handle state of one fake prepared statement.
#[derive(Debug, Default)]
pub struct FakeStmt {
    query: String,
    script: Option<Script>,
    params: Vec<NativeValue>,
    columns: Vec<RawField>,
    rows: VecDeque<Vec<NativeValue>>,
    current: Vec<NativeValue>,
    delivered: usize,
}

impl FakeClient {
    /// Failures set the last error, successes clear it.
    fn settle<T>(&mut self, result: NativeResult<T>) -> NativeResult<T> {
        match &result {
            Ok(_) => self.last_error.clear(),
            Err(diag) => self.last_error.clone_from(&diag.message),
        }
        result
    }

    fn fetch_row(&self, stmt: &mut FakeStmt, binds: &mut BindingSet) -> NativeResult<FetchStatus> {
        if self.server.lock().fetch_limit() == Some(stmt.delivered) {
            return Err(
                DriverDiagnostic::new("Lost connection to MySQL server during query").with_code(2013),
            );
        }
        let Some(row) = stmt.rows.pop_front() else {
            return Ok(FetchStatus::NoData);
        };
        let mut truncated = false;
        for (slot, value) in binds.slots_mut().iter_mut().zip(&row) {
            truncated |= value.store_into(slot)?;
        }
        stmt.current = row;
        stmt.delivered += 1;
        Ok(if truncated {
            FetchStatus::Truncated
        } else {
            FetchStatus::Row
        })
    }

    fn run_script(&self, stmt: &mut FakeStmt) -> NativeResult {
        let mut state = self.server.lock();
        state.journal.push(stmt.query.clone());
        let script = stmt
            .script
            .clone()
            .ok_or_else(|| DriverDiagnostic::new("statement is not prepared"))?;

        match script {
            Script::Rows { columns, rows } => {
                stmt.columns = columns;
                stmt.rows = rows.into();
            }
            Script::Insert { table } => {
                let table = state.table_mut(&table)?;
                if stmt.params.len() != table.columns.len() {
                    return Err(DriverDiagnostic::new(
                        "Column count doesn't match value count at row 1",
                    )
                    .with_code(ER_WRONG_VALUE_COUNT)
                    .with_sql_state("21S01"));
                }
                table.rows.push(stmt.params.clone());
            }
            Script::Select { table } => {
                let table = state.table_mut(&table)?;
                stmt.columns = table.columns.clone();
                stmt.rows = table.rows.iter().cloned().collect();
            }
            Script::Update { table, column } => {
                let value = stmt.params.first().cloned().unwrap_or(NativeValue::Null);
                for row in &mut state.table_mut(&table)?.rows {
                    if let Some(cell) = row.get_mut(column) {
                        *cell = value.clone();
                    }
                }
            }
            Script::Reset { table } => state.table_mut(&table)?.rows.clear(),
            Script::Fail(diag) => return Err(diag),
        }
        Ok(())
    }
}

impl NativeClient for FakeClient {
    type Stmt = FakeStmt;

    fn thread_init() {
        THREAD_HOOKS.with(|hooks| {
            let (inits, ends) = hooks.get();
            hooks.set((inits + 1, ends));
        });
    }

    fn thread_end() {
        THREAD_HOOKS.with(|hooks| {
            let (inits, ends) = hooks.get();
            hooks.set((inits, ends + 1));
        });
    }

    fn last_error(&self) -> String {
        self.last_error.clone()
    }

    fn query(&mut self, sql: &str) -> NativeResult {
        let mut state = self.server.lock();
        state.journal.push(sql.to_string());
        let result = match sql {
            "START TRANSACTION" => {
                state.snapshot = Some(state.tables.clone());
                Ok(())
            }
            "COMMIT" if state.has_fault(Fault::Commit) => Err(DriverDiagnostic::new(
                "Got error 149 during COMMIT",
            )
            .with_code(ER_ERROR_DURING_COMMIT)
            .with_sql_state("HY000")),
            "COMMIT" => {
                state.snapshot = None;
                Ok(())
            }
            "ROLLBACK" if state.has_fault(Fault::Rollback) => {
                Err(DriverDiagnostic::new("Lost connection to MySQL server during query")
                    .with_code(2013)
                    .with_sql_state("HY000"))
            }
            "ROLLBACK" => {
                if let Some(tables) = state.snapshot.take() {
                    state.tables = tables;
                }
                Ok(())
            }
            _ => Ok(()),
        };
        drop(state);
        self.settle(result)
    }

    fn stmt_init(&mut self) -> NativeResult<FakeStmt> {
        self.server.lock().open_statements += 1;
        Ok(FakeStmt::default())
    }

    fn stmt_prepare(&mut self, stmt: &mut FakeStmt, query: &str) -> NativeResult {
        let script = self.server.lock().scripts.get(query).cloned();
        let Some(script) = script else {
            return self.settle(Err(DriverDiagnostic::new(format!(
                "You have an error in your SQL syntax near '{query}'"
            ))
            .with_code(ER_PARSE_ERROR)
            .with_sql_state("42000")));
        };
        stmt.query = query.to_string();
        stmt.script = Some(script);
        self.settle(Ok(()))
    }

    fn stmt_param_count(&self, stmt: &FakeStmt) -> usize {
        stmt.query.matches('?').count()
    }

    fn stmt_bind_param(&mut self, stmt: &mut FakeStmt, binds: &BindingSet) -> NativeResult {
        stmt.params = binds
            .slots()
            .iter()
            .map(codec::decode_input)
            .collect::<NativeResult<Vec<_>>>()?;
        Ok(())
    }

    fn stmt_result_metadata(&mut self, stmt: &FakeStmt) -> NativeResult<Option<Vec<RawField>>> {
        if self.server.lock().has_fault(Fault::Metadata) {
            return self.settle(Err(DriverDiagnostic::new("malformed result set metadata")));
        }
        self.settle(Ok(match &stmt.script {
            Some(Script::Rows { .. } | Script::Select { .. }) => Some(stmt.columns.clone()),
            _ => None,
        }))
    }

    fn stmt_bind_result(&mut self, _stmt: &mut FakeStmt, binds: &BindingSet) -> NativeResult {
        if self.server.lock().has_fault(Fault::BindResult) {
            return self.settle(Err(DriverDiagnostic::new(format!(
                "cannot bind {} result buffers",
                binds.len()
            ))));
        }
        self.settle(Ok(()))
    }

    fn stmt_execute(&mut self, stmt: &mut FakeStmt) -> NativeResult {
        let result = self.run_script(stmt);
        self.settle(result)
    }

    fn stmt_fetch(&mut self, stmt: &mut FakeStmt, binds: &mut BindingSet) -> NativeResult<FetchStatus> {
        let result = self.fetch_row(stmt, binds);
        self.settle(result)
    }

    fn stmt_fetch_column(
        &mut self,
        stmt: &mut FakeStmt,
        slot: &mut BindingSlot,
        column: usize,
        offset: usize,
    ) -> NativeResult {
        let value = stmt
            .current
            .get(column)
            .ok_or_else(|| DriverDiagnostic::new(format!("no column {column} in current row")))?;
        match value {
            NativeValue::Bytes(bytes) => {
                let mut bytes = bytes.get(offset..).unwrap_or_default().to_vec();
                if self.server.lock().has_fault(Fault::GrowingValue) {
                    bytes.push(b'!');
                }
                slot.store_bytes(&bytes)?;
            }
            other => {
                other.store_into(slot)?;
            }
        }
        Ok(())
    }

    fn stmt_close(&mut self, _stmt: FakeStmt) {
        let mut state = self.server.lock();
        state.open_statements = state.open_statements.saturating_sub(1);
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            let mut state = self.server.lock();
            state.open_connections = state.open_connections.saturating_sub(1);
        }
    }
}

fn no_such_table(name: &str) -> DriverDiagnostic {
    DriverDiagnostic::new(format!("Table '{name}' doesn't exist"))
        .with_code(ER_NO_SUCH_TABLE)
        .with_sql_state("42S02")
}
