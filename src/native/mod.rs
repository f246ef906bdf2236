//! Seam between the statement pipeline and the client library that owns the
//! wire protocol.
//!
//! The pipeline only relies on three observable contracts: prepare succeeds or
//! reports a diagnostic, execute succeeds or reports a diagnostic, and fetch
//! reports a row, a row with truncated columns, or the end of data. Everything
//! else (transport, authentication, packet framing) stays behind
//! [`NativeClient`].

#[cfg(feature = "mysql")]
pub mod mysql;

use crate::binding::{BindingSet, BindingSlot, MysqlTime};
use crate::config::MysqlOptions;
use crate::error::DriverDiagnostic;
use crate::wire::WireType;

/// Result of a native call; the error is the driver's diagnostic.
pub type NativeResult<T = ()> = Result<T, DriverDiagnostic>;

/// Outcome of a successful `stmt_fetch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// A row was written into the bound output slots.
    Row,
    /// A row was written, but at least one slot has its error flag set
    /// because the value did not fit.
    Truncated,
    /// No more rows.
    NoData,
}

/// Column descriptor as the client library reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawField {
    pub name: String,
    pub type_code: u8,
    pub flags: u16,
    pub charset: u16,
    pub length: u32,
}

impl RawField {
    #[must_use]
    pub fn new(name: impl Into<String>, wire_type: WireType) -> Self {
        Self {
            name: name.into(),
            type_code: wire_type.code(),
            flags: 0,
            charset: 45,
            length: 255,
        }
    }

    #[must_use]
    pub fn with_flags(mut self, flags: u16) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn with_charset(mut self, charset: u16) -> Self {
        self.charset = charset;
        self
    }

    #[must_use]
    pub fn with_length(mut self, length: u32) -> Self {
        self.length = length;
        self
    }
}

/// Protocol-level value, the form a client library sends and receives.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Null,
    Int(i64),
    UInt(u64),
    Double(f64),
    Bytes(Vec<u8>),
    Time(MysqlTime),
}

impl NativeValue {
    /// Write this value into an output slot, converting it to the slot's wire
    /// type. Returns `true` when it was truncated.
    ///
    /// # Errors
    /// Returns a `DriverDiagnostic` when the value cannot be represented in the slot.
    pub fn store_into(&self, slot: &mut BindingSlot) -> NativeResult<bool> {
        match self {
            NativeValue::Null => slot.store_null(),
            NativeValue::Int(i) => slot.store_signed(*i)?,
            NativeValue::UInt(u) => slot.store_unsigned(*u)?,
            NativeValue::Double(f) => slot.store_double(*f)?,
            NativeValue::Bytes(bytes) => return slot.store_bytes(bytes),
            NativeValue::Time(time) => slot.store_time(time)?,
        }
        Ok(slot.has_error())
    }
}

/// One live connection handle of the client library.
///
/// Statement handles are created by `stmt_init` and must be given back to
/// `stmt_close`. Binding sets are only lent to the client for the duration
/// of a call; a client that needs the parameter values after
/// `stmt_bind_param` returns must copy them.
pub trait NativeClient: Send {
    type Stmt: Send;

    /// Per-thread library registration, run before a connection is opened.
    fn thread_init()
    where
        Self: Sized,
    {
    }

    /// Counterpart of [`NativeClient::thread_init`], run after the connection is closed.
    fn thread_end()
    where
        Self: Sized,
    {
    }

    /// Last human-readable error the library reported. Best-effort only.
    fn last_error(&self) -> String;

    /// Run a statement through the plain (non-prepared) query path.
    fn query(&mut self, sql: &str) -> NativeResult;

    fn stmt_init(&mut self) -> NativeResult<Self::Stmt>;

    fn stmt_prepare(&mut self, stmt: &mut Self::Stmt, query: &str) -> NativeResult;

    fn stmt_param_count(&self, stmt: &Self::Stmt) -> usize;

    fn stmt_bind_param(&mut self, stmt: &mut Self::Stmt, binds: &BindingSet) -> NativeResult;

    /// `Ok(None)` when the statement produces no result set.
    fn stmt_result_metadata(&mut self, stmt: &Self::Stmt) -> NativeResult<Option<Vec<RawField>>>;

    fn stmt_bind_result(&mut self, stmt: &mut Self::Stmt, binds: &BindingSet) -> NativeResult;

    fn stmt_execute(&mut self, stmt: &mut Self::Stmt) -> NativeResult;

    fn stmt_fetch(&mut self, stmt: &mut Self::Stmt, binds: &mut BindingSet) -> NativeResult<FetchStatus>;

    /// Re-read column `column` of the current row into `slot`, starting at `offset`.
    fn stmt_fetch_column(
        &mut self,
        stmt: &mut Self::Stmt,
        slot: &mut BindingSlot,
        column: usize,
        offset: usize,
    ) -> NativeResult;

    fn stmt_close(&mut self, stmt: Self::Stmt);

    /// Close the connection. Called exactly once, when the owning connection is dropped.
    fn close(&mut self);
}

/// Opens [`NativeClient`] connections from options.
pub trait Connector: Send + Sync {
    type Client: NativeClient;

    /// # Errors
    /// Returns the driver diagnostic when the server cannot be reached or rejects the login.
    fn connect(&self, options: &MysqlOptions) -> NativeResult<Self::Client>;
}
