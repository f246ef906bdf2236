//! Test doubles for code built on this crate.
//!
//! [`FakeServer`] implements the native seam in memory, so the statement
//! pipeline, transactions and error mapping can be exercised without a
//! running server.

mod fake;

pub use fake::{
    CR_CONN_HOST_ERROR, ER_ERROR_DURING_COMMIT, ER_NO_SUCH_TABLE, ER_PARSE_ERROR,
    ER_WRONG_VALUE_COUNT, FakeClient, FakeServer, FakeStmt, Fault, Script, thread_hook_calls,
};

use crate::config::MysqlOptions;
use crate::database::Database;
use crate::error::MysqlMiddlewareError;

/// Open a `Database` against `server` with placeholder options.
///
/// # Errors
/// Returns `ConnectionError` when a `Fault::Connect` is injected.
pub fn fake_database(server: &FakeServer) -> Result<Database<FakeServer>, MysqlMiddlewareError> {
    Database::connect(MysqlOptions::new("fake", "tester"), server.clone())
}
