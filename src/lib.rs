//! Prepared-statement middleware for MySQL.
//!
//! [`Connection::execute`] runs one statement through the full pipeline
//! (prepare, bind, execute, fetch) and returns typed rows;
//! [`Connection::transaction`] groups calls with rollback on error.

pub mod binding;
pub mod codec;
pub mod config;
pub mod connection;
pub mod database;
pub mod error;
pub mod fields;
pub mod native;
pub mod prelude;
pub mod results;
mod statement;
pub mod types;
pub mod wire;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{MysqlOptions, MysqlOptionsBuilder};
pub use connection::{AsyncConnection, Connection};
pub use database::Database;
pub use error::{DriverDiagnostic, MysqlMiddlewareError};
pub use results::RowMapping;
pub use types::TypedValue;

#[cfg(feature = "mysql")]
pub use native::mysql::{MysqlClient, MysqlConnector};
