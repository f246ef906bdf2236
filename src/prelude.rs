//! Convenient imports for common functionality.
//!
//! ```rust
//! use mysql_middleware::prelude::*;
//! ```

pub use crate::config::{MysqlOptions, MysqlOptionsBuilder};
pub use crate::connection::{AsyncConnection, Connection};
pub use crate::database::Database;
pub use crate::error::{DriverDiagnostic, MysqlMiddlewareError};
pub use crate::native::{Connector, NativeClient};
pub use crate::results::RowMapping;
pub use crate::types::TypedValue;

#[cfg(feature = "mysql")]
pub use crate::native::mysql::MysqlConnector;
