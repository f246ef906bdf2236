use tracing::debug;

use crate::config::MysqlOptions;
use crate::connection::Connection;
use crate::error::MysqlMiddlewareError;
use crate::native::Connector;
use crate::results::RowMapping;
use crate::types::TypedValue;

/// Connection factory with a default connection.
///
/// `execute` and `transaction` go through the default connection. Independent
/// query streams that should run in parallel each need their own
/// [`Database::make_connection`].
pub struct Database<K: Connector> {
    options: MysqlOptions,
    connector: K,
    default: Connection<K::Client>,
}

impl<K: Connector> Database<K> {
    /// Open the default connection.
    ///
    /// # Errors
    /// Returns `MysqlMiddlewareError::ConnectionError` if the server cannot be reached.
    pub fn connect(options: MysqlOptions, connector: K) -> Result<Self, MysqlMiddlewareError> {
        let default = Connection::open(&connector, &options)?;
        Ok(Self {
            options,
            connector,
            default,
        })
    }

    /// Open a new connection with the same options. It shares nothing with
    /// the default connection.
    ///
    /// # Errors
    /// Returns `MysqlMiddlewareError::ConnectionError` if the server cannot be reached.
    pub fn make_connection(&self) -> Result<Connection<K::Client>, MysqlMiddlewareError> {
        debug!("opening additional connection");
        Connection::open(&self.connector, &self.options)
    }

    #[must_use]
    pub fn default_connection(&self) -> &Connection<K::Client> {
        &self.default
    }

    #[must_use]
    pub fn options(&self) -> &MysqlOptions {
        &self.options
    }

    /// [`Connection::execute`] on the default connection.
    ///
    /// # Errors
    /// See [`Connection::execute`].
    pub fn execute(
        &self,
        query: &str,
        values: &[TypedValue],
    ) -> Result<Vec<RowMapping>, MysqlMiddlewareError> {
        self.default.execute(query, values)
    }

    /// [`Connection::transaction`] on the default connection.
    ///
    /// # Errors
    /// See [`Connection::transaction`].
    pub fn transaction<T, F>(&self, work: F) -> Result<T, MysqlMiddlewareError>
    where
        F: FnOnce(&Connection<K::Client>) -> Result<T, MysqlMiddlewareError>,
    {
        self.default.transaction(work)
    }
}
