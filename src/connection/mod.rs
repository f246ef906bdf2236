mod async_ops;
mod tx;

pub use async_ops::AsyncConnection;

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::config::MysqlOptions;
use crate::error::MysqlMiddlewareError;
use crate::native::{Connector, NativeClient};
use crate::results::RowMapping;
use crate::statement;
use crate::types::TypedValue;

/// State guarded by the connection lock.
struct Session<C> {
    client: C,
    in_transaction: bool,
}

/// One live server connection.
///
/// Every statement lifecycle runs under a single lock, so calls made on one
/// connection execute one at a time and in lock order. Open more connections
/// for parallel query streams.
pub struct Connection<C: NativeClient> {
    session: Mutex<Session<C>>,
}

impl<C: NativeClient> Connection<C> {
    /// Register the native library for this thread and connect.
    ///
    /// # Errors
    /// Returns `MysqlMiddlewareError::ConnectionError` with the driver diagnostic if
    /// the server cannot be reached or rejects the login.
    pub fn open<K>(connector: &K, options: &MysqlOptions) -> Result<Self, MysqlMiddlewareError>
    where
        K: Connector<Client = C>,
    {
        C::thread_init();
        let client = match connector.connect(options) {
            Ok(client) => client,
            Err(diag) => {
                C::thread_end();
                return Err(MysqlMiddlewareError::ConnectionError(diag));
            }
        };
        info!(
            host = options.host.as_deref().unwrap_or("localhost"),
            port = options.port(),
            database = options.database.as_deref().unwrap_or(""),
            "connection opened"
        );
        Ok(Self {
            session: Mutex::new(Session {
                client,
                in_transaction: false,
            }),
        })
    }

    /// Prepare, bind, execute and fetch `query` with one value per `?` placeholder.
    ///
    /// Statements that produce no result set return an empty vector.
    ///
    /// # Errors
    /// Returns the error of whichever statement stage failed; rows fetched
    /// before a failure are discarded.
    pub fn execute(
        &self,
        query: &str,
        values: &[TypedValue],
    ) -> Result<Vec<RowMapping>, MysqlMiddlewareError> {
        let mut session = self.lock();
        statement::run(&mut session.client, query, values)
    }

    /// Run `sql` through the plain query path, without parameters or results.
    ///
    /// # Errors
    /// Returns `MysqlMiddlewareError::ExecuteError` with the driver diagnostic.
    pub fn execute_raw(&self, sql: &str) -> Result<(), MysqlMiddlewareError> {
        let mut session = self.lock();
        Self::raw(&mut session, sql)
    }

    /// Last error text the native layer reported. Best-effort diagnostic only.
    #[must_use]
    pub fn last_error(&self) -> String {
        self.lock().client.last_error()
    }

    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.lock().in_transaction
    }

    /// Share this connection with async callers.
    #[must_use]
    pub fn into_async(self) -> AsyncConnection<C>
    where
        C: 'static,
    {
        AsyncConnection::new(self)
    }

    fn raw(session: &mut Session<C>, sql: &str) -> Result<(), MysqlMiddlewareError> {
        debug!(sql, "raw statement");
        session
            .client
            .query(sql)
            .map_err(MysqlMiddlewareError::ExecuteError)
    }

    fn lock(&self) -> MutexGuard<'_, Session<C>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: NativeClient> Drop for Connection<C> {
    fn drop(&mut self) {
        let session = self
            .session
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        session.client.close();
        C::thread_end();
        info!("connection closed");
    }
}
