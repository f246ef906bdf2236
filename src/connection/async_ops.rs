use std::sync::Arc;

use tokio::task::spawn_blocking;

use crate::error::MysqlMiddlewareError;
use crate::native::NativeClient;
use crate::results::RowMapping;
use crate::types::TypedValue;

use super::Connection;

/// Async handle over a blocking [`Connection`].
///
/// Each call runs on tokio's blocking pool and still takes the connection
/// lock, so calls through clones of one handle are serialized.
pub struct AsyncConnection<C: NativeClient> {
    inner: Arc<Connection<C>>,
}

impl<C: NativeClient> Clone for AsyncConnection<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: NativeClient + 'static> AsyncConnection<C> {
    #[must_use]
    pub fn new(conn: Connection<C>) -> Self {
        Self {
            inner: Arc::new(conn),
        }
    }

    /// The blocking connection behind this handle.
    #[must_use]
    pub fn blocking(&self) -> &Connection<C> {
        &self.inner
    }

    /// Async counterpart of [`Connection::execute`].
    ///
    /// # Errors
    /// Same as `Connection::execute`; a failed blocking task maps to `Other`.
    pub async fn execute(
        &self,
        query: &str,
        values: Vec<TypedValue>,
    ) -> Result<Vec<RowMapping>, MysqlMiddlewareError> {
        let query = query.to_owned();
        run_blocking(Arc::clone(&self.inner), move |conn| conn.execute(&query, &values)).await
    }

    /// Async counterpart of [`Connection::execute_raw`].
    ///
    /// # Errors
    /// Same as `Connection::execute_raw`; a failed blocking task maps to `Other`.
    pub async fn execute_raw(&self, sql: &str) -> Result<(), MysqlMiddlewareError> {
        let sql = sql.to_owned();
        run_blocking(Arc::clone(&self.inner), move |conn| conn.execute_raw(&sql)).await
    }

    /// Async counterpart of [`Connection::transaction`]; `work` runs on the blocking pool.
    ///
    /// # Errors
    /// Same as `Connection::transaction`; a failed blocking task maps to `Other`.
    pub async fn transaction<T, F>(&self, work: F) -> Result<T, MysqlMiddlewareError>
    where
        F: FnOnce(&Connection<C>) -> Result<T, MysqlMiddlewareError> + Send + 'static,
        T: Send + 'static,
    {
        run_blocking(Arc::clone(&self.inner), move |conn| conn.transaction(work)).await
    }
}

async fn run_blocking<C, F, R>(conn: Arc<Connection<C>>, func: F) -> Result<R, MysqlMiddlewareError>
where
    C: NativeClient + 'static,
    F: FnOnce(&Connection<C>) -> Result<R, MysqlMiddlewareError> + Send + 'static,
    R: Send + 'static,
{
    spawn_blocking(move || func(&conn))
        .await
        .map_err(|e| MysqlMiddlewareError::Other(format!("spawn_blocking join error: {e}")))?
}
