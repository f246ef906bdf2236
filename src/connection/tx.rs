use tracing::{debug, error};

use crate::error::MysqlMiddlewareError;
use crate::native::NativeClient;

use super::Connection;

impl<C: NativeClient> Connection<C> {
    /// Run `work` inside `START TRANSACTION` ... `COMMIT`.
    ///
    /// If `work` fails the transaction is rolled back and the error from
    /// `work` is returned unchanged. A failed `COMMIT` is rolled back the same
    /// way and its error returned. Statements other threads issue on this
    /// connection while `work` runs are part of the transaction too.
    ///
    /// # Errors
    /// - `TransactionError` if a transaction is already open on this connection.
    /// - `ExecuteError` if `START TRANSACTION` or `COMMIT` fails.
    /// - the error from `work`, after a successful rollback.
    /// - `RollbackError` carrying both errors if the rollback fails too.
    pub fn transaction<T, F>(&self, work: F) -> Result<T, MysqlMiddlewareError>
    where
        F: FnOnce(&Self) -> Result<T, MysqlMiddlewareError>,
    {
        self.begin()?;
        let outcome = work(self).and_then(|value| self.commit().map(|()| value));
        outcome.map_err(|original| self.abandon(original))
    }

    fn begin(&self) -> Result<(), MysqlMiddlewareError> {
        let mut session = self.lock();
        if session.in_transaction {
            return Err(MysqlMiddlewareError::TransactionError(
                "transaction already in progress".into(),
            ));
        }
        Self::raw(&mut session, "START TRANSACTION")?;
        session.in_transaction = true;
        debug!("transaction started");
        Ok(())
    }

    /// The connection stays in transaction mode until `COMMIT` succeeds.
    fn commit(&self) -> Result<(), MysqlMiddlewareError> {
        let mut session = self.lock();
        Self::raw(&mut session, "COMMIT")?;
        session.in_transaction = false;
        debug!("transaction committed");
        Ok(())
    }

    /// Roll back after `original`; the connection leaves transaction mode
    /// whether or not `ROLLBACK` succeeds.
    fn abandon(&self, original: MysqlMiddlewareError) -> MysqlMiddlewareError {
        let mut session = self.lock();
        session.in_transaction = false;
        match Self::raw(&mut session, "ROLLBACK") {
            Ok(()) => {
                debug!(%original, "transaction rolled back");
                original
            }
            Err(rollback) => {
                error!(%original, %rollback, "rollback failed");
                MysqlMiddlewareError::RollbackError {
                    original: Box::new(original),
                    rollback: Box::new(rollback),
                }
            }
        }
    }
}
