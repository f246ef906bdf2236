//! One prepared-statement lifecycle.
//!
//! ```text
//! Created -> Prepared -> InputBound -> Executed -> MetadataKnown -> OutputBound -> Fetching -> Done
//!                                              \-> Done (no result set)
//! ```
//!
//! The handle is closed by `Drop`, so every exit path (success or any error)
//! releases it before the binding sets are dropped.

use tracing::{debug, trace, warn};

use crate::binding::BindingSet;
use crate::error::{DriverDiagnostic, MysqlMiddlewareError};
use crate::fields::FieldCatalog;
use crate::native::{FetchStatus, NativeClient};
use crate::results::RowMapping;
use crate::types::TypedValue;

/// Run `query` with `values` and collect every row it returns.
///
/// All-or-nothing: a fetch failure discards the rows already collected.
pub(crate) fn run<C: NativeClient>(
    client: &mut C,
    query: &str,
    values: &[TypedValue],
) -> Result<Vec<RowMapping>, MysqlMiddlewareError> {
    let mut stmt = Statement::prepare(client, query)?;
    stmt.bind_params(values)?;
    stmt.execute()?;

    let catalog = stmt.fields()?;
    if catalog.is_empty() {
        debug!(query, params = values.len(), "statement produced no result set");
        return Ok(Vec::new());
    }

    stmt.bind_results(&catalog)?;
    let rows = stmt.fetch_all(&catalog)?;
    debug!(query, params = values.len(), rows = rows.len(), "statement fetched");
    Ok(rows)
}

/// Owns one native statement handle plus the binding sets lent to it.
pub(crate) struct Statement<'c, C: NativeClient> {
    client: &'c mut C,
    handle: Option<C::Stmt>,
    params: BindingSet,
    results: BindingSet,
}

impl<'c, C: NativeClient> Statement<'c, C> {
    /// Allocate a handle and prepare `query` on it.
    pub(crate) fn prepare(client: &'c mut C, query: &str) -> Result<Self, MysqlMiddlewareError> {
        let handle = client
            .stmt_init()
            .map_err(MysqlMiddlewareError::StatementInitError)?;
        let mut stmt = Self {
            client,
            handle: Some(handle),
            params: BindingSet::default(),
            results: BindingSet::default(),
        };

        let handle = stmt.handle.as_mut().ok_or_else(closed)?;
        stmt.client
            .stmt_prepare(handle, query)
            .map_err(MysqlMiddlewareError::PrepareError)?;
        trace!(query, "statement prepared");
        Ok(stmt)
    }

    /// Encode `values` and bind them as the statement's parameters.
    pub(crate) fn bind_params(&mut self, values: &[TypedValue]) -> Result<(), MysqlMiddlewareError> {
        let handle = self.handle.as_mut().ok_or_else(closed)?;
        let expected = self.client.stmt_param_count(handle);
        if values.len() != expected {
            return Err(MysqlMiddlewareError::InputBindError(DriverDiagnostic::new(
                format!(
                    "statement expects {expected} parameters, {} supplied",
                    values.len()
                ),
            )));
        }

        self.params = BindingSet::for_params(values)?;
        self.client
            .stmt_bind_param(handle, &self.params)
            .map_err(MysqlMiddlewareError::InputBindError)?;
        trace!(params = values.len(), "parameters bound");
        Ok(())
    }

    pub(crate) fn execute(&mut self) -> Result<(), MysqlMiddlewareError> {
        let handle = self.handle.as_mut().ok_or_else(closed)?;
        self.client
            .stmt_execute(handle)
            .map_err(MysqlMiddlewareError::ExecuteError)?;
        trace!("statement executed");
        Ok(())
    }

    pub(crate) fn fields(&mut self) -> Result<FieldCatalog, MysqlMiddlewareError> {
        let handle = self.handle.as_ref().ok_or_else(closed)?;
        let catalog = FieldCatalog::fetch(&mut *self.client, handle)?;
        trace!(columns = catalog.len(), "result metadata read");
        Ok(catalog)
    }

    /// Allocate output slots for `catalog` and bind them.
    pub(crate) fn bind_results(&mut self, catalog: &FieldCatalog) -> Result<(), MysqlMiddlewareError> {
        self.results = BindingSet::for_columns(catalog);
        let handle = self.handle.as_mut().ok_or_else(closed)?;
        self.client
            .stmt_bind_result(handle, &self.results)
            .map_err(MysqlMiddlewareError::OutputBindError)?;
        Ok(())
    }

    /// Fetch rows until the native layer reports the end of data.
    pub(crate) fn fetch_all(
        &mut self,
        catalog: &FieldCatalog,
    ) -> Result<Vec<RowMapping>, MysqlMiddlewareError> {
        let mut rows = Vec::new();
        // overwritten every row; each pushed row is its own clone
        let mut scratch = RowMapping::with_capacity(catalog.len());

        loop {
            let handle = self.handle.as_mut().ok_or_else(closed)?;
            self.results.reset();
            let status = self
                .client
                .stmt_fetch(handle, &mut self.results)
                .map_err(MysqlMiddlewareError::FetchError)?;
            match status {
                FetchStatus::NoData => break,
                FetchStatus::Truncated => self.refetch_truncated(catalog)?,
                FetchStatus::Row => {}
            }

            for (idx, column) in catalog.columns().iter().enumerate() {
                scratch.insert(column.name.as_str(), self.results.value(idx, column)?);
            }
            rows.push(scratch.clone());

            let handle = self.handle.as_mut().ok_or_else(closed)?;
            self.client
                .stmt_bind_result(handle, &self.results)
                .map_err(MysqlMiddlewareError::OutputBindError)?;
        }

        Ok(rows)
    }

    /// Grow every truncated slot to the length the native layer reported and
    /// read the column again.
    fn refetch_truncated(&mut self, catalog: &FieldCatalog) -> Result<(), MysqlMiddlewareError> {
        let truncated: Vec<usize> = self.results.truncated().collect();
        for idx in truncated {
            let handle = self.handle.as_mut().ok_or_else(closed)?;
            let slot = self.results.slot_mut(idx).ok_or_else(|| {
                MysqlMiddlewareError::Other(format!("no binding slot at index {idx}"))
            })?;
            let name = catalog
                .columns()
                .get(idx)
                .map_or_else(String::new, |c| c.name.clone());

            let required = slot.length();
            warn!(
                column = %name,
                required,
                capacity = slot.capacity(),
                "column truncated, re-fetching into a larger buffer"
            );
            slot.grow(required);
            slot.reset();
            self.client
                .stmt_fetch_column(handle, slot, idx, 0)
                .map_err(MysqlMiddlewareError::FetchError)?;

            if slot.has_error() {
                return Err(MysqlMiddlewareError::TruncationError {
                    column: name,
                    required: slot.length(),
                    capacity: slot.capacity(),
                });
            }
        }
        Ok(())
    }
}

impl<C: NativeClient> Drop for Statement<'_, C> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.client.stmt_close(handle);
            trace!("statement closed");
        }
    }
}

fn closed() -> MysqlMiddlewareError {
    MysqlMiddlewareError::Other("statement handle already closed".into())
}
