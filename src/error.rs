use std::fmt;

use thiserror::Error;

/// Diagnostic reported by the native client layer.
///
/// The message is driver-defined text and only meant for humans; `code` and
/// `sql_state` are filled in when the server returned them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverDiagnostic {
    pub message: String,
    pub code: Option<u16>,
    pub sql_state: Option<String>,
}

impl DriverDiagnostic {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            sql_state: None,
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: u16) -> Self {
        self.code = Some(code);
        self
    }

    #[must_use]
    pub fn with_sql_state(mut self, sql_state: impl Into<String>) -> Self {
        self.sql_state = Some(sql_state.into());
        self
    }

    /// Placeholder used when the native layer failed without leaving a message.
    #[must_use]
    pub fn unknown() -> Self {
        Self::new("Unknown")
    }
}

impl fmt::Display for DriverDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, &self.sql_state) {
            (Some(code), Some(state)) => write!(f, "{} (code {code}, state {state})", self.message),
            (Some(code), None) => write!(f, "{} (code {code})", self.message),
            _ => f.write_str(&self.message),
        }
    }
}

#[derive(Debug, Error)]
pub enum MysqlMiddlewareError {
    #[error("Connection error: {0}")]
    ConnectionError(DriverDiagnostic),

    #[error("Statement allocation error: {0}")]
    StatementInitError(DriverDiagnostic),

    #[error("Prepare error: {0}")]
    PrepareError(DriverDiagnostic),

    #[error("Input bind error: {0}")]
    InputBindError(DriverDiagnostic),

    #[error("Fetch fields error: {0}")]
    FetchFieldsError(DriverDiagnostic),

    #[error("Output bind error: {0}")]
    OutputBindError(DriverDiagnostic),

    #[error("SQL execution error: {0}")]
    ExecuteError(DriverDiagnostic),

    #[error("Fetch error: {0}")]
    FetchError(DriverDiagnostic),

    #[error("Column {column} truncated: value needs {required} bytes, buffer holds {capacity}")]
    TruncationError {
        column: String,
        required: usize,
        capacity: usize,
    },

    #[error("Unsupported wire type code {0}")]
    UnsupportedTypeError(u8),

    #[error("Transaction error: {0}")]
    TransactionError(String),

    #[error("Rollback failed ({rollback}) after: {original}")]
    RollbackError {
        original: Box<MysqlMiddlewareError>,
        rollback: Box<MysqlMiddlewareError>,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Other database error: {0}")]
    Other(String),
}

impl MysqlMiddlewareError {
    /// Driver diagnostic behind this error, if it came from the native layer.
    #[must_use]
    pub fn diagnostic(&self) -> Option<&DriverDiagnostic> {
        match self {
            Self::ConnectionError(d)
            | Self::StatementInitError(d)
            | Self::PrepareError(d)
            | Self::InputBindError(d)
            | Self::FetchFieldsError(d)
            | Self::OutputBindError(d)
            | Self::ExecuteError(d)
            | Self::FetchError(d) => Some(d),
            Self::RollbackError { original, .. } => original.diagnostic(),
            _ => None,
        }
    }

    /// Numeric server error code, when the server supplied one.
    #[must_use]
    pub fn code(&self) -> Option<u16> {
        self.diagnostic().and_then(|d| d.code)
    }
}
