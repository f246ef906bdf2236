mod option_file;

pub use option_file::{OptionFile, default_files};

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::error::MysqlMiddlewareError;
use crate::native::Connector;

pub const DEFAULT_PORT: u16 = 3306;
pub const DEFAULT_ENCODING: &str = "utf8mb4";
pub const DEFAULT_OPTIONS_GROUP: &str = "mysql_middleware";

static ENCODING_NAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").ok());

/// Options for opening a MySQL connection.
///
/// Unset fields can be filled from option files with [`MysqlOptions::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MysqlOptions {
    pub host: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub port: Option<u16>,
    /// Unix socket path; takes precedence over host/port when set.
    pub socket: Option<String>,
    /// Extra client capability flags sent during the handshake.
    pub flags: u32,
    pub encoding: Option<String>,
    /// Option file section read after `[client]`.
    pub options_group: String,
    /// Option files to read instead of the platform defaults.
    pub read_default_files: Option<Vec<PathBuf>>,
}

impl Default for MysqlOptions {
    fn default() -> Self {
        Self {
            host: None,
            user: None,
            password: None,
            database: None,
            port: None,
            socket: None,
            flags: 0,
            encoding: None,
            options_group: DEFAULT_OPTIONS_GROUP.to_string(),
            read_default_files: None,
        }
    }
}

impl MysqlOptions {
    #[must_use]
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            user: Some(user.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn builder() -> MysqlOptionsBuilder {
        MysqlOptionsBuilder::new()
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    #[must_use]
    pub fn encoding(&self) -> &str {
        self.encoding.as_deref().unwrap_or(DEFAULT_ENCODING)
    }

    /// `SET NAMES` statement for the configured encoding.
    ///
    /// # Errors
    /// Returns `MysqlMiddlewareError::ConfigError` if the encoding is not a plain
    /// character-set identifier.
    pub fn set_names_statement(&self) -> Result<String, MysqlMiddlewareError> {
        let encoding = self.encoding();
        if !ENCODING_NAME
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(encoding))
        {
            return Err(MysqlMiddlewareError::ConfigError(format!(
                "invalid character set name {encoding:?}"
            )));
        }
        Ok(format!("SET NAMES {encoding}"))
    }

    /// Fill unset fields from the option files.
    ///
    /// Files are read in order, later files overriding earlier ones; within a
    /// file the `[client]` section is read first and the options group second.
    /// Values set on `self` always win.
    ///
    /// # Errors
    /// Returns `MysqlMiddlewareError::ConfigError` for unreadable or malformed files,
    /// a non-numeric port, or an invalid encoding name.
    pub fn resolve(&self) -> Result<Self, MysqlMiddlewareError> {
        let files = self.read_default_files.clone().unwrap_or_else(default_files);
        let mut merged: HashMap<String, String> = HashMap::new();
        for path in &files {
            let Some(file) = OptionFile::load(path)? else {
                continue;
            };
            for section in ["client", self.options_group.as_str()] {
                if let Some(options) = file.section(section) {
                    merged.extend(options.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
            }
        }

        let mut resolved = self.clone();
        fill(&mut resolved.host, &merged, "host");
        fill(&mut resolved.user, &merged, "user");
        fill(&mut resolved.password, &merged, "password");
        fill(&mut resolved.database, &merged, "database");
        fill(&mut resolved.socket, &merged, "socket");
        fill(&mut resolved.encoding, &merged, "default-character-set");
        if resolved.port.is_none() {
            if let Some(raw) = merged.get("port") {
                let port = raw.parse::<u16>().map_err(|e| {
                    MysqlMiddlewareError::ConfigError(format!("invalid port {raw:?}: {e}"))
                })?;
                resolved.port = Some(port);
            }
        }

        resolved.set_names_statement()?;
        Ok(resolved)
    }
}

fn fill(field: &mut Option<String>, merged: &HashMap<String, String>, key: &str) {
    if field.is_none() {
        if let Some(value) = merged.get(key) {
            *field = Some(value.clone());
        }
    }
}

/// Fluent builder for `MysqlOptions`.
#[derive(Debug, Clone, Default)]
pub struct MysqlOptionsBuilder {
    opts: MysqlOptions,
}

impl MysqlOptionsBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.opts.host = Some(host.into());
        self
    }

    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.opts.user = Some(user.into());
        self
    }

    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.opts.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.opts.database = Some(database.into());
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.opts.port = Some(port);
        self
    }

    #[must_use]
    pub fn socket(mut self, socket: impl Into<String>) -> Self {
        self.opts.socket = Some(socket.into());
        self
    }

    #[must_use]
    pub fn flags(mut self, flags: u32) -> Self {
        self.opts.flags = flags;
        self
    }

    #[must_use]
    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.opts.encoding = Some(encoding.into());
        self
    }

    #[must_use]
    pub fn options_group(mut self, group: impl Into<String>) -> Self {
        self.opts.options_group = group.into();
        self
    }

    #[must_use]
    pub fn read_default_files(mut self, files: Vec<PathBuf>) -> Self {
        self.opts.read_default_files = Some(files);
        self
    }

    #[must_use]
    pub fn finish(self) -> MysqlOptions {
        self.opts
    }

    /// Resolve option files and open a `Database` with its default connection.
    ///
    /// # Errors
    /// Returns `MysqlMiddlewareError::ConfigError` if the options cannot be resolved, or
    /// `ConnectionError` if the server cannot be reached.
    pub fn build<K: Connector>(self, connector: K) -> Result<Database<K>, MysqlMiddlewareError> {
        Database::connect(self.finish().resolve()?, connector)
    }
}
