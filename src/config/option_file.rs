//! Reader for `my.cnf`-style option files.
//!
//! The format is INI-like: `[section]` headers, `key = value` lines, bare
//! `key` flags, `#`/`;` comments. `!include` directives are ignored. Keys are
//! normalized so `default_character_set` and `default-character-set` match.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::MysqlMiddlewareError;

/// Files consulted when the caller gives no explicit list, lowest priority first.
#[must_use]
pub fn default_files() -> Vec<PathBuf> {
    let mut files = vec![PathBuf::from("/etc/my.cnf"), PathBuf::from("/etc/mysql/my.cnf")];
    if let Some(home) = dirs::home_dir() {
        files.push(home.join(".my.cnf"));
    }
    files
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionFile {
    sections: HashMap<String, HashMap<String, String>>,
}

impl OptionFile {
    /// Read and parse `path`. A missing file yields `Ok(None)`.
    ///
    /// # Errors
    /// Returns `MysqlMiddlewareError::ConfigError` if the file exists but cannot be read
    /// or parsed.
    pub fn load(path: &Path) -> Result<Option<Self>, MysqlMiddlewareError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(MysqlMiddlewareError::ConfigError(format!(
                    "cannot read option file {}: {e}",
                    path.display()
                )));
            }
        };
        debug!(path = %path.display(), "reading option file");
        Self::parse(&text)
            .map(Some)
            .map_err(|e| MysqlMiddlewareError::ConfigError(format!("{}: {e}", path.display())))
    }

    /// Parse option file text.
    ///
    /// # Errors
    /// Returns a message naming the offending line for unterminated section
    /// headers or options that appear before any section.
    pub fn parse(text: &str) -> Result<Self, String> {
        let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
        let mut current: Option<String> = None;

        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') || line.starts_with('!') {
                continue;
            }

            if let Some(header) = line.strip_prefix('[') {
                let name = header
                    .strip_suffix(']')
                    .ok_or_else(|| format!("line {}: unterminated section header", lineno + 1))?;
                let name = name.trim().to_string();
                sections.entry(name.clone()).or_default();
                current = Some(name);
                continue;
            }

            let section = current
                .as_ref()
                .ok_or_else(|| format!("line {}: option outside of any section", lineno + 1))?;
            let (key, value) = match line.split_once('=') {
                Some((key, value)) => (key.trim(), unquote(strip_comment(value.trim()))),
                None => (line, String::new()),
            };
            sections
                .entry(section.clone())
                .or_default()
                .insert(normalize_key(key), value);
        }

        Ok(Self { sections })
    }

    /// Options of `section`, if present.
    #[must_use]
    pub fn section(&self, name: &str) -> Option<&HashMap<String, String>> {
        self.sections.get(name)
    }

    /// Look up `key` (dash or underscore spelling) in `section`.
    #[must_use]
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section)
            .and_then(|options| options.get(&normalize_key(key)))
            .map(String::as_str)
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().replace('_', "-").to_ascii_lowercase()
}

fn strip_comment(value: &str) -> &str {
    if value.starts_with('"') || value.starts_with('\'') {
        return value;
    }
    match value.find(" #") {
        Some(idx) => value[..idx].trim_end(),
        None => value,
    }
}

fn unquote(value: &str) -> String {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner.to_string();
        }
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
# global defaults
[client]
user = app
password = "s3cret # not a comment"
port=3307

[mysql_middleware]
default_character_set = latin1
host = db.internal   # trailing comment
skip-ssl
!includedir /etc/mysql/conf.d/
"#;

    #[test]
    fn sections_and_values() {
        let file = OptionFile::parse(SAMPLE).unwrap();
        assert_eq!(file.get("client", "user"), Some("app"));
        assert_eq!(file.get("client", "password"), Some("s3cret # not a comment"));
        assert_eq!(file.get("client", "port"), Some("3307"));
        assert_eq!(file.get("mysql_middleware", "host"), Some("db.internal"));
        assert_eq!(file.get("mysql_middleware", "skip_ssl"), Some(""));
    }

    #[test]
    fn dash_and_underscore_keys_match() {
        let file = OptionFile::parse(SAMPLE).unwrap();
        assert_eq!(
            file.get("mysql_middleware", "default-character-set"),
            file.get("mysql_middleware", "default_character_set"),
        );
        assert_eq!(file.get("mysql_middleware", "default-character-set"), Some("latin1"));
    }

    #[test]
    fn malformed_lines_are_rejected() {
        let err = OptionFile::parse("[client\nuser=x").unwrap_err();
        assert!(err.contains("line 1"), "{err}");

        let err = OptionFile::parse("user=x").unwrap_err();
        assert!(err.contains("outside of any section"), "{err}");
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = OptionFile::load(&dir.path().join("absent.cnf")).unwrap();
        assert!(loaded.is_none());
    }
}
