use crate::error::MysqlMiddlewareError;
use crate::native::{NativeClient, RawField};
use crate::wire::{BINARY_CHARSET, WireType, flags};

/// Metadata for one result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub wire_type: WireType,
    pub is_unsigned: bool,
    pub is_nullable: bool,
    /// Column uses the binary character set, so its bytes are never text.
    pub is_binary: bool,
    /// Maximum display length reported by the server, in bytes.
    pub max_length: u32,
}

impl From<RawField> for ColumnDescriptor {
    fn from(field: RawField) -> Self {
        Self {
            is_unsigned: field.flags & flags::UNSIGNED != 0 || field.type_code == WireType::Year.code(),
            is_nullable: field.flags & flags::NOT_NULL == 0,
            is_binary: field.charset == BINARY_CHARSET,
            wire_type: WireType::from_code(field.type_code),
            max_length: field.length,
            name: field.name,
        }
    }
}

/// Ordered column metadata of a statement's result set.
///
/// An empty catalog means the statement produces no rows (DDL, DML), and the
/// caller skips output binding and fetching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldCatalog {
    columns: Vec<ColumnDescriptor>,
}

impl FieldCatalog {
    /// Ask the native layer for the result descriptor of `stmt`.
    ///
    /// # Errors
    /// Returns `MysqlMiddlewareError::FetchFieldsError` if the descriptor exists but
    /// cannot be read.
    pub fn fetch<C: NativeClient>(
        client: &mut C,
        stmt: &C::Stmt,
    ) -> Result<Self, MysqlMiddlewareError> {
        match client.stmt_result_metadata(stmt) {
            Ok(Some(fields)) => Ok(Self::from_raw(fields)),
            Ok(None) => Ok(Self::default()),
            Err(diag) => Err(MysqlMiddlewareError::FetchFieldsError(diag)),
        }
    }

    #[must_use]
    pub fn from_raw(fields: Vec<RawField>) -> Self {
        Self {
            columns: fields.into_iter().map(ColumnDescriptor::from).collect(),
        }
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_to_descriptor() {
        let catalog = FieldCatalog::from_raw(vec![
            RawField::new("id", WireType::LongLong).with_flags(flags::NOT_NULL | flags::UNSIGNED),
            RawField::new("raw", WireType::Blob).with_charset(BINARY_CHARSET),
            RawField::new("y", WireType::Year),
        ]);

        let id = &catalog.columns()[0];
        assert!(id.is_unsigned);
        assert!(!id.is_nullable);
        assert!(!id.is_binary);

        let raw = &catalog.columns()[1];
        assert!(raw.is_binary);
        assert!(raw.is_nullable);

        assert!(catalog.columns()[2].is_unsigned);
    }

    #[test]
    fn binary_collation_text_stays_text() {
        // utf8mb4_bin columns carry the BINARY flag (0x80) but a text charset
        let catalog = FieldCatalog::from_raw(vec![
            RawField::new("code", WireType::VarString).with_flags(0x0080).with_charset(46),
        ]);
        assert!(!catalog.columns()[0].is_binary);
    }
}
