use std::collections::HashMap;
use std::collections::hash_map;

use serde::Serialize;

use crate::types::TypedValue;

/// One fetched row, keyed by column name.
///
/// Duplicate column names in a result set overwrite each other; the last
/// column wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RowMapping {
    values: HashMap<String, TypedValue>,
}

impl RowMapping {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: HashMap::with_capacity(capacity),
        }
    }

    /// Set the value of `column`, replacing any previous value.
    pub fn insert(&mut self, column: impl Into<String>, value: TypedValue) {
        self.values.insert(column.into(), value);
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&TypedValue> {
        self.values.get(column_name)
    }

    #[must_use]
    pub fn contains_column(&self, column_name: &str) -> bool {
        self.values.contains_key(column_name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, String, TypedValue> {
        self.values.iter()
    }

    #[must_use]
    pub fn into_inner(self) -> HashMap<String, TypedValue> {
        self.values
    }
}

impl<'a> IntoIterator for &'a RowMapping {
    type Item = (&'a String, &'a TypedValue);
    type IntoIter = hash_map::Iter<'a, String, TypedValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl FromIterator<(String, TypedValue)> for RowMapping {
    fn from_iter<I: IntoIterator<Item = (String, TypedValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_columns_keep_last_value() {
        let mut row = RowMapping::default();
        row.insert("@@version", TypedValue::from("first"));
        row.insert("@@version", TypedValue::from("second"));
        assert_eq!(row.len(), 1);
        assert_eq!(row.get("@@version").and_then(TypedValue::as_text), Some("second"));
    }

    #[test]
    fn clones_do_not_alias() {
        let mut scratch = RowMapping::default();
        scratch.insert("n", TypedValue::SignedInt(1));
        let first = scratch.clone();
        scratch.insert("n", TypedValue::SignedInt(2));
        assert_eq!(first.get("n"), Some(&TypedValue::SignedInt(1)));
        assert_eq!(scratch.get("n"), Some(&TypedValue::SignedInt(2)));
    }

    #[test]
    fn serializes_as_a_plain_object() {
        let row: RowMapping = [("id".to_string(), TypedValue::SignedInt(7))].into_iter().collect();
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json, serde_json::json!({"id": {"SignedInt": 7}}));
    }
}
