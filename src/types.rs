use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Values that can be bound as statement parameters or read back from a row.
///
/// ```rust
/// use mysql_middleware::prelude::*;
///
/// let params = vec![
///     TypedValue::from(42_i64),
///     TypedValue::from("alice"),
///     TypedValue::Null,
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypedValue {
    /// NULL value
    Null,
    /// Signed integer (64-bit)
    SignedInt(i64),
    /// Unsigned integer (64-bit)
    UnsignedInt(u64),
    /// Floating point value (64-bit)
    Double(f64),
    /// UTF-8 text
    String(String),
    /// Raw bytes (binary columns, or text that was not valid UTF-8)
    Bytes(Vec<u8>),
    /// Date/time without time zone
    DateTime(NaiveDateTime),
}

impl TypedValue {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Integer view; unsigned values above `i64::MAX` yield `None`.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            TypedValue::SignedInt(value) => Some(*value),
            TypedValue::UnsignedInt(value) => i64::try_from(*value).ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            TypedValue::UnsignedInt(value) => Some(*value),
            TypedValue::SignedInt(value) => u64::try_from(*value).ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        if let TypedValue::Double(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let TypedValue::String(value) = self {
            Some(value)
        } else {
            None
        }
    }

    /// Byte view of `Bytes` and `String` values.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            TypedValue::Bytes(bytes) => Some(bytes),
            TypedValue::String(text) => Some(text.as_bytes()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        if let TypedValue::DateTime(value) = self {
            Some(*value)
        } else {
            None
        }
    }
}

macro_rules! impl_from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for TypedValue {
            fn from(value: $t) -> Self {
                TypedValue::SignedInt(i64::from(value))
            }
        })*
    };
}

macro_rules! impl_from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for TypedValue {
            fn from(value: $t) -> Self {
                TypedValue::UnsignedInt(u64::from(value))
            }
        })*
    };
}

impl_from_signed!(i8, i16, i32, i64);
impl_from_unsigned!(u8, u16, u32, u64);

impl From<bool> for TypedValue {
    fn from(value: bool) -> Self {
        TypedValue::SignedInt(i64::from(value))
    }
}

impl From<f32> for TypedValue {
    fn from(value: f32) -> Self {
        TypedValue::Double(f64::from(value))
    }
}

impl From<f64> for TypedValue {
    fn from(value: f64) -> Self {
        TypedValue::Double(value)
    }
}

impl From<&str> for TypedValue {
    fn from(value: &str) -> Self {
        TypedValue::String(value.to_owned())
    }
}

impl From<String> for TypedValue {
    fn from(value: String) -> Self {
        TypedValue::String(value)
    }
}

impl From<Vec<u8>> for TypedValue {
    fn from(value: Vec<u8>) -> Self {
        TypedValue::Bytes(value)
    }
}

impl From<&[u8]> for TypedValue {
    fn from(value: &[u8]) -> Self {
        TypedValue::Bytes(value.to_vec())
    }
}

impl From<NaiveDateTime> for TypedValue {
    fn from(value: NaiveDateTime) -> Self {
        TypedValue::DateTime(value)
    }
}

impl From<NaiveDate> for TypedValue {
    fn from(value: NaiveDate) -> Self {
        TypedValue::DateTime(value.and_time(chrono::NaiveTime::MIN))
    }
}

impl<T: Into<TypedValue>> From<Option<T>> for TypedValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(TypedValue::Null, Into::into)
    }
}
