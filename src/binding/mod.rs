//! Fixed-capacity binding slots shared with the native layer.
//!
//! A [`BindingSet`] holds one slot per statement parameter (input) or per
//! result column (output). Each slot owns its byte buffer plus the NULL,
//! length and error side channels the native layer reports through.

mod time;

pub use time::{MYSQL_TIME_LEN, MysqlTime, time_anchor};

use crate::codec;
use crate::error::{DriverDiagnostic, MysqlMiddlewareError};
use crate::fields::{ColumnDescriptor, FieldCatalog};
use crate::types::TypedValue;
use crate::wire::WireType;

/// Upper bound for the initial buffer of variable-length columns.
pub const MAX_VARLEN_BUFFER: usize = 64 * 1024;

/// One parameter or column buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingSlot {
    buffer: Vec<u8>,
    length: usize,
    is_null: bool,
    error: bool,
    wire_type: WireType,
    is_unsigned: bool,
}

impl BindingSlot {
    /// Input slot holding `bytes` as its value.
    #[must_use]
    pub fn input(wire_type: WireType, is_unsigned: bool, bytes: Vec<u8>) -> Self {
        Self {
            length: bytes.len(),
            buffer: bytes,
            is_null: false,
            error: false,
            wire_type,
            is_unsigned,
        }
    }

    #[must_use]
    pub fn input_null() -> Self {
        Self {
            buffer: Vec::new(),
            length: 0,
            is_null: true,
            error: false,
            wire_type: WireType::Null,
            is_unsigned: false,
        }
    }

    /// Empty output slot with a buffer of `capacity` bytes.
    #[must_use]
    pub fn output(wire_type: WireType, is_unsigned: bool, capacity: usize) -> Self {
        Self {
            buffer: vec![0; capacity],
            length: 0,
            is_null: false,
            error: false,
            wire_type,
            is_unsigned,
        }
    }

    #[must_use]
    pub fn wire_type(&self) -> WireType {
        self.wire_type
    }

    #[must_use]
    pub fn is_unsigned(&self) -> bool {
        self.is_unsigned
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.is_null
    }

    /// Length of the value the native layer reported, which can exceed the
    /// buffer when the value was truncated.
    #[must_use]
    pub fn length(&self) -> usize {
        self.length
    }

    /// Set when the last fetch could not fit the value into the buffer.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.error
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// The bytes actually written for the current value.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.buffer[..self.length.min(self.buffer.len())]
    }

    /// Clear the side channels before the next fetch.
    pub fn reset(&mut self) {
        self.length = 0;
        self.is_null = false;
        self.error = false;
    }

    /// Resize the buffer so a value of `required` bytes fits.
    pub fn grow(&mut self, required: usize) {
        if required > self.buffer.len() {
            self.buffer.resize(required, 0);
        }
    }

    pub fn store_null(&mut self) {
        self.length = 0;
        self.is_null = true;
        self.error = false;
    }

    /// Store an integer, range-checked against the column width. Text columns
    /// receive its decimal form.
    ///
    /// # Errors
    /// Returns a `DriverDiagnostic` when the value does not fit the slot's type.
    pub fn store_signed(&mut self, value: i64) -> Result<(), DriverDiagnostic> {
        self.store_integer(i128::from(value))
    }

    /// # Errors
    /// Returns a `DriverDiagnostic` when the value does not fit the slot's type.
    pub fn store_unsigned(&mut self, value: u64) -> Result<(), DriverDiagnostic> {
        self.store_integer(i128::from(value))
    }

    /// # Errors
    /// Returns a `DriverDiagnostic` for temporal slots, and for integer slots
    /// when the value is not a whole number in range.
    pub fn store_double(&mut self, value: f64) -> Result<(), DriverDiagnostic> {
        match self.wire_type {
            WireType::Float => self.fill(&(value as f32).to_le_bytes()),
            WireType::Double => self.fill(&value.to_le_bytes()),
            kind if kind.is_integer() => {
                if !value.is_finite() || value.fract() != 0.0 {
                    return Err(self.mismatch(&format!("double {value}")));
                }
                // saturating cast; out-of-range values fail the width check
                return self.store_integer(value as i128);
            }
            kind if kind.fixed_width().is_some() => {
                return Err(self.mismatch(&format!("double {value}")));
            }
            _ => self.fill(value.to_string().as_bytes()),
        }
        Ok(())
    }

    /// # Errors
    /// Returns a `DriverDiagnostic` unless the slot holds a date or time kind.
    pub fn store_time(&mut self, value: &MysqlTime) -> Result<(), DriverDiagnostic> {
        if !self.wire_type.is_temporal() {
            return Err(self.mismatch("date/time value"));
        }
        let mut raw = [0_u8; MYSQL_TIME_LEN];
        value.write_to(&mut raw);
        self.fill(&raw);
        Ok(())
    }

    /// Store a byte string. Variable-length slots copy it and return `true`
    /// when it did not fit: the prefix is kept, `length` reports the full size
    /// and the error flag is set. Numeric and temporal slots parse it as text.
    ///
    /// # Errors
    /// Returns a `DriverDiagnostic` when a numeric or temporal slot receives
    /// text that does not parse as its type.
    pub fn store_bytes(&mut self, bytes: &[u8]) -> Result<bool, DriverDiagnostic> {
        let kind = self.wire_type;
        if kind.fixed_width().is_none() {
            self.fill(bytes);
            return Ok(self.error);
        }

        let text = std::str::from_utf8(bytes)
            .map(str::trim)
            .map_err(|_| self.mismatch(&format!("{} non-text bytes", bytes.len())))?;
        let unparsable = || self.mismatch(&format!("text {text:?}"));
        match kind {
            WireType::Float | WireType::Double => {
                let value: f64 = text.parse().map_err(|_| unparsable())?;
                self.store_double(value)?;
            }
            kind if kind.is_integer() => {
                let value: i128 = text.parse().map_err(|_| unparsable())?;
                self.store_integer(value)?;
            }
            kind if kind.is_temporal() => {
                let time = MysqlTime::parse_text(text, kind).ok_or_else(unparsable)?;
                self.store_time(&time)?;
            }
            _ => return Err(unparsable()),
        }
        Ok(false)
    }

    fn store_integer(&mut self, value: i128) -> Result<(), DriverDiagnostic> {
        match self.wire_type {
            WireType::Float => self.fill(&(value as f32).to_le_bytes()),
            WireType::Double => self.fill(&(value as f64).to_le_bytes()),
            kind if kind.is_integer() => {
                let width = kind.fixed_width().unwrap_or(8);
                let bits = 8 * width as u32;
                let (min, max) = if self.is_unsigned {
                    (0, (1_i128 << bits) - 1)
                } else {
                    (-(1_i128 << (bits - 1)), (1_i128 << (bits - 1)) - 1)
                };
                if !(min..=max).contains(&value) {
                    return Err(self.mismatch(&format!("integer {value}")));
                }
                // two's complement truncated to the column width
                let le = (value as u64).to_le_bytes();
                self.fill(&le[..width]);
            }
            kind if kind.fixed_width().is_some() => {
                return Err(self.mismatch(&format!("integer {value}")));
            }
            _ => self.fill(value.to_string().as_bytes()),
        }
        Ok(())
    }

    fn mismatch(&self, what: &str) -> DriverDiagnostic {
        let sign = if self.is_unsigned { "unsigned " } else { "" };
        DriverDiagnostic::new(format!(
            "cannot store {what} in {sign}{:?} column",
            self.wire_type
        ))
    }

    fn fill(&mut self, bytes: &[u8]) {
        let copied = bytes.len().min(self.buffer.len());
        self.buffer[..copied].copy_from_slice(&bytes[..copied]);
        self.length = bytes.len();
        self.is_null = false;
        self.error = copied < bytes.len();
    }
}

/// Ordered slots for one statement's parameters or result columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingSet {
    slots: Vec<BindingSlot>,
}

impl BindingSet {
    /// Encode `values` into input slots, one per placeholder.
    ///
    /// # Errors
    /// Returns `MysqlMiddlewareError::InputBindError` if a value cannot be encoded.
    pub fn for_params(values: &[TypedValue]) -> Result<Self, MysqlMiddlewareError> {
        let mut slots = Vec::with_capacity(values.len());
        for value in values {
            slots.push(codec::encode(value)?);
        }
        Ok(Self { slots })
    }

    /// Allocate output slots sized from each column's wire type.
    #[must_use]
    pub fn for_columns(catalog: &FieldCatalog) -> Self {
        let slots = catalog
            .columns()
            .iter()
            .map(|column| {
                BindingSlot::output(
                    column.wire_type,
                    column.is_unsigned,
                    output_capacity(column),
                )
            })
            .collect();
        Self { slots }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[must_use]
    pub fn slot(&self, index: usize) -> Option<&BindingSlot> {
        self.slots.get(index)
    }

    pub fn slot_mut(&mut self, index: usize) -> Option<&mut BindingSlot> {
        self.slots.get_mut(index)
    }

    #[must_use]
    pub fn slots(&self) -> &[BindingSlot] {
        &self.slots
    }

    pub fn slots_mut(&mut self) -> &mut [BindingSlot] {
        &mut self.slots
    }

    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.reset();
        }
    }

    /// Indexes of slots whose last value was truncated.
    pub fn truncated(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.has_error())
            .map(|(idx, _)| idx)
    }

    /// Decode the value currently held by the slot at `index`.
    ///
    /// # Errors
    /// Returns `MysqlMiddlewareError::UnsupportedTypeError` for unknown wire types,
    /// or `Other` if `index` is out of range.
    pub fn value(
        &self,
        index: usize,
        column: &ColumnDescriptor,
    ) -> Result<TypedValue, MysqlMiddlewareError> {
        let slot = self.slots.get(index).ok_or_else(|| {
            MysqlMiddlewareError::Other(format!("no binding slot at index {index}"))
        })?;
        codec::decode(slot, column)
    }
}

fn output_capacity(column: &ColumnDescriptor) -> usize {
    column
        .wire_type
        .fixed_width()
        .unwrap_or_else(|| (column.max_length as usize).clamp(1, MAX_VARLEN_BUFFER))
}
