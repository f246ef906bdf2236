//! Conversion between [`TypedValue`] and binding slots.
//!
//! `encode` turns a parameter into an input slot, `decode` reads a fetched
//! output slot back according to its column metadata, and `decode_input`
//! lets a native back end recover the protocol value of an input slot.

use crate::binding::{BindingSlot, MYSQL_TIME_LEN, MysqlTime};
use crate::error::{DriverDiagnostic, MysqlMiddlewareError};
use crate::fields::ColumnDescriptor;
use crate::native::NativeValue;
use crate::types::TypedValue;
use crate::wire::WireType;

/// Encode one parameter value into an input slot.
///
/// Date/times lose their fractional seconds.
///
/// # Errors
/// Returns `MysqlMiddlewareError::InputBindError` if a date/time lies outside the
/// range the server can store.
pub fn encode(value: &TypedValue) -> Result<BindingSlot, MysqlMiddlewareError> {
    let slot = match value {
        TypedValue::Null => BindingSlot::input_null(),
        TypedValue::SignedInt(i) => {
            BindingSlot::input(WireType::LongLong, false, i.to_le_bytes().to_vec())
        }
        TypedValue::UnsignedInt(u) => {
            BindingSlot::input(WireType::LongLong, true, u.to_le_bytes().to_vec())
        }
        TypedValue::Double(f) => BindingSlot::input(WireType::Double, false, f.to_le_bytes().to_vec()),
        TypedValue::String(s) => BindingSlot::input(WireType::String, false, s.as_bytes().to_vec()),
        TypedValue::Bytes(b) => BindingSlot::input(WireType::Blob, false, b.clone()),
        TypedValue::DateTime(dt) => {
            let time = MysqlTime::from_datetime(dt).ok_or_else(|| {
                MysqlMiddlewareError::InputBindError(DriverDiagnostic::new(format!(
                    "date/time {dt} is outside the supported range"
                )))
            })?;
            let mut raw = [0_u8; MYSQL_TIME_LEN];
            time.write_to(&mut raw);
            BindingSlot::input(WireType::DateTime, false, raw.to_vec())
        }
    };
    Ok(slot)
}

/// Decode the value held by an output slot.
///
/// Text columns whose bytes are not valid UTF-8 come back as `Bytes`. The
/// zero date and other dates the calendar cannot represent decode as `Null`.
///
/// # Errors
/// Returns `MysqlMiddlewareError::UnsupportedTypeError` for wire types the crate
/// does not know, or `Other` when a fixed-width slot holds fewer bytes than its type needs.
pub fn decode(
    slot: &BindingSlot,
    column: &ColumnDescriptor,
) -> Result<TypedValue, MysqlMiddlewareError> {
    if slot.is_null() {
        return Ok(TypedValue::Null);
    }
    let data = slot.data();
    match column.wire_type {
        WireType::Null => Ok(TypedValue::Null),
        WireType::Unknown(code) => Err(MysqlMiddlewareError::UnsupportedTypeError(code)),
        kind if kind.is_integer() => {
            let width = kind.fixed_width().unwrap_or(8);
            decode_integer(data, width, column.is_unsigned)
                .ok_or_else(|| short_buffer(column, data.len()))
        }
        WireType::Float => {
            let raw: [u8; 4] = data
                .get(..4)
                .and_then(|b| b.try_into().ok())
                .ok_or_else(|| short_buffer(column, data.len()))?;
            Ok(TypedValue::Double(f64::from(f32::from_le_bytes(raw))))
        }
        WireType::Double => {
            let raw: [u8; 8] = data
                .get(..8)
                .and_then(|b| b.try_into().ok())
                .ok_or_else(|| short_buffer(column, data.len()))?;
            Ok(TypedValue::Double(f64::from_le_bytes(raw)))
        }
        WireType::Time => {
            let time = MysqlTime::read_from(data).ok_or_else(|| short_buffer(column, data.len()))?;
            Ok(time
                .to_anchored_time()
                .map_or(TypedValue::Null, TypedValue::DateTime))
        }
        kind if kind.is_temporal() => {
            let time = MysqlTime::read_from(data).ok_or_else(|| short_buffer(column, data.len()))?;
            Ok(time.to_datetime().map_or(TypedValue::Null, TypedValue::DateTime))
        }
        _ => Ok(text_or_bytes(data, column.is_binary)),
    }
}

/// Recover the protocol value of an input slot, as a native back end sends it.
///
/// # Errors
/// Returns a `DriverDiagnostic` if the slot's bytes do not match its wire type.
pub fn decode_input(slot: &BindingSlot) -> Result<NativeValue, DriverDiagnostic> {
    if slot.is_null() {
        return Ok(NativeValue::Null);
    }
    let data = slot.data();
    let malformed = || {
        DriverDiagnostic::new(format!(
            "malformed {:?} parameter of {} bytes",
            slot.wire_type(),
            data.len()
        ))
    };
    match slot.wire_type() {
        WireType::Null => Ok(NativeValue::Null),
        kind if kind.is_integer() => {
            let width = kind.fixed_width().unwrap_or(8);
            match decode_integer(data, width, slot.is_unsigned()).ok_or_else(malformed)? {
                TypedValue::UnsignedInt(u) => Ok(NativeValue::UInt(u)),
                TypedValue::SignedInt(i) => Ok(NativeValue::Int(i)),
                _ => Err(malformed()),
            }
        }
        WireType::Double => {
            let raw: [u8; 8] = data.try_into().map_err(|_| malformed())?;
            Ok(NativeValue::Double(f64::from_le_bytes(raw)))
        }
        WireType::Float => {
            let raw: [u8; 4] = data.try_into().map_err(|_| malformed())?;
            Ok(NativeValue::Double(f64::from(f32::from_le_bytes(raw))))
        }
        kind if kind.is_temporal() => MysqlTime::read_from(data)
            .map(NativeValue::Time)
            .ok_or_else(malformed),
        WireType::Unknown(code) => Err(DriverDiagnostic::new(format!(
            "unsupported parameter type code {code}"
        ))),
        _ => Ok(NativeValue::Bytes(data.to_vec())),
    }
}

fn decode_integer(data: &[u8], width: usize, unsigned: bool) -> Option<TypedValue> {
    let bytes = data.get(..width)?;
    let mut raw = [0_u8; 8];
    raw[..width].copy_from_slice(bytes);
    if unsigned {
        Some(TypedValue::UnsignedInt(u64::from_le_bytes(raw)))
    } else {
        // sign-extend from the column width
        let shift = 64 - 8 * width as u32;
        Some(TypedValue::SignedInt((i64::from_le_bytes(raw) << shift) >> shift))
    }
}

fn text_or_bytes(data: &[u8], is_binary: bool) -> TypedValue {
    if is_binary {
        return TypedValue::Bytes(data.to_vec());
    }
    match std::str::from_utf8(data) {
        Ok(text) => TypedValue::String(text.to_owned()),
        Err(_) => TypedValue::Bytes(data.to_vec()),
    }
}

fn short_buffer(column: &ColumnDescriptor, len: usize) -> MysqlMiddlewareError {
    MysqlMiddlewareError::Other(format!(
        "column {} ({:?}) holds {len} bytes, too few for its type",
        column.name, column.wire_type
    ))
}
