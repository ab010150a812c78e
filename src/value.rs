//! Value types for query result cells.

use arrow_array::cast::AsArray;
use arrow_array::types::{
    DurationMicrosecondType, DurationMillisecondType, DurationNanosecondType, DurationSecondType,
    Float16Type, Float32Type, Float64Type, Int8Type, Int16Type, Int32Type, Int64Type,
    TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType, UInt8Type, UInt16Type, UInt32Type, UInt64Type,
};
use arrow_array::Array;
use arrow_schema::{DataType, TimeUnit};
use chrono::{DateTime, FixedOffset};
use ordered_float::OrderedFloat;

use crate::error::{Error, Result};

/// Represents a single cell of a query result.
///
/// Arrow column types are folded into this smaller set: all signed integers
/// become `Long`, all unsigned integers `UnsignedLong`, all floats `Double`.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// String value.
    String(String),

    /// 64-bit floating point value.
    Double(OrderedFloat<f64>),

    /// Boolean value.
    Bool(bool),

    /// Signed 64-bit integer.
    Long(i64),

    /// Unsigned 64-bit integer.
    UnsignedLong(u64),

    /// Duration value.
    Duration(chrono::Duration),

    /// Raw binary data.
    Binary(Vec<u8>),

    /// Timestamp, always in UTC.
    Timestamp(DateTime<FixedOffset>),

    /// Null value.
    Null,
}

impl Value {
    /// Read the cell at `row` of `array`.
    ///
    /// Dictionary-encoded columns (tag columns in InfluxDB 3) are resolved
    /// to their value type.
    pub fn from_array(array: &dyn Array, row: usize) -> Result<Value> {
        if row >= array.len() {
            return Err(Error::Decode(format!(
                "row {} out of bounds for column of length {}",
                row,
                array.len()
            )));
        }
        if array.is_null(row) {
            return Ok(Value::Null);
        }

        let value = match array.data_type() {
            DataType::Null => Value::Null,
            DataType::Utf8 => Value::String(array.as_string::<i32>().value(row).to_string()),
            DataType::LargeUtf8 => Value::String(array.as_string::<i64>().value(row).to_string()),
            DataType::Utf8View => Value::String(array.as_string_view().value(row).to_string()),
            DataType::Boolean => Value::Bool(array.as_boolean().value(row)),
            DataType::Float16 => Value::Double(OrderedFloat::from(
                array.as_primitive::<Float16Type>().value(row).to_f64(),
            )),
            DataType::Float32 => Value::Double(OrderedFloat::from(
                array.as_primitive::<Float32Type>().value(row) as f64,
            )),
            DataType::Float64 => {
                Value::Double(OrderedFloat::from(array.as_primitive::<Float64Type>().value(row)))
            }
            DataType::Int8 => Value::Long(array.as_primitive::<Int8Type>().value(row) as i64),
            DataType::Int16 => Value::Long(array.as_primitive::<Int16Type>().value(row) as i64),
            DataType::Int32 => Value::Long(array.as_primitive::<Int32Type>().value(row) as i64),
            DataType::Int64 => Value::Long(array.as_primitive::<Int64Type>().value(row)),
            DataType::UInt8 => {
                Value::UnsignedLong(array.as_primitive::<UInt8Type>().value(row) as u64)
            }
            DataType::UInt16 => {
                Value::UnsignedLong(array.as_primitive::<UInt16Type>().value(row) as u64)
            }
            DataType::UInt32 => {
                Value::UnsignedLong(array.as_primitive::<UInt32Type>().value(row) as u64)
            }
            DataType::UInt64 => Value::UnsignedLong(array.as_primitive::<UInt64Type>().value(row)),
            DataType::Binary => Value::Binary(array.as_binary::<i32>().value(row).to_vec()),
            DataType::LargeBinary => Value::Binary(array.as_binary::<i64>().value(row).to_vec()),
            DataType::FixedSizeBinary(_) => {
                Value::Binary(array.as_fixed_size_binary().value(row).to_vec())
            }
            DataType::Duration(unit) => {
                let raw = match unit {
                    TimeUnit::Second => array.as_primitive::<DurationSecondType>().value(row),
                    TimeUnit::Millisecond => {
                        array.as_primitive::<DurationMillisecondType>().value(row)
                    }
                    TimeUnit::Microsecond => {
                        array.as_primitive::<DurationMicrosecondType>().value(row)
                    }
                    TimeUnit::Nanosecond => {
                        array.as_primitive::<DurationNanosecondType>().value(row)
                    }
                };
                Value::Duration(duration_from_unit(raw, unit)?)
            }
            DataType::Timestamp(unit, _) => {
                let raw = match unit {
                    TimeUnit::Second => array.as_primitive::<TimestampSecondType>().value(row),
                    TimeUnit::Millisecond => {
                        array.as_primitive::<TimestampMillisecondType>().value(row)
                    }
                    TimeUnit::Microsecond => {
                        array.as_primitive::<TimestampMicrosecondType>().value(row)
                    }
                    TimeUnit::Nanosecond => {
                        array.as_primitive::<TimestampNanosecondType>().value(row)
                    }
                };
                Value::Timestamp(timestamp_from_unit(raw, unit)?)
            }
            DataType::Dictionary(key_type, _) => {
                let key = dictionary_key(array, key_type, row)?;
                return Value::from_array(array.as_any_dictionary().values().as_ref(), key);
            }
            other => {
                return Err(Error::Decode(format!("unsupported column type: {}", other)));
            }
        };

        Ok(value)
    }

    /// Returns the value as a string reference if it is a `String` variant.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as an owned string if it is a `String` variant.
    pub fn string(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Returns the value as a f64 if it is a `Double` variant.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(f) => Some(f.into_inner()),
            _ => None,
        }
    }

    /// Returns the value as a bool if it is a `Bool` variant.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value as an i64 if it is a `Long` variant.
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as a u64 if it is an `UnsignedLong` variant.
    pub fn as_unsigned_long(&self) -> Option<u64> {
        match self {
            Value::UnsignedLong(u) => Some(*u),
            _ => None,
        }
    }

    /// Returns the value as a chrono::Duration if it is a `Duration` variant.
    pub fn as_duration(&self) -> Option<&chrono::Duration> {
        match self {
            Value::Duration(d) => Some(d),
            _ => None,
        }
    }

    /// Returns the value as a byte slice if it is a `Binary` variant.
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the value as a DateTime if it is a `Timestamp` variant.
    pub fn as_time(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Value::Timestamp(t) => Some(t),
            _ => None,
        }
    }

    /// Returns true if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// Key of the dictionary entry at `row`, read without touching other rows.
fn dictionary_key(array: &dyn Array, key_type: &DataType, row: usize) -> Result<usize> {
    let key = match key_type {
        DataType::Int8 => {
            usize::try_from(array.as_dictionary::<Int8Type>().keys().value(row)).ok()
        }
        DataType::Int16 => {
            usize::try_from(array.as_dictionary::<Int16Type>().keys().value(row)).ok()
        }
        DataType::Int32 => {
            usize::try_from(array.as_dictionary::<Int32Type>().keys().value(row)).ok()
        }
        DataType::Int64 => {
            usize::try_from(array.as_dictionary::<Int64Type>().keys().value(row)).ok()
        }
        DataType::UInt8 => Some(array.as_dictionary::<UInt8Type>().keys().value(row) as usize),
        DataType::UInt16 => Some(array.as_dictionary::<UInt16Type>().keys().value(row) as usize),
        DataType::UInt32 => {
            usize::try_from(array.as_dictionary::<UInt32Type>().keys().value(row)).ok()
        }
        DataType::UInt64 => {
            usize::try_from(array.as_dictionary::<UInt64Type>().keys().value(row)).ok()
        }
        other => {
            return Err(Error::Decode(format!("unsupported dictionary key type: {}", other)));
        }
    };
    key.ok_or_else(|| Error::Decode(format!("invalid dictionary key at row {}", row)))
}

fn duration_from_unit(raw: i64, unit: &TimeUnit) -> Result<chrono::Duration> {
    let duration = match unit {
        TimeUnit::Second => chrono::Duration::try_seconds(raw),
        TimeUnit::Millisecond => chrono::Duration::try_milliseconds(raw),
        TimeUnit::Microsecond => Some(chrono::Duration::microseconds(raw)),
        TimeUnit::Nanosecond => Some(chrono::Duration::nanoseconds(raw)),
    };
    duration.ok_or_else(|| Error::Decode(format!("duration {} out of range", raw)))
}

fn timestamp_from_unit(raw: i64, unit: &TimeUnit) -> Result<DateTime<FixedOffset>> {
    let utc = match unit {
        TimeUnit::Second => DateTime::from_timestamp(raw, 0),
        TimeUnit::Millisecond => DateTime::from_timestamp_millis(raw),
        TimeUnit::Microsecond => DateTime::from_timestamp_micros(raw),
        TimeUnit::Nanosecond => Some(DateTime::from_timestamp_nanos(raw)),
    };
    utc.map(|t| t.fixed_offset())
        .ok_or_else(|| Error::Decode(format!("timestamp {} out of range", raw)))
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            Value::Double(d) => write!(f, "{}", d),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Long(i) => write!(f, "{}", i),
            Value::UnsignedLong(u) => write!(f, "{}", u),
            Value::Duration(d) => write!(f, "{}ns", d.num_nanoseconds().unwrap_or(0)),
            Value::Binary(b) => write!(f, "<binary {} bytes>", b.len()),
            Value::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
            Value::Null => write!(f, "null"),
        }
    }
}
