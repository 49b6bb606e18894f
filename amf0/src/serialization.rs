//! Module containing functionality for serializing values into bytes
//! based on the AMF0 specification
//! (http://wwwimages.adobe.com/content/dam/Adobe/en/devnet/amf/pdf/amf0-file-format-specification.pdf)

use crate::errors::Amf0SerializationError;
use crate::markers;
use crate::{Amf0Object, Amf0Value};
use byteorder::{BigEndian, WriteBytesExt};

/// Serializes values into an amf0 encoded vector of bytes
pub fn serialize(values: &[Amf0Value]) -> Result<Vec<u8>, Amf0SerializationError> {
    let mut bytes = Vec::new();
    for value in values {
        serialize_value(value, &mut bytes)?;
    }

    Ok(bytes)
}

/// Computes the exact number of bytes `serialize` would produce for a single
/// value, without materializing them.
pub fn total_size(value: &Amf0Value) -> usize {
    match value {
        Amf0Value::Number(_) => 1 + 8,
        Amf0Value::Boolean(_) => 1 + 1,
        Amf0Value::Utf8String(text) => 1 + 2 + text.len(),
        Amf0Value::LongString(text) => 1 + 4 + text.len(),
        Amf0Value::Null => 1,
        Amf0Value::Undefined => 1,
        Amf0Value::Date { .. } => 1 + 8 + 2,
        Amf0Value::Object(properties) => 1 + properties_size(properties),
        Amf0Value::EcmaArray(properties) => 1 + 4 + properties_size(properties),
        Amf0Value::StrictArray(values) => {
            1 + 4 + values.iter().map(total_size).sum::<usize>()
        }
    }
}

fn properties_size(properties: &Amf0Object) -> usize {
    let body: usize = properties
        .iter()
        .map(|(key, value)| 2 + key.len() + total_size(value))
        .sum();

    // trailing empty key + object end marker
    body + 2 + 1
}

fn serialize_value(value: &Amf0Value, bytes: &mut Vec<u8>) -> Result<(), Amf0SerializationError> {
    match value {
        Amf0Value::Boolean(val) => Ok(serialize_bool(*val, bytes)),
        Amf0Value::Null => Ok(serialize_null(bytes)),
        Amf0Value::Undefined => Ok(serialize_undefined(bytes)),
        Amf0Value::Number(val) => serialize_number(*val, bytes),
        Amf0Value::Utf8String(val) => serialize_string(val, bytes),
        Amf0Value::LongString(val) => serialize_long_string(val, bytes),
        Amf0Value::Object(val) => serialize_object(val, bytes),
        Amf0Value::EcmaArray(val) => serialize_ecma_array(val, bytes),
        Amf0Value::StrictArray(val) => serialize_strict_array(val, bytes),
        Amf0Value::Date { unix_ms, time_zone } => serialize_date(*unix_ms, *time_zone, bytes),
    }
}

fn serialize_number(value: f64, bytes: &mut Vec<u8>) -> Result<(), Amf0SerializationError> {
    bytes.push(markers::NUMBER_MARKER);
    bytes.write_f64::<BigEndian>(value)?;
    Ok(())
}

fn serialize_bool(value: bool, bytes: &mut Vec<u8>) {
    bytes.push(markers::BOOLEAN_MARKER);
    bytes.push(value as u8);
}

fn serialize_string(value: &str, bytes: &mut Vec<u8>) -> Result<(), Amf0SerializationError> {
    if value.len() > (u16::max_value() as usize) {
        return Err(Amf0SerializationError::NormalStringTooLong);
    }

    bytes.push(markers::STRING_MARKER);
    bytes.write_u16::<BigEndian>(value.len() as u16)?;
    bytes.extend(value.as_bytes());
    Ok(())
}

fn serialize_long_string(value: &str, bytes: &mut Vec<u8>) -> Result<(), Amf0SerializationError> {
    bytes.push(markers::LONG_STRING_MARKER);
    bytes.write_u32::<BigEndian>(value.len() as u32)?;
    bytes.extend(value.as_bytes());
    Ok(())
}

fn serialize_null(bytes: &mut Vec<u8>) {
    bytes.push(markers::NULL_MARKER);
}

fn serialize_undefined(bytes: &mut Vec<u8>) {
    bytes.push(markers::UNDEFINED_MARKER);
}

fn serialize_date(
    unix_ms: f64,
    time_zone: i16,
    bytes: &mut Vec<u8>,
) -> Result<(), Amf0SerializationError> {
    bytes.push(markers::DATE_MARKER);
    bytes.write_f64::<BigEndian>(unix_ms)?;
    bytes.write_i16::<BigEndian>(time_zone)?;
    Ok(())
}

fn serialize_properties(
    properties: &Amf0Object,
    bytes: &mut Vec<u8>,
) -> Result<(), Amf0SerializationError> {
    for (name, value) in properties.iter() {
        if name.len() > (u16::max_value() as usize) {
            return Err(Amf0SerializationError::PropertyNameTooLong);
        }

        bytes.write_u16::<BigEndian>(name.len() as u16)?;
        bytes.extend(name.as_bytes());
        serialize_value(value, bytes)?;
    }

    bytes.write_u16::<BigEndian>(markers::UTF_8_EMPTY_MARKER)?;
    bytes.push(markers::OBJECT_END_MARKER);
    Ok(())
}

fn serialize_object(
    properties: &Amf0Object,
    bytes: &mut Vec<u8>,
) -> Result<(), Amf0SerializationError> {
    bytes.push(markers::OBJECT_MARKER);
    serialize_properties(properties, bytes)
}

fn serialize_ecma_array(
    properties: &Amf0Object,
    bytes: &mut Vec<u8>,
) -> Result<(), Amf0SerializationError> {
    bytes.push(markers::ECMA_ARRAY_MARKER);
    bytes.write_u32::<BigEndian>(properties.count() as u32)?;
    serialize_properties(properties, bytes)
}

fn serialize_strict_array(
    array: &[Amf0Value],
    bytes: &mut Vec<u8>,
) -> Result<(), Amf0SerializationError> {
    bytes.push(markers::STRICT_ARRAY_MARKER);
    bytes.write_u32::<BigEndian>(array.len() as u32)?;

    for value in array {
        serialize_value(value, bytes)?;
    }

    Ok(())
}
