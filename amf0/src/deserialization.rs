//! This module contains functionality to deserialize values from bytes
//! that were encoded via the AMF0 specification
//! (http://wwwimages.adobe.com/content/dam/Adobe/en/devnet/amf/pdf/amf0-file-format-specification.pdf)

use crate::errors::Amf0DeserializationError;
use crate::markers;
use crate::{Amf0Object, Amf0Value};
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Cursor, Read};

/// Turns any readable byte stream into an array of AMF0 values, reading until
/// the end of the stream.
pub fn deserialize<R: Read>(bytes: &mut R) -> Result<Vec<Amf0Value>, Amf0DeserializationError> {
    let mut results = vec![];

    loop {
        match read_next_value(bytes)? {
            Some(x) => results.push(x),
            None => break,
        };
    }

    Ok(results)
}

/// Decodes a single AMF0 value from the front of the slice, returning the
/// value together with the number of bytes consumed.  Used by discovery paths
/// that walk concatenated values (e.g. script payloads) one at a time.
pub fn decode_first(bytes: &[u8]) -> Result<(Amf0Value, usize), Amf0DeserializationError> {
    let mut cursor = Cursor::new(bytes);
    match read_next_value(&mut cursor)? {
        Some(value) => Ok((value, cursor.position() as usize)),
        None => Err(Amf0DeserializationError::UnexpectedEof),
    }
}

fn read_next_value<R: Read>(
    bytes: &mut R,
) -> Result<Option<Amf0Value>, Amf0DeserializationError> {
    let mut buffer: [u8; 1] = [0];
    let bytes_read = bytes.read(&mut buffer)?;

    if bytes_read == 0 {
        return Ok(None);
    }

    match buffer[0] {
        markers::NUMBER_MARKER => parse_number(bytes).map(Some),
        markers::BOOLEAN_MARKER => parse_bool(bytes).map(Some),
        markers::STRING_MARKER => parse_string(bytes).map(Some),
        markers::LONG_STRING_MARKER => parse_long_string(bytes).map(Some),
        markers::OBJECT_MARKER => parse_object(bytes).map(Some),
        markers::ECMA_ARRAY_MARKER => parse_ecma_array(bytes).map(Some),
        markers::STRICT_ARRAY_MARKER => parse_strict_array(bytes).map(Some),
        markers::DATE_MARKER => parse_date(bytes).map(Some),
        markers::NULL_MARKER => Ok(Some(Amf0Value::Null)),
        markers::UNDEFINED_MARKER => Ok(Some(Amf0Value::Undefined)),
        markers::OBJECT_END_MARKER => Err(Amf0DeserializationError::UnexpectedObjectEndMarker),
        marker => Err(Amf0DeserializationError::UnknownMarker { marker }),
    }
}

fn parse_number<R: Read>(bytes: &mut R) -> Result<Amf0Value, Amf0DeserializationError> {
    let number = bytes.read_f64::<BigEndian>()?;
    Ok(Amf0Value::Number(number))
}

fn parse_bool<R: Read>(bytes: &mut R) -> Result<Amf0Value, Amf0DeserializationError> {
    let value = bytes.read_u8()?;
    Ok(Amf0Value::Boolean(value != 0))
}

fn read_raw_string<R: Read>(
    bytes: &mut R,
    length: usize,
) -> Result<String, Amf0DeserializationError> {
    let mut buffer = vec![0_u8; length];
    bytes.read_exact(&mut buffer)?;

    let value = String::from_utf8(buffer)?;
    Ok(value)
}

fn parse_string<R: Read>(bytes: &mut R) -> Result<Amf0Value, Amf0DeserializationError> {
    let length = bytes.read_u16::<BigEndian>()?;
    let value = read_raw_string(bytes, length as usize)?;
    Ok(Amf0Value::Utf8String(value))
}

fn parse_long_string<R: Read>(bytes: &mut R) -> Result<Amf0Value, Amf0DeserializationError> {
    let length = bytes.read_u32::<BigEndian>()?;
    let value = read_raw_string(bytes, length as usize)?;
    Ok(Amf0Value::LongString(value))
}

fn parse_date<R: Read>(bytes: &mut R) -> Result<Amf0Value, Amf0DeserializationError> {
    let unix_ms = bytes.read_f64::<BigEndian>()?;
    let time_zone = bytes.read_i16::<BigEndian>()?;
    Ok(Amf0Value::Date { unix_ms, time_zone })
}

fn parse_properties<R: Read>(bytes: &mut R) -> Result<Amf0Object, Amf0DeserializationError> {
    let mut properties = Amf0Object::new();

    loop {
        let label_length = bytes.read_u16::<BigEndian>()?;
        if label_length == 0 {
            // Empty label must be followed by the end of object marker.  It
            // has to be consumed so the current position progresses past it.
            let marker = bytes.read_u8()?;
            if marker != markers::OBJECT_END_MARKER {
                return Err(Amf0DeserializationError::UnexpectedEmptyObjectPropertyName);
            }

            break;
        }

        let label = read_raw_string(bytes, label_length as usize)?;
        match read_next_value(bytes)? {
            Some(value) => properties.set(label, value),
            None => return Err(Amf0DeserializationError::UnexpectedEof),
        }
    }

    Ok(properties)
}

fn parse_object<R: Read>(bytes: &mut R) -> Result<Amf0Value, Amf0DeserializationError> {
    let properties = parse_properties(bytes)?;
    Ok(Amf0Value::Object(properties))
}

fn parse_ecma_array<R: Read>(bytes: &mut R) -> Result<Amf0Value, Amf0DeserializationError> {
    // The declared count is advisory only.  Real encoders disagree on it, but
    // they all terminate the body with the empty-key/end-marker sequence, so
    // termination is driven by that and the count is discarded.
    let _declared_count = bytes.read_u32::<BigEndian>()?;
    let properties = parse_properties(bytes)?;
    Ok(Amf0Value::EcmaArray(properties))
}

fn parse_strict_array<R: Read>(bytes: &mut R) -> Result<Amf0Value, Amf0DeserializationError> {
    let count = bytes.read_u32::<BigEndian>()?;
    let mut values = Vec::new();

    for _ in 0..count {
        match read_next_value(bytes)? {
            Some(value) => values.push(value),
            None => return Err(Amf0DeserializationError::UnexpectedEof),
        }
    }

    Ok(Amf0Value::StrictArray(values))
}
