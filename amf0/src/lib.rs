//! This crate provides functionality for serializing and deserializing data
//! based on the Adobe AMF0 encoding specification located at
//! <https://wwwimages2.adobe.com/content/dam/acom/en/devnet/pdf/amf0-file-format-specification.pdf>
//!
//! Unlike a plain map based model, objects and ECMA arrays keep their
//! properties in insertion order and tolerate duplicate keys, since both occur
//! on the wire from real encoders.  Lookup by key returns the first match.
//!
//! # Examples
//! ```
//! use std::io::Cursor;
//! use sml_amf0::{Amf0Value, Amf0Object, serialize, deserialize};
//!
//! let mut command_object = Amf0Object::new();
//! command_object.set("app", Amf0Value::Utf8String("live".to_string()));
//! command_object.set("capabilities", Amf0Value::Number(31.0));
//!
//! let input = vec![
//!     Amf0Value::Utf8String("connect".to_string()),
//!     Amf0Value::Number(1.0),
//!     Amf0Value::Object(command_object),
//! ];
//!
//! let bytes = serialize(&input).unwrap();
//!
//! let mut cursor = Cursor::new(bytes);
//! let output = deserialize(&mut cursor).unwrap();
//! assert_eq!(input, output);
//! ```

mod deserialization;
mod errors;
mod human;
mod serialization;

pub use deserialization::{decode_first, deserialize};
pub use errors::{Amf0DeserializationError, Amf0SerializationError};
pub use human::human_print;
pub use serialization::{serialize, total_size};

/// An Enum representing the different supported types of Amf0 values
#[derive(PartialEq, Debug, Clone)]
pub enum Amf0Value {
    Number(f64),
    Boolean(bool),
    Utf8String(String),
    LongString(String),
    Object(Amf0Object),
    EcmaArray(Amf0Object),
    StrictArray(Vec<Amf0Value>),
    Date { unix_ms: f64, time_zone: i16 },
    Null,
    Undefined,
}

impl Amf0Value {
    pub fn get_number(self) -> Option<f64> {
        match self {
            Amf0Value::Number(value) => Some(value),
            _ => None,
        }
    }

    pub fn get_boolean(self) -> Option<bool> {
        match self {
            Amf0Value::Boolean(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the textual content for both the normal and the long string form
    pub fn get_string(self) -> Option<String> {
        match self {
            Amf0Value::Utf8String(value) => Some(value),
            Amf0Value::LongString(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the property list of an object or an ECMA array
    pub fn get_object_properties(self) -> Option<Amf0Object> {
        match self {
            Amf0Value::Object(properties) => Some(properties),
            Amf0Value::EcmaArray(properties) => Some(properties),
            _ => None,
        }
    }

    pub fn get_strict_array(self) -> Option<Vec<Amf0Value>> {
        match self {
            Amf0Value::StrictArray(values) => Some(values),
            _ => None,
        }
    }
}

/// An ordered collection of named Amf0 values, as used by the object and
/// ECMA array types.
///
/// Properties keep the order they were inserted (or decoded) in, and the same
/// key may appear more than once.  `get` returns the first property with a
/// matching key, positional access is available through `key_at`/`value_at`.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Amf0Object {
    properties: Vec<(String, Amf0Value)>,
}

impl Amf0Object {
    pub fn new() -> Amf0Object {
        Amf0Object {
            properties: Vec::new(),
        }
    }

    /// Appends a property.  No de-duplication is performed.
    pub fn set<K: Into<String>>(&mut self, key: K, value: Amf0Value) {
        self.properties.push((key.into(), value));
    }

    /// Returns the value of the first property with the given key
    pub fn get(&self, key: &str) -> Option<&Amf0Value> {
        self.properties
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    pub fn count(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn key_at(&self, index: usize) -> Option<&str> {
        self.properties.get(index).map(|(name, _)| name.as_str())
    }

    pub fn value_at(&self, index: usize) -> Option<&Amf0Value> {
        self.properties.get(index).map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Amf0Value)> {
        self.properties
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }
}

mod markers {
    pub const NUMBER_MARKER: u8 = 0x00;
    pub const BOOLEAN_MARKER: u8 = 0x01;
    pub const STRING_MARKER: u8 = 0x02;
    pub const OBJECT_MARKER: u8 = 0x03;
    pub const NULL_MARKER: u8 = 0x05;
    pub const UNDEFINED_MARKER: u8 = 0x06;
    pub const ECMA_ARRAY_MARKER: u8 = 0x08;
    pub const OBJECT_END_MARKER: u8 = 0x09;
    pub const STRICT_ARRAY_MARKER: u8 = 0x0a;
    pub const DATE_MARKER: u8 = 0x0b;
    pub const LONG_STRING_MARKER: u8 = 0x0c;
    pub const UTF_8_EMPTY_MARKER: u16 = 0;
}
