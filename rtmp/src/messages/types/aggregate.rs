//! Aggregate messages (type 22) hold a run of FLV-tag shaped sub-records.
//! The payload is opaque at this layer; the session splits it apart.

use crate::messages::{MessageDeserializationError, MessageSerializationError, RtmpMessage};
use bytes::Bytes;

pub fn serialize(data: Bytes) -> Result<Bytes, MessageSerializationError> {
    Ok(data)
}

pub fn deserialize(data: Bytes) -> Result<RtmpMessage, MessageDeserializationError> {
    Ok(RtmpMessage::Aggregate { data })
}
