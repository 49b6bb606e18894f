use crate::messages::{MessageDeserializationError, MessageSerializationError, RtmpMessage};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use std::io::Cursor;

pub fn serialize(size: u32) -> Result<Bytes, MessageSerializationError> {
    let mut cursor = Cursor::new(Vec::new());

    // The most significant bit must be zero on the wire.
    cursor.write_u32::<BigEndian>(size & 0x7fffffff)?;

    Ok(Bytes::from(cursor.into_inner()))
}

pub fn deserialize(data: &[u8]) -> Result<RtmpMessage, MessageDeserializationError> {
    let mut cursor = Cursor::new(data);
    let size = cursor.read_u32::<BigEndian>()? & 0x7fffffff;

    Ok(RtmpMessage::SetChunkSize { size })
}
