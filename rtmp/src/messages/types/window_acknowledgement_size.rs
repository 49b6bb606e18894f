use crate::messages::{MessageDeserializationError, MessageSerializationError, RtmpMessage};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use std::io::Cursor;

pub fn serialize(size: u32) -> Result<Bytes, MessageSerializationError> {
    let mut cursor = Cursor::new(Vec::new());
    cursor.write_u32::<BigEndian>(size)?;

    Ok(Bytes::from(cursor.into_inner()))
}

pub fn deserialize(data: &[u8]) -> Result<RtmpMessage, MessageDeserializationError> {
    let mut cursor = Cursor::new(data);
    let size = cursor.read_u32::<BigEndian>()?;

    Ok(RtmpMessage::WindowAcknowledgement { size })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_window_size() {
        let bytes = serialize(2_500_000).unwrap();
        let message = deserialize(&bytes[..]).unwrap();

        assert_eq!(message, RtmpMessage::WindowAcknowledgement { size: 2_500_000 });
    }
}
