use crate::messages::{MessageDeserializationError, MessageSerializationError, RtmpMessage};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use std::io::Cursor;

pub fn serialize(sequence_number: u32) -> Result<Bytes, MessageSerializationError> {
    let mut cursor = Cursor::new(Vec::new());
    cursor.write_u32::<BigEndian>(sequence_number)?;

    Ok(Bytes::from(cursor.into_inner()))
}

pub fn deserialize(data: &[u8]) -> Result<RtmpMessage, MessageDeserializationError> {
    let mut cursor = Cursor::new(data);
    let sequence_number = cursor.read_u32::<BigEndian>()?;

    Ok(RtmpMessage::Acknowledgement { sequence_number })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_sequence_number() {
        let bytes = serialize(0x01020304).unwrap();
        assert_eq!(&bytes[..], &[1, 2, 3, 4]);

        let message = deserialize(&bytes[..]).unwrap();
        assert_eq!(
            message,
            RtmpMessage::Acknowledgement {
                sequence_number: 0x01020304
            }
        );
    }
}
