use crate::messages::{
    MessageDeserializationError, MessageSerializationError, RtmpMessage, UserControlEventType,
};
use crate::time::RtmpTimestamp;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use std::io::Cursor;

const STREAM_BEGIN: u16 = 0;
const STREAM_EOF: u16 = 1;
const STREAM_DRY: u16 = 2;
const SET_BUFFER_LENGTH: u16 = 3;
const STREAM_IS_RECORDED: u16 = 4;
const PING_REQUEST: u16 = 6;
const PING_RESPONSE: u16 = 7;

pub fn serialize(
    event_type: UserControlEventType,
    stream_id: Option<u32>,
    buffer_length: Option<u32>,
    timestamp: Option<RtmpTimestamp>,
) -> Result<Bytes, MessageSerializationError> {
    let mut cursor = Cursor::new(Vec::new());

    match event_type {
        UserControlEventType::StreamBegin => {
            cursor.write_u16::<BigEndian>(STREAM_BEGIN)?;
            cursor.write_u32::<BigEndian>(stream_id.unwrap_or(0))?;
        }

        UserControlEventType::StreamEof => {
            cursor.write_u16::<BigEndian>(STREAM_EOF)?;
            cursor.write_u32::<BigEndian>(stream_id.unwrap_or(0))?;
        }

        UserControlEventType::StreamDry => {
            cursor.write_u16::<BigEndian>(STREAM_DRY)?;
            cursor.write_u32::<BigEndian>(stream_id.unwrap_or(0))?;
        }

        UserControlEventType::SetBufferLength => {
            cursor.write_u16::<BigEndian>(SET_BUFFER_LENGTH)?;
            cursor.write_u32::<BigEndian>(stream_id.unwrap_or(0))?;
            cursor.write_u32::<BigEndian>(buffer_length.unwrap_or(0))?;
        }

        UserControlEventType::StreamIsRecorded => {
            cursor.write_u16::<BigEndian>(STREAM_IS_RECORDED)?;
            cursor.write_u32::<BigEndian>(stream_id.unwrap_or(0))?;
        }

        UserControlEventType::PingRequest => {
            cursor.write_u16::<BigEndian>(PING_REQUEST)?;
            cursor.write_u32::<BigEndian>(timestamp.map(|t| t.value).unwrap_or(0))?;
        }

        UserControlEventType::PingResponse => {
            cursor.write_u16::<BigEndian>(PING_RESPONSE)?;
            cursor.write_u32::<BigEndian>(timestamp.map(|t| t.value).unwrap_or(0))?;
        }
    }

    Ok(Bytes::from(cursor.into_inner()))
}

pub fn deserialize(data: &[u8]) -> Result<RtmpMessage, MessageDeserializationError> {
    let mut cursor = Cursor::new(data);
    let event = cursor.read_u16::<BigEndian>()?;

    let mut stream_id = None;
    let mut buffer_length = None;
    let mut timestamp = None;

    let event_type = match event {
        STREAM_BEGIN => {
            stream_id = Some(cursor.read_u32::<BigEndian>()?);
            UserControlEventType::StreamBegin
        }

        STREAM_EOF => {
            stream_id = Some(cursor.read_u32::<BigEndian>()?);
            UserControlEventType::StreamEof
        }

        STREAM_DRY => {
            stream_id = Some(cursor.read_u32::<BigEndian>()?);
            UserControlEventType::StreamDry
        }

        SET_BUFFER_LENGTH => {
            stream_id = Some(cursor.read_u32::<BigEndian>()?);
            buffer_length = Some(cursor.read_u32::<BigEndian>()?);
            UserControlEventType::SetBufferLength
        }

        STREAM_IS_RECORDED => {
            stream_id = Some(cursor.read_u32::<BigEndian>()?);
            UserControlEventType::StreamIsRecorded
        }

        PING_REQUEST => {
            timestamp = Some(RtmpTimestamp::new(cursor.read_u32::<BigEndian>()?));
            UserControlEventType::PingRequest
        }

        PING_RESPONSE => {
            timestamp = Some(RtmpTimestamp::new(cursor.read_u32::<BigEndian>()?));
            UserControlEventType::PingResponse
        }

        event => return Err(MessageDeserializationError::InvalidUserControlEvent { event }),
    };

    Ok(RtmpMessage::UserControl {
        event_type,
        stream_id,
        buffer_length,
        timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_stream_begin() {
        let bytes = serialize(UserControlEventType::StreamBegin, Some(5), None, None).unwrap();
        assert_eq!(&bytes[..], &[0, 0, 0, 0, 0, 5]);

        let message = deserialize(&bytes[..]).unwrap();
        assert_eq!(
            message,
            RtmpMessage::UserControl {
                event_type: UserControlEventType::StreamBegin,
                stream_id: Some(5),
                buffer_length: None,
                timestamp: None,
            }
        );
    }

    #[test]
    fn round_trips_set_buffer_length() {
        let bytes = serialize(
            UserControlEventType::SetBufferLength,
            Some(1),
            Some(3000),
            None,
        )
        .unwrap();

        let message = deserialize(&bytes[..]).unwrap();
        assert_eq!(
            message,
            RtmpMessage::UserControl {
                event_type: UserControlEventType::SetBufferLength,
                stream_id: Some(1),
                buffer_length: Some(3000),
                timestamp: None,
            }
        );
    }

    #[test]
    fn round_trips_ping_request() {
        let bytes = serialize(
            UserControlEventType::PingRequest,
            None,
            None,
            Some(RtmpTimestamp::new(998877)),
        )
        .unwrap();

        let message = deserialize(&bytes[..]).unwrap();
        assert_eq!(
            message,
            RtmpMessage::UserControl {
                event_type: UserControlEventType::PingRequest,
                stream_id: None,
                buffer_length: None,
                timestamp: Some(RtmpTimestamp::new(998877)),
            }
        );
    }

    #[test]
    fn error_on_unknown_event_type() {
        match deserialize(&[0, 99, 0, 0, 0, 0]) {
            Err(MessageDeserializationError::InvalidUserControlEvent { event: 99 }) => (),
            x => panic!("Expected InvalidUserControlEvent, got {:?}", x.map(|_| ())),
        }
    }
}
