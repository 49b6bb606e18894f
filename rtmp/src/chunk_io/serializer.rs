use super::chunk_header::{ChunkHeader, ChunkHeaderFormat};
use super::{ChunkSerializationError, INITIAL_CHUNK_SIZE, MAX_CHUNK_SIZE};
use crate::messages::{type_ids, MessagePayload, RtmpMessage};
use crate::time::RtmpTimestamp;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::cmp::min;
use std::collections::HashMap;

const MAX_24_BIT_TIMESTAMP: u32 = 0xffffff;
const MAX_MESSAGE_LENGTH: usize = 0xffffff;

/// Serializes RTMP messages into RTMP chunks.
///
/// Header compression relies on what was previously sent per chunk stream id,
/// so the same serializer instance must handle every outbound message of a
/// connection.
pub struct ChunkSerializer {
    previous_headers: HashMap<u32, ChunkHeader>,
    max_chunk_size: u32,
}

impl ChunkSerializer {
    pub fn new() -> ChunkSerializer {
        ChunkSerializer {
            previous_headers: HashMap::new(),
            max_chunk_size: INITIAL_CHUNK_SIZE,
        }
    }

    /// Announces a new outbound chunk size.  Returns the bytes of the
    /// `SetChunkSize` protocol message, already chunked; they must be sent to
    /// the peer before any message serialized with the new size.
    pub fn set_max_chunk_size(
        &mut self,
        new_size: u32,
        time: RtmpTimestamp,
    ) -> Result<Vec<u8>, ChunkSerializationError> {
        if new_size > MAX_CHUNK_SIZE {
            return Err(ChunkSerializationError::ChunkSizeTooLarge { size: new_size });
        }

        let message = RtmpMessage::SetChunkSize { size: new_size };
        let payload = MessagePayload::from_rtmp_message(message, time, 0)?;
        let bytes = self.serialize(&payload, true)?;

        self.max_chunk_size = new_size;
        Ok(bytes)
    }

    /// Turns one message into one or more chunks.
    ///
    /// `force_uncompressed` always emits a Type 0 header, used right after
    /// events that may have invalidated the peer's decompression state.
    pub fn serialize(
        &mut self,
        message: &MessagePayload,
        force_uncompressed: bool,
    ) -> Result<Vec<u8>, ChunkSerializationError> {
        if message.data.len() > MAX_MESSAGE_LENGTH {
            return Err(ChunkSerializationError::MessageTooLong {
                size: message.data.len(),
            });
        }

        let csid = csid_for_message_type(message.type_id);

        let mut header = ChunkHeader {
            chunk_stream_id: csid,
            timestamp: message.timestamp,
            timestamp_field: message.timestamp.value,
            message_length: message.data.len() as u32,
            message_type_id: message.type_id,
            message_stream_id: message.message_stream_id,
        };

        let format = if force_uncompressed {
            ChunkHeaderFormat::Full
        } else {
            match self.previous_headers.get(&csid) {
                None => ChunkHeaderFormat::Full,
                Some(previous) => {
                    let delta = (message.timestamp - previous.timestamp).value;
                    header.timestamp_field = delta;
                    header_format(&header, previous)
                }
            }
        };

        if format == ChunkHeaderFormat::Full {
            header.timestamp_field = message.timestamp.value;
        }

        let mut bytes = Vec::with_capacity(message.data.len() + 16);

        // first chunk carries the selected header, the rest of the payload
        // goes out in Type 3 continuations
        let first_chunk_length = min(self.max_chunk_size as usize, message.data.len());
        write_basic_header(&mut bytes, format, csid);
        write_message_header(&mut bytes, format, &header);
        bytes.extend_from_slice(&message.data[..first_chunk_length]);

        let mut position = first_chunk_length;
        while position < message.data.len() {
            let chunk_length = min(self.max_chunk_size as usize, message.data.len() - position);
            write_basic_header(&mut bytes, ChunkHeaderFormat::Empty, csid);
            bytes.extend_from_slice(&message.data[position..position + chunk_length]);
            position += chunk_length;
        }

        self.previous_headers.insert(csid, header);
        Ok(bytes)
    }
}

/// Spreads message classes over chunk streams so repeated traffic of one kind
/// can use header compression: 2 for protocol control, 3 for commands and
/// data, 4 for video, 5 for audio.
fn csid_for_message_type(message_type_id: u8) -> u32 {
    match message_type_id {
        type_ids::SET_CHUNK_SIZE
        | type_ids::ABORT
        | type_ids::ACKNOWLEDGEMENT
        | type_ids::USER_CONTROL
        | type_ids::WINDOW_ACKNOWLEDGEMENT_SIZE
        | type_ids::SET_PEER_BANDWIDTH => 2,
        type_ids::AMF3_DATA
        | type_ids::AMF3_COMMAND
        | type_ids::AMF0_DATA
        | type_ids::SHARED_OBJECT
        | type_ids::AMF0_COMMAND => 3,
        type_ids::VIDEO => 4,
        type_ids::AUDIO => 5,
        _ => 6,
    }
}

fn header_format(current: &ChunkHeader, previous: &ChunkHeader) -> ChunkHeaderFormat {
    if current.message_stream_id != previous.message_stream_id {
        return ChunkHeaderFormat::Full;
    }

    if current.message_type_id != previous.message_type_id
        || current.message_length != previous.message_length
    {
        return ChunkHeaderFormat::TimeDeltaWithoutMessageStreamId;
    }

    if current.timestamp_field != previous.timestamp_field {
        return ChunkHeaderFormat::TimeDeltaOnly;
    }

    ChunkHeaderFormat::Empty
}

fn write_basic_header(bytes: &mut Vec<u8>, format: ChunkHeaderFormat, csid: u32) {
    let format_mask = match format {
        ChunkHeaderFormat::Full => 0b0000_0000,
        ChunkHeaderFormat::TimeDeltaWithoutMessageStreamId => 0b0100_0000,
        ChunkHeaderFormat::TimeDeltaOnly => 0b1000_0000,
        ChunkHeaderFormat::Empty => 0b1100_0000,
    };

    match csid {
        2..=63 => bytes.push(format_mask | csid as u8),
        64..=319 => {
            bytes.push(format_mask);
            bytes.push((csid - 64) as u8);
        }
        _ => {
            bytes.push(format_mask | 1);
            let reduced = csid - 64;
            bytes.push((reduced & 0xff) as u8);
            bytes.push((reduced >> 8) as u8);
        }
    }
}

fn write_message_header(bytes: &mut Vec<u8>, format: ChunkHeaderFormat, header: &ChunkHeader) {
    if format == ChunkHeaderFormat::Empty {
        return;
    }

    let mut field = [0_u8; 3];
    BigEndian::write_u24(&mut field, min(header.timestamp_field, MAX_24_BIT_TIMESTAMP));
    bytes.extend_from_slice(&field);

    if format != ChunkHeaderFormat::TimeDeltaOnly {
        let mut length_and_type = [0_u8; 4];
        BigEndian::write_u24(&mut length_and_type, header.message_length);
        length_and_type[3] = header.message_type_id;
        bytes.extend_from_slice(&length_and_type);
    }

    if format == ChunkHeaderFormat::Full {
        let mut stream_id = [0_u8; 4];
        LittleEndian::write_u32(&mut stream_id, header.message_stream_id);
        bytes.extend_from_slice(&stream_id);
    }

    if header.timestamp_field >= MAX_24_BIT_TIMESTAMP {
        let mut extended = [0_u8; 4];
        BigEndian::write_u32(&mut extended, header.timestamp_field);
        bytes.extend_from_slice(&extended);
    }
}
