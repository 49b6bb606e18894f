use super::{ChunkDeserializationError, INITIAL_CHUNK_SIZE};
use crate::messages::MessagePayload;
use crate::time::RtmpTimestamp;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use bytes::{BufMut, Bytes, BytesMut};
use std::collections::HashMap;

const MAX_24_BIT_TIMESTAMP: u32 = 0xffffff;

/// Reassembles RTMP messages out of a chunk stream.
///
/// Every byte received from the peer must pass through the same deserializer
/// instance, since compressed chunk headers borrow fields from earlier chunks
/// on the same chunk stream id.
///
/// `get_next_message` buffers internally: call it with freshly received bytes,
/// then keep calling it with an empty slice until it returns `None`, because a
/// single read from the network may contain several complete messages.
pub struct ChunkDeserializer {
    buffer: BytesMut,
    max_chunk_size: usize,
    streams: HashMap<u32, ChunkStreamState>,
}

/// Decompression state for one chunk stream id
struct ChunkStreamState {
    timestamp: u32,
    /// Raw value of the last timestamp field: absolute for Type 0, delta
    /// otherwise.  A Type 3 chunk that begins a new message re-applies it.
    timestamp_field: u32,
    message_length: u32,
    message_type_id: u8,
    message_stream_id: u32,
    partial: BytesMut,
}

enum ParseOutcome {
    NeedMoreBytes,
    ChunkConsumed,
    Message(MessagePayload),
}

struct ParsedHeader {
    format: u8,
    csid: u32,
    header_length: usize,
    timestamp_field: Option<u32>,
    message_length: Option<u32>,
    message_type_id: Option<u8>,
    message_stream_id: Option<u32>,
}

impl ChunkDeserializer {
    pub fn new() -> ChunkDeserializer {
        ChunkDeserializer {
            buffer: BytesMut::with_capacity(4096),
            max_chunk_size: INITIAL_CHUNK_SIZE as usize,
            streams: HashMap::new(),
        }
    }

    /// Tells the deserializer the peer announced a new chunk size.  Should be
    /// called in direct response to a `SetChunkSize` message, before the next
    /// `get_next_message` call.
    pub fn set_max_chunk_size(&mut self, new_size: usize) -> Result<(), ChunkDeserializationError> {
        if new_size == 0 || new_size > 0x7fffffff {
            return Err(ChunkDeserializationError::InvalidMaxChunkSize { size: new_size });
        }

        self.max_chunk_size = new_size;
        Ok(())
    }

    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    /// Appends `bytes` to the internal buffer and attempts to complete the
    /// next message.  Returns `Ok(None)` when more bytes are required.
    pub fn get_next_message(
        &mut self,
        bytes: &[u8],
    ) -> Result<Option<MessagePayload>, ChunkDeserializationError> {
        self.buffer.extend_from_slice(bytes);

        loop {
            match self.parse_next_chunk()? {
                ParseOutcome::NeedMoreBytes => return Ok(None),
                ParseOutcome::ChunkConsumed => continue,
                ParseOutcome::Message(payload) => return Ok(Some(payload)),
            }
        }
    }

    /// Attempts to consume exactly one chunk from the front of the buffer.
    /// Nothing is consumed until the whole chunk (header and payload portion)
    /// has arrived.
    fn parse_next_chunk(&mut self) -> Result<ParseOutcome, ChunkDeserializationError> {
        let header = match parse_header(&self.buffer[..])? {
            Some(header) => header,
            None => return Ok(ParseOutcome::NeedMoreBytes),
        };

        if !self.streams.contains_key(&header.csid) {
            if header.format != 0 {
                return Err(ChunkDeserializationError::NoPreviousChunkOnStream {
                    csid: header.csid,
                });
            }

            self.streams.insert(
                header.csid,
                ChunkStreamState {
                    timestamp: 0,
                    timestamp_field: 0,
                    message_length: 0,
                    message_type_id: 0,
                    message_stream_id: 0,
                    partial: BytesMut::new(),
                },
            );
        }

        let state = match self.streams.get_mut(&header.csid) {
            Some(state) => state,
            None => unreachable!("state was inserted above"),
        };

        // A message in flight can only be continued by Type 3 chunks.
        if header.format != 3 && !state.partial.is_empty() {
            return Err(ChunkDeserializationError::InconsistentReassembly { csid: header.csid });
        }

        // Wait for the whole chunk before mutating any state, otherwise a
        // partially arrived chunk would apply its timestamp delta twice.
        let message_length = header.message_length.unwrap_or(state.message_length) as usize;
        let bytes_remaining = message_length - state.partial.len();
        let payload_length = bytes_remaining.min(self.max_chunk_size);
        let chunk_length = header.header_length + payload_length;

        if self.buffer.len() < chunk_length {
            return Ok(ParseOutcome::NeedMoreBytes);
        }

        let starting_new_message = state.partial.is_empty();
        match header.format {
            0 => {
                let field = header.timestamp_field.unwrap_or(0);
                state.timestamp = field;
                state.timestamp_field = field;
                state.message_length = header.message_length.unwrap_or(0);
                state.message_type_id = header.message_type_id.unwrap_or(0);
                state.message_stream_id = header.message_stream_id.unwrap_or(0);
            }

            1 => {
                let field = header.timestamp_field.unwrap_or(0);
                state.timestamp = state.timestamp.wrapping_add(field);
                state.timestamp_field = field;
                state.message_length = header.message_length.unwrap_or(0);
                state.message_type_id = header.message_type_id.unwrap_or(0);
            }

            2 => {
                let field = header.timestamp_field.unwrap_or(0);
                state.timestamp = state.timestamp.wrapping_add(field);
                state.timestamp_field = field;
            }

            _ => {
                // A Type 3 chunk either continues the current message (no
                // timestamp change) or starts a new message with every field
                // repeated, including the last timestamp field.
                if starting_new_message {
                    state.timestamp = state.timestamp.wrapping_add(state.timestamp_field);
                }
            }
        }

        let chunk = self.buffer.split_to(chunk_length);
        state
            .partial
            .put_slice(&chunk[header.header_length..chunk_length]);

        if state.partial.len() < state.message_length as usize {
            return Ok(ParseOutcome::ChunkConsumed);
        }

        let data: Bytes = state.partial.split().freeze();
        Ok(ParseOutcome::Message(MessagePayload {
            timestamp: RtmpTimestamp::new(state.timestamp),
            type_id: state.message_type_id,
            message_stream_id: state.message_stream_id,
            data,
        }))
    }
}

/// Decodes the basic header, message header and optional extended timestamp
/// from the front of `buffer` without consuming anything.  Returns `None`
/// when the buffer does not yet hold the whole header.
fn parse_header(buffer: &[u8]) -> Result<Option<ParsedHeader>, ChunkDeserializationError> {
    if buffer.is_empty() {
        return Ok(None);
    }

    let format = buffer[0] >> 6;
    let (csid, basic_length) = match buffer[0] & 0b0011_1111 {
        0 => {
            if buffer.len() < 2 {
                return Ok(None);
            }
            (64 + buffer[1] as u32, 2)
        }
        1 => {
            if buffer.len() < 3 {
                return Ok(None);
            }
            (64 + buffer[1] as u32 + buffer[2] as u32 * 256, 3)
        }
        id => (id as u32, 1),
    };

    let message_header_length = match format {
        0 => 11,
        1 => 7,
        2 => 3,
        _ => 0,
    };

    if buffer.len() < basic_length + message_header_length {
        return Ok(None);
    }

    let mut header = ParsedHeader {
        format,
        csid,
        header_length: basic_length + message_header_length,
        timestamp_field: None,
        message_length: None,
        message_type_id: None,
        message_stream_id: None,
    };

    if format == 3 {
        // No message header.  The extended timestamp field is never expected
        // on continuations, matching the serializer.
        return Ok(Some(header));
    }

    let fields = &buffer[basic_length..];
    let mut timestamp_field = BigEndian::read_u24(&fields[0..3]);

    if format <= 1 {
        header.message_length = Some(BigEndian::read_u24(&fields[3..6]));
        header.message_type_id = Some(fields[6]);
    }

    if format == 0 {
        header.message_stream_id = Some(LittleEndian::read_u32(&fields[7..11]));
    }

    if timestamp_field == MAX_24_BIT_TIMESTAMP {
        if buffer.len() < header.header_length + 4 {
            return Ok(None);
        }

        timestamp_field = BigEndian::read_u32(&buffer[header.header_length..header.header_length + 4]);
        header.header_length += 4;
    }

    header.timestamp_field = Some(timestamp_field);
    Ok(Some(header))
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;
    use std::io::Write;

    fn type0_chunk(csid: u8, timestamp: u32, type_id: u8, stream_id: u32, data: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.write_u8(csid).unwrap();
        bytes.write_u24::<BigEndian>(timestamp).unwrap();
        bytes.write_u24::<BigEndian>(data.len() as u32).unwrap();
        bytes.write_u8(type_id).unwrap();
        bytes.write_u32::<LittleEndian>(stream_id).unwrap();
        bytes.write_all(data).unwrap();
        bytes
    }

    #[test]
    fn can_parse_type_0_chunk() {
        let bytes = type0_chunk(3, 72, 20, 1, &[1, 2, 3]);

        let mut deserializer = ChunkDeserializer::new();
        let message = deserializer.get_next_message(&bytes).unwrap().unwrap();

        assert_eq!(message.timestamp, RtmpTimestamp::new(72));
        assert_eq!(message.type_id, 20);
        assert_eq!(message.message_stream_id, 1);
        assert_eq!(&message.data[..], &[1, 2, 3]);
    }

    #[test]
    fn partial_chunks_wait_for_more_bytes() {
        let bytes = type0_chunk(3, 72, 20, 1, &[1, 2, 3]);

        let mut deserializer = ChunkDeserializer::new();
        assert_eq!(
            deserializer.get_next_message(&bytes[..5]).unwrap(),
            None,
            "Incomplete chunk must not produce a message"
        );

        let message = deserializer.get_next_message(&bytes[5..]).unwrap().unwrap();
        assert_eq!(&message.data[..], &[1, 2, 3]);
    }

    #[test]
    fn type_1_chunk_applies_delta_and_new_length() {
        let mut bytes = type0_chunk(3, 100, 20, 1, &[1, 2, 3]);

        // type 1: delta 25, length 2, type 21
        bytes.write_u8(3 | 0b0100_0000).unwrap();
        bytes.write_u24::<BigEndian>(25).unwrap();
        bytes.write_u24::<BigEndian>(2).unwrap();
        bytes.write_u8(21).unwrap();
        bytes.write_all(&[9, 8]).unwrap();

        let mut deserializer = ChunkDeserializer::new();
        let first = deserializer.get_next_message(&bytes).unwrap().unwrap();
        let second = deserializer.get_next_message(&[]).unwrap().unwrap();

        assert_eq!(first.timestamp, RtmpTimestamp::new(100));
        assert_eq!(second.timestamp, RtmpTimestamp::new(125));
        assert_eq!(second.type_id, 21);
        assert_eq!(second.message_stream_id, 1, "Stream id carries over");
        assert_eq!(&second.data[..], &[9, 8]);
    }

    #[test]
    fn type_2_chunk_reuses_length_and_type() {
        let mut bytes = type0_chunk(3, 100, 20, 1, &[1, 2, 3]);

        bytes.write_u8(3 | 0b1000_0000).unwrap();
        bytes.write_u24::<BigEndian>(10).unwrap();
        bytes.write_all(&[4, 5, 6]).unwrap();

        let mut deserializer = ChunkDeserializer::new();
        let _ = deserializer.get_next_message(&bytes).unwrap().unwrap();
        let second = deserializer.get_next_message(&[]).unwrap().unwrap();

        assert_eq!(second.timestamp, RtmpTimestamp::new(110));
        assert_eq!(second.type_id, 20);
        assert_eq!(&second.data[..], &[4, 5, 6]);
    }

    #[test]
    fn type_3_chunk_starting_new_message_reapplies_delta() {
        let mut bytes = type0_chunk(3, 100, 20, 1, &[1, 2, 3]);

        // delta 10 via type 2
        bytes.write_u8(3 | 0b1000_0000).unwrap();
        bytes.write_u24::<BigEndian>(10).unwrap();
        bytes.write_all(&[4, 5, 6]).unwrap();

        // type 3, full message repeat: timestamp advances by the same delta
        bytes.write_u8(3 | 0b1100_0000).unwrap();
        bytes.write_all(&[7, 8, 9]).unwrap();

        let mut deserializer = ChunkDeserializer::new();
        let _ = deserializer.get_next_message(&bytes).unwrap().unwrap();
        let _ = deserializer.get_next_message(&[]).unwrap().unwrap();
        let third = deserializer.get_next_message(&[]).unwrap().unwrap();

        assert_eq!(third.timestamp, RtmpTimestamp::new(120));
        assert_eq!(&third.data[..], &[7, 8, 9]);
    }

    #[test]
    fn message_split_across_chunks_is_reassembled() {
        let body: Vec<u8> = (0..200_u32).map(|x| x as u8).collect();

        let mut bytes = Vec::new();
        bytes.write_u8(4).unwrap();
        bytes.write_u24::<BigEndian>(0).unwrap();
        bytes.write_u24::<BigEndian>(200).unwrap();
        bytes.write_u8(9).unwrap();
        bytes.write_u32::<LittleEndian>(1).unwrap();
        bytes.write_all(&body[..128]).unwrap();
        bytes.write_u8(4 | 0b1100_0000).unwrap();
        bytes.write_all(&body[128..]).unwrap();

        let mut deserializer = ChunkDeserializer::new();
        let message = deserializer.get_next_message(&bytes).unwrap().unwrap();

        assert_eq!(message.data.len(), 200);
        assert_eq!(&message.data[..], &body[..]);
        assert_eq!(
            message.timestamp,
            RtmpTimestamp::new(0),
            "Continuation chunks must not advance the timestamp"
        );
    }

    #[test]
    fn reassembles_4096_byte_message_from_32_chunks() {
        let body: Vec<u8> = (0..4096_u32).map(|x| x as u8).collect();

        let mut bytes = Vec::new();
        bytes.write_u8(4).unwrap();
        bytes.write_u24::<BigEndian>(0).unwrap();
        bytes.write_u24::<BigEndian>(4096).unwrap();
        bytes.write_u8(9).unwrap();
        bytes.write_u32::<LittleEndian>(1).unwrap();
        bytes.write_all(&body[..128]).unwrap();
        for i in 1..32 {
            bytes.write_u8(4 | 0b1100_0000).unwrap();
            bytes.write_all(&body[i * 128..(i + 1) * 128]).unwrap();
        }

        let mut deserializer = ChunkDeserializer::new();
        let message = deserializer.get_next_message(&bytes).unwrap().unwrap();

        assert_eq!(&message.data[..], &body[..]);
    }

    #[test]
    fn extended_timestamp_is_read_when_field_saturates() {
        let mut bytes = Vec::new();
        bytes.write_u8(3).unwrap();
        bytes.write_u24::<BigEndian>(0xffffff).unwrap();
        bytes.write_u24::<BigEndian>(1).unwrap();
        bytes.write_u8(20).unwrap();
        bytes.write_u32::<LittleEndian>(1).unwrap();
        bytes.write_u32::<BigEndian>(0x01000000).unwrap();
        bytes.write_u8(0xaa).unwrap();

        let mut deserializer = ChunkDeserializer::new();
        let message = deserializer.get_next_message(&bytes).unwrap().unwrap();

        assert_eq!(message.timestamp, RtmpTimestamp::new(0x01000000));
        assert_eq!(&message.data[..], &[0xaa]);
    }

    #[test]
    fn timestamp_below_saturation_has_no_extended_field() {
        let mut bytes = Vec::new();
        bytes.write_u8(3).unwrap();
        bytes.write_u24::<BigEndian>(0xfffffe).unwrap();
        bytes.write_u24::<BigEndian>(1).unwrap();
        bytes.write_u8(20).unwrap();
        bytes.write_u32::<LittleEndian>(1).unwrap();
        bytes.write_u8(0xbb).unwrap();

        let mut deserializer = ChunkDeserializer::new();
        let message = deserializer.get_next_message(&bytes).unwrap().unwrap();

        assert_eq!(message.timestamp, RtmpTimestamp::new(0xfffffe));
        assert_eq!(&message.data[..], &[0xbb]);
    }

    #[test]
    fn two_byte_basic_header_resolves_csid() {
        let mut bytes = Vec::new();
        bytes.write_u8(0).unwrap(); // fmt 0, csid form 0
        bytes.write_u8(10).unwrap(); // csid = 74
        bytes.write_u24::<BigEndian>(5).unwrap();
        bytes.write_u24::<BigEndian>(1).unwrap();
        bytes.write_u8(20).unwrap();
        bytes.write_u32::<LittleEndian>(1).unwrap();
        bytes.write_u8(0xcc).unwrap();

        let mut deserializer = ChunkDeserializer::new();
        let message = deserializer.get_next_message(&bytes).unwrap().unwrap();
        assert_eq!(&message.data[..], &[0xcc]);
    }

    #[test]
    fn compressed_header_without_history_is_an_error() {
        let mut bytes = Vec::new();
        bytes.write_u8(3 | 0b1000_0000).unwrap();
        bytes.write_u24::<BigEndian>(10).unwrap();

        let mut deserializer = ChunkDeserializer::new();
        match deserializer.get_next_message(&bytes) {
            Err(ChunkDeserializationError::NoPreviousChunkOnStream { csid: 3 }) => (),
            x => panic!("Expected NoPreviousChunkOnStream, got {:?}", x),
        }
    }

    #[test]
    fn new_header_mid_message_is_inconsistent_reassembly() {
        let mut bytes = Vec::new();
        // announces 200 bytes but only delivers 128 before a new type 0 header
        bytes.write_u8(4).unwrap();
        bytes.write_u24::<BigEndian>(0).unwrap();
        bytes.write_u24::<BigEndian>(200).unwrap();
        bytes.write_u8(9).unwrap();
        bytes.write_u32::<LittleEndian>(1).unwrap();
        bytes.write_all(&[0_u8; 128]).unwrap();
        bytes.extend_from_slice(&type0_chunk(4, 0, 9, 1, &[1]));

        let mut deserializer = ChunkDeserializer::new();
        match deserializer.get_next_message(&bytes) {
            Err(ChunkDeserializationError::InconsistentReassembly { csid: 4 }) => (),
            x => panic!("Expected InconsistentReassembly, got {:?}", x),
        }
    }

    #[test]
    fn rejects_absurd_max_chunk_sizes() {
        let mut deserializer = ChunkDeserializer::new();
        assert!(deserializer.set_max_chunk_size(0).is_err());
        assert!(deserializer.set_max_chunk_size(0x80000000).is_err());
        assert!(deserializer.set_max_chunk_size(65536).is_ok());
    }
}
