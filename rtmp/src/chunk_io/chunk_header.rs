use crate::time::RtmpTimestamp;

/// The four chunk header compression levels from the RTMP specification
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ChunkHeaderFormat {
    /// Type 0: full 11 byte header
    Full,
    /// Type 1: 7 bytes; timestamp delta, length and type id (same stream id)
    TimeDeltaWithoutMessageStreamId,
    /// Type 2: 3 bytes; timestamp delta only
    TimeDeltaOnly,
    /// Type 3: no message header at all
    Empty,
}

/// The last known header values for one chunk stream id
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkHeader {
    pub chunk_stream_id: u32,
    pub timestamp: RtmpTimestamp,
    /// The raw value of the last timestamp field written or read; an absolute
    /// time for Type 0 headers and a delta for every other type
    pub timestamp_field: u32,
    pub message_length: u32,
    pub message_type_id: u8,
    pub message_stream_id: u32,
}

impl ChunkHeader {
    pub fn new() -> ChunkHeader {
        ChunkHeader {
            chunk_stream_id: 0,
            timestamp: RtmpTimestamp::new(0),
            timestamp_field: 0,
            message_length: 0,
            message_type_id: 0,
            message_stream_id: 0,
        }
    }
}
