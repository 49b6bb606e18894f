//! The RTMP message model.
//!
//! A [`MessagePayload`] is the raw `{type id, stream id, timestamp, bytes}`
//! tuple that travels through the chunk layer; [`RtmpMessage`] is its typed
//! form.  Conversion in either direction goes through the per-type codec
//! modules under `types/`.

mod deserialization_errors;
mod message_payload;
mod serialization_errors;
mod types;

pub use self::deserialization_errors::MessageDeserializationError;
pub use self::message_payload::MessagePayload;
pub use self::serialization_errors::MessageSerializationError;

use crate::time::RtmpTimestamp;
use bytes::Bytes;
use sml_amf0::Amf0Value;

/// Message type ids used by this crate
pub mod type_ids {
    pub const SET_CHUNK_SIZE: u8 = 1;
    pub const ABORT: u8 = 2;
    pub const ACKNOWLEDGEMENT: u8 = 3;
    pub const USER_CONTROL: u8 = 4;
    pub const WINDOW_ACKNOWLEDGEMENT_SIZE: u8 = 5;
    pub const SET_PEER_BANDWIDTH: u8 = 6;
    pub const AUDIO: u8 = 8;
    pub const VIDEO: u8 = 9;
    pub const AMF3_DATA: u8 = 15;
    pub const AMF3_COMMAND: u8 = 17;
    pub const AMF0_DATA: u8 = 18;
    pub const SHARED_OBJECT: u8 = 19;
    pub const AMF0_COMMAND: u8 = 20;
    pub const AGGREGATE: u8 = 22;
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum PeerBandwidthLimitType {
    Hard,
    Soft,
    Dynamic,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum UserControlEventType {
    StreamBegin,
    StreamEof,
    StreamDry,
    SetBufferLength,
    StreamIsRecorded,
    PingRequest,
    PingResponse,
}

#[derive(PartialEq, Debug, Clone)]
pub enum RtmpMessage {
    Unknown {
        type_id: u8,
        data: Bytes,
    },

    Abort {
        stream_id: u32,
    },

    Acknowledgement {
        sequence_number: u32,
    },

    Aggregate {
        data: Bytes,
    },

    Amf0Command {
        command_name: String,
        transaction_id: f64,
        command_object: Amf0Value,
        additional_arguments: Vec<Amf0Value>,
    },

    Amf0Data {
        values: Vec<Amf0Value>,
    },

    AudioData {
        data: Bytes,
    },

    SetChunkSize {
        size: u32,
    },

    SetPeerBandwidth {
        size: u32,
        limit_type: PeerBandwidthLimitType,
    },

    UserControl {
        event_type: UserControlEventType,
        stream_id: Option<u32>,
        buffer_length: Option<u32>,
        timestamp: Option<RtmpTimestamp>,
    },

    VideoData {
        data: Bytes,
    },

    WindowAcknowledgement {
        size: u32,
    },
}
