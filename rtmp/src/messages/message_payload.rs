use super::types;
use crate::messages::{type_ids, MessageDeserializationError, MessageSerializationError};
use crate::messages::RtmpMessage;
use crate::time::RtmpTimestamp;
use bytes::Bytes;

/// Represents a raw RTMP message
#[derive(PartialEq, Debug, Clone)]
pub struct MessagePayload {
    pub timestamp: RtmpTimestamp,
    pub type_id: u8,
    pub message_stream_id: u32,
    pub data: Bytes,
}

impl MessagePayload {
    pub fn new() -> MessagePayload {
        MessagePayload {
            timestamp: RtmpTimestamp::new(0),
            message_stream_id: 0,
            type_id: 0,
            data: Bytes::new(),
        }
    }

    pub fn to_rtmp_message(&self) -> Result<RtmpMessage, MessageDeserializationError> {
        match self.type_id {
            type_ids::SET_CHUNK_SIZE => types::set_chunk_size::deserialize(&self.data[..]),
            type_ids::ABORT => types::abort::deserialize(&self.data[..]),
            type_ids::ACKNOWLEDGEMENT => types::acknowledgement::deserialize(&self.data[..]),
            type_ids::USER_CONTROL => types::user_control::deserialize(&self.data[..]),
            type_ids::WINDOW_ACKNOWLEDGEMENT_SIZE => {
                types::window_acknowledgement_size::deserialize(&self.data[..])
            }
            type_ids::SET_PEER_BANDWIDTH => types::set_peer_bandwidth::deserialize(&self.data[..]),
            type_ids::AUDIO => types::audio_data::deserialize(self.data.clone()),
            type_ids::VIDEO => types::video_data::deserialize(self.data.clone()),
            type_ids::AMF0_DATA => types::amf0_data::deserialize(&self.data[..]),
            type_ids::AMF0_COMMAND => types::amf0_command::deserialize(&self.data[..]),
            type_ids::AGGREGATE => types::aggregate::deserialize(self.data.clone()),
            _ => Ok(RtmpMessage::Unknown {
                type_id: self.type_id,
                data: self.data.clone(),
            }),
        }
    }

    pub fn from_rtmp_message(
        message: RtmpMessage,
        timestamp: RtmpTimestamp,
        message_stream_id: u32,
    ) -> Result<MessagePayload, MessageSerializationError> {
        let type_id = get_message_type_id(&message);

        let bytes = match message {
            RtmpMessage::Unknown { type_id: _, data } => data,

            RtmpMessage::Abort { stream_id } => types::abort::serialize(stream_id)?,

            RtmpMessage::Acknowledgement { sequence_number } => {
                types::acknowledgement::serialize(sequence_number)?
            }

            RtmpMessage::Aggregate { data } => types::aggregate::serialize(data)?,

            RtmpMessage::Amf0Command {
                command_name,
                transaction_id,
                command_object,
                additional_arguments,
            } => types::amf0_command::serialize(
                command_name,
                transaction_id,
                command_object,
                additional_arguments,
            )?,

            RtmpMessage::Amf0Data { values } => types::amf0_data::serialize(values)?,

            RtmpMessage::AudioData { data } => types::audio_data::serialize(data)?,

            RtmpMessage::SetChunkSize { size } => types::set_chunk_size::serialize(size)?,

            RtmpMessage::SetPeerBandwidth { size, limit_type } => {
                types::set_peer_bandwidth::serialize(limit_type, size)?
            }

            RtmpMessage::UserControl {
                event_type,
                stream_id,
                buffer_length,
                timestamp,
            } => types::user_control::serialize(event_type, stream_id, buffer_length, timestamp)?,

            RtmpMessage::VideoData { data } => types::video_data::serialize(data)?,

            RtmpMessage::WindowAcknowledgement { size } => {
                types::window_acknowledgement_size::serialize(size)?
            }
        };

        Ok(MessagePayload {
            data: bytes,
            type_id,
            message_stream_id,
            timestamp,
        })
    }
}

fn get_message_type_id(message: &RtmpMessage) -> u8 {
    match *message {
        RtmpMessage::Unknown { type_id, .. } => type_id,
        RtmpMessage::Abort { .. } => type_ids::ABORT,
        RtmpMessage::Acknowledgement { .. } => type_ids::ACKNOWLEDGEMENT,
        RtmpMessage::Aggregate { .. } => type_ids::AGGREGATE,
        RtmpMessage::Amf0Command { .. } => type_ids::AMF0_COMMAND,
        RtmpMessage::Amf0Data { .. } => type_ids::AMF0_DATA,
        RtmpMessage::AudioData { .. } => type_ids::AUDIO,
        RtmpMessage::SetChunkSize { .. } => type_ids::SET_CHUNK_SIZE,
        RtmpMessage::SetPeerBandwidth { .. } => type_ids::SET_PEER_BANDWIDTH,
        RtmpMessage::UserControl { .. } => type_ids::USER_CONTROL,
        RtmpMessage::VideoData { .. } => type_ids::VIDEO,
        RtmpMessage::WindowAcknowledgement { .. } => type_ids::WINDOW_ACKNOWLEDGEMENT_SIZE,
    }
}
