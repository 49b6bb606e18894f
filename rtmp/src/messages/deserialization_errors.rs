use sml_amf0::Amf0DeserializationError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MessageDeserializationError {
    #[error("The message payload did not have the fields its type requires")]
    InvalidMessageFormat,

    #[error("Unknown user control event: {event}")]
    InvalidUserControlEvent { event: u16 },

    #[error("Failed to deserialize amf0 content: {0}")]
    Amf0DeserializationError(#[from] Amf0DeserializationError),

    #[error("Failed to read byte buffer: {0}")]
    BufferReadError(#[from] io::Error),
}
