use sml_amf0::Amf0SerializationError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MessageSerializationError {
    #[error("Failed to serialize amf0 content: {0}")]
    Amf0SerializationError(#[from] Amf0SerializationError),

    #[error("Failed to write to byte buffer: {0}")]
    BufferWriteError(#[from] io::Error),
}
