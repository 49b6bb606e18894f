use crate::messages::MessageSerializationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChunkSerializationError {
    #[error("Message length of {size} exceeds the 16,777,215 byte maximum")]
    MessageTooLong { size: usize },

    #[error("Requested chunk size of {size} exceeds the 65,536 byte maximum")]
    ChunkSizeTooLarge { size: u32 },

    #[error("Failed to serialize message: {0}")]
    MessageSerializationError(#[from] MessageSerializationError),
}
