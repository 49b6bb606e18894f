use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChunkDeserializationError {
    #[error("Received a compressed chunk header on csid {csid} with no prior chunk to base it on")]
    NoPreviousChunkOnStream { csid: u32 },

    #[error("A non-continuation header arrived on csid {csid} in the middle of a message")]
    InconsistentReassembly { csid: u32 },

    #[error("Requested max chunk size of {size} is not valid")]
    InvalidMaxChunkSize { size: usize },
}
