use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("First byte of the handshake did not start with a 3")]
    BadVersionId,

    #[error("Peer's digest did not verify under either scheme")]
    DigestVerificationFailed,

    #[error("Handshake packet was shorter than the protocol requires")]
    IncompletePacket,

    #[error("{0}")]
    Io(#[from] io::Error),
}
