use crate::chunk_io::{ChunkDeserializationError, ChunkSerializationError};
use crate::error_codes;
use crate::handshake::HandshakeError;
use crate::media::MediaError;
use crate::messages::{MessageDeserializationError, MessageSerializationError};
use crate::session::SessionState;
use crate::url::UrlParseError;
use std::fmt;
use std::io;
use thiserror::Error;

/// Error state when a client session encounters an error
#[derive(Debug)]
pub struct SessionError {
    pub kind: SessionErrorKind,
}

#[derive(Debug, Error)]
pub enum SessionErrorKind {
    #[error("Invalid rtmp url: {0}")]
    UrlParseError(#[from] UrlParseError),

    #[error("Could not resolve host '{host}'")]
    DnsResolveFailed { host: String },

    #[error("Handshake failed: {0}")]
    HandshakeError(#[from] HandshakeError),

    #[error("An error occurred serializing outbound chunks: {0}")]
    ChunkSerializationError(#[from] ChunkSerializationError),

    #[error("An error occurred deserializing incoming chunks: {0}")]
    ChunkDeserializationError(#[from] ChunkDeserializationError),

    #[error("An error occurred while serializing an RTMP message: {0}")]
    MessageSerializationError(#[from] MessageSerializationError),

    #[error("An error occurred while deserializing an RTMP message: {0}")]
    MessageDeserializationError(#[from] MessageDeserializationError),

    #[error("Media adapter error: {0}")]
    MediaError(#[from] MediaError),

    #[error("The socket operation timed out")]
    Timeout,

    #[error("The peer closed the connection")]
    Disconnected,

    #[error("Socket error: {0}")]
    Io(io::Error),

    #[error("The request could not be performed while the session is in the {current_state:?} state")]
    SessionInInvalidState { current_state: SessionState },

    #[error("The server rejected the connection request: {description}")]
    ConnectionRequestRejected { description: String },

    #[error("The server sent a createStream success result without a stream id")]
    CreateStreamResponseHadNoStreamNumber,

    #[error("The server sent an onStatus message with invalid arguments")]
    InvalidOnStatusArguments,

    #[error("The server answered the request with status code '{code}'")]
    RequestRejected { code: String },

    #[error("An aggregate message payload was malformed")]
    InvalidAggregateMessage,

    #[error("The peer announced a chunk size of {size} which exceeds the 65,536 cap")]
    ChunkSizeTooLarge { size: u32 },
}

impl SessionError {
    /// The stable numeric identity of this error, when it has one
    pub fn code(&self) -> u32 {
        match &self.kind {
            SessionErrorKind::DnsResolveFailed { .. } => error_codes::SYSTEM_DNS_RESOLVE,
            SessionErrorKind::Timeout => error_codes::SYSTEM_SOCKET_TIMEOUT,
            SessionErrorKind::Disconnected => error_codes::SYSTEM_IO_INVALID,
            SessionErrorKind::Io(_) => error_codes::SYSTEM_IO_INVALID,
            SessionErrorKind::InvalidAggregateMessage => error_codes::RTMP_AGGREGATE,
            SessionErrorKind::ChunkSizeTooLarge { .. } => error_codes::RTMP_CHUNK_TOO_LARGE,
            SessionErrorKind::MediaError(inner) => inner.code(),
            _ => error_codes::SYSTEM_IO_INVALID,
        }
    }

    /// True for the codec warnings a write batch may finish with (duplicated
    /// SPS/PPS, frames dropped before the sequence header); the session is
    /// still healthy and the caller may keep writing.
    pub fn is_recoverable_media_error(&self) -> bool {
        match &self.kind {
            SessionErrorKind::MediaError(inner) => inner.is_recoverable(),
            _ => false,
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.kind, f)
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.kind)
    }
}

impl From<SessionErrorKind> for SessionError {
    fn from(kind: SessionErrorKind) -> Self {
        SessionError { kind }
    }
}

impl From<UrlParseError> for SessionError {
    fn from(error: UrlParseError) -> Self {
        SessionError {
            kind: SessionErrorKind::UrlParseError(error),
        }
    }
}

impl From<HandshakeError> for SessionError {
    fn from(error: HandshakeError) -> Self {
        SessionError {
            kind: SessionErrorKind::HandshakeError(error),
        }
    }
}

impl From<ChunkSerializationError> for SessionError {
    fn from(error: ChunkSerializationError) -> Self {
        SessionError {
            kind: SessionErrorKind::ChunkSerializationError(error),
        }
    }
}

impl From<ChunkDeserializationError> for SessionError {
    fn from(error: ChunkDeserializationError) -> Self {
        SessionError {
            kind: SessionErrorKind::ChunkDeserializationError(error),
        }
    }
}

impl From<MessageSerializationError> for SessionError {
    fn from(error: MessageSerializationError) -> Self {
        SessionError {
            kind: SessionErrorKind::MessageSerializationError(error),
        }
    }
}

impl From<MessageDeserializationError> for SessionError {
    fn from(error: MessageDeserializationError) -> Self {
        SessionError {
            kind: SessionErrorKind::MessageDeserializationError(error),
        }
    }
}

impl From<MediaError> for SessionError {
    fn from(error: MediaError) -> Self {
        SessionError {
            kind: SessionErrorKind::MediaError(error),
        }
    }
}

impl From<io::Error> for SessionError {
    fn from(error: io::Error) -> Self {
        let kind = match error.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => SessionErrorKind::Timeout,
            io::ErrorKind::UnexpectedEof => SessionErrorKind::Disconnected,
            _ => SessionErrorKind::Io(error),
        };

        SessionError { kind }
    }
}
