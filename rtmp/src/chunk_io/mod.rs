//! RTMP chunk framing.
//!
//! Messages travel across the wire split into chunks, multiplexed over chunk
//! stream ids, with four levels of header compression (Type 0 through Type 3)
//! that elide fields matching the previous chunk on the same chunk stream.
//! Because compression state accumulates per peer, one [`ChunkSerializer`] and
//! one [`ChunkDeserializer`] must be used for the lifetime of a connection.

mod chunk_header;
mod deserialization_errors;
mod deserializer;
mod serialization_errors;
mod serializer;

pub use self::deserialization_errors::ChunkDeserializationError;
pub use self::deserializer::ChunkDeserializer;
pub use self::serialization_errors::ChunkSerializationError;
pub use self::serializer::ChunkSerializer;

/// The chunk size every connection starts out with
pub const INITIAL_CHUNK_SIZE: u32 = 128;

/// The largest chunk size this implementation will accept or announce
pub const MAX_CHUNK_SIZE: u32 = 65536;
