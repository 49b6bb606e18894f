//! Client-side RTMP for Rust.
//!
//! This crate covers the pieces needed to push media to, or pull media from,
//! an RTMP server over a blocking transport owned by the caller's thread:
//!
//! * handshaking (both the original random-echo form and the digest form),
//! * RTMP chunk serialization and deserialization with header compression,
//! * a blocking [`session::Session`] driving NetConnection / NetStream
//!   command sequencing (`connect`, `createStream`, `play`, `publish`),
//! * adapters turning raw codec bitstreams (AAC in ADTS framing, H.264 in
//!   Annex-B framing) into FLV-shaped RTMP payloads,
//! * FLV file reading/writing and MP4 demuxing into FLV tags,
//! * human readable packet formatting for diagnostics.
//!
//! There is no event loop and no internal threading; every socket operation
//! blocks on the calling thread, bounded by the configured timeouts.

pub mod bandwidth;
pub mod buffer;
pub mod chunk_io;
pub mod error_codes;
pub mod flv;
pub mod handshake;
pub mod inspector;
pub mod media;
pub mod messages;
pub mod mp4;
pub mod session;
pub mod time;
pub mod url;
