//! Stable numeric identities for error conditions.
//!
//! Errors in this crate are enums, but several consumers key their handling
//! off small integers (0 meaning success).  Every error type that corresponds
//! to one of these conditions exposes a `code()` accessor returning the
//! matching constant.

pub const SUCCESS: u32 = 0;

// system
pub const SYSTEM_DNS_RESOLVE: u32 = 1001;
pub const SYSTEM_IO_INVALID: u32 = 1002;
pub const SYSTEM_FILE_EOF: u32 = 1003;
pub const SYSTEM_SOCKET_TIMEOUT: u32 = 1004;

// rtmp protocol
pub const RTMP_AGGREGATE: u32 = 2001;
pub const RTMP_CHUNK_TOO_LARGE: u32 = 2002;

// media / containers
pub const AAC_REQUIRED_ADTS: u32 = 3001;
pub const H264_DROP_BEFORE_SPS_PPS: u32 = 3002;
pub const H264_DUPLICATED_SPS: u32 = 3003;
pub const H264_DUPLICATED_PPS: u32 = 3004;
pub const FLV_INVALID_VIDEO_TAG: u32 = 3005;
pub const MP4_ILLEGAL_HANDLER: u32 = 3006;
