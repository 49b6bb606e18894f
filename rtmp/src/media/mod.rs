//! Adapters between raw codec bitstreams and FLV-shaped RTMP payloads.
//!
//! The `aac` module demuxes ADTS framed AAC and muxes FLV audio tag bodies;
//! the `h264` module demuxes Annex-B framed H.264, tracks SPS/PPS parameter
//! sets and muxes FLV video tag bodies (AVC sequence headers and
//! length-prefixed NALU payloads).

pub mod aac;
pub mod h264;

use crate::error_codes;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum MediaError {
    #[error("AAC frames must arrive in ADTS framing")]
    AacRequiredAdts,

    #[error("ADTS header was truncated or malformed")]
    AacAdtsMalformed,

    #[error("H.264 frame arrived before any SPS/PPS sequence header was sent")]
    H264DropBeforeSpsPps,

    #[error("SPS equal to the current one was received again")]
    H264DuplicatedSps,

    #[error("PPS equal to the current one was received again")]
    H264DuplicatedPps,

    #[error("The bitstream is not in Annex-B framing")]
    H264RequiredAnnexB,
}

impl MediaError {
    /// The stable numeric identity of this error
    pub fn code(&self) -> u32 {
        match self {
            MediaError::AacRequiredAdts => error_codes::AAC_REQUIRED_ADTS,
            MediaError::AacAdtsMalformed => error_codes::AAC_REQUIRED_ADTS,
            MediaError::H264DropBeforeSpsPps => error_codes::H264_DROP_BEFORE_SPS_PPS,
            MediaError::H264DuplicatedSps => error_codes::H264_DUPLICATED_SPS,
            MediaError::H264DuplicatedPps => error_codes::H264_DUPLICATED_PPS,
            MediaError::H264RequiredAnnexB => error_codes::H264_DROP_BEFORE_SPS_PPS,
        }
    }

    /// Recoverable errors let a multi-frame batch continue with the remaining
    /// frames; the batch reports the last one seen.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MediaError::H264DropBeforeSpsPps
                | MediaError::H264DuplicatedSps
                | MediaError::H264DuplicatedPps
        )
    }
}
