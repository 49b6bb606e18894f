//! H.264 Annex-B demuxing and AVC into FLV video tags.
//!
//! Encoders emit NAL units separated by 3 or 4 byte start codes (Annex-B).
//! FLV wants something else entirely: SPS and PPS packed into one
//! AVCDecoderConfigurationRecord "sequence header" tag, and each coded frame
//! as a `u32` length-prefixed NALU tag.  [`AvcSequenceState`] carries the
//! per-session SPS/PPS bookkeeping that decides when a fresh sequence header
//! has to precede the next frame.

use super::MediaError;
use crate::buffer::BytesWriter;
use crate::flv::{avc_packet_type, frame_type, video_codec};

pub mod nalu_type {
    pub const NON_IDR: u8 = 1;
    pub const IDR: u8 = 5;
    pub const SEI: u8 = 6;
    pub const SPS: u8 = 7;
    pub const PPS: u8 = 8;
    pub const AUD: u8 = 9;
}

/// Number of bytes in the start code at the front of `bytes`, if any
pub fn annexb_start_code(bytes: &[u8]) -> Option<usize> {
    if bytes.len() >= 3 && bytes[0] == 0 && bytes[1] == 0 && bytes[2] == 1 {
        return Some(3);
    }
    if bytes.len() >= 4 && bytes[0] == 0 && bytes[1] == 0 && bytes[2] == 0 && bytes[3] == 1 {
        return Some(4);
    }
    None
}

pub fn is_sps(frame: &[u8]) -> bool {
    !frame.is_empty() && frame[0] & 0x1f == nalu_type::SPS
}

pub fn is_pps(frame: &[u8]) -> bool {
    !frame.is_empty() && frame[0] & 0x1f == nalu_type::PPS
}

/// Splits a whole Annex-B buffer into NALU slices.
pub fn annexb_split(bytes: &[u8]) -> Result<Vec<&[u8]>, MediaError> {
    if annexb_start_code(bytes).is_none() {
        return Err(MediaError::H264RequiredAnnexB);
    }

    let mut nalus = Vec::new();
    let mut position = 0;

    while position < bytes.len() {
        let start_code = match annexb_start_code(&bytes[position..]) {
            Some(size) => size,
            None => break,
        };
        position += start_code;

        let mut end = bytes.len();
        for index in position..bytes.len() {
            if annexb_start_code(&bytes[index..]).is_some() {
                end = index;
                break;
            }
        }

        nalus.push(&bytes[position..end]);
        position = end;
    }

    Ok(nalus)
}

/// Per-session SPS/PPS bookkeeping.
///
/// Parameter sets accumulate as they are observed in the bitstream; a
/// sequence header is (re)emitted only when either of them changed since the
/// last one went out.
#[derive(Debug, Default)]
pub struct AvcSequenceState {
    sps: Vec<u8>,
    pps: Vec<u8>,
    sps_changed: bool,
    pps_changed: bool,
    sps_pps_sent: bool,
}

impl AvcSequenceState {
    pub fn new() -> AvcSequenceState {
        AvcSequenceState::default()
    }

    /// Records an SPS NALU.  Reports a duplicate when it matches the current
    /// one byte for byte; callers usually treat that as ignorable.
    pub fn on_sps(&mut self, frame: &[u8]) -> Result<(), MediaError> {
        if self.sps == frame {
            return Err(MediaError::H264DuplicatedSps);
        }

        self.sps_changed = true;
        self.sps = frame.to_vec();
        Ok(())
    }

    pub fn on_pps(&mut self, frame: &[u8]) -> Result<(), MediaError> {
        if self.pps == frame {
            return Err(MediaError::H264DuplicatedPps);
        }

        self.pps_changed = true;
        self.pps = frame.to_vec();
        Ok(())
    }

    pub fn sequence_header_sent(&self) -> bool {
        self.sps_pps_sent
    }

    /// Produces a fresh sequence header tag body when one is due (a
    /// parameter set changed and both are known).  Clears the change flags.
    pub fn take_sequence_header(&mut self) -> Option<Vec<u8>> {
        if !self.sps_changed && !self.pps_changed {
            return None;
        }

        if self.sps.is_empty() || self.pps.is_empty() {
            return None;
        }

        let record = mux_avc_decoder_configuration(&self.sps, &self.pps);
        let tag = mux_avc2flv(
            frame_type::KEY_FRAME,
            avc_packet_type::SEQUENCE_HEADER,
            0,
            &record,
        );

        self.sps_changed = false;
        self.pps_changed = false;
        self.sps_pps_sent = true;
        Some(tag)
    }

    /// Resets to the pristine state, e.g. when a session is reopened.
    pub fn reset(&mut self) {
        *self = AvcSequenceState::default();
    }
}

/// ISO 14496-15 AVCDecoderConfigurationRecord holding one SPS and one PPS
pub fn mux_avc_decoder_configuration(sps: &[u8], pps: &[u8]) -> Vec<u8> {
    let mut writer = BytesWriter::with_capacity(11 + sps.len() + pps.len());

    writer.write_u8(0x01); // configurationVersion
    writer.write_u8(sps.get(1).copied().unwrap_or(0)); // AVCProfileIndication
    writer.write_u8(sps.get(2).copied().unwrap_or(0)); // profile_compatibility
    writer.write_u8(sps.get(3).copied().unwrap_or(0)); // AVCLevelIndication
    writer.write_u8(0xff); // lengthSizeMinusOne = 3
    writer.write_u8(0xe1); // one SPS
    writer.write_u16(sps.len() as u16);
    writer.write_bytes(sps);
    writer.write_u8(0x01); // one PPS
    writer.write_u16(pps.len() as u16);
    writer.write_bytes(pps);

    writer.into_bytes()
}

/// Length-prefixes a single NALU the way AVCC payloads expect
pub fn mux_ipb_frame(frame: &[u8]) -> Vec<u8> {
    let mut writer = BytesWriter::with_capacity(4 + frame.len());
    writer.write_u32(frame.len() as u32);
    writer.write_bytes(frame);
    writer.into_bytes()
}

/// Builds a complete FLV video tag body around an AVC payload
pub fn mux_avc2flv(frame_kind: u8, packet_type: u8, cts: u32, payload: &[u8]) -> Vec<u8> {
    let mut writer = BytesWriter::with_capacity(5 + payload.len());
    writer.write_u8((frame_kind << 4) | video_codec::AVC);
    writer.write_u8(packet_type);
    writer.write_u24(cts);
    writer.write_bytes(payload);
    writer.into_bytes()
}
