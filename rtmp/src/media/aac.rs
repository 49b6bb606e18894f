//! AAC over ADTS, and AAC into FLV audio tags.
//!
//! RTMP carries AAC as raw access units with a two byte AudioSpecificConfig
//! sent once as a "sequence header" tag, while encoders emit ADTS framing
//! where every frame carries a 7 (or 9) byte header repeating the codec
//! parameters.  The demuxer here strips the ADTS headers and recovers the
//! parameters; the mux helpers produce FLV audio tag bodies.

use super::MediaError;
use crate::buffer::BytesReader;
use crate::flv::sound_format;

/// Codec parameters recovered from one ADTS frame, in the terms the FLV
/// audio tag header uses.
#[derive(Debug, Clone, PartialEq)]
pub struct AacCodec {
    /// Audio object type (ADTS profile + 1); 2 = AAC-LC
    pub object_type: u8,
    pub sampling_frequency_index: u8,
    pub channel_configuration: u8,

    // FLV audio tag header fields
    pub sound_format: u8,
    pub sound_rate: u8,
    pub sound_size: u8,
    pub sound_type: u8,
    pub aac_packet_type: u8,
}

const SAMPLING_FREQUENCIES: [u32; 13] = [
    96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350,
];

/// Whether the byte sequence starts with the ADTS sync word (12 set bits)
pub fn is_adts(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == 0xff && (bytes[1] & 0xf0) == 0xf0
}

/// Consumes one ADTS unit from the reader and returns the raw AAC frame
/// along with the codec parameters from its header.
pub fn adts_demux<'a>(reader: &mut BytesReader<'a>) -> Result<(&'a [u8], AacCodec), MediaError> {
    if !reader.require(7) {
        return Err(MediaError::AacAdtsMalformed);
    }

    let header = reader
        .read_bytes(7)
        .map_err(|_| MediaError::AacAdtsMalformed)?;

    if header[0] != 0xff || (header[1] & 0xf0) != 0xf0 {
        return Err(MediaError::AacRequiredAdts);
    }

    let protection_absent = header[1] & 0x01 == 1;
    let profile = (header[2] >> 6) & 0x03;
    let sampling_frequency_index = (header[2] >> 2) & 0x0f;
    let channel_configuration = ((header[2] & 0x01) << 2) | ((header[3] >> 6) & 0x03);

    let frame_length = (((header[3] & 0x03) as usize) << 11)
        | ((header[4] as usize) << 3)
        | ((header[5] >> 5) as usize);

    let header_size = if protection_absent { 7 } else { 9 };
    if frame_length < header_size {
        return Err(MediaError::AacAdtsMalformed);
    }

    if !protection_absent {
        // skip the CRC the header advertised
        reader.skip(2).map_err(|_| MediaError::AacAdtsMalformed)?;
    }

    let payload_size = frame_length - header_size;
    let frame = reader
        .read_bytes(payload_size)
        .map_err(|_| MediaError::AacAdtsMalformed)?;

    let sample_rate = SAMPLING_FREQUENCIES
        .get(sampling_frequency_index as usize)
        .copied()
        .unwrap_or(44100);

    let codec = AacCodec {
        object_type: profile + 1,
        sampling_frequency_index,
        channel_configuration,
        sound_format: sound_format::AAC,
        sound_rate: flv_sound_rate(sample_rate),
        sound_size: 1,
        sound_type: if channel_configuration <= 1 { 0 } else { 1 },
        aac_packet_type: 1,
    };

    Ok((frame, codec))
}

/// The two byte AudioSpecificConfig for the sequence header tag
pub fn mux_sequence_header(codec: &AacCodec) -> Vec<u8> {
    let first = (codec.object_type << 3) | (codec.sampling_frequency_index >> 1);
    let second = ((codec.sampling_frequency_index & 0x01) << 7) | (codec.channel_configuration << 3);
    vec![first, second]
}

/// Wraps an AAC payload (raw frame or AudioSpecificConfig) into an FLV audio
/// tag body.
pub fn mux_aac2flv(payload: &[u8], codec: &AacCodec) -> Vec<u8> {
    let header = (codec.sound_format << 4)
        | ((codec.sound_rate & 0x03) << 2)
        | ((codec.sound_size & 0x01) << 1)
        | (codec.sound_type & 0x01);

    let mut tag = Vec::with_capacity(payload.len() + 2);
    tag.push(header);
    if codec.sound_format == sound_format::AAC {
        tag.push(codec.aac_packet_type);
    }
    tag.extend_from_slice(payload);
    tag
}

fn flv_sound_rate(sample_rate: u32) -> u8 {
    match sample_rate {
        x if x >= 44100 => 3,
        x if x >= 22050 => 2,
        x if x >= 11025 => 1,
        _ => 0,
    }
}
