//! Read-only packet classification and human readable formatting.
//!
//! The one-line descriptions produced here are consumed by log-scraping
//! tools, so their shape is part of the crate's contract and must not drift.
//! Three forms exist: `Video packet ...`, `Audio packet ...` and
//! `Data packet ...`; payloads that cannot be decoded render a
//! `DecodeError` line instead.

use crate::flv::{
    avc_packet_type, sound_format, tag_type, video_codec, FlvError,
};
use byteorder::{BigEndian, ByteOrder};
use std::fmt::Write;

/// Derives the presentation timestamp of a payload.
///
/// Only AVC/HEVC video carries a composition-time offset (bytes 2..5 of the
/// tag body); everything else presents at its decode time.  Video of any
/// other codec is rejected.
pub fn parse_timestamp(packet_type: u8, timestamp: u32, payload: &[u8]) -> Result<u32, FlvError> {
    if packet_type != tag_type::VIDEO {
        return Ok(timestamp);
    }

    if !is_avc_like(payload) {
        return Err(FlvError::InvalidVideoTag);
    }

    if crate::flv::is_video_sequence_header(payload) {
        return Ok(timestamp);
    }

    if payload.len() < 5 {
        return Err(FlvError::InvalidVideoTag);
    }

    let cts = BigEndian::read_u24(&payload[2..5]);
    Ok(timestamp.wrapping_add(cts))
}

fn is_avc_like(payload: &[u8]) -> bool {
    if payload.is_empty() {
        return false;
    }

    let codec = payload[0] & 0x0f;
    codec == video_codec::AVC || codec == video_codec::HEVC
}

// ---- field extractors -------------------------------------------------

pub fn flv_video_codec_id(payload: &[u8]) -> Option<u8> {
    if payload.is_empty() {
        return None;
    }

    Some(payload[0] & 0x0f)
}

pub fn flv_video_frame_type(payload: &[u8]) -> Option<u8> {
    if !is_avc_like(payload) {
        return None;
    }

    let frame_type = (payload[0] >> 4) & 0x0f;
    if !(1..=5).contains(&frame_type) {
        return None;
    }

    Some(frame_type)
}

pub fn flv_video_avc_packet_type(payload: &[u8]) -> Option<u8> {
    if payload.len() < 2 || !is_avc_like(payload) {
        return None;
    }

    let packet_type = payload[1];
    if packet_type > 2 {
        return None;
    }

    Some(packet_type)
}

pub fn flv_audio_sound_format(payload: &[u8]) -> Option<u8> {
    if payload.is_empty() {
        return None;
    }

    let format = (payload[0] >> 4) & 0x0f;
    if format == 12 {
        return None;
    }

    Some(format)
}

/// The two bit rate field, except for Opus where the original extension
/// writes the true sampling rate (in kHz) into the third byte when the
/// frame-trait byte announces it.
pub fn flv_audio_sound_rate(payload: &[u8]) -> Option<u8> {
    if payload.len() < 3 {
        return None;
    }

    let sound_rate = (payload[0] >> 2) & 0x03;

    let format = (payload[0] >> 4) & 0x0f;
    if format != sound_format::OPUS {
        return Some(sound_rate);
    }

    const OPUS_TRAIT_SAMPLING_RATE: u8 = 4;
    let frame_trait = payload[1];
    if frame_trait & OPUS_TRAIT_SAMPLING_RATE == OPUS_TRAIT_SAMPLING_RATE {
        return Some(payload[2]);
    }

    Some(sound_rate)
}

pub fn flv_audio_sound_size(payload: &[u8]) -> Option<u8> {
    if payload.is_empty() {
        return None;
    }

    Some((payload[0] >> 1) & 0x01)
}

pub fn flv_audio_sound_type(payload: &[u8]) -> Option<u8> {
    if payload.is_empty() {
        return None;
    }

    Some(payload[0] & 0x01)
}

pub fn flv_audio_aac_packet_type(payload: &[u8]) -> Option<u8> {
    if payload.len() < 2 {
        return None;
    }

    let format = (payload[0] >> 4) & 0x0f;
    if format != sound_format::AAC && format != sound_format::OPUS {
        return None;
    }

    Some(payload[1])
}

// ---- names ------------------------------------------------------------

fn tag_type_name(packet_type: u8) -> &'static str {
    match packet_type {
        tag_type::AUDIO => "Audio",
        tag_type::VIDEO => "Video",
        tag_type::SCRIPT => "Data",
        _ => "Unknown",
    }
}

fn video_codec_name(codec_id: Option<u8>) -> &'static str {
    match codec_id {
        Some(2) => "H.263",
        Some(3) => "Screen",
        Some(4) => "VP6",
        Some(5) => "VP6Alpha",
        Some(6) => "Screen2",
        Some(7) => "H.264",
        Some(12) => "HEVC",
        _ => "Unknown",
    }
}

fn avc_packet_type_name(packet_type: Option<u8>) -> &'static str {
    match packet_type {
        Some(0) => "SH",
        Some(1) => "Nalu",
        Some(2) => "SpsPpsEnd",
        _ => "Unknown",
    }
}

fn frame_type_name(frame_type: Option<u8>) -> &'static str {
    match frame_type {
        Some(1) => "I",
        Some(2) => "P/B",
        Some(3) => "DI",
        Some(4) => "GI",
        Some(5) => "VI",
        _ => "Unknown",
    }
}

fn sound_format_name(format: Option<u8>) -> &'static str {
    match format {
        Some(0) => "LinearPCM",
        Some(1) => "ADPCM",
        Some(2) => "MP3",
        Some(3) => "LinearPCMLe",
        Some(4) => "NellymoserKHz16",
        Some(5) => "NellymoserKHz8",
        Some(6) => "Nellymoser",
        Some(7) => "G711APCM",
        Some(8) => "G711MuPCM",
        Some(9) => "Reserved",
        Some(10) => "AAC",
        Some(11) => "Speex",
        Some(13) => "Opus",
        Some(14) => "MP3KHz8",
        Some(15) => "DeviceSpecific",
        _ => "Unknown",
    }
}

fn sound_rate_name(rate: Option<u8>) -> &'static str {
    match rate {
        Some(0) => "5.5KHz",
        Some(1) => "11KHz",
        Some(2) => "22KHz",
        Some(3) => "44KHz",
        // Opus rates carried literally (in kHz)
        Some(8) => "NB8kHz",
        Some(12) => "MB12kHz",
        Some(16) => "WB16kHz",
        Some(24) => "SWB24kHz",
        Some(48) => "FB48kHz",
        _ => "Unknown",
    }
}

fn sound_size_name(size: Option<u8>) -> &'static str {
    match size {
        Some(0) => "8bit",
        Some(1) => "16bit",
        _ => "Unknown",
    }
}

fn sound_type_name(sound_type: Option<u8>) -> &'static str {
    match sound_type {
        Some(0) => "Mono",
        Some(1) => "Stereo",
        _ => "Unknown",
    }
}

fn aac_packet_type_name(packet_type: Option<u8>) -> &'static str {
    match packet_type {
        Some(0) => "SH",
        Some(1) => "Raw",
        // Opus frame traits, possibly combined
        Some(2) => "RAW",
        Some(4) => "SR",
        Some(8) => "AL",
        Some(6) => "RAW|SR",
        Some(10) => "RAW|AL",
        Some(14) => "RAW|SR|AL",
        _ => "Unknown",
    }
}

const H264_NALU_NAME: [&str; 12] = [
    "Unkown", "P/B", "P/B", "P/B", "P/B", "I", "SEI", "SPS", "PPS", "AUD", "EOS", "EOB",
];

const HEVC_NALU_NAME: [&str; 41] = [
    "TRAIL_N",
    "TRAIL_R",
    "TSA_N",
    "TSA_R",
    "STSA_N",
    "STSA_R",
    "RADL_N",
    "RADL_R",
    "RASL_N",
    "RASL_R",
    "RSV_VCL_N10",
    "RSV_VCL_R11",
    "RSV_VCL_N12",
    "RSV_VCL_R13",
    "RSV_VCL_N14",
    "RSV_VCL_R15",
    "BLA_W_LP",
    "BLA_W_RADL",
    "BLA_N_LP",
    "IDR_W_RADL",
    "IDR_N_LP",
    "CRA_NUT",
    "RSV_IRAP_VCL22",
    "RSV_IRAP_VCL23",
    "RSV_VCL24",
    "RSV_VCL25",
    "RSV_VCL26",
    "RSV_VCL27",
    "RSV_VCL28",
    "RSV_VCL29",
    "RSV_VCL30",
    "RSV_VCL31",
    "VPS_NUT",
    "SPS_NUT",
    "PPS_NUT",
    "AUD_NUT",
    "EOS_NUT",
    "EOB_NUT",
    "FD_NUT",
    "PREFIX_SEI_NUT",
    "SUFFIX_SEI_NUT",
];

fn nalu_name(codec_id: u8, nalu_kind: usize) -> &'static str {
    let table: &[&str] = if codec_id == video_codec::AVC {
        &H264_NALU_NAME
    } else {
        &HEVC_NALU_NAME
    };

    table.get(nalu_kind).copied().unwrap_or("Unkown")
}

// ---- formatting -------------------------------------------------------

fn leading_bytes_hex(payload: &[u8]) -> String {
    let mut text = String::new();
    for byte in payload.iter().take(8) {
        let _ = write!(text, "0x{:02x} ", byte);
    }
    text
}

fn hex_dump(bytes: &[u8]) -> String {
    let mut text = String::new();
    for byte in bytes {
        let _ = write!(text, "{:02X} ", byte);
    }
    text
}

/// Walks the length-prefixed NALU list of an AVC/HEVC `Nalu` payload and
/// renders one line naming every NALU plus hex dumps (full dumps for
/// parameter sets and SEI, the first 16 bytes otherwise).
fn describe_nalus(payload: &[u8]) -> String {
    let codec_id = match flv_video_codec_id(payload) {
        Some(id) if id == video_codec::AVC || id == video_codec::HEVC => id,
        _ => return String::new(),
    };

    if flv_video_avc_packet_type(payload) != Some(avc_packet_type::NALU) {
        return String::new();
    }

    if payload.len() < 5 {
        return String::new();
    }

    let mut nalu_list = String::from("NALU: ");
    let mut nalu_data = String::new();

    let mut rest = &payload[5..];
    while rest.len() >= 4 {
        let length = BigEndian::read_u32(&rest[..4]) as usize;
        rest = &rest[4..];

        if length == 0 || length > rest.len() {
            break;
        }

        let nalu = &rest[..length];
        rest = &rest[length..];

        let (kind, body, important) = if codec_id == video_codec::AVC {
            let kind = (nalu[0] & 0x1f) as usize;
            let important = matches!(kind, 6 | 7 | 8); // SEI, SPS, PPS
            (kind, &nalu[1..], important)
        } else {
            let kind = ((nalu[0] & 0x7e) >> 1) as usize;
            let important = matches!(kind, 32 | 33 | 34 | 39 | 40); // VPS/SPS/PPS/SEI
            let body = if nalu.len() >= 2 { &nalu[2..] } else { &[][..] };
            (kind, body, important)
        };

        let _ = write!(nalu_list, "{}({}) ", nalu_name(codec_id, kind), kind);

        let dump = if important {
            hex_dump(body)
        } else {
            hex_dump(&body[..body.len().min(16)])
        };
        let _ = write!(nalu_data, "{}:{}\n", nalu_name(codec_id, kind), dump);
    }

    format!("{}\n{}", nalu_list, nalu_data)
}

/// Produces the one-line (plus continuation) human description of a packet.
/// The format is stable; see the module documentation.
pub fn format_packet(packet_type: u8, timestamp: u32, payload: &[u8]) -> String {
    let sbytes = leading_bytes_hex(payload);

    let pts = match parse_timestamp(packet_type, timestamp, payload) {
        Ok(pts) => pts,
        Err(error) => {
            return format!(
                "Rtmp packet type={}, dts={}, size={}, DecodeError, ({}), ret={}",
                tag_type_name(packet_type),
                timestamp,
                payload.len(),
                sbytes,
                error.code()
            );
        }
    };

    match packet_type {
        tag_type::VIDEO => format!(
            "Video packet type={}, dts={}, pts={}, size={}, {}({},{}), {}\n({})",
            tag_type_name(packet_type),
            timestamp,
            pts,
            payload.len(),
            video_codec_name(flv_video_codec_id(payload)),
            avc_packet_type_name(flv_video_avc_packet_type(payload)),
            frame_type_name(flv_video_frame_type(payload)),
            describe_nalus(payload),
            sbytes
        ),

        tag_type::AUDIO => format!(
            "Audio packet type={}, dts={}, pts={}, size={}, {}({},{},{},{}), ({})",
            tag_type_name(packet_type),
            timestamp,
            pts,
            payload.len(),
            sound_format_name(flv_audio_sound_format(payload)),
            sound_rate_name(flv_audio_sound_rate(payload)),
            sound_size_name(flv_audio_sound_size(payload)),
            sound_type_name(flv_audio_sound_type(payload)),
            aac_packet_type_name(flv_audio_aac_packet_type(payload)),
            sbytes
        ),

        tag_type::SCRIPT => {
            let mut text = format!(
                "Data packet type={}, time={}, size={}, ({})",
                tag_type_name(packet_type),
                timestamp,
                payload.len(),
                sbytes
            );

            // Failures on this diagnostic path are swallowed; whatever
            // decoded so far is shown.
            let mut rest = payload;
            while !rest.is_empty() {
                match sml_amf0::decode_first(rest) {
                    Ok((value, consumed)) => {
                        let tree = sml_amf0::human_print(&value);
                        let _ = write!(text, "\n{}", tree.trim_end_matches('\n'));
                        rest = &rest[consumed..];
                    }
                    Err(_) => break,
                }
            }

            text
        }

        _ => format!(
            "Rtmp packet type={:#x}, dts={}, pts={}, size={}, ({})",
            packet_type,
            timestamp,
            pts,
            payload.len(),
            sbytes
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_video_presents_at_decode_time() {
        assert_eq!(parse_timestamp(tag_type::AUDIO, 1234, &[0xaf, 0x01]).unwrap(), 1234);
        assert_eq!(parse_timestamp(tag_type::SCRIPT, 77, &[0x02]).unwrap(), 77);
    }

    #[test]
    fn video_adds_composition_time() {
        // inter frame, AVC, NALU, cts = 0x000102
        let payload = [0x27, 0x01, 0x00, 0x01, 0x02, 0xaa];
        assert_eq!(
            parse_timestamp(tag_type::VIDEO, 1000, &payload).unwrap(),
            1000 + 0x0102
        );
    }

    #[test]
    fn sequence_header_presents_at_decode_time() {
        let payload = [0x17, 0x00, 0x00, 0x00, 0x00, 0x01];
        assert_eq!(parse_timestamp(tag_type::VIDEO, 500, &payload).unwrap(), 500);
    }

    #[test]
    fn non_avc_video_is_invalid() {
        let payload = [0x12, 0x00, 0x00, 0x00, 0x00]; // H.263
        match parse_timestamp(tag_type::VIDEO, 0, &payload) {
            Err(FlvError::InvalidVideoTag) => (),
            x => panic!("Expected InvalidVideoTag, got {:?}", x),
        }
    }

    #[test]
    fn audio_field_extractors() {
        let payload = [0xaf, 0x01, 0x99];
        assert_eq!(flv_audio_sound_format(&payload), Some(10));
        assert_eq!(flv_audio_sound_rate(&payload), Some(3));
        assert_eq!(flv_audio_sound_size(&payload), Some(1));
        assert_eq!(flv_audio_sound_type(&payload), Some(1));
        assert_eq!(flv_audio_aac_packet_type(&payload), Some(1));
    }

    #[test]
    fn opus_sampling_rate_trait_overrides_rate_bits() {
        // Opus (13), frame trait with sampling-rate bit, rate byte 48
        let payload = [0xdf, 0x06, 48, 0x00];
        assert_eq!(flv_audio_sound_rate(&payload), Some(48));
        assert_eq!(flv_audio_aac_packet_type(&payload), Some(6));

        // Without the trait bit the two bit field applies.
        let payload = [0xdf, 0x02, 48, 0x00];
        assert_eq!(flv_audio_sound_rate(&payload), Some(3));
    }

    #[test]
    fn video_line_format_is_stable() {
        // IDR tag: keyframe+AVC, NALU type, cts 0, one NALU of 2 bytes
        let payload = [
            0x17, 0x01, 0x00, 0x00, 0x00, // header
            0x00, 0x00, 0x00, 0x02, 0x65, 0x88, // NALU list
        ];

        let line = format_packet(tag_type::VIDEO, 100, &payload);
        assert!(
            line.starts_with("Video packet type=Video, dts=100, pts=100, size=11, H.264(Nalu,I), NALU: I(5) "),
            "Got: {}",
            line
        );
        assert!(line.contains("I:88 "), "NALU body dump missing: {}", line);
        assert!(
            line.ends_with("(0x17 0x01 0x00 0x00 0x00 0x00 0x00 0x00 )"),
            "Trailing byte dump malformed: {}",
            line
        );
    }

    #[test]
    fn audio_line_format_is_stable() {
        let payload = [0xaf, 0x01, 0xaa, 0xbb];
        let line = format_packet(tag_type::AUDIO, 50, &payload);
        assert_eq!(
            line,
            "Audio packet type=Audio, dts=50, pts=50, size=4, AAC(44KHz,16bit,Stereo,Raw), (0xaf 0x01 0xaa 0xbb )"
        );
    }

    #[test]
    fn data_line_includes_amf0_tree() {
        let values = vec![
            sml_amf0::Amf0Value::Utf8String("onMetaData".to_string()),
            sml_amf0::Amf0Value::Number(1.0),
        ];
        let payload = sml_amf0::serialize(&values).unwrap();

        let line = format_packet(tag_type::SCRIPT, 0, &payload);
        assert!(
            line.starts_with("Data packet type=Data, time=0, size="),
            "Got: {}",
            line
        );
        assert!(line.contains("String \"onMetaData\""), "Got: {}", line);
        assert!(line.contains("Number 1.0"), "Got: {}", line);
    }

    #[test]
    fn decode_error_line_for_malformed_video() {
        let payload = [0x05_u8];
        let line = format_packet(tag_type::VIDEO, 9, &payload);
        assert!(
            line.starts_with("Rtmp packet type=Video, dts=9, size=1, DecodeError,"),
            "Got: {}",
            line
        );
    }

    #[test]
    fn full_dump_for_parameter_set_nalus() {
        // Sequence of SPS (type 7) with 20 payload bytes; all must be dumped.
        let sps_body: Vec<u8> = (0..20).collect();
        let mut payload = vec![0x17, 0x01, 0, 0, 0];
        payload.extend_from_slice(&(sps_body.len() as u32 + 1).to_be_bytes());
        payload.push(0x67);
        payload.extend_from_slice(&sps_body);

        let line = format_packet(tag_type::VIDEO, 0, &payload);
        assert!(line.contains("SPS(7)"), "Got: {}", line);
        assert!(line.contains("13 "), "Full dump expected: {}", line);

        // An IDR with 20 bytes gets truncated to 16.
        let idr_body: Vec<u8> = (0..20).collect();
        let mut payload = vec![0x17, 0x01, 0, 0, 0];
        payload.extend_from_slice(&(idr_body.len() as u32 + 1).to_be_bytes());
        payload.push(0x65);
        payload.extend_from_slice(&idr_body);

        let line = format_packet(tag_type::VIDEO, 0, &payload);
        let data_section = line.split("I:").nth(1).unwrap();
        assert!(!data_section.contains("13 "), "Truncated dump expected: {}", line);
    }
}
