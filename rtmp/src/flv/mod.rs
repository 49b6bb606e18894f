//! FLV file reading and writing, plus tag-level predicates shared by the
//! media adapters, the MP4 converter and the packet inspector.
//!
//! An FLV file is a 9 byte header (`"FLV"`, version, audio/video flags,
//! header size), a zero u32 (the previous-tag-size of the header), then a run
//! of tags.  Each tag is an 11 byte tag header (type, 24 bit body size, 24+8
//! bit timestamp, always-zero stream id), the body, and a trailing u32
//! previous-tag-size equal to `11 + body size`.

use crate::error_codes;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use thiserror::Error;

/// FLV tag types (numerically equal to the RTMP message types that carry the
/// same payloads)
pub mod tag_type {
    pub const AUDIO: u8 = 8;
    pub const VIDEO: u8 = 9;
    pub const SCRIPT: u8 = 18;
}

pub mod video_codec {
    pub const H263: u8 = 2;
    pub const SCREEN: u8 = 3;
    pub const VP6: u8 = 4;
    pub const VP6_ALPHA: u8 = 5;
    pub const SCREEN2: u8 = 6;
    pub const AVC: u8 = 7;
    pub const HEVC: u8 = 12;
    pub const AV1: u8 = 13;
}

pub mod frame_type {
    pub const KEY_FRAME: u8 = 1;
    pub const INTER_FRAME: u8 = 2;
    pub const DISPOSABLE_INTER_FRAME: u8 = 3;
    pub const GENERATED_KEY_FRAME: u8 = 4;
    pub const VIDEO_INFO_FRAME: u8 = 5;
}

pub mod avc_packet_type {
    pub const SEQUENCE_HEADER: u8 = 0;
    pub const NALU: u8 = 1;
    pub const END_OF_SEQUENCE: u8 = 2;
}

pub mod sound_format {
    pub const LINEAR_PCM: u8 = 0;
    pub const ADPCM: u8 = 1;
    pub const MP3: u8 = 2;
    pub const LINEAR_PCM_LE: u8 = 3;
    pub const NELLYMOSER_16KHZ: u8 = 4;
    pub const NELLYMOSER_8KHZ: u8 = 5;
    pub const NELLYMOSER: u8 = 6;
    pub const G711_A: u8 = 7;
    pub const G711_MU: u8 = 8;
    pub const AAC: u8 = 10;
    pub const SPEEX: u8 = 11;
    pub const OPUS: u8 = 13;
    pub const MP3_8KHZ: u8 = 14;
    pub const DEVICE_SPECIFIC: u8 = 15;
}

pub mod aac_packet_type {
    pub const SEQUENCE_HEADER: u8 = 0;
    pub const RAW: u8 = 1;
}

#[derive(Debug, Error)]
pub enum FlvError {
    #[error("The file does not begin with the FLV signature")]
    InvalidSignature,

    #[error("End of file")]
    Eof,

    #[error("Video tag payload is not a known codec's shape")]
    InvalidVideoTag,

    #[error("{0}")]
    Io(#[from] io::Error),
}

impl FlvError {
    pub fn code(&self) -> u32 {
        match self {
            FlvError::InvalidSignature => error_codes::SYSTEM_IO_INVALID,
            FlvError::Eof => error_codes::SYSTEM_FILE_EOF,
            FlvError::InvalidVideoTag => error_codes::FLV_INVALID_VIDEO_TAG,
            FlvError::Io(_) => error_codes::SYSTEM_IO_INVALID,
        }
    }

    /// End-of-stream is an expected sentinel, not a failure
    pub fn is_eof(&self) -> bool {
        matches!(self, FlvError::Eof)
    }
}

fn map_eof(error: io::Error) -> FlvError {
    if error.kind() == io::ErrorKind::UnexpectedEof {
        FlvError::Eof
    } else {
        FlvError::Io(error)
    }
}

/// Full size on disk of a tag with the given body size (tag header + body +
/// previous tag size)
pub fn size_tag(data_size: u32) -> u32 {
    11 + data_size + 4
}

/// Whether a video tag body is an AVC/HEVC/AV1 sequence header
pub fn is_video_sequence_header(body: &[u8]) -> bool {
    if body.len() < 2 {
        return false;
    }

    let codec = body[0] & 0x0f;
    let known = codec == video_codec::AVC || codec == video_codec::HEVC || codec == video_codec::AV1;

    known && body[1] == avc_packet_type::SEQUENCE_HEADER
}

/// Whether a video tag body is flagged as a keyframe
pub fn is_video_keyframe(body: &[u8]) -> bool {
    !body.is_empty() && (body[0] >> 4) == frame_type::KEY_FRAME
}

/// One tag as returned by [`FlvReader::read_tag`]
#[derive(Debug, Clone, PartialEq)]
pub struct FlvTag {
    pub tag_type: u8,
    pub timestamp: u32,
    pub body: Vec<u8>,
}

/// Reads FLV files (or any seekable byte source shaped like one).
pub struct FlvReader<R: Read + Seek> {
    source: R,
}

impl FlvReader<File> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<FlvReader<File>, FlvError> {
        Ok(FlvReader::new(File::open(path)?))
    }
}

impl<R: Read + Seek> FlvReader<R> {
    pub fn new(source: R) -> FlvReader<R> {
        FlvReader { source }
    }

    /// Reads and validates the 9 byte file header plus the first
    /// previous-tag-size field.  Returns the raw header bytes.
    pub fn read_header(&mut self) -> Result<[u8; 9], FlvError> {
        let mut header = [0_u8; 9];
        self.source.read_exact(&mut header).map_err(map_eof)?;

        if &header[0..3] != b"FLV" {
            return Err(FlvError::InvalidSignature);
        }

        let mut previous_tag_size = [0_u8; 4];
        self.source
            .read_exact(&mut previous_tag_size)
            .map_err(map_eof)?;

        Ok(header)
    }

    /// Reads the next tag header as `(type, body size, timestamp)`
    pub fn read_tag_header(&mut self) -> Result<(u8, u32, u32), FlvError> {
        let tag_type = self.source.read_u8().map_err(map_eof)?;
        let data_size = self.source.read_u24::<BigEndian>().map_err(map_eof)?;
        let timestamp_low = self.source.read_u24::<BigEndian>().map_err(map_eof)?;
        let timestamp_ext = self.source.read_u8().map_err(map_eof)?;
        let _stream_id = self.source.read_u24::<BigEndian>().map_err(map_eof)?;

        let timestamp = ((timestamp_ext as u32) << 24) | timestamp_low;
        Ok((tag_type, data_size, timestamp))
    }

    /// Reads a tag body of the given size and consumes the trailing
    /// previous-tag-size field
    pub fn read_tag_data(&mut self, size: u32) -> Result<Vec<u8>, FlvError> {
        let mut body = vec![0_u8; size as usize];
        self.source.read_exact(&mut body).map_err(map_eof)?;

        let _previous_tag_size = self.source.read_u32::<BigEndian>().map_err(map_eof)?;
        Ok(body)
    }

    /// Convenience wrapper reading a whole tag.  Returns `FlvError::Eof` at
    /// the end of the file.
    pub fn read_tag(&mut self) -> Result<FlvTag, FlvError> {
        let (tag_type, data_size, timestamp) = self.read_tag_header()?;
        let body = self.read_tag_data(data_size)?;

        Ok(FlvTag {
            tag_type,
            timestamp,
            body,
        })
    }

    /// Current read offset from the start of the file
    pub fn tellg(&mut self) -> Result<u64, FlvError> {
        Ok(self.source.seek(SeekFrom::Current(0))?)
    }

    pub fn seek(&mut self, offset: u64) -> Result<(), FlvError> {
        self.source.seek(SeekFrom::Start(offset))?;
        Ok(())
    }
}

/// Writes FLV files.
pub struct FlvWriter<W: Write> {
    sink: W,
}

impl FlvWriter<File> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<FlvWriter<File>, FlvError> {
        Ok(FlvWriter::new(File::create(path)?))
    }
}

impl<W: Write> FlvWriter<W> {
    pub fn new(sink: W) -> FlvWriter<W> {
        FlvWriter { sink }
    }

    /// Writes the 9 byte file header (with the requested stream flags) and
    /// the initial zero previous-tag-size
    pub fn write_header(&mut self, has_audio: bool, has_video: bool) -> Result<(), FlvError> {
        let flags = ((has_audio as u8) << 2) | (has_video as u8);
        let header = [b'F', b'L', b'V', 0x01, flags, 0x00, 0x00, 0x00, 0x09];

        self.sink.write_all(&header)?;
        self.sink.write_u32::<BigEndian>(0)?;
        Ok(())
    }

    pub fn write_tag(&mut self, tag_type: u8, timestamp: u32, body: &[u8]) -> Result<(), FlvError> {
        self.sink.write_u8(tag_type)?;
        self.sink.write_u24::<BigEndian>(body.len() as u32)?;
        self.sink.write_u24::<BigEndian>(timestamp & 0xffffff)?;
        self.sink.write_u8((timestamp >> 24) as u8)?;
        self.sink.write_u24::<BigEndian>(0)?; // stream id
        self.sink.write_all(body)?;
        self.sink.write_u32::<BigEndian>(11 + body.len() as u32)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), FlvError> {
        self.sink.flush()?;
        Ok(())
    }
}
