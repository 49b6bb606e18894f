//! MP4 demuxing into timestamped samples, and samples into FLV tags.
//!
//! Only progressive (non-fragmented) files are handled: the reader walks the
//! top level boxes until it finds `moov`, decodes the sample tables of every
//! audio/video track, and then serves samples ordered by decode time.  Codec
//! configuration (avcC / AudioSpecificConfig) is surfaced first as synthetic
//! "sequence header" samples so that feeding the output straight into an FLV
//! file or an RTMP publish session produces a valid stream.

use crate::buffer::BytesReader;
use crate::error_codes;
use crate::flv::{sound_format, tag_type, video_codec};
use byteorder::{BigEndian, ReadBytesExt};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Mp4Error {
    #[error("End of file")]
    Eof,

    #[error("The file has no audio or video track")]
    IllegalHandler,

    #[error("Malformed mp4: {0}")]
    Malformed(&'static str),

    #[error("{0}")]
    Io(#[from] io::Error),
}

impl Mp4Error {
    pub fn code(&self) -> u32 {
        match self {
            Mp4Error::Eof => error_codes::SYSTEM_FILE_EOF,
            Mp4Error::IllegalHandler => error_codes::MP4_ILLEGAL_HANDLER,
            Mp4Error::Malformed(_) => error_codes::SYSTEM_IO_INVALID,
            Mp4Error::Io(_) => error_codes::SYSTEM_IO_INVALID,
        }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self, Mp4Error::Eof)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mp4HandlerType {
    Video,
    Audio,
}

/// Sample frame traits, matching the FLV packet-type bytes they turn into
pub mod frame_trait {
    pub const SEQUENCE_HEADER: u8 = 0;
    pub const RAW: u8 = 1;
}

/// One demuxed sample
#[derive(Debug, Clone, PartialEq)]
pub struct Mp4Sample {
    pub handler_type: Mp4HandlerType,
    /// FLV frame type for video (1 key, 2 inter); 0 for audio
    pub frame_type: u8,
    /// 0 for codec configuration, 1 for media payloads
    pub frame_trait: u8,
    pub dts: u32,
    pub pts: u32,
    /// FLV codec id for video, FLV sound format for audio
    pub codec: u8,
    pub sample_rate: u8,
    pub channels: u8,
    pub sound_bits: u8,
    pub payload: Vec<u8>,
}

impl Mp4Sample {
    /// Renders the sample as `(tag type, timestamp, body)` with the
    /// codec-specific FLV prelude in front of the payload.
    pub fn to_flv_tag(&self) -> (u8, u32, Vec<u8>) {
        let mut body = Vec::with_capacity(self.payload.len() + 5);

        if self.handler_type == Mp4HandlerType::Audio {
            body.push(
                (self.codec << 4)
                    | ((self.sample_rate & 0x03) << 2)
                    | ((self.sound_bits & 0x01) << 1)
                    | (self.channels & 0x01),
            );
            if self.codec == sound_format::AAC {
                body.push(if self.frame_trait == frame_trait::SEQUENCE_HEADER {
                    0
                } else {
                    1
                });
            }
            body.extend_from_slice(&self.payload);
            return (tag_type::AUDIO, self.dts, body);
        }

        body.push((self.frame_type << 4) | self.codec);
        if self.codec == video_codec::AVC
            || self.codec == video_codec::HEVC
            || self.codec == video_codec::AV1
        {
            body.push(if self.frame_trait == frame_trait::SEQUENCE_HEADER {
                0
            } else {
                1
            });
            let cts = self.pts.wrapping_sub(self.dts);
            body.extend_from_slice(&cts.to_be_bytes()[1..]);
        }
        body.extend_from_slice(&self.payload);

        (tag_type::VIDEO, self.dts, body)
    }
}

/// Where a queued sample's bytes come from
enum SamplePayload {
    /// Codec configuration carried inside `moov`
    Inline(Vec<u8>),
    /// Media bytes at an absolute file offset
    Stored { offset: u64, size: u32 },
}

struct QueuedSample {
    handler_type: Mp4HandlerType,
    frame_type: u8,
    frame_trait: u8,
    dts: u32,
    pts: u32,
    codec: u8,
    sample_rate: u8,
    channels: u8,
    sound_bits: u8,
    payload: SamplePayload,
}

/// Sequential reader over the samples of an MP4 file.
pub struct Mp4Reader<R: Read + Seek> {
    source: R,
    queue: Vec<QueuedSample>,
    position: usize,
}

impl Mp4Reader<File> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Mp4Reader<File>, Mp4Error> {
        Mp4Reader::new(File::open(path)?)
    }
}

impl<R: Read + Seek> Mp4Reader<R> {
    /// Walks the file until `moov` is parsed and prepares the sample queue.
    pub fn new(mut source: R) -> Result<Mp4Reader<R>, Mp4Error> {
        let moov = read_moov(&mut source)?;
        let tracks = parse_moov(&moov)?;

        if tracks.is_empty() {
            return Err(Mp4Error::IllegalHandler);
        }

        let mut queue = Vec::new();

        // Codec configurations first, as sequence-header samples at time 0.
        for track in &tracks {
            if track.config.is_empty() {
                continue;
            }

            queue.push(QueuedSample {
                handler_type: track.handler,
                frame_type: if track.handler == Mp4HandlerType::Video {
                    1
                } else {
                    0
                },
                frame_trait: frame_trait::SEQUENCE_HEADER,
                dts: 0,
                pts: 0,
                codec: track.codec,
                sample_rate: track.sample_rate,
                channels: track.channels,
                sound_bits: track.sound_bits,
                payload: SamplePayload::Inline(track.config.clone()),
            });
        }

        for track in &tracks {
            for sample in &track.samples {
                queue.push(QueuedSample {
                    handler_type: track.handler,
                    frame_type: match track.handler {
                        Mp4HandlerType::Video => {
                            if sample.keyframe {
                                1
                            } else {
                                2
                            }
                        }
                        Mp4HandlerType::Audio => 0,
                    },
                    frame_trait: frame_trait::RAW,
                    dts: sample.dts,
                    pts: sample.pts,
                    codec: track.codec,
                    sample_rate: track.sample_rate,
                    channels: track.channels,
                    sound_bits: track.sound_bits,
                    payload: SamplePayload::Stored {
                        offset: sample.offset,
                        size: sample.size,
                    },
                });
            }
        }

        // Stable: configuration samples stay ahead of media at dts 0.
        queue.sort_by_key(|sample| sample.dts);

        Ok(Mp4Reader {
            source,
            queue,
            position: 0,
        })
    }

    /// Returns the next sample in decode order, or `Mp4Error::Eof` once the
    /// file is exhausted.
    pub fn read_sample(&mut self) -> Result<Mp4Sample, Mp4Error> {
        let queued = match self.queue.get(self.position) {
            Some(queued) => queued,
            None => return Err(Mp4Error::Eof),
        };
        self.position += 1;

        let payload = match &queued.payload {
            SamplePayload::Inline(bytes) => bytes.clone(),
            SamplePayload::Stored { offset, size } => {
                self.source.seek(SeekFrom::Start(*offset))?;
                let mut bytes = vec![0_u8; *size as usize];
                self.source.read_exact(&mut bytes)?;
                bytes
            }
        };

        Ok(Mp4Sample {
            handler_type: queued.handler_type,
            frame_type: queued.frame_type,
            frame_trait: queued.frame_trait,
            dts: queued.dts,
            pts: queued.pts,
            codec: queued.codec,
            sample_rate: queued.sample_rate,
            channels: queued.channels,
            sound_bits: queued.sound_bits,
            payload,
        })
    }
}

// ---- moov parsing -----------------------------------------------------

struct TrackSample {
    offset: u64,
    size: u32,
    dts: u32,
    pts: u32,
    keyframe: bool,
}

struct Track {
    handler: Mp4HandlerType,
    codec: u8,
    config: Vec<u8>,
    sample_rate: u8,
    channels: u8,
    sound_bits: u8,
    samples: Vec<TrackSample>,
}

/// Reads top-level boxes until `moov` is found and returns its body.
fn read_moov<R: Read + Seek>(source: &mut R) -> Result<Vec<u8>, Mp4Error> {
    loop {
        let size = match source.read_u32::<BigEndian>() {
            Ok(size) => size,
            Err(ref error) if error.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(Mp4Error::Malformed("no moov box before end of file"))
            }
            Err(error) => return Err(error.into()),
        };

        let mut box_type = [0_u8; 4];
        source.read_exact(&mut box_type)?;

        let body_size = match size {
            0 => None, // box extends to the end of the file
            1 => {
                let large_size = source.read_u64::<BigEndian>()?;
                Some(large_size.saturating_sub(16))
            }
            _ => {
                if size < 8 {
                    return Err(Mp4Error::Malformed("box size smaller than its header"));
                }
                Some((size - 8) as u64)
            }
        };

        if &box_type == b"moov" {
            let body_size = body_size.ok_or(Mp4Error::Malformed("moov cannot be unsized"))?;
            let mut body = vec![0_u8; body_size as usize];
            source.read_exact(&mut body)?;
            return Ok(body);
        }

        match body_size {
            Some(size) => {
                source.seek(SeekFrom::Current(size as i64))?;
            }
            None => return Err(Mp4Error::Malformed("no moov box before end of file")),
        }
    }
}

/// Iterates `(fourcc, body)` over the child boxes of a container body
struct BoxIter<'a> {
    reader: BytesReader<'a>,
}

impl<'a> BoxIter<'a> {
    fn new(body: &'a [u8]) -> BoxIter<'a> {
        BoxIter {
            reader: BytesReader::new(body),
        }
    }
}

impl<'a> Iterator for BoxIter<'a> {
    type Item = ([u8; 4], &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let size = self.reader.read_u32().ok()?;
        let fourcc_bytes = self.reader.read_bytes(4).ok()?;
        let mut fourcc = [0_u8; 4];
        fourcc.copy_from_slice(fourcc_bytes);

        if size < 8 {
            return None;
        }

        let body = self.reader.read_bytes(size as usize - 8).ok()?;
        Some((fourcc, body))
    }
}

fn find_box<'a>(body: &'a [u8], name: &[u8; 4]) -> Option<&'a [u8]> {
    BoxIter::new(body).find(|(fourcc, _)| fourcc == name).map(|(_, body)| body)
}

fn parse_moov(moov: &[u8]) -> Result<Vec<Track>, Mp4Error> {
    let mut tracks = Vec::new();

    for (fourcc, body) in BoxIter::new(moov) {
        if &fourcc != b"trak" {
            continue;
        }

        if let Some(track) = parse_trak(body)? {
            tracks.push(track);
        }
    }

    Ok(tracks)
}

fn parse_trak(trak: &[u8]) -> Result<Option<Track>, Mp4Error> {
    let mdia = match find_box(trak, b"mdia") {
        Some(body) => body,
        None => return Ok(None),
    };

    let handler = match find_box(mdia, b"hdlr").and_then(parse_hdlr) {
        Some(handler) => handler,
        None => return Ok(None), // hint tracks and the like
    };

    let timescale = find_box(mdia, b"mdhd")
        .and_then(parse_mdhd)
        .ok_or(Mp4Error::Malformed("trak is missing its mdhd"))?;

    let stbl = find_box(mdia, b"minf")
        .and_then(|minf| find_box(minf, b"stbl"))
        .ok_or(Mp4Error::Malformed("trak is missing its sample tables"))?;

    let stsd = find_box(stbl, b"stsd").ok_or(Mp4Error::Malformed("missing stsd"))?;
    let codec_entry = parse_stsd(stsd, handler)?;

    let durations = find_box(stbl, b"stts")
        .map(parse_stts)
        .transpose()?
        .unwrap_or_default();
    let composition_offsets = find_box(stbl, b"ctts").map(parse_ctts).transpose()?;
    let sizes = find_box(stbl, b"stsz")
        .map(parse_stsz)
        .transpose()?
        .unwrap_or_default();
    let chunk_map = find_box(stbl, b"stsc")
        .map(parse_stsc)
        .transpose()?
        .unwrap_or_default();
    let chunk_offsets = match find_box(stbl, b"stco") {
        Some(body) => parse_stco(body)?,
        None => find_box(stbl, b"co64")
            .map(parse_co64)
            .transpose()?
            .unwrap_or_default(),
    };
    let sync_samples = find_box(stbl, b"stss").map(parse_stss).transpose()?;

    let offsets = sample_offsets(&sizes, &chunk_map, &chunk_offsets);

    let mut samples = Vec::with_capacity(sizes.len());
    let mut dts_units: u64 = 0;

    for (index, size) in sizes.iter().enumerate() {
        let duration = durations.get(index).copied().unwrap_or(0);
        let cts_units = composition_offsets
            .as_ref()
            .and_then(|offsets| offsets.get(index).copied())
            .unwrap_or(0);

        let dts = units_to_ms(dts_units, timescale);
        let pts = units_to_ms(dts_units.wrapping_add(cts_units as u64), timescale);

        let keyframe = match &sync_samples {
            Some(table) => table.contains(&((index + 1) as u32)),
            None => true,
        };

        samples.push(TrackSample {
            offset: offsets.get(index).copied().unwrap_or(0),
            size: *size,
            dts,
            pts,
            keyframe,
        });

        dts_units += duration as u64;
    }

    Ok(Some(Track {
        handler,
        codec: codec_entry.codec,
        config: codec_entry.config,
        sample_rate: codec_entry.sample_rate,
        channels: codec_entry.channels,
        sound_bits: codec_entry.sound_bits,
        samples,
    }))
}

fn units_to_ms(units: u64, timescale: u32) -> u32 {
    if timescale == 0 {
        return units as u32;
    }

    (units * 1000 / timescale as u64) as u32
}

fn parse_hdlr(hdlr: &[u8]) -> Option<Mp4HandlerType> {
    // version/flags (4) + pre_defined (4) + handler_type (4)
    if hdlr.len() < 12 {
        return None;
    }

    match &hdlr[8..12] {
        b"vide" => Some(Mp4HandlerType::Video),
        b"soun" => Some(Mp4HandlerType::Audio),
        _ => None,
    }
}

fn parse_mdhd(mdhd: &[u8]) -> Option<u32> {
    let mut reader = BytesReader::new(mdhd);
    let version = reader.read_u8().ok()?;
    reader.skip(3).ok()?; // flags

    // creation and modification times are 4 or 8 bytes each by version
    let time_field_size = if version == 1 { 8 } else { 4 };
    reader.skip(time_field_size * 2).ok()?;

    reader.read_u32().ok()
}

struct CodecEntry {
    codec: u8,
    config: Vec<u8>,
    sample_rate: u8,
    channels: u8,
    sound_bits: u8,
}

fn parse_stsd(stsd: &[u8], handler: Mp4HandlerType) -> Result<CodecEntry, Mp4Error> {
    let mut reader = BytesReader::new(stsd);
    reader
        .skip(8) // version/flags + entry count
        .map_err(|_| Mp4Error::Malformed("stsd too short"))?;

    let entry_size = reader
        .read_u32()
        .map_err(|_| Mp4Error::Malformed("stsd entry header"))? as usize;
    let fourcc = reader
        .read_bytes(4)
        .map_err(|_| Mp4Error::Malformed("stsd entry header"))?;
    let body = reader
        .read_bytes(entry_size.saturating_sub(8))
        .map_err(|_| Mp4Error::Malformed("stsd entry body"))?;

    match (handler, fourcc) {
        (Mp4HandlerType::Video, b"avc1") => Ok(CodecEntry {
            codec: video_codec::AVC,
            config: visual_entry_config(body, b"avcC")?,
            sample_rate: 0,
            channels: 0,
            sound_bits: 0,
        }),

        (Mp4HandlerType::Video, b"hvc1") | (Mp4HandlerType::Video, b"hev1") => Ok(CodecEntry {
            codec: video_codec::HEVC,
            config: visual_entry_config(body, b"hvcC")?,
            sample_rate: 0,
            channels: 0,
            sound_bits: 0,
        }),

        (Mp4HandlerType::Video, b"av01") => Ok(CodecEntry {
            codec: video_codec::AV1,
            config: visual_entry_config(body, b"av1C")?,
            sample_rate: 0,
            channels: 0,
            sound_bits: 0,
        }),

        (Mp4HandlerType::Audio, b"mp4a") => parse_mp4a(body),

        _ => Err(Mp4Error::Malformed("unsupported stsd codec entry")),
    }
}

/// Finds a configuration child box behind the 78 fixed bytes of a
/// VisualSampleEntry
fn visual_entry_config(body: &[u8], name: &[u8; 4]) -> Result<Vec<u8>, Mp4Error> {
    if body.len() < 78 {
        return Err(Mp4Error::Malformed("visual sample entry too short"));
    }

    find_box(&body[78..], name)
        .map(|config| config.to_vec())
        .ok_or(Mp4Error::Malformed("missing codec configuration box"))
}

fn parse_mp4a(body: &[u8]) -> Result<CodecEntry, Mp4Error> {
    // AudioSampleEntry: 6 reserved + 2 data_reference_index + 8 reserved +
    // channelcount (2) + samplesize (2) + 4 pre_defined/reserved +
    // samplerate (16.16 fixed)
    if body.len() < 28 {
        return Err(Mp4Error::Malformed("audio sample entry too short"));
    }

    let mut reader = BytesReader::new(body);
    reader.skip(16).map_err(|_| Mp4Error::Malformed("mp4a"))?;
    let channel_count = reader.read_u16().map_err(|_| Mp4Error::Malformed("mp4a"))?;
    let sample_size = reader.read_u16().map_err(|_| Mp4Error::Malformed("mp4a"))?;
    reader.skip(4).map_err(|_| Mp4Error::Malformed("mp4a"))?;
    let sample_rate = reader.read_u32().map_err(|_| Mp4Error::Malformed("mp4a"))? >> 16;

    let esds = find_box(&body[28..], b"esds")
        .ok_or(Mp4Error::Malformed("mp4a entry is missing its esds"))?;
    let config = esds_decoder_specific_info(esds)
        .ok_or(Mp4Error::Malformed("esds carries no AudioSpecificConfig"))?;

    Ok(CodecEntry {
        codec: sound_format::AAC,
        config,
        sample_rate: match sample_rate {
            x if x >= 44100 => 3,
            x if x >= 22050 => 2,
            x if x >= 11025 => 1,
            _ => 0,
        },
        channels: if channel_count >= 2 { 1 } else { 0 },
        sound_bits: if sample_size == 8 { 0 } else { 1 },
    })
}

/// Walks the ES descriptor tree looking for the DecoderSpecificInfo bytes
fn esds_decoder_specific_info(esds: &[u8]) -> Option<Vec<u8>> {
    fn walk(reader: &mut BytesReader) -> Option<Vec<u8>> {
        while !reader.is_empty() {
            let tag = reader.read_u8().ok()?;

            // expandable length: 7 bits per byte, high bit continues
            let mut length: usize = 0;
            loop {
                let byte = reader.read_u8().ok()?;
                length = (length << 7) | (byte & 0x7f) as usize;
                if byte & 0x80 == 0 {
                    break;
                }
            }

            match tag {
                0x03 => {
                    // ES descriptor: ES_ID + stream priority/flags, then
                    // nested descriptors (flags assumed clear)
                    reader.skip(3).ok()?;
                }
                0x04 => {
                    // DecoderConfig: object type + stream type + buffer size
                    // + max/avg bitrate, then nested descriptors
                    reader.skip(13).ok()?;
                }
                0x05 => {
                    let bytes = reader.read_bytes(length).ok()?;
                    return Some(bytes.to_vec());
                }
                _ => {
                    reader.skip(length).ok()?;
                }
            }
        }

        None
    }

    let mut reader = BytesReader::new(esds);
    reader.skip(4).ok()?; // version/flags
    walk(&mut reader)
}

/// Expands `stts` into one duration per sample
fn parse_stts(stts: &[u8]) -> Result<Vec<u32>, Mp4Error> {
    let mut reader = BytesReader::new(stts);
    reader.skip(4).map_err(|_| Mp4Error::Malformed("stts"))?;
    let entry_count = reader.read_u32().map_err(|_| Mp4Error::Malformed("stts"))?;

    let mut durations = Vec::new();
    for _ in 0..entry_count {
        let sample_count = reader.read_u32().map_err(|_| Mp4Error::Malformed("stts"))?;
        let delta = reader.read_u32().map_err(|_| Mp4Error::Malformed("stts"))?;
        for _ in 0..sample_count {
            durations.push(delta);
        }
    }

    Ok(durations)
}

/// Expands `ctts` into one composition offset per sample
fn parse_ctts(ctts: &[u8]) -> Result<Vec<u32>, Mp4Error> {
    let mut reader = BytesReader::new(ctts);
    reader.skip(4).map_err(|_| Mp4Error::Malformed("ctts"))?;
    let entry_count = reader.read_u32().map_err(|_| Mp4Error::Malformed("ctts"))?;

    let mut offsets = Vec::new();
    for _ in 0..entry_count {
        let sample_count = reader.read_u32().map_err(|_| Mp4Error::Malformed("ctts"))?;
        let offset = reader.read_u32().map_err(|_| Mp4Error::Malformed("ctts"))?;
        for _ in 0..sample_count {
            offsets.push(offset);
        }
    }

    Ok(offsets)
}

fn parse_stsz(stsz: &[u8]) -> Result<Vec<u32>, Mp4Error> {
    let mut reader = BytesReader::new(stsz);
    reader.skip(4).map_err(|_| Mp4Error::Malformed("stsz"))?;
    let uniform_size = reader.read_u32().map_err(|_| Mp4Error::Malformed("stsz"))?;
    let sample_count = reader.read_u32().map_err(|_| Mp4Error::Malformed("stsz"))?;

    if uniform_size != 0 {
        return Ok(vec![uniform_size; sample_count as usize]);
    }

    let mut sizes = Vec::with_capacity(sample_count as usize);
    for _ in 0..sample_count {
        sizes.push(reader.read_u32().map_err(|_| Mp4Error::Malformed("stsz"))?);
    }

    Ok(sizes)
}

struct ChunkMapEntry {
    first_chunk: u32,
    samples_per_chunk: u32,
}

fn parse_stsc(stsc: &[u8]) -> Result<Vec<ChunkMapEntry>, Mp4Error> {
    let mut reader = BytesReader::new(stsc);
    reader.skip(4).map_err(|_| Mp4Error::Malformed("stsc"))?;
    let entry_count = reader.read_u32().map_err(|_| Mp4Error::Malformed("stsc"))?;

    let mut entries = Vec::with_capacity(entry_count as usize);
    for _ in 0..entry_count {
        let first_chunk = reader.read_u32().map_err(|_| Mp4Error::Malformed("stsc"))?;
        let samples_per_chunk = reader.read_u32().map_err(|_| Mp4Error::Malformed("stsc"))?;
        let _sample_description_index =
            reader.read_u32().map_err(|_| Mp4Error::Malformed("stsc"))?;

        entries.push(ChunkMapEntry {
            first_chunk,
            samples_per_chunk,
        });
    }

    Ok(entries)
}

fn parse_stco(stco: &[u8]) -> Result<Vec<u64>, Mp4Error> {
    let mut reader = BytesReader::new(stco);
    reader.skip(4).map_err(|_| Mp4Error::Malformed("stco"))?;
    let entry_count = reader.read_u32().map_err(|_| Mp4Error::Malformed("stco"))?;

    let mut offsets = Vec::with_capacity(entry_count as usize);
    for _ in 0..entry_count {
        offsets.push(reader.read_u32().map_err(|_| Mp4Error::Malformed("stco"))? as u64);
    }

    Ok(offsets)
}

fn parse_co64(co64: &[u8]) -> Result<Vec<u64>, Mp4Error> {
    let mut reader = BytesReader::new(co64);
    reader.skip(4).map_err(|_| Mp4Error::Malformed("co64"))?;
    let entry_count = reader.read_u32().map_err(|_| Mp4Error::Malformed("co64"))?;

    let mut offsets = Vec::with_capacity(entry_count as usize);
    for _ in 0..entry_count {
        offsets.push(reader.read_u64().map_err(|_| Mp4Error::Malformed("co64"))?);
    }

    Ok(offsets)
}

fn parse_stss(stss: &[u8]) -> Result<Vec<u32>, Mp4Error> {
    let mut reader = BytesReader::new(stss);
    reader.skip(4).map_err(|_| Mp4Error::Malformed("stss"))?;
    let entry_count = reader.read_u32().map_err(|_| Mp4Error::Malformed("stss"))?;

    let mut samples = Vec::with_capacity(entry_count as usize);
    for _ in 0..entry_count {
        samples.push(reader.read_u32().map_err(|_| Mp4Error::Malformed("stss"))?);
    }

    Ok(samples)
}

/// Resolves per-sample absolute file offsets out of the chunk tables
fn sample_offsets(
    sizes: &[u32],
    chunk_map: &[ChunkMapEntry],
    chunk_offsets: &[u64],
) -> Vec<u64> {
    let mut offsets = Vec::with_capacity(sizes.len());
    let mut sample_index = 0;

    for (chunk_index, chunk_offset) in chunk_offsets.iter().enumerate() {
        let chunk_number = (chunk_index + 1) as u32;

        // last stsc entry whose first_chunk is <= this chunk
        let samples_in_chunk = chunk_map
            .iter()
            .rev()
            .find(|entry| entry.first_chunk <= chunk_number)
            .map(|entry| entry.samples_per_chunk)
            .unwrap_or(0);

        let mut offset_in_chunk = 0_u64;
        for _ in 0..samples_in_chunk {
            if sample_index >= sizes.len() {
                return offsets;
            }

            offsets.push(chunk_offset + offset_in_chunk);
            offset_in_chunk += sizes[sample_index] as u64;
            sample_index += 1;
        }
    }

    offsets
}

#[cfg(test)]
mod tests;
