use super::*;
use std::io::Cursor;

fn boxed(name: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(8 + body.len());
    bytes.extend_from_slice(&(8 + body.len() as u32).to_be_bytes());
    bytes.extend_from_slice(name);
    bytes.extend_from_slice(body);
    bytes
}

fn full_box(name: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut with_version = vec![0_u8; 4];
    with_version.extend_from_slice(body);
    boxed(name, &with_version)
}

fn u32s(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|value| value.to_be_bytes()).collect()
}

fn hdlr(kind: &[u8; 4]) -> Vec<u8> {
    let mut body = vec![0_u8; 4]; // pre_defined
    body.extend_from_slice(kind);
    body.extend_from_slice(&[0_u8; 12]); // reserved
    body.push(0); // empty name
    full_box(b"hdlr", &body)
}

fn mdhd(timescale: u32) -> Vec<u8> {
    let mut body = vec![0_u8; 8]; // creation + modification
    body.extend_from_slice(&timescale.to_be_bytes());
    body.extend_from_slice(&[0_u8; 4]); // duration
    body.extend_from_slice(&[0x55, 0xc4, 0, 0]); // language + pre_defined
    full_box(b"mdhd", &body)
}

const AVCC: &[u8] = &[
    0x01, 0x64, 0x00, 0x1f, 0xff, 0xe1, 0x00, 0x02, 0x67, 0x64, 0x01, 0x00, 0x02, 0x68, 0xef,
];

fn avc1_entry() -> Vec<u8> {
    let mut body = vec![0_u8; 78];
    body.extend_from_slice(&boxed(b"avcC", AVCC));
    boxed(b"avc1", &body)
}

fn mp4a_entry() -> Vec<u8> {
    let mut body = vec![0_u8; 16]; // reserved + data ref + reserved
    body.extend_from_slice(&2_u16.to_be_bytes()); // channelcount
    body.extend_from_slice(&16_u16.to_be_bytes()); // samplesize
    body.extend_from_slice(&[0_u8; 4]); // pre_defined + reserved
    body.extend_from_slice(&((44100_u32) << 16).to_be_bytes()); // samplerate 16.16

    // esds: ES descriptor > DecoderConfig > DecoderSpecificInfo (the ASC)
    let dsi = [0x05_u8, 0x02, 0x12, 0x10];
    let mut dcfg = vec![0x04, 13 + dsi.len() as u8, 0x40, 0x15];
    dcfg.extend_from_slice(&[0_u8; 11]);
    dcfg.extend_from_slice(&dsi);
    let mut es = vec![0x03, 3 + dcfg.len() as u8, 0x00, 0x01, 0x00];
    es.extend_from_slice(&dcfg);

    body.extend_from_slice(&full_box(b"esds", &es));
    boxed(b"mp4a", &body)
}

fn stsd(entry: Vec<u8>) -> Vec<u8> {
    let mut body = 1_u32.to_be_bytes().to_vec();
    body.extend_from_slice(&entry);
    full_box(b"stsd", &body)
}

fn stbl_boxes(children: Vec<Vec<u8>>) -> Vec<u8> {
    let body: Vec<u8> = children.into_iter().flatten().collect();
    boxed(b"stbl", &body)
}

struct TrackSpec {
    handler: [u8; 4],
    timescale: u32,
    entry: Vec<u8>,
    stts: Vec<u32>,
    ctts: Option<Vec<u32>>,
    sizes: Vec<u32>,
    chunk_offset: u32,
    stss: Option<Vec<u32>>,
}

fn trak(track: TrackSpec) -> Vec<u8> {
    let mut tables = vec![
        stsd(track.entry),
        full_box(b"stts", &u32s(&track.stts)),
        full_box(b"stsz", &{
            let mut body = u32s(&[0, track.sizes.len() as u32]);
            body.extend_from_slice(&u32s(&track.sizes));
            body
        }),
        full_box(b"stsc", &u32s(&[1, 1, track.sizes.len() as u32, 1])),
        full_box(b"stco", &u32s(&[1, track.chunk_offset])),
    ];

    if let Some(ctts) = &track.ctts {
        tables.insert(2, full_box(b"ctts", &u32s(ctts)));
    }

    if let Some(stss) = &track.stss {
        let mut body = u32s(&[stss.len() as u32]);
        body.extend_from_slice(&u32s(stss));
        tables.push(full_box(b"stss", &body));
    }

    let minf = boxed(b"minf", &stbl_boxes(tables));

    let mut mdia_body = hdlr(&track.handler);
    mdia_body.extend_from_slice(&mdhd(track.timescale));
    mdia_body.extend_from_slice(&minf);
    let mdia = boxed(b"mdia", &mdia_body);

    boxed(b"trak", &mdia)
}

/// Builds a two-track file: two AVC video samples (40ms apart, first is a
/// sync sample) and two AAC audio samples, all in one mdat.
fn build_test_file() -> Vec<u8> {
    let video_samples: Vec<&[u8]> = vec![
        &[0x00, 0x00, 0x00, 0x02, 0x65, 0x88],
        &[0x00, 0x00, 0x00, 0x02, 0x41, 0x9a],
    ];
    let audio_samples: Vec<&[u8]> = vec![&[0x21, 0x22], &[0x23, 0x24]];

    let ftyp = boxed(b"ftyp", b"isom\x00\x00\x02\x00isomiso2");

    let mut mdat_payload = Vec::new();
    for sample in video_samples.iter().chain(audio_samples.iter()) {
        mdat_payload.extend_from_slice(sample);
    }
    let mdat = boxed(b"mdat", &mdat_payload);

    let video_offset = (ftyp.len() + 8) as u32;
    let audio_offset = video_offset + 12;

    let video_trak = trak(TrackSpec {
        handler: *b"vide",
        timescale: 1000,
        entry: avc1_entry(),
        stts: vec![1, 2, 40], // 2 samples, 40 units apart
        ctts: Some(vec![2, 1, 0, 1, 80]),
        sizes: vec![6, 6],
        chunk_offset: video_offset,
        stss: Some(vec![1]),
    });

    let audio_trak = trak(TrackSpec {
        handler: *b"soun",
        timescale: 44100,
        entry: mp4a_entry(),
        stts: vec![1, 2, 1024],
        ctts: None,
        sizes: vec![2, 2],
        chunk_offset: audio_offset,
        stss: None,
    });

    let mut moov_body = video_trak;
    moov_body.extend_from_slice(&audio_trak);
    let moov = boxed(b"moov", &moov_body);

    let mut file = ftyp;
    file.extend_from_slice(&mdat);
    file.extend_from_slice(&moov);
    file
}

#[test]
fn samples_come_out_in_decode_order_with_configs_first() {
    let file = build_test_file();
    let mut reader = Mp4Reader::new(Cursor::new(file)).unwrap();

    let first = reader.read_sample().unwrap();
    assert_eq!(first.handler_type, Mp4HandlerType::Video);
    assert_eq!(first.frame_trait, frame_trait::SEQUENCE_HEADER);
    assert_eq!(first.codec, 7);
    assert_eq!(first.payload, AVCC.to_vec());

    let second = reader.read_sample().unwrap();
    assert_eq!(second.handler_type, Mp4HandlerType::Audio);
    assert_eq!(second.frame_trait, frame_trait::SEQUENCE_HEADER);
    assert_eq!(second.codec, 10);
    assert_eq!(second.payload, vec![0x12, 0x10]);

    let third = reader.read_sample().unwrap();
    assert_eq!(third.handler_type, Mp4HandlerType::Video);
    assert_eq!(third.frame_trait, frame_trait::RAW);
    assert_eq!(third.dts, 0);
    assert_eq!(third.frame_type, 1, "stss marks the first sample as sync");
    assert_eq!(third.payload, vec![0x00, 0x00, 0x00, 0x02, 0x65, 0x88]);

    let fourth = reader.read_sample().unwrap();
    assert_eq!(fourth.handler_type, Mp4HandlerType::Audio);
    assert_eq!(fourth.dts, 0);
    assert_eq!(fourth.payload, vec![0x21, 0x22]);

    let fifth = reader.read_sample().unwrap();
    assert_eq!(fifth.handler_type, Mp4HandlerType::Audio);
    assert_eq!(fifth.dts, 23, "1024 units at 44.1 kHz is 23 ms");
    assert_eq!(fifth.payload, vec![0x23, 0x24]);

    let sixth = reader.read_sample().unwrap();
    assert_eq!(sixth.handler_type, Mp4HandlerType::Video);
    assert_eq!(sixth.dts, 40);
    assert_eq!(sixth.pts, 120, "ctts offset of 80 units applies");
    assert_eq!(sixth.frame_type, 2, "not in stss, so an inter frame");
}

#[test]
fn exhausted_reader_reports_eof_sentinel() {
    let file = build_test_file();
    let mut reader = Mp4Reader::new(Cursor::new(file)).unwrap();

    for _ in 0..6 {
        reader.read_sample().unwrap();
    }

    let error = reader.read_sample().unwrap_err();
    assert!(error.is_eof());
    assert_eq!(error.code(), crate::error_codes::SYSTEM_FILE_EOF);
}

#[test]
fn video_sample_converts_to_flv_tag() {
    let file = build_test_file();
    let mut reader = Mp4Reader::new(Cursor::new(file)).unwrap();

    let config = reader.read_sample().unwrap();
    let (tag_kind, time, body) = config.to_flv_tag();
    assert_eq!(tag_kind, 9);
    assert_eq!(time, 0);
    assert_eq!(&body[..5], &[0x17, 0x00, 0x00, 0x00, 0x00]);
    assert_eq!(&body[5..], AVCC);

    reader.read_sample().unwrap(); // audio config
    let video = reader.read_sample().unwrap();
    let (tag_kind, time, body) = video.to_flv_tag();
    assert_eq!(tag_kind, 9);
    assert_eq!(time, 0);
    assert_eq!(&body[..5], &[0x17, 0x01, 0x00, 0x00, 0x00]);
    assert_eq!(&body[5..], &[0x00, 0x00, 0x00, 0x02, 0x65, 0x88]);
}

#[test]
fn audio_sample_converts_to_flv_tag() {
    let file = build_test_file();
    let mut reader = Mp4Reader::new(Cursor::new(file)).unwrap();

    reader.read_sample().unwrap(); // video config
    let config = reader.read_sample().unwrap();
    let (tag_kind, time, body) = config.to_flv_tag();
    assert_eq!(tag_kind, 8);
    assert_eq!(time, 0);
    assert_eq!(body, vec![0xaf, 0x00, 0x12, 0x10]);

    reader.read_sample().unwrap(); // video frame
    let audio = reader.read_sample().unwrap();
    let (tag_kind, _, body) = audio.to_flv_tag();
    assert_eq!(tag_kind, 8);
    assert_eq!(body, vec![0xaf, 0x01, 0x21, 0x22]);
}

#[test]
fn moov_without_media_tracks_is_illegal_handler() {
    let ftyp = boxed(b"ftyp", b"isom\x00\x00\x02\x00isomiso2");
    let moov = boxed(b"moov", &boxed(b"mvhd", &[0_u8; 100]));

    let mut file = ftyp;
    file.extend_from_slice(&moov);

    match Mp4Reader::new(Cursor::new(file)) {
        Err(Mp4Error::IllegalHandler) => (),
        x => panic!("Expected IllegalHandler, got {:?}", x.err()),
    }
}

#[test]
fn file_without_moov_is_malformed() {
    let file = boxed(b"ftyp", b"isom\x00\x00\x02\x00isomiso2");

    match Mp4Reader::new(Cursor::new(file)) {
        Err(Mp4Error::Malformed(_)) => (),
        x => panic!("Expected Malformed, got {:?}", x.err()),
    }
}

#[test]
fn pts_offsets_sort_samples_by_decode_time_across_tracks() {
    let file = build_test_file();
    let mut reader = Mp4Reader::new(Cursor::new(file)).unwrap();

    let mut last_dts = 0;
    let mut count = 0;
    while let Ok(sample) = reader.read_sample() {
        assert!(sample.dts >= last_dts, "Samples must be in decode order");
        last_dts = sample.dts;
        count += 1;
    }

    assert_eq!(count, 6);
}
