//! The blocking RTMP client session.
//!
//! A [`Session`] owns the transport, the chunk serializer/deserializer pair,
//! the outstanding transaction counter and the per-session codec bookkeeping.
//! Every operation blocks on the calling thread, bounded by the configured
//! socket timeouts; a timeout leaves the session in an unknown protocol state
//! and the caller must discard it.
//!
//! ```no_run
//! use sml_rtmp::session::Session;
//!
//! # fn main() -> Result<(), sml_rtmp::session::SessionError> {
//! let mut session = Session::connect("rtmp://example.com/live/stream")?;
//! session.handshake()?;
//! session.connect_app()?;
//! session.play()?;
//!
//! loop {
//!     let packet = session.read_packet()?;
//!     println!("got type {} of {} bytes", packet.packet_type, packet.payload.len());
//! }
//! # }
//! ```

mod config;
mod errors;
mod server_info;
mod state;

pub use self::config::SessionConfig;
pub use self::errors::{SessionError, SessionErrorKind};
pub use self::server_info::ServerInfo;
pub use self::state::SessionState;

use crate::buffer::BytesReader;
use crate::chunk_io::{ChunkDeserializer, ChunkSerializer, MAX_CHUNK_SIZE};
use crate::flv::sound_format;
use crate::handshake::{self, HandshakeKind};
use crate::media::aac::{self, AacCodec};
use crate::media::h264::{self, nalu_type, AvcSequenceState};
use crate::media::MediaError;
use crate::messages::{
    type_ids, MessagePayload, PeerBandwidthLimitType, RtmpMessage, UserControlEventType,
};
use crate::time::RtmpTimestamp;
use crate::url::RtmpUrl;
use bytes::Bytes;
use log::{debug, info, trace};
use sml_amf0::{Amf0Object, Amf0Value};
use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

const READ_BUFFER_SIZE: usize = 4096;

/// A message handed to or received from a session, in FLV terms.
///
/// The payload buffer is owned by the caller once returned from
/// [`Session::read_packet`]; dropping it releases the memory.
#[derive(Debug, Clone, PartialEq)]
pub struct RtmpPacket {
    /// RTMP message type id: 8 audio, 9 video, 18 script data
    pub packet_type: u8,
    pub timestamp: u32,
    pub payload: Bytes,
}

impl RtmpPacket {
    pub fn is_audio(&self) -> bool {
        self.packet_type == type_ids::AUDIO
    }

    pub fn is_video(&self) -> bool {
        self.packet_type == type_ids::VIDEO
    }

    pub fn is_script(&self) -> bool {
        self.packet_type == type_ids::AMF0_DATA
    }

    /// True for `onMetaData` / `@setDataFrame` script packets
    pub fn is_on_metadata(&self) -> bool {
        if !self.is_script() {
            return false;
        }

        match sml_amf0::decode_first(&self.payload) {
            Ok((Amf0Value::Utf8String(name), _)) => {
                name == "onMetaData" || name == "@setDataFrame"
            }
            _ => false,
        }
    }
}

/// A blocking RTMP client session over an arbitrary transport.
pub struct Session<S: Read + Write> {
    config: SessionConfig,
    url: RtmpUrl,
    state: SessionState,
    transport: S,

    serializer: ChunkSerializer,
    deserializer: ChunkDeserializer,

    /// Messages produced ahead of their consumption: aggregate children and
    /// anything that arrived while a command reply was being awaited
    pending: VecDeque<MessagePayload>,

    next_transaction_id: f64,
    stream_id: u32,
    server_info: ServerInfo,

    peer_window_ack_size: u32,
    bytes_received: u64,
    bytes_sent: u64,
    last_acknowledged: u64,

    avc: AvcSequenceState,
    aac_config: Option<Vec<u8>>,
}

impl Session<TcpStream> {
    /// Parses the url, resolves the host and opens a TCP connection with the
    /// default configuration.
    pub fn connect(url: &str) -> Result<Session<TcpStream>, SessionError> {
        Session::connect_with_config(url, SessionConfig::new())
    }

    pub fn connect_with_config(
        url: &str,
        config: SessionConfig,
    ) -> Result<Session<TcpStream>, SessionError> {
        let parsed = RtmpUrl::parse(url)?;

        let addresses: Vec<_> = (parsed.host.as_str(), parsed.port)
            .to_socket_addrs()
            .map_err(|_| SessionErrorKind::DnsResolveFailed {
                host: parsed.host.clone(),
            })?
            .collect();

        let address = match addresses.first() {
            Some(address) => *address,
            None => {
                return Err(SessionErrorKind::DnsResolveFailed {
                    host: parsed.host.clone(),
                }
                .into())
            }
        };

        debug!("resolved {} to {}", parsed.host, address);

        // Resolution succeeded; from here on failures are connection level.
        let transport = TcpStream::connect(address)?;
        transport.set_nodelay(true)?;
        transport.set_read_timeout(Some(Duration::from_millis(config.receive_timeout_ms)))?;
        transport.set_write_timeout(Some(Duration::from_millis(config.send_timeout_ms)))?;

        info!("connected to {} ({})", parsed.host, address);

        let mut session = Session::from_parts(parsed, config, transport);
        session.state = SessionState::Connected;
        Ok(session)
    }

    /// Re-applies the configured socket timeouts, e.g. after changing the
    /// configuration.
    pub fn set_timeouts(
        &mut self,
        receive_timeout_ms: u64,
        send_timeout_ms: u64,
    ) -> Result<(), SessionError> {
        self.config.receive_timeout_ms = receive_timeout_ms;
        self.config.send_timeout_ms = send_timeout_ms;
        self.transport
            .set_read_timeout(Some(Duration::from_millis(receive_timeout_ms)))?;
        self.transport
            .set_write_timeout(Some(Duration::from_millis(send_timeout_ms)))?;
        Ok(())
    }
}

impl<S: Read + Write> Session<S> {
    /// Builds a session over a caller-provided transport that is already
    /// connected.  Useful for tunnelled sockets and for tests.
    pub fn with_transport(
        url: &str,
        config: SessionConfig,
        transport: S,
    ) -> Result<Session<S>, SessionError> {
        let parsed = RtmpUrl::parse(url)?;
        let mut session = Session::from_parts(parsed, config, transport);
        session.state = SessionState::Connected;
        Ok(session)
    }

    fn from_parts(url: RtmpUrl, config: SessionConfig, transport: S) -> Session<S> {
        Session {
            config,
            url,
            state: SessionState::Created,
            transport,
            serializer: ChunkSerializer::new(),
            deserializer: ChunkDeserializer::new(),
            pending: VecDeque::new(),
            next_transaction_id: 1.0,
            stream_id: 0,
            server_info: ServerInfo::default(),
            peer_window_ack_size: 0,
            bytes_received: 0,
            bytes_sent: 0,
            last_acknowledged: 0,
            avc: AvcSequenceState::new(),
            aac_config: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn url(&self) -> &RtmpUrl {
        &self.url
    }

    /// Identity the server reported in its `connect` response
    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    /// Consumes the session.  Dropping the transport closes the socket.
    pub fn close(mut self) {
        self.state = SessionState::Closed;
    }

    /// Performs the RTMP handshake.  The variant is chosen by
    /// [`SessionConfig::complex_handshake`]; a digest request degrades to the
    /// simple form when the server does not sign its response.
    pub fn handshake(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Connected {
            return Err(self.invalid_state());
        }

        let kind = if self.config.complex_handshake {
            HandshakeKind::Digest
        } else {
            HandshakeKind::Simple
        };

        handshake::handshake_with_server(&mut self.transport, kind)?;
        self.state = SessionState::Handshaked;
        Ok(())
    }

    /// Issues the `connect` command and waits for its `_result`.
    pub fn connect_app(&mut self) -> Result<&ServerInfo, SessionError> {
        if self.state != SessionState::Handshaked {
            return Err(self.invalid_state());
        }

        let mut command_object = Amf0Object::new();
        command_object.set("app", Amf0Value::Utf8String(self.url.app.clone()));
        command_object.set(
            "flashVer",
            Amf0Value::Utf8String(self.config.flash_version.clone()),
        );
        if let Some(swf_url) = &self.config.swf_url {
            command_object.set("swfUrl", Amf0Value::Utf8String(swf_url.clone()));
        }
        command_object.set("tcUrl", Amf0Value::Utf8String(self.url.tc_url()));
        command_object.set("fpad", Amf0Value::Boolean(false));
        command_object.set("capabilities", Amf0Value::Number(239.0));
        command_object.set("audioCodecs", Amf0Value::Number(3575.0));
        command_object.set("videoCodecs", Amf0Value::Number(252.0));
        command_object.set("videoFunction", Amf0Value::Number(1.0));
        if let Some(page_url) = &self.config.page_url {
            command_object.set("pageUrl", Amf0Value::Utf8String(page_url.clone()));
        }
        command_object.set("objectEncoding", Amf0Value::Number(0.0));

        let additional = match &self.config.connect_args {
            Some(args) => vec![Amf0Value::Object(args.clone())],
            None => Vec::new(),
        };

        let transaction_id = self.next_transaction_id();
        self.send_command(
            "connect",
            transaction_id,
            Amf0Value::Object(command_object),
            additional,
            0,
        )?;

        self.send_message(
            RtmpMessage::WindowAcknowledgement {
                size: self.config.window_ack_size,
            },
            RtmpTimestamp::new(0),
            0,
        )?;

        let (_command_object, additional) = self.await_result(transaction_id)?;
        let information = match additional.into_iter().next() {
            Some(Amf0Value::Object(properties)) => properties,
            _ => {
                return Err(SessionErrorKind::ConnectionRequestRejected {
                    description: "connect result carried no information object".to_string(),
                }
                .into())
            }
        };

        let code = match information.get("code") {
            Some(Amf0Value::Utf8String(code)) => code.clone(),
            _ => String::new(),
        };

        if code != "NetConnection.Connect.Success" {
            let description = match information.get("description") {
                Some(Amf0Value::Utf8String(text)) => text.clone(),
                _ => code.clone(),
            };

            return Err(SessionErrorKind::ConnectionRequestRejected { description }.into());
        }

        self.server_info = ServerInfo::from_connect_information(&information);
        self.state = SessionState::AppConnected;
        info!(
            "connected to app '{}' (server {}.{}.{}.{})",
            self.url.app,
            self.server_info.major,
            self.server_info.minor,
            self.server_info.revision,
            self.server_info.build
        );

        Ok(&self.server_info)
    }

    /// Starts playback of the session's stream.
    pub fn play(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::AppConnected {
            return Err(self.invalid_state());
        }

        self.create_stream()?;
        self.announce_chunk_size()?;

        let stream = self.url.stream_with_query();
        let transaction_id = self.next_transaction_id();
        let stream_id = self.stream_id;
        self.send_command(
            "play",
            transaction_id,
            Amf0Value::Null,
            vec![
                Amf0Value::Utf8String(stream.clone()),
                Amf0Value::Number(-2.0),
            ],
            stream_id,
        )?;

        let buffer_length = self.config.playback_buffer_length_ms;
        self.send_message(
            RtmpMessage::UserControl {
                event_type: UserControlEventType::SetBufferLength,
                stream_id: Some(stream_id),
                buffer_length: Some(buffer_length),
                timestamp: None,
            },
            RtmpTimestamp::new(0),
            0,
        )?;

        info!("playing stream '{}'", stream);
        self.state = SessionState::Playing { stream };
        Ok(())
    }

    /// Publishes the session's stream in `live` mode, using the FMLE command
    /// sequence, and waits for the server to acknowledge it.
    pub fn publish(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::AppConnected {
            return Err(self.invalid_state());
        }

        let stream = self.url.stream_with_query();

        let transaction_id = self.next_transaction_id();
        self.send_command(
            "releaseStream",
            transaction_id,
            Amf0Value::Null,
            vec![Amf0Value::Utf8String(stream.clone())],
            0,
        )?;

        let transaction_id = self.next_transaction_id();
        self.send_command(
            "FCPublish",
            transaction_id,
            Amf0Value::Null,
            vec![Amf0Value::Utf8String(stream.clone())],
            0,
        )?;

        self.create_stream()?;
        self.announce_chunk_size()?;

        let transaction_id = self.next_transaction_id();
        let stream_id = self.stream_id;
        self.send_command(
            "publish",
            transaction_id,
            Amf0Value::Null,
            vec![
                Amf0Value::Utf8String(stream.clone()),
                Amf0Value::Utf8String("live".to_string()),
            ],
            stream_id,
        )?;

        self.await_on_status("NetStream.Publish.Start")?;

        info!("publishing stream '{}'", stream);
        self.state = SessionState::Publishing { stream };
        Ok(())
    }

    /// Reads the next media/script message.
    ///
    /// Protocol control traffic is handled inline and never surfaces here;
    /// aggregate messages are split apart and their children are returned one
    /// at a time before the socket is read again.
    pub fn read_packet(&mut self) -> Result<RtmpPacket, SessionError> {
        loop {
            if let Some(payload) = self.pending.pop_front() {
                return Ok(RtmpPacket {
                    packet_type: payload.type_id,
                    timestamp: payload.timestamp.value,
                    payload: payload.data,
                });
            }

            let payload = self.recv_from_wire()?;
            if payload.type_id == type_ids::AGGREGATE {
                self.disassemble_aggregate(payload)?;
                continue;
            }

            return Ok(RtmpPacket {
                packet_type: payload.type_id,
                timestamp: payload.timestamp.value,
                payload: payload.data,
            });
        }
    }

    /// Sends one media/script message on the created stream.  The payload is
    /// copied into the chunk stream; the caller keeps ownership of its
    /// buffer.
    pub fn write_packet(
        &mut self,
        packet_type: u8,
        timestamp: u32,
        payload: &[u8],
    ) -> Result<(), SessionError> {
        let message = MessagePayload {
            timestamp: RtmpTimestamp::new(timestamp),
            type_id: packet_type,
            message_stream_id: self.stream_id,
            data: Bytes::copy_from_slice(payload),
        };

        let bytes = self.serializer.serialize(&message, false)?;
        self.bytes_sent += bytes.len() as u64;
        self.transport.write_all(&bytes)?;
        Ok(())
    }

    /// Writes one raw audio frame.
    ///
    /// For AAC (`sound_format` 10) the frame must be in ADTS framing; it is
    /// demuxed, an AudioSpecificConfig sequence-header tag is emitted the
    /// first time, and each contained access unit goes out as its own tag.
    /// The explicit sound parameters override what the ADTS header implies.
    /// Other formats are passed through with a single tag header byte.
    pub fn write_audio_raw_frame(
        &mut self,
        format: u8,
        sound_rate: u8,
        sound_size: u8,
        sound_type: u8,
        frame: &[u8],
        timestamp: u32,
    ) -> Result<(), SessionError> {
        if format != sound_format::AAC {
            let codec = AacCodec {
                object_type: 0,
                sampling_frequency_index: 0,
                channel_configuration: 0,
                sound_format: format,
                sound_rate,
                sound_size,
                sound_type,
                aac_packet_type: 0,
            };

            let tag = aac::mux_aac2flv(frame, &codec);
            return self.write_packet(type_ids::AUDIO, timestamp, &tag);
        }

        if !aac::is_adts(frame) {
            return Err(MediaError::AacRequiredAdts.into());
        }

        let mut reader = BytesReader::new(frame);
        while !reader.is_empty() {
            let (raw, mut codec) = aac::adts_demux(&mut reader)?;

            codec.sound_format = format;
            codec.sound_rate = sound_rate;
            codec.sound_size = sound_size;
            codec.sound_type = sound_type;

            if self.aac_config.is_none() {
                let config = aac::mux_sequence_header(&codec);

                let mut header_codec = codec.clone();
                header_codec.aac_packet_type = 0;
                let tag = aac::mux_aac2flv(&config, &header_codec);
                self.write_packet(type_ids::AUDIO, timestamp, &tag)?;

                self.aac_config = Some(config);
            }

            codec.aac_packet_type = 1;
            let tag = aac::mux_aac2flv(raw, &codec);
            self.write_packet(type_ids::AUDIO, timestamp, &tag)?;
        }

        Ok(())
    }

    /// Writes a batch of H.264 NALUs in Annex-B framing.
    ///
    /// SPS/PPS NALUs update the parameter set cache; when either changed, a
    /// fresh AVC sequence header precedes the next coded frame.  Recoverable
    /// conditions (duplicated parameter sets, frames before the first
    /// sequence header) do not abort the batch; the last one is reported
    /// after every frame was processed and can be identified with
    /// [`SessionError::is_recoverable_media_error`].
    pub fn write_h264_raw_frames(
        &mut self,
        frames: &[u8],
        dts: u32,
        pts: u32,
    ) -> Result<(), SessionError> {
        let nalus = h264::annexb_split(frames).map_err(SessionError::from)?;

        let mut last_warning: Option<SessionError> = None;
        for frame in nalus {
            if frame.is_empty() {
                continue;
            }

            match self.write_h264_raw_frame(frame, dts, pts) {
                Ok(()) => (),
                Err(error) => {
                    if error.is_recoverable_media_error() {
                        trace!("recoverable h264 write condition: {}", error);
                        last_warning = Some(error);
                        continue;
                    }

                    return Err(error);
                }
            }
        }

        match last_warning {
            Some(warning) => Err(warning),
            None => Ok(()),
        }
    }

    fn write_h264_raw_frame(
        &mut self,
        frame: &[u8],
        dts: u32,
        pts: u32,
    ) -> Result<(), SessionError> {
        if h264::is_sps(frame) {
            return self.avc.on_sps(frame).map_err(SessionError::from);
        }

        if h264::is_pps(frame) {
            return self.avc.on_pps(frame).map_err(SessionError::from);
        }

        let nut = frame[0] & 0x1f;
        if nut != nalu_type::IDR && nut != nalu_type::NON_IDR && nut != nalu_type::AUD {
            return Ok(());
        }

        if let Some(tag) = self.avc.take_sequence_header() {
            self.write_packet(type_ids::VIDEO, dts, &tag)?;
        }

        // AUD only splits access units; nothing to send for it.
        if nut == nalu_type::AUD {
            return Ok(());
        }

        if !self.avc.sequence_header_sent() {
            return Err(MediaError::H264DropBeforeSpsPps.into());
        }

        let frame_kind = if nut == nalu_type::IDR {
            crate::flv::frame_type::KEY_FRAME
        } else {
            crate::flv::frame_type::INTER_FRAME
        };

        let payload = h264::mux_ipb_frame(frame);
        let tag = h264::mux_avc2flv(
            frame_kind,
            crate::flv::avc_packet_type::NALU,
            pts.wrapping_sub(dts),
            &payload,
        );

        self.write_packet(type_ids::VIDEO, dts, &tag)
    }

    /// Runs a server-driven bandwidth check.  Valid once the app connection
    /// is established; servers that support it start the probe instead of a
    /// normal play/publish exchange.
    pub fn bandwidth_check(
        &mut self,
    ) -> Result<crate::bandwidth::BandwidthReport, SessionError> {
        if self.state != SessionState::AppConnected {
            return Err(self.invalid_state());
        }

        crate::bandwidth::bandwidth_check(self)
    }

    // ---- internals ----------------------------------------------------

    #[cfg(test)]
    pub(crate) fn transport_for_tests(&self) -> &S {
        &self.transport
    }

    /// Re-queues a message so later `read_packet` calls return it
    pub(crate) fn queue_for_later(&mut self, payload: MessagePayload) {
        self.pending.push_back(payload);
    }

    fn invalid_state(&self) -> SessionError {
        SessionErrorKind::SessionInInvalidState {
            current_state: self.state.clone(),
        }
        .into()
    }

    fn next_transaction_id(&mut self) -> f64 {
        let id = self.next_transaction_id;
        self.next_transaction_id += 1.0;
        id
    }

    fn announce_chunk_size(&mut self) -> Result<(), SessionError> {
        let bytes = self
            .serializer
            .set_max_chunk_size(self.config.chunk_size, RtmpTimestamp::new(0))?;
        self.bytes_sent += bytes.len() as u64;
        self.transport.write_all(&bytes)?;
        Ok(())
    }

    pub(crate) fn send_command(
        &mut self,
        name: &str,
        transaction_id: f64,
        command_object: Amf0Value,
        additional_arguments: Vec<Amf0Value>,
        stream_id: u32,
    ) -> Result<(), SessionError> {
        self.send_message(
            RtmpMessage::Amf0Command {
                command_name: name.to_string(),
                transaction_id,
                command_object,
                additional_arguments,
            },
            RtmpTimestamp::new(0),
            stream_id,
        )
    }

    pub(crate) fn send_message(
        &mut self,
        message: RtmpMessage,
        timestamp: RtmpTimestamp,
        stream_id: u32,
    ) -> Result<(), SessionError> {
        let payload = MessagePayload::from_rtmp_message(message, timestamp, stream_id)?;
        let bytes = self.serializer.serialize(&payload, false)?;
        self.bytes_sent += bytes.len() as u64;
        self.transport.write_all(&bytes)?;
        Ok(())
    }

    fn create_stream(&mut self) -> Result<(), SessionError> {
        let transaction_id = self.next_transaction_id();
        self.send_command("createStream", transaction_id, Amf0Value::Null, Vec::new(), 0)?;

        let (_command_object, additional) = self.await_result(transaction_id)?;
        let stream_id = match additional.into_iter().next() {
            Some(Amf0Value::Number(id)) => id as u32,
            _ => return Err(SessionErrorKind::CreateStreamResponseHadNoStreamNumber.into()),
        };

        debug!("server created stream {}", stream_id);
        self.stream_id = stream_id;
        Ok(())
    }

    /// Waits for the `_result`/`_error` paired to `transaction_id`.  Any
    /// media or data arriving first is queued for later `read_packet` calls.
    fn await_result(
        &mut self,
        transaction_id: f64,
    ) -> Result<(Amf0Value, Vec<Amf0Value>), SessionError> {
        loop {
            let payload = self.recv_from_wire()?;

            if payload.type_id == type_ids::AGGREGATE {
                self.disassemble_aggregate(payload)?;
                continue;
            }

            if payload.type_id == type_ids::AMF0_COMMAND {
                if let RtmpMessage::Amf0Command {
                    command_name,
                    transaction_id: reply_id,
                    command_object,
                    additional_arguments,
                } = payload.to_rtmp_message()?
                {
                    if reply_id == transaction_id
                        && (command_name == "_result" || command_name == "_error")
                    {
                        if command_name == "_error" {
                            let code = status_code(&additional_arguments)
                                .unwrap_or_else(|| "_error".to_string());
                            return Err(SessionErrorKind::RequestRejected { code }.into());
                        }

                        return Ok((command_object, additional_arguments));
                    }

                    trace!(
                        "queueing command '{}' (tx {}) while awaiting tx {}",
                        command_name,
                        reply_id,
                        transaction_id
                    );
                }
            }

            self.pending.push_back(payload);
        }
    }

    /// Waits for an `onStatus` whose code matches `expected_code`.
    fn await_on_status(&mut self, expected_code: &str) -> Result<(), SessionError> {
        loop {
            let payload = self.recv_from_wire()?;

            if payload.type_id == type_ids::AGGREGATE {
                self.disassemble_aggregate(payload)?;
                continue;
            }

            if payload.type_id == type_ids::AMF0_COMMAND {
                if let RtmpMessage::Amf0Command {
                    command_name,
                    additional_arguments,
                    ..
                } = payload.to_rtmp_message()?
                {
                    if command_name == "onStatus" {
                        let code = status_code(&additional_arguments)
                            .ok_or(SessionErrorKind::InvalidOnStatusArguments)?;

                        if code == expected_code {
                            return Ok(());
                        }

                        if code.contains("Failed") || code.contains("Rejected") {
                            return Err(SessionErrorKind::RequestRejected { code }.into());
                        }

                        debug!("ignoring onStatus '{}'", code);
                        continue;
                    }
                }
            }

            self.pending.push_back(payload);
        }
    }

    /// Reads messages off the wire until one survives inline protocol
    /// control handling.
    pub(crate) fn recv_from_wire(&mut self) -> Result<MessagePayload, SessionError> {
        loop {
            let next = self.deserializer.get_next_message(&[])?;
            let payload = match next {
                Some(payload) => payload,
                None => {
                    let mut buffer = [0_u8; READ_BUFFER_SIZE];
                    let bytes_read = self.transport.read(&mut buffer)?;
                    if bytes_read == 0 {
                        self.state = SessionState::Closed;
                        return Err(SessionErrorKind::Disconnected.into());
                    }

                    self.bytes_received += bytes_read as u64;
                    self.maybe_acknowledge()?;

                    match self.deserializer.get_next_message(&buffer[..bytes_read])? {
                        Some(payload) => payload,
                        None => continue,
                    }
                }
            };

            if let Some(payload) = self.handle_protocol_control(payload)? {
                return Ok(payload);
            }
        }
    }

    /// Interprets protocol control messages inline.  Returns the payload
    /// when it is not protocol control and should surface to the caller.
    fn handle_protocol_control(
        &mut self,
        payload: MessagePayload,
    ) -> Result<Option<MessagePayload>, SessionError> {
        match payload.type_id {
            type_ids::SET_CHUNK_SIZE => {
                if let RtmpMessage::SetChunkSize { size } = payload.to_rtmp_message()? {
                    if size > MAX_CHUNK_SIZE {
                        return Err(SessionErrorKind::ChunkSizeTooLarge { size }.into());
                    }

                    debug!("peer chunk size is now {}", size);
                    self.deserializer.set_max_chunk_size(size as usize)?;
                }
                Ok(None)
            }

            type_ids::ABORT => {
                trace!("peer aborted a chunk stream");
                Ok(None)
            }

            type_ids::ACKNOWLEDGEMENT => {
                trace!("peer acknowledged {} bytes", self.bytes_sent);
                Ok(None)
            }

            type_ids::WINDOW_ACKNOWLEDGEMENT_SIZE => {
                if let RtmpMessage::WindowAcknowledgement { size } = payload.to_rtmp_message()? {
                    debug!("peer window acknowledgement size is {}", size);
                    self.peer_window_ack_size = size;
                }
                Ok(None)
            }

            type_ids::SET_PEER_BANDWIDTH => {
                if let RtmpMessage::SetPeerBandwidth { size, limit_type } =
                    payload.to_rtmp_message()?
                {
                    debug!("peer bandwidth set to {} ({:?})", size, limit_type);
                    if limit_type == PeerBandwidthLimitType::Hard {
                        self.peer_window_ack_size = size;
                    }
                }
                Ok(None)
            }

            type_ids::USER_CONTROL => {
                match payload.to_rtmp_message() {
                    Ok(RtmpMessage::UserControl {
                        event_type,
                        stream_id,
                        buffer_length: _,
                        timestamp,
                    }) => match event_type {
                        UserControlEventType::PingRequest => {
                            self.send_message(
                                RtmpMessage::UserControl {
                                    event_type: UserControlEventType::PingResponse,
                                    stream_id: None,
                                    buffer_length: None,
                                    timestamp,
                                },
                                RtmpTimestamp::new(0),
                                0,
                            )?;
                        }
                        event => {
                            debug!("user control {:?} on stream {:?}", event, stream_id);
                        }
                    },
                    Ok(_) => (),
                    Err(error) => {
                        // Unknown control events from exotic servers are not
                        // fatal; log and drop.
                        debug!("dropping unparseable user control message: {}", error);
                    }
                }
                Ok(None)
            }

            _ => Ok(Some(payload)),
        }
    }

    fn maybe_acknowledge(&mut self) -> Result<(), SessionError> {
        if self.peer_window_ack_size == 0 {
            return Ok(());
        }

        if self.bytes_received - self.last_acknowledged >= self.peer_window_ack_size as u64 {
            let sequence_number = self.bytes_received as u32;
            self.send_message(
                RtmpMessage::Acknowledgement { sequence_number },
                RtmpTimestamp::new(0),
                0,
            )?;
            self.last_acknowledged = self.bytes_received;
        }

        Ok(())
    }

    /// Splits a type 22 aggregate into its FLV-shaped sub-records.
    ///
    /// Sub-record timestamps are absolute on their own timeline; they get
    /// rebased so the first one aligns with the aggregate's header timestamp.
    /// Children are queued and drained by `read_packet` before the socket is
    /// read again.
    fn disassemble_aggregate(&mut self, message: MessagePayload) -> Result<(), SessionError> {
        let mut reader = BytesReader::new(&message.data);
        let mut delta: Option<i64> = None;

        fn malformed() -> SessionError {
            SessionErrorKind::InvalidAggregateMessage.into()
        }

        while !reader.is_empty() {
            let tag_type = reader.read_u8().map_err(|_| malformed())?;
            let data_size = reader.read_u24().map_err(|_| malformed())?;
            let timestamp_low = reader.read_u24().map_err(|_| malformed())?;
            let timestamp_ext = reader.read_u8().map_err(|_| malformed())?;
            let _stream_id = reader.read_u24().map_err(|_| malformed())?;

            let sub_timestamp =
                (((timestamp_ext as u32) << 24) | timestamp_low) & 0x7fffffff;

            let rebase = match delta {
                Some(value) => value,
                None => {
                    let value = message.timestamp.value as i64 - sub_timestamp as i64;
                    delta = Some(value);
                    value
                }
            };

            let timestamp = (sub_timestamp as i64 + rebase) as u32;

            let body = reader
                .read_bytes(data_size as usize)
                .map_err(|_| malformed())?;
            let _previous_tag_size = reader.read_u32().map_err(|_| malformed())?;

            self.pending.push_back(MessagePayload {
                timestamp: RtmpTimestamp::new(timestamp),
                type_id: tag_type,
                message_stream_id: message.message_stream_id,
                data: Bytes::copy_from_slice(body),
            });
        }

        Ok(())
    }
}

/// Extracts `info.code` from an `onStatus`/`_error` argument list
fn status_code(arguments: &[Amf0Value]) -> Option<String> {
    for argument in arguments {
        let properties = match argument {
            Amf0Value::Object(properties) => properties,
            _ => continue,
        };

        if let Some(Amf0Value::Utf8String(code)) = properties.get("code") {
            return Some(code.clone());
        }
    }

    None
}
