//! Server-driven bandwidth probing.
//!
//! The server orchestrates two phases over AMF0 commands on the connection
//! stream: a download ("play") phase where it floods the client with
//! `onSrsBandCheckPlaying` packets, and an upload ("publish") phase where the
//! client sends `onSrsBandCheckPublishing` packets of growing size.  The
//! client measures wall time and byte counters for each direction and
//! reports the achieved kilobits per second.

use crate::messages::{type_ids, RtmpMessage};
use crate::session::{Session, SessionError};
use log::{debug, info};
use sml_amf0::{Amf0Object, Amf0Value};
use std::io::{Read, Write};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// The measurements of one completed bandwidth check
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BandwidthReport {
    pub start_ms: u64,
    pub end_ms: u64,
    pub play_kbps: u32,
    pub publish_kbps: u32,
    pub play_bytes: u64,
    pub publish_bytes: u64,
    pub play_duration_ms: u32,
    pub publish_duration_ms: u32,
}

fn unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(0)
}

fn kbps(bytes: u64, duration_ms: u32) -> u32 {
    if duration_ms == 0 {
        return 0;
    }

    (bytes * 8 / duration_ms as u64) as u32
}

pub(crate) fn bandwidth_check<S: Read + Write>(
    session: &mut Session<S>,
) -> Result<BandwidthReport, SessionError> {
    let mut report = BandwidthReport {
        start_ms: unix_ms(),
        ..BandwidthReport::default()
    };

    let mut play_started: Option<(Instant, u64)> = None;
    let mut publish_started: Option<(Instant, u64)> = None;

    loop {
        let payload = session.recv_from_wire()?;
        if payload.type_id != type_ids::AMF0_COMMAND {
            // Probe traffic of other shapes still counts toward the
            // download measurement.
            continue;
        }

        let (command_name, command_object) = match payload.to_rtmp_message()? {
            RtmpMessage::Amf0Command {
                command_name,
                command_object,
                ..
            } => (command_name, command_object),
            _ => continue,
        };

        match command_name.as_str() {
            "onSrsBandCheckStartPlayBytes" => {
                debug!("bandwidth check: play phase starting");
                play_started = Some((Instant::now(), session.bytes_received()));
                reply(session, "onSrsBandCheckStartingPlayBytes")?;
            }

            "onSrsBandCheckPlaying" => {
                // Payload bytes were already counted by the receive path.
            }

            "onSrsBandCheckStopPlayBytes" => {
                if let Some((started, bytes_before)) = play_started.take() {
                    report.play_duration_ms = started.elapsed().as_millis() as u32;
                    report.play_bytes = session.bytes_received() - bytes_before;
                    report.play_kbps = kbps(report.play_bytes, report.play_duration_ms);
                }

                reply(session, "onSrsBandCheckStoppedPlayBytes")?;
            }

            "onSrsBandCheckStartPublishBytes" => {
                let duration_ms = number_property(&command_object, "duration_ms").unwrap_or(0.0);

                debug!(
                    "bandwidth check: publish phase starting for {} ms",
                    duration_ms
                );
                reply(session, "onSrsBandCheckStartingPublishBytes")?;

                let started = Instant::now();
                publish_started = Some((started, session.bytes_sent()));
                publish_payloads(session, started, duration_ms as u64)?;
            }

            "onSrsBandCheckStopPublishBytes" => {
                if let Some((started, bytes_before)) = publish_started.take() {
                    report.publish_duration_ms = started.elapsed().as_millis() as u32;
                    report.publish_bytes = session.bytes_sent() - bytes_before;
                    report.publish_kbps = kbps(report.publish_bytes, report.publish_duration_ms);
                }

                reply(session, "onSrsBandCheckStoppedPublishBytes")?;
            }

            "onSrsBandCheckFinished" => {
                reply(session, "finalClientPacket")?;
                report.end_ms = unix_ms();

                info!(
                    "bandwidth check finished: play {} kbps, publish {} kbps",
                    report.play_kbps, report.publish_kbps
                );
                return Ok(report);
            }

            _ => {
                // Not part of the probe; keep it for the regular read path.
                session.queue_for_later(payload);
            }
        }
    }
}

fn reply<S: Read + Write>(session: &mut Session<S>, name: &str) -> Result<(), SessionError> {
    session.send_command(name, 0.0, Amf0Value::Null, Vec::new(), 0)
}

/// Sends `onSrsBandCheckPublishing` packets with doubling payloads until the
/// server-granted duration elapses.
fn publish_payloads<S: Read + Write>(
    session: &mut Session<S>,
    started: Instant,
    duration_ms: u64,
) -> Result<(), SessionError> {
    let mut filler_size = 128_usize;

    while (started.elapsed().as_millis() as u64) < duration_ms {
        let mut object = Amf0Object::new();
        object.set("limit_kbps", Amf0Value::Number(0.0));
        object.set("payload", Amf0Value::Utf8String("A".repeat(filler_size)));

        session.send_command(
            "onSrsBandCheckPublishing",
            0.0,
            Amf0Value::Object(object),
            Vec::new(),
            0,
        )?;

        if filler_size < 32_768 {
            filler_size *= 2;
        }
    }

    Ok(())
}

fn number_property(value: &Amf0Value, name: &str) -> Option<f64> {
    match value {
        Amf0Value::Object(properties) | Amf0Value::EcmaArray(properties) => {
            match properties.get(name) {
                Some(Amf0Value::Number(number)) => Some(*number),
                _ => None,
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk_io::{ChunkDeserializer, ChunkSerializer};
    use crate::messages::MessagePayload;
    use crate::session::SessionConfig;
    use crate::time::RtmpTimestamp;
    use std::io::{self, Cursor};

    struct ScriptedTransport {
        incoming: Cursor<Vec<u8>>,
        outgoing: Vec<u8>,
    }

    impl io::Read for ScriptedTransport {
        fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
            // Dribble the script out in small reads so byte counters advance
            // the way they would on a socket, not all at once.
            let capped = buffer.len().min(64);
            let bytes_read = self.incoming.read(&mut buffer[..capped])?;
            if bytes_read == 0 {
                return Err(io::Error::new(io::ErrorKind::WouldBlock, "script exhausted"));
            }

            Ok(bytes_read)
        }
    }

    impl io::Write for ScriptedTransport {
        fn write(&mut self, buffer: &[u8]) -> io::Result<usize> {
            self.outgoing.extend_from_slice(buffer);
            Ok(buffer.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn server_command(serializer: &mut ChunkSerializer, name: &str, object: Amf0Value) -> Vec<u8> {
        let payload = MessagePayload::from_rtmp_message(
            RtmpMessage::Amf0Command {
                command_name: name.to_string(),
                transaction_id: 0.0,
                command_object: object,
                additional_arguments: vec![],
            },
            RtmpTimestamp::new(0),
            0,
        )
        .unwrap();

        serializer.serialize(&payload, false).unwrap()
    }

    #[test]
    fn full_probe_round_trip() {
        let mut serializer = ChunkSerializer::new();

        let mut incoming = vec![3_u8];
        incoming.extend_from_slice(&[0x11; 1536]);
        incoming.extend_from_slice(&[0x22; 1536]);

        incoming.extend(server_command(
            &mut serializer,
            "onSrsBandCheckStartPlayBytes",
            Amf0Value::Null,
        ));

        let mut filler = Amf0Object::new();
        filler.set("payload", Amf0Value::Utf8String("B".repeat(2000)));
        incoming.extend(server_command(
            &mut serializer,
            "onSrsBandCheckPlaying",
            Amf0Value::Object(filler),
        ));

        incoming.extend(server_command(
            &mut serializer,
            "onSrsBandCheckStopPlayBytes",
            Amf0Value::Null,
        ));

        let mut start_publish = Amf0Object::new();
        start_publish.set("duration_ms", Amf0Value::Number(0.0));
        start_publish.set("interval_ms", Amf0Value::Number(0.0));
        incoming.extend(server_command(
            &mut serializer,
            "onSrsBandCheckStartPublishBytes",
            Amf0Value::Object(start_publish),
        ));

        incoming.extend(server_command(
            &mut serializer,
            "onSrsBandCheckStopPublishBytes",
            Amf0Value::Null,
        ));

        incoming.extend(server_command(
            &mut serializer,
            "onSrsBandCheckFinished",
            Amf0Value::Null,
        ));

        let transport = ScriptedTransport {
            incoming: Cursor::new(incoming),
            outgoing: Vec::new(),
        };

        let mut session = Session::with_transport(
            "rtmp://example.com/app/stream",
            SessionConfig::new(),
            transport,
        )
        .unwrap();
        session.handshake().unwrap();

        let report = bandwidth_check(&mut session).unwrap();

        assert!(report.play_bytes >= 2000, "Probe bytes must be counted");
        assert!(report.end_ms >= report.start_ms);
        assert_eq!(report.publish_bytes, 0, "Zero duration publish sends nothing");

        // The client must have replied with the full command ladder.
        let replies = decode_command_names(&session);
        assert_eq!(
            replies,
            vec![
                "onSrsBandCheckStartingPlayBytes",
                "onSrsBandCheckStoppedPlayBytes",
                "onSrsBandCheckStartingPublishBytes",
                "onSrsBandCheckStoppedPublishBytes",
                "finalClientPacket",
            ]
        );
    }

    fn decode_command_names(session: &Session<ScriptedTransport>) -> Vec<String> {
        let bytes = &session.transport_for_tests().outgoing[1537 + 1536..];

        let mut deserializer = ChunkDeserializer::new();
        let mut names = Vec::new();

        let mut message = deserializer.get_next_message(bytes).unwrap();
        while let Some(payload) = message {
            if payload.type_id == type_ids::AMF0_COMMAND {
                if let RtmpMessage::Amf0Command { command_name, .. } =
                    payload.to_rtmp_message().unwrap()
                {
                    names.push(command_name);
                }
            }

            message = deserializer.get_next_message(&[]).unwrap();
        }

        names
    }
}
