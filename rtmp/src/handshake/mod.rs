//! RTMP handshaking from the client side.
//!
//! Two variants exist on the wire.  The *simple* handshake of the public
//! specification exchanges random bytes and echoes them back.  The *digest*
//! handshake buries HMAC-SHA256 signatures inside the same 1536 byte packets;
//! servers that stream H.264 to Flash clients historically required it.
//!
//! [`ClientHandshake`] builds and checks packets without performing any I/O,
//! and [`handshake_with_server`] drives it over a blocking transport.  When a
//! digest handshake is requested but the server's S1 carries no valid digest,
//! the client falls back to the simple echo response on the same connection,
//! so plain servers still complete.

mod digest;
mod errors;

pub use self::errors::HandshakeError;

use log::{debug, warn};
use rand::Rng;
use std::io::{Read, Write};

pub const RTMP_VERSION: u8 = 3;
pub const PACKET_SIZE: usize = 1536;

/// Which handshake variant to offer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeKind {
    Simple,
    Digest,
}

/// Pure (transport-free) client handshake state.
pub struct ClientHandshake {
    kind: HandshakeKind,
    c1: [u8; PACKET_SIZE],
    c1_digest: Option<[u8; digest::DIGEST_SIZE]>,
}

impl ClientHandshake {
    pub fn new(kind: HandshakeKind) -> ClientHandshake {
        let mut c1 = [0_u8; PACKET_SIZE];
        rand::thread_rng().fill(&mut c1[..]);

        // time: epoch zero; version: zeroed for simple, stamped by the signer
        // for digest.
        c1[0..8].copy_from_slice(&[0; 8]);

        let c1_digest = match kind {
            HandshakeKind::Simple => None,
            HandshakeKind::Digest => Some(digest::sign_c1(&mut c1)),
        };

        ClientHandshake {
            kind,
            c1,
            c1_digest,
        }
    }

    /// The bytes to send first: C0 (version byte) followed by C1.
    pub fn c0_and_c1(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(1 + PACKET_SIZE);
        bytes.push(RTMP_VERSION);
        bytes.extend_from_slice(&self.c1);
        bytes
    }

    /// Consumes the server's S0, S1 and S2 and produces C2.
    ///
    /// Returns the C2 bytes together with the handshake variant that actually
    /// completed, which may have degraded from digest to simple.
    pub fn process_response(
        &self,
        s0: u8,
        s1: &[u8],
        s2: &[u8],
    ) -> Result<(Vec<u8>, HandshakeKind), HandshakeError> {
        if s0 != RTMP_VERSION {
            return Err(HandshakeError::BadVersionId);
        }

        if s1.len() != PACKET_SIZE || s2.len() != PACKET_SIZE {
            return Err(HandshakeError::IncompletePacket);
        }

        if self.kind == HandshakeKind::Digest {
            if let (Some(server_digest), Some(client_digest)) =
                (digest::verify_s1(s1), self.c1_digest)
            {
                if !digest::verify_s2(s2, &client_digest) {
                    // Some servers echo C1 instead of signing S2; tolerated,
                    // matching the reference clients.
                    debug!("S2 digest did not verify, accepting anyway");
                }

                let mut c2 = [0_u8; PACKET_SIZE];
                rand::thread_rng().fill(&mut c2[..]);
                digest::sign_c2(&mut c2, &server_digest);
                return Ok((c2.to_vec(), HandshakeKind::Digest));
            }

            warn!("server S1 carried no valid digest, falling back to simple handshake");
        }

        // Simple form: C2 echoes S1, any S2 is accepted.
        Ok((s1.to_vec(), HandshakeKind::Simple))
    }
}

/// Runs a full client handshake over a blocking transport.
///
/// Returns the variant that completed.
pub fn handshake_with_server<S: Read + Write>(
    stream: &mut S,
    kind: HandshakeKind,
) -> Result<HandshakeKind, HandshakeError> {
    let handshake = ClientHandshake::new(kind);

    stream.write_all(&handshake.c0_and_c1())?;

    let mut s0 = [0_u8; 1];
    stream.read_exact(&mut s0)?;

    let mut s1 = [0_u8; PACKET_SIZE];
    stream.read_exact(&mut s1)?;

    let mut s2 = [0_u8; PACKET_SIZE];
    stream.read_exact(&mut s2)?;

    let (c2, completed_kind) = handshake.process_response(s0[0], &s1, &s2)?;
    stream.write_all(&c2)?;

    debug!("handshake completed using the {:?} form", completed_kind);
    Ok(completed_kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c0_and_c1_start_with_version_byte() {
        let handshake = ClientHandshake::new(HandshakeKind::Simple);
        let bytes = handshake.c0_and_c1();

        assert_eq!(bytes.len(), 1 + PACKET_SIZE);
        assert_eq!(bytes[0], 3);
    }

    #[test]
    fn simple_c1_has_zeroed_time_and_version_fields() {
        let handshake = ClientHandshake::new(HandshakeKind::Simple);
        let bytes = handshake.c0_and_c1();

        assert_eq!(&bytes[1..9], &[0_u8; 8]);
    }

    #[test]
    fn simple_response_echoes_s1() {
        let handshake = ClientHandshake::new(HandshakeKind::Simple);

        let s1 = [0x42_u8; PACKET_SIZE];
        let s2 = [0x17_u8; PACKET_SIZE];
        let (c2, kind) = handshake.process_response(3, &s1, &s2).unwrap();

        assert_eq!(kind, HandshakeKind::Simple);
        assert_eq!(c2, s1.to_vec());
    }

    #[test]
    fn rejects_bad_version_byte() {
        let handshake = ClientHandshake::new(HandshakeKind::Simple);

        let s1 = [0_u8; PACKET_SIZE];
        let s2 = [0_u8; PACKET_SIZE];
        match handshake.process_response(6, &s1, &s2) {
            Err(HandshakeError::BadVersionId) => (),
            x => panic!("Expected BadVersionId, got {:?}", x.map(|_| ())),
        }
    }

    #[test]
    fn digest_request_falls_back_to_simple_against_plain_server() {
        let handshake = ClientHandshake::new(HandshakeKind::Digest);

        // A plain server's S1 is pure random with no digest in it.
        let s1 = [0x55_u8; PACKET_SIZE];
        let s2 = [0x66_u8; PACKET_SIZE];
        let (c2, kind) = handshake.process_response(3, &s1, &s2).unwrap();

        assert_eq!(kind, HandshakeKind::Simple);
        assert_eq!(c2, s1.to_vec(), "Fallback must echo S1 like a simple client");
    }

    #[test]
    fn completes_against_in_memory_echo_server() {
        use std::io::{self, Cursor};

        // Scripted transport: replays a canned S0S1S2 and records writes.
        struct ScriptedServer {
            incoming: Cursor<Vec<u8>>,
            outgoing: Vec<u8>,
        }

        impl io::Read for ScriptedServer {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                self.incoming.read(buf)
            }
        }

        impl io::Write for ScriptedServer {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.outgoing.extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut response = vec![3_u8];
        response.extend_from_slice(&[0x11_u8; PACKET_SIZE]); // S1
        response.extend_from_slice(&[0x22_u8; PACKET_SIZE]); // S2

        let mut server = ScriptedServer {
            incoming: Cursor::new(response),
            outgoing: Vec::new(),
        };

        let kind = handshake_with_server(&mut server, HandshakeKind::Simple).unwrap();
        assert_eq!(kind, HandshakeKind::Simple);

        // C0 + C1 + C2 were written; C2 echoes S1.
        assert_eq!(server.outgoing.len(), 1 + PACKET_SIZE + PACKET_SIZE);
        assert_eq!(server.outgoing[0], 3);
        assert_eq!(
            &server.outgoing[1 + PACKET_SIZE..],
            &[0x11_u8; PACKET_SIZE][..]
        );
    }
}
