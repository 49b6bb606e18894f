//! The digest ("complex") handshake.
//!
//! The 1528 byte random body of C1/S1 is reinterpreted as two 764 byte
//! blocks: a key block and a digest block.  The digest block holds a 4 byte
//! offset followed by 728 bytes of filler, with a 32 byte HMAC-SHA256 buried
//! at the offset.  The HMAC covers every byte of the packet except the digest
//! itself.  Scheme 0 places the digest block first (at offset 8, right after
//! time and version); scheme 1 places it after the key block.
//!
//! C1 is signed with the first 30 bytes of the Flash Player constant and S1
//! verifies under the first 36 bytes of the Flash Media Server constant.  The
//! response digests (C2/S2) use the full constants: the key is an HMAC of the
//! peer's digest under the full constant, and the packet digest is an HMAC of
//! the first 1504 bytes under that key.

use ring::hmac;

pub const PACKET_SIZE: usize = 1536;
pub const DIGEST_SIZE: usize = 32;

const CHUNK_SIZE: usize = 764;
const OFFSET_MODULO: usize = CHUNK_SIZE - DIGEST_SIZE - 4;
const RESPONSE_BODY_SIZE: usize = PACKET_SIZE - DIGEST_SIZE;

const FP_KEY: &[u8; 62] = &[
    b'G', b'e', b'n', b'u', b'i', b'n', b'e', b' ', b'A', b'd', b'o', b'b', b'e', b' ', b'F',
    b'l', b'a', b's', b'h', b' ', b'P', b'l', b'a', b'y', b'e', b'r', b' ', b'0', b'0', b'1',
    0xF0, 0xEE, 0xC2, 0x4A, 0x80, 0x68, 0xBE, 0xE8, 0x2E, 0x00, 0xD0, 0xD1, 0x02, 0x9E, 0x7E,
    0x57, 0x6E, 0xEC, 0x5D, 0x2D, 0x29, 0x80, 0x6F, 0xAB, 0x93, 0xB8, 0xE6, 0x36, 0xCF, 0xEB,
    0x31, 0xAE,
];

const FMS_KEY: &[u8; 68] = &[
    b'G', b'e', b'n', b'u', b'i', b'n', b'e', b' ', b'A', b'd', b'o', b'b', b'e', b' ', b'F',
    b'l', b'a', b's', b'h', b' ', b'M', b'e', b'd', b'i', b'a', b' ', b'S', b'e', b'r', b'v',
    b'e', b'r', b' ', b'0', b'0', b'1',
    0xF0, 0xEE, 0xC2, 0x4A, 0x80, 0x68, 0xBE, 0xE8, 0x2E, 0x00, 0xD0, 0xD1, 0x02, 0x9E, 0x7E,
    0x57, 0x6E, 0xEC, 0x5D, 0x2D, 0x29, 0x80, 0x6F, 0xAB, 0x93, 0xB8, 0xE6, 0x36, 0xCF, 0xEB,
    0x31, 0xAE,
];

/// Version field advertised in a digest C1; a zero version marks a simple
/// handshake packet instead.
const CLIENT_VERSION: [u8; 4] = [0x80, 0x00, 0x07, 0x02];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestScheme {
    Scheme0,
    Scheme1,
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; DIGEST_SIZE] {
    let key = hmac::Key::new(hmac::HMAC_SHA256, key);
    let tag = hmac::sign(&key, data);

    let mut output = [0_u8; DIGEST_SIZE];
    output.copy_from_slice(tag.as_ref());
    output
}

/// Offset of the 32 byte digest within the whole packet for a scheme
fn digest_position(packet: &[u8], scheme: DigestScheme) -> usize {
    let block_start = match scheme {
        DigestScheme::Scheme0 => 8,
        DigestScheme::Scheme1 => 8 + CHUNK_SIZE,
    };

    let offset_bytes = &packet[block_start..block_start + 4];
    let offset = offset_bytes.iter().map(|b| *b as usize).sum::<usize>() % OFFSET_MODULO;

    block_start + 4 + offset
}

/// The packet with the 32 digest bytes at `position` removed; this is the
/// range the digest is computed over.
fn joined_without_digest(packet: &[u8], position: usize) -> Vec<u8> {
    let mut joined = Vec::with_capacity(PACKET_SIZE - DIGEST_SIZE);
    joined.extend_from_slice(&packet[..position]);
    joined.extend_from_slice(&packet[position + DIGEST_SIZE..]);
    joined
}

/// Stamps a scheme 0 digest into a fully random 1536 byte C1 and records the
/// client version marker.  Returns the embedded digest for later S2
/// verification.
pub fn sign_c1(packet: &mut [u8; PACKET_SIZE]) -> [u8; DIGEST_SIZE] {
    packet[4..8].copy_from_slice(&CLIENT_VERSION);

    let position = digest_position(packet, DigestScheme::Scheme0);
    let joined = joined_without_digest(packet, position);
    let digest = hmac_sha256(&FP_KEY[..30], &joined);

    packet[position..position + DIGEST_SIZE].copy_from_slice(&digest);
    digest
}

/// Validates the digest a server embedded in S1.  Tries scheme 0 first, then
/// scheme 1.  Returns the server digest when one verifies.
pub fn verify_s1(packet: &[u8]) -> Option<[u8; DIGEST_SIZE]> {
    if packet.len() != PACKET_SIZE {
        return None;
    }

    for &scheme in &[DigestScheme::Scheme0, DigestScheme::Scheme1] {
        let position = digest_position(packet, scheme);
        let joined = joined_without_digest(packet, position);
        let expected = hmac_sha256(&FMS_KEY[..36], &joined);

        if expected[..] == packet[position..position + DIGEST_SIZE] {
            let mut digest = [0_u8; DIGEST_SIZE];
            digest.copy_from_slice(&packet[position..position + DIGEST_SIZE]);
            return Some(digest);
        }
    }

    None
}

/// Builds the digest form of C2: 1504 random bytes followed by an HMAC keyed
/// off the server's S1 digest.
pub fn sign_c2(random_body: &mut [u8; PACKET_SIZE], server_digest: &[u8; DIGEST_SIZE]) {
    let key = hmac_sha256(&FP_KEY[..], server_digest);
    let digest = hmac_sha256(&key, &random_body[..RESPONSE_BODY_SIZE]);
    random_body[RESPONSE_BODY_SIZE..].copy_from_slice(&digest);
}

/// Checks the digest form of S2 against the digest we embedded in C1.  Plain
/// echo servers will not match; the caller treats that as acceptable.
pub fn verify_s2(packet: &[u8], client_digest: &[u8; DIGEST_SIZE]) -> bool {
    if packet.len() != PACKET_SIZE {
        return false;
    }

    let key = hmac_sha256(&FMS_KEY[..], client_digest);
    let expected = hmac_sha256(&key, &packet[..RESPONSE_BODY_SIZE]);
    expected[..] == packet[RESPONSE_BODY_SIZE..]
}
