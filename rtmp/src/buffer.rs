//! Bounds-checked cursors over byte slices.
//!
//! All of the container and codec parsing in this crate works over in-memory
//! payloads with big-endian multi-byte fields.  `BytesReader` is a borrowing
//! cursor where every read either succeeds completely or fails without
//! advancing, and `BytesWriter` is the growing counterpart used to build
//! payloads.

use byteorder::{BigEndian, ByteOrder};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum BufferError {
    #[error("Needed {needed} more bytes but only {remaining} remain")]
    UnexpectedEnd { needed: usize, remaining: usize },
}

/// A reading cursor over a borrowed byte slice.
#[derive(Debug)]
pub struct BytesReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> BytesReader<'a> {
    pub fn new(bytes: &'a [u8]) -> BytesReader<'a> {
        BytesReader { bytes, position: 0 }
    }

    /// True when at least `count` more bytes can be read
    pub fn require(&self, count: usize) -> bool {
        self.remaining() >= count
    }

    pub fn pos(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], BufferError> {
        if !self.require(count) {
            return Err(BufferError::UnexpectedEnd {
                needed: count,
                remaining: self.remaining(),
            });
        }

        let slice = &self.bytes[self.position..self.position + count];
        self.position += count;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, BufferError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, BufferError> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    pub fn read_i16(&mut self) -> Result<i16, BufferError> {
        Ok(BigEndian::read_i16(self.take(2)?))
    }

    pub fn read_u24(&mut self) -> Result<u32, BufferError> {
        Ok(BigEndian::read_u24(self.take(3)?))
    }

    pub fn read_u32(&mut self) -> Result<u32, BufferError> {
        Ok(BigEndian::read_u32(self.take(4)?))
    }

    pub fn read_u64(&mut self) -> Result<u64, BufferError> {
        Ok(BigEndian::read_u64(self.take(8)?))
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], BufferError> {
        self.take(count)
    }

    pub fn skip(&mut self, count: usize) -> Result<(), BufferError> {
        self.take(count).map(|_| ())
    }
}

/// A growing byte vector with the writer halves of the reader operations.
#[derive(Debug, Default)]
pub struct BytesWriter {
    bytes: Vec<u8>,
}

impl BytesWriter {
    pub fn new() -> BytesWriter {
        BytesWriter { bytes: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> BytesWriter {
        BytesWriter {
            bytes: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        let mut buffer = [0_u8; 2];
        BigEndian::write_u16(&mut buffer, value);
        self.bytes.extend_from_slice(&buffer);
    }

    pub fn write_u24(&mut self, value: u32) {
        let mut buffer = [0_u8; 3];
        BigEndian::write_u24(&mut buffer, value);
        self.bytes.extend_from_slice(&buffer);
    }

    pub fn write_u32(&mut self, value: u32) {
        let mut buffer = [0_u8; 4];
        BigEndian::write_u32(&mut buffer, value);
        self.bytes.extend_from_slice(&buffer);
    }

    pub fn write_u64(&mut self, value: u64) {
        let mut buffer = [0_u8; 8];
        BigEndian::write_u64(&mut buffer, value);
        self.bytes.extend_from_slice(&buffer);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_integers_big_endian() {
        let bytes = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a];
        let mut reader = BytesReader::new(&bytes);

        assert_eq!(reader.read_u8().unwrap(), 0x01);
        assert_eq!(reader.read_u16().unwrap(), 0x0203);
        assert_eq!(reader.read_u24().unwrap(), 0x040506);
        assert_eq!(reader.read_u32().unwrap(), 0x0708090a);
        assert!(reader.is_empty());
    }

    #[test]
    fn failed_read_does_not_advance() {
        let bytes = [1, 2, 3];
        let mut reader = BytesReader::new(&bytes);
        reader.skip(2).unwrap();

        assert_eq!(
            reader.read_u32(),
            Err(BufferError::UnexpectedEnd {
                needed: 4,
                remaining: 1
            })
        );
        assert_eq!(reader.pos(), 2, "Position must not move on a short read");
        assert_eq!(reader.read_u8().unwrap(), 3);
    }

    #[test]
    fn require_and_remaining_track_consumption() {
        let bytes = [0_u8; 5];
        let mut reader = BytesReader::new(&bytes);

        assert!(reader.require(5));
        assert!(!reader.require(6));

        reader.read_bytes(3).unwrap();
        assert_eq!(reader.remaining(), 2);
        assert_eq!(reader.pos(), 3);
    }

    #[test]
    fn writer_round_trips_with_reader() {
        let mut writer = BytesWriter::new();
        writer.write_u8(9);
        writer.write_u16(0x1234);
        writer.write_u24(0xfffffe);
        writer.write_u32(77);
        writer.write_u64(0x0102030405060708);
        writer.write_bytes(&[1, 2, 3]);

        let bytes = writer.into_bytes();
        let mut reader = BytesReader::new(&bytes);

        assert_eq!(reader.read_u8().unwrap(), 9);
        assert_eq!(reader.read_u16().unwrap(), 0x1234);
        assert_eq!(reader.read_u24().unwrap(), 0xfffffe);
        assert_eq!(reader.read_u32().unwrap(), 77);
        assert_eq!(reader.read_u64().unwrap(), 0x0102030405060708);
        assert_eq!(reader.read_bytes(3).unwrap(), &[1, 2, 3]);
        assert!(reader.is_empty());
    }
}
