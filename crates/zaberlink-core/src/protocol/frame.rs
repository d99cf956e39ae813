//! Frame encoding/decoding
//!
//! Implements the fixed 6-byte binary frame used in both directions:
//! - 1 byte: device number (0 addresses all units)
//! - 1 byte: command code
//! - 4 bytes: signed 32-bit data word (little-endian)

use byteorder::{ByteOrder, LittleEndian};

use super::ProtocolError;

/// Total encoded size of a frame in bytes
pub const FRAME_SIZE: usize = 6;

/// A single protocol frame
///
/// Immutable once constructed; the encoded byte form is derived from the
/// fields, never stored separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Target device number (0 = all units on the line)
    pub motor_id: u8,
    /// Command code (see [`super::commands`])
    pub command: u8,
    /// Command-specific payload: position, speed, setting value, or in a
    /// reply an error or status code
    pub data: i32,
}

impl Frame {
    /// Create a new frame
    pub fn new(motor_id: u8, command: u8, data: i32) -> Self {
        Self {
            motor_id,
            command,
            data,
        }
    }

    /// Encode to the 6-byte wire form
    pub fn encode(&self) -> [u8; FRAME_SIZE] {
        let mut buf = [0u8; FRAME_SIZE];
        buf[0] = self.motor_id;
        buf[1] = self.command;
        LittleEndian::write_i32(&mut buf[2..FRAME_SIZE], self.data);
        buf
    }

    /// Decode a frame from raw bytes
    ///
    /// Fails with [`ProtocolError::MalformedReply`] unless the buffer is
    /// exactly [`FRAME_SIZE`] bytes. Any full 6-byte buffer decodes to some
    /// frame; validity of the content is the caller's concern.
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() != FRAME_SIZE {
            return Err(ProtocolError::MalformedReply { len: data.len() });
        }
        Ok(Self {
            motor_id: data[0],
            command: data[1],
            data: LittleEndian::read_i32(&data[2..FRAME_SIZE]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_roundtrip() {
        let cases = [
            (0u8, 0u8, 0i32),
            (0, 20, 100_000),
            (3, 21, -42),
            (255, 255, i32::MIN),
            (1, 54, i32::MAX),
        ];
        for (motor_id, command, data) in cases {
            let frame = Frame::new(motor_id, command, data);
            let decoded = Frame::decode(&frame.encode()).expect("should decode");
            assert_eq!(frame, decoded);
        }
    }

    #[test]
    fn test_move_absolute_wire_bytes() {
        // Move absolute to 100000 steps on unit 0
        let frame = Frame::new(0, 20, 100_000);
        assert_eq!(frame.encode(), [0x00, 0x14, 0xA0, 0x86, 0x01, 0x00]);
    }

    #[test]
    fn test_negative_data_little_endian() {
        let frame = Frame::new(0, 21, -1);
        assert_eq!(frame.encode(), [0x00, 0x15, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(Frame::decode(&frame.encode()).unwrap().data, -1);
    }

    #[test]
    fn test_short_buffer_is_malformed() {
        for len in [0usize, 1, 5] {
            let buf = vec![0u8; len];
            match Frame::decode(&buf) {
                Err(ProtocolError::MalformedReply { len: got }) => assert_eq!(got, len),
                other => panic!("expected MalformedReply, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_long_buffer_is_malformed() {
        let buf = [0u8; 7];
        assert!(Frame::decode(&buf).is_err());
    }

    #[test]
    fn test_any_full_buffer_decodes() {
        // No content validation at this layer
        let frame = Frame::decode(&[9, 199, 1, 2, 3, 4]).unwrap();
        assert_eq!(frame.motor_id, 9);
        assert_eq!(frame.command, 199);
    }
}
