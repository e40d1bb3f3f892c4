//! CMPP frame header
//!
//! Every PDU starts with the same 12 bytes.

use bytes::Buf;

use super::{CommandId, Error, HEADER_LENGTH, Result};

/// CMPP frame header (12 bytes, big-endian)
///
/// # Wire Format
///
/// ```text
/// 0                   1                   2                   3
/// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                      Total Length (4)                         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                       Command Id (4)                          |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                      Sequence Id (4)                          |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    total_length: u32,
    command_id: u32,
    sequence_id: u32,
}

impl FrameHeader {
    /// Create a header for a body of `body_len` bytes
    #[must_use]
    pub const fn new(command: CommandId, sequence_id: u32, body_len: u32) -> Self {
        Self {
            total_length: body_len.saturating_add(HEADER_LENGTH as u32),
            command_id: command.as_u32(),
            sequence_id,
        }
    }

    /// Create a header from raw wire values, without any validation
    #[must_use]
    pub const fn from_raw(total_length: u32, command_id: u32, sequence_id: u32) -> Self {
        Self {
            total_length,
            command_id,
            sequence_id,
        }
    }

    /// Total PDU length including the header
    #[must_use]
    pub const fn total_length(&self) -> u32 {
        self.total_length
    }

    /// Raw command id
    #[must_use]
    pub const fn command_id(&self) -> u32 {
        self.command_id
    }

    /// Known command, if the id is recognised
    #[must_use]
    pub fn command(&self) -> Option<CommandId> {
        CommandId::from_u32(self.command_id)
    }

    /// Sequence id
    #[must_use]
    pub const fn sequence_id(&self) -> u32 {
        self.sequence_id
    }

    /// Body length implied by `TotalLength` (0 when the declared length is too small)
    #[must_use]
    pub const fn body_length(&self) -> usize {
        (self.total_length as usize).saturating_sub(HEADER_LENGTH)
    }

    /// Check the declared length against the number of body bytes delivered
    pub fn check_length(&self, body_len: usize) -> Result<()> {
        if self.total_length as usize != HEADER_LENGTH + body_len {
            return Err(Error::LengthMismatch {
                declared: self.total_length,
                actual: HEADER_LENGTH + body_len,
            });
        }
        Ok(())
    }

    /// Convert to bytes (big-endian)
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_LENGTH] {
        let mut bytes = [0u8; HEADER_LENGTH];

        bytes[0..4].copy_from_slice(&self.total_length.to_be_bytes());
        bytes[4..8].copy_from_slice(&self.command_id.to_be_bytes());
        bytes[8..12].copy_from_slice(&self.sequence_id.to_be_bytes());

        bytes
    }

    /// Parse from bytes (big-endian)
    ///
    /// Only the first 12 bytes are read; `TotalLength` is not checked against
    /// what follows, since the body may still be in flight.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LENGTH {
            return Err(Error::BufferTooSmall {
                needed: HEADER_LENGTH,
                got: bytes.len(),
            });
        }

        let mut buf = &bytes[..HEADER_LENGTH];
        Ok(Self {
            total_length: buf.get_u32(),
            command_id: buf.get_u32(),
            sequence_id: buf.get_u32(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let header = FrameHeader::new(CommandId::Connect, 0x0102_0304, 27);
        let bytes = header.to_bytes();

        assert_eq!(
            bytes,
            [0, 0, 0, 39, 0, 0, 0, 1, 0x01, 0x02, 0x03, 0x04]
        );
    }

    #[test]
    fn test_header_roundtrip() {
        let header = FrameHeader::new(CommandId::TerminateResp, 77, 0);
        let decoded = FrameHeader::from_bytes(&header.to_bytes()).unwrap();

        assert_eq!(decoded, header);
        assert_eq!(decoded.command(), Some(CommandId::TerminateResp));
        assert_eq!(decoded.total_length(), 12);
        assert_eq!(decoded.body_length(), 0);
    }

    #[test]
    fn test_short_header_rejected() {
        let result = FrameHeader::from_bytes(&[0u8; 11]);
        assert!(matches!(
            result,
            Err(Error::BufferTooSmall {
                needed: 12,
                got: 11
            })
        ));
    }

    #[test]
    fn test_length_check() {
        let header = FrameHeader::new(CommandId::Connect, 1, 27);
        assert!(header.check_length(27).is_ok());
        assert!(matches!(
            header.check_length(8),
            Err(Error::LengthMismatch {
                declared: 39,
                actual: 20
            })
        ));
    }

    #[test]
    fn test_total_length_saturates() {
        let header = FrameHeader::new(CommandId::Submit, 1, u32::MAX - 4);
        assert_eq!(header.total_length(), u32::MAX);
    }

    #[test]
    fn test_unknown_command_still_parses() {
        let header = FrameHeader::from_raw(12, 0x0000_00FF, 5);
        let decoded = FrameHeader::from_bytes(&header.to_bytes()).unwrap();
        assert_eq!(decoded.command(), None);
        assert_eq!(decoded.command_id(), 0xFF);
    }
}
