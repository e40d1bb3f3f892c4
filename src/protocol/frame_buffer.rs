//! Frame reassembly for stream transports.
//!
//! Bytes arrive in arbitrary chunks; frames come out whole. The header may be
//! available long before the body, so parsing is a two-state machine:
//! - `WaitingForHeader`: need 12 bytes
//! - `WaitingForBody`: header parsed, need `TotalLength - 12` more bytes

use bytes::{Buf, Bytes, BytesMut};

use super::{Error, FrameHeader, HEADER_LENGTH, Result};

/// Default upper bound on `TotalLength`
pub const DEFAULT_MAX_FRAME_LENGTH: u32 = 4096;

#[derive(Debug, Clone, Copy)]
enum State {
    WaitingForHeader,
    WaitingForBody(FrameHeader),
}

/// A complete frame split into header and body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Parsed header
    pub header: FrameHeader,
    /// Body bytes, exactly `TotalLength - 12` long
    pub body: Bytes,
}

/// Buffer for accumulating incoming bytes and extracting complete frames.
#[derive(Debug)]
pub struct FrameBuffer {
    buffer: BytesMut,
    state: State,
    max_frame_length: u32,
}

impl FrameBuffer {
    /// Create a buffer with the default frame limit
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_frame_length(DEFAULT_MAX_FRAME_LENGTH)
    }

    /// Create a buffer rejecting frames longer than `max_frame_length`
    #[must_use]
    pub fn with_max_frame_length(max_frame_length: u32) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4 * 1024),
            state: State::WaitingForHeader,
            max_frame_length: max_frame_length.max(HEADER_LENGTH as u32),
        }
    }

    /// Append received bytes
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Extract the next complete frame, if one is buffered.
    ///
    /// A declared length outside `12..=max` is a packet error; the stream
    /// cannot be resynchronised after it.
    pub fn next_frame(&mut self) -> Result<Option<RawFrame>> {
        if let State::WaitingForHeader = self.state {
            if self.buffer.len() < HEADER_LENGTH {
                return Ok(None);
            }
            let header = FrameHeader::from_bytes(&self.buffer)?;
            let declared = header.total_length();
            if declared < HEADER_LENGTH as u32 || declared > self.max_frame_length {
                return Err(Error::InvalidLength {
                    declared,
                    min: HEADER_LENGTH as u32,
                    max: self.max_frame_length,
                });
            }
            self.buffer.advance(HEADER_LENGTH);
            self.state = State::WaitingForBody(header);
        }

        let State::WaitingForBody(header) = self.state else {
            return Ok(None);
        };
        let body_len = header.body_length();
        if self.buffer.len() < body_len {
            return Ok(None);
        }
        let body = self.buffer.split_to(body_len).freeze();
        self.state = State::WaitingForHeader;
        Ok(Some(RawFrame { header, body }))
    }

    /// Append `data` and drain every complete frame
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<RawFrame>> {
        self.extend(data);
        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Bytes held but not yet returned as frames
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
            + match self.state {
                State::WaitingForHeader => 0,
                State::WaitingForBody(_) => HEADER_LENGTH,
            }
    }

    /// Drop everything buffered
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::WaitingForHeader;
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ActiveTest, Message, Terminate, TerminateResp};

    #[test]
    fn whole_frames_in_one_chunk() {
        let mut data = ActiveTest::new(1).encode().to_vec();
        data.extend_from_slice(&Terminate::new(2).encode());

        let mut buffer = FrameBuffer::new();
        let frames = buffer.push(&data).unwrap();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].header.sequence_id(), 1);
        assert_eq!(frames[1].header.sequence_id(), 2);
        assert_eq!(buffer.buffered(), 0);
    }

    #[test]
    fn byte_by_byte_delivery() {
        let resp = crate::protocol::ActiveTestResp::new(77).encode();
        let mut buffer = FrameBuffer::new();

        for (idx, byte) in resp.iter().enumerate() {
            let frames = buffer.push(std::slice::from_ref(byte)).unwrap();
            if idx + 1 < resp.len() {
                assert!(frames.is_empty());
            } else {
                assert_eq!(frames.len(), 1);
                assert_eq!(frames[0].body.as_ref(), &[0u8]);
            }
        }
    }

    #[test]
    fn header_arrives_before_body() {
        let frame = TerminateResp::new(5).encode();
        let mut buffer = FrameBuffer::new();
        buffer.extend(&frame[..8]);
        assert!(buffer.next_frame().unwrap().is_none());
        assert_eq!(buffer.buffered(), 8);
        buffer.extend(&frame[8..]);
        assert!(buffer.next_frame().unwrap().is_some());
    }

    #[test]
    fn clear_drops_a_partial_frame() {
        let frame = TerminateResp::new(3).encode();
        let mut buffer = FrameBuffer::new();
        buffer.extend(&frame[..8]);
        assert!(buffer.next_frame().unwrap().is_none());
        assert_eq!(buffer.buffered(), 8);

        buffer.clear();
        assert_eq!(buffer.buffered(), 0);
        let frames = buffer.push(&ActiveTest::new(4).encode()).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].header.sequence_id(), 4);
    }

    #[test]
    fn undersized_total_length_rejected() {
        let header = FrameHeader::from_raw(8, 2, 1);
        let mut buffer = FrameBuffer::new();
        assert!(matches!(
            buffer.push(&header.to_bytes()),
            Err(Error::InvalidLength { declared: 8, .. })
        ));
    }

    #[test]
    fn oversized_total_length_rejected() {
        let header = FrameHeader::from_raw(100_000, 4, 1);
        let mut buffer = FrameBuffer::with_max_frame_length(2048);
        assert!(matches!(
            buffer.push(&header.to_bytes()),
            Err(Error::InvalidLength {
                declared: 100_000,
                max: 2048,
                ..
            })
        ));
    }
}
