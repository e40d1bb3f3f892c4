//! CMPP frame codec (encode/decode)
//!
//! Body decoding is routed through the dispatch table, so adding a message
//! kind means registering one route.

use super::{Error, FrameHeader, HEADER_LENGTH, Pdu, Result};
use crate::dispatch;

/// Decode the 12-byte header at the start of `bytes`
pub fn decode_header(bytes: &[u8]) -> Result<FrameHeader> {
    FrameHeader::from_bytes(bytes)
}

/// Decode the body that followed `header`
///
/// # Errors
///
/// `UnknownCommand` when no route exists (the frame can still be skipped via
/// `TotalLength`), or a packet error from the body codec.
pub fn decode_body(header: FrameHeader, body: &[u8]) -> Result<Pdu> {
    let route = dispatch::lookup(header.command_id()).ok_or(Error::UnknownCommand {
        command_id: header.command_id(),
    })?;
    (route.decode)(header, body)
}

/// Decode one complete frame
///
/// # Errors
///
/// Returns an error if:
/// - the buffer is shorter than a header
/// - `TotalLength` disagrees with the buffer length
/// - the command id is unknown
/// - the body is shorter than the command's minimum
pub fn decode(frame: &[u8]) -> Result<Pdu> {
    let header = decode_header(frame)?;
    let body = &frame[HEADER_LENGTH..];
    header.check_length(body.len())?;
    decode_body(header, body)
}

/// Encode a PDU to a full frame
#[must_use]
pub fn encode(pdu: &Pdu) -> bytes::Bytes {
    pdu.encode()
}
