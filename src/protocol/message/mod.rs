//! CMPP message codecs
//!
//! Each message is a [`FrameHeader`] plus its own body fields. The [`Message`]
//! trait supplies the shared framing: command check, minimum body length and
//! header emission. [`Pdu`] closes over every kind the engine understands.

mod connect;
mod terminate;

use bytes::{BufMut, Bytes, BytesMut};

use super::{CommandId, Error, FrameHeader, HEADER_LENGTH, Result};

pub use active_test::{ActiveTest, ActiveTestResp};
pub use connect::{Connect, ConnectResp, SOURCE_ADDR_LEN, SourceAddr};
pub use terminate::{Terminate, TerminateResp};

/// Largest payload body a 32-bit `TotalLength` can describe
pub const MAX_BODY_LEN: usize = u32::MAX as usize - HEADER_LENGTH;

/// Fixed-layout CMPP message
pub trait Message: Sized {
    /// Command id this codec handles
    const COMMAND: CommandId;
    /// Body length written by `encode`
    const BODY_LEN: usize;
    /// Smallest body accepted by `decode`
    const MIN_BODY_LEN: usize = Self::BODY_LEN;

    /// Header the message was built or decoded with
    fn header(&self) -> &FrameHeader;

    /// Write the body (exactly `BODY_LEN` bytes)
    fn put_body(&self, buf: &mut BytesMut);

    /// Build from a body already known to hold at least `MIN_BODY_LEN` bytes
    fn read_body(header: FrameHeader, body: &[u8]) -> Self;

    /// Sequence id
    fn sequence_id(&self) -> u32 {
        self.header().sequence_id()
    }

    /// Encode the full frame; `TotalLength` always reflects the body written
    fn encode(&self) -> Bytes {
        let header = FrameHeader::new(Self::COMMAND, self.sequence_id(), Self::BODY_LEN as u32);
        let mut buf = BytesMut::with_capacity(HEADER_LENGTH + Self::BODY_LEN);
        buf.put_slice(&header.to_bytes());
        self.put_body(&mut buf);
        debug_assert_eq!(buf.len(), HEADER_LENGTH + Self::BODY_LEN);
        buf.freeze()
    }

    /// Decode the body that followed `header`
    fn decode(header: FrameHeader, body: &[u8]) -> Result<Self> {
        if header.command_id() != Self::COMMAND.as_u32() {
            return Err(Error::CommandMismatch {
                expected: Self::COMMAND.as_u32(),
                found: header.command_id(),
            });
        }
        if body.len() < Self::MIN_BODY_LEN {
            return Err(Error::BufferTooSmall {
                needed: Self::MIN_BODY_LEN,
                got: body.len(),
            });
        }
        Ok(Self::read_body(header, body))
    }
}

/// Payload PDU (submit, deliver, query, cancel) carried with an opaque body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPdu {
    command: CommandId,
    header: FrameHeader,
    body: Bytes,
}

impl RawPdu {
    /// Build an outbound payload PDU
    ///
    /// # Errors
    ///
    /// `FieldTooLong` when the body cannot be described by a 32-bit
    /// `TotalLength`.
    pub fn new(command: CommandId, sequence_id: u32, body: impl Into<Bytes>) -> Result<Self> {
        let body = body.into();
        if body.len() > MAX_BODY_LEN {
            return Err(Error::FieldTooLong {
                field: "body",
                len: body.len(),
                max: MAX_BODY_LEN,
            });
        }
        let header = FrameHeader::new(command, sequence_id, body.len() as u32);
        Ok(Self {
            command,
            header,
            body,
        })
    }

    /// Wrap a received body; the command must be a payload command
    pub fn decode(header: FrameHeader, body: &[u8]) -> Result<Self> {
        if body.len() > MAX_BODY_LEN {
            return Err(Error::LengthMismatch {
                declared: header.total_length(),
                actual: body.len().saturating_add(HEADER_LENGTH),
            });
        }
        match header.command() {
            Some(command) if command.is_payload() => Ok(Self {
                command,
                header,
                body: Bytes::copy_from_slice(body),
            }),
            _ => Err(Error::UnknownCommand {
                command_id: header.command_id(),
            }),
        }
    }

    /// Payload command
    #[must_use]
    pub const fn command(&self) -> CommandId {
        self.command
    }

    /// Header
    #[must_use]
    pub const fn header(&self) -> &FrameHeader {
        &self.header
    }

    /// Opaque body
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Encode the full frame
    #[must_use]
    pub fn encode(&self) -> Bytes {
        // Body length was bounded by MAX_BODY_LEN on construction
        let header = FrameHeader::new(
            self.command,
            self.header.sequence_id(),
            self.body.len() as u32,
        );
        let mut buf = BytesMut::with_capacity(HEADER_LENGTH + self.body.len());
        buf.put_slice(&header.to_bytes());
        buf.put_slice(&self.body);
        buf.freeze()
    }
}

/// Every PDU the engine can decode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pdu {
    /// Connect request
    Connect(Connect),
    /// Connect response
    ConnectResp(ConnectResp),
    /// Heartbeat request
    ActiveTest(ActiveTest),
    /// Heartbeat response
    ActiveTestResp(ActiveTestResp),
    /// Terminate request
    Terminate(Terminate),
    /// Terminate response
    TerminateResp(TerminateResp),
    /// Submit/deliver/query/cancel and their responses
    Payload(RawPdu),
}

impl Pdu {
    /// Header
    #[must_use]
    pub fn header(&self) -> &FrameHeader {
        match self {
            Self::Connect(m) => m.header(),
            Self::ConnectResp(m) => m.header(),
            Self::ActiveTest(m) => m.header(),
            Self::ActiveTestResp(m) => m.header(),
            Self::Terminate(m) => m.header(),
            Self::TerminateResp(m) => m.header(),
            Self::Payload(m) => m.header(),
        }
    }

    /// Command id, for every variant a known one
    #[must_use]
    pub fn command(&self) -> CommandId {
        match self {
            Self::Connect(_) => CommandId::Connect,
            Self::ConnectResp(_) => CommandId::ConnectResp,
            Self::ActiveTest(_) => CommandId::ActiveTest,
            Self::ActiveTestResp(_) => CommandId::ActiveTestResp,
            Self::Terminate(_) => CommandId::Terminate,
            Self::TerminateResp(_) => CommandId::TerminateResp,
            Self::Payload(m) => m.command(),
        }
    }

    /// Sequence id
    #[must_use]
    pub fn sequence_id(&self) -> u32 {
        self.header().sequence_id()
    }

    /// Encode the full frame
    #[must_use]
    pub fn encode(&self) -> Bytes {
        match self {
            Self::Connect(m) => m.encode(),
            Self::ConnectResp(m) => m.encode(),
            Self::ActiveTest(m) => m.encode(),
            Self::ActiveTestResp(m) => m.encode(),
            Self::Terminate(m) => m.encode(),
            Self::TerminateResp(m) => m.encode(),
            Self::Payload(m) => m.encode(),
        }
    }
}

impl From<Connect> for Pdu {
    fn from(m: Connect) -> Self {
        Self::Connect(m)
    }
}

impl From<ConnectResp> for Pdu {
    fn from(m: ConnectResp) -> Self {
        Self::ConnectResp(m)
    }
}

impl From<ActiveTest> for Pdu {
    fn from(m: ActiveTest) -> Self {
        Self::ActiveTest(m)
    }
}

impl From<ActiveTestResp> for Pdu {
    fn from(m: ActiveTestResp) -> Self {
        Self::ActiveTestResp(m)
    }
}

impl From<Terminate> for Pdu {
    fn from(m: Terminate) -> Self {
        Self::Terminate(m)
    }
}

impl From<TerminateResp> for Pdu {
    fn from(m: TerminateResp) -> Self {
        Self::TerminateResp(m)
    }
}

impl From<RawPdu> for Pdu {
    fn from(m: RawPdu) -> Self {
        Self::Payload(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_pdu_roundtrip() {
        let pdu = RawPdu::new(CommandId::Submit, 9, b"opaque body".to_vec()).unwrap();
        let bytes = pdu.encode();
        assert_eq!(&bytes[0..4], &23u32.to_be_bytes());

        let header = FrameHeader::from_bytes(&bytes).unwrap();
        let decoded = RawPdu::decode(header, &bytes[HEADER_LENGTH..]).unwrap();
        assert_eq!(decoded, pdu);
        assert_eq!(Pdu::from(decoded).command(), CommandId::Submit);
    }

    #[test]
    fn largest_body_fits_total_length() {
        assert_eq!(MAX_BODY_LEN + HEADER_LENGTH, u32::MAX as usize);
    }

    #[test]
    fn raw_pdu_rejects_control_commands() {
        let header = FrameHeader::new(CommandId::ActiveTest, 1, 0);
        assert!(matches!(
            RawPdu::decode(header, &[]),
            Err(Error::UnknownCommand { command_id: 2 })
        ));
    }

    #[test]
    fn pdu_reports_command_and_sequence() {
        let pdu = Pdu::from(Terminate::new(42));
        assert_eq!(pdu.command(), CommandId::Terminate);
        assert_eq!(pdu.sequence_id(), 42);
        assert_eq!(pdu.encode().len(), HEADER_LENGTH);
    }
}
