//! Terminate / TerminateResp: orderly shutdown

use bytes::BytesMut;

use super::Message;
use crate::protocol::{CommandId, FrameHeader};

/// Shutdown request (header only)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Terminate {
    header: FrameHeader,
}

impl Terminate {
    /// Build a request
    #[must_use]
    pub const fn new(sequence_id: u32) -> Self {
        Self {
            header: FrameHeader::new(CommandId::Terminate, sequence_id, 0),
        }
    }

    /// Reply with the same sequence id
    #[must_use]
    pub fn to_response(&self) -> TerminateResp {
        TerminateResp::new(self.sequence_id())
    }
}

impl Message for Terminate {
    const COMMAND: CommandId = CommandId::Terminate;
    const BODY_LEN: usize = 0;

    fn header(&self) -> &FrameHeader {
        &self.header
    }

    fn put_body(&self, _buf: &mut BytesMut) {}

    fn read_body(header: FrameHeader, _body: &[u8]) -> Self {
        Self { header }
    }
}

/// Shutdown acknowledgement (header only)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminateResp {
    header: FrameHeader,
}

impl TerminateResp {
    /// Build an acknowledgement
    #[must_use]
    pub const fn new(sequence_id: u32) -> Self {
        Self {
            header: FrameHeader::new(CommandId::TerminateResp, sequence_id, 0),
        }
    }
}

impl Message for TerminateResp {
    const COMMAND: CommandId = CommandId::TerminateResp;
    const BODY_LEN: usize = 0;

    fn header(&self) -> &FrameHeader {
        &self.header
    }

    fn put_body(&self, _buf: &mut BytesMut) {}

    fn read_body(header: FrameHeader, _body: &[u8]) -> Self {
        Self { header }
    }
}
