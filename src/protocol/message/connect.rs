//! Connect / ConnectResp: the authentication handshake

use std::fmt;

use bytes::{Buf, BufMut, BytesMut};

use super::Message;
use crate::protocol::digest::{AUTHENTICATOR_LEN, Authenticator, gateway_digest, source_digest};
use crate::protocol::fixed::{pad_to, trim_trailing_zeros};
use crate::protocol::{CommandId, ConnectStatus, FrameHeader, Result, Timestamp, Version};

/// Width of the `Source_Addr` field
pub const SOURCE_ADDR_LEN: usize = 6;

/// Source address (the SP identifier), at most six bytes
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SourceAddr {
    bytes: [u8; SOURCE_ADDR_LEN],
    len: u8,
}

impl SourceAddr {
    /// Validate and store an identifier; trailing zero bytes are dropped
    pub fn new(value: impl AsRef<[u8]>) -> Result<Self> {
        let value = trim_trailing_zeros(value.as_ref());
        let bytes = pad_to::<SOURCE_ADDR_LEN>("source_addr", value)?;
        Ok(Self {
            bytes,
            len: value.len() as u8,
        })
    }

    /// Identifier without padding
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..usize::from(self.len)]
    }

    /// Identifier as text, when it is valid UTF-8
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(self.as_bytes()).ok()
    }

    /// Zero-padded wire form
    #[must_use]
    pub const fn padded(&self) -> &[u8; SOURCE_ADDR_LEN] {
        &self.bytes
    }

    fn from_field(field: &[u8]) -> Self {
        let value = trim_trailing_zeros(field);
        let mut bytes = [0u8; SOURCE_ADDR_LEN];
        bytes[..value.len()].copy_from_slice(value);
        Self {
            bytes,
            len: value.len() as u8,
        }
    }
}

impl fmt::Debug for SourceAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceAddr({})", String::from_utf8_lossy(self.as_bytes()))
    }
}

impl fmt::Display for SourceAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.as_bytes()))
    }
}

/// Connect request (body 27 bytes)
///
/// ```text
/// +0   Source_Addr            6
/// +6   AuthenticatorSource   16
/// +22  Version                1
/// +23  Timestamp              4
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connect {
    header: FrameHeader,
    source_addr: SourceAddr,
    authenticator_source: Authenticator,
    version: Version,
    timestamp: Timestamp,
}

impl Connect {
    /// Build a Connect, computing the source authenticator from `secret`
    #[must_use]
    pub fn new(
        sequence_id: u32,
        source_addr: SourceAddr,
        secret: &[u8],
        version: Version,
        timestamp: Timestamp,
    ) -> Self {
        let authenticator_source =
            source_digest(source_addr.as_bytes(), secret, timestamp.as_u32());
        Self::from_parts(
            sequence_id,
            source_addr,
            authenticator_source,
            version,
            timestamp,
        )
    }

    /// Build a Connect with an explicit authenticator
    #[must_use]
    pub const fn from_parts(
        sequence_id: u32,
        source_addr: SourceAddr,
        authenticator_source: Authenticator,
        version: Version,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            header: FrameHeader::new(CommandId::Connect, sequence_id, Self::BODY_LEN as u32),
            source_addr,
            authenticator_source,
            version,
            timestamp,
        }
    }

    /// Source address
    #[must_use]
    pub const fn source_addr(&self) -> &SourceAddr {
        &self.source_addr
    }

    /// Source authenticator as sent
    #[must_use]
    pub const fn authenticator_source(&self) -> &Authenticator {
        &self.authenticator_source
    }

    /// Requested version
    #[must_use]
    pub const fn version(&self) -> Version {
        self.version
    }

    /// Timestamp the authenticator was computed over
    #[must_use]
    pub const fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Validate against the local secret and supported version.
    ///
    /// Version is checked first, so a too-new version yields 4 whatever the
    /// digest. Digest comparison is plain byte equality.
    #[must_use]
    pub fn check(&self, secret: &[u8], supported: Version) -> ConnectStatus {
        if self.version > supported {
            return ConnectStatus::VersionTooHigh;
        }
        let expected = source_digest(
            self.source_addr.as_bytes(),
            secret,
            self.timestamp.as_u32(),
        );
        if expected == self.authenticator_source {
            ConnectStatus::Success
        } else {
            ConnectStatus::AuthenticationError
        }
    }

    /// Build the gateway's answer: status from [`Self::check`]
    #[must_use]
    pub fn to_response(&self, secret: &[u8], supported: Version) -> ConnectResp {
        self.respond(self.check(secret, supported), secret, supported)
    }

    /// Build a ConnectResp carrying `status`, with the gateway authenticator bound to it
    #[must_use]
    pub fn respond(&self, status: ConnectStatus, secret: &[u8], version: Version) -> ConnectResp {
        let authenticator_gateway =
            gateway_digest(status.as_u32(), &self.authenticator_source, secret);
        ConnectResp::new(
            self.sequence_id(),
            status,
            authenticator_gateway,
            version,
        )
    }
}

impl Message for Connect {
    const COMMAND: CommandId = CommandId::Connect;
    const BODY_LEN: usize = SOURCE_ADDR_LEN + AUTHENTICATOR_LEN + 1 + 4;

    fn header(&self) -> &FrameHeader {
        &self.header
    }

    fn put_body(&self, buf: &mut BytesMut) {
        buf.put_slice(self.source_addr.padded());
        buf.put_slice(&self.authenticator_source);
        buf.put_u8(self.version.as_u8());
        buf.put_u32(self.timestamp.as_u32());
    }

    fn read_body(header: FrameHeader, mut body: &[u8]) -> Self {
        let source_addr = SourceAddr::from_field(&body[..SOURCE_ADDR_LEN]);
        body.advance(SOURCE_ADDR_LEN);
        let mut authenticator_source = [0u8; AUTHENTICATOR_LEN];
        body.copy_to_slice(&mut authenticator_source);
        let version = Version::from_u8(body.get_u8());
        let timestamp = Timestamp::from_u32(body.get_u32());

        Self {
            header,
            source_addr,
            authenticator_source,
            version,
            timestamp,
        }
    }
}

/// Connect response (body 21 bytes)
///
/// ```text
/// +0   Status                 4
/// +4   AuthenticatorISMG     16
/// +20  Version                1
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectResp {
    header: FrameHeader,
    status: ConnectStatus,
    authenticator_gateway: Authenticator,
    version: Version,
}

impl ConnectResp {
    /// Build a response for the Connect with `sequence_id`
    #[must_use]
    pub const fn new(
        sequence_id: u32,
        status: ConnectStatus,
        authenticator_gateway: Authenticator,
        version: Version,
    ) -> Self {
        Self {
            header: FrameHeader::new(CommandId::ConnectResp, sequence_id, Self::BODY_LEN as u32),
            status,
            authenticator_gateway,
            version,
        }
    }

    /// Handshake status
    #[must_use]
    pub const fn status(&self) -> ConnectStatus {
        self.status
    }

    /// Gateway authenticator
    #[must_use]
    pub const fn authenticator_gateway(&self) -> &Authenticator {
        &self.authenticator_gateway
    }

    /// Version the gateway settled on
    #[must_use]
    pub const fn version(&self) -> Version {
        self.version
    }

    /// Check that the gateway knows `secret` and agrees on the reported status
    #[must_use]
    pub fn verify(&self, source: &Authenticator, secret: &[u8]) -> bool {
        gateway_digest(self.status.as_u32(), source, secret) == self.authenticator_gateway
    }
}

impl Message for ConnectResp {
    const COMMAND: CommandId = CommandId::ConnectResp;
    const BODY_LEN: usize = 4 + AUTHENTICATOR_LEN + 1;

    fn header(&self) -> &FrameHeader {
        &self.header
    }

    fn put_body(&self, buf: &mut BytesMut) {
        buf.put_u32(self.status.as_u32());
        buf.put_slice(&self.authenticator_gateway);
        buf.put_u8(self.version.as_u8());
    }

    fn read_body(header: FrameHeader, mut body: &[u8]) -> Self {
        let status = ConnectStatus::from_u32(body.get_u32());
        let mut authenticator_gateway = [0u8; AUTHENTICATOR_LEN];
        body.copy_to_slice(&mut authenticator_gateway);
        let version = Version::from_u8(body.get_u8());

        Self {
            header,
            status,
            authenticator_gateway,
            version,
        }
    }
}
