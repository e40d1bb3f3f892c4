//! CMPP command identifiers, handshake status codes and protocol versions

use std::fmt;

/// High bit set on every response command id
pub const RESPONSE_BIT: u32 = 0x8000_0000;

/// CMPP command identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum CommandId {
    /// Open and authenticate a session
    Connect = 0x0000_0001,
    /// Response to Connect
    ConnectResp = 0x8000_0001,
    /// Keep-alive probe
    ActiveTest = 0x0000_0002,
    /// Response to ActiveTest
    ActiveTestResp = 0x8000_0002,
    /// Orderly session shutdown
    Terminate = 0x0000_0003,
    /// Response to Terminate
    TerminateResp = 0x8000_0003,

    /// Submit a short message
    Submit = 0x0000_0004,
    /// Response to Submit
    SubmitResp = 0x8000_0004,
    /// Deliver a mobile-originated message or status report
    Deliver = 0x0000_0005,
    /// Response to Deliver
    DeliverResp = 0x8000_0005,
    /// Query sending statistics
    Query = 0x0000_0006,
    /// Response to Query
    QueryResp = 0x8000_0006,
    /// Cancel a submitted message
    Cancel = 0x0000_0007,
    /// Response to Cancel
    CancelResp = 0x8000_0007,
}

impl CommandId {
    /// Convert from the wire value
    #[must_use]
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0x0000_0001 => Some(Self::Connect),
            0x8000_0001 => Some(Self::ConnectResp),
            0x0000_0002 => Some(Self::ActiveTest),
            0x8000_0002 => Some(Self::ActiveTestResp),
            0x0000_0003 => Some(Self::Terminate),
            0x8000_0003 => Some(Self::TerminateResp),
            0x0000_0004 => Some(Self::Submit),
            0x8000_0004 => Some(Self::SubmitResp),
            0x0000_0005 => Some(Self::Deliver),
            0x8000_0005 => Some(Self::DeliverResp),
            0x0000_0006 => Some(Self::Query),
            0x8000_0006 => Some(Self::QueryResp),
            0x0000_0007 => Some(Self::Cancel),
            0x8000_0007 => Some(Self::CancelResp),
            _ => None,
        }
    }

    /// Convert to the wire value
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    /// Check if this command is a response
    #[must_use]
    pub const fn is_response(self) -> bool {
        self.as_u32() & RESPONSE_BIT != 0
    }

    /// Payload commands ride on an established session; their bodies are opaque here
    #[must_use]
    pub const fn is_payload(self) -> bool {
        matches!(
            self,
            Self::Submit
                | Self::SubmitResp
                | Self::Deliver
                | Self::DeliverResp
                | Self::Query
                | Self::QueryResp
                | Self::Cancel
                | Self::CancelResp
        )
    }

    /// Response command paired with this request
    #[must_use]
    pub fn response(self) -> Option<Self> {
        if self.is_response() {
            return None;
        }
        Self::from_u32(self.as_u32() | RESPONSE_BIT)
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connect => "Connect",
            Self::ConnectResp => "ConnectResp",
            Self::ActiveTest => "ActiveTest",
            Self::ActiveTestResp => "ActiveTestResp",
            Self::Terminate => "Terminate",
            Self::TerminateResp => "TerminateResp",
            Self::Submit => "Submit",
            Self::SubmitResp => "SubmitResp",
            Self::Deliver => "Deliver",
            Self::DeliverResp => "DeliverResp",
            Self::Query => "Query",
            Self::QueryResp => "QueryResp",
            Self::Cancel => "Cancel",
            Self::CancelResp => "CancelResp",
        };
        write!(f, "{name}")
    }
}

/// Handshake outcome carried by ConnectResp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectStatus {
    /// 0: success
    Success,
    /// 1: malformed message structure
    BadStructure,
    /// 2: source address not recognised
    IllegalSourceAddr,
    /// 3: authenticator did not verify
    AuthenticationError,
    /// 4: requested version newer than supported
    VersionTooHigh,
    /// 5 and anything above: other error, raw code kept
    Other(u32),
}

impl ConnectStatus {
    /// Convert from the wire value
    #[must_use]
    pub const fn from_u32(code: u32) -> Self {
        match code {
            0 => Self::Success,
            1 => Self::BadStructure,
            2 => Self::IllegalSourceAddr,
            3 => Self::AuthenticationError,
            4 => Self::VersionTooHigh,
            other => Self::Other(other),
        }
    }

    /// Convert to the wire value
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        match self {
            Self::Success => 0,
            Self::BadStructure => 1,
            Self::IllegalSourceAddr => 2,
            Self::AuthenticationError => 3,
            Self::VersionTooHigh => 4,
            Self::Other(code) => code,
        }
    }

    /// Check for status 0
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for ConnectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::BadStructure => write!(f, "bad message structure"),
            Self::IllegalSourceAddr => write!(f, "illegal source address"),
            Self::AuthenticationError => write!(f, "authentication error"),
            Self::VersionTooHigh => write!(f, "version too high"),
            Self::Other(code) => write!(f, "other error ({code})"),
        }
    }
}

/// Protocol version byte: high nibble major, low nibble minor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Version(u8);

impl Version {
    /// CMPP 2.0
    pub const V2_0: Self = Self(0x20);
    /// CMPP 3.0
    pub const V3_0: Self = Self(0x30);

    /// Build from major and minor numbers (each 0..=15)
    #[must_use]
    pub const fn new(major: u8, minor: u8) -> Self {
        Self(((major & 0x0F) << 4) | (minor & 0x0F))
    }

    /// Wrap a raw version byte
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        Self(value)
    }

    /// Raw version byte
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    /// Major version
    #[must_use]
    pub const fn major(self) -> u8 {
        self.0 >> 4
    }

    /// Minor version
    #[must_use]
    pub const fn minor(self) -> u8 {
        self.0 & 0x0F
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::V3_0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major(), self.minor())
    }
}
