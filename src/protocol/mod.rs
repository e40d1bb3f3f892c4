//! CMPP protocol core implementation
//!
//! This module provides the wire format, message types, digests and codec.

mod codec;
pub mod digest;
mod error;
pub mod fixed;
mod frame_buffer;
mod header;
mod message;
mod timestamp;
mod types;

pub use codec::{decode, decode_body, decode_header, encode};
pub use digest::{AUTHENTICATOR_LEN, Authenticator, gateway_digest, source_digest};
pub use error::{Error, Result};
pub use fixed::{pad_to, trim_trailing_zeros};
pub use frame_buffer::{DEFAULT_MAX_FRAME_LENGTH, FrameBuffer, RawFrame};
pub use header::FrameHeader;
pub use message::{
    ActiveTest, ActiveTestResp, Connect, ConnectResp, MAX_BODY_LEN, Message, Pdu, RawPdu,
    SOURCE_ADDR_LEN, SourceAddr, Terminate, TerminateResp,
};
pub use timestamp::Timestamp;
pub use types::{CommandId, ConnectStatus, RESPONSE_BIT, Version};

/// Header size in bytes
pub const HEADER_LENGTH: usize = 12;
