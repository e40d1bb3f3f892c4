//! CMPP error types

use thiserror::Error;

use super::CommandId;
use crate::session::SessionState;

/// CMPP protocol errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Buffer too small for the header or the command's minimum body
    #[error("buffer too small: need {needed} bytes, got {got}")]
    BufferTooSmall {
        /// Needed size
        needed: usize,
        /// Actual size
        got: usize,
    },

    /// Body handed to the wrong decoder
    #[error("command mismatch: expected {expected:#010x}, got {found:#010x}")]
    CommandMismatch {
        /// Command id the decoder handles
        expected: u32,
        /// Command id found in the header
        found: u32,
    },

    /// Declared total length disagrees with the bytes delivered
    #[error("length mismatch: header declares {declared} bytes, frame has {actual}")]
    LengthMismatch {
        /// `TotalLength` from the header
        declared: u32,
        /// Bytes actually available
        actual: usize,
    },

    /// Declared total length is outside the acceptable range
    #[error("invalid total length {declared} (allowed {min}..={max})")]
    InvalidLength {
        /// `TotalLength` from the header
        declared: u32,
        /// Smallest legal frame
        min: u32,
        /// Largest accepted frame
        max: u32,
    },

    /// Value does not fit its fixed-width field
    #[error("field `{field}` too long: {len} bytes (max {max})")]
    FieldTooLong {
        /// Field name
        field: &'static str,
        /// Supplied length
        len: usize,
        /// Field width
        max: usize,
    },

    /// No dispatcher route for the command id
    #[error("unknown command id {command_id:#010x}")]
    UnknownCommand {
        /// Raw command id
        command_id: u32,
    },

    /// Message not legal in the session's current phase
    #[error("unexpected {command} in state {state}")]
    UnexpectedMessage {
        /// Offending command
        command: CommandId,
        /// State the session was in
        state: SessionState,
    },

    /// Response does not correlate with the outstanding request
    #[error("sequence mismatch for {command}: expected {expected}, got {found}")]
    SequenceMismatch {
        /// Response command
        command: CommandId,
        /// Sequence id of the outstanding request
        expected: u32,
        /// Sequence id received
        found: u32,
    },

    /// Handshake rejected by the gateway, or the gateway failed to prove the secret
    #[error("authentication failed: {status}")]
    AuthenticationFailed {
        /// Status reported (or assumed) for the handshake
        status: super::ConnectStatus,
    },

    /// Operation not allowed before the session is established
    #[error("session not established (state {state})")]
    NotEstablished {
        /// Current state
        state: SessionState,
    },

    /// Session is shutting down or closed; no further PDUs are processed
    #[error("session closed (state {state})")]
    SessionClosed {
        /// Current state
        state: SessionState,
    },

    /// Too many consecutive active tests went unanswered
    #[error("heartbeat timeout: {missed} active tests unanswered")]
    HeartbeatTimeout {
        /// Unanswered probes
        missed: u32,
    },
}

impl Error {
    /// Whether this error belongs to the malformed/truncated frame family.
    ///
    /// These are fatal to the decode attempt; a session receiving one closes.
    #[must_use]
    pub const fn is_packet_error(&self) -> bool {
        matches!(
            self,
            Self::BufferTooSmall { .. }
                | Self::CommandMismatch { .. }
                | Self::LengthMismatch { .. }
                | Self::InvalidLength { .. }
        )
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
