//! Session phases and roles.
//!
//! ```text
//!  Disconnected ──transport up──▶ Authenticating ──status 0──▶ Established ◀─┐
//!                                       │                        │   │       │
//!                                 status != 0                    │   └───────┘
//!                                 (transport closed)        Terminate  ActiveTest
//!                                                                ▼
//!  Closed ◀──────────── TerminateResp ─────────────────────── Terminating
//! ```
//!
//! Any protocol violation jumps straight to `Closed`.

use std::fmt;

/// Phase of a CMPP session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No transport yet
    Disconnected,
    /// Transport up, handshake in progress
    Authenticating,
    /// Handshake complete; heartbeats and payload flow
    Established,
    /// Terminate sent or received; waiting for the exchange to finish
    Terminating,
    /// Done; nothing further is processed or written
    Closed,
}

impl SessionState {
    /// Whether inbound frames can still be processed
    #[must_use]
    pub const fn is_open(self) -> bool {
        !matches!(self, Self::Closed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "Disconnected",
            Self::Authenticating => "Authenticating",
            Self::Established => "Established",
            Self::Terminating => "Terminating",
            Self::Closed => "Closed",
        };
        write!(f, "{name}")
    }
}

/// Which end of the handshake this session plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Role {
    /// Service provider: sends Connect
    Client,
    /// Gateway: answers Connect
    Server,
}
