//! CMPP (China Mobile Peer-to-Peer) protocol engine
//!
//! This library implements the connection-management core of CMPP, the
//! protocol SMS service providers use to talk to an SMS gateway over TCP.
//! It covers the binary frame codec, the Connect handshake with its MD5
//! authenticators, the ActiveTest heartbeat and orderly termination. It does
//! no I/O of its own: bytes go in, bytes come out.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use cmpp::{Connection, Role, SequenceAllocator, Session, SessionConfig, SessionState};
//!
//! let config = Arc::new(SessionConfig::new("901234", "secret"));
//! let sequence = Arc::new(SequenceAllocator::new());
//!
//! let mut client = Connection::new(Session::new(Role::Client, config.clone(), sequence.clone())?);
//! let mut gateway = Connection::new(Session::new(Role::Server, config, sequence)?);
//! client.open()?;
//! gateway.open()?;
//!
//! // Shuttle bytes as a socket would
//! while let Some(frame) = client.poll_transmit() {
//!     gateway.receive(&frame)?;
//! }
//! while let Some(frame) = gateway.poll_transmit() {
//!     client.receive(&frame)?;
//! }
//! assert_eq!(client.state(), SessionState::Established);
//! # Ok::<(), cmpp::Error>(())
//! ```
//!
//! # Layout
//!
//! - [`protocol`]: header, message bodies, digests and the frame codec
//! - [`session`]: the session state machine and its sans-I/O driver

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

mod dispatch;
pub mod protocol;
pub mod session;

pub use protocol::{
    CommandId, ConnectStatus, Error, FrameHeader, HEADER_LENGTH, Message, Pdu, Result, Version,
};
pub use session::{Connection, Role, SequenceAllocator, Session, SessionConfig, SessionState};
