//! CMPP session layer: handshake, heartbeat and termination
//!
//! [`Session`] is the state machine for one logical session. [`Connection`]
//! wraps it with frame reassembly, an outbound queue and heartbeat timing,
//! still without doing any I/O.

mod config;
mod connection;
mod machine;
mod sequence;
mod state;

pub use config::{PeerTable, SessionConfig};
pub use connection::Connection;
pub use machine::{Activity, Outcome, Session};
pub use sequence::SequenceAllocator;
pub use state::{Role, SessionState};
