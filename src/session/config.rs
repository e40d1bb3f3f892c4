//! Session configuration.
//!
//! Loading is left to the embedding application; this is the injected,
//! read-only view the engine consumes.

use std::collections::HashMap;
use std::time::Duration;

use crate::protocol::{DEFAULT_MAX_FRAME_LENGTH, SourceAddr, Version};

/// Peer identities and secrets known to a gateway
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct PeerTable {
    secrets: HashMap<String, String>,
}

impl PeerTable {
    /// Empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a peer's secret
    pub fn insert(&mut self, source_addr: impl Into<String>, secret: impl Into<String>) {
        self.secrets.insert(source_addr.into(), secret.into());
    }

    /// Secret registered for `source_addr`
    #[must_use]
    pub fn secret_for(&self, source_addr: &SourceAddr) -> Option<&str> {
        self.secrets
            .get(source_addr.as_str()?)
            .map(String::as_str)
    }

    /// Number of registered peers
    #[must_use]
    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    /// Whether no peers are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

/// Session configuration options.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionConfig {
    /// Local source address (SP id), at most six bytes. Sent in Connect.
    pub source_addr: String,
    /// Shared secret for the local identity. A gateway with an empty peer
    /// table checks every Connect against this secret.
    pub shared_secret: String,
    /// Highest protocol version supported locally.
    pub version: Version,
    /// Gateway-side table of peer secrets, keyed by source address.
    pub peers: PeerTable,
    /// Silence after which an active test is sent.
    pub active_test_interval: Duration,
    /// Consecutive unanswered active tests before the connection is dropped.
    pub max_missed_active_tests: u32,
    /// Largest frame accepted from the peer.
    pub max_frame_length: u32,
}

impl SessionConfig {
    /// Configuration for the given identity and secret, other fields defaulted
    #[must_use]
    pub fn new(source_addr: impl Into<String>, shared_secret: impl Into<String>) -> Self {
        Self {
            source_addr: source_addr.into(),
            shared_secret: shared_secret.into(),
            ..Self::default()
        }
    }

    /// Set the supported version
    #[must_use]
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Register a peer
    #[must_use]
    pub fn with_peer(mut self, source_addr: impl Into<String>, secret: impl Into<String>) -> Self {
        self.peers.insert(source_addr, secret);
        self
    }

    /// Set the heartbeat interval
    #[must_use]
    pub fn with_active_test_interval(mut self, interval: Duration) -> Self {
        self.active_test_interval = interval;
        self
    }

    /// Set how many unanswered heartbeats are tolerated
    #[must_use]
    pub fn with_max_missed_active_tests(mut self, max: u32) -> Self {
        self.max_missed_active_tests = max;
        self
    }

    /// Validated local source address
    pub fn local_addr(&self) -> crate::Result<SourceAddr> {
        SourceAddr::new(&self.source_addr)
    }

    /// Secret to check a peer's Connect against.
    ///
    /// With an empty peer table every source address shares `shared_secret`.
    #[must_use]
    pub fn peer_secret(&self, source_addr: &SourceAddr) -> Option<&str> {
        if self.peers.is_empty() {
            Some(self.shared_secret.as_str())
        } else {
            self.peers.secret_for(source_addr)
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            source_addr: String::new(),
            shared_secret: String::new(),
            version: Version::default(),
            peers: PeerTable::default(),
            active_test_interval: Duration::from_secs(30),
            max_missed_active_tests: 3,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
        }
    }
}
