//! CMPP session state machine.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, instrument, trace, warn};

use super::config::SessionConfig;
use super::sequence::SequenceAllocator;
use super::state::{Role, SessionState};
use crate::dispatch;
use crate::protocol::{
    ActiveTest, ActiveTestResp, CommandId, Connect, ConnectResp, ConnectStatus, Error,
    FrameHeader, HEADER_LENGTH, Message, Pdu, RawPdu, Result, SourceAddr, Terminate,
    TerminateResp, Timestamp, Version,
};

/// A received frame the session accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Activity {
    /// Command received
    pub command: CommandId,
    /// Its sequence id
    pub sequence_id: u32,
    /// When it was processed
    pub at: Instant,
}

/// Result of handling one inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// State after the frame
    pub state: SessionState,
    /// Reply to write before anything else queued
    pub reply: Option<Pdu>,
    /// Payload PDU for the layer above
    pub inbound: Option<Pdu>,
    /// The transport should close once `reply` is written
    pub close_transport: bool,
}

impl Outcome {
    fn idle(state: SessionState) -> Self {
        Self {
            state,
            reply: None,
            inbound: None,
            close_transport: false,
        }
    }

    fn reply(state: SessionState, reply: impl Into<Pdu>) -> Self {
        Self {
            reply: Some(reply.into()),
            ..Self::idle(state)
        }
    }
}

/// One logical CMPP session over one transport connection.
///
/// The session never touches I/O. Feed it decoded frames through
/// [`Session::handle_inbound`] and write back whatever it replies.
#[derive(Debug)]
pub struct Session {
    role: Role,
    config: Arc<SessionConfig>,
    local_addr: SourceAddr,
    sequence: Arc<SequenceAllocator>,
    state: SessionState,
    pending_connect: Option<Connect>,
    pending_terminate: Option<u32>,
    rejected: Option<ConnectStatus>,
    peer: Option<SourceAddr>,
    negotiated_version: Option<Version>,
    last_inbound: Option<Activity>,
    last_heartbeat_ack: Option<Activity>,
}

impl Session {
    /// Create a session in `Disconnected`
    ///
    /// # Errors
    ///
    /// `FieldTooLong` when the configured source address exceeds six bytes.
    pub fn new(
        role: Role,
        config: Arc<SessionConfig>,
        sequence: Arc<SequenceAllocator>,
    ) -> Result<Self> {
        let local_addr = config.local_addr()?;
        Ok(Self {
            role,
            config,
            local_addr,
            sequence,
            state: SessionState::Disconnected,
            pending_connect: None,
            pending_terminate: None,
            rejected: None,
            peer: None,
            negotiated_version: None,
            last_inbound: None,
            last_heartbeat_ack: None,
        })
    }

    /// Role in the handshake
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Current phase
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the session reached `Closed`
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self.state, SessionState::Closed)
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Status of a failed handshake. Once set, every further frame closes
    /// the session.
    #[must_use]
    pub const fn rejected(&self) -> Option<ConnectStatus> {
        self.rejected
    }

    /// Authenticated peer (gateway role)
    #[must_use]
    pub const fn peer(&self) -> Option<&SourceAddr> {
        self.peer.as_ref()
    }

    /// Version agreed during the handshake
    #[must_use]
    pub const fn negotiated_version(&self) -> Option<Version> {
        self.negotiated_version
    }

    /// Last frame accepted from the peer
    #[must_use]
    pub const fn last_inbound(&self) -> Option<&Activity> {
        self.last_inbound.as_ref()
    }

    /// Last ActiveTestResp received
    #[must_use]
    pub const fn last_heartbeat_ack(&self) -> Option<&Activity> {
        self.last_heartbeat_ack.as_ref()
    }

    /// Next sequence id from the shared allocator
    pub fn next_sequence(&self) -> u32 {
        self.sequence.next_value()
    }

    /// Connect for the local identity, stamped with the current local time
    pub fn build_connect(&self) -> Connect {
        self.build_connect_at(Timestamp::now())
    }

    /// Connect for the local identity with an explicit timestamp
    pub fn build_connect_at(&self, timestamp: Timestamp) -> Connect {
        Connect::new(
            self.next_sequence(),
            self.local_addr,
            self.config.shared_secret.as_bytes(),
            self.config.version,
            timestamp,
        )
    }

    /// Heartbeat probe with a fresh sequence id
    pub fn build_active_test(&self) -> ActiveTest {
        ActiveTest::new(self.next_sequence())
    }

    /// Terminate with a fresh sequence id
    pub fn build_terminate(&self) -> Terminate {
        Terminate::new(self.next_sequence())
    }

    /// Transport is up: `Disconnected → Authenticating`.
    ///
    /// A client gets the Connect to send; a server starts waiting for one.
    pub fn connect(&mut self) -> Result<Option<Connect>> {
        self.connect_at(Timestamp::now())
    }

    /// [`Session::connect`] with an explicit Connect timestamp
    pub fn connect_at(&mut self, timestamp: Timestamp) -> Result<Option<Connect>> {
        if self.state != SessionState::Disconnected {
            return Err(Error::UnexpectedMessage {
                command: CommandId::Connect,
                state: self.state,
            });
        }
        self.state = SessionState::Authenticating;

        match self.role {
            Role::Client => {
                let connect = self.build_connect_at(timestamp);
                debug!(
                    sequence_id = connect.sequence_id(),
                    source_addr = %connect.source_addr(),
                    version = %connect.version(),
                    "sending connect"
                );
                self.pending_connect = Some(connect.clone());
                Ok(Some(connect))
            }
            Role::Server => {
                debug!("awaiting connect");
                Ok(None)
            }
        }
    }

    fn ensure_established(&self) -> Result<()> {
        match self.state {
            SessionState::Established => Ok(()),
            SessionState::Terminating | SessionState::Closed => {
                Err(Error::SessionClosed { state: self.state })
            }
            state => Err(Error::NotEstablished { state }),
        }
    }

    /// Check that `pdu` may be sent unprompted in the current phase.
    ///
    /// Only heartbeats and payload requests qualify; handshake and
    /// termination frames go through their own operations.
    pub fn check_outbound(&self, pdu: &Pdu) -> Result<()> {
        self.ensure_established()?;
        match pdu {
            Pdu::ActiveTest(_) | Pdu::Payload(_) => Ok(()),
            other => Err(Error::UnexpectedMessage {
                command: other.command(),
                state: self.state,
            }),
        }
    }

    /// Heartbeat probe, only while established
    pub fn active_test(&self) -> Result<ActiveTest> {
        self.ensure_established()?;
        Ok(self.build_active_test())
    }

    /// Payload request with a fresh sequence id, only while established
    pub fn payload(&self, command: CommandId, body: impl Into<bytes::Bytes>) -> Result<RawPdu> {
        if !command.is_payload() {
            return Err(Error::UnexpectedMessage {
                command,
                state: self.state,
            });
        }
        self.ensure_established()?;

        let body = body.into();
        let max = (self.config.max_frame_length as usize).saturating_sub(HEADER_LENGTH);
        if body.len() > max {
            return Err(Error::FieldTooLong {
                field: "body",
                len: body.len(),
                max,
            });
        }
        RawPdu::new(command, self.next_sequence(), body)
    }

    /// Start an orderly shutdown: `Established → Terminating`
    pub fn terminate(&mut self) -> Result<Terminate> {
        self.ensure_established()?;
        let terminate = self.build_terminate();
        debug!(sequence_id = terminate.sequence_id(), "sending terminate");
        self.pending_terminate = Some(terminate.sequence_id());
        self.state = SessionState::Terminating;
        Ok(terminate)
    }

    /// The transport is gone; nothing further is processed
    pub fn close(&mut self) {
        if self.state != SessionState::Closed {
            debug!(from = %self.state, "session closed");
        }
        self.state = SessionState::Closed;
        self.pending_connect = None;
        self.pending_terminate = None;
    }

    /// Handle one inbound frame.
    ///
    /// Length mismatches, decode errors and messages illegal in the current
    /// phase close the session and return the error. Unknown command ids are
    /// logged and skipped. After a failed handshake any known command closes
    /// the session with `AuthenticationFailed`. While terminating, only the
    /// awaited TerminateResp (or a crossing Terminate) is processed; anything
    /// else is refused.
    #[instrument(
        level = "debug",
        skip(self, body),
        fields(command_id = header.command_id(), sequence_id = header.sequence_id())
    )]
    pub fn handle_inbound(&mut self, header: FrameHeader, body: &[u8]) -> Result<Outcome> {
        if !self.state.is_open() {
            return Err(Error::SessionClosed { state: self.state });
        }
        if let Err(err) = header.check_length(body.len()) {
            return Err(self.fail(err));
        }

        let Some(route) = dispatch::lookup(header.command_id()) else {
            warn!(
                command_id = format_args!("{:#010x}", header.command_id()),
                total_length = header.total_length(),
                "skipping unknown command"
            );
            return Ok(Outcome::idle(self.state));
        };

        if let Some(status) = self.rejected {
            return Err(self.fail(Error::AuthenticationFailed { status }));
        }

        if self.state == SessionState::Terminating && !self.accepts_while_terminating(route.command)
        {
            trace!(command = %route.command, "refused while terminating");
            return Err(Error::SessionClosed { state: self.state });
        }

        let pdu = match (route.decode)(header, body) {
            Ok(pdu) => pdu,
            Err(err) => return Err(self.fail(err)),
        };
        self.last_inbound = Some(Activity {
            command: route.command,
            sequence_id: header.sequence_id(),
            at: Instant::now(),
        });

        (route.handle)(self, pdu)
    }

    fn accepts_while_terminating(&self, command: CommandId) -> bool {
        match command {
            CommandId::TerminateResp => true,
            CommandId::Terminate => self.pending_terminate.is_some(),
            _ => false,
        }
    }

    /// Record a protocol violation and close
    pub(crate) fn fail(&mut self, err: Error) -> Error {
        warn!(error = %err, state = %self.state, "protocol violation, closing session");
        self.close();
        err
    }

    pub(crate) fn unexpected(&mut self, command: CommandId) -> Error {
        let err = Error::UnexpectedMessage {
            command,
            state: self.state,
        };
        self.fail(err)
    }

    pub(crate) fn on_connect(&mut self, connect: Connect) -> Result<Outcome> {
        if self.role != Role::Server || self.state != SessionState::Authenticating {
            return Err(self.unexpected(CommandId::Connect));
        }

        let config = Arc::clone(&self.config);
        let response = match config.peer_secret(connect.source_addr()) {
            Some(secret) => connect.to_response(secret.as_bytes(), config.version),
            None => connect.respond(ConnectStatus::IllegalSourceAddr, &[], config.version),
        };

        let status = response.status();
        if status.is_success() {
            debug!(
                peer = %connect.source_addr(),
                version = %connect.version(),
                "connect accepted"
            );
            self.peer = Some(*connect.source_addr());
            self.negotiated_version = Some(connect.version());
            self.state = SessionState::Established;
            Ok(Outcome::reply(self.state, response))
        } else {
            warn!(
                peer = %connect.source_addr(),
                %status,
                "connect rejected"
            );
            self.rejected = Some(status);
            Ok(Outcome {
                close_transport: true,
                ..Outcome::reply(self.state, response)
            })
        }
    }

    pub(crate) fn on_connect_resp(&mut self, response: ConnectResp) -> Result<Outcome> {
        if self.role != Role::Client || self.state != SessionState::Authenticating {
            return Err(self.unexpected(CommandId::ConnectResp));
        }
        let Some(connect) = self.pending_connect.take() else {
            return Err(self.unexpected(CommandId::ConnectResp));
        };
        if response.sequence_id() != connect.sequence_id() {
            let err = Error::SequenceMismatch {
                command: CommandId::ConnectResp,
                expected: connect.sequence_id(),
                found: response.sequence_id(),
            };
            return Err(self.fail(err));
        }

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "gateway rejected connect");
            self.rejected = Some(status);
            return Err(Error::AuthenticationFailed { status });
        }
        if !response.verify(
            connect.authenticator_source(),
            self.config.shared_secret.as_bytes(),
        ) {
            warn!("gateway authenticator did not verify");
            let status = ConnectStatus::AuthenticationError;
            self.rejected = Some(status);
            return Err(Error::AuthenticationFailed { status });
        }

        debug!(version = %response.version(), "session established");
        self.negotiated_version = Some(response.version());
        self.state = SessionState::Established;
        Ok(Outcome::idle(self.state))
    }

    pub(crate) fn on_active_test(&mut self, probe: ActiveTest) -> Result<Outcome> {
        if self.state != SessionState::Established {
            return Err(self.unexpected(CommandId::ActiveTest));
        }
        trace!(sequence_id = probe.sequence_id(), "answering active test");
        Ok(Outcome::reply(self.state, probe.to_response()))
    }

    pub(crate) fn on_active_test_resp(&mut self, response: ActiveTestResp) -> Result<Outcome> {
        if self.state != SessionState::Established {
            return Err(self.unexpected(CommandId::ActiveTestResp));
        }
        self.last_heartbeat_ack = Some(Activity {
            command: CommandId::ActiveTestResp,
            sequence_id: response.sequence_id(),
            at: Instant::now(),
        });
        Ok(Outcome::idle(self.state))
    }

    pub(crate) fn on_terminate(&mut self, terminate: Terminate) -> Result<Outcome> {
        match self.state {
            SessionState::Established => {
                debug!(sequence_id = terminate.sequence_id(), "peer terminated session");
                self.state = SessionState::Terminating;
                Ok(Outcome {
                    close_transport: true,
                    ..Outcome::reply(self.state, terminate.to_response())
                })
            }
            // Both ends sent Terminate; acknowledge and keep waiting for ours
            SessionState::Terminating if self.pending_terminate.is_some() => {
                Ok(Outcome::reply(self.state, terminate.to_response()))
            }
            _ => Err(self.unexpected(CommandId::Terminate)),
        }
    }

    pub(crate) fn on_terminate_resp(&mut self, response: TerminateResp) -> Result<Outcome> {
        let Some(expected) = self.pending_terminate else {
            return Err(self.unexpected(CommandId::TerminateResp));
        };
        if response.sequence_id() != expected {
            let err = Error::SequenceMismatch {
                command: CommandId::TerminateResp,
                expected,
                found: response.sequence_id(),
            };
            return Err(self.fail(err));
        }
        self.close();
        Ok(Outcome {
            close_transport: true,
            ..Outcome::idle(self.state)
        })
    }

    pub(crate) fn on_payload(&mut self, pdu: RawPdu) -> Result<Outcome> {
        if self.state != SessionState::Established {
            return Err(self.unexpected(pdu.command()));
        }
        trace!(command = %pdu.command(), len = pdu.body().len(), "payload received");
        Ok(Outcome {
            inbound: Some(pdu.into()),
            ..Outcome::idle(self.state)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{DEFAULT_MAX_FRAME_LENGTH, gateway_digest, source_digest};

    const SECRET: &str = "S3cret";

    fn config(version: Version) -> Arc<SessionConfig> {
        Arc::new(SessionConfig::new("123456", SECRET).with_version(version))
    }

    fn session(role: Role, version: Version) -> Session {
        Session::new(role, config(version), Arc::new(SequenceAllocator::new())).unwrap()
    }

    fn feed(session: &mut Session, pdu: &Pdu) -> Result<Outcome> {
        let frame = pdu.encode();
        let header = FrameHeader::from_bytes(&frame).unwrap();
        session.handle_inbound(header, &frame[HEADER_LENGTH..])
    }

    fn established_pair() -> (Session, Session) {
        let mut client = session(Role::Client, Version::V2_0);
        let mut server = session(Role::Server, Version::V2_0);
        let connect = client.connect().unwrap().unwrap();
        assert!(server.connect().unwrap().is_none());

        let outcome = feed(&mut server, &connect.into()).unwrap();
        let reply = outcome.reply.unwrap();
        feed(&mut client, &reply).unwrap();
        assert_eq!(client.state(), SessionState::Established);
        assert_eq!(server.state(), SessionState::Established);
        assert_eq!(client.negotiated_version(), Some(Version::V2_0));
        assert_eq!(server.negotiated_version(), Some(Version::V2_0));
        (client, server)
    }

    #[test]
    fn handshake_scenario() {
        let mut server = session(Role::Server, Version::V2_0);
        server.connect().unwrap();

        let connect = Connect::new(
            1,
            SourceAddr::new("123456").unwrap(),
            SECRET.as_bytes(),
            Version::V2_0,
            Timestamp::from_u32(1_001_235_010),
        );
        let expected_source = source_digest(b"123456", SECRET.as_bytes(), 1_001_235_010);
        assert_eq!(connect.authenticator_source(), &expected_source);

        let outcome = feed(&mut server, &connect.into()).unwrap();
        let Some(Pdu::ConnectResp(resp)) = outcome.reply else {
            panic!("expected ConnectResp");
        };
        assert_eq!(resp.status(), ConnectStatus::Success);
        assert_eq!(
            resp.authenticator_gateway(),
            &gateway_digest(0, &expected_source, SECRET.as_bytes())
        );
        assert_eq!(resp.sequence_id(), 1);
        assert_eq!(outcome.state, SessionState::Established);
        assert!(!outcome.close_transport);
        assert_eq!(server.peer().and_then(SourceAddr::as_str), Some("123456"));
    }

    #[test]
    fn version_too_high_is_reported_then_closed() {
        let mut server = session(Role::Server, Version::V2_0);
        server.connect().unwrap();

        let connect = Connect::new(
            5,
            SourceAddr::new("123456").unwrap(),
            b"wrong secret",
            Version::from_u8(0x30),
            Timestamp::from_u32(1_001_235_010),
        );
        let outcome = feed(&mut server, &connect.into()).unwrap();
        let Some(Pdu::ConnectResp(resp)) = outcome.reply else {
            panic!("expected ConnectResp");
        };
        assert_eq!(resp.status(), ConnectStatus::VersionTooHigh);
        assert_eq!(outcome.state, SessionState::Authenticating);
        assert!(outcome.close_transport);
    }

    #[test]
    fn unknown_peer_gets_illegal_source_addr() {
        let config = Arc::new(SessionConfig::new("", "").with_peer("901234", "alpha"));
        let mut server =
            Session::new(Role::Server, config, Arc::new(SequenceAllocator::new())).unwrap();
        server.connect().unwrap();

        let connect = Connect::new(
            2,
            SourceAddr::new("555555").unwrap(),
            b"alpha",
            Version::V2_0,
            Timestamp::from_u32(1),
        );
        let outcome = feed(&mut server, &connect.into()).unwrap();
        let Some(Pdu::ConnectResp(resp)) = outcome.reply else {
            panic!("expected ConnectResp");
        };
        assert_eq!(resp.status(), ConnectStatus::IllegalSourceAddr);
        assert!(outcome.close_transport);
    }

    #[test]
    fn client_rejects_failed_status() {
        let mut client = session(Role::Client, Version::V2_0);
        let connect = client.connect().unwrap().unwrap();
        let resp = connect.respond(ConnectStatus::AuthenticationError, SECRET.as_bytes(), Version::V2_0);

        let err = feed(&mut client, &resp.into()).unwrap_err();
        assert!(matches!(
            err,
            Error::AuthenticationFailed {
                status: ConnectStatus::AuthenticationError
            }
        ));
        assert_eq!(client.state(), SessionState::Authenticating);
    }

    #[test]
    fn client_rejects_gateway_without_secret() {
        let mut client = session(Role::Client, Version::V2_0);
        let connect = client.connect().unwrap().unwrap();
        let resp = connect.respond(ConnectStatus::Success, b"not the secret", Version::V2_0);

        assert!(matches!(
            feed(&mut client, &resp.into()),
            Err(Error::AuthenticationFailed { .. })
        ));
        assert_ne!(client.state(), SessionState::Established);
    }

    #[test]
    fn client_rejects_uncorrelated_response() {
        let mut client = session(Role::Client, Version::V2_0);
        let connect = client.connect().unwrap().unwrap();
        let resp = ConnectResp::new(
            connect.sequence_id() + 1,
            ConnectStatus::Success,
            [0u8; 16],
            Version::V2_0,
        );
        assert!(matches!(
            feed(&mut client, &resp.into()),
            Err(Error::SequenceMismatch { .. })
        ));
        assert!(client.is_closed());
    }

    #[test]
    fn active_test_answered_with_same_sequence() {
        let (_client, mut server) = established_pair();
        let outcome = feed(&mut server, &ActiveTest::new(0xBEEF).into()).unwrap();

        assert_eq!(
            outcome.reply,
            Some(Pdu::ActiveTestResp(ActiveTestResp::new(0xBEEF)))
        );
        assert_eq!(outcome.state, SessionState::Established);
    }

    #[test]
    fn active_test_before_handshake_is_a_violation() {
        let mut server = session(Role::Server, Version::V2_0);
        server.connect().unwrap();
        assert!(matches!(
            feed(&mut server, &ActiveTest::new(1).into()),
            Err(Error::UnexpectedMessage {
                command: CommandId::ActiveTest,
                state: SessionState::Authenticating
            })
        ));
        assert!(server.is_closed());
    }

    #[test]
    fn heartbeat_ack_is_recorded() {
        let (mut client, _server) = established_pair();
        let probe = client.active_test().unwrap();
        feed(&mut client, &probe.to_response().into()).unwrap();

        let ack = client.last_heartbeat_ack().unwrap();
        assert_eq!(ack.sequence_id, probe.sequence_id());
        assert_eq!(client.last_inbound().unwrap().command, CommandId::ActiveTestResp);
    }

    #[test]
    fn remote_terminate_then_refuse() {
        let (_client, mut server) = established_pair();
        let outcome = feed(&mut server, &Terminate::new(77).into()).unwrap();

        assert_eq!(outcome.state, SessionState::Terminating);
        assert_eq!(outcome.reply, Some(Pdu::TerminateResp(TerminateResp::new(77))));
        assert!(outcome.close_transport);

        assert!(matches!(
            feed(&mut server, &ActiveTest::new(78).into()),
            Err(Error::SessionClosed { .. })
        ));
        assert!(matches!(
            feed(&mut server, &Terminate::new(79).into()),
            Err(Error::SessionClosed { .. })
        ));
        assert_eq!(server.state(), SessionState::Terminating);

        server.close();
        assert!(matches!(
            feed(&mut server, &ActiveTest::new(80).into()),
            Err(Error::SessionClosed {
                state: SessionState::Closed
            })
        ));
    }

    #[test]
    fn local_terminate_closes_on_response() {
        let (mut client, _server) = established_pair();
        let terminate = client.terminate().unwrap();
        assert_eq!(client.state(), SessionState::Terminating);
        assert!(client.active_test().is_err());

        let outcome = feed(&mut client, &terminate.to_response().into()).unwrap();
        assert_eq!(outcome.state, SessionState::Closed);
        assert!(client.is_closed());
    }

    #[test]
    fn crossing_terminates() {
        let (mut client, _server) = established_pair();
        let terminate = client.terminate().unwrap();

        let outcome = feed(&mut client, &Terminate::new(900).into()).unwrap();
        assert_eq!(outcome.reply, Some(Pdu::TerminateResp(TerminateResp::new(900))));
        assert_eq!(client.state(), SessionState::Terminating);

        feed(&mut client, &terminate.to_response().into()).unwrap();
        assert!(client.is_closed());
    }

    #[test]
    fn payload_delivered_when_established() {
        let (mut client, mut server) = established_pair();
        let submit = client.payload(CommandId::Submit, vec![1u8, 2, 3]).unwrap();
        let outcome = feed(&mut server, &submit.clone().into()).unwrap();
        assert_eq!(outcome.inbound, Some(Pdu::Payload(submit)));
        assert!(outcome.reply.is_none());
    }

    #[test]
    fn payload_requires_established() {
        let mut client = session(Role::Client, Version::V2_0);
        client.connect().unwrap();
        assert!(matches!(
            client.payload(CommandId::Submit, vec![0u8]),
            Err(Error::NotEstablished {
                state: SessionState::Authenticating
            })
        ));
    }

    #[test]
    fn unknown_command_is_skipped() {
        let (_client, mut server) = established_pair();
        let header = FrameHeader::from_raw(14, 0x0000_0099, 3);
        let outcome = server.handle_inbound(header, &[0u8, 0]).unwrap();
        assert_eq!(outcome, Outcome::idle(SessionState::Established));
        assert_eq!(server.state(), SessionState::Established);
    }

    #[test]
    fn length_mismatch_closes() {
        let (_client, mut server) = established_pair();
        let header = FrameHeader::from_raw(39, CommandId::Connect.as_u32(), 3);
        let err = server.handle_inbound(header, &[0u8; 8]).unwrap_err();
        assert!(err.is_packet_error());
        assert!(server.is_closed());
    }

    #[test]
    fn second_connect_is_rejected() {
        let mut client = session(Role::Client, Version::V2_0);
        client.connect().unwrap();
        assert!(client.connect().is_err());
    }

    #[test]
    fn rejected_connect_is_final() {
        let mut server = session(Role::Server, Version::V2_0);
        server.connect().unwrap();
        assert_eq!(server.role(), Role::Server);

        let forged = Connect::new(
            1,
            SourceAddr::new("123456").unwrap(),
            b"wrong",
            Version::V2_0,
            Timestamp::from_u32(1_001_235_010),
        );
        let outcome = feed(&mut server, &forged.into()).unwrap();
        let Some(Pdu::ConnectResp(resp)) = outcome.reply else {
            panic!("expected ConnectResp");
        };
        assert_eq!(resp.status().as_u32(), 3);
        assert!(outcome.close_transport);
        assert_eq!(server.rejected(), Some(ConnectStatus::AuthenticationError));

        // A correctly signed retry on the same session must not authenticate
        let retry = Connect::new(
            2,
            SourceAddr::new("123456").unwrap(),
            SECRET.as_bytes(),
            Version::V2_0,
            Timestamp::from_u32(1_001_235_011),
        );
        assert!(matches!(
            feed(&mut server, &retry.into()),
            Err(Error::AuthenticationFailed {
                status: ConnectStatus::AuthenticationError
            })
        ));
        assert_eq!(server.state(), SessionState::Closed);
        assert!(server.peer().is_none());
        assert!(server.negotiated_version().is_none());
    }

    #[test]
    fn only_unknown_commands_pass_after_rejection() {
        let config = Arc::new(SessionConfig::new("", "").with_peer("123456", SECRET));
        let mut server =
            Session::new(Role::Server, config, Arc::new(SequenceAllocator::new())).unwrap();
        server.connect().unwrap();

        let connect = Connect::new(
            1,
            SourceAddr::new("654321").unwrap(),
            SECRET.as_bytes(),
            Version::V2_0,
            Timestamp::from_u32(1),
        );
        feed(&mut server, &connect.into()).unwrap();
        assert_eq!(server.rejected(), Some(ConnectStatus::IllegalSourceAddr));

        let header = FrameHeader::from_raw(12, 0x0000_0099, 2);
        assert!(server.handle_inbound(header, &[]).is_ok());
        assert!(matches!(
            feed(&mut server, &ActiveTest::new(3).into()),
            Err(Error::AuthenticationFailed {
                status: ConnectStatus::IllegalSourceAddr
            })
        ));
        assert!(server.is_closed());
    }

    #[test]
    fn client_closes_on_frames_after_failed_status() {
        let mut client = session(Role::Client, Version::V2_0);
        assert_eq!(client.role(), Role::Client);
        let connect = client.connect().unwrap().unwrap();
        let resp =
            connect.respond(ConnectStatus::IllegalSourceAddr, SECRET.as_bytes(), Version::V2_0);
        feed(&mut client, &resp.into()).unwrap_err();
        assert_eq!(client.rejected(), Some(ConnectStatus::IllegalSourceAddr));

        assert!(matches!(
            feed(&mut client, &ActiveTest::new(5).into()),
            Err(Error::AuthenticationFailed { .. })
        ));
        assert!(client.is_closed());
    }

    #[test]
    fn payload_larger_than_frame_limit_is_refused() {
        let (client, _server) = established_pair();
        let max = DEFAULT_MAX_FRAME_LENGTH as usize - HEADER_LENGTH;

        let submit = client.payload(CommandId::Submit, vec![0u8; max]).unwrap();
        assert_eq!(submit.encode().len(), DEFAULT_MAX_FRAME_LENGTH as usize);
        assert!(matches!(
            client.payload(CommandId::Submit, vec![0u8; max + 1]),
            Err(Error::FieldTooLong { field: "body", len, max: limit })
                if len == max + 1 && limit == max
        ));
        assert_eq!(client.state(), SessionState::Established);
    }
}
