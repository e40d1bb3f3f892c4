//! Sans-I/O connection driver.
//!
//! Owns a [`Session`] plus the byte-level plumbing around it: frame
//! reassembly, an outbound queue and heartbeat timing. The caller moves
//! bytes between the transport and [`Connection::receive`] /
//! [`Connection::poll_transmit`], and calls [`Connection::on_tick`]
//! periodically.
//!
//! Replies (ConnectResp, ActiveTestResp, TerminateResp) always leave before
//! queued requests, so a heartbeat is answered even behind a backlog.

use std::collections::VecDeque;
use std::time::Instant;

use bytes::Bytes;
use tracing::{debug, trace};

use super::machine::Session;
use super::state::SessionState;
use crate::protocol::{CommandId, Error, FrameBuffer, Message, Pdu, Result};

/// Session plus framing and heartbeat bookkeeping for one transport
#[derive(Debug)]
pub struct Connection {
    session: Session,
    frames: FrameBuffer,
    replies: VecDeque<Bytes>,
    requests: VecDeque<Bytes>,
    close_after_flush: bool,
    last_received: Option<Instant>,
    last_probe: Option<Instant>,
    probes_unanswered: u32,
}

impl Connection {
    /// Wrap a session in `Disconnected`
    #[must_use]
    pub fn new(session: Session) -> Self {
        let frames = FrameBuffer::with_max_frame_length(session.config().max_frame_length);
        Self {
            session,
            frames,
            replies: VecDeque::new(),
            requests: VecDeque::new(),
            close_after_flush: false,
            last_received: None,
            last_probe: None,
            probes_unanswered: 0,
        }
    }

    /// Underlying session
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Current session phase
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Whether the transport should be dropped
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.session.is_closed()
    }

    /// Transport is up. A client queues its Connect.
    pub fn open(&mut self) -> Result<()> {
        self.open_at(Instant::now())
    }

    /// [`Connection::open`] with an explicit clock reading
    pub fn open_at(&mut self, now: Instant) -> Result<()> {
        if let Some(connect) = self.session.connect()? {
            self.push_request(&connect.into());
        }
        self.last_received = Some(now);
        Ok(())
    }

    /// Feed bytes read from the transport.
    ///
    /// Returns the payload PDUs that became available. Errors that close the
    /// session stop processing; frames refused while terminating are skipped.
    pub fn receive(&mut self, data: &[u8]) -> Result<Vec<Pdu>> {
        self.receive_at(data, Instant::now())
    }

    /// [`Connection::receive`] with an explicit clock reading
    pub fn receive_at(&mut self, data: &[u8], now: Instant) -> Result<Vec<Pdu>> {
        if self.close_after_flush || self.session.is_closed() {
            trace!(len = data.len(), "dropping bytes after close");
            return Ok(Vec::new());
        }

        let frames = match self.frames.push(data) {
            Ok(frames) => frames,
            Err(err) => {
                self.frames.clear();
                return Err(self.session.fail(err));
            }
        };

        let mut delivered = Vec::new();
        for frame in frames {
            if self.close_after_flush || self.session.is_closed() {
                break;
            }
            self.last_received = Some(now);
            self.probes_unanswered = 0;

            match self.session.handle_inbound(frame.header, &frame.body) {
                Ok(outcome) => {
                    if let Some(reply) = outcome.reply {
                        self.push_reply(&reply);
                    }
                    if let Some(pdu) = outcome.inbound {
                        delivered.push(pdu);
                    }
                    if outcome.close_transport {
                        self.close_after_flush = true;
                        self.requests.clear();
                        self.frames.clear();
                    }
                }
                Err(Error::SessionClosed { state }) if state == SessionState::Terminating => {
                    trace!(command_id = frame.header.command_id(), "ignored while terminating");
                }
                Err(err @ Error::AuthenticationFailed { .. }) => {
                    self.close_after_flush = true;
                    self.requests.clear();
                    self.frames.clear();
                    return Err(err);
                }
                Err(err) => {
                    self.frames.clear();
                    return Err(err);
                }
            }
        }
        Ok(delivered)
    }

    /// Queue a heartbeat or payload request built by the caller
    pub fn send(&mut self, pdu: Pdu) -> Result<()> {
        self.session.check_outbound(&pdu)?;
        self.push_request(&pdu);
        Ok(())
    }

    /// Queue a payload request with a fresh sequence id, returning the id
    pub fn submit(&mut self, command: CommandId, body: impl Into<Bytes>) -> Result<u32> {
        let pdu = self.session.payload(command, body)?;
        let sequence_id = pdu.header().sequence_id();
        self.push_request(&pdu.into());
        Ok(sequence_id)
    }

    /// Start an orderly shutdown. Queued requests not yet written are dropped.
    pub fn terminate(&mut self) -> Result<u32> {
        let terminate = self.session.terminate()?;
        let dropped = self.requests.len();
        if dropped > 0 {
            debug!(dropped, "discarding queued requests on terminate");
        }
        self.requests.clear();
        let sequence_id = terminate.sequence_id();
        self.push_request(&terminate.into());
        Ok(sequence_id)
    }

    /// Next frame to write, replies first.
    ///
    /// After a reply that ends the session is handed out, the session closes.
    pub fn poll_transmit(&mut self) -> Option<Bytes> {
        if let Some(frame) = self.replies.pop_front() {
            trace!(len = frame.len(), "dequeue reply");
            if self.close_after_flush && self.replies.is_empty() {
                self.session.close();
            }
            return Some(frame);
        }
        if self.close_after_flush {
            self.session.close();
            return None;
        }
        if self.session.is_closed() {
            return None;
        }
        let frame = self.requests.pop_front();
        if let Some(ref bytes) = frame {
            trace!(len = bytes.len(), "dequeue request");
        }
        frame
    }

    /// Whether anything is waiting to be written
    #[must_use]
    pub fn has_pending_transmit(&self) -> bool {
        !self.replies.is_empty() || (!self.session.is_closed() && !self.requests.is_empty())
    }

    /// Drive heartbeats.
    ///
    /// After `active_test_interval` without inbound traffic (or since the last
    /// probe) an ActiveTest is queued. Once `max_missed_active_tests` probes
    /// go unanswered the session closes with `HeartbeatTimeout`.
    pub fn on_tick(&mut self, now: Instant) -> Result<()> {
        if self.session.state() != SessionState::Established {
            return Ok(());
        }
        let config = self.session.config();
        let interval = config.active_test_interval;
        let max_missed = config.max_missed_active_tests;

        let reference = match (self.last_received, self.last_probe) {
            (Some(received), Some(probe)) => received.max(probe),
            (Some(at), None) | (None, Some(at)) => at,
            (None, None) => {
                self.last_received = Some(now);
                return Ok(());
            }
        };
        if now.saturating_duration_since(reference) < interval {
            return Ok(());
        }

        if self.probes_unanswered >= max_missed {
            let err = Error::HeartbeatTimeout {
                missed: self.probes_unanswered,
            };
            return Err(self.session.fail(err));
        }

        let probe = self.session.active_test()?;
        debug!(
            sequence_id = probe.sequence_id(),
            unanswered = self.probes_unanswered,
            "sending active test"
        );
        self.push_request(&probe.into());
        self.last_probe = Some(now);
        self.probes_unanswered += 1;
        Ok(())
    }

    fn push_reply(&mut self, pdu: &Pdu) {
        trace!(command = %pdu.command(), sequence_id = pdu.sequence_id(), "enqueue reply");
        self.replies.push_back(pdu.encode());
    }

    fn push_request(&mut self, pdu: &Pdu) {
        trace!(command = %pdu.command(), sequence_id = pdu.sequence_id(), "enqueue request");
        self.requests.push_back(pdu.encode());
    }
}
