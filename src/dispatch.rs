//! Command routing.
//!
//! One static table maps each known command id to its body decoder and its
//! session handler. Both the codec and the session look commands up here.

use crate::protocol::{
    ActiveTest, ActiveTestResp, CommandId, Connect, ConnectResp, FrameHeader, Message, Pdu,
    RawPdu, Result, Terminate, TerminateResp,
};
use crate::session::{Outcome, Session};

pub(crate) type DecodeFn = fn(FrameHeader, &[u8]) -> Result<Pdu>;
pub(crate) type HandleFn = fn(&mut Session, Pdu) -> Result<Outcome>;

/// Decoder and handler for one command id
pub(crate) struct Route {
    pub command: CommandId,
    pub decode: DecodeFn,
    pub handle: HandleFn,
}

static ROUTES: [Route; 14] = [
    route(CommandId::Connect, decode_as::<Connect>, handle_connect),
    route(CommandId::ConnectResp, decode_as::<ConnectResp>, handle_connect_resp),
    route(CommandId::ActiveTest, decode_as::<ActiveTest>, handle_active_test),
    route(
        CommandId::ActiveTestResp,
        decode_as::<ActiveTestResp>,
        handle_active_test_resp,
    ),
    route(CommandId::Terminate, decode_as::<Terminate>, handle_terminate),
    route(
        CommandId::TerminateResp,
        decode_as::<TerminateResp>,
        handle_terminate_resp,
    ),
    route(CommandId::Submit, decode_payload, handle_payload),
    route(CommandId::SubmitResp, decode_payload, handle_payload),
    route(CommandId::Deliver, decode_payload, handle_payload),
    route(CommandId::DeliverResp, decode_payload, handle_payload),
    route(CommandId::Query, decode_payload, handle_payload),
    route(CommandId::QueryResp, decode_payload, handle_payload),
    route(CommandId::Cancel, decode_payload, handle_payload),
    route(CommandId::CancelResp, decode_payload, handle_payload),
];

const fn route(command: CommandId, decode: DecodeFn, handle: HandleFn) -> Route {
    Route {
        command,
        decode,
        handle,
    }
}

/// Route registered for `command_id`
pub(crate) fn lookup(command_id: u32) -> Option<&'static Route> {
    ROUTES
        .iter()
        .find(|route| route.command.as_u32() == command_id)
}

fn decode_as<M: Message + Into<Pdu>>(header: FrameHeader, body: &[u8]) -> Result<Pdu> {
    M::decode(header, body).map(Into::into)
}

fn decode_payload(header: FrameHeader, body: &[u8]) -> Result<Pdu> {
    RawPdu::decode(header, body).map(Pdu::Payload)
}

fn handle_connect(session: &mut Session, pdu: Pdu) -> Result<Outcome> {
    match pdu {
        Pdu::Connect(m) => session.on_connect(m),
        other => Err(session.unexpected(other.command())),
    }
}

fn handle_connect_resp(session: &mut Session, pdu: Pdu) -> Result<Outcome> {
    match pdu {
        Pdu::ConnectResp(m) => session.on_connect_resp(m),
        other => Err(session.unexpected(other.command())),
    }
}

fn handle_active_test(session: &mut Session, pdu: Pdu) -> Result<Outcome> {
    match pdu {
        Pdu::ActiveTest(m) => session.on_active_test(m),
        other => Err(session.unexpected(other.command())),
    }
}

fn handle_active_test_resp(session: &mut Session, pdu: Pdu) -> Result<Outcome> {
    match pdu {
        Pdu::ActiveTestResp(m) => session.on_active_test_resp(m),
        other => Err(session.unexpected(other.command())),
    }
}

fn handle_terminate(session: &mut Session, pdu: Pdu) -> Result<Outcome> {
    match pdu {
        Pdu::Terminate(m) => session.on_terminate(m),
        other => Err(session.unexpected(other.command())),
    }
}

fn handle_terminate_resp(session: &mut Session, pdu: Pdu) -> Result<Outcome> {
    match pdu {
        Pdu::TerminateResp(m) => session.on_terminate_resp(m),
        other => Err(session.unexpected(other.command())),
    }
}

fn handle_payload(session: &mut Session, pdu: Pdu) -> Result<Outcome> {
    match pdu {
        Pdu::Payload(m) => session.on_payload(m),
        other => Err(session.unexpected(other.command())),
    }
}
