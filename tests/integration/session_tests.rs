//! Full request/response exchanges through `Session` over a scripted line.

use marklink::error::{CommError, Error, LinkError, SchemaError};
use marklink::link::{Direction, FrameState, Parity, Session, validate_checksum};
use marklink::packet::{FieldDefinition, FieldType, PacketSchema, SchemaRegistry, SearchTag};

use crate::mock_link::{LineCall, RecordingSink, ScriptedTransport, fast_config, packet};

const SET_CMD: SearchTag = SearchTag::new(0x11, 0xF0, 0x89);
const SET_ACK: SearchTag = SearchTag::new(0xF0, 0x11, 0x89);
const PUSH_REQ: SearchTag = SearchTag::new(0x10, 0xF0, 0x92);

fn byte_field(name: &str, default: u8) -> FieldDefinition {
    FieldDefinition::new(name, FieldType::Byte, 1, vec![], Some(vec![default]))
}

fn registry() -> SchemaRegistry {
    let mut reg = SchemaRegistry::new();
    reg.insert(
        SET_CMD,
        PacketSchema::new(SET_CMD, 7, "Set Command", vec![byte_field("cmd", 0x05)]).unwrap(),
    );
    reg.insert(
        SET_ACK,
        PacketSchema::new(SET_ACK, 7, "Set Ack", vec![byte_field("status", 0)]).unwrap(),
    );
    reg.insert(
        PUSH_REQ,
        PacketSchema::new(PUSH_REQ, 6, "Push Request", vec![]).unwrap(),
    );
    let push_report = SearchTag::new(0xF0, 0x10, 0x92).with_length(8);
    reg.insert(
        push_report,
        PacketSchema::new(
            push_report,
            8,
            "Push Report",
            vec![FieldDefinition::new("level", FieldType::Word, 2, vec![], None)],
        )
        .unwrap(),
    );
    reg
}

fn session_with(transport: ScriptedTransport) -> (Session<ScriptedTransport>, RecordingSink) {
    let sink = RecordingSink::default();
    let session = Session::new(transport, fast_config()).with_sink(Box::new(sink.clone()));
    (session, sink)
}

// ── Happy path ────────────────────────────────────────────────

#[test]
fn exchange_writes_marked_packet_and_decodes_reply() {
    let mut line = ScriptedTransport::new();
    line.push_read(&packet(&[0xF0, 0x07, 0x00, 0x11, 0x89, 0x01]));
    let (mut session, sink) = session_with(line);
    let mut reg = registry();

    let reply = session.exchange(&mut reg, &SET_CMD).unwrap();
    assert_eq!(reply, SET_ACK);
    assert_eq!(reg.lookup_by_tag(&SET_ACK).unwrap().get_field::<u8>("status"), Ok(1));

    let expected = packet(&[0x11, 0x07, 0x00, 0xF0, 0x89, 0x05]);
    let line = session.transport_mut();
    assert_eq!(
        line.calls,
        vec![
            LineCall::Parity(Parity::Mark),
            LineCall::Write(vec![0x11]),
            LineCall::Parity(Parity::Space),
            LineCall::Write(expected[1..].to_vec()),
            LineCall::Parity(Parity::Mark),
        ]
    );

    let records = sink.records.borrow();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0], (Direction::Out, None, expected));
    assert_eq!(records[1].0, Direction::In);
    assert_eq!(records[1].1, None);
}

#[test]
fn reply_split_across_reads_is_destuffed() {
    let reply = packet(&[0xF0, 0x07, 0x00, 0x11, 0x89, 0xFF]);
    let mut line = ScriptedTransport::new();
    line.push_read(&reply[..3]);
    line.push_read(&[0x11, 0x89, 0xFF, 0xFF, reply[6]]);
    let (mut session, _) = session_with(line);
    let mut reg = registry();

    session.exchange(&mut reg, &SET_CMD).unwrap();
    assert_eq!(session.received(), reply.as_slice());
    assert_eq!(reg.lookup_by_tag(&SET_ACK).unwrap().get_field::<u8>("status"), Ok(0xFF));
}

#[test]
fn break_marker_in_reply_is_dropped() {
    let reply = packet(&[0xF0, 0x07, 0x00, 0x11, 0x89, 0x02]);
    let mut line = ScriptedTransport::new();
    let mut stuffed = vec![0xFF, 0x00];
    stuffed.extend_from_slice(&reply);
    line.push_read(&stuffed);
    let (mut session, _) = session_with(line);
    let mut reg = registry();

    assert_eq!(session.exchange(&mut reg, &SET_CMD), Ok(SET_ACK));
    assert_eq!(reg.lookup_by_tag(&SET_ACK).unwrap().get_field::<u8>("status"), Ok(2));
}

#[test]
fn length_keyed_reply_resolves_with_four_part_tag() {
    let mut line = ScriptedTransport::new();
    line.push_read(&packet(&[0xF0, 0x08, 0x00, 0x10, 0x92, 0x12, 0x34]));
    let (mut session, _) = session_with(line);
    let mut reg = registry();

    let reply = session.exchange(&mut reg, &PUSH_REQ).unwrap();
    assert_eq!(reply.to_string(), "F0:10:92:08");
    assert_eq!(reg.lookup_by_tag(&reply).unwrap().get_field::<u16>("level"), Ok(0x1234));
}

#[test]
fn parity_marked_reply_with_escaped_ff_word() {
    // The driver flags the mark-parity first byte as FF 00 and doubles a
    // literal FF in the payload.
    let reply = packet(&[0xF0, 0x08, 0x00, 0x10, 0x92, 0xFF, 0x12]);
    let mut wire = vec![0xFF, 0x00];
    wire.extend_from_slice(&reply[..6]);
    wire.extend_from_slice(&[0xFF, 0x12, reply[7]]);
    let mut line = ScriptedTransport::new();
    line.push_read(&wire);
    let (mut session, _) = session_with(line);
    let mut reg = registry();

    let tag = session.exchange(&mut reg, &PUSH_REQ).unwrap();
    assert_eq!(session.received(), reply.as_slice());
    assert_eq!(reg.lookup_by_tag(&tag).unwrap().get_field::<u16>("level"), Ok(0xFF12));
}

#[test]
fn echoed_command_resolves_to_its_own_schema() {
    let mut reg = registry();
    reg.lookup_by_tag_mut(&SET_CMD).unwrap().set_field("cmd", 0x01u8).unwrap();

    let echo = packet(&[0x11, 0x07, 0x00, 0xF0, 0x89, 0x05]);
    assert!(validate_checksum(&echo));
    let mut line = ScriptedTransport::new();
    line.push_read(&echo);
    let (mut session, _) = session_with(line);

    assert_eq!(session.exchange(&mut reg, &SET_CMD), Ok(SET_CMD));
    assert_eq!(reg.lookup_by_tag(&SET_CMD).unwrap().get_field::<u8>("cmd"), Ok(0x05));
}

#[test]
fn send_without_reply_never_reads() {
    let mut line = ScriptedTransport::new();
    line.fail_reads = true;
    let (mut session, sink) = session_with(line);
    let reg = registry();

    let cmd = reg.lookup_by_tag(&SET_CMD).unwrap();
    assert_eq!(session.send_without_reply(cmd), Ok(()));
    assert_eq!(session.framer().state(), FrameState::Done);
    assert_eq!(session.transport_mut().last_parity(), Some(Parity::Mark));
    assert_eq!(sink.records.borrow().len(), 1);
}

// ── Protocol failures ─────────────────────────────────────────

#[test]
fn bad_checksum_is_reported_and_nothing_is_received() {
    let mut reply = packet(&[0xF0, 0x07, 0x00, 0x11, 0x89, 0x01]);
    reply[6] = reply[6].wrapping_add(1);
    let mut line = ScriptedTransport::new();
    line.push_read(&reply);
    let (mut session, sink) = session_with(line);
    let reg = registry();

    let cmd = reg.lookup_by_tag(&SET_CMD).unwrap();
    assert_eq!(session.send(cmd), Err(Error::Comm(CommError::BadChecksum)));
    assert!(session.received().is_empty());
    assert_eq!(session.transport_mut().last_parity(), Some(Parity::Mark));

    let records = sink.records.borrow();
    assert_eq!(records[1], (Direction::In, Some(CommError::BadChecksum), reply));
}

#[test]
fn declared_length_below_header_is_rejected() {
    let reply = [0xF0, 0x00, 0x00, 0x11, 0x89, 0x42];
    let mut line = ScriptedTransport::new();
    line.push_read(&reply);
    let (mut session, sink) = session_with(line);
    let reg = registry();

    let cmd = reg.lookup_by_tag(&SET_CMD).unwrap();
    assert_eq!(session.send(cmd), Err(Error::Comm(CommError::BadChecksum)));
    assert!(session.received().is_empty());
    assert_eq!(
        sink.records.borrow()[1],
        (Direction::In, Some(CommError::BadChecksum), reply.to_vec())
    );
}

#[test]
fn silent_device_times_out_and_restores_mark() {
    let (mut session, sink) = session_with(ScriptedTransport::new());
    let reg = registry();

    let cmd = reg.lookup_by_tag(&SET_CMD).unwrap();
    assert_eq!(session.send(cmd), Err(Error::Comm(CommError::Timeout)));
    assert_eq!(session.framer().link().head(), 0);
    assert_eq!(session.transport_mut().last_parity(), Some(Parity::Mark));
    assert_eq!(
        sink.records.borrow()[1],
        (Direction::In, Some(CommError::Timeout), vec![])
    );
}

#[test]
fn unregistered_reply_is_unknown_response() {
    let mut line = ScriptedTransport::new();
    line.push_read(&packet(&[0xF0, 0x06, 0x00, 0x11, 0x77]));
    let (mut session, _) = session_with(line);
    let mut reg = registry();

    assert_eq!(
        session.exchange(&mut reg, &SET_CMD),
        Err(Error::Comm(CommError::UnknownResponse))
    );
}

#[test]
fn reply_with_wrong_length_leaves_fields_untouched() {
    // Registered Set Ack is 7 bytes; this one is 8.
    let mut line = ScriptedTransport::new();
    line.push_read(&packet(&[0xF0, 0x08, 0x00, 0x11, 0x89, 0x09, 0x09]));
    let (mut session, _) = session_with(line);
    let mut reg = registry();

    assert_eq!(session.exchange(&mut reg, &SET_CMD), Ok(SET_ACK));
    assert_eq!(reg.lookup_by_tag(&SET_ACK).unwrap().get_field::<u8>("status"), Ok(0));
}

#[test]
fn incoming_schema_is_rejected_before_touching_the_line() {
    let (mut session, _) = session_with(ScriptedTransport::new());
    let reg = registry();

    let ack = reg.lookup_by_tag(&SET_ACK).unwrap();
    assert_eq!(session.send(ack), Err(Error::Comm(CommError::InvalidMessage)));
    assert!(session.transport_mut().calls.is_empty());
}

#[test]
fn missing_tag_is_not_found() {
    let (mut session, _) = session_with(ScriptedTransport::new());
    let mut reg = registry();
    assert_eq!(
        session.exchange(&mut reg, &SearchTag::new(0x11, 0xF0, 0x01)),
        Err(Error::Schema(SchemaError::NotFound))
    );
}

// ── Driver failures ───────────────────────────────────────────

#[test]
fn zero_byte_write_is_fatal() {
    let mut line = ScriptedTransport::new();
    line.zero_writes = true;
    let (mut session, _) = session_with(line);
    let reg = registry();

    let err = session.send(reg.lookup_by_tag(&SET_CMD).unwrap()).unwrap_err();
    assert_eq!(err, Error::Link(LinkError::ZeroWrite));
    assert!(err.is_fatal());
}

#[test]
fn failed_read_is_fatal() {
    let mut line = ScriptedTransport::new();
    line.fail_reads = true;
    let (mut session, _) = session_with(line);
    let reg = registry();

    let err = session.send(reg.lookup_by_tag(&SET_CMD).unwrap()).unwrap_err();
    assert_eq!(err, Error::Link(LinkError::ReadFailed));
}
