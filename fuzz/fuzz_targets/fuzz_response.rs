//! Fuzz target: `Framer` read path + `Session::handle_response`
//!
//! Feeds arbitrary reply bytes, split into two reads, to a session and
//! checks that every exchange ends in `Done` without panicking and that
//! any accepted packet carries a valid checksum.
//!
//! cargo fuzz run fuzz_response

#![no_main]

use libfuzzer_sys::fuzz_target;
use marklink::config::LinkConfig;
use marklink::link::{FrameState, Parity, Session, Transport, validate_checksum};
use marklink::packet::{FieldDefinition, FieldType, PacketSchema, SchemaRegistry, SearchTag};

struct Replay<'a> {
    chunks: [&'a [u8]; 2],
    next: usize,
}

impl Transport for Replay<'_> {
    type Error = ();

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ()> {
        let Some(chunk) = self.chunks.get(self.next) else {
            return Ok(0);
        };
        self.next += 1;
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, ()> {
        Ok(data.len())
    }

    fn set_parity(&mut self, _parity: Parity) -> Result<(), ()> {
        Ok(())
    }
}

fuzz_target!(|data: &[u8]| {
    let split = data.first().map_or(0, |&b| usize::from(b)).min(data.len());
    let (a, b) = data.split_at(split);

    let config = LinkConfig {
        response_timeout_ms: 0,
        poll_interval_ms: 0,
        parity_settle_us: 0,
        ..LinkConfig::default()
    };
    let mut session = Session::new(Replay { chunks: [a, b], next: 0 }, config);

    let cmd_tag = SearchTag::new(0x11, 0xF0, 0x01);
    let reply_tag = SearchTag::new(0xF0, 0x11, 0x01);
    let mut registry = SchemaRegistry::new();
    let Ok(cmd) = PacketSchema::new(cmd_tag, 6, "Cmd", vec![]) else {
        return;
    };
    registry.insert(cmd_tag, cmd);
    let field = FieldDefinition::new("v", FieldType::Word, 2, vec![], None);
    if let Ok(reply) = PacketSchema::new(reply_tag, 8, "Reply", vec![field]) {
        registry.insert(reply_tag, reply);
    }

    if session.exchange(&mut registry, &cmd_tag).is_ok() {
        assert!(validate_checksum(session.received()));
    }
    assert_eq!(session.framer().state(), FrameState::Done);
});
