//! Scripted transport and recording sink for integration tests.
//!
//! The transport replays queued read chunks and records every write and
//! parity switch so tests can assert on the exact line activity.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use marklink::config::LinkConfig;
use marklink::error::CommError;
use marklink::link::{Direction, ExchangeRecord, ExchangeSink, Parity, Transport};

// ── Line activity ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum LineCall {
    Write(Vec<u8>),
    Parity(Parity),
}

// ── ScriptedTransport ─────────────────────────────────────────

#[derive(Default)]
pub struct ScriptedTransport {
    pub calls: Vec<LineCall>,
    reads: VecDeque<Vec<u8>>,
    pub zero_writes: bool,
    pub fail_reads: bool,
}

#[allow(dead_code)]
impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one chunk returned by a single read call.
    pub fn push_read(&mut self, chunk: &[u8]) {
        self.reads.push_back(chunk.to_vec());
    }

    /// Every byte written, in order.
    pub fn written(&self) -> Vec<u8> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                LineCall::Write(bytes) => Some(bytes.clone()),
                LineCall::Parity(_) => None,
            })
            .flatten()
            .collect()
    }

    pub fn last_parity(&self) -> Option<Parity> {
        self.calls.iter().rev().find_map(|c| match c {
            LineCall::Parity(p) => Some(*p),
            LineCall::Write(_) => None,
        })
    }
}

impl Transport for ScriptedTransport {
    type Error = &'static str;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, &'static str> {
        if self.fail_reads {
            return Err("scripted read failure");
        }
        let Some(mut chunk) = self.reads.pop_front() else {
            return Ok(0);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            self.reads.push_front(chunk.split_off(n));
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, &'static str> {
        if self.zero_writes {
            return Ok(0);
        }
        self.calls.push(LineCall::Write(data.to_vec()));
        Ok(data.len())
    }

    fn set_parity(&mut self, parity: Parity) -> Result<(), &'static str> {
        self.calls.push(LineCall::Parity(parity));
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

pub type Recorded = (Direction, Option<CommError>, Vec<u8>);

/// Shares its record list with the test through an `Rc`.
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub records: Rc<RefCell<Vec<Recorded>>>,
}

impl ExchangeSink for RecordingSink {
    fn record(&mut self, record: &ExchangeRecord<'_>) {
        self.records
            .borrow_mut()
            .push((record.direction, record.status, record.bytes.to_vec()));
    }
}

// ── Helpers ───────────────────────────────────────────────────

/// No sleeps, immediate response deadline.
pub fn fast_config() -> LinkConfig {
    LinkConfig {
        response_timeout_ms: 0,
        poll_interval_ms: 0,
        parity_settle_us: 0,
        ..LinkConfig::default()
    }
}

/// `body` followed by its checksum.
pub fn packet(body: &[u8]) -> Vec<u8> {
    let mut bytes = body.to_vec();
    bytes.push(marklink::packet::checksum(body));
    bytes
}
