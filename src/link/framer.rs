//! Byte-level framing state machine.
//!
//! ```text
//!            begin()
//!               │
//!               ▼
//!         ┌───────────┐  first byte (mark), then rest (space)
//!         │  Writing  │─────────────────────────────┐
//!         └───────────┘                             │ no response
//!               │ response expected                 │ expected
//!               ▼                                   │
//!      ┌──────────────┐   bytes   ┌──────────┐      │
//!      │ AwaitingMark │──────────▶│ Reading  │      │
//!      └──────────────┘           └──────────┘      │
//!               │ timeout / empty      │ ≥ declared │
//!               ▼                      ▼            ▼
//!         ┌──────────────────────────────────────────┐
//!         │ Done  (cursor 0, line back to mark)      │
//!         └──────────────────────────────────────────┘
//! ```
//!
//! Each call to [`Framer::step`] makes at most one driver write or read.
//! Protocol failures end the exchange in `Done` with
//! [`LinkState::last_error`] set; driver failures are returned as
//! [`LinkError`] and leave the link unusable.

use std::time::Instant;

use log::{debug, error, warn};

use super::telemetry::{Direction, ExchangeRecord, ExchangeSink};
use super::transport::{Parity, Transport};
use crate::config::LinkConfig;
use crate::error::{CommError, LinkError};
use crate::packet::{MIN_PACK_LEN, PACKLEN_IDX, byte_sum};

/// Capacity of the outgoing packet buffer.
pub const OUT_BUF_LEN: usize = 256;

/// Capacity of the incoming buffer.
pub const IN_BUF_LEN: usize = 1280;

/// Escape byte introducing a stuffed sequence.
const STUFF: u8 = 0xFF;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameState {
    Writing = 0,
    /// Reads dispatch identically to `Reading`; kept distinct for the
    /// line's wait-for-mark phase.
    AwaitingMark = 1,
    Reading = 2,
    Done = 3,
}

impl FrameState {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Writing => "Writing",
            Self::AwaitingMark => "AwaitingMark",
            Self::Reading => "Reading",
            Self::Done => "Done",
        }
    }
}

// ---------------------------------------------------------------------------
// Link state
// ---------------------------------------------------------------------------

/// Buffers and cursors for the single exchange in flight.
pub struct LinkState {
    out: [u8; OUT_BUF_LEN],
    out_len: usize,
    inp: [u8; IN_BUF_LEN],
    /// Write or read cursor, depending on state.
    head: usize,
    received_len: usize,
    expect_response: bool,
    deadline: Option<Instant>,
    state: FrameState,
    last_error: Option<CommError>,
}

impl Default for LinkState {
    fn default() -> Self {
        Self {
            out: [0; OUT_BUF_LEN],
            out_len: 0,
            inp: [0; IN_BUF_LEN],
            head: 0,
            received_len: 0,
            expect_response: false,
            deadline: None,
            state: FrameState::Done,
            last_error: None,
        }
    }
}

impl LinkState {
    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn last_error(&self) -> Option<CommError> {
        self.last_error
    }

    pub fn head(&self) -> usize {
        self.head
    }

    pub fn expects_response(&self) -> bool {
        self.expect_response
    }

    /// The packet being written.
    pub fn outgoing(&self) -> &[u8] {
        &self.out[..self.out_len]
    }

    /// The last complete packet read, checksum included.
    pub fn received(&self) -> &[u8] {
        &self.inp[..self.received_len]
    }
}

// ---------------------------------------------------------------------------
// Framer
// ---------------------------------------------------------------------------

pub struct Framer<T: Transport> {
    transport: T,
    config: LinkConfig,
    sink: Option<Box<dyn ExchangeSink>>,
    /// Last parity applied to the line; `None` until first set.
    line: Option<Parity>,
    link: LinkState,
}

impl<T: Transport> Framer<T> {
    pub fn new(transport: T, config: LinkConfig) -> Self {
        Self {
            transport,
            config,
            sink: None,
            line: None,
            link: LinkState::default(),
        }
    }

    pub fn set_sink(&mut self, sink: Option<Box<dyn ExchangeSink>>) {
        self.sink = sink;
    }

    pub fn link(&self) -> &LinkState {
        &self.link
    }

    pub fn state(&self) -> FrameState {
        self.link.state
    }

    pub fn last_error(&self) -> Option<CommError> {
        self.link.last_error
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Load `bytes` for transmission and enter `Writing`.
    pub fn begin(&mut self, bytes: &[u8], expect_response: bool) -> Result<(), LinkError> {
        if bytes.len() > OUT_BUF_LEN {
            error!(
                "packet of {} bytes exceeds {} byte output buffer",
                bytes.len(),
                OUT_BUF_LEN
            );
            return Err(LinkError::BufferOverflow);
        }

        let link = &mut self.link;
        link.out[..bytes.len()].copy_from_slice(bytes);
        link.out_len = bytes.len();
        link.head = 0;
        link.received_len = 0;
        link.expect_response = expect_response;
        link.deadline = None;
        link.last_error = None;

        if bytes.is_empty() {
            warn!("begin: empty packet, nothing to write");
            self.transition(FrameState::Done);
        } else {
            self.transition(FrameState::Writing);
        }
        Ok(())
    }

    /// Advance the exchange by one driver call.
    pub fn step(&mut self) -> Result<FrameState, LinkError> {
        match self.link.state {
            FrameState::Writing => self.write_step()?,
            FrameState::AwaitingMark | FrameState::Reading => self.read_step()?,
            FrameState::Done => {}
        }
        Ok(self.link.state)
    }

    // -----------------------------------------------------------------------
    // Writing
    // -----------------------------------------------------------------------

    fn write_step(&mut self) -> Result<(), LinkError> {
        let len = self.link.out_len;
        let written = if self.link.head == 0 {
            self.apply_parity(Parity::Mark)?;
            let n = self.write_raw(0, 1)?;
            if let Some(sink) = self.sink.as_mut() {
                sink.record(&ExchangeRecord {
                    direction: Direction::Out,
                    status: None,
                    bytes: &self.link.out[..len],
                });
            }
            std::thread::sleep(self.config.parity_settle());
            self.apply_parity(Parity::Space)?;
            n
        } else {
            self.write_raw(self.link.head, len)?
        };

        self.link.head += written;
        if self.link.head >= len {
            self.link.head = 0;
            if self.link.expect_response {
                self.link.deadline = Some(Instant::now() + self.config.response_timeout());
                self.transition(FrameState::AwaitingMark);
            } else {
                self.finish()?;
            }
        }
        Ok(())
    }

    fn write_raw(&mut self, from: usize, to: usize) -> Result<usize, LinkError> {
        let n = self
            .transport
            .write(&self.link.out[from..to])
            .map_err(|e| {
                error!("write failed: {:?}", e);
                LinkError::WriteFailed
            })?;
        if n == 0 {
            error!("write accepted 0 of {} bytes", to - from);
            return Err(LinkError::ZeroWrite);
        }
        Ok(n)
    }

    // -----------------------------------------------------------------------
    // Reading
    // -----------------------------------------------------------------------

    fn read_step(&mut self) -> Result<(), LinkError> {
        let head = self.link.head;
        let n = self
            .transport
            .read(&mut self.link.inp[head..])
            .map_err(|e| {
                error!("read failed: {:?}", e);
                LinkError::ReadFailed
            })?;

        if n == 0 {
            let expired = self.link.deadline.is_none_or(|d| Instant::now() >= d);
            let err = if expired {
                CommError::Timeout
            } else {
                CommError::EmptyRead
            };
            return self.fail(err, 0);
        }

        let kept = destuff_in_place(&mut self.link.inp[head..head + n]);
        self.link.head += kept;
        if self.link.state == FrameState::AwaitingMark {
            self.transition(FrameState::Reading);
        }

        let declared = usize::from(self.link.inp[PACKLEN_IDX]);
        if self.link.head >= MIN_PACK_LEN && self.link.head >= declared {
            if declared < MIN_PACK_LEN {
                warn!("declared length {} below header size", declared);
                return self.fail(CommError::BadChecksum, self.link.head);
            }
            if validate_checksum(&self.link.inp[..declared]) {
                self.link.received_len = declared;
                self.report(Direction::In, None, declared);
                self.finish()?;
            } else {
                return self.fail(CommError::BadChecksum, declared);
            }
        }
        Ok(())
    }

    /// End the exchange with `err`, reporting the first `len` input bytes.
    fn fail(&mut self, err: CommError, len: usize) -> Result<(), LinkError> {
        debug!("exchange failed: {}", err);
        self.link.last_error = Some(err);
        self.report(Direction::In, Some(err), len);
        self.finish()
    }

    fn report(&mut self, direction: Direction, status: Option<CommError>, len: usize) {
        if let Some(sink) = self.sink.as_mut() {
            sink.record(&ExchangeRecord {
                direction,
                status,
                bytes: &self.link.inp[..len],
            });
        }
    }

    // -----------------------------------------------------------------------
    // Common
    // -----------------------------------------------------------------------

    fn finish(&mut self) -> Result<(), LinkError> {
        self.link.head = 0;
        self.link.deadline = None;
        self.transition(FrameState::Done);
        self.apply_parity(Parity::Mark)
    }

    fn apply_parity(&mut self, parity: Parity) -> Result<(), LinkError> {
        if self.line == Some(parity) {
            return Ok(());
        }
        self.transport.set_parity(parity).map_err(|e| {
            error!("set parity {:?} failed: {:?}", parity, e);
            LinkError::ConfigureFailed
        })?;
        self.line = Some(parity);
        Ok(())
    }

    fn transition(&mut self, to: FrameState) {
        if self.link.state != to {
            debug!("framer: {} -> {}", self.link.state.name(), to.name());
            self.link.state = to;
        }
    }
}

// ---------------------------------------------------------------------------
// Destuffing and checksum
// ---------------------------------------------------------------------------

/// One left-to-right pass over `buf[..len]`. Returns the new length.
fn destuff_pass(buf: &mut [u8], len: usize) -> usize {
    let (mut r, mut w) = (0, 0);
    while r < len {
        if buf[r] == STUFF && r + 1 < len {
            match buf[r + 1] {
                STUFF => {
                    buf[w] = STUFF;
                    w += 1;
                    r += 2;
                    continue;
                }
                0x00 => {
                    r += 2;
                    continue;
                }
                _ => {}
            }
        }
        buf[w] = buf[r];
        w += 1;
        r += 1;
    }
    w
}

/// Collapse `FF FF` to `FF` and drop `FF 00`, compacting `buf` in place
/// until neither sequence remains. Returns the logical length.
pub fn destuff_in_place(buf: &mut [u8]) -> usize {
    let mut len = buf.len();
    loop {
        let next = destuff_pass(buf, len);
        if next == len {
            return len;
        }
        len = next;
    }
}

pub fn destuff(bytes: &[u8]) -> Vec<u8> {
    let mut buf = bytes.to_vec();
    let len = destuff_in_place(&mut buf);
    buf.truncate(len);
    buf
}

/// A received packet is valid when all its bytes, checksum included,
/// sum to zero.
pub fn validate_checksum(packet: &[u8]) -> bool {
    byte_sum(packet) == 0
}
