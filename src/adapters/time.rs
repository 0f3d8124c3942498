//! Session clock for exchange log timestamps.
//!
//! Milliseconds since the session started, wrapped at 100 000 so the
//! stamp always fits five digits.

use std::time::Instant;

/// Stamps wrap back to zero at this many milliseconds.
pub const STAMP_WRAP_MS: u128 = 100_000;

pub struct SessionClock {
    start: Instant,
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Milliseconds since start, modulo [`STAMP_WRAP_MS`].
    pub fn stamp_ms(&self) -> u32 {
        (self.start.elapsed().as_millis() % STAMP_WRAP_MS) as u32
    }
}

/// Render a stamp as the fixed-width `SSSSSms` log prefix.
pub fn format_stamp(ms: u32) -> String {
    format!("{ms:05}ms")
}
