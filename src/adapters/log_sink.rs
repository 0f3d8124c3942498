//! Log-based exchange sink adapter.
//!
//! Implements [`ExchangeSink`] by writing one line per exchange event on
//! the `exchange` log target:
//!
//! ```text
//! 01234ms OUT 0x110700F089056A
//! 01301ms IN  0xF0080011100BB824
//! 02410ms ERROR_TIMEOUT
//! ```
//!
//! Route the target to its own file or filter it with `RUST_LOG`.

use log::{info, warn};

use super::time::{SessionClock, format_stamp};
use crate::link::telemetry::{Direction, ExchangeRecord, ExchangeSink};

pub const LOG_TARGET: &str = "exchange";

/// Render one record after `stamp`.
pub fn format_record(stamp: u32, record: &ExchangeRecord<'_>) -> String {
    let label = match (record.status, record.direction) {
        (Some(err), _) => err.log_label(),
        (None, Direction::Out) => "OUT",
        (None, Direction::In) => "IN ",
    };
    if record.bytes.is_empty() {
        format!("{} {}", format_stamp(stamp), label)
    } else {
        format!(
            "{} {} 0x{}",
            format_stamp(stamp),
            label,
            hex::encode_upper(record.bytes)
        )
    }
}

/// Adapter that logs every exchange against a session clock.
#[derive(Default)]
pub struct LogExchangeSink {
    clock: SessionClock,
}

impl LogExchangeSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExchangeSink for LogExchangeSink {
    fn record(&mut self, record: &ExchangeRecord<'_>) {
        let line = format_record(self.clock.stamp_ms(), record);
        if record.status.is_some() {
            warn!(target: LOG_TARGET, "{}", line);
        } else {
            info!(target: LOG_TARGET, "{}", line);
        }
    }
}
