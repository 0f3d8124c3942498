//! Exchange telemetry port.
//!
//! The framer reports every outgoing packet and every completed or failed
//! read through [`ExchangeSink`]. Adapters decide where records go; see
//! [`crate::adapters::log_sink::LogExchangeSink`].

use crate::error::CommError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Out,
    In,
}

/// One reported exchange event. `bytes` is empty for reads that
/// produced nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeRecord<'a> {
    pub direction: Direction,
    pub status: Option<CommError>,
    pub bytes: &'a [u8],
}

pub trait ExchangeSink {
    fn record(&mut self, record: &ExchangeRecord<'_>);
}
