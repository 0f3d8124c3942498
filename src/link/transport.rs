//! Transport abstraction: a half-duplex byte channel with switchable parity.
//!
//! Concrete implementations:
//! - Linux serial device with mark/space parity ([`crate::adapters::serial`])
//! - [`NullTransport`] for dry runs
//!
//! The framer is generic over `Transport`, so tests drive it with a
//! scripted channel instead of a real port.

/// Parity bit setting used as the packet-start marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    /// Parity bit forced to 1. Flags the first byte of a packet.
    Mark,
    /// Parity bit forced to 0. Every other byte.
    Space,
}

/// Byte-oriented serial channel.
pub trait Transport {
    /// Error type for this transport.
    type Error: core::fmt::Debug;

    /// Read up to `buf.len()` bytes into `buf`.
    /// May block up to the per-read timeout; returns 0 when it expires.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Write `data`, returning the number of bytes accepted.
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Switch the parity applied to subsequent writes.
    fn set_parity(&mut self, parity: Parity) -> Result<(), Self::Error>;
}

/// A null transport that accepts all writes and never reads.
pub struct NullTransport;

impl Transport for NullTransport {
    type Error = ();

    fn read(&mut self, _buf: &mut [u8]) -> Result<usize, ()> {
        Ok(0)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, ()> {
        Ok(data.len())
    }

    fn set_parity(&mut self, _parity: Parity) -> Result<(), ()> {
        Ok(())
    }
}
