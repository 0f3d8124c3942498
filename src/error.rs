//! Unified error types for marklink.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! caller's handling uniform. All variants are `Copy` so they can be
//! stored as the framer's last error and passed around without allocation.
//!
//! Two categories are kept apart:
//! - [`CommError`] is protocol-level and recoverable per exchange.
//! - [`LinkError`] is transport-level and requires a reconnect.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An exchange finished with a protocol-level failure.
    Comm(CommError),
    /// The serial transport failed; the connection must be reopened.
    Link(LinkError),
    /// A schema lookup, edit, or construction failed.
    Schema(SchemaError),
    /// Configuration is invalid.
    Config(&'static str),
}

impl Error {
    /// `true` when the error leaves the link unusable until reopened.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Link(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Comm(e) => write!(f, "comm: {e}"),
            Self::Link(e) => write!(f, "link: {e}"),
            Self::Schema(e) => write!(f, "schema: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Protocol errors
// ---------------------------------------------------------------------------

/// Per-exchange protocol failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommError {
    /// Received packet bytes do not sum to zero.
    BadChecksum = 1,
    /// No bytes arrived before the response deadline.
    Timeout = 2,
    /// A read returned nothing before the deadline (dropped connection).
    EmptyRead = 3,
    /// Attempted to send a schema that is not outgoing.
    InvalidMessage = 4,
    /// No schema matches the received header under either tag form.
    UnknownResponse = 5,
}

impl CommError {
    /// Label used by the exchange log.
    pub const fn log_label(self) -> &'static str {
        match self {
            Self::BadChecksum => "ERROR_BAD_CHECKSUM",
            Self::Timeout => "ERROR_TIMEOUT",
            Self::EmptyRead => "ERROR_MISSING_PACKET",
            Self::InvalidMessage => "ERROR_INVALID_MSG",
            Self::UnknownResponse => "ERROR_UNKNOWN_RESPONSE",
        }
    }
}

impl fmt::Display for CommError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadChecksum => write!(f, "bad checksum"),
            Self::Timeout => write!(f, "response timed out"),
            Self::EmptyRead => write!(f, "empty read"),
            Self::InvalidMessage => write!(f, "message is not outgoing"),
            Self::UnknownResponse => write!(f, "unknown response"),
        }
    }
}

impl From<CommError> for Error {
    fn from(e: CommError) -> Self {
        Self::Comm(e)
    }
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// The serial device could not be opened.
    OpenFailed,
    /// Line settings (baud, parity) could not be applied.
    ConfigureFailed,
    /// The driver reported a write failure.
    WriteFailed,
    /// A write call accepted zero bytes.
    ZeroWrite,
    /// The driver reported a read failure.
    ReadFailed,
    /// Outgoing packet does not fit the output buffer.
    BufferOverflow,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenFailed => write!(f, "open failed"),
            Self::ConfigureFailed => write!(f, "configure failed"),
            Self::WriteFailed => write!(f, "write failed"),
            Self::ZeroWrite => write!(f, "write accepted zero bytes"),
            Self::ReadFailed => write!(f, "read failed"),
            Self::BufferOverflow => write!(f, "packet exceeds output buffer"),
        }
    }
}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

// ---------------------------------------------------------------------------
// Schema errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaError {
    /// No schema is registered under the requested tag or name.
    NotFound,
    /// No field with the requested name exists in the schema.
    FieldNotFound,
    /// Fields may only be set on outgoing schemas with at least one field.
    NotEditable,
    /// A search tag or id string is malformed.
    BadTag,
    /// A field type name is not part of the supported set.
    UnknownFieldType,
    /// Declared packet length disagrees with the field layout.
    LengthMismatch,
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "schema not found"),
            Self::FieldNotFound => write!(f, "field not found"),
            Self::NotEditable => write!(f, "schema not editable"),
            Self::BadTag => write!(f, "malformed search tag"),
            Self::UnknownFieldType => write!(f, "unknown field type"),
            Self::LengthMismatch => write!(f, "packet length does not match fields"),
        }
    }
}

impl From<SchemaError> for Error {
    fn from(e: SchemaError) -> Self {
        Self::Schema(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
