//! Schema-driven packet model.
//!
//! ```text
//! ┌──────────────┐   ┌───────────────┐   ┌──────────────────┐
//! │ Schema doc   │──▶│ loader        │──▶│ SchemaRegistry   │
//! │ (JSON)       │   │ (records)     │   │ tag → schema     │
//! └──────────────┘   └───────────────┘   └──────────────────┘
//!                                              │
//!                                              ▼
//!                    ┌───────────────┐   ┌──────────────────┐
//!                    │ field codec   │◀──│ PacketSchema     │
//!                    │ (typed bytes) │   │ header/data/cs   │
//!                    └───────────────┘   └──────────────────┘
//! ```

pub mod field;
pub mod loader;
pub mod registry;
pub mod schema;
pub mod tag;

pub use field::{FieldAccess, FieldDefinition, FieldType, FieldValue};
pub use registry::SchemaRegistry;
pub use schema::PacketSchema;
pub use tag::SearchTag;

/// Header bytes: target, length, sequence, sender, message code.
pub const HEADER_LEN: usize = 5;

/// Header plus checksum; a packet with no payload.
pub const MIN_PACK_LEN: usize = 6;

/// Device id of the console (this host).
pub const CONSOLE_ID: u8 = 0xF0;

/// Sequence numbers are not implemented by the protocol; always zero.
pub const SEQUENCE: u8 = 0x00;

/// Offsets into a received packet.
pub const TARGET_IDX: usize = 0;
pub const PACKLEN_IDX: usize = 1;
pub const SENDER_IDX: usize = 3;
pub const MSG_IDX: usize = 4;
pub const DATA_IDX: usize = HEADER_LEN;

/// Wrapping 8-bit sum.
pub fn byte_sum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// The byte that brings the packet sum to zero (mod 256).
pub fn checksum(bytes: &[u8]) -> u8 {
    byte_sum(bytes).wrapping_neg()
}
