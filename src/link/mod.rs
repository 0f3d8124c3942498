//! Serial link layer.
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐
//! │ Session      │──▶│ Framer       │──▶│ Transport        │
//! │ send/handle  │   │ mark/space,  │   │ (serial / mock)  │
//! │ response     │   │ destuff, cs  │   └──────────────────┘
//! └──────────────┘   └──────────────┘
//!                           │
//!                           ▼
//!                    ┌──────────────┐
//!                    │ ExchangeSink │
//!                    └──────────────┘
//! ```

pub mod framer;
pub mod session;
pub mod telemetry;
pub mod transport;

pub use framer::{FrameState, Framer, LinkState, destuff, destuff_in_place, validate_checksum};
pub use session::Session;
pub use telemetry::{Direction, ExchangeRecord, ExchangeSink};
pub use transport::{NullTransport, Parity, Transport};
