//! Adapters: concrete implementations of the link's port traits.
//!
//! | Adapter    | Implements    | Connects to                  |
//! |------------|---------------|------------------------------|
//! | `serial`   | Transport     | Linux tty, termios2 parity   |
//! | `log_sink` | ExchangeSink  | `log` facade, `exchange` target |
//! | `time`     |               | Session timestamps for logs  |

pub mod log_sink;
pub mod serial;
pub mod time;
