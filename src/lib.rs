//! marklink library.
//!
//! Schema-driven packet codec plus the mark/space framed serial link that
//! carries it. The binary in `main.rs` is a thin console over these
//! modules; everything here is host-testable against a scripted
//! [`link::Transport`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod config;
pub mod error;
pub mod link;
pub mod packet;

pub use error::{Error, Result};
