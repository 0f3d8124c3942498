//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that drives a full exchange through
//! `Session` and `Framer` against a scripted transport. No serial device
//! is required.

mod mock_link;
mod schema_document_tests;
mod session_tests;
