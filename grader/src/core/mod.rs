//! Deterministic, pure logic for keyword-transformation checks.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! text and return deterministic outputs suitable for tests.

pub mod keyword;
pub mod tokens;
pub mod verify;
