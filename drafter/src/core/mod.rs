//! Deterministic, pure logic shared by the drafting core.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod chunker;
pub mod citations;
pub mod invariants;
pub mod profile;
pub mod retrieval;
pub mod types;
pub mod validator;
