//! Constraint-checked contract clause drafting.
//!
//! A model drafts clauses, a deterministic validator checks them against a
//! constraint profile, and violations are fed back as corrective prompts until
//! the draft passes or the retry budget runs out. The crate keeps a strict split:
//!
//! - **[`core`]**: Pure, deterministic logic (profiles, citation parsing, chunking,
//!   context selection, validation). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (settings, document store, generation
//!   gateway, subprocesses, prompt rendering). Isolated to enable scripting in tests.
//!
//! Orchestration modules ([`agent`], [`stream`]) combine both to implement the
//! drafting loop and its streamed projection.

pub mod agent;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod stream;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
