//! I/O helpers for the drafting agent.

pub mod command;
pub mod document_store;
pub mod gateway;
pub mod profiles;
pub mod prompt;
pub mod settings;
