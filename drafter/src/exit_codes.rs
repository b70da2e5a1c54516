//! Stable exit codes for drafter CLI commands.

/// Command succeeded, or the checked/drafted output passed validation.
pub const OK: i32 = 0;
/// Invalid input, settings, profile or corpus, or any other error.
pub const INVALID: i32 = 1;
/// `drafter check` found violations, or `drafter draft` did not produce an accepted draft.
pub const VIOLATIONS: i32 = 2;
/// `drafter citations --id` named an anchor that is not in the corpus.
pub const NOT_FOUND: i32 = 3;
