//! Stable exit codes for the CLI.

/// Command succeeded; includes capped/degraded expansions (reported as
/// warnings on stderr).
pub const OK: i32 = 0;
/// Invalid input, unknown session or node, or an invariant violation.
pub const INVALID: i32 = 1;
/// The session document could not be persisted even after retry; a fallback
/// snapshot path is named in the error output when one was written.
pub const STORE_FAILURE: i32 = 2;
