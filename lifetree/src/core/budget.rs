//! Shared time budget helper for deadline-bounded expansion.

use std::time::{Duration, Instant};

/// Remaining time until `deadline`, or `None` once it has passed.
///
/// An exhausted budget is an expected terminal condition of a bounded
/// traversal, so this is an `Option` rather than an error.
pub fn remaining_budget(deadline: Instant) -> Option<Duration> {
    let remaining = deadline
        .checked_duration_since(Instant::now())
        .unwrap_or(Duration::from_secs(0));
    if remaining.is_zero() { None } else { Some(remaining) }
}
