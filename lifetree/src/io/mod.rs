//! Side-effecting operations: configuration, session persistence, and
//! child-process execution. Kept apart from `core` so tests can run the
//! deterministic logic without touching the filesystem.

pub mod config;
pub mod process;
pub mod session_store;
