//! Pure, deterministic logic: the tree store contract, structural
//! invariants, annotation normalization, truncation, and shared outcome
//! types. No I/O, fully testable in isolation.

pub mod budget;
pub mod invariants;
pub mod normalize;
pub mod store;
pub mod truncate;
pub mod types;
