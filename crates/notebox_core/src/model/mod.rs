//! Domain model for persisted notes.
//!
//! # Responsibility
//! - Define the single entity stored by notebox and its validation rules.
//!
//! # Invariants
//! - Every stored note has non-empty, trimmed text.
//! - Notes are create-once and immutable; there is no update or delete path.

pub mod note;
