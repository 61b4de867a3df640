//! Persistent store contracts and implementations.
//!
//! # Responsibility
//! - Define the narrow insert/list contract the service layer depends on.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Write paths reject empty text before touching storage.
//! - Read paths reject invalid persisted rows instead of masking them.
//! - No handle is held between calls.

pub mod memory_store;
pub mod note_store;

pub use memory_store::InMemoryNoteStore;
pub use note_store::{NoteStore, SqliteNoteStore, StoreError, StoreResult};
