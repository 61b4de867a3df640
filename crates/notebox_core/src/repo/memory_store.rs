//! In-process note store.
//!
//! Same contract as the SQLite store, without durability. Used by tests and
//! by `serve --in-memory`.

use crate::model::note::{trim_note_text, Note, NoteId, NoteValidationError};
use crate::repo::note_store::{NoteStore, StoreResult};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct MemoryState {
    notes: Vec<Note>,
    last_id: NoteId,
}

/// Mutex-guarded vector store with sequential ids starting at 1.
#[derive(Debug, Default)]
pub struct InMemoryNoteStore {
    state: Mutex<MemoryState>,
}

impl InMemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // State is only mutated by a push after the id bump; a poisoned lock
        // still holds a consistent vector.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl NoteStore for InMemoryNoteStore {
    fn initialize(&self) -> StoreResult<()> {
        Ok(())
    }

    fn insert(&self, text: &str) -> StoreResult<Note> {
        if trim_note_text(text).is_empty() {
            return Err(NoteValidationError::EmptyText.into());
        }
        let mut state = self.lock();
        state.last_id += 1;
        let note = Note {
            id: state.last_id,
            text: text.to_string(),
        };
        state.notes.push(note.clone());
        Ok(note)
    }

    fn list_all(&self) -> StoreResult<Vec<Note>> {
        let state = self.lock();
        Ok(state.notes.iter().rev().cloned().collect())
    }
}
