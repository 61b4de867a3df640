//! Note use-case service.
//!
//! # Responsibility
//! - Normalize submitted text and create notes.
//! - List notes for both the HTML and JSON views.
//!
//! # Invariants
//! - Submitted text is trimmed before validation and persistence.
//! - Blank submissions never reach the store.
//! - Listing order is the store's order: newest id first.

use crate::model::note::{Note, NoteText, NoteValidationError};
use crate::repo::note_store::{NoteStore, StoreError};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for note use-cases.
#[derive(Debug)]
pub enum NoteServiceError {
    /// Submitted text was empty after trimming.
    Validation(NoteValidationError),
    /// Persistence-layer failure.
    Storage(StoreError),
}

impl Display for NoteServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Storage(err) => write!(f, "storage failure: {err}"),
        }
    }
}

impl Error for NoteServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Storage(err) => Some(err),
        }
    }
}

impl From<StoreError> for NoteServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Validation(err) => Self::Validation(err),
            other => Self::Storage(other),
        }
    }
}

impl From<NoteValidationError> for NoteServiceError {
    fn from(value: NoteValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Note service facade over store implementations.
#[derive(Debug, Clone)]
pub struct NoteService<S: NoteStore> {
    store: S,
}

impl<S: NoteStore> NoteService<S> {
    /// Creates a service using the provided store implementation.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Prepares the backing store. Idempotent.
    pub fn initialize(&self) -> Result<(), NoteServiceError> {
        Ok(self.store.initialize()?)
    }

    /// Creates one note from raw submitted text.
    ///
    /// # Errors
    /// - `Validation` when `raw` is empty or whitespace-only.
    /// - `Storage` when the store fails.
    pub fn add_note(&self, raw: &str) -> Result<Note, NoteServiceError> {
        let text = match NoteText::parse(raw) {
            Ok(text) => text,
            Err(err) => {
                info!("event=note_add module=service status=ignored reason=empty_text");
                return Err(err.into());
            }
        };
        Ok(self.store.insert(text.as_str())?)
    }

    /// Lists all notes, newest first.
    pub fn list_notes(&self) -> Result<Vec<Note>, NoteServiceError> {
        Ok(self.store.list_all()?)
    }
}

#[cfg(test)]
mod tests {
    use super::{NoteService, NoteServiceError};
    use crate::repo::memory_store::InMemoryNoteStore;

    #[test]
    fn add_note_stores_trimmed_text() {
        let service = NoteService::new(InMemoryNoteStore::new());
        let note = service.add_note("  Buy milk  ").unwrap();
        assert_eq!(note.text, "Buy milk");
        assert_eq!(service.list_notes().unwrap(), vec![note]);
    }

    #[test]
    fn add_note_rejects_whitespace_only_input() {
        let service = NoteService::new(InMemoryNoteStore::new());
        let err = service.add_note(" \t ").unwrap_err();
        assert!(matches!(err, NoteServiceError::Validation(_)));
        assert!(service.list_notes().unwrap().is_empty());
    }
}
