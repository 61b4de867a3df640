//! Shared handler state for the note service.

use notebox_core::{NoteService, NoteStore};
use std::sync::Arc;

/// Store handle injected at startup.
pub type SharedStore = Arc<dyn NoteStore>;

#[derive(Clone)]
pub struct AppState {
    pub service: NoteService<SharedStore>,
}

impl AppState {
    pub fn new(store: SharedStore) -> Self {
        Self {
            service: NoteService::new(store),
        }
    }
}
