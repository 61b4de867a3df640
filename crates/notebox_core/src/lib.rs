//! Core domain logic for notebox.
//! This crate is the single source of truth for note invariants.

pub mod config;
pub mod db;
#[cfg(feature = "relational-db")]
pub mod external_db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{AppConfig, ConfigError};
pub use logging::{default_log_level, init_logging, init_stderr_logging, logging_status, LogTarget};
pub use model::note::{Note, NoteId, NoteText, NoteValidationError};
pub use repo::{InMemoryNoteStore, NoteStore, SqliteNoteStore, StoreError, StoreResult};
pub use service::note_service::{NoteService, NoteServiceError};

/// Minimal health-check API for smoke checks.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
