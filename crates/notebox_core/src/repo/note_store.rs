//! Note store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide `initialize`, `insert` and `list_all` over the `notes` table.
//! - Open a fresh connection per call and release it before returning.
//!
//! # Invariants
//! - Ids come from SQLite `AUTOINCREMENT` and are never reused.
//! - Inserts take the write lock up front (`BEGIN IMMEDIATE`), so concurrent
//!   writers from any number of processes are serialized.
//! - `list_all` is a single statement and therefore reads one snapshot.

use crate::db::{open_db, DbError};
use crate::model::note::{trim_note_text, Note, NoteValidationError};
use log::{error, info};
use rusqlite::{Connection, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

pub type StoreResult<T> = Result<T, StoreError>;

/// Error for note store operations.
///
/// Every variant except `Validation` means the storage medium failed.
#[derive(Debug)]
pub enum StoreError {
    Validation(NoteValidationError),
    Db(DbError),
    InvalidData(String),
}

impl StoreError {
    /// Returns whether this error comes from the storage medium rather than
    /// from caller input.
    pub fn is_storage(&self) -> bool {
        !matches!(self, Self::Validation(_))
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted note data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<NoteValidationError> for StoreError {
    fn from(value: NoteValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Durable note storage.
///
/// Implementations own their concurrency control; callers may share one
/// instance across threads without extra locking.
pub trait NoteStore: Send + Sync {
    /// Ensures the notes table exists. Safe to call on every start.
    fn initialize(&self) -> StoreResult<()>;
    /// Appends a note with the next sequential id.
    fn insert(&self, text: &str) -> StoreResult<Note>;
    /// Returns every note, newest id first.
    fn list_all(&self) -> StoreResult<Vec<Note>>;
}

impl<T: NoteStore + ?Sized> NoteStore for Arc<T> {
    fn initialize(&self) -> StoreResult<()> {
        (**self).initialize()
    }

    fn insert(&self, text: &str) -> StoreResult<Note> {
        (**self).insert(text)
    }

    fn list_all(&self) -> StoreResult<Vec<Note>> {
        (**self).list_all()
    }
}

/// SQLite file-backed note store.
#[derive(Debug, Clone)]
pub struct SqliteNoteStore {
    path: PathBuf,
}

impl SqliteNoteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> StoreResult<Connection> {
        Ok(open_db(&self.path)?)
    }
}

impl NoteStore for SqliteNoteStore {
    fn initialize(&self) -> StoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| DbError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = self.connect()?;
        ensure_notes_table(&conn)?;
        info!(
            "event=store_init module=store status=ok path={}",
            self.path.display()
        );
        Ok(())
    }

    fn insert(&self, text: &str) -> StoreResult<Note> {
        if trim_note_text(text).is_empty() {
            return Err(NoteValidationError::EmptyText.into());
        }

        let started_at = Instant::now();
        let result = (|| -> StoreResult<Note> {
            let mut conn = self.connect()?;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute("INSERT INTO notes (text) VALUES (?1);", [text])?;
            let id = tx.last_insert_rowid();
            tx.commit()?;
            Ok(Note {
                id,
                text: text.to_string(),
            })
        })();

        match &result {
            Ok(note) => info!(
                "event=note_insert module=store status=ok id={} text_len={} duration_ms={}",
                note.id,
                note.text.chars().count(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=note_insert module=store status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    fn list_all(&self) -> StoreResult<Vec<Note>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT id, text FROM notes ORDER BY id DESC;")?;
        let mut rows = stmt.query([])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            let note = Note {
                id: row.get("id")?,
                text: row.get::<_, Option<String>>("text")?.unwrap_or_default(),
            };
            note.validate().map_err(|_| {
                StoreError::InvalidData(format!("note {} has empty text", note.id))
            })?;
            notes.push(note);
        }
        Ok(notes)
    }
}

fn ensure_notes_table(conn: &Connection) -> StoreResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = 'notes'
        );",
        [],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(StoreError::InvalidData(
            "notes table missing after migrations".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{NoteStore, SqliteNoteStore, StoreError};
    use crate::model::note::NoteValidationError;

    #[test]
    fn insert_rejects_blank_text_before_touching_storage() {
        // The path is never opened because validation fails first.
        let store = SqliteNoteStore::new("/nonexistent/dir/notes.db");
        let err = store.insert("  ").expect_err("blank text must be rejected");
        assert!(matches!(
            err,
            StoreError::Validation(NoteValidationError::EmptyText)
        ));
        assert!(!err.is_storage());
    }

    #[test]
    fn unreachable_path_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened as a database file.
        let store = SqliteNoteStore::new(dir.path());
        let err = store.list_all().expect_err("directory path must fail");
        assert!(err.is_storage());
    }
}
