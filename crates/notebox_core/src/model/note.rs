//! Note domain model.
//!
//! # Responsibility
//! - Define the persisted `Note` record and its JSON shape.
//! - Own the text normalization rule applied before persistence.
//!
//! # Invariants
//! - `id` is assigned by the store, strictly increasing, never reused.
//! - `text` is never empty once a note exists.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned note identifier.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type NoteId = i64;

/// Persisted note record.
///
/// Serializes as `{"id": <int>, "text": <string>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Sequential id assigned on insertion.
    pub id: NoteId,
    /// Note body, stored verbatim after trimming.
    pub text: String,
}

impl Note {
    /// Checks record-level invariants.
    ///
    /// Used on read paths so corrupted rows surface as errors.
    pub fn validate(&self) -> Result<(), NoteValidationError> {
        if trim_note_text(&self.text).is_empty() {
            return Err(NoteValidationError::EmptyText);
        }
        Ok(())
    }
}

/// Whitespace for note text: Unicode whitespace plus the ASCII information
/// separators U+001C..=U+001F, which form submissions also strip.
pub fn is_note_space(c: char) -> bool {
    c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c)
}

/// Strips leading and trailing [`is_note_space`] characters.
pub fn trim_note_text(raw: &str) -> &str {
    raw.trim_matches(is_note_space)
}

/// Validation error for note input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteValidationError {
    /// Text is empty or whitespace-only.
    EmptyText,
}

impl Display for NoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyText => write!(f, "note text must not be empty"),
        }
    }
}

impl Error for NoteValidationError {}

/// Trimmed, non-empty note text ready for persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteText(String);

impl NoteText {
    /// Trims surrounding whitespace and rejects empty results.
    pub fn parse(raw: &str) -> Result<Self, NoteValidationError> {
        let trimmed = trim_note_text(raw);
        if trimmed.is_empty() {
            return Err(NoteValidationError::EmptyText);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for NoteText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
