//! Error types for the review engine and its SQLite store.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::models::WordId;

/// The main error type for review operations.
#[derive(Error, Debug)]
pub enum ReviewError {
    /// A review state broke one of its invariants (negative interval, ease below floor).
    #[error("invalid review state: {message}")]
    InvalidState { message: String },

    /// A grade value outside the known set.
    #[error("unrecognized grade: {value}")]
    InvalidGrade { value: String },

    /// The word exists but has no progress row for this user.
    #[error("word {word_id} is not tracked for user '{user_id}'")]
    NotTracked { user_id: String, word_id: WordId },

    #[error("word not found: {word_id}")]
    WordNotFound { word_id: WordId },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File I/O errors from export, import and config loading.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Reading or writing the interactive terminal.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {message}")]
    Serde { message: String },

    #[error("config error: {message}")]
    Config { message: String },
}

/// A specialized Result type for review operations.
pub type Result<T> = std::result::Result<T, ReviewError>;

impl ReviewError {
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    pub fn invalid_grade(value: impl ToString) -> Self {
        Self::InvalidGrade {
            value: value.to_string(),
        }
    }

    pub fn not_tracked(user_id: impl Into<String>, word_id: WordId) -> Self {
        Self::NotTracked {
            user_id: user_id.into(),
            word_id,
        }
    }

    pub fn word_not_found(word_id: WordId) -> Self {
        Self::WordNotFound { word_id }
    }

    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for ReviewError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}
