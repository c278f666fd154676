//! Error types shared across the testify crates.
//!
//! Session transitions never fail with these; a refused command is reported
//! as a [`Rejection`](crate::session::Rejection) effect instead.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced to callers of the document and persistence layers.
#[derive(Debug, Error)]
pub enum ExamError {
    /// The input is not a well-formed exam document.
    #[error("invalid document at {path}: {reason}")]
    InvalidDocument { path: String, reason: String },

    /// A report or exported document could not be written.
    #[error("failed to persist {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExamError {
    pub(crate) fn invalid(path: impl Into<String>, reason: impl Into<String>) -> Self {
        ExamError::InvalidDocument {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if this error came from loading a document.
    pub fn is_invalid_document(&self) -> bool {
        matches!(self, ExamError::InvalidDocument { .. })
    }
}
