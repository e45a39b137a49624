//! Knowledge store error types.

use std::path::PathBuf;

/// Errors that can occur while loading, validating or saving a knowledge base.
#[derive(thiserror::Error, Debug)]
pub enum KnowledgeError {
    /// Knowledge file does not exist.
    #[error("Knowledge file not found: {path}")]
    NotFound { path: PathBuf },

    /// Knowledge file exists but could not be read.
    #[error("Failed to read knowledge file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Knowledge file is not a valid knowledge document.
    #[error("Invalid knowledge base format in {path}: {reason}")]
    Format { path: PathBuf, reason: String },

    /// An entry violates the knowledge base invariants.
    #[error("Invalid entry: {0}")]
    InvalidEntry(String),

    /// Backup or primary write failed.
    #[error("Failed to save knowledge file {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl KnowledgeError {
    /// Whether this error means the knowledge base could not be loaded at all.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::Read { .. } | Self::Format { .. }
        )
    }
}
