//! Error types for the checkpoint store.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur while reading or writing run state.
#[derive(Error, Debug)]
pub enum StateError {
    /// A state file could not be read, written or removed.
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A cache or snapshot file is not valid JSON of the expected shape.
    #[error("Malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Writing a row to the audit log failed.
    #[error("Audit log write failed: {0}")]
    Csv(#[from] csv::Error),

    /// Another process holds the state directory lock.
    #[error("Another cortex-reorder run is using this state directory (lock: {path})")]
    Locked { path: PathBuf },

    /// An identifier that cannot be stored one-per-line.
    #[error("Invalid checkpoint identifier {0:?}")]
    InvalidId(String),

    /// A folder would be recorded in both terminal sets.
    #[error("Folder {folder} is already recorded as {existing}")]
    Conflict {
        folder: String,
        existing: &'static str,
    },
}

impl StateError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}
