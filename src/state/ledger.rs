//! Append-only, deduplicating identifier sets.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::error::StateError;

/// A persistent set of identifiers that only grows.
///
/// `add` must be durable before it returns: callers issue the next remote
/// call on the assumption that the id survives a crash.
#[async_trait]
pub trait Ledger: Send + Sync {
    fn contains(&self, id: &str) -> bool;

    /// Record `id`. Returns `false` if it was already present.
    async fn add(&mut self, id: &str) -> Result<bool, StateError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Newline-delimited text file, loaded fully on open and appended per add.
pub struct FileLedger {
    path: PathBuf,
    ids: HashSet<String>,
    file: File,
}

impl std::fmt::Debug for FileLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLedger")
            .field("path", &self.path)
            .field("len", &self.ids.len())
            .finish_non_exhaustive()
    }
}

fn parse_ids(contents: &str) -> HashSet<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

async fn read_if_exists(path: &Path) -> Result<String, StateError> {
    match fs::read_to_string(path).await {
        Ok(contents) => Ok(contents),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(StateError::io(path, e)),
    }
}

impl FileLedger {
    /// Open (creating if needed) the ledger at `path`.
    pub async fn open(path: &Path) -> Result<Self, StateError> {
        let existing = read_if_exists(path).await?;
        let ids = parse_ids(&existing);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| StateError::io(path, e))?;

        // A torn final write leaves no newline; terminate it so the next id
        // starts on its own line.
        if !existing.is_empty() && !existing.ends_with('\n') {
            file.write_all(b"\n")
                .await
                .map_err(|e| StateError::io(path, e))?;
            file.flush().await.map_err(|e| StateError::io(path, e))?;
        }

        tracing::debug!(path = %path.display(), count = ids.len(), "Loaded ledger");
        Ok(Self {
            path: path.to_path_buf(),
            ids,
            file,
        })
    }

    /// Read the ids in `path` without opening it for writing.
    pub async fn read(path: &Path) -> Result<HashSet<String>, StateError> {
        Ok(parse_ids(&read_if_exists(path).await?))
    }
}

#[async_trait]
impl Ledger for FileLedger {
    fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    async fn add(&mut self, id: &str) -> Result<bool, StateError> {
        let id = id.trim();
        if id.is_empty() || id.contains(['\n', '\r']) {
            return Err(StateError::InvalidId(id.to_string()));
        }
        if self.ids.contains(id) {
            return Ok(false);
        }

        let line = format!("{id}\n");
        self.file
            .write_all(line.as_bytes())
            .await
            .map_err(|e| StateError::io(&self.path, e))?;
        self.file
            .flush()
            .await
            .map_err(|e| StateError::io(&self.path, e))?;
        self.file
            .sync_data()
            .await
            .map_err(|e| StateError::io(&self.path, e))?;

        self.ids.insert(id.to_string());
        Ok(true)
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}
