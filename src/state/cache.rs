//! JSON caches: the discovery snapshot and per-folder page lists.
//!
//! Both are written to a `.part` sibling and renamed into place, so a crash
//! mid-write never leaves a truncated file under the real name.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;

use super::error::StateError;
use crate::types::{PageRecord, ParentFolder};

async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StateError> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StateError::io(path, e)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| StateError::json(path, e))
}

async fn store_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StateError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|e| StateError::json(path, e))?;
    let mut part = path.as_os_str().to_owned();
    part.push(".part");
    let part = PathBuf::from(part);

    fs::write(&part, &bytes)
        .await
        .map_err(|e| StateError::io(&part, e))?;
    fs::rename(&part, path)
        .await
        .map_err(|e| StateError::io(path, e))
}

async fn remove_if_exists(path: &Path) -> Result<bool, StateError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StateError::io(path, e)),
    }
}

/// A single JSON file holding a list of `T`.
#[derive(Debug, Clone)]
pub struct JsonCache<T> {
    path: PathBuf,
    _item: PhantomData<fn() -> T>,
}

/// Ordered list of parent folders from the last completed discovery.
pub type DiscoverySnapshot = JsonCache<ParentFolder>;

/// A folder's pages in their pre-reorder manual order.
pub type PageCache = JsonCache<PageRecord>;

impl<T: Serialize + DeserializeOwned> JsonCache<T> {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _item: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` when the file does not exist. A present but unreadable file is
    /// an error, never an empty list.
    pub async fn load(&self) -> Result<Option<Vec<T>>, StateError> {
        load_json(&self.path).await
    }

    pub async fn store(&self, items: &[T]) -> Result<(), StateError> {
        store_json(&self.path, items).await
    }

    /// Returns whether a file was removed.
    pub async fn remove(&self) -> Result<bool, StateError> {
        remove_if_exists(&self.path).await
    }
}
