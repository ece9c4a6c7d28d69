//! On-disk run state.
//!
//! Everything needed to resume an interrupted run lives in one directory:
//! - three append-only checkpoint ledgers (pages, reordered folders,
//!   already-ordered folders)
//! - a discovery snapshot and per-folder page caches
//! - the audit log of the current run
//! - a lock file held for the lifetime of a run

pub mod audit;
pub mod cache;
pub mod error;
pub mod ledger;

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs4::fs_std::FileExt;

pub use audit::{AuditEntry, AuditLog, AuditStatus, Step};
pub use cache::{DiscoverySnapshot, PageCache};
pub use error::StateError;
pub use ledger::{FileLedger, Ledger};

const SNAPSHOT_FILE: &str = "cached_parent_folders.json";
const PAGE_CACHE_PREFIX: &str = "parent_child_cache_";
const PROCESSED_PAGES_FILE: &str = "processed_pages.txt";
const PROCESSED_FOLDERS_FILE: &str = "processed_folders.txt";
const ALREADY_ORDERED_FILE: &str = "already_ordered_folders.txt";
const AUDIT_LOG_FILE: &str = "reorder_log.csv";
const LOCK_FILE: &str = "reorder.lock";

/// Map a folder uid onto a filename-safe stem.
///
/// Typical uids (`2-1234`) pass through unchanged. Anything outside
/// `[A-Za-z0-9._-]` is percent-encoded so distinct uids never share a file.
fn sanitize_uid(uid: &str) -> String {
    let mut out = String::with_capacity(uid.len());
    for byte in uid.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' => out.push(byte as char),
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

/// Layout of the state directory.
#[derive(Debug, Clone)]
pub struct StateDir {
    root: PathBuf,
}

impl StateDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn create(&self) -> Result<(), StateError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StateError::io(&self.root, e))
    }

    pub fn processed_pages_path(&self) -> PathBuf {
        self.root.join(PROCESSED_PAGES_FILE)
    }

    pub fn processed_folders_path(&self) -> PathBuf {
        self.root.join(PROCESSED_FOLDERS_FILE)
    }

    pub fn already_ordered_path(&self) -> PathBuf {
        self.root.join(ALREADY_ORDERED_FILE)
    }

    pub fn audit_log_path(&self) -> PathBuf {
        self.root.join(AUDIT_LOG_FILE)
    }

    pub fn discovery_snapshot(&self) -> DiscoverySnapshot {
        DiscoverySnapshot::new(self.root.join(SNAPSHOT_FILE))
    }

    pub fn page_cache(&self, folder_uid: &str) -> PageCache {
        PageCache::new(
            self.root
                .join(format!("{PAGE_CACHE_PREFIX}{}.json", sanitize_uid(folder_uid))),
        )
    }

    /// Number of page caches on disk, i.e. folders with a reorder in flight.
    pub fn pending_page_caches(&self) -> Result<usize, StateError> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(StateError::io(&self.root, e)),
        };
        let mut count = 0;
        for entry in entries {
            let entry = entry.map_err(|e| StateError::io(&self.root, e))?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(PAGE_CACHE_PREFIX) && name.ends_with(".json") {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Take the exclusive run lock. Held until the returned guard drops.
    pub fn lock(&self) -> Result<StateLock, StateError> {
        let path = self.root.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| StateError::io(&path, e))?;
        if file.try_lock_exclusive().is_err() {
            return Err(StateError::Locked { path });
        }
        Ok(StateLock { _file: file, path })
    }
}

/// Guard for the state directory lock; released on drop.
#[derive(Debug)]
pub struct StateLock {
    _file: File,
    path: PathBuf,
}

impl StateLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Counts of checkpointed ids, for progress reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckpointCounts {
    pub pages: usize,
    pub reordered_folders: usize,
    pub already_ordered_folders: usize,
}

impl CheckpointCounts {
    /// Read counts without opening the ledgers for writing.
    pub async fn read(dir: &StateDir) -> Result<Self, StateError> {
        Ok(Self {
            pages: FileLedger::read(&dir.processed_pages_path()).await?.len(),
            reordered_folders: FileLedger::read(&dir.processed_folders_path()).await?.len(),
            already_ordered_folders: FileLedger::read(&dir.already_ordered_path()).await?.len(),
        })
    }
}

/// The three checkpoint ledgers.
///
/// A folder is complete once it appears in either folder ledger; the two
/// folder ledgers never share an id.
pub struct Checkpoints {
    processed_pages: Box<dyn Ledger>,
    processed_folders: Box<dyn Ledger>,
    already_ordered: Box<dyn Ledger>,
}

impl std::fmt::Debug for Checkpoints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checkpoints")
            .field("counts", &self.counts())
            .finish()
    }
}

impl Checkpoints {
    pub async fn open(dir: &StateDir) -> Result<Self, StateError> {
        Ok(Self::from_ledgers(
            Box::new(FileLedger::open(&dir.processed_pages_path()).await?),
            Box::new(FileLedger::open(&dir.processed_folders_path()).await?),
            Box::new(FileLedger::open(&dir.already_ordered_path()).await?),
        ))
    }

    pub fn from_ledgers(
        processed_pages: Box<dyn Ledger>,
        processed_folders: Box<dyn Ledger>,
        already_ordered: Box<dyn Ledger>,
    ) -> Self {
        Self {
            processed_pages,
            processed_folders,
            already_ordered,
        }
    }

    pub fn is_page_processed(&self, page_id: &str) -> bool {
        self.processed_pages.contains(page_id)
    }

    pub async fn mark_page_processed(&mut self, page_id: &str) -> Result<bool, StateError> {
        self.processed_pages.add(page_id).await
    }

    pub fn is_folder_complete(&self, folder_uid: &str) -> bool {
        self.processed_folders.contains(folder_uid) || self.already_ordered.contains(folder_uid)
    }

    pub async fn mark_folder_reordered(&mut self, folder_uid: &str) -> Result<(), StateError> {
        if self.already_ordered.contains(folder_uid) {
            return Err(StateError::Conflict {
                folder: folder_uid.to_string(),
                existing: "already ordered",
            });
        }
        self.processed_folders.add(folder_uid).await?;
        Ok(())
    }

    pub async fn mark_folder_already_ordered(&mut self, folder_uid: &str) -> Result<(), StateError> {
        if self.processed_folders.contains(folder_uid) {
            return Err(StateError::Conflict {
                folder: folder_uid.to_string(),
                existing: "reordered",
            });
        }
        self.already_ordered.add(folder_uid).await?;
        Ok(())
    }

    pub fn counts(&self) -> CheckpointCounts {
        CheckpointCounts {
            pages: self.processed_pages.len(),
            reordered_folders: self.processed_folders.len(),
            already_ordered_folders: self.already_ordered.len(),
        }
    }
}
