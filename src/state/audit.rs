//! CSV audit trail of every attempted page mutation.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::error::StateError;

const HEADER: [&str; 7] = [
    "Parent UID",
    "Step",
    "Page ID",
    "Original FileName",
    "Status",
    "HTTP Code",
    "Error",
];

/// Which half of the two-phase reorder a row describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Step {
    Unparent,
    Reparent,
}

impl Step {
    pub fn as_str(self) -> &'static str {
        match self {
            Step::Unparent => "Unparent",
            Step::Reparent => "Reparent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuditStatus {
    Success,
    #[serde(rename = "Dry Run")]
    DryRun,
    Failed,
}

impl AuditStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditStatus::Success => "Success",
            AuditStatus::DryRun => "Dry Run",
            AuditStatus::Failed => "Failed",
        }
    }
}

/// One row of `reorder_log.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    #[serde(rename = "Parent UID")]
    pub parent_uid: String,
    #[serde(rename = "Step")]
    pub step: Step,
    #[serde(rename = "Page ID")]
    pub page_id: String,
    #[serde(rename = "Original FileName")]
    pub file_name: String,
    #[serde(rename = "Status")]
    pub status: AuditStatus,
    #[serde(rename = "HTTP Code")]
    pub http_code: Option<u16>,
    #[serde(rename = "Error")]
    pub error: Option<String>,
}

impl AuditEntry {
    pub fn new(
        parent_uid: &str,
        step: Step,
        page_id: &str,
        file_name: &str,
        status: AuditStatus,
    ) -> Self {
        Self {
            parent_uid: parent_uid.to_string(),
            step,
            page_id: page_id.to_string(),
            file_name: file_name.to_string(),
            status,
            http_code: None,
            error: None,
        }
    }

    pub fn with_code(mut self, code: Option<u16>) -> Self {
        self.http_code = code;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Writer for the per-run audit log.
///
/// The file is truncated when created, so it only ever describes the
/// current run. Each row is flushed before `record` returns.
pub struct AuditLog {
    path: PathBuf,
    writer: csv::Writer<File>,
    rows: usize,
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("path", &self.path)
            .field("rows", &self.rows)
            .finish_non_exhaustive()
    }
}

impl AuditLog {
    pub fn create(path: &Path) -> Result<Self, StateError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)?;
        writer.write_record(HEADER)?;
        writer.flush().map_err(|e| StateError::io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer,
            rows: 0,
        })
    }

    pub fn record(&mut self, entry: &AuditEntry) -> Result<(), StateError> {
        match entry.status {
            AuditStatus::Failed => tracing::error!(
                folder = %entry.parent_uid,
                code = ?entry.http_code,
                "{}: {} ({}) -> Failed: {}",
                entry.step.as_str(),
                entry.page_id,
                entry.file_name,
                entry.error.as_deref().unwrap_or("")
            ),
            status => tracing::info!(
                folder = %entry.parent_uid,
                "{}: {} ({}) -> {}",
                entry.step.as_str(),
                entry.page_id,
                entry.file_name,
                status.as_str()
            ),
        }

        self.writer.serialize(entry)?;
        self.writer
            .flush()
            .map_err(|e| StateError::io(&self.path, e))?;
        self.rows += 1;
        Ok(())
    }

    /// Rows written so far, excluding the header.
    pub fn rows(&self) -> usize {
        self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn test_create_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reorder_log.csv");
        let log = AuditLog::create(&path).unwrap();
        assert_eq!(log.rows(), 0);
        let rows = read_rows(&path);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], HEADER.map(String::from).to_vec());
    }

    #[test]
    fn test_rows_serialized_in_column_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reorder_log.csv");
        let mut log = AuditLog::create(&path).unwrap();
        log.record(
            &AuditEntry::new("F1", Step::Unparent, "p1", "a.jpg", AuditStatus::Success)
                .with_code(Some(200)),
        )
        .unwrap();
        log.record(&AuditEntry::new(
            "F1",
            Step::Reparent,
            "p2",
            "b, final.jpg",
            AuditStatus::DryRun,
        ))
        .unwrap();
        log.record(
            &AuditEntry::new("F1", Step::Reparent, "p3", "c.jpg", AuditStatus::Failed)
                .with_code(Some(500))
                .with_error("boom"),
        )
        .unwrap();

        let rows = read_rows(&path);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1], ["F1", "Unparent", "p1", "a.jpg", "Success", "200", ""]);
        assert_eq!(rows[2], ["F1", "Reparent", "p2", "b, final.jpg", "Dry Run", "", ""]);
        assert_eq!(rows[3], ["F1", "Reparent", "p3", "c.jpg", "Failed", "500", "boom"]);
    }

    #[test]
    fn test_create_truncates_previous_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reorder_log.csv");
        {
            let mut log = AuditLog::create(&path).unwrap();
            log.record(&AuditEntry::new("F", Step::Unparent, "p", "n", AuditStatus::Success))
                .unwrap();
        }
        AuditLog::create(&path).unwrap();
        assert_eq!(read_rows(&path).len(), 1);
    }
}
