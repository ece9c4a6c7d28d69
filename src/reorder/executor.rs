//! Two-phase reorder: batch detach, then sequential reattach.

use std::collections::HashSet;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::cortex::error::ApiError;
use crate::cortex::CortexApi;
use crate::pacing::Throttle;
use crate::state::{AuditEntry, AuditLog, AuditStatus, Checkpoints, PageCache, Step};
use crate::types::{PageRecord, ParentFolder};

/// Result of a mutation that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Live { status: u16 },
    DryRun,
}

impl Applied {
    fn audit(self) -> (AuditStatus, Option<u16>) {
        match self {
            Applied::Live { status } => (AuditStatus::Success, Some(status)),
            Applied::DryRun => (AuditStatus::DryRun, None),
        }
    }
}

/// The two remote mutations a reorder needs.
#[async_trait]
pub trait Mutator: Send + Sync {
    /// Clear the parent association of every listed page in one call.
    async fn detach(&self, page_ids: &[String]) -> Result<Applied, ApiError>;

    /// Attach one page to the folder with `parent_record_id`, at the end of
    /// its manual order.
    async fn reattach(&self, page_id: &str, parent_record_id: &str) -> Result<Applied, ApiError>;

    fn is_dry_run(&self) -> bool;
}

/// Issues real mutations through the Cortex API.
#[derive(Debug, Clone)]
pub struct LiveMutator {
    api: CortexApi,
}

impl LiveMutator {
    pub fn new(api: CortexApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Mutator for LiveMutator {
    async fn detach(&self, page_ids: &[String]) -> Result<Applied, ApiError> {
        let status = self.api.clear_parent(page_ids).await?;
        Ok(Applied::Live { status })
    }

    async fn reattach(&self, page_id: &str, parent_record_id: &str) -> Result<Applied, ApiError> {
        let status = self.api.assign_parent(page_id, parent_record_id).await?;
        Ok(Applied::Live { status })
    }

    fn is_dry_run(&self) -> bool {
        false
    }
}

/// Never touches the server.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunMutator;

#[async_trait]
impl Mutator for DryRunMutator {
    async fn detach(&self, _page_ids: &[String]) -> Result<Applied, ApiError> {
        Ok(Applied::DryRun)
    }

    async fn reattach(&self, _page_id: &str, _parent_record_id: &str) -> Result<Applied, ApiError> {
        Ok(Applied::DryRun)
    }

    fn is_dry_run(&self) -> bool {
        true
    }
}

/// Per-folder execution counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    pub detached: usize,
    pub reattached: usize,
    /// Pages already processed before this folder started.
    pub skipped: usize,
}

/// Drives detach/reattach for folders that need reordering.
///
/// Page ids reach the processed ledger only after their reattach succeeds,
/// so a page detached by a crashed run is detached again and reattached on
/// resume. In dry run nothing is persisted; simulated ids are remembered
/// for the rest of the run instead.
pub struct ReorderExecutor {
    mutator: Box<dyn Mutator>,
    throttle: Throttle,
    simulated: HashSet<String>,
}

impl std::fmt::Debug for ReorderExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReorderExecutor")
            .field("dry_run", &self.mutator.is_dry_run())
            .field("throttle", &self.throttle)
            .field("simulated", &self.simulated.len())
            .finish()
    }
}

fn entry(folder: &ParentFolder, step: Step, page: &PageRecord, status: AuditStatus) -> AuditEntry {
    AuditEntry::new(
        &folder.identifier,
        step,
        &page.identifier,
        &page.original_file_name,
        status,
    )
}

impl ReorderExecutor {
    pub fn new(mutator: Box<dyn Mutator>, throttle: Throttle) -> Self {
        Self {
            mutator,
            throttle,
            simulated: HashSet::new(),
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.mutator.is_dry_run()
    }

    fn is_done(&self, checkpoints: &Checkpoints, page_id: &str) -> bool {
        checkpoints.is_page_processed(page_id) || self.simulated.contains(page_id)
    }

    /// Reorder `folder` so its pages follow `target`.
    ///
    /// On success in live mode the folder is checkpointed and its page cache
    /// removed. Any mutation failure is audited and returned; the folder then
    /// stays unfinished for the next run.
    pub async fn execute(
        &mut self,
        folder: &ParentFolder,
        target: &[PageRecord],
        checkpoints: &mut Checkpoints,
        audit: &mut AuditLog,
        cache: &PageCache,
    ) -> Result<ExecutionReport> {
        let mut report = ExecutionReport::default();

        let pending: Vec<&PageRecord> = target
            .iter()
            .filter(|p| !self.is_done(checkpoints, &p.identifier))
            .collect();
        report.skipped = target.len() - pending.len();

        if !pending.is_empty() {
            let ids: Vec<String> = pending.iter().map(|p| p.identifier.clone()).collect();
            tracing::info!(folder = %folder.identifier, pages = ids.len(), "Detaching pages");
            match self.mutator.detach(&ids).await {
                Ok(applied) => {
                    let (status, code) = applied.audit();
                    for page in &pending {
                        audit.record(&entry(folder, Step::Unparent, page, status).with_code(code))?;
                    }
                    report.detached = ids.len();
                    if matches!(applied, Applied::Live { .. }) {
                        self.throttle.pause().await;
                    }
                }
                Err(e) => {
                    for page in &pending {
                        audit.record(
                            &entry(folder, Step::Unparent, page, AuditStatus::Failed)
                                .with_code(e.status())
                                .with_error(e.to_string()),
                        )?;
                    }
                    return Err(e).with_context(|| {
                        format!("Failed to detach pages of folder {}", folder.identifier)
                    });
                }
            }
        }

        for page in target {
            if self.is_done(checkpoints, &page.identifier) {
                continue;
            }
            match self.mutator.reattach(&page.identifier, &folder.record_id).await {
                Ok(applied) => {
                    let (status, code) = applied.audit();
                    audit.record(&entry(folder, Step::Reparent, page, status).with_code(code))?;
                    match applied {
                        Applied::Live { .. } => {
                            checkpoints.mark_page_processed(&page.identifier).await?;
                            self.throttle.pause().await;
                        }
                        Applied::DryRun => {
                            self.simulated.insert(page.identifier.clone());
                        }
                    }
                    report.reattached += 1;
                }
                Err(e) => {
                    audit.record(
                        &entry(folder, Step::Reparent, page, AuditStatus::Failed)
                            .with_code(e.status())
                            .with_error(e.to_string()),
                    )?;
                    return Err(e).with_context(|| {
                        format!(
                            "Failed to reattach page {} to folder {}",
                            page.identifier, folder.identifier
                        )
                    });
                }
            }
        }

        if self.is_dry_run() {
            tracing::info!(
                folder = %folder.identifier,
                pages = report.reattached,
                "Dry run: folder would be reordered"
            );
            return Ok(report);
        }

        checkpoints.mark_folder_reordered(&folder.identifier).await?;
        cache
            .remove()
            .await
            .with_context(|| format!("Failed to remove page cache for {}", folder.identifier))?;
        tracing::info!(
            folder = %folder.identifier,
            reattached = report.reattached,
            skipped = report.skipped,
            "Folder reordered"
        );
        Ok(report)
    }
}
