//! Reorder pipeline: discover parents, then fetch, decide and execute per
//! folder.
//!
//! Folders are handled strictly one at a time. Any unrecoverable API error
//! aborts the whole run; the checkpoint files let the next run resume where
//! this one stopped.

pub mod decision;
pub mod discovery;
pub mod executor;
pub mod fetch;

use std::io::IsTerminal;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;

use crate::cortex::CortexApi;
use crate::pacing::Throttle;
use crate::state::{AuditLog, Checkpoints, StateDir};
use crate::types::{PageRecord, ParentFolder};

use self::decision::{decide, OrderDecision};
use self::discovery::discover_parents;
use self::executor::{DryRunMutator, LiveMutator, Mutator, ReorderExecutor};
use self::fetch::fetch_pages;

/// Settings for one reorder run.
#[derive(Debug, Clone)]
pub struct ReorderConfig {
    pub subtypes: Vec<String>,
    pub throttle: Throttle,
    pub dry_run: bool,
    pub no_progress_bar: bool,
}

/// How a single folder was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderOutcome {
    /// Already checkpointed by an earlier run or earlier in this one.
    Skipped,
    /// No pages found. Not checkpointed; retried next run.
    Empty,
    AlreadyOrdered,
    Reordered { reattached: usize },
    /// Dry run of a folder that needs reordering.
    Simulated { reattached: usize },
}

/// Totals reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub folders: usize,
    pub reordered: usize,
    pub already_ordered: usize,
    pub empty: usize,
    pub skipped: usize,
    pub simulated: usize,
    pub pages_reattached: usize,
    pub pages_simulated: usize,
    pub audit_rows: usize,
    /// Stopped early on a shutdown signal.
    pub interrupted: bool,
    pub elapsed: Duration,
}

impl RunSummary {
    fn record(&mut self, outcome: FolderOutcome) {
        match outcome {
            FolderOutcome::Skipped => self.skipped += 1,
            FolderOutcome::Empty => self.empty += 1,
            FolderOutcome::AlreadyOrdered => self.already_ordered += 1,
            FolderOutcome::Reordered { reattached } => {
                self.reordered += 1;
                self.pages_reattached += reattached;
            }
            FolderOutcome::Simulated { reattached } => {
                self.simulated += 1;
                self.pages_simulated += reattached;
            }
        }
    }

    /// Folders handled this run, skips excluded.
    pub fn processed(&self) -> usize {
        self.reordered + self.already_ordered + self.empty + self.simulated
    }
}

fn create_progress_bar(no_progress_bar: bool, total: u64) -> ProgressBar {
    if no_progress_bar || !std::io::stdout().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} folders ({eta}) {msg}",
        )
        .expect("valid template")
        .progress_chars("=> "),
    );
    pb
}

/// Run the full pipeline against `api`, persisting progress under `state`.
///
/// The caller holds the state lock. Shutdown is honoured between folders
/// only, so every folder is either finished or untouched by this run's
/// checkpoints.
pub async fn run(
    api: &CortexApi,
    state: &StateDir,
    config: &ReorderConfig,
    shutdown: CancellationToken,
) -> Result<RunSummary> {
    let started = Instant::now();

    api.authenticate()
        .await
        .context("Initial authentication failed")?;

    let mut checkpoints = Checkpoints::open(state)
        .await
        .context("Failed to open checkpoint ledgers")?;
    let counts = checkpoints.counts();
    tracing::info!(
        pages = counts.pages,
        reordered = counts.reordered_folders,
        already_ordered = counts.already_ordered_folders,
        "Loaded checkpoints"
    );
    let mut audit = AuditLog::create(&state.audit_log_path())
        .context("Failed to create audit log")?;

    let parents = discover_parents(api, &state.discovery_snapshot(), &config.subtypes, config.throttle)
        .await?;
    tracing::info!(count = parents.len(), "Processing parent folders");

    let mutator: Box<dyn Mutator> = if config.dry_run {
        tracing::info!("Dry run: no changes will be made in Cortex");
        Box::new(DryRunMutator)
    } else {
        Box::new(LiveMutator::new(api.clone()))
    };
    let mut executor = ReorderExecutor::new(mutator, config.throttle);

    let pb = create_progress_bar(config.no_progress_bar, parents.len() as u64);
    let mut summary = RunSummary::default();

    for folder in &parents {
        if shutdown.is_cancelled() {
            pb.suspend(|| tracing::info!("Shutdown requested, stopping before {}", folder.identifier));
            summary.interrupted = true;
            break;
        }
        pb.set_message(folder.identifier.clone());

        let outcome = process_folder(
            api,
            state,
            folder,
            &mut checkpoints,
            &mut audit,
            &mut executor,
        )
        .await
        .with_context(|| format!("Aborting run at folder {}", folder.identifier));
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                pb.abandon();
                return Err(e);
            }
        };
        summary.folders += 1;
        summary.record(outcome);
        pb.inc(1);
    }

    pb.finish_and_clear();
    summary.audit_rows = audit.rows();
    summary.elapsed = started.elapsed();
    Ok(summary)
}

/// Cached pages for `folder`, or a fresh fetch that is then cached.
async fn load_or_fetch_pages(
    api: &CortexApi,
    state: &StateDir,
    folder: &ParentFolder,
) -> Result<Vec<PageRecord>> {
    let cache = state.page_cache(&folder.identifier);
    if let Some(pages) = cache
        .load()
        .await
        .with_context(|| format!("Failed to read page cache for {}", folder.identifier))?
    {
        tracing::info!(folder = %folder.identifier, count = pages.len(), "Using cached pages");
        return Ok(pages);
    }

    let pages = fetch_pages(api, &folder.identifier).await?;
    if !pages.is_empty() {
        cache
            .store(&pages)
            .await
            .with_context(|| format!("Failed to write page cache for {}", folder.identifier))?;
    }
    Ok(pages)
}

async fn process_folder(
    api: &CortexApi,
    state: &StateDir,
    folder: &ParentFolder,
    checkpoints: &mut Checkpoints,
    audit: &mut AuditLog,
    executor: &mut ReorderExecutor,
) -> Result<FolderOutcome> {
    if checkpoints.is_folder_complete(&folder.identifier) {
        tracing::debug!(folder = %folder.identifier, "Skipping completed folder");
        return Ok(FolderOutcome::Skipped);
    }

    let pages = load_or_fetch_pages(api, state, folder).await?;
    match decide(&pages) {
        OrderDecision::Empty => {
            tracing::warn!(folder = %folder.identifier, "No pages found, skipping");
            Ok(FolderOutcome::Empty)
        }
        OrderDecision::AlreadyOrdered => {
            tracing::info!(folder = %folder.identifier, pages = pages.len(), "Already in order");
            checkpoints.mark_folder_already_ordered(&folder.identifier).await?;
            state
                .page_cache(&folder.identifier)
                .remove()
                .await
                .with_context(|| format!("Failed to remove page cache for {}", folder.identifier))?;
            Ok(FolderOutcome::AlreadyOrdered)
        }
        OrderDecision::Reorder(target) => {
            tracing::info!(folder = %folder.identifier, pages = target.len(), "Reordering");
            let cache = state.page_cache(&folder.identifier);
            let report = executor
                .execute(folder, &target, checkpoints, audit, &cache)
                .await?;
            if executor.is_dry_run() {
                Ok(FolderOutcome::Simulated {
                    reattached: report.reattached,
                })
            } else {
                Ok(FolderOutcome::Reordered {
                    reattached: report.reattached,
                })
            }
        }
    }
}
