//! cortex-reorder - fixes the manual page order of Cortex DAM folders.
//!
//! Cortex can only change a folder's child order by detaching children and
//! reattaching them one at a time; each reattach appends at the end. This
//! tool discovers parent folders, decides which are out of filename order,
//! and replays the detach/reattach sequence with durable checkpoints so a
//! multi-hour run can be interrupted and resumed.

#![warn(clippy::all)]

mod auth;
mod cli;
mod config;
mod cortex;
mod pacing;
mod reorder;
mod shutdown;
mod state;
mod types;

use std::io::IsTerminal;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Command;
use state::{CheckpointCounts, StateDir};

/// Run the status command.
async fn run_status(args: cli::StateArgs) -> anyhow::Result<()> {
    let dir = StateDir::new(config::expand_tilde(&args.state_dir));
    if !dir.root().exists() {
        println!("No state directory at {}", dir.root().display());
        return Ok(());
    }

    let counts = CheckpointCounts::read(&dir).await?;
    let snapshot = dir.discovery_snapshot();

    println!("State directory: {}", dir.root().display());
    println!();
    match snapshot.load().await? {
        Some(folders) => println!("Discovery snapshot: {} parent folders", folders.len()),
        None => println!("Discovery snapshot: none (next run will discover)"),
    }
    println!();
    println!("Checkpoints:");
    println!("  Pages reattached:        {}", counts.pages);
    println!("  Folders reordered:       {}", counts.reordered_folders);
    println!("  Folders already ordered: {}", counts.already_ordered_folders);

    let pending = dir.pending_page_caches()?;
    if pending > 0 {
        println!();
        println!(
            "{} folder(s) have cached pages from an unfinished run; the next run resumes them.",
            pending
        );
    }
    Ok(())
}

/// Run the reset-discovery command.
async fn run_reset_discovery(args: cli::ResetDiscoveryArgs) -> anyhow::Result<()> {
    let dir = StateDir::new(config::expand_tilde(&args.state.state_dir));
    let snapshot = dir.discovery_snapshot();

    if !snapshot.path().exists() {
        println!("No discovery snapshot at {}", snapshot.path().display());
        return Ok(());
    }

    if !args.yes {
        println!("This will delete the cached parent folder list at:");
        println!("  {}", snapshot.path().display());
        println!();
        print!("Are you sure? [y/N] ");
        use std::io::Write;
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    // Hold the lock so a running reorder never sees its snapshot vanish.
    let _lock = dir.lock()?;
    snapshot.remove().await?;
    println!("Discovery snapshot deleted.");
    Ok(())
}

/// Run the reorder pipeline.
async fn run_reorder(args: cli::RunArgs) -> anyhow::Result<()> {
    let config = config::Config::from_run_args(args)?;
    tracing::debug!(?config, "Resolved configuration");

    let password = match config.password.clone() {
        Some(pw) => pw,
        None if std::io::stdin().is_terminal() => tokio::task::block_in_place(|| {
            rpassword::prompt_password(format!("Cortex password for {}: ", config.username))
        })
        .context("Failed to read password")?,
        None => anyhow::bail!("Missing password: set CORTEX_PASSWORD or pass --password"),
    };

    let dir = StateDir::new(&config.state_dir);
    dir.create().await?;
    let lock = dir.lock()?;
    tracing::debug!(path = %lock.path().display(), "Acquired state lock");

    let client = reqwest::Client::builder()
        .timeout(config.timeout)
        .build()
        .context("Failed to build HTTP client")?;
    let session = auth::SessionManager::new(
        Box::new(client),
        auth::endpoints::Endpoints::for_base(&config.base_url),
        config.credentials(password),
    );
    let api = cortex::CortexApi::new(session);

    tracing::info!(
        base_url = %config.base_url,
        state_dir = %config.state_dir.display(),
        dry_run = config.dry_run,
        "Starting cortex-reorder"
    );

    let shutdown_token = shutdown::install_signal_handler();
    let summary = reorder::run(&api, &dir, &config.reorder_config(), shutdown_token).await?;

    tracing::info!(
        folders = summary.folders,
        reordered = summary.reordered,
        already_ordered = summary.already_ordered,
        empty = summary.empty,
        skipped = summary.skipped,
        "Run summary"
    );
    if config.dry_run {
        tracing::info!(
            folders = summary.simulated,
            pages = summary.pages_simulated,
            "Dry run: folders that would be reordered"
        );
    } else {
        tracing::info!(pages = summary.pages_reattached, "Pages reattached");
    }
    tracing::info!(
        "Audit log: {} ({} rows, {:.1}s)",
        dir.audit_log_path().display(),
        summary.audit_rows,
        summary.elapsed.as_secs_f64()
    );
    if summary.interrupted {
        tracing::warn!("Run interrupted; run again to resume");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before parsing, so `.env` values reach clap's env fallbacks.
    dotenv::dotenv().ok();
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter())),
        )
        .init();

    match cli.command {
        Command::Status(args) => run_status(args).await,
        Command::ResetDiscovery(args) => run_reset_discovery(args).await,
        Command::Run(args) => run_reorder(args).await,
    }
}
