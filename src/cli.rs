use clap::{Args, Parser, Subcommand};

use crate::types::LogLevel;

#[derive(Parser, Debug)]
#[command(
    name = "cortex-reorder",
    version,
    about = "Reorder pages inside Cortex folders by original filename"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, value_enum, default_value = "info", global = true)]
    pub log_level: LogLevel,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Discover parent folders and reorder their pages (resumable)
    Run(RunArgs),

    /// Show checkpoint progress for a state directory
    Status(StateArgs),

    /// Delete the cached parent folder list so the next run rediscovers
    ResetDiscovery(ResetDiscoveryArgs),
}

#[derive(Args, Debug, Clone)]
pub struct StateArgs {
    /// Directory holding checkpoints, caches and the audit log
    #[arg(long, env = "CORTEX_STATE_DIR", default_value = ".")]
    pub state_dir: String,
}

#[derive(Args, Debug)]
pub struct ResetDiscoveryArgs {
    #[command(flatten)]
    pub state: StateArgs,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub state: StateArgs,

    /// Cortex server base URL
    #[arg(long, env = "CORTEX_BASE_URL", default_value = "https://cortex.nyphil.org")]
    pub base_url: String,

    /// OAuth2 client id
    #[arg(long, env = "CORTEX_CLIENT_ID")]
    pub client_id: Option<String>,

    /// OAuth2 client secret.
    /// Prefer the CORTEX_CLIENT_SECRET environment variable.
    #[arg(long, env = "CORTEX_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Cortex login name for the cookie token
    #[arg(long, env = "CORTEX_USERNAME")]
    pub username: Option<String>,

    /// Cortex password (if not provided, will prompt).
    /// WARNING: passing via --password is visible in process listings.
    #[arg(long, env = "CORTEX_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Log every change without touching Cortex or the checkpoint ledgers
    #[arg(long)]
    pub dry_run: bool,

    /// Delay after each discovery page and each mutation, in milliseconds
    #[arg(long, default_value_t = 300)]
    pub delay_ms: u64,

    /// Document subtype to search for parent folders (repeatable; default:
    /// Concert Program, Score, Part, Business Document, Press Clippings)
    #[arg(long = "subtype")]
    pub subtypes: Vec<String>,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Disable progress bar
    #[arg(long)]
    pub no_progress_bar: bool,
}
