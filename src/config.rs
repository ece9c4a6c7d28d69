use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

use crate::auth::Credentials;
use crate::pacing::Throttle;
use crate::reorder::discovery::DEFAULT_SUBTYPES;
use crate::reorder::ReorderConfig;

/// Resolved settings for a `run`.
pub struct Config {
    pub base_url: String,
    pub state_dir: PathBuf,
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: Option<String>,
    pub subtypes: Vec<String>,
    pub delay: Duration,
    pub timeout: Duration,
    pub dry_run: bool,
    pub no_progress_bar: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("state_dir", &self.state_dir)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("subtypes", &self.subtypes)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

pub(crate) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

fn required(value: Option<String>, what: &str, env: &str) -> anyhow::Result<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => anyhow::bail!("Missing {what}: set {env} or pass it on the command line"),
    }
}

/// Validate the base URL and strip any trailing slash.
fn normalize_base_url(raw: &str) -> anyhow::Result<String> {
    let url = url::Url::parse(raw).with_context(|| format!("Invalid --base-url '{raw}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        anyhow::bail!("--base-url must be http or https, got '{}'", url.scheme());
    }
    if url.query().is_some() {
        anyhow::bail!("--base-url must not contain a query string");
    }
    Ok(raw.trim_end_matches('/').to_string())
}

impl Config {
    pub fn from_run_args(args: crate::cli::RunArgs) -> anyhow::Result<Self> {
        let base_url = normalize_base_url(&args.base_url)?;
        if args.timeout_secs == 0 {
            anyhow::bail!("--timeout-secs must be greater than zero");
        }

        let subtypes = if args.subtypes.is_empty() {
            DEFAULT_SUBTYPES.iter().map(|s| s.to_string()).collect()
        } else {
            args.subtypes
        };

        Ok(Self {
            base_url,
            state_dir: expand_tilde(&args.state.state_dir),
            client_id: required(args.client_id, "client id", "CORTEX_CLIENT_ID")?,
            client_secret: required(args.client_secret, "client secret", "CORTEX_CLIENT_SECRET")?,
            username: required(args.username, "username", "CORTEX_USERNAME")?,
            password: args.password.filter(|p| !p.is_empty()),
            subtypes,
            delay: Duration::from_millis(args.delay_ms),
            timeout: Duration::from_secs(args.timeout_secs),
            dry_run: args.dry_run,
            no_progress_bar: args.no_progress_bar,
        })
    }

    pub fn credentials(&self, password: String) -> Credentials {
        Credentials {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            username: self.username.clone(),
            password,
        }
    }

    pub fn reorder_config(&self) -> ReorderConfig {
        ReorderConfig {
            subtypes: self.subtypes.clone(),
            throttle: Throttle::new(self.delay),
            dry_run: self.dry_run,
            no_progress_bar: self.no_progress_bar,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::RunArgs;
    use clap::Parser;

    fn run_args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["cortex-reorder", "run"];
        argv.extend_from_slice(extra);
        match crate::cli::Cli::try_parse_from(argv).unwrap().command {
            crate::cli::Command::Run(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    fn with_creds(extra: &[&str]) -> RunArgs {
        let mut args = run_args(extra);
        args.client_id = Some("id".into());
        args.client_secret = Some("secret".into());
        args.username = Some("user".into());
        args
    }

    #[test]
    fn test_expand_tilde_with_home() {
        let result = expand_tilde("~/state");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(result, home.join("state"));
        }
    }

    #[test]
    fn test_expand_tilde_no_prefix() {
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
        assert_eq!(expand_tilde("rel"), PathBuf::from("rel"));
    }

    #[test]
    fn test_defaults_fill_subtypes_and_pacing() {
        let cfg = Config::from_run_args(with_creds(&[])).unwrap();
        assert_eq!(cfg.subtypes.len(), 5);
        assert_eq!(cfg.subtypes[0], "Concert Program");
        assert_eq!(cfg.delay, Duration::from_millis(300));
        assert_eq!(cfg.reorder_config().throttle, Throttle::default());
        assert_eq!(cfg.password, None);
    }

    #[test]
    fn test_explicit_subtypes_kept_in_order() {
        let cfg = Config::from_run_args(with_creds(&["--subtype", "Part", "--subtype", "Score"]))
            .unwrap();
        assert_eq!(cfg.subtypes, vec!["Part", "Score"]);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let cfg = Config::from_run_args(with_creds(&["--base-url", "https://dam.example.org/"]))
            .unwrap();
        assert_eq!(cfg.base_url, "https://dam.example.org");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        assert!(Config::from_run_args(with_creds(&["--base-url", "not a url"])).is_err());
        assert!(Config::from_run_args(with_creds(&["--base-url", "ftp://dam.example.org"])).is_err());
    }

    #[test]
    fn test_missing_secret_rejected() {
        let mut args = with_creds(&[]);
        args.client_secret = Some("   ".into());
        let err = Config::from_run_args(args).unwrap_err();
        assert!(err.to_string().contains("CORTEX_CLIENT_SECRET"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        assert!(Config::from_run_args(with_creds(&["--timeout-secs", "0"])).is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut args = with_creds(&[]);
        args.password = Some("hunter2".into());
        let cfg = Config::from_run_args(args).unwrap();
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(!dbg.contains("\"secret\""));
    }
}
