// src/logging.rs

//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! The filter is picked in this order:
//! 1. `--log-level` on the command line
//! 2. `ASSETPIPE_LOG`, parsed as `EnvFilter` directives
//!    (e.g. `"debug"` or `"assetpipe::notifier=trace,tower_http=debug"`)
//! 3. `info`
//!
//! HTTP and watcher internals stay at `warn` unless a directive names them.
//! Logs go to STDERR.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

const ENV_VAR: &str = "ASSETPIPE_LOG";

/// Dependencies that are chatty at `info`/`debug`.
const QUIET_TARGETS: &[&str] = &["hyper", "tower_http", "axum", "notify", "mio"];

/// Initialise the global logging subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = match cli_level {
        Some(level) => default_filter(level.as_str()),
        None => match std::env::var(ENV_VAR) {
            Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(&directives)
                .with_context(|| format!("invalid {ENV_VAR} value {directives:?}"))?,
            _ => default_filter("info"),
        },
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("logging already initialised: {e}"))
}

fn default_filter(level: &str) -> EnvFilter {
    let mut directives = vec![level.to_string()];
    directives.extend(QUIET_TARGETS.iter().map(|t| format!("{t}=warn")));
    EnvFilter::new(directives.join(","))
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}
