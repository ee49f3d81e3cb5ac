// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod notifier;
pub mod orchestrator;
pub mod pipeline;
pub mod server;
pub mod task;
pub mod transform;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::resolve_config;
use crate::errors::Result;
use crate::fs::RealFileSystem;
use crate::orchestrator::Orchestrator;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config resolution (explicit file, project file or built-in layout)
/// - the task registry and the requested target
/// - startup preconditions
/// - Ctrl-C handling for long-running targets
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.as_deref().map(Path::new);
    let root = project_root(config_path)?;
    debug!(root = ?root, "project root");

    let cfg = resolve_config(config_path, &root)?;
    let orchestrator = Orchestrator::new(Arc::new(cfg), root, Arc::new(RealFileSystem))?;

    orchestrator.registry().get(&args.task)?;
    orchestrator.check_preconditions(&args.task)?;

    info!(task = %args.task, "assetpipe starting");
    orchestrator.run_until(&args.task, ctrl_c()).await
}

/// Figure out the project root.
///
/// - If `--config` names a file in some directory (e.g. "site/Assetpipe.toml"),
///   that directory is the root.
/// - Otherwise the current working directory is.
fn project_root(config_path: Option<&Path>) -> Result<PathBuf> {
    match config_path.and_then(Path::parent) {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(parent.to_path_buf()),
        _ => Ok(std::env::current_dir()?),
    }
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl-C; running until killed");
        std::future::pending::<()>().await;
    }
    info!("Ctrl-C received");
}
