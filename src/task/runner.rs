// src/task/runner.rs

//! Running one asset task over its matched files.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{PipelineError, Result};
use crate::fs::FileSystem;
use crate::task::Task;
use crate::transform::{apply_chain, Asset};
use crate::types::{TaskName, TaskOutcome};
use crate::watch::hash::is_unchanged;
use crate::watch::patterns::{collect_matching_files, relative_str, SourceMatcher};

/// What happened to one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// At least one output was (re)written. Paths are project-relative.
    Written(Vec<PathBuf>),
    /// Every output already had identical contents.
    Unchanged,
    /// Reading, transforming or writing failed.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    /// Project-relative source path.
    pub source: PathBuf,
    pub outcome: FileOutcome,
}

/// Aggregated result of one task run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub task: TaskName,
    pub files: Vec<FileReport>,
    /// The run stopped early because shutdown was requested.
    pub cancelled: bool,
}

impl TaskReport {
    /// All output files written by this run, project-relative.
    pub fn written(&self) -> Vec<&Path> {
        self.files
            .iter()
            .filter_map(|f| match &f.outcome {
                FileOutcome::Written(paths) => Some(paths.iter().map(PathBuf::as_path)),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn unchanged(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.outcome == FileOutcome::Unchanged)
            .count()
    }

    pub fn failures(&self) -> Vec<&FileReport> {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, FileOutcome::Failed(_)))
            .collect()
    }

    pub fn outcome(&self) -> TaskOutcome {
        match self.failures().len() {
            0 => TaskOutcome::Success,
            n => TaskOutcome::PartialFailure(n),
        }
    }
}

/// Receives the completion signal of every finished task run.
///
/// The live-preview reload hub is the production sink.
pub trait CompletionSink: Send + Sync {
    fn task_completed(&self, report: &TaskReport);
}

/// Build every file of `task` into its destination.
///
/// Per-file failures are recorded in the report and never stop the run. An
/// empty match set is a successful no-op. Only a destination directory that
/// cannot be created fails the whole run.
pub fn run_task(
    fs: &dyn FileSystem,
    root: &Path,
    task: &Task,
    cancel: &CancellationToken,
) -> Result<TaskReport> {
    let class = task.class();
    let matcher = SourceMatcher::for_class(class)?;
    let sources = collect_matching_files(fs, root, &matcher)?;

    let mut report = TaskReport {
        task: task.name().to_string(),
        files: Vec::with_capacity(sources.len()),
        cancelled: false,
    };

    if sources.is_empty() {
        debug!(task = task.name(), glob = class.source_glob(), "no matching sources");
        return Ok(report);
    }

    let dest = root.join(class.dest_dir());
    fs.create_dir_all(&dest)
        .map_err(|source| PipelineError::DestinationUnwritable {
            path: class.dest_dir().to_path_buf(),
            source,
        })?;

    let base = root.join(matcher.base());
    for source in sources {
        if cancel.is_cancelled() {
            info!(task = task.name(), "shutdown requested; stopping between files");
            report.cancelled = true;
            break;
        }

        let rel_source = source.strip_prefix(root).unwrap_or(&source).to_path_buf();
        let outcome = match build_file(fs, root, task, &base, &source) {
            Ok(written) if written.is_empty() => FileOutcome::Unchanged,
            Ok(written) => FileOutcome::Written(written),
            Err(message) => {
                warn!(task = task.name(), source = ?rel_source, error = %message, "file failed");
                FileOutcome::Failed(message)
            }
        };
        report.files.push(FileReport {
            source: rel_source,
            outcome,
        });
    }

    info!(
        task = task.name(),
        written = report.written().len(),
        unchanged = report.unchanged(),
        failed = report.failures().len(),
        "task finished"
    );
    Ok(report)
}

/// Read, transform and write one source file. Returns the outputs that were
/// actually written.
fn build_file(
    fs: &dyn FileSystem,
    root: &Path,
    task: &Task,
    base: &Path,
    source: &Path,
) -> std::result::Result<Vec<PathBuf>, String> {
    let contents = fs.read(source).map_err(|e| format!("{e:#}"))?;
    let rel = source
        .strip_prefix(base)
        .map_err(|_| format!("{source:?} is outside the glob base {base:?}"))?;
    let origin = relative_str(root, source).unwrap_or_else(|| rel.to_string_lossy().into_owned());

    let asset = apply_chain(task.chain(), Asset::new(rel, origin, contents))
        .map_err(|e| e.to_string())?;

    let dest_dir = task.class().dest_dir();
    let mut outputs = vec![(asset.path, asset.contents)];
    outputs.extend(asset.companions.into_iter().map(|c| (c.path, c.contents)));

    let mut written = Vec::new();
    for (path, contents) in outputs {
        let target = root.join(dest_dir).join(&path);
        if is_unchanged(fs, &target, &contents) {
            debug!(task = task.name(), output = ?target, "output unchanged; skipping write");
            continue;
        }
        fs.write(&target, &contents).map_err(|e| format!("{e:#}"))?;
        written.push(dest_dir.join(&path));
    }
    Ok(written)
}

/// Remove the build root. A missing build root is not an error.
pub fn clean(fs: &dyn FileSystem, root: &Path, build_root: &Path) -> Result<()> {
    let target = root.join(build_root);
    if !fs.exists(&target) {
        debug!(path = ?build_root, "build root already absent");
        return Ok(());
    }
    fs.remove_dir_all(&target)?;
    info!(path = ?build_root, "build root removed");
    Ok(())
}
