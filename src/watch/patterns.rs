// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};

use crate::config::model::ConfigFile;
use crate::config::paths::AssetClass;
use crate::fs::FileSystem;
use crate::types::TaskName;

/// Standing association between a watched glob and the task it re-runs.
///
/// Patterns are relative to the project root; the watcher passes relative
/// paths (e.g. `"src/sass/_vars.sass"`) into [`WatchBinding::matches`].
#[derive(Clone)]
pub struct WatchBinding {
    task: TaskName,
    pattern: String,
    watch_set: GlobSet,
}

impl fmt::Debug for WatchBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchBinding")
            .field("task", &self.task)
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

impl WatchBinding {
    pub fn new(task: impl Into<TaskName>, pattern: &str) -> Result<Self> {
        let task = task.into();
        let watch_set = build_globset(&[pattern.to_string()])
            .with_context(|| format!("building watch globset for task {task}"))?;
        Ok(Self {
            task,
            pattern: pattern.to_string(),
            watch_set,
        })
    }

    /// Name of the task this binding re-runs.
    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns true if a change to this path (relative to the project root)
    /// should re-run the bound task.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.watch_set.is_match(rel_path)
    }
}

/// One binding per asset class, using the class's watch glob.
pub fn build_bindings_from_config(cfg: &ConfigFile) -> Result<Vec<WatchBinding>> {
    cfg.paths()
        .classes()
        .iter()
        .map(|class| WatchBinding::new(class.name(), class.watch_glob()))
        .collect()
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        builder.add(compile_glob(pat)?);
    }
    Ok(builder.build()?)
}

/// Compile a glob where `*` stays within one path component and `**`
/// crosses directories.
fn compile_glob(pattern: &str) -> Result<Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid glob pattern: {pattern}"))
}

/// Compiled source glob of an asset class.
#[derive(Debug, Clone)]
pub struct SourceMatcher {
    base: PathBuf,
    matcher: GlobMatcher,
}

impl SourceMatcher {
    pub fn for_class(class: &AssetClass) -> Result<Self> {
        let glob = compile_glob(class.source_glob())?;
        Ok(Self {
            base: class.source_base(),
            matcher: glob.compile_matcher(),
        })
    }

    /// Literal directory the glob starts from, relative to the project root.
    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        self.matcher.is_match(rel_path)
    }
}

/// Collect all files under `root` that match a class's source glob.
///
/// Only the glob's base directory is walked. A missing base directory yields
/// an empty list. Results are sorted so runs are deterministic.
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    root: &Path,
    matcher: &SourceMatcher,
) -> Result<Vec<PathBuf>> {
    let start = root.join(matcher.base());
    let mut files = Vec::new();
    if !fs.is_dir(&start) {
        return Ok(files);
    }

    let mut stack = vec![start];
    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                if let Some(rel_str) = relative_str(root, &path) {
                    if matcher.matches(&rel_str) {
                        files.push(path);
                    }
                }
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Path of `path` relative to `root`, with `/` separators and no leading
/// `./`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let s = rel.to_string_lossy().replace('\\', "/");
    Some(s.trim_start_matches("./").to_string())
}
