// src/task/context.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::{PipelineError, Result};
use crate::fs::FileSystem;
use crate::task::runner::{clean, run_task, CompletionSink, TaskReport};
use crate::task::TaskRegistry;

/// Shared handles needed to run asset tasks off the async runtime.
///
/// Cloning is cheap. Every clone gates on the same semaphore, sized to the
/// number of asset tasks.
#[derive(Clone)]
pub struct TaskContext {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    registry: Arc<TaskRegistry>,
    sink: Arc<dyn CompletionSink>,
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskContext")
            .field("root", &self.root)
            .field("available_permits", &self.permits.available_permits())
            .finish_non_exhaustive()
    }
}

impl TaskContext {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        root: impl Into<PathBuf>,
        registry: Arc<TaskRegistry>,
        sink: Arc<dyn CompletionSink>,
        cancel: CancellationToken,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(registry.asset_count().max(1)));
        Self {
            fs,
            root: root.into(),
            registry,
            sink,
            permits,
            cancel,
        }
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Run the asset task `name` on the blocking pool, then forward its
    /// report to the completion sink.
    pub async fn run(&self, name: &str) -> Result<TaskReport> {
        if self.registry.asset(name).is_none() {
            return Err(PipelineError::UnknownTask(format!("'{name}' is not an asset task")));
        }

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| PipelineError::Other(e.into()))?;
        debug!(task = name, "task run started");

        let fs = Arc::clone(&self.fs);
        let registry = Arc::clone(&self.registry);
        let root = self.root.clone();
        let cancel = self.cancel.clone();
        let task_name = name.to_string();

        let report = tokio::task::spawn_blocking(move || {
            let task = registry
                .asset(&task_name)
                .ok_or_else(|| PipelineError::UnknownTask(task_name.clone()))?;
            run_task(fs.as_ref(), &root, task, &cancel)
        })
        .await
        .map_err(|e| PipelineError::Other(e.into()))??;

        self.sink.task_completed(&report);
        Ok(report)
    }

    /// Remove the build root.
    pub async fn clean(&self, build_root: &Path) -> Result<()> {
        let fs = Arc::clone(&self.fs);
        let root = self.root.clone();
        let build_root = build_root.to_path_buf();
        tokio::task::spawn_blocking(move || clean(fs.as_ref(), &root, &build_root))
            .await
            .map_err(|e| PipelineError::Other(e.into()))?
    }
}
