// src/orchestrator.rs

//! Drives a named target: runs its pipeline steps in order, starts the
//! services it names, and shuts everything down gracefully.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::model::ConfigFile;
use crate::errors::{PipelineError, Result};
use crate::fs::FileSystem;
use crate::notifier::{Notifier, NotifierCore, NotifierEvent, RealTaskExecutor};
use crate::pipeline::{compose, compose_parallel, Pipeline, Step};
use crate::server::{start_server, ReloadHub, ServerHandle};
use crate::task::{TaskContext, TaskRegistry};
use crate::types::TaskOutcome;
use crate::watch::patterns::build_bindings_from_config;
use crate::watch::{spawn_watcher, WatcherHandle};

/// Everything a run shares: config, registry, task context and reload hub.
#[derive(Debug)]
pub struct Orchestrator {
    cfg: Arc<ConfigFile>,
    root: PathBuf,
    hub: ReloadHub,
    tasks: TaskContext,
    cancel: CancellationToken,
}

/// Services started by the steps of the current target.
#[derive(Debug, Default)]
struct Services {
    server: Option<ServerHandle>,
    watch: Option<WatchService>,
}

#[derive(Debug)]
struct WatchService {
    watcher: Option<WatcherHandle>,
    events: mpsc::Sender<NotifierEvent>,
    notifier: JoinHandle<Result<()>>,
}

impl Orchestrator {
    pub fn new(cfg: Arc<ConfigFile>, root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Result<Self> {
        let root = root.into();
        let registry = Arc::new(TaskRegistry::from_config(&cfg)?);
        let hub = ReloadHub::new(cfg.paths().build_root());
        let cancel = CancellationToken::new();
        let tasks = TaskContext::new(
            fs,
            root.clone(),
            registry,
            Arc::new(hub.clone()),
            cancel.clone(),
        );
        Ok(Self {
            cfg,
            root,
            hub,
            tasks,
            cancel,
        })
    }

    pub fn registry(&self) -> &TaskRegistry {
        self.tasks.registry()
    }

    pub fn reload_hub(&self) -> &ReloadHub {
        &self.hub
    }

    /// Resolve `name` into its pipeline without running anything.
    pub fn plan(&self, name: &str) -> Result<Pipeline> {
        compose(self.registry(), name)
    }

    /// Check startup preconditions for `name`.
    ///
    /// Every target except `clean` reads sources, so the source root must
    /// exist.
    pub fn check_preconditions(&self, name: &str) -> Result<()> {
        let pipeline = self.plan(name)?;
        let needs_sources = pipeline.steps().iter().any(|s| *s != Step::Clean);
        let src_root = self.root.join(self.cfg.paths().src_root());
        if needs_sources && !self.tasks.fs().is_dir(&src_root) {
            return Err(PipelineError::Config(format!(
                "source root {:?} does not exist",
                self.cfg.paths().src_root()
            )));
        }
        Ok(())
    }

    /// Run a target. Long-running targets stay up until `shutdown` resolves
    /// or a watched task fails fatally.
    pub async fn run_until<F>(&self, name: &str, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let pipeline = self.plan(name)?;
        info!(task = name, steps = ?pipeline.steps(), "running target");

        let mut services = Services::default();
        if let Err(err) = self.run_steps(&pipeline, &mut services).await {
            if services.server.is_some() || services.watch.is_some() {
                self.shutdown(services).await?;
            }
            return Err(err);
        }

        if services.server.is_none() && services.watch.is_none() {
            info!(task = name, "target finished");
            return Ok(());
        }

        info!("running; press Ctrl-C to stop");
        let fatal = match services.watch.as_mut() {
            Some(watch) => {
                tokio::select! {
                    _ = shutdown => None,
                    res = &mut watch.notifier => Some(flatten_join(res)),
                }
            }
            None => {
                shutdown.await;
                None
            }
        };

        match fatal {
            Some(result) => {
                // The notifier already stopped; only the rest needs to go.
                if let Some(watch) = services.watch.take() {
                    if let Some(watcher) = watch.watcher {
                        watcher.stop();
                    }
                }
                self.shutdown(services).await?;
                result
            }
            None => self.shutdown(services).await,
        }
    }

    async fn run_steps(&self, pipeline: &Pipeline, services: &mut Services) -> Result<()> {
        for step in pipeline.steps() {
            if self.cancel.is_cancelled() {
                break;
            }
            match step {
                Step::Asset(task) => {
                    let report = self.tasks.run(task).await?;
                    if let TaskOutcome::PartialFailure(n) = report.outcome() {
                        warn!(task = %task, failed = n, "task finished with failures; continuing");
                    }
                }
                Step::Clean => self.tasks.clean(self.cfg.paths().build_root()).await?,
                Step::Webserver => {
                    if services.server.is_none() {
                        let build_root = self.root.join(self.cfg.paths().build_root());
                        let handle = start_server(
                            self.cfg.server(),
                            build_root,
                            self.hub.clone(),
                            self.cancel.clone(),
                        )
                        .await?;
                        services.server = Some(handle);
                    }
                }
                Step::Watch => {
                    if services.watch.is_none() {
                        services.watch = Some(self.start_watch()?);
                    }
                }
            }
        }
        Ok(())
    }

    fn start_watch(&self) -> Result<WatchService> {
        let group = compose_parallel(build_bindings_from_config(&self.cfg)?);
        let debounce = Duration::from_millis(self.cfg.watch().debounce_ms);
        let (tx, rx) = mpsc::channel::<NotifierEvent>(256);

        let core = NotifierCore::new(group.tasks(), debounce);
        let executor = RealTaskExecutor::new(self.tasks.clone(), tx.clone());
        let notifier = tokio::spawn(Notifier::new(core, rx, tx.clone(), executor).run());

        // A watcher that cannot start leaves already-built output being
        // served; it is a warning, not a failure.
        let watcher = match spawn_watcher(&self.root, group.into_bindings(), tx.clone()) {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!(error = %err, "file watching unavailable; serving existing output only");
                None
            }
        };

        Ok(WatchService {
            watcher,
            events: tx,
            notifier,
        })
    }

    /// Stop the watcher, let in-flight runs finish, then stop the server.
    async fn shutdown(&self, services: Services) -> Result<()> {
        info!("shutting down");
        let mut result = Ok(());

        if let Some(watch) = services.watch {
            if let Some(watcher) = watch.watcher {
                if watcher.is_degraded() {
                    warn!("file watcher reported errors during this session; some changes may have been missed");
                }
                watcher.stop();
            }
            let _ = watch.events.send(NotifierEvent::ShutdownRequested).await;
            self.cancel.cancel();
            result = flatten_join(watch.notifier.await);
        }
        self.cancel.cancel();

        if let Some(server) = services.server {
            if let Err(e) = server.task.await {
                warn!(error = %e, "web server task ended abnormally");
            }
        }

        info!("shutdown complete");
        result
    }
}

fn flatten_join(res: std::result::Result<Result<()>, tokio::task::JoinError>) -> Result<()> {
    res.map_err(|e| PipelineError::Other(e.into()))?
}
