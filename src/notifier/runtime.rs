// src/notifier/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::{PipelineError, Result};
use crate::notifier::core::NotifierCore;
use crate::notifier::executor::TaskExecutor;
use crate::notifier::{NotifierCommand, NotifierEvent};

/// Async IO shell around [`NotifierCore`].
///
/// Reads events, feeds them to the core, arms timers and starts runs on the
/// executor. Timers send their `DebounceElapsed` back through `event_tx`.
pub struct Notifier<E: TaskExecutor> {
    core: NotifierCore,
    event_rx: mpsc::Receiver<NotifierEvent>,
    event_tx: mpsc::Sender<NotifierEvent>,
    executor: E,
}

impl<E: TaskExecutor> fmt::Debug for Notifier<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: TaskExecutor> Notifier<E> {
    pub fn new(
        core: NotifierCore,
        event_rx: mpsc::Receiver<NotifierEvent>,
        event_tx: mpsc::Sender<NotifierEvent>,
        executor: E,
    ) -> Self {
        Self {
            core,
            event_rx,
            event_tx,
            executor,
        }
    }

    /// Main event loop. Returns once shutdown completes, or with an error
    /// after a fatal task failure.
    pub async fn run(mut self) -> Result<()> {
        info!("change notifier started");

        while let Some(event) = self.event_rx.recv().await {
            debug!(?event, "notifier received event");

            let step = self.core.step(event);
            for command in step.commands {
                if let NotifierCommand::Exit { error: Some(message) } = command {
                    return Err(PipelineError::Other(anyhow::anyhow!(message)));
                }
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                info!("change notifier stopped");
                return Ok(());
            }
        }

        info!("notifier event channel closed; exiting");
        Ok(())
    }

    async fn execute_command(&mut self, command: NotifierCommand) -> Result<()> {
        match command {
            NotifierCommand::ArmTimer {
                task,
                generation,
                delay,
            } => {
                let tx = self.event_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(NotifierEvent::DebounceElapsed { task, generation }).await;
                });
            }
            NotifierCommand::RunTask { task } => {
                info!(task = %task, "change detected; re-running task");
                self.executor.spawn_task(task).await?;
            }
            NotifierCommand::Exit { .. } => {
                debug!("core issued Exit command");
            }
        }
        Ok(())
    }
}
