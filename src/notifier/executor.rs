// src/notifier/executor.rs

//! Pluggable executor for notifier-triggered runs.
//!
//! Production code uses [`RealTaskExecutor`], which runs the asset task
//! through a [`TaskContext`]. Tests can provide their own implementation
//! that records runs and reports completion directly.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;
use tracing::{error, warn};

use crate::errors::Result;
use crate::notifier::NotifierEvent;
use crate::task::TaskContext;
use crate::types::{TaskName, TaskOutcome};

/// Trait abstracting how a notifier run is started.
///
/// Implementations must eventually send `TaskFinished` (or
/// `TaskFailedFatally`) for every task they start, or the binding stays in
/// `Firing` forever.
pub trait TaskExecutor: Send {
    fn spawn_task(&mut self, task: TaskName) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Executor that runs asset tasks for real.
#[derive(Debug)]
pub struct RealTaskExecutor {
    tasks: TaskContext,
    events: mpsc::Sender<NotifierEvent>,
}

impl RealTaskExecutor {
    pub fn new(tasks: TaskContext, events: mpsc::Sender<NotifierEvent>) -> Self {
        Self { tasks, events }
    }
}

impl TaskExecutor for RealTaskExecutor {
    fn spawn_task(&mut self, task: TaskName) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tasks = self.tasks.clone();
        let events = self.events.clone();

        Box::pin(async move {
            tokio::spawn(async move {
                let event = match tasks.run(&task).await {
                    Ok(report) => {
                        if let TaskOutcome::PartialFailure(n) = report.outcome() {
                            warn!(task = %task, failed = n, "re-run finished with failures");
                        }
                        NotifierEvent::TaskFinished { task }
                    }
                    Err(err) if err.is_fatal() => NotifierEvent::TaskFailedFatally {
                        task,
                        message: err.to_string(),
                    },
                    Err(err) => {
                        error!(task = %task, error = %err, "re-run failed");
                        NotifierEvent::TaskFinished { task }
                    }
                };
                if events.send(event).await.is_err() {
                    warn!("notifier closed before run completion was delivered");
                }
            });
            Ok(())
        })
    }
}
