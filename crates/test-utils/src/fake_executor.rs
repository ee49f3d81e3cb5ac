use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assetpipe::errors::Result;
use assetpipe::notifier::{NotifierEvent, TaskExecutor};
use tokio::sync::mpsc;

#[derive(Debug, Default)]
struct Counters {
    running: HashMap<String, usize>,
    max_per_task: HashMap<String, usize>,
    running_total: usize,
    max_total: usize,
}

/// A fake executor that:
/// - records which tasks were "run"
/// - pretends each run takes `run_time`
/// - reports `TaskFinished` afterwards
/// - tracks how many runs overlapped, per task and overall.
#[derive(Debug, Clone)]
pub struct FakeExecutor {
    events: mpsc::Sender<NotifierEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    counters: Arc<Mutex<Counters>>,
    run_time: Duration,
}

impl FakeExecutor {
    pub fn new(events: mpsc::Sender<NotifierEvent>, run_time: Duration) -> Self {
        Self {
            events,
            executed: Arc::new(Mutex::new(Vec::new())),
            counters: Arc::new(Mutex::new(Counters::default())),
            run_time,
        }
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub fn runs_of(&self, task: &str) -> usize {
        self.executed().iter().filter(|t| *t == task).count()
    }

    /// Highest number of simultaneous runs of one task.
    pub fn max_overlap(&self, task: &str) -> usize {
        self.counters
            .lock()
            .unwrap()
            .max_per_task
            .get(task)
            .copied()
            .unwrap_or(0)
    }

    /// Highest number of simultaneous runs across all tasks.
    pub fn max_concurrency(&self) -> usize {
        self.counters.lock().unwrap().max_total
    }
}

impl TaskExecutor for FakeExecutor {
    fn spawn_task(&mut self, task: String) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let events = self.events.clone();
        let executed = Arc::clone(&self.executed);
        let counters = Arc::clone(&self.counters);
        let run_time = self.run_time;

        Box::pin(async move {
            executed.lock().unwrap().push(task.clone());
            {
                let mut c = counters.lock().unwrap();
                let running = c.running.entry(task.clone()).or_default();
                *running += 1;
                let now = *running;
                let max = c.max_per_task.entry(task.clone()).or_default();
                *max = (*max).max(now);
                c.running_total += 1;
                c.max_total = c.max_total.max(c.running_total);
            }

            tokio::spawn(async move {
                tokio::time::sleep(run_time).await;
                {
                    let mut c = counters.lock().unwrap();
                    if let Some(running) = c.running.get_mut(&task) {
                        *running -= 1;
                    }
                    c.running_total -= 1;
                }
                let _ = events.send(NotifierEvent::TaskFinished { task }).await;
            });
            Ok(())
        })
    }
}
