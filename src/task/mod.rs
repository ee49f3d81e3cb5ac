// src/task/mod.rs

//! Named units of work.
//!
//! - [`registry`] maps every task name to its definition and builds the
//!   transform chain of each asset class.
//! - [`runner`] executes one asset task over its matched files and produces
//!   a [`TaskReport`].
//! - [`context`] bundles what a run needs (filesystem, registry, completion
//!   sink, concurrency gate) so the orchestrator and the change notifier run
//!   tasks the same way.

pub mod context;
pub mod registry;
pub mod runner;

use std::fmt;

use crate::config::paths::AssetClass;
use crate::transform::Chain;
use crate::types::TaskName;

pub use context::TaskContext;
pub use registry::TaskRegistry;
pub use runner::{clean, run_task, CompletionSink, FileOutcome, FileReport, TaskReport};

/// An asset task: an asset class plus the chain applied to each of its files.
///
/// Holds no mutable state; every run re-reads the matched files.
pub struct Task {
    name: TaskName,
    class: AssetClass,
    chain: Chain,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let steps: Vec<&str> = self.chain.iter().map(|t| t.name()).collect();
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("class", &self.class)
            .field("chain", &steps)
            .finish()
    }
}

impl Task {
    pub fn new(name: impl Into<TaskName>, class: AssetClass, chain: Chain) -> Self {
        Self {
            name: name.into(),
            class,
            chain,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> &AssetClass {
        &self.class
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }
}

/// What a task name resolves to.
#[derive(Debug)]
pub enum TaskDef {
    /// Per-file build of one asset class.
    Asset(Task),
    /// Sequential composition of other tasks.
    Series(Vec<TaskName>),
    /// Remove the build root.
    Clean,
    /// Start the live-preview server.
    Webserver,
    /// Start the change notifier over every watch binding.
    Watch,
}
