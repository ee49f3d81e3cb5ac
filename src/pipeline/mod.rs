// src/pipeline/mod.rs

//! Composition of tasks.
//!
//! - [`compose`] flattens a named target into a strictly sequential list of
//!   leaf steps. Step *i+1* only starts once step *i* has finished.
//! - [`compose_parallel`] groups watch bindings that fire independently of
//!   each other.

use std::collections::BTreeSet;

use crate::errors::{PipelineError, Result};
use crate::task::{TaskDef, TaskRegistry};
use crate::types::TaskName;
use crate::watch::patterns::WatchBinding;

/// A leaf step of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Build one asset class.
    Asset(TaskName),
    Clean,
    Webserver,
    Watch,
}

impl Step {
    /// Services keep running after the pipeline has walked past them.
    pub fn is_service(&self) -> bool {
        matches!(self, Step::Webserver | Step::Watch)
    }
}

/// A named, strictly sequential list of steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    name: TaskName,
    steps: Vec<Step>,
}

impl Pipeline {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// True when the pipeline starts a service and so runs until shutdown.
    pub fn is_long_running(&self) -> bool {
        self.steps.iter().any(Step::is_service)
    }
}

/// Resolve `name` into a flat sequential pipeline.
///
/// Nested series are expanded in place, depth first. A single task resolves
/// to a one-step pipeline.
pub fn compose(registry: &TaskRegistry, name: &str) -> Result<Pipeline> {
    let mut steps = Vec::new();
    let mut visiting = BTreeSet::new();
    expand(registry, name, &mut visiting, &mut steps)?;
    Ok(Pipeline {
        name: name.to_string(),
        steps,
    })
}

fn expand(
    registry: &TaskRegistry,
    name: &str,
    visiting: &mut BTreeSet<TaskName>,
    out: &mut Vec<Step>,
) -> Result<()> {
    match registry.get(name)? {
        TaskDef::Asset(task) => out.push(Step::Asset(task.name().to_string())),
        TaskDef::Clean => out.push(Step::Clean),
        TaskDef::Webserver => out.push(Step::Webserver),
        TaskDef::Watch => out.push(Step::Watch),
        TaskDef::Series(children) => {
            if !visiting.insert(name.to_string()) {
                return Err(PipelineError::PipelineCycle(format!(
                    "pipeline '{name}' refers back to itself"
                )));
            }
            for child in children {
                expand(registry, child, visiting, out)?;
            }
            visiting.remove(name);
        }
    }
    Ok(())
}

/// Watch bindings that fire independently; no ordering between members.
#[derive(Debug, Clone, Default)]
pub struct ParallelGroup {
    bindings: Vec<WatchBinding>,
}

impl ParallelGroup {
    pub fn bindings(&self) -> &[WatchBinding] {
        &self.bindings
    }

    /// Names of the bound tasks, deduplicated and sorted.
    pub fn tasks(&self) -> Vec<TaskName> {
        self.bindings
            .iter()
            .map(|b| b.task().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn into_bindings(self) -> Vec<WatchBinding> {
        self.bindings
    }
}

pub fn compose_parallel(bindings: Vec<WatchBinding>) -> ParallelGroup {
    ParallelGroup { bindings }
}
