// src/task/registry.rs

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::model::ConfigFile;
use crate::config::paths::AssetClass;
use crate::errors::{PipelineError, Result};
use crate::task::{Task, TaskDef};
use crate::transform::{
    ensure_chain_order, Autoprefix, Chain, CssMinify, ImageOptimize, JsMinify, SassCompile,
    SourceMapInit, SourceMapWrite,
};
use crate::types::TaskName;

/// Every task name known to a run, built once from the validated config.
#[derive(Debug)]
pub struct TaskRegistry {
    tasks: BTreeMap<TaskName, TaskDef>,
}

impl TaskRegistry {
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let mut tasks = BTreeMap::new();

        for class in cfg.paths().classes() {
            let chain = chain_for(class, cfg);
            ensure_chain_order(class.name(), &chain)?;
            debug!(
                task = class.name(),
                steps = ?chain.iter().map(|t| t.name()).collect::<Vec<_>>(),
                "registered asset task"
            );
            tasks.insert(
                class.name().to_string(),
                TaskDef::Asset(Task::new(class.name(), class.clone(), chain)),
            );
        }

        tasks.insert("clean".to_string(), TaskDef::Clean);
        tasks.insert("webserver".to_string(), TaskDef::Webserver);
        tasks.insert("watch".to_string(), TaskDef::Watch);

        for (name, steps) in cfg.pipelines() {
            tasks.insert(name.clone(), TaskDef::Series(steps.clone()));
        }

        Ok(Self { tasks })
    }

    /// Look up a task, failing with the list of known names.
    pub fn get(&self, name: &str) -> Result<&TaskDef> {
        self.tasks.get(name).ok_or_else(|| {
            PipelineError::UnknownTask(format!(
                "'{name}' (known tasks: {})",
                self.names().join(", ")
            ))
        })
    }

    /// The asset task called `name`, if that name is an asset task.
    pub fn asset(&self, name: &str) -> Option<&Task> {
        match self.tasks.get(name) {
            Some(TaskDef::Asset(task)) => Some(task),
            _ => None,
        }
    }

    /// Sorted task names.
    pub fn names(&self) -> Vec<&str> {
        self.tasks.keys().map(String::as_str).collect()
    }

    /// Number of asset tasks, used to size the run semaphore.
    pub fn asset_count(&self) -> usize {
        self.tasks
            .values()
            .filter(|d| matches!(d, TaskDef::Asset(_)))
            .count()
    }
}

/// Transform chain of an asset class.
///
/// `html` and `fonts` are plain copies.
fn chain_for(class: &AssetClass, cfg: &ConfigFile) -> Chain {
    let mode = cfg.sourcemaps().mode;
    match class.name() {
        "js" => vec![
            Box::new(SourceMapInit),
            Box::new(JsMinify),
            Box::new(SourceMapWrite::new(mode)),
        ],
        "sass" => vec![
            Box::new(SourceMapInit),
            Box::new(SassCompile),
            Box::new(Autoprefix),
            Box::new(CssMinify),
            Box::new(SourceMapWrite::new(mode)),
        ],
        "image" => vec![Box::new(ImageOptimize::new(cfg.image().clone()))],
        _ => Vec::new(),
    }
}
