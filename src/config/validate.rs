// src/config/validate.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use globset::Glob;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::config::paths::{
    default_class_paths, normalize_relative, AssetClass, PathTable, ASSET_CLASSES,
};
use crate::errors::{PipelineError, Result};
use crate::types::TaskName;

/// Task names that are not asset classes and not pipelines.
pub const SERVICE_TASKS: [&str; 3] = ["clean", "webserver", "watch"];

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = PipelineError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let paths = build_path_table(&raw)?;
        validate_image_options(&raw)?;
        let pipelines = merge_pipelines(&raw.pipelines)?;
        validate_pipelines(&pipelines)?;

        Ok(ConfigFile::new_unchecked(
            paths,
            raw.server,
            raw.watch,
            raw.image,
            raw.sourcemaps,
            pipelines,
        ))
    }
}

/// Built-in sequential compositions.
pub fn default_pipelines() -> BTreeMap<TaskName, Vec<TaskName>> {
    let mut pipelines = BTreeMap::new();
    pipelines.insert(
        "build".to_string(),
        ASSET_CLASSES.iter().map(|s| s.to_string()).collect(),
    );
    pipelines.insert(
        "default".to_string(),
        vec!["build".into(), "webserver".into(), "watch".into()],
    );
    pipelines
}

fn build_path_table(raw: &RawConfigFile) -> Result<PathTable> {
    let src_root = root_dir("src_root", &raw.paths.src_root)?;
    let build_root = root_dir("build_root", &raw.paths.build_root)?;

    if src_root.starts_with(&build_root) || build_root.starts_with(&src_root) {
        return Err(PipelineError::Config(format!(
            "[paths] src_root {:?} and build_root {:?} must not contain each other",
            src_root, build_root
        )));
    }

    for name in raw.paths.classes.keys() {
        if !ASSET_CLASSES.contains(&name.as_str()) {
            return Err(PipelineError::Config(format!(
                "[paths.{name}] is not an asset class (expected one of {:?})",
                ASSET_CLASSES
            )));
        }
    }

    let mut classes = Vec::with_capacity(ASSET_CLASSES.len());
    for name in ASSET_CLASSES {
        let Some((src, watch, dest)) = default_class_paths(name) else {
            continue;
        };
        let over = raw.paths.classes.get(name).cloned().unwrap_or_default();
        let src = over.src.unwrap_or_else(|| rebase(src, "src", &src_root));
        let watch = over.watch.unwrap_or_else(|| rebase(watch, "src", &src_root));
        let dest = over.dest.unwrap_or_else(|| rebase(dest, "build", &build_root));

        check_glob(name, "src", &src)?;
        check_glob(name, "watch", &watch)?;

        let dest_dir = normalize_relative(Path::new(&dest)).ok_or_else(|| {
            PipelineError::Config(format!(
                "[paths.{name}].dest {dest:?} must be a relative path without '..'"
            ))
        })?;
        if !dest_dir.starts_with(&build_root) {
            return Err(PipelineError::Config(format!(
                "[paths.{name}].dest {dest:?} is outside build_root {:?}",
                build_root
            )));
        }

        classes.push(AssetClass::new(name, src, watch, dest_dir));
    }

    Ok(PathTable::new_unchecked(src_root, build_root, classes))
}

/// Move a stock path from its stock root onto the configured one, so
/// `src/js/**/*.js` becomes `app/js/**/*.js` when `src_root = "app"`.
fn rebase(stock: &str, stock_root: &str, root: &Path) -> String {
    let root = root.to_string_lossy().replace('\\', "/");
    match stock.strip_prefix(stock_root) {
        Some(rest) => format!("{root}{rest}"),
        None => stock.to_string(),
    }
}

fn root_dir(key: &str, value: &str) -> Result<PathBuf> {
    match normalize_relative(Path::new(value)) {
        Some(p) if !p.as_os_str().is_empty() => Ok(p),
        _ => Err(PipelineError::Config(format!(
            "[paths].{key} {value:?} must be a non-empty relative directory"
        ))),
    }
}

fn check_glob(class: &str, key: &str, pattern: &str) -> Result<()> {
    Glob::new(pattern).map_err(|e| {
        PipelineError::Config(format!(
            "[paths.{class}].{key} has an invalid glob {pattern:?}: {e}"
        ))
    })?;
    Ok(())
}

fn validate_image_options(raw: &RawConfigFile) -> Result<()> {
    if raw.image.png_optimization_level > 6 {
        return Err(PipelineError::Config(format!(
            "[image].png_optimization_level must be 0..=6 (got {})",
            raw.image.png_optimization_level
        )));
    }
    Ok(())
}

fn merge_pipelines(
    user: &BTreeMap<TaskName, Vec<TaskName>>,
) -> Result<BTreeMap<TaskName, Vec<TaskName>>> {
    let mut pipelines = default_pipelines();
    for (name, steps) in user {
        if ASSET_CLASSES.contains(&name.as_str()) || SERVICE_TASKS.contains(&name.as_str()) {
            return Err(PipelineError::Config(format!(
                "[pipelines].{name} shadows a built-in task"
            )));
        }
        if steps.is_empty() {
            return Err(PipelineError::Config(format!(
                "[pipelines].{name} must list at least one step"
            )));
        }
        pipelines.insert(name.clone(), steps.clone());
    }
    Ok(pipelines)
}

fn validate_pipelines(pipelines: &BTreeMap<TaskName, Vec<TaskName>>) -> Result<()> {
    let is_known = |step: &str| {
        ASSET_CLASSES.contains(&step)
            || SERVICE_TASKS.contains(&step)
            || pipelines.contains_key(step)
    };

    for (name, steps) in pipelines {
        for step in steps {
            if !is_known(step) {
                return Err(PipelineError::Config(format!(
                    "pipeline '{}' has unknown step '{}'",
                    name, step
                )));
            }
        }
    }

    // Edge direction: pipeline -> nested pipeline step.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for name in pipelines.keys() {
        graph.add_node(name.as_str());
    }
    for (name, steps) in pipelines {
        for step in steps.iter().filter(|s| pipelines.contains_key(s.as_str())) {
            graph.add_edge(name.as_str(), step.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(PipelineError::PipelineCycle(format!(
            "cycle detected in pipelines involving '{}'",
            cycle.node_id()
        ))),
    }
}
