// tests/pipeline.rs

mod common;
use crate::common::builders::ConfigFileBuilder;

use assetpipe::errors::PipelineError;
use assetpipe::pipeline::{compose, compose_parallel, Step};
use assetpipe::task::TaskRegistry;
use assetpipe::watch::patterns::{build_bindings_from_config, WatchBinding};

fn asset(name: &str) -> Step {
    Step::Asset(name.to_string())
}

#[test]
fn default_target_builds_then_serves_then_watches() {
    let registry = TaskRegistry::from_config(&ConfigFileBuilder::new().build()).unwrap();
    let pipeline = compose(&registry, "default").unwrap();

    assert_eq!(pipeline.name(), "default");
    assert_eq!(
        pipeline.steps(),
        &[
            asset("html"),
            asset("js"),
            asset("sass"),
            asset("fonts"),
            asset("image"),
            Step::Webserver,
            Step::Watch,
        ]
    );
    assert!(pipeline.is_long_running());
}

#[test]
fn build_and_single_tasks_are_finite() {
    let registry = TaskRegistry::from_config(&ConfigFileBuilder::new().build()).unwrap();

    let build = compose(&registry, "build").unwrap();
    assert_eq!(build.steps().len(), 5);
    assert!(!build.is_long_running());

    let sass = compose(&registry, "sass").unwrap();
    assert_eq!(sass.steps(), &[asset("sass")]);

    let clean = compose(&registry, "clean").unwrap();
    assert_eq!(clean.steps(), &[Step::Clean]);
}

#[test]
fn nested_pipelines_flatten_depth_first() {
    let cfg = ConfigFileBuilder::new()
        .with_pipeline("styles", &["sass", "fonts"])
        .with_pipeline("release", &["clean", "styles", "js", "styles"])
        .build();
    let registry = TaskRegistry::from_config(&cfg).unwrap();

    let release = compose(&registry, "release").unwrap();
    assert_eq!(
        release.steps(),
        &[
            Step::Clean,
            asset("sass"),
            asset("fonts"),
            asset("js"),
            asset("sass"),
            asset("fonts"),
        ]
    );
}

#[test]
fn unknown_target_is_reported() {
    let registry = TaskRegistry::from_config(&ConfigFileBuilder::new().build()).unwrap();
    assert!(matches!(
        compose(&registry, "deploy"),
        Err(PipelineError::UnknownTask(_))
    ));
}

#[test]
fn watch_group_has_one_binding_per_class() {
    let cfg = ConfigFileBuilder::new().build();
    let group = compose_parallel(build_bindings_from_config(&cfg).unwrap());

    assert!(!group.is_empty());
    assert_eq!(group.tasks(), vec!["fonts", "html", "image", "js", "sass"]);

    let sass = group.bindings().iter().find(|b| b.task() == "sass").unwrap();
    assert_eq!(sass.pattern(), "src/sass/*.sass");
    assert!(sass.matches("src/sass/_vars.sass"));
    assert!(!sass.matches("src/sass/partials/_x.sass"));

    let html = group.bindings().iter().find(|b| b.task() == "html").unwrap();
    assert!(html.matches("src/partials/nav.html"));
}

#[test]
fn parallel_group_deduplicates_task_names() {
    let group = compose_parallel(vec![
        WatchBinding::new("js", "src/js/**/*.js").unwrap(),
        WatchBinding::new("js", "vendor/**/*.js").unwrap(),
        WatchBinding::new("html", "src/**/*.html").unwrap(),
    ]);
    assert_eq!(group.bindings().len(), 3);
    assert_eq!(group.tasks(), vec!["html", "js"]);
}

#[test]
fn empty_group() {
    assert!(compose_parallel(Vec::new()).is_empty());
}
