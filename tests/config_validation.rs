// tests/config_validation.rs

mod common;
use crate::common::builders::{ConfigFileBuilder, ProjectTree};

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use assetpipe::config::{load_and_validate, resolve_config, ASSET_CLASSES};
use assetpipe::errors::PipelineError;
use assetpipe::types::SourceMapMode;

#[test]
fn stock_layout_matches_the_path_table() {
    let cfg = ConfigFileBuilder::new().build();
    let paths = cfg.paths();

    assert_eq!(paths.src_root(), Path::new("src"));
    assert_eq!(paths.build_root(), Path::new("build"));
    let names: Vec<&str> = paths.classes().iter().map(|c| c.name()).collect();
    assert_eq!(names, ASSET_CLASSES.to_vec());

    let sass = paths.class("sass").unwrap();
    assert_eq!(sass.source_glob(), "src/sass/main.sass");
    assert_eq!(sass.watch_glob(), "src/sass/*.sass");
    assert_eq!(sass.dest_dir(), Path::new("build/css"));

    let html = paths.class("html").unwrap();
    assert_eq!(html.source_glob(), "src/*.html");
    assert_eq!(html.watch_glob(), "src/**/*.html");
    assert_eq!(html.dest_dir(), Path::new("build"));

    assert_eq!(cfg.watch().debounce_ms, 150);
    assert_eq!(cfg.server().port, 9898);
    assert_eq!(cfg.sourcemaps().mode, SourceMapMode::File);
    assert_eq!(
        cfg.pipelines()["default"],
        vec!["build".to_string(), "webserver".into(), "watch".into()]
    );
}

#[test]
fn changed_roots_move_the_stock_paths_along() {
    let cfg = ConfigFileBuilder::new()
        .with_src_root("app")
        .with_build_root("dist")
        .build();

    let js = cfg.paths().class("js").unwrap();
    assert_eq!(js.source_glob(), "app/js/**/*.js");
    assert_eq!(js.dest_dir(), Path::new("dist/js"));
    assert_eq!(cfg.paths().class("html").unwrap().dest_dir(), Path::new("dist"));
}

#[test]
fn destination_outside_build_root_is_a_config_error() {
    let result = ConfigFileBuilder::new()
        .with_class_dest("js", "public/js/")
        .try_build();

    match result {
        Err(PipelineError::Config(msg)) => {
            assert!(msg.contains("outside build_root"), "{msg}");
            assert!(msg.contains("js"));
        }
        other => panic!("Expected Config error, got: {:?}", other),
    }
}

#[test]
fn destination_escaping_upwards_is_rejected() {
    let result = ConfigFileBuilder::new()
        .with_class_dest("fonts", "build/../fonts")
        .try_build();
    assert!(matches!(result, Err(PipelineError::Config(_))));
}

#[test]
fn invalid_glob_is_a_config_error() {
    let result = ConfigFileBuilder::new()
        .with_class_paths("js", "src/js/[*.js", "src/js/**/*.js", "build/js/")
        .try_build();

    match result {
        Err(PipelineError::Config(msg)) => assert!(msg.contains("invalid glob")),
        other => panic!("Expected Config error, got: {:?}", other),
    }
}

#[test]
fn nested_roots_are_rejected() {
    let result = ConfigFileBuilder::new()
        .with_src_root("site")
        .with_build_root("site/build")
        .try_build();
    assert!(matches!(result, Err(PipelineError::Config(_))));
}

#[test]
fn pipeline_cycle_returns_structured_error() {
    let result = ConfigFileBuilder::new()
        .with_pipeline("assets", &["js", "styles"])
        .with_pipeline("styles", &["sass", "assets"])
        .try_build();

    match result {
        Err(PipelineError::PipelineCycle(msg)) => {
            assert!(msg.contains("cycle detected"));
            assert!(msg.contains("assets") || msg.contains("styles"));
        }
        other => panic!("Expected PipelineCycle error, got: {:?}", other),
    }
}

#[test]
fn unknown_pipeline_step_returns_config_error() {
    let result = ConfigFileBuilder::new()
        .with_pipeline("assets", &["js", "minify-everything"])
        .try_build();

    match result {
        Err(PipelineError::Config(msg)) => {
            assert!(msg.contains("unknown step"));
            assert!(msg.contains("minify-everything"));
        }
        other => panic!("Expected Config error, got: {:?}", other),
    }
}

#[test]
fn pipeline_may_not_shadow_a_builtin_task() {
    let result = ConfigFileBuilder::new()
        .with_pipeline("clean", &["js"])
        .try_build();
    assert!(matches!(result, Err(PipelineError::Config(_))));
}

#[test]
fn user_pipeline_may_replace_build() {
    let cfg = ConfigFileBuilder::new()
        .with_pipeline("build", &["sass", "js"])
        .build();
    assert_eq!(cfg.pipelines()["build"], vec!["sass".to_string(), "js".into()]);
}

#[test]
fn toml_file_is_loaded_and_validated() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[paths]
build_root = "dist"

[paths.js]
dest = "dist/scripts/"

[watch]
debounce_ms = 40

[sourcemaps]
mode = "inline"

[pipelines]
scripts = ["clean", "js"]
"#
    )
    .unwrap();

    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.paths().class("js").unwrap().dest_dir(), Path::new("dist/scripts"));
    assert_eq!(cfg.watch().debounce_ms, 40);
    assert_eq!(cfg.sourcemaps().mode, SourceMapMode::Inline);
    assert!(cfg.pipelines().contains_key("scripts"));
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[watch\ndebounce_ms = ").unwrap();

    let result = load_and_validate(file.path());
    assert!(matches!(result, Err(PipelineError::Toml(_))));
}

#[test]
fn png_level_out_of_range_is_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[image]\npng_optimization_level = 9\n").unwrap();

    let result = load_and_validate(file.path());
    assert!(matches!(result, Err(PipelineError::Config(_))));
}

#[test]
fn gif_and_jpeg_options_are_rejected() {
    for key in ["gif_interlaced", "jpeg_progressive", "jpeg_arithmetic"] {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[image]\n{key} = true\n").unwrap();

        match load_and_validate(file.path()) {
            Err(PipelineError::Toml(err)) => assert!(err.to_string().contains(key), "{err}"),
            other => panic!("Expected Toml error for {key}, got: {:?}", other),
        }
    }
}

#[test]
fn resolve_config_prefers_the_project_file() {
    let tree = ProjectTree::new().file("Assetpipe.toml", "[server]\nport = 4000\n");
    let cfg = resolve_config(None, tree.path()).unwrap();
    assert_eq!(cfg.server().port, 4000);
}

#[test]
fn resolve_config_falls_back_to_stock_layout() {
    let tree = ProjectTree::new();
    let cfg = resolve_config(None, tree.path()).unwrap();
    assert_eq!(cfg.server().port, 9898);
}

#[test]
fn explicit_missing_config_is_an_io_error() {
    let tree = ProjectTree::new();
    let missing = tree.path().join("nope.toml");
    let result = resolve_config(Some(&missing), tree.path());
    assert!(matches!(result, Err(PipelineError::Io(_))));
}
