// tests/task_runner.rs

mod common;
use crate::common::builders::ConfigFileBuilder;
use crate::common::init_tracing;

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder};

use tokio_util::sync::CancellationToken;

use assetpipe::config::ASSET_CLASSES;
use assetpipe::errors::PipelineError;
use assetpipe::fs::mock::MockFileSystem;
use assetpipe::fs::FileSystem;
use assetpipe::task::{clean, run_task, FileOutcome, TaskRegistry};
use assetpipe::types::TaskOutcome;

fn registry() -> TaskRegistry {
    TaskRegistry::from_config(&ConfigFileBuilder::new().build()).unwrap()
}

fn root() -> &'static Path {
    Path::new(".")
}

#[test]
fn empty_source_set_is_a_successful_no_op_for_every_class() {
    init_tracing();
    let fs = MockFileSystem::new();
    let registry = registry();
    let token = CancellationToken::new();

    for class in ASSET_CLASSES {
        let task = registry.asset(class).unwrap();
        let report = run_task(&fs, root(), task, &token).unwrap();
        assert!(report.files.is_empty(), "{class} matched files");
        assert_eq!(report.outcome(), TaskOutcome::Success);
    }

    assert!(fs.file_paths().is_empty());
    assert!(!fs.exists(Path::new("build")));
}

#[test]
fn js_keeps_structure_relative_to_glob_base() {
    let fs = MockFileSystem::new();
    fs.add_file("src/js/a/b.js", "function hello ( name ) {\n  return 'hi ' + name;\n}\n");
    fs.add_file("src/js/main.js", "var x = 1;\n");
    fs.add_file("src/js/readme.txt", "not js");

    let registry = registry();
    let report = run_task(&fs, root(), registry.asset("js").unwrap(), &CancellationToken::new())
        .unwrap();

    assert_eq!(report.outcome(), TaskOutcome::Success);
    assert_eq!(report.files.len(), 2);

    let out = String::from_utf8(fs.read(Path::new("build/js/a/b.js")).unwrap()).unwrap();
    assert!(out.starts_with("function hello(name){return"), "{out}");
    assert!(out.contains("hi ") && out.contains("+name"), "{out}");
    assert!(out.ends_with("//# sourceMappingURL=b.js.map\n"));
    assert!(fs.is_file(Path::new("build/js/a/b.js.map")));
    assert!(fs.is_file(Path::new("build/js/main.js")));
    assert!(!fs.exists(Path::new("build/js/readme.txt")));

    let written: Vec<PathBuf> = report.written().into_iter().map(Path::to_path_buf).collect();
    assert!(written.contains(&PathBuf::from("build/js/a/b.js")));
    assert!(written.contains(&PathBuf::from("build/js/a/b.js.map")));
}

#[test]
fn html_and_fonts_are_copied_verbatim() {
    let fs = MockFileSystem::new();
    let html = "<html>\n  <body>hello</body>\n</html>\n";
    fs.add_file("src/index.html", html);
    fs.add_file("src/partials/nav.html", "<nav></nav>");
    fs.add_file("src/fonts/inter/Inter.woff2", vec![0u8, 1, 2, 3, 255]);

    let registry = registry();
    let token = CancellationToken::new();
    run_task(&fs, root(), registry.asset("html").unwrap(), &token).unwrap();
    run_task(&fs, root(), registry.asset("fonts").unwrap(), &token).unwrap();

    assert_eq!(fs.read(Path::new("build/index.html")).unwrap(), html.as_bytes());
    // `src/*.html` does not descend into subdirectories.
    assert!(!fs.exists(Path::new("build/partials/nav.html")));
    assert_eq!(
        fs.read(Path::new("build/fonts/inter/Inter.woff2")).unwrap(),
        vec![0u8, 1, 2, 3, 255]
    );
}

#[test]
fn second_run_is_idempotent_and_reports_unchanged() {
    let fs = MockFileSystem::new();
    fs.add_file("src/sass/main.sass", "$c: red\n.a\n  color: $c\n");
    fs.add_file("src/js/app.js", "let a = 1;\n");

    let registry = registry();
    let token = CancellationToken::new();

    for class in ["sass", "js"] {
        let report = run_task(&fs, root(), registry.asset(class).unwrap(), &token).unwrap();
        assert_eq!(report.unchanged(), 0);
    }
    let snapshot: Vec<(PathBuf, Vec<u8>)> = fs
        .file_paths()
        .into_iter()
        .map(|p| {
            let bytes = fs.read(&p).unwrap();
            (p, bytes)
        })
        .collect();

    for class in ["sass", "js"] {
        let report = run_task(&fs, root(), registry.asset(class).unwrap(), &token).unwrap();
        assert!(report.written().is_empty(), "{class} rewrote outputs");
        assert_eq!(report.unchanged(), 1);
        assert!(report.files.iter().all(|f| f.outcome == FileOutcome::Unchanged));
    }

    for (path, bytes) in snapshot {
        assert_eq!(fs.read(&path).unwrap(), bytes, "{path:?} changed");
    }
}

/// A 32x32 two-colour RGBA image written with no filtering and fast
/// compression, which leaves oxipng plenty to shave off.
fn loose_png() -> Vec<u8> {
    let (width, height) = (32u32, 32u32);
    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for _ in 0..width {
            let shade = if y < height / 2 { 0 } else { 255 };
            pixels.extend_from_slice(&[shade, 64, 128, 255]);
        }
    }

    let mut out = Cursor::new(Vec::new());
    PngEncoder::new_with_quality(&mut out, CompressionType::Fast, FilterType::NoFilter)
        .write_image(&pixels, width, height, ExtendedColorType::Rgba8)
        .unwrap();
    out.into_inner()
}

#[test]
fn png_is_recompressed_losslessly_and_only_once() {
    init_tracing();
    let original = loose_png();
    let fs = MockFileSystem::new();
    fs.add_file("src/img/banner.png", original.clone());

    let registry = registry();
    let token = CancellationToken::new();
    let task = registry.asset("image").unwrap();

    let first = run_task(&fs, root(), task, &token).unwrap();
    assert_eq!(first.outcome(), TaskOutcome::Success);
    assert_eq!(first.written(), vec![Path::new("build/img/banner.png")]);

    let optimised = fs.read(Path::new("build/img/banner.png")).unwrap();
    assert!(
        optimised.len() <= original.len(),
        "{} > {}",
        optimised.len(),
        original.len()
    );

    let before = image::load_from_memory(&original).unwrap().to_rgba8();
    let after = image::load_from_memory(&optimised).unwrap().to_rgba8();
    assert_eq!(after.dimensions(), (32, 32));
    assert_eq!(after.as_raw(), before.as_raw());

    let second = run_task(&fs, root(), task, &token).unwrap();
    assert!(second.written().is_empty());
    assert_eq!(second.unchanged(), 1);
    assert_eq!(fs.read(Path::new("build/img/banner.png")).unwrap(), optimised);
}

#[test]
fn clean_removes_only_the_build_root() {
    let fs = MockFileSystem::new();
    fs.add_file("src/index.html", "<p></p>");
    fs.add_file("build/index.html", "<p></p>");

    clean(&fs, root(), Path::new("build")).unwrap();
    assert!(!fs.exists(Path::new("build")));
    assert!(fs.is_file(Path::new("src/index.html")));

    // Nothing left to remove.
    clean(&fs, root(), Path::new("build")).unwrap();
}

#[test]
fn failing_file_does_not_stop_its_siblings() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("src/js/bad.js", "var s = \"unterminated;\n");
    fs.add_file("src/js/good.js", "var ok = true;\n");

    let registry = registry();
    let report = run_task(&fs, root(), registry.asset("js").unwrap(), &CancellationToken::new())
        .unwrap();

    assert_eq!(report.outcome(), TaskOutcome::PartialFailure(1));
    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].source, PathBuf::from("src/js/bad.js"));
    match &failures[0].outcome {
        FileOutcome::Failed(msg) => assert!(msg.to_lowercase().contains("unterminated"), "{msg}"),
        other => panic!("expected failure, got {other:?}"),
    }

    assert!(fs.is_file(Path::new("build/js/good.js")));
    assert!(!fs.exists(Path::new("build/js/bad.js")));
}

#[test]
fn unwritable_destination_is_fatal() {
    let fs = MockFileSystem::new();
    fs.add_file("src/js/app.js", "var a = 1;");
    fs.deny_writes_under("build");

    let registry = registry();
    let result = run_task(&fs, root(), registry.asset("js").unwrap(), &CancellationToken::new());

    match result {
        Err(err @ PipelineError::DestinationUnwritable { .. }) => assert!(err.is_fatal()),
        other => panic!("Expected DestinationUnwritable, got: {:?}", other),
    }
}

#[test]
fn cancelled_run_stops_before_the_next_file() {
    let fs = MockFileSystem::new();
    fs.add_file("src/js/a.js", "var a;");
    fs.add_file("src/js/b.js", "var b;");

    let token = CancellationToken::new();
    token.cancel();

    let registry = registry();
    let report = run_task(&fs, root(), registry.asset("js").unwrap(), &token).unwrap();

    assert!(report.cancelled);
    assert!(report.files.is_empty());
    assert!(!fs.exists(Path::new("build/js/a.js")));
}

#[test]
fn unknown_task_lists_known_names() {
    let registry = registry();
    match registry.get("deploy") {
        Err(PipelineError::UnknownTask(msg)) => {
            assert!(msg.contains("deploy"));
            for known in ["build", "clean", "default", "html", "watch", "webserver"] {
                assert!(msg.contains(known), "{msg} is missing {known}");
            }
        }
        other => panic!("Expected UnknownTask, got: {:?}", other),
    }
}
