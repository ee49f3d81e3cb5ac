// src/config/paths.rs

//! The path table: which files each asset class reads, watches and writes.

use std::path::{Component, Path, PathBuf};

use crate::types::TaskName;

/// Asset classes in build order, each backed by a task of the same name.
pub const ASSET_CLASSES: [&str; 5] = ["html", "js", "sass", "fonts", "image"];

/// Stock `(source glob, watch glob, destination)` for a class.
pub fn default_class_paths(name: &str) -> Option<(&'static str, &'static str, &'static str)> {
    match name {
        "html" => Some(("src/*.html", "src/**/*.html", "build/")),
        "js" => Some(("src/js/**/*.js", "src/js/**/*.js", "build/js/")),
        "sass" => Some(("src/sass/main.sass", "src/sass/*.sass", "build/css/")),
        "image" => Some(("src/img/**/*.*", "src/img/**/*.*", "build/img/")),
        "fonts" => Some(("src/fonts/**/*.*", "src/fonts/**/*.*", "build/fonts/")),
        _ => None,
    }
}

/// One category of source file and where it goes.
///
/// All paths are relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetClass {
    name: TaskName,
    source_glob: String,
    watch_glob: String,
    dest_dir: PathBuf,
}

impl AssetClass {
    pub fn new(
        name: impl Into<TaskName>,
        source_glob: impl Into<String>,
        watch_glob: impl Into<String>,
        dest_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            source_glob: source_glob.into(),
            watch_glob: watch_glob.into(),
            dest_dir: dest_dir.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_glob(&self) -> &str {
        &self.source_glob
    }

    pub fn watch_glob(&self) -> &str {
        &self.watch_glob
    }

    pub fn dest_dir(&self) -> &Path {
        &self.dest_dir
    }

    /// Literal directory prefix of the source glob.
    ///
    /// Output paths keep their structure relative to this base, so
    /// `src/js/a/b.js` matched by `src/js/**/*.js` is written as `a/b.js`
    /// under the destination.
    pub fn source_base(&self) -> PathBuf {
        glob_base(&self.source_glob)
    }
}

/// Literal directory prefix of a glob pattern.
///
/// Components are taken up to (not including) the first one containing a
/// glob metacharacter. A pattern without metacharacters names a file, so its
/// parent directory is the base.
pub fn glob_base(pattern: &str) -> PathBuf {
    let parts: Vec<&str> = pattern.split('/').filter(|p| !p.is_empty()).collect();
    let first_magic = parts.iter().position(|p| is_glob_component(p));

    let literal: &[&str] = match first_magic {
        Some(idx) => &parts[..idx],
        None => &parts[..parts.len().saturating_sub(1)],
    };

    literal.iter().filter(|p| **p != ".").collect()
}

fn is_glob_component(part: &str) -> bool {
    part.contains(['*', '?', '[', '{'])
}

/// Drop `.` components and trailing separators so paths compare reliably.
///
/// Returns `None` for paths that are absolute or escape upwards with `..`.
pub fn normalize_relative(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(out)
}

/// Immutable table of asset classes plus the two roots.
#[derive(Debug, Clone)]
pub struct PathTable {
    src_root: PathBuf,
    build_root: PathBuf,
    classes: Vec<AssetClass>,
}

impl PathTable {
    pub(crate) fn new_unchecked(
        src_root: PathBuf,
        build_root: PathBuf,
        classes: Vec<AssetClass>,
    ) -> Self {
        Self {
            src_root,
            build_root,
            classes,
        }
    }

    pub fn src_root(&self) -> &Path {
        &self.src_root
    }

    pub fn build_root(&self) -> &Path {
        &self.build_root
    }

    /// Classes in build order.
    pub fn classes(&self) -> &[AssetClass] {
        &self.classes
    }

    pub fn class(&self, name: &str) -> Option<&AssetClass> {
        self.classes.iter().find(|c| c.name() == name)
    }
}
