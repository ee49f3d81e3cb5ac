// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::config::paths::PathTable;
use crate::types::{SourceMapMode, TaskName};

/// Top-level configuration as read from `Assetpipe.toml`.
///
/// Every section is optional; an empty file (or no file at all) yields the
/// stock layout:
///
/// ```toml
/// [paths]
/// src_root = "src"
/// build_root = "build"
///
/// [paths.sass]
/// src = "src/sass/main.sass"
/// watch = "src/sass/*.sass"
/// dest = "build/css/"
///
/// [server]
/// host = "localhost"
/// port = 9898
///
/// [watch]
/// debounce_ms = 150
///
/// [pipelines]
/// build = ["html", "js", "sass", "fonts", "image"]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub image: ImageSection,

    #[serde(default)]
    pub sourcemaps: SourceMapSection,

    /// Named sequential pipelines, merged over the built-in `build` and
    /// `default` compositions.
    #[serde(default)]
    pub pipelines: BTreeMap<TaskName, Vec<TaskName>>,
}

/// `[paths]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    #[serde(default = "default_src_root")]
    pub src_root: String,

    #[serde(default = "default_build_root")]
    pub build_root: String,

    /// Per-class overrides: `[paths.html]`, `[paths.js]`, ...
    #[serde(flatten)]
    pub classes: BTreeMap<String, AssetPathsOverride>,
}

fn default_src_root() -> String {
    "src".to_string()
}

fn default_build_root() -> String {
    "build".to_string()
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            src_root: default_src_root(),
            build_root: default_build_root(),
            classes: BTreeMap::new(),
        }
    }
}

/// `[paths.<class>]`; unset keys keep the class default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssetPathsOverride {
    #[serde(default)]
    pub src: Option<String>,
    #[serde(default)]
    pub watch: Option<String>,
    #[serde(default)]
    pub dest: Option<String>,
}

/// `[server]` section for the live-preview server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Remote tunnelling request. Accepted for compatibility, only logged.
    #[serde(default = "default_tunnel")]
    pub tunnel: bool,

    #[serde(default = "default_log_prefix")]
    pub log_prefix: String,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    9898
}

fn default_tunnel() -> bool {
    true
}

fn default_log_prefix() -> String {
    "PROJECT".to_string()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            tunnel: default_tunnel(),
            log_prefix: default_log_prefix(),
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// Quiet period before a burst of changes fires its task.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    150
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

/// `[image]` section: options for the image optimiser.
///
/// GIF and JPEG files are copied unchanged, so there are no options for
/// them; unknown keys are rejected rather than ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageSection {
    /// oxipng preset, 0..=6.
    #[serde(default = "default_png_level")]
    pub png_optimization_level: u8,

    #[serde(default = "yes")]
    pub svg_remove_view_box: bool,

    #[serde(default)]
    pub svg_cleanup_ids: bool,
}

fn yes() -> bool {
    true
}

fn default_png_level() -> u8 {
    5
}

impl Default for ImageSection {
    fn default() -> Self {
        Self {
            png_optimization_level: default_png_level(),
            svg_remove_view_box: true,
            svg_cleanup_ids: false,
        }
    }
}

/// `[sourcemaps]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceMapSection {
    #[serde(default)]
    pub mode: SourceMapMode,
}

/// Validated, immutable configuration.
///
/// Built once at startup (see `validate.rs`) and shared read-only by every
/// component.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    paths: PathTable,
    server: ServerSection,
    watch: WatchSection,
    image: ImageSection,
    sourcemaps: SourceMapSection,
    pipelines: BTreeMap<TaskName, Vec<TaskName>>,
}

impl ConfigFile {
    /// Assemble a config from already-validated parts.
    pub(crate) fn new_unchecked(
        paths: PathTable,
        server: ServerSection,
        watch: WatchSection,
        image: ImageSection,
        sourcemaps: SourceMapSection,
        pipelines: BTreeMap<TaskName, Vec<TaskName>>,
    ) -> Self {
        Self {
            paths,
            server,
            watch,
            image,
            sourcemaps,
            pipelines,
        }
    }

    pub fn paths(&self) -> &PathTable {
        &self.paths
    }

    pub fn server(&self) -> &ServerSection {
        &self.server
    }

    pub fn watch(&self) -> &WatchSection {
        &self.watch
    }

    pub fn image(&self) -> &ImageSection {
        &self.image
    }

    pub fn sourcemaps(&self) -> &SourceMapSection {
        &self.sourcemaps
    }

    /// All sequential pipelines, built-in ones included.
    pub fn pipelines(&self) -> &BTreeMap<TaskName, Vec<TaskName>> {
        &self.pipelines
    }
}
