use std::fs;
use std::path::{Path, PathBuf};

use assetpipe::config::{AssetPathsOverride, ConfigFile, RawConfigFile};
use assetpipe::errors::PipelineError;
use assetpipe::types::SourceMapMode;
use tempfile::TempDir;

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from the stock layout; every `with_*` call overrides one piece.
#[derive(Debug, Clone, Default)]
pub struct ConfigFileBuilder {
    raw: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_src_root(mut self, root: &str) -> Self {
        self.raw.paths.src_root = root.to_string();
        self
    }

    pub fn with_build_root(mut self, root: &str) -> Self {
        self.raw.paths.build_root = root.to_string();
        self
    }

    pub fn with_class_paths(mut self, class: &str, src: &str, watch: &str, dest: &str) -> Self {
        self.raw.paths.classes.insert(
            class.to_string(),
            AssetPathsOverride {
                src: Some(src.to_string()),
                watch: Some(watch.to_string()),
                dest: Some(dest.to_string()),
            },
        );
        self
    }

    pub fn with_class_dest(mut self, class: &str, dest: &str) -> Self {
        self.raw
            .paths
            .classes
            .entry(class.to_string())
            .or_default()
            .dest = Some(dest.to_string());
        self
    }

    pub fn with_pipeline(mut self, name: &str, steps: &[&str]) -> Self {
        self.raw.pipelines.insert(
            name.to_string(),
            steps.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.raw.watch.debounce_ms = ms;
        self
    }

    pub fn with_sourcemap_mode(mut self, mode: SourceMapMode) -> Self {
        self.raw.sourcemaps.mode = mode;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.raw.server.port = port;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.raw
    }

    pub fn try_build(self) -> Result<ConfigFile, PipelineError> {
        ConfigFile::try_from(self.raw)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

/// A throwaway project directory on the real filesystem.
#[derive(Debug)]
pub struct ProjectTree {
    dir: TempDir,
}

impl ProjectTree {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp project dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file relative to the project root, creating parents.
    pub fn file(self, rel: &str, contents: impl AsRef<[u8]>) -> Self {
        self.write(rel, contents);
        self
    }

    pub fn write(&self, rel: &str, contents: impl AsRef<[u8]>) {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, contents).expect("write project file");
    }

    pub fn read(&self, rel: &str) -> Vec<u8> {
        fs::read(self.dir.path().join(rel)).unwrap_or_else(|e| panic!("read {rel}: {e}"))
    }

    pub fn read_string(&self, rel: &str) -> String {
        String::from_utf8(self.read(rel)).expect("utf-8 file")
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.dir.path().join(rel).exists()
    }

    /// All files below `rel`, relative to the project root, sorted.
    pub fn files_under(&self, rel: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut stack: Vec<PathBuf> = vec![self.dir.path().join(rel)];
        while let Some(dir) = stack.pop() {
            let Ok(entries) = fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else if let Ok(rel) = path.strip_prefix(self.dir.path()) {
                    out.push(rel.to_string_lossy().replace('\\', "/"));
                }
            }
        }
        out.sort();
        out
    }
}

impl Default for ProjectTree {
    fn default() -> Self {
        Self::new()
    }
}
