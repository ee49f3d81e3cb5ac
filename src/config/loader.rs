// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// File name looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "Assetpipe.toml";

/// Load a configuration file and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; use [`load_and_validate`] to get a
/// usable [`ConfigFile`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it.
///
/// Validation checks globs, keeps every destination inside the build root
/// and rejects unknown or cyclic pipeline steps.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Resolve the config for a project.
///
/// - An explicit path must exist.
/// - Otherwise `Assetpipe.toml` under `project_root` is used if present.
/// - Otherwise the stock layout applies.
pub fn resolve_config(explicit: Option<&Path>, project_root: &Path) -> Result<ConfigFile> {
    if let Some(path) = explicit {
        return load_and_validate(path);
    }

    let candidate = default_config_path(project_root);
    if candidate.is_file() {
        debug!(path = ?candidate, "using project config file");
        return load_and_validate(candidate);
    }

    debug!("no config file found; using built-in layout");
    ConfigFile::try_from(RawConfigFile::default())
}

pub fn default_config_path(project_root: &Path) -> PathBuf {
    project_root.join(DEFAULT_CONFIG_FILE)
}
