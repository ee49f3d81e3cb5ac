// src/config/mod.rs

//! Configuration loading and validation for assetpipe.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Hold the path table of asset classes (`paths.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate globs, destinations and pipelines (`validate.rs`).

pub mod loader;
pub mod model;
pub mod paths;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, resolve_config};
pub use model::{
    AssetPathsOverride, ConfigFile, ImageSection, PathsSection, RawConfigFile, ServerSection,
    SourceMapSection, WatchSection,
};
pub use paths::{AssetClass, PathTable, ASSET_CLASSES};
