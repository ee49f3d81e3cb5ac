// src/transform/mod.rs

//! Transform chains.
//!
//! A task's work is an ordered list of [`Transform`]s applied left to right
//! to each matched file. Every transform takes an [`Asset`] and returns a new
//! one, or a per-file [`TransformError`].
//!
//! - [`sass`]: indented-syntax stylesheet compiler.
//! - [`css`]: CSS minifier on top of `lightningcss`.
//! - [`prefix`]: vendor-prefix injection for a fixed browser set.
//! - [`js`]: JS minifier on top of the `swc` parser and codegen.
//! - [`sourcemap`]: source map capture and emission.
//! - [`image`]: PNG/SVG optimisation.

pub mod css;
pub mod image;
pub mod js;
pub mod prefix;
pub mod sass;
pub mod sourcemap;

use std::path::PathBuf;

use crate::errors::{PipelineError, TransformError};

pub use css::CssMinify;
pub use image::ImageOptimize;
pub use js::JsMinify;
pub use prefix::Autoprefix;
pub use sass::SassCompile;
pub use sourcemap::{SourceMapInit, SourceMapWrite};

/// Role of a transform inside a chain, used to check ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {
    SourceMapInit,
    Compile,
    Prefix,
    Minify,
    Optimize,
    SourceMapWrite,
}

/// Original source captured by [`SourceMapInit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMapState {
    /// Project-relative path of the original file, `/`-separated.
    pub source: String,
    pub source_content: String,
}

/// Extra file emitted next to the main output (e.g. `main.css.map`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Companion {
    /// Path relative to the destination directory.
    pub path: PathBuf,
    pub contents: Vec<u8>,
}

/// One file flowing through a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Path relative to the class's glob base; becomes the path under the
    /// destination directory.
    pub path: PathBuf,
    /// Project-relative path of the source file.
    pub origin: String,
    pub contents: Vec<u8>,
    pub source_map: Option<SourceMapState>,
    pub companions: Vec<Companion>,
}

impl Asset {
    pub fn new(path: impl Into<PathBuf>, origin: impl Into<String>, contents: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            origin: origin.into(),
            contents,
            source_map: None,
            companions: Vec::new(),
        }
    }

    /// Contents as UTF-8, or an encoding error attributed to `transform`.
    pub fn text(&self, transform: &'static str) -> Result<&str, TransformError> {
        std::str::from_utf8(&self.contents).map_err(|_| TransformError::Encoding { transform })
    }

    /// Lower-case extension of the current path.
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }
}

/// A single processing step: bytes in, bytes out.
pub trait Transform: Send + Sync {
    fn name(&self) -> &'static str;
    fn kind(&self) -> TransformKind;
    fn apply(&self, asset: Asset) -> Result<Asset, TransformError>;
}

/// Ordered list of transforms.
pub type Chain = Vec<Box<dyn Transform>>;

/// Run a chain over one asset, stopping at the first failing step.
pub fn apply_chain(chain: &[Box<dyn Transform>], asset: Asset) -> Result<Asset, TransformError> {
    chain.iter().try_fold(asset, |asset, step| step.apply(asset))
}

/// Check the ordering rules of a chain.
///
/// - Source map capture, if present, comes first.
/// - Prefixing runs before minification, since it needs the unminified
///   declaration structure.
/// - Source map emission, if present, is the last step and needs a capture.
pub fn ensure_chain_order(task: &str, chain: &[Box<dyn Transform>]) -> Result<(), PipelineError> {
    let kinds: Vec<TransformKind> = chain.iter().map(|t| t.kind()).collect();
    let position = |kind: TransformKind| kinds.iter().position(|k| *k == kind);
    let err = |msg: &str| {
        Err(PipelineError::Config(format!(
            "task '{task}' has a misordered transform chain: {msg}"
        )))
    };

    if let Some(idx) = position(TransformKind::SourceMapInit) {
        if idx != 0 {
            return err("source map capture must be the first step");
        }
    }

    if let (Some(prefix), Some(minify)) = (position(TransformKind::Prefix), position(TransformKind::Minify)) {
        if prefix > minify {
            return err("prefixing must run before minification");
        }
    }

    if let Some(idx) = position(TransformKind::SourceMapWrite) {
        if idx + 1 != kinds.len() {
            return err("source map write must be the last step");
        }
        if position(TransformKind::SourceMapInit).is_none() {
            return err("source map write without a preceding capture");
        }
    }

    Ok(())
}
